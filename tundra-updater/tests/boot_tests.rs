// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Boot and reset accounting tests.

use tundra_common::records::{BootInfo, ImageKind, ResetSource, SwResetReason};
use tundra_flash::driver::FlashDriver;
use tundra_flash::sim::SimBus;
use tundra_flash::store::MetadataStore;
use tundra_updater::boot::{on_boot, record_reset, select_boot_image, MAX_BOOT_ATTEMPTS};

fn new_store() -> MetadataStore<SimBus> {
    MetadataStore::new(FlashDriver::new(SimBus::new()))
}

fn seed(store: &mut MetadataStore<SimBus>, info: &BootInfo) {
    let mut session = store.open().unwrap();
    session.set_boot_info(info).unwrap();
}

#[test]
fn test_requested_reset_zeroes_the_attempt_counter() {
    let mut store = new_store();
    let mut info = BootInfo::default_new();
    info.attempts = 3;
    info.count = 10;
    seed(&mut store, &info);

    let mut session = store.open().unwrap();
    record_reset(&mut session, SwResetReason::Requested, None).unwrap();

    let info = session.boot_info().unwrap();
    assert_eq!(info.attempts, 0);
    assert_eq!(info.sw_reason, SwResetReason::Requested);
    // The lifetime boot counter is untouched
    assert_eq!(info.count, 10);
}

#[test]
fn test_crash_reset_preserves_the_attempt_counter() {
    let mut store = new_store();
    let mut info = BootInfo::default_new();
    info.attempts = 3;
    seed(&mut store, &info);

    let mut session = store.open().unwrap();
    record_reset(&mut session, SwResetReason::DataAbort, None).unwrap();

    let info = session.boot_info().unwrap();
    assert_eq!(info.attempts, 3);
    assert_eq!(info.sw_reason, SwResetReason::DataAbort);
}

#[test]
fn test_reset_can_switch_the_expected_image() {
    let mut store = new_store();
    let mut session = store.open().unwrap();

    record_reset(
        &mut session,
        SwResetReason::Requested,
        Some(ImageKind::Application),
    )
    .unwrap();

    assert_eq!(
        session.boot_info().unwrap().image_type,
        ImageKind::Application
    );
}

#[test]
fn test_on_boot_counts_an_unintentional_reboot() {
    let mut store = new_store();
    let mut session = store.open().unwrap();

    // Fresh metadata decodes as the provisioning default
    let previous = on_boot(&mut session, ResetSource::PowerOn).unwrap();
    assert_eq!(previous, BootInfo::default_new());

    let info = session.boot_info().unwrap();
    assert_eq!(info.count, 1);
    assert_eq!(info.attempts, 1);
    assert_eq!(info.reset_source, ResetSource::PowerOn);
}

#[test]
fn test_on_boot_after_a_requested_reboot_keeps_attempts_at_zero() {
    let mut store = new_store();
    let mut info = BootInfo::default_new();
    info.count = 7;
    info.sw_reason = SwResetReason::Requested;
    seed(&mut store, &info);

    let mut session = store.open().unwrap();
    let previous = on_boot(&mut session, ResetSource::Software).unwrap();
    assert_eq!(previous.count, 7);

    let info = session.boot_info().unwrap();
    assert_eq!(info.count, 8);
    assert_eq!(info.attempts, 0);
}

#[test]
fn test_repeated_crashes_accumulate_attempts() {
    let mut store = new_store();
    let mut session = store.open().unwrap();

    for expected in 1..=3u32 {
        on_boot(&mut session, ResetSource::Watchdog).unwrap();
        assert_eq!(session.boot_info().unwrap().attempts, expected);
    }
}

#[test]
fn test_select_boot_image_falls_back_after_the_attempt_budget() {
    let mut info = BootInfo::default_new();
    info.image_type = ImageKind::Application;

    info.attempts = MAX_BOOT_ATTEMPTS - 1;
    assert_eq!(select_boot_image(&info), ImageKind::Application);

    info.attempts = MAX_BOOT_ATTEMPTS;
    assert_eq!(select_boot_image(&info), ImageKind::Golden);
}

#[test]
fn test_select_boot_image_leaves_golden_alone() {
    let mut info = BootInfo::default_new();
    info.image_type = ImageKind::Golden;
    info.attempts = MAX_BOOT_ATTEMPTS + 5;

    assert_eq!(select_boot_image(&info), ImageKind::Golden);
}
