// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Trust-policy tests: sentinel gating and CRC comparison.

use tundra_common::crc16;
use tundra_common::records::ImageInfo;
use tundra_flash::driver::FlashDriver;
use tundra_flash::sim::SimBus;
use tundra_flash::store::MetadataStore;
use tundra_updater::policy::{verify, verify_application, RunningImage};

const ADDR: u32 = 0x0024_0000;

fn new_store() -> MetadataStore<SimBus> {
    MetadataStore::new(FlashDriver::new(SimBus::new()))
}

fn flashed_store(data: &[u8]) -> MetadataStore<SimBus> {
    let mut store = new_store();
    let mut session = store.open().unwrap();
    session.flash_mut().erase(ADDR, data.len() as u32).unwrap();
    session.flash_mut().program(1, ADDR, data).unwrap();
    drop(session);
    store
}

#[test]
fn test_absent_record_never_verifies() {
    let data = [0x5Au8; 512];
    let mut store = flashed_store(&data);
    let session = store.open().unwrap();

    // Even a correct CRC is ignored while the sentinel is missing
    let info = ImageInfo {
        exists: 0,
        size: data.len() as u32,
        addr: ADDR,
        crc: crc16(&data),
    };
    assert!(!verify(&session, &info));
}

#[test]
fn test_verify_is_a_crc_comparison() {
    let data = [0xC4u8; 512];
    let mut store = flashed_store(&data);
    let session = store.open().unwrap();

    let mut info = ImageInfo::absent(ADDR);
    info.mark_present();
    info.size = data.len() as u32;
    info.crc = crc16(&data);
    assert!(verify(&session, &info));

    info.crc ^= 0x0100;
    assert!(!verify(&session, &info));

    // A size mismatch changes the computed CRC
    info.crc = crc16(&data);
    info.size -= 1;
    assert!(!verify(&session, &info));
}

#[test]
fn test_verify_application_reads_the_stored_record() {
    let data = [0x3Cu8; 256];
    let mut store = flashed_store(&data);
    {
        let mut session = store.open().unwrap();
        let mut info = ImageInfo::absent(ADDR);
        info.mark_present();
        info.size = data.len() as u32;
        info.crc = crc16(&data);
        session.set_app_info(&info).unwrap();
    }

    let session = store.open().unwrap();
    assert!(verify_application(&session).unwrap());
}

#[test]
fn test_running_image_permission_rule() {
    assert!(RunningImage::Golden.may_modify_application());
    assert!(!RunningImage::Application.may_modify_application());
}
