// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Boot and reset accounting.
//!
//! Two halves, meeting in the persisted [`BootInfo`] record: the way
//! down (`software_reset` stamps the reason and pulls the reset line)
//! and the way up (`on_boot` bumps the counters and hands the previous
//! record to the boot sequence, which picks an image with
//! [`select_boot_image`]).

use tundra_common::records::{BootInfo, ImageKind, ResetSource, SwResetReason};
use tundra_flash::bus::{FlashBus, FlashFault};
use tundra_flash::store::{MetadataStore, StoreSession};

/// Unintentional reboots tolerated before the boot sequence stops
/// trusting the application image and falls back to golden.
pub const MAX_BOOT_ATTEMPTS: u32 = 4;

/// Privileged system-reset register write. Never returns on hardware.
pub trait SystemReset {
    fn system_reset(&mut self) -> !;
}

/// Stamp the pending reset's reason into the boot record. A requested
/// reboot zeroes the attempt counter; a crash leaves it for `on_boot`
/// to count. `switch_to` optionally changes which image the next boot
/// should run.
pub fn record_reset<B: FlashBus>(
    session: &mut StoreSession<'_, B>,
    reason: SwResetReason,
    switch_to: Option<ImageKind>,
) -> Result<(), FlashFault> {
    let mut info = session.boot_info()?;
    info.sw_reason = reason;
    if reason == SwResetReason::Requested {
        info.attempts = 0;
    }
    if let Some(kind) = switch_to {
        info.image_type = kind;
    }
    session.set_boot_info(&info)
}

/// Persist the reset reason, then pull the reset line. Metadata faults
/// do not stop the reset; a reboot that loses its accounting is still a
/// reboot.
pub fn software_reset<B: FlashBus, R: SystemReset>(
    store: &mut MetadataStore<B>,
    sys: &mut R,
    reason: SwResetReason,
    switch_to: Option<ImageKind>,
) -> ! {
    if let Ok(mut session) = store.open() {
        let _ = record_reset(&mut session, reason, switch_to);
    }
    sys.system_reset()
}

/// Early-boot accounting: bump the boot counter, count the reboot as
/// unintentional unless it was requested, record the hardware reset
/// source, persist, and return the record the system went down with.
pub fn on_boot<B: FlashBus>(
    session: &mut StoreSession<'_, B>,
    source: ResetSource,
) -> Result<BootInfo, FlashFault> {
    let previous = session.boot_info()?;

    let mut next = previous;
    next.count = next.count.wrapping_add(1);
    if previous.sw_reason != SwResetReason::Requested {
        next.attempts = next.attempts.wrapping_add(1);
    }
    next.reset_source = source;
    session.set_boot_info(&next)?;

    Ok(previous)
}

/// Pick the image to boot. The application is trusted until it has
/// crashed its way through [`MAX_BOOT_ATTEMPTS`] reboots without a
/// requested reset in between; after that only golden gets control
/// until the ground intervenes.
pub fn select_boot_image(info: &BootInfo) -> ImageKind {
    if info.image_type == ImageKind::Application && info.attempts >= MAX_BOOT_ATTEMPTS {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "boot: {} unintentional reboots, falling back to golden",
            info.attempts
        );
        return ImageKind::Golden;
    }
    info.image_type
}
