// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Image trust policy: CRC gating and the write-permission rule.

use tundra_common::records::ImageInfo;
use tundra_flash::bus::{FlashBus, FlashFault};
use tundra_flash::store::StoreSession;

/// Which image this binary was linked to run from.
///
/// Only golden-resident code may modify the application bank; an
/// application build rejects every mutating subservice before touching
/// flash. The variant is fixed by build configuration, not discovered
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunningImage {
    Golden,
    Application,
}

impl RunningImage {
    /// The image this build is configured as (`golden-image` feature).
    pub const fn configured() -> Self {
        #[cfg(feature = "golden-image")]
        {
            RunningImage::Golden
        }
        #[cfg(not(feature = "golden-image"))]
        {
            RunningImage::Application
        }
    }

    pub fn may_modify_application(self) -> bool {
        matches!(self, RunningImage::Golden)
    }
}

/// CRC-gate an image record against the flash it describes. An absent
/// record never verifies, whatever its CRC field holds.
pub fn verify<B: FlashBus>(session: &StoreSession<'_, B>, info: &ImageInfo) -> bool {
    if !info.is_present() {
        return false;
    }
    session.flash().crc16_region(info.addr, info.size) == info.crc
}

pub fn verify_application<B: FlashBus>(
    session: &StoreSession<'_, B>,
) -> Result<bool, FlashFault> {
    let info = session.app_info()?;
    Ok(verify(session, &info))
}

pub fn verify_golden<B: FlashBus>(session: &StoreSession<'_, B>) -> Result<bool, FlashFault> {
    let info = session.golden_info()?;
    Ok(verify(session, &info))
}
