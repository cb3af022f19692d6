// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Persistent metadata store over dedicated EEPROM-emulation sectors.
//!
//! Each logical block owns exactly one bank-7 sector. A write is an
//! erase of that sector followed by a program of the whole record, so a
//! power cut between the two steps leaves the block erased, which every
//! record type decodes as "absent" through its sentinel.
//!
//! All access goes through a [`StoreSession`] obtained from
//! [`MetadataStore::open`]; the session is also the only path to the
//! flash driver while a command is being handled, and dropping it closes
//! the store. Reentrancy is not expressible.

use crate::bus::{FlashBus, FlashFault};
use crate::driver::FlashDriver;
use crate::geometry::{self, Sector, EEPROM_BANK};
use tundra_common::records::{BootInfo, ImageInfo, UpdateSession};

/// Logical block numbers, one dedicated sector each.
pub const BOOT_INFO_BLOCK: u8 = 0;
pub const APP_STATUS_BLOCK: u8 = 1;
pub const GOLD_STATUS_BLOCK: u8 = 2;
pub const UPDATE_SESSION_BLOCK: u8 = 3;

fn block_sector(block: u8) -> Option<&'static Sector> {
    geometry::FLASH_SECTORS
        .iter()
        .find(|s| s.bank == EEPROM_BANK && s.index == block)
}

pub struct MetadataStore<B: FlashBus> {
    flash: FlashDriver<B>,
}

impl<B: FlashBus> MetadataStore<B> {
    pub fn new(flash: FlashDriver<B>) -> Self {
        Self { flash }
    }

    pub fn into_flash(self) -> FlashDriver<B> {
        self.flash
    }

    /// Open the store for one command's worth of work, waiting out any
    /// in-flight controller activity first.
    pub fn open(&mut self) -> Result<StoreSession<'_, B>, FlashFault> {
        self.flash.wait_ready()?;
        Ok(StoreSession { store: self })
    }
}

pub struct StoreSession<'a, B: FlashBus> {
    store: &'a mut MetadataStore<B>,
}

impl<B: FlashBus> StoreSession<'_, B> {
    pub fn flash(&self) -> &FlashDriver<B> {
        &self.store.flash
    }

    pub fn flash_mut(&mut self) -> &mut FlashDriver<B> {
        &mut self.store.flash
    }

    /// Copy `buf.len()` bytes out of the block's sector.
    pub fn read_block(&self, block: u8, buf: &mut [u8]) -> Result<(), FlashFault> {
        let sector = block_sector(block).ok_or(FlashFault::InvalidAddress)?;
        if buf.len() as u32 > sector.len {
            return Err(FlashFault::BufferTooLarge);
        }
        self.store.flash.read(sector.start, buf);
        Ok(())
    }

    /// Rewrite the block's sector with `data`: whole-sector erase, then
    /// program.
    pub fn write_block(&mut self, block: u8, data: &[u8]) -> Result<(), FlashFault> {
        let sector = block_sector(block).ok_or(FlashFault::InvalidAddress)?;
        if data.len() as u32 > sector.len {
            return Err(FlashFault::BufferTooLarge);
        }
        self.store.flash.erase(sector.start, sector.len)?;
        self.store.flash.program(EEPROM_BANK, sector.start, data)
    }

    pub fn app_info(&self) -> Result<ImageInfo, FlashFault> {
        let mut raw = [0u8; ImageInfo::ENCODED_LEN];
        self.read_block(APP_STATUS_BLOCK, &mut raw)?;
        Ok(ImageInfo::from_bytes(&raw))
    }

    pub fn set_app_info(&mut self, info: &ImageInfo) -> Result<(), FlashFault> {
        self.write_block(APP_STATUS_BLOCK, &info.to_bytes())
    }

    pub fn golden_info(&self) -> Result<ImageInfo, FlashFault> {
        let mut raw = [0u8; ImageInfo::ENCODED_LEN];
        self.read_block(GOLD_STATUS_BLOCK, &mut raw)?;
        Ok(ImageInfo::from_bytes(&raw))
    }

    pub fn set_golden_info(&mut self, info: &ImageInfo) -> Result<(), FlashFault> {
        self.write_block(GOLD_STATUS_BLOCK, &info.to_bytes())
    }

    /// Boot accounting record; an erased or corrupt block reads as the
    /// freshly provisioned default.
    pub fn boot_info(&self) -> Result<BootInfo, FlashFault> {
        let mut raw = [0u8; BootInfo::ENCODED_LEN];
        self.read_block(BOOT_INFO_BLOCK, &mut raw)?;
        let info = BootInfo::from_bytes(&raw);
        if info.is_valid() {
            Ok(info)
        } else {
            Ok(BootInfo::default_new())
        }
    }

    pub fn set_boot_info(&mut self, info: &BootInfo) -> Result<(), FlashFault> {
        self.write_block(BOOT_INFO_BLOCK, &info.to_bytes())
    }

    pub fn update_session(&self) -> Result<UpdateSession, FlashFault> {
        let mut raw = [0u8; UpdateSession::ENCODED_LEN];
        self.read_block(UPDATE_SESSION_BLOCK, &mut raw)?;
        Ok(UpdateSession::from_bytes(&raw))
    }

    pub fn set_update_session(&mut self, session: &UpdateSession) -> Result<(), FlashFault> {
        self.write_block(UPDATE_SESSION_BLOCK, &session.to_bytes())
    }

    /// Drop the session record back to dormant.
    pub fn clear_update_session(&mut self) -> Result<(), FlashFault> {
        self.set_update_session(&UpdateSession::idle())
    }
}
