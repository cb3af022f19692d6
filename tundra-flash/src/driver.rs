// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Erase/program/validate primitives over the sector table.
//!
//! Erase and program block by busy-polling the controller state machine;
//! neither yields, so a large erase stalls the calling task for its full
//! hardware duration. Erase-before-program is a hardware invariant the
//! caller must uphold: programming only drives bits toward zero.

use crate::bus::{FlashBus, FlashFault, PrivilegeGuard};
use crate::geometry::{self, GOLD_MINIMUM_ADDR};
use tundra_common::CRC16;

/// Hardware programming granule: data is fed to the state machine 32
/// bytes at a time, with a shorter final chunk.
const PROGRAM_CHUNK: usize = 32;

/// Spin budget for one state-machine wait before declaring a timeout.
const FSM_SPIN_LIMIT: u32 = 1_000_000;

/// Read granule for checksum and comparison scans.
const SCAN_CHUNK: usize = 256;

pub struct FlashDriver<B: FlashBus> {
    bus: B,
}

impl<B: FlashBus> FlashDriver<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Whether `[addr, addr + image_size)` is a legal destination for an
    /// uploaded image: non-empty, above the bootloader/golden floor, and
    /// entirely inside exactly one of the two program banks. This is the
    /// single gate keeping an update away from the golden image.
    pub fn validate_start_address(&self, addr: u32, image_size: u32) -> bool {
        if image_size == 0 {
            return false;
        }
        if geometry::sector_containing(addr).is_none() {
            return false;
        }
        if addr <= GOLD_MINIMUM_ADDR {
            return false;
        }
        let Some(end) = addr.checked_add(image_size) else {
            return false;
        };
        geometry::program_banks()
            .iter()
            .any(|bank| addr >= bank.start && end <= bank.end())
    }

    /// Erase every sector overlapping `[addr, addr + size)`.
    ///
    /// Enables each bank the span touches, then issues one erase command
    /// per sector, waiting out the state machine after each.
    pub fn erase(&mut self, addr: u32, size: u32) -> Result<(), FlashFault> {
        let (first, last) = erase_span(addr, size)?;

        let mut guard = PrivilegeGuard::raise(&mut self.bus);
        let bus = guard.bus();
        bus.init_banks()?;

        let start_bank = geometry::FLASH_SECTORS[first].bank;
        let end_bank = geometry::FLASH_SECTORS[last].bank;
        for bank in start_bank..=end_bank {
            bus.activate_bank(bank)?;
            wait_fsm_idle(bus)?;
        }

        for sector in &geometry::FLASH_SECTORS[first..=last] {
            bus.start_sector_erase(sector.start);
            wait_fsm_idle(bus)?;
            if !bus.fsm_ok() {
                return Err(FlashFault::CommandFailed);
            }
        }
        Ok(())
    }

    /// Program `src` at `dest` within `bank`, one granule at a time.
    ///
    /// The destination region must have been erased first; that is the
    /// caller's responsibility, not checked here.
    pub fn program(&mut self, bank: u8, dest: u32, src: &[u8]) -> Result<(), FlashFault> {
        if src.is_empty() {
            return Ok(());
        }

        let mut guard = PrivilegeGuard::raise(&mut self.bus);
        let bus = guard.bus();
        bus.init_banks()?;
        bus.activate_bank(bank)?;
        wait_fsm_idle(bus)?;

        let mut offset = 0;
        while offset < src.len() {
            let chunk = (src.len() - offset).min(PROGRAM_CHUNK);
            bus.start_program(dest + offset as u32, &src[offset..offset + chunk]);
            wait_fsm_idle(bus)?;
            if !bus.fsm_ok() {
                return Err(FlashFault::CommandFailed);
            }
            offset += chunk;
        }
        Ok(())
    }

    /// Copy bytes out of memory-mapped flash.
    pub fn read(&self, addr: u32, buf: &mut [u8]) {
        self.bus.read(addr, buf);
    }

    /// Whether `[addr, addr + size)` reads back fully erased.
    pub fn blank_check(&self, addr: u32, size: u32) -> bool {
        let mut chunk = [0u8; SCAN_CHUNK];
        let mut remaining = size as usize;
        let mut cursor = addr;

        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.bus.read(cursor, &mut chunk[..n]);
            if chunk[..n].iter().any(|&b| b != 0xFF) {
                return false;
            }
            cursor += n as u32;
            remaining -= n;
        }
        true
    }

    /// Read-back comparison of a programmed region against its source.
    pub fn program_check(&self, addr: u32, expected: &[u8]) -> bool {
        let mut chunk = [0u8; SCAN_CHUNK];
        for (i, part) in expected.chunks(SCAN_CHUNK).enumerate() {
            let cursor = addr + (i * SCAN_CHUNK) as u32;
            self.bus.read(cursor, &mut chunk[..part.len()]);
            if &chunk[..part.len()] != part {
                return false;
            }
        }
        true
    }

    /// CRC16 over `[addr, addr + size)` in flash.
    pub fn crc16_region(&self, addr: u32, size: u32) -> u16 {
        let mut digest = CRC16.digest();
        let mut chunk = [0u8; SCAN_CHUNK];
        let mut remaining = size as usize;
        let mut cursor = addr;

        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.bus.read(cursor, &mut chunk[..n]);
            digest.update(&chunk[..n]);
            cursor += n as u32;
            remaining -= n;
        }
        digest.finalize()
    }

    /// Bounded wait for the controller to go idle, e.g. before opening
    /// the metadata store.
    pub fn wait_ready(&self) -> Result<(), FlashFault> {
        wait_fsm_idle(&self.bus).map_err(|_| FlashFault::NotReady)
    }
}

/// Indices of the first and last sectors overlapping `[addr, addr + size)`.
fn erase_span(addr: u32, size: u32) -> Result<(usize, usize), FlashFault> {
    if size == 0 {
        return Err(FlashFault::InvalidAddress);
    }
    let end = addr.checked_add(size).ok_or(FlashFault::InvalidAddress)?;

    let first = geometry::FLASH_SECTORS
        .iter()
        .position(|s| s.contains(addr))
        .ok_or(FlashFault::InvalidAddress)?;

    for (i, sector) in geometry::FLASH_SECTORS.iter().enumerate().skip(first) {
        if end > sector.start && end <= sector.end() {
            return Ok((first, i));
        }
    }
    Err(FlashFault::InvalidAddress)
}

fn wait_fsm_idle<B: FlashBus>(bus: &B) -> Result<(), FlashFault> {
    for _ in 0..FSM_SPIN_LIMIT {
        if !bus.fsm_busy() {
            return Ok(());
        }
    }
    Err(FlashFault::Timeout)
}
