// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Register-level bus for the L2FMC flash controller on the flight
//! target.
//!
//! Only the register subset the driver needs is mapped here: bank
//! selection, the command/execute pair of the flash state machine, and
//! its status word. Data to be programmed is staged through the
//! controller's write latches at the destination address before the
//! program command is issued.
//!
//! Code executing an erase or program of a bank must not run from that
//! bank; flight images are linked so the updater always executes from
//! the image that is not being modified.
//!
//! Privilege escalation is supplied by the system layer as a raise/lower
//! pair; it is held only for the duration of one command sequence.

use crate::bus::{FlashBus, FlashFault};

/// Flash controller register file base.
const FMC_BASE: u32 = 0xFFF8_7000;

/// Bank access control / selection.
const FMAC: u32 = FMC_BASE + 0x050;
/// State machine status word.
const FMSTAT: u32 = FMC_BASE + 0x054;
/// State machine register write enable key.
const FSM_WR_ENA: u32 = FMC_BASE + 0x288;
/// Command register.
const FSM_COMMAND: u32 = FMC_BASE + 0x20C;
/// Command trigger.
const FSM_EXECUTE: u32 = FMC_BASE + 0x21C;
/// Target sector address for address-qualified commands.
const FSM_SECTOR: u32 = FMC_BASE + 0x2A4;

/// FMSTAT bits.
const FMSTAT_BUSY: u32 = 1 << 8;
const FMSTAT_CSTAT: u32 = 1 << 4;
const FMSTAT_PGV: u32 = 1 << 12;
const FMSTAT_EV: u32 = 1 << 10;
const FMSTAT_ILA: u32 = 1 << 14;
const FMSTAT_ERROR: u32 = FMSTAT_CSTAT | FMSTAT_PGV | FMSTAT_EV | FMSTAT_ILA;

/// FSM command codes.
const CMD_PROGRAM: u32 = 0x0002;
const CMD_ERASE_SECTOR: u32 = 0x0006;
const CMD_CLEAR_STATUS: u32 = 0x0010;

/// FSM_WR_ENA keys.
const WR_ENA_UNLOCK: u32 = 0x5;
const WR_ENA_LOCK: u32 = 0x2;
/// FSM_EXECUTE trigger key.
const EXECUTE_KEY: u32 = 0x15;

fn reg_write(addr: u32, value: u32) {
    unsafe { (addr as *mut u32).write_volatile(value) }
}

fn reg_read(addr: u32) -> u32 {
    unsafe { (addr as *const u32).read_volatile() }
}

/// Bus over the memory-mapped flash controller. The privilege hooks are
/// the system-level escalation pair; this module never implements them.
pub struct F021Bus {
    raise: fn(),
    lower: fn(),
}

impl F021Bus {
    pub fn new(raise: fn(), lower: fn()) -> Self {
        Self { raise, lower }
    }

    fn issue(&mut self, command: u32) {
        reg_write(FSM_WR_ENA, WR_ENA_UNLOCK);
        reg_write(FSM_COMMAND, command);
        reg_write(FSM_EXECUTE, EXECUTE_KEY);
        reg_write(FSM_WR_ENA, WR_ENA_LOCK);
    }
}

impl FlashBus for F021Bus {
    fn raise_privilege(&mut self) {
        (self.raise)();
    }

    fn lower_privilege(&mut self) {
        (self.lower)();
    }

    fn init_banks(&mut self) -> Result<(), FlashFault> {
        self.issue(CMD_CLEAR_STATUS);
        Ok(())
    }

    fn activate_bank(&mut self, bank: u8) -> Result<(), FlashFault> {
        reg_write(FMAC, u32::from(bank));
        Ok(())
    }

    fn start_sector_erase(&mut self, sector_start: u32) {
        reg_write(FSM_SECTOR, sector_start);
        self.issue(CMD_ERASE_SECTOR);
    }

    fn start_program(&mut self, dest: u32, data: &[u8]) {
        // Stage the chunk into the write latches word by word, padding a
        // ragged tail with erased bits so no stale latch data lands.
        for (i, word) in data.chunks(4).enumerate() {
            let mut padded = [0xFFu8; 4];
            padded[..word.len()].copy_from_slice(word);
            let addr = dest + (i * 4) as u32;
            unsafe { (addr as *mut u32).write_volatile(u32::from_le_bytes(padded)) };
        }
        reg_write(FSM_SECTOR, dest);
        self.issue(CMD_PROGRAM);
    }

    fn fsm_busy(&self) -> bool {
        reg_read(FMSTAT) & FMSTAT_BUSY != 0
    }

    fn fsm_ok(&self) -> bool {
        reg_read(FMSTAT) & FMSTAT_ERROR == 0
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { ((addr + i as u32) as *const u8).read_volatile() };
        }
    }
}
