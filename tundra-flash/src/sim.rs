// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! In-memory flash bus for host-side tests.
//!
//! Models NOR behavior: erase sets a sector to all-ones, programming
//! only drives bits toward zero, so a skipped erase corrupts data the
//! same way it would on the part. Counts every command and privilege
//! transition so tests can assert that a rejected operation never
//! touched the hardware.

use crate::bus::{FlashBus, FlashFault};
use crate::geometry::{self, EEPROM_BANK};

const MAIN_BASE: u32 = 0x0000_0000;
const MAIN_LEN: usize = 0x0040_0000;
const FEE_BASE: u32 = 0xF020_0000;
const FEE_LEN: usize = 0x0002_0000;

pub struct SimBus {
    main: Vec<u8>,
    fee: Vec<u8>,
    pub active_bank: Option<u8>,
    pub erase_count: usize,
    pub program_count: usize,
    pub raises: usize,
    pub lowers: usize,
    /// When set, the state machine never reports idle.
    pub stuck_busy: bool,
    /// When set, every command completes with an error status.
    pub force_fsm_error: bool,
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            main: vec![0xFF; MAIN_LEN],
            fee: vec![0xFF; FEE_LEN],
            active_bank: None,
            erase_count: 0,
            program_count: 0,
            raises: 0,
            lowers: 0,
            stuck_busy: false,
            force_fsm_error: false,
        }
    }

    pub fn flash_commands(&self) -> usize {
        self.erase_count + self.program_count
    }

    fn region(&mut self, addr: u32, len: usize) -> &mut [u8] {
        let (mem, base) = if addr >= FEE_BASE {
            (&mut self.fee, FEE_BASE)
        } else {
            (&mut self.main, MAIN_BASE)
        };
        let offset = (addr - base) as usize;
        assert!(offset + len <= mem.len(), "access outside flash: {addr:#010x}+{len}");
        &mut mem[offset..offset + len]
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashBus for SimBus {
    fn raise_privilege(&mut self) {
        self.raises += 1;
    }

    fn lower_privilege(&mut self) {
        self.lowers += 1;
    }

    fn init_banks(&mut self) -> Result<(), FlashFault> {
        Ok(())
    }

    fn activate_bank(&mut self, bank: u8) -> Result<(), FlashFault> {
        match bank {
            0 | 1 | EEPROM_BANK => {
                self.active_bank = Some(bank);
                Ok(())
            }
            _ => Err(FlashFault::InvalidAddress),
        }
    }

    fn start_sector_erase(&mut self, sector_start: u32) {
        let sector = geometry::sector_containing(sector_start)
            .expect("erase outside the sector table");
        self.erase_count += 1;
        self.region(sector.start, sector.len as usize).fill(0xFF);
    }

    fn start_program(&mut self, dest: u32, data: &[u8]) {
        self.program_count += 1;
        let cells = self.region(dest, data.len());
        for (cell, byte) in cells.iter_mut().zip(data) {
            *cell &= byte;
        }
    }

    fn fsm_busy(&self) -> bool {
        self.stuck_busy
    }

    fn fsm_ok(&self) -> bool {
        !self.force_fsm_error
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        let (mem, base) = if addr >= FEE_BASE {
            (&self.fee, FEE_BASE)
        } else {
            (&self.main, MAIN_BASE)
        };
        let offset = (addr - base) as usize;
        assert!(offset + buf.len() <= mem.len(), "read outside flash: {addr:#010x}");
        buf.copy_from_slice(&mem[offset..offset + buf.len()]);
    }
}
