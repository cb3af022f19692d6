// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Driver tests against the in-memory bus.

use tundra_common::crc16;
use tundra_flash::bus::FlashFault;
use tundra_flash::driver::FlashDriver;
use tundra_flash::geometry::{APP_MINIMUM_ADDR, GOLD_MINIMUM_ADDR};
use tundra_flash::sim::SimBus;

fn driver() -> FlashDriver<SimBus> {
    FlashDriver::new(SimBus::new())
}

#[test]
fn test_validate_accepts_ranges_inside_one_bank() {
    let flash = driver();

    // Golden bank, above the bootloader floor
    assert!(flash.validate_start_address(0x0004_0000, 0x1000));
    // Application bank
    assert!(flash.validate_start_address(APP_MINIMUM_ADDR, 12 * 1024));
    // Range ending exactly at the application bank end
    assert!(flash.validate_start_address(0x003F_0000, 0x1_0000));
}

#[test]
fn test_validate_rejects_empty_and_floor() {
    let flash = driver();

    assert!(!flash.validate_start_address(0x0004_0000, 0));
    // At the floor is as illegal as below it
    assert!(!flash.validate_start_address(GOLD_MINIMUM_ADDR, 0x1000));
    assert!(!flash.validate_start_address(0x0001_0000, 0x1000));
}

#[test]
fn test_validate_rejects_bank_straddle() {
    let flash = driver();

    // Starts in the golden bank, ends in the application bank
    assert!(!flash.validate_start_address(0x001F_0000, 0x2_0000));
    // Runs off the end of the application bank
    assert!(!flash.validate_start_address(0x003F_0000, 0x1_0001));
}

#[test]
fn test_validate_rejects_unknown_addresses() {
    let flash = driver();

    assert!(!flash.validate_start_address(0x0040_0000, 0x1000));
    assert!(!flash.validate_start_address(0xFFFF_FFF0, 0x1000));
    // Overflowing end wraps around the address space
    assert!(!flash.validate_start_address(0x0030_0000, 0xFFFF_FFFF));
}

#[test]
fn test_erase_program_read_roundtrip() {
    let mut flash = driver();
    let addr = APP_MINIMUM_ADDR;
    let data: Vec<u8> = (0..100u32).map(|i| (i * 7) as u8).collect();

    flash.erase(addr, data.len() as u32).unwrap();
    flash.program(1, addr, &data).unwrap();

    let mut readback = vec![0u8; data.len()];
    flash.read(addr, &mut readback);
    assert_eq!(readback, data);
    assert!(flash.program_check(addr, &data));
}

#[test]
fn test_program_chunking_covers_ragged_tail() {
    let mut flash = driver();
    let addr = 0x0022_0000;
    // 50 bytes: one full 32-byte granule plus an 18-byte tail
    let data = [0xA5u8; 50];

    flash.erase(addr, data.len() as u32).unwrap();
    flash.program(1, addr, &data).unwrap();
    assert_eq!(flash.bus().program_count, 2);

    let mut readback = [0u8; 50];
    flash.read(addr, &mut readback);
    assert_eq!(readback, data);
}

#[test]
fn test_erase_covers_every_touched_sector() {
    let mut flash = driver();

    // Spans the last golden-bank sector and the first application-bank
    // sector: two erase commands.
    flash.erase(0x001F_0000, 0x2_0000).unwrap();
    assert_eq!(flash.bus().erase_count, 2);
    assert!(flash.blank_check(0x001C_0000, 0x4_0000));
    assert!(flash.blank_check(0x0020_0000, 0x2_0000));
}

#[test]
fn test_erase_rejects_unknown_ranges() {
    let mut flash = driver();

    assert_eq!(flash.erase(0x0050_0000, 0x1000), Err(FlashFault::InvalidAddress));
    // End runs past the last application sector
    assert_eq!(flash.erase(0x003F_0000, 0x2_0000), Err(FlashFault::InvalidAddress));
    assert_eq!(flash.erase(0x0020_0000, 0), Err(FlashFault::InvalidAddress));
    assert_eq!(flash.bus().erase_count, 0);
}

#[test]
fn test_blank_check_sees_programmed_bytes() {
    let mut flash = driver();
    let addr = 0x0024_0000;

    flash.erase(addr, 64).unwrap();
    assert!(flash.blank_check(addr, 64));

    flash.program(1, addr, &[0x00; 8]).unwrap();
    assert!(!flash.blank_check(addr, 64));
}

#[test]
fn test_crc16_region_matches_host_crc() {
    let mut flash = driver();
    let addr = 0x0026_0000;
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();

    flash.erase(addr, data.len() as u32).unwrap();
    flash.program(1, addr, &data).unwrap();

    assert_eq!(flash.crc16_region(addr, data.len() as u32), crc16(&data));
}

#[test]
fn test_stuck_fsm_times_out() {
    let mut flash = driver();
    flash.bus_mut().stuck_busy = true;

    assert_eq!(flash.erase(0x0020_0000, 0x1000), Err(FlashFault::Timeout));
    assert_eq!(flash.wait_ready(), Err(FlashFault::NotReady));
}

#[test]
fn test_fsm_error_fails_the_command() {
    let mut flash = driver();
    flash.bus_mut().force_fsm_error = true;

    assert_eq!(flash.erase(0x0020_0000, 0x1000), Err(FlashFault::CommandFailed));
}

#[test]
fn test_privilege_dropped_on_every_path() {
    let mut flash = driver();

    flash.erase(0x0020_0000, 0x1000).unwrap();
    flash.program(1, 0x0020_0000, &[0x55; 16]).unwrap();
    // Faulting path still balances raise/lower
    let _ = flash.erase(0x0050_0000, 0x1000);
    flash.bus_mut().force_fsm_error = true;
    let _ = flash.erase(0x0020_0000, 0x1000);

    let bus = flash.bus();
    assert_eq!(bus.raises, bus.lowers);
}
