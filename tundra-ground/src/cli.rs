// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "tundra-ground")]
#[command(about = "Packet builder and decoder for the tundra OBC updater")]
pub struct Cli {
    /// Write built packets to this file instead of printing hex
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the CRC16 a SET_APP_CRC command must carry for a binary
    Crc {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Build a FLASH_UPDATE command (flash the staged binary on board)
    Update,

    /// Build a GET_GOLDEN_INFO request
    GoldenInfo,

    /// Build a GET_APP_INFO request
    AppInfo,

    /// Build a SET_APP_ADDRESS command
    SetAddress {
        /// New application load address (hex accepted, e.g. 0x00200000)
        #[arg(value_parser = parse_u32)]
        address: u32,
    },

    /// Build a SET_APP_CRC command
    SetCrc {
        /// Checksum to send (hex accepted)
        #[arg(value_parser = parse_u16, required_unless_present = "file")]
        crc: Option<u16>,

        /// Compute the checksum from this binary instead
        #[arg(short, long, conflicts_with = "crc")]
        file: Option<PathBuf>,
    },

    /// Build an ERASE_APP command (marks the slot unoccupied)
    EraseApp,

    /// Build a VERIFY_APPLICATION_IMAGE command
    VerifyApp,

    /// Build a VERIFY_GOLDEN_IMAGE command
    VerifyGolden,

    /// Decode a response packet from a file
    Decode {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn strip_radix(s: &str) -> (&str, u32) {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    }
}

pub fn parse_u32(s: &str) -> Result<u32, String> {
    let (digits, radix) = strip_radix(s);
    u32::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

pub fn parse_u16(s: &str) -> Result<u16, String> {
    let (digits, radix) = strip_radix(s);
    u16::from_str_radix(digits, radix).map_err(|e| e.to_string())
}
