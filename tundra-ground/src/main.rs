// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Ground-segment helper for the tundra OBC updater.
//!
//! Builds the raw command packets the updater service consumes, decodes
//! its responses, and computes the CRC16 a `SET_APP_CRC` must carry.
//! Carrying the packets to the spacecraft is the transport network's
//! job, not this tool's.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use tundra_common::protocol::Subservice;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let out = cli.out.as_deref();

    match cli.command {
        Commands::Crc { file } => {
            commands::checksum(&file)?;
        }
        Commands::Update => commands::build(Subservice::FlashUpdate, &[], out)?,
        Commands::GoldenInfo => commands::build(Subservice::GetGoldenInfo, &[], out)?,
        Commands::AppInfo => commands::build(Subservice::GetAppInfo, &[], out)?,
        Commands::SetAddress { address } => {
            commands::build(Subservice::SetAppAddress, &address.to_le_bytes(), out)?
        }
        Commands::SetCrc { crc, file } => {
            let crc = match (crc, file) {
                (Some(crc), _) => crc,
                (None, Some(file)) => commands::checksum(&file)?,
                (None, None) => unreachable!("clap enforces one source"),
            };
            commands::build(Subservice::SetAppCrc, &crc.to_le_bytes(), out)?
        }
        Commands::EraseApp => commands::build(Subservice::EraseApp, &[], out)?,
        Commands::VerifyApp => commands::build(Subservice::VerifyApplicationImage, &[], out)?,
        Commands::VerifyGolden => commands::build(Subservice::VerifyGoldenImage, &[], out)?,
        Commands::Decode { file } => commands::decode(&file)?,
    }

    Ok(())
}
