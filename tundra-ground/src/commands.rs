// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Command implementations: packet building, decoding, checksumming.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use tundra_common::crc16;
use tundra_common::protocol::{Packet, Status, Subservice};
use tundra_common::records::ImageInfo;

/// Compute and display the CRC16 of a firmware binary.
pub fn checksum(file: &Path) -> Result<u16> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let crc = crc16(&data);
    println!(
        "CRC16: 0x{:04x} ({} bytes from {})",
        crc,
        data.len(),
        file.display()
    );
    Ok(crc)
}

/// Build a command packet and hand it to the output sink.
pub fn build(subservice: Subservice, payload: &[u8], out: Option<&Path>) -> Result<()> {
    let packet =
        Packet::request(subservice, payload).context("payload exceeds the packet MTU")?;
    emit(packet.as_bytes(), out)
}

fn emit(bytes: &[u8], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            println!("{hex}");
        }
    }
    Ok(())
}

/// Decode and display a response packet.
pub fn decode(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let packet = Packet::from_bytes(&bytes).context("not a valid packet (bad length)")?;

    let Some(subservice) = Subservice::from_code(packet.subservice_code()) else {
        bail!("unknown subservice code {:#04x}", packet.subservice_code());
    };

    println!("Subservice: {subservice:?}");
    match Status::from_byte(packet.as_bytes()[1]) {
        Some(Status::Ok) => println!("Status:     OK"),
        Some(Status::Failed) => println!("Status:     FAILED"),
        Some(Status::NoBuffer) => println!("Status:     FAILED (no transfer buffer)"),
        None => println!("Status:     unknown ({})", packet.status()),
    }

    if matches!(
        subservice,
        Subservice::GetGoldenInfo | Subservice::GetAppInfo
    ) {
        print_image_info(packet.payload())?;
    }
    Ok(())
}

fn print_image_info(payload: &[u8]) -> Result<()> {
    let raw: [u8; ImageInfo::ENCODED_LEN] = payload
        .try_into()
        .context("payload is not an image record")?;
    let info = ImageInfo::from_bytes(&raw);

    println!("Image record:");
    println!("  present: {}", info.is_present());
    println!("  address: 0x{:08x}", info.addr);
    println!("  size:    {} bytes", info.size);
    println!("  crc16:   0x{:04x}", info.crc);
    Ok(())
}
