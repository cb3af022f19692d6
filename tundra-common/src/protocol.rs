// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Ground command packet layout.
//!
//! The transport layer hands the updater one command per packet and
//! sends the same buffer back as the response. Byte 0 carries the
//! subservice code, byte 1 the response status, and any payload starts
//! at byte 2. Payload integers are little-endian, encoded and decoded
//! explicitly.

use heapless::Vec;

pub const SUBSERVICE_BYTE: usize = 0;
pub const STATUS_BYTE: usize = 1;
pub const IN_DATA_BYTE: usize = 2;
pub const OUT_DATA_BYTE: usize = 2;

/// Transport MTU for one command packet.
pub const PACKET_CAPACITY: usize = 256;

/// Largest payload a packet can carry after the two header bytes.
pub const MAX_PAYLOAD: usize = PACKET_CAPACITY - IN_DATA_BYTE;

/// Updater subservice codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Subservice {
    FlashUpdate = 0,
    GetGoldenInfo = 1,
    GetAppInfo = 2,
    SetAppAddress = 3,
    SetAppCrc = 4,
    EraseApp = 5,
    VerifyApplicationImage = 6,
    VerifyGoldenImage = 7,
}

impl Subservice {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::FlashUpdate),
            1 => Some(Self::GetGoldenInfo),
            2 => Some(Self::GetAppInfo),
            3 => Some(Self::SetAppAddress),
            4 => Some(Self::SetAppCrc),
            5 => Some(Self::EraseApp),
            6 => Some(Self::VerifyApplicationImage),
            7 => Some(Self::VerifyGoldenImage),
            _ => None,
        }
    }
}

/// Response status byte. `0` reports success and `-1` failure; buffer
/// exhaustion during `FLASH_UPDATE` has its own code so the ground can
/// tell a fragmented heap from a flash fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum Status {
    Ok = 0,
    Failed = -1,
    NoBuffer = -2,
}

impl Status {
    pub fn as_byte(self) -> u8 {
        self as i8 as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte as i8 {
            0 => Some(Self::Ok),
            -1 => Some(Self::Failed),
            -2 => Some(Self::NoBuffer),
            _ => None,
        }
    }
}

/// What the transport layer should do with a handled packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// The packet now holds a response and goes back to the sender.
    Replied,
    /// Unrecognized subservice code; the packet holds no response.
    IllegalSubservice,
}

/// One command/response buffer, rewritten in place by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Vec<u8, PACKET_CAPACITY>,
}

impl Packet {
    /// Build a request: subservice code, a zeroed status slot, payload.
    ///
    /// Returns `None` when the payload exceeds [`MAX_PAYLOAD`].
    pub fn request(subservice: Subservice, payload: &[u8]) -> Option<Self> {
        let mut data = Vec::new();
        data.push(subservice as u8).ok()?;
        data.push(0).ok()?;
        data.extend_from_slice(payload).ok()?;
        Some(Self { data })
    }

    /// Wrap raw bytes received from the transport. Anything shorter than
    /// the two header bytes or larger than the MTU is rejected.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() < IN_DATA_BYTE {
            return None;
        }
        let mut data = Vec::new();
        data.extend_from_slice(raw).ok()?;
        Some(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn subservice_code(&self) -> u8 {
        self.data[SUBSERVICE_BYTE]
    }

    pub fn status(&self) -> i8 {
        self.data[STATUS_BYTE] as i8
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[IN_DATA_BYTE..]
    }

    /// Rewrite this packet in place as a response, keeping the
    /// subservice byte. Oversized payloads are truncated to the MTU.
    pub fn set_response(&mut self, status: Status, payload: &[u8]) {
        self.data.truncate(IN_DATA_BYTE);
        self.data[STATUS_BYTE] = status.as_byte();
        let take = payload.len().min(MAX_PAYLOAD);
        // capacity checked above
        let _ = self.data.extend_from_slice(&payload[..take]);
    }

    /// Status-only response.
    pub fn set_status(&mut self, status: Status) {
        self.set_response(status, &[]);
    }
}
