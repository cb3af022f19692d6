// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Ground-commandable firmware update and boot-recovery service.
//!
//! The OBC keeps two independently flashed images: an immutable golden
//! fallback and a field-updatable application. This crate is the part
//! that lets the ground replace the application without ever being able
//! to lose the golden image: the command dispatcher ([`handler`]), the
//! CRC trust policy and write-permission rule ([`policy`]), and the
//! reset/boot accounting that decides which image deserves control
//! ([`boot`]).
//!
//! The transport that carries command packets, the file store that
//! stages uploads, and the privilege-escalation mechanism are external
//! collaborators, consumed through the interfaces in [`filestore`],
//! [`pool`] and the bus/reset traits.
//!
//! Build the golden (update-capable) configuration with the
//! `golden-image` feature; without it every mutating subservice is
//! refused before touching flash.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod boot;
pub mod filestore;
pub mod handler;
pub mod policy;
pub mod pool;

pub use boot::{SystemReset, MAX_BOOT_ATTEMPTS};
pub use filestore::{FileError, FileStore};
pub use handler::{UpdateHandler, UPDATE_IMAGE_PATH};
pub use policy::RunningImage;
pub use pool::{ScratchPool, TransferPool, BUFFER_LADDER};
