// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Flash driver and persistent metadata store for the tundra OBC.
//!
//! Layering, bottom up:
//! - [`bus`]: the hardware seam of raw controller commands and status.
//! - [`geometry`]: the compiled-in bank/sector table for the target.
//! - [`driver`]: erase/program/validate over the sector table.
//! - [`store`]: logical metadata blocks on dedicated sectors, accessed
//!   through an owned session token.
//!
//! Feature `embedded` enables the register-level flight bus, `sim` an
//! in-memory bus for host tests.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bus;
pub mod driver;
pub mod geometry;
pub mod store;

#[cfg(feature = "embedded")]
pub mod f021;

#[cfg(feature = "sim")]
pub mod sim;

pub use bus::{FlashBus, FlashFault};
pub use driver::FlashDriver;
pub use store::{MetadataStore, StoreSession};
