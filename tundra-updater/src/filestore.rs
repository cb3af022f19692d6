// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Interface to the external staging file store.
//!
//! Uploaded binaries are staged as a file by the transfer service
//! before the updater flashes them; this trait is the slice of that
//! store the updater consumes. A read returning fewer bytes than asked
//! for means the file is ending; zero means end of file.

/// Fault surfaced by the staging store. The updater does not interpret
/// it beyond failing the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileError {
    NotFound,
    Io,
}

pub trait FileStore {
    type Handle;

    fn open(&mut self, path: &str) -> Result<Self::Handle, FileError>;

    /// Size in bytes of an open file.
    fn size(&mut self, handle: &Self::Handle) -> Result<u32, FileError>;

    /// Read up to `buf.len()` bytes, returning how many landed.
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, FileError>;

    fn close(&mut self, handle: Self::Handle);
}
