// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Taiga Aerospace <fsw@taiga.aero>

//! Ground-facing update command dispatcher.
//!
//! One command per call: the transport layer hands over a packet, the
//! handler opens the metadata store for the duration of that command,
//! runs the subservice, and rewrites the packet in place as the
//! response. Every branch reports exactly one status byte; the store
//! session closes on every exit path because dropping it is what
//! closes it.

use tundra_common::protocol::{DispatchOutcome, Packet, Status, Subservice};
use tundra_common::records::UpdateSession;
use tundra_flash::bus::FlashBus;
use tundra_flash::geometry;
use tundra_flash::store::{MetadataStore, StoreSession};

use crate::filestore::FileStore;
use crate::policy::{self, RunningImage};
use crate::pool::{self, TransferPool};

/// Path of the staged application binary in the external file store.
pub const UPDATE_IMAGE_PATH: &str = "VOL0:/application_image.bin";

pub struct UpdateHandler<B: FlashBus, F: FileStore, P: TransferPool> {
    store: MetadataStore<B>,
    files: F,
    pool: P,
    running: RunningImage,
}

impl<B: FlashBus, F: FileStore, P: TransferPool> UpdateHandler<B, F, P> {
    pub fn new(store: MetadataStore<B>, files: F, pool: P, running: RunningImage) -> Self {
        Self {
            store,
            files,
            pool,
            running,
        }
    }

    /// Handle one command packet, rewriting it in place into the
    /// response. When the store cannot be opened (controller busy or
    /// faulted) every subservice short-circuits to a failure status
    /// without touching flash.
    pub fn handle(&mut self, packet: &mut Packet) -> DispatchOutcome {
        match self.store.open() {
            Ok(mut session) => dispatch(
                &mut session,
                &mut self.files,
                &mut self.pool,
                self.running,
                packet,
            ),
            Err(_fault) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("updater: metadata store unavailable: {}", _fault);
                packet.set_status(Status::Failed);
                DispatchOutcome::Replied
            }
        }
    }

    pub fn into_parts(self) -> (MetadataStore<B>, F, P) {
        (self.store, self.files, self.pool)
    }
}

fn dispatch<B: FlashBus, F: FileStore, P: TransferPool>(
    session: &mut StoreSession<'_, B>,
    files: &mut F,
    pool: &mut P,
    running: RunningImage,
    packet: &mut Packet,
) -> DispatchOutcome {
    let Some(subservice) = Subservice::from_code(packet.subservice_code()) else {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: no such subservice {}", packet.subservice_code());
        return DispatchOutcome::IllegalSubservice;
    };

    match subservice {
        Subservice::FlashUpdate => flash_update(session, files, pool, running, packet),
        Subservice::GetGoldenInfo => get_golden_info(session, packet),
        Subservice::GetAppInfo => get_app_info(session, packet),
        Subservice::SetAppAddress => set_app_address(session, running, packet),
        Subservice::SetAppCrc => set_app_crc(session, running, packet),
        Subservice::EraseApp => erase_app(session, running, packet),
        Subservice::VerifyApplicationImage => verify_application_image(session, packet),
        Subservice::VerifyGoldenImage => verify_golden_image(session, packet),
    }
    DispatchOutcome::Replied
}

/// `FLASH_UPDATE`: stream the staged binary into the application bank.
fn flash_update<B: FlashBus, F: FileStore, P: TransferPool>(
    session: &mut StoreSession<'_, B>,
    files: &mut F,
    pool: &mut P,
    running: RunningImage,
    packet: &mut Packet,
) {
    if !running.may_modify_application() {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: FLASH_UPDATE refused outside the golden image");
        return packet.set_status(Status::Failed);
    }

    let mut handle = match files.open(UPDATE_IMAGE_PATH) {
        Ok(handle) => handle,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("updater: staged image open failure: {}", _err);
            return packet.set_status(Status::Failed);
        }
    };

    let status = stream_image(session, files, &mut handle, pool);
    files.close(handle);
    pool.release();
    packet.set_status(status);
}

/// Erase the destination and program the staged file chunk by chunk,
/// keeping the persisted session record one chunk behind reality. On
/// any fault the flash is left as-is (a partial image must fail
/// verification) and the live session record marks the abandoned
/// update.
fn stream_image<B: FlashBus, F: FileStore, P: TransferPool>(
    session: &mut StoreSession<'_, B>,
    files: &mut F,
    handle: &mut F::Handle,
    pool: &mut P,
) -> Status {
    let size = match files.size(handle) {
        Ok(size) => size,
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("updater: stat failure on staged image: {}", _err);
            return Status::Failed;
        }
    };

    let app = match session.app_info() {
        Ok(info) => info,
        Err(_) => return Status::Failed,
    };

    if !session.flash().validate_start_address(app.addr, size) {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: invalid update destination 0x{:08x}", app.addr);
        return Status::Failed;
    }

    if session.flash_mut().erase(app.addr, size).is_err() {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: could not erase update region");
        return Status::Failed;
    }

    let Some(granule) = pool::reserve_transfer_buffer(pool) else {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: transfer buffer exhausted");
        return Status::NoBuffer;
    };

    let Some(bank) = geometry::bank_of(app.addr) else {
        return Status::Failed;
    };
    let bank = bank.number;

    let mut tracker = UpdateSession::begin(app.addr, size);
    if session.set_update_session(&tracker).is_err() {
        return Status::Failed;
    }

    loop {
        let n = match files.read(handle, &mut pool.buffer()[..granule]) {
            Ok(n) => n,
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("updater: read failure on staged image: {}", _err);
                return Status::Failed;
            }
        };
        if n == 0 {
            break;
        }

        if session
            .flash_mut()
            .program(bank, tracker.next_address, &pool.buffer()[..n])
            .is_err()
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("updater: program failure at 0x{:08x}", tracker.next_address);
            return Status::Failed;
        }

        tracker.advance(&pool.buffer()[..n]);
        if session.set_update_session(&tracker).is_err() {
            return Status::Failed;
        }
    }

    // Record how much landed in the bank. Presence and CRC stay absent
    // until the ground arms the record with SET_APP_CRC and a
    // verification pass agrees.
    let mut app = app;
    app.size = tracker.bytes_written();
    if session.set_app_info(&app).is_err() {
        return Status::Failed;
    }
    if session.clear_update_session().is_err() {
        return Status::Failed;
    }
    Status::Ok
}

fn get_golden_info<B: FlashBus>(session: &StoreSession<'_, B>, packet: &mut Packet) {
    match session.golden_info() {
        Ok(info) => packet.set_response(Status::Ok, &info.to_bytes()),
        Err(_) => packet.set_status(Status::Failed),
    }
}

fn get_app_info<B: FlashBus>(session: &StoreSession<'_, B>, packet: &mut Packet) {
    match session.app_info() {
        Ok(info) => packet.set_response(Status::Ok, &info.to_bytes()),
        Err(_) => packet.set_status(Status::Failed),
    }
}

/// `SET_APP_ADDRESS`: rewrite the application record with a new load
/// address.
fn set_app_address<B: FlashBus>(
    session: &mut StoreSession<'_, B>,
    running: RunningImage,
    packet: &mut Packet,
) {
    if !running.may_modify_application() {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: SET_APP_ADDRESS refused outside the golden image");
        return packet.set_status(Status::Failed);
    }

    let Some(addr) = payload_u32(packet.payload()) else {
        return packet.set_status(Status::Failed);
    };

    let status = match session.app_info() {
        Ok(mut info) => {
            info.addr = addr;
            match session.set_app_info(&info) {
                Ok(()) => Status::Ok,
                Err(_) => Status::Failed,
            }
        }
        Err(_) => Status::Failed,
    };
    packet.set_status(status);
}

/// `SET_APP_CRC`: record the ground-computed CRC16 and arm the record.
/// This is the last provisioning step; the image still proves itself
/// through an explicit verification afterwards.
fn set_app_crc<B: FlashBus>(
    session: &mut StoreSession<'_, B>,
    running: RunningImage,
    packet: &mut Packet,
) {
    if !running.may_modify_application() {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: SET_APP_CRC refused outside the golden image");
        return packet.set_status(Status::Failed);
    }

    let Some(crc) = payload_u16(packet.payload()) else {
        return packet.set_status(Status::Failed);
    };

    let status = match session.app_info() {
        Ok(mut info) => {
            info.crc = crc;
            info.mark_present();
            match session.set_app_info(&info) {
                Ok(()) => Status::Ok,
                Err(_) => Status::Failed,
            }
        }
        Err(_) => Status::Failed,
    };
    packet.set_status(status);
}

/// `ERASE_APP`: mark the application slot unoccupied. Flash contents
/// are left alone; the sentinel is what verification trusts.
fn erase_app<B: FlashBus>(
    session: &mut StoreSession<'_, B>,
    running: RunningImage,
    packet: &mut Packet,
) {
    if !running.may_modify_application() {
        #[cfg(feature = "defmt")]
        defmt::warn!("updater: ERASE_APP refused outside the golden image");
        return packet.set_status(Status::Failed);
    }

    let status = match session.app_info() {
        Ok(mut info) => {
            info.mark_absent();
            match session.set_app_info(&info) {
                Ok(()) => Status::Ok,
                Err(_) => Status::Failed,
            }
        }
        Err(_) => Status::Failed,
    };
    packet.set_status(status);
}

fn verify_application_image<B: FlashBus>(session: &StoreSession<'_, B>, packet: &mut Packet) {
    let ok = policy::verify_application(session).unwrap_or(false);
    packet.set_status(if ok { Status::Ok } else { Status::Failed });
}

fn verify_golden_image<B: FlashBus>(session: &StoreSession<'_, B>, packet: &mut Packet) {
    let ok = policy::verify_golden(session).unwrap_or(false);
    packet.set_status(if ok { Status::Ok } else { Status::Failed });
}

fn payload_u32(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = payload.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

fn payload_u16(payload: &[u8]) -> Option<u16> {
    let bytes: [u8; 2] = payload.get(..2)?.try_into().ok()?;
    Some(u16::from_le_bytes(bytes))
}
