// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Persisted swap status
//!
//! The status area is an append-only log of fixed 32-byte records spread over
//! two sectors used in ping-pong fashion. The newest record (highest sequence
//! number with an intact CRC) is the machine state.
//!
//! # Record layout (v2, little-endian)
//!
//! ```text
//!  0  magic            u32   "EBST"
//!  4  layout_version   u8    2
//!  5  phase            u8    SwapPhase
//!  6  sub_step         u8    0..=2
//!  7  flags            u8    STEP_DONE | PERMANENT | UPGRADE_REQUESTED | OVERWRITE
//!  8  sequence         u32
//! 12  cursor           u16   sector index
//! 14  sector_count     u16
//! 16  candidate_version [8]
//! 24  last_error       u16   Error::code(), 0 = none
//! 26  reserved         u16   0xFFFF
//! 28  crc32            u32   over bytes 0..28
//! ```
//!
//! A v1 record stops after `sector_count`, with its CRC at offset 16 over
//! bytes `0..16`. It is decoded and rewritten as v2 on load. Every layout
//! from v2 on keeps its CRC at offset 28, so a record from newer firmware is
//! told apart from a torn one before its version byte is trusted.
//!
//! # Commit marker
//!
//! The trailing CRC is written last. A record torn by power loss fails its
//! CRC and is skipped, so the previous record stays authoritative.

use crate::swap::SwapPhase;
use eb_common::{crc32, FlashLayout, Region, StorageError, Version};
use eb_hal::FlashInterface;

/// Record magic, "EBST"
pub const STATUS_MAGIC: u32 = 0x4542_5354;

/// Layout written by this firmware
pub const LAYOUT_VERSION: u8 = 2;

/// Bytes per record slot in the log
pub const RECORD_SIZE: usize = 32;

const V1_CRC_OFFSET: usize = 16;
const V2_CRC_OFFSET: usize = 28;

// A validated layout never splits a record across sectors.
const _: () = assert!(RECORD_SIZE <= eb_common::config::MIN_SECTOR_SIZE as usize);

/// Record flag bits
pub mod flags {
    /// The sub-step named by `cursor`/`sub_step` has completed
    pub const STEP_DONE: u8 = 0x01;
    /// Install without a test boot
    pub const PERMANENT: u8 = 0x02;
    /// The updater staged a candidate in the secondary slot
    pub const UPGRADE_REQUESTED: u8 = 0x04;
    /// The relocation in progress is an overwrite, not a swap
    pub const OVERWRITE: u8 = 0x08;
}

// =============================================================================
// Record
// =============================================================================

/// One decoded status record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    /// Layout the record was decoded from
    pub layout_version: u8,
    /// Machine phase
    pub phase: SwapPhase,
    /// Sub-step within the current sector
    pub sub_step: u8,
    /// Flag bits, see [`flags`]
    pub flags: u8,
    /// Monotonic write counter
    pub sequence: u32,
    /// Sector index of the step in progress
    pub cursor: u16,
    /// Sectors taking part in the relocation
    pub sector_count: u16,
    /// Version of the image being installed
    pub candidate_version: Version,
    /// Code of the last error recorded before surfacing it, 0 if none
    pub last_error: u16,
}

impl StatusRecord {
    /// State of a never-written status area
    pub const INITIAL: Self = Self {
        layout_version: LAYOUT_VERSION,
        phase: SwapPhase::None,
        sub_step: 0,
        flags: 0,
        sequence: 0,
        cursor: 0,
        sector_count: 0,
        candidate_version: Version::ZERO,
        last_error: 0,
    };

    /// Whether every bit in `mask` is set
    #[must_use]
    pub const fn has(&self, mask: u8) -> bool {
        self.flags & mask == mask
    }

    /// Copy with `mask` set or cleared
    #[must_use]
    pub const fn with_flag(mut self, mask: u8, on: bool) -> Self {
        if on {
            self.flags |= mask;
        } else {
            self.flags &= !mask;
        }
        self
    }

    /// Encode as the current layout
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0xFFu8; RECORD_SIZE];
        out[0..4].copy_from_slice(&STATUS_MAGIC.to_le_bytes());
        out[4] = LAYOUT_VERSION;
        out[5] = self.phase.as_u8();
        out[6] = self.sub_step;
        out[7] = self.flags;
        out[8..12].copy_from_slice(&self.sequence.to_le_bytes());
        out[12..14].copy_from_slice(&self.cursor.to_le_bytes());
        out[14..16].copy_from_slice(&self.sector_count.to_le_bytes());
        out[16..24].copy_from_slice(&self.candidate_version.to_bytes());
        out[24..26].copy_from_slice(&self.last_error.to_le_bytes());
        let crc = crc32(&out[..V2_CRC_OFFSET]);
        out[V2_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode one record slot
    ///
    /// Returns `Ok(None)` for a slot that is not a committed record (foreign
    /// magic, torn, or unknown phase).
    ///
    /// # Errors
    ///
    /// `StorageError::UnknownLayout` for a record written by newer firmware.
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Result<Option<Self>, StorageError> {
        if read_u32(bytes, 0) != STATUS_MAGIC {
            return Ok(None);
        }

        let layout_version = bytes[4];
        let crc_offset = if layout_version == 1 {
            V1_CRC_OFFSET
        } else {
            V2_CRC_OFFSET
        };

        // A partly programmed version byte reads as anything; the CRC decides.
        if read_u32(bytes, crc_offset) != crc32(&bytes[..crc_offset]) {
            return Ok(None);
        }

        match layout_version {
            1 | LAYOUT_VERSION => {}
            v if v > LAYOUT_VERSION && v != 0xFF => return Err(StorageError::UnknownLayout),
            _ => return Ok(None),
        }

        let Some(phase) = SwapPhase::from_u8(bytes[5]) else {
            return Ok(None);
        };

        let (candidate_version, last_error) = if layout_version == 1 {
            (Version::ZERO, 0)
        } else {
            (
                Version::from_bytes(&bytes[16..24]).unwrap_or(Version::ZERO),
                u16::from_le_bytes([bytes[24], bytes[25]]),
            )
        };

        Ok(Some(Self {
            layout_version,
            phase,
            sub_step: bytes[6],
            flags: bytes[7],
            sequence: read_u32(bytes, 8),
            cursor: u16::from_le_bytes([bytes[12], bytes[13]]),
            sector_count: u16::from_le_bytes([bytes[14], bytes[15]]),
            candidate_version,
            last_error,
        }))
    }

    /// Encode in the legacy v1 layout, as older firmware wrote it
    #[must_use]
    pub fn encode_v1(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0xFFu8; RECORD_SIZE];
        out[0..4].copy_from_slice(&STATUS_MAGIC.to_le_bytes());
        out[4] = 1;
        out[5] = self.phase.as_u8();
        out[6] = self.sub_step;
        out[7] = self.flags;
        out[8..12].copy_from_slice(&self.sequence.to_le_bytes());
        out[12..14].copy_from_slice(&self.cursor.to_le_bytes());
        out[14..16].copy_from_slice(&self.sector_count.to_le_bytes());
        let crc = crc32(&out[..V1_CRC_OFFSET]);
        out[V1_CRC_OFFSET..V1_CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
        out
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::INITIAL
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// =============================================================================
// Store
// =============================================================================

/// Ping-pong record log over the first two sectors of the status area
#[derive(Debug, Clone)]
pub struct StatusStore {
    region: Region,
    page_size: u32,
    active_page: u32,
    next_slot: u32,
    current: StatusRecord,
}

impl StatusStore {
    /// Store over the layout's status area; call [`Self::load`] before use
    #[must_use]
    pub const fn new(layout: &FlashLayout) -> Self {
        Self {
            region: layout.status,
            page_size: layout.sector_size,
            active_page: 0,
            next_slot: 0,
            current: StatusRecord::INITIAL,
        }
    }

    /// Newest committed record
    #[must_use]
    pub const fn current(&self) -> &StatusRecord {
        &self.current
    }

    /// Record slots per page
    #[must_use]
    pub const fn records_per_page(&self) -> u32 {
        self.page_size / RECORD_SIZE as u32
    }

    /// Page holding the newest record
    #[must_use]
    pub const fn active_page(&self) -> u32 {
        self.active_page
    }

    fn page_base(&self, page: u32) -> u32 {
        self.region.base + page * self.page_size
    }

    fn slot_address(&self, page: u32, slot: u32) -> u32 {
        self.page_base(page) + slot * RECORD_SIZE as u32
    }

    /// Rebuild the in-memory state from flash
    ///
    /// A v1 newest record is rewritten in the v2 layout before returning.
    ///
    /// # Errors
    ///
    /// Flash read/write failures, or `UnknownLayout` if any record was
    /// written by newer firmware.
    pub fn load<F: FlashInterface>(&mut self, flash: &mut F) -> Result<StatusRecord, StorageError> {
        let mut newest: Option<(StatusRecord, u32)> = None;
        let mut fill = [0u32; 2];

        for page in 0..2 {
            let mut bytes = [0u8; RECORD_SIZE];
            for slot in 0..self.records_per_page() {
                flash.read(self.slot_address(page, slot), &mut bytes)?;
                if bytes.iter().all(|&b| b == F::ERASED_BYTE) {
                    continue;
                }
                fill[page as usize] = slot + 1;
                if let Some(record) = StatusRecord::decode(&bytes)? {
                    let newer = newest.map_or(true, |(n, _)| record.sequence > n.sequence);
                    if newer {
                        newest = Some((record, page));
                    }
                }
            }
        }

        match newest {
            Some((record, page)) => {
                self.current = record;
                self.active_page = page;
                self.next_slot = fill[page as usize];
            }
            None => {
                self.current = StatusRecord::INITIAL;
                self.active_page = 0;
                self.next_slot = self.records_per_page();
            }
        }

        if self.current.layout_version < LAYOUT_VERSION {
            let migrated = StatusRecord {
                layout_version: LAYOUT_VERSION,
                ..self.current
            };
            self.append(flash, migrated)?;
        }

        Ok(self.current)
    }

    /// Persist `record` as the newest state
    ///
    /// The sequence number is assigned here. When the active page is full,
    /// the other page is erased and the record starts it.
    ///
    /// # Errors
    ///
    /// Flash erase/write failures. The previous record stays authoritative.
    pub fn append<F: FlashInterface>(
        &mut self,
        flash: &mut F,
        record: StatusRecord,
    ) -> Result<(), StorageError> {
        let record = StatusRecord {
            layout_version: LAYOUT_VERSION,
            sequence: self.current.sequence.wrapping_add(1),
            ..record
        };

        let (page, slot) = if self.next_slot < self.records_per_page() {
            (self.active_page, self.next_slot)
        } else {
            let other = self.active_page ^ 1;
            let base = self.page_base(other);
            flash.erase_range(base, base + self.page_size)?;
            (other, 0)
        };

        // Advance past the slot even if the write tears; it is no longer erased.
        self.active_page = page;
        self.next_slot = slot + 1;
        flash.write(self.slot_address(page, slot), &record.encode())?;
        self.current = record;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eb_hal::sim::SimFlash;

    type Flash = SimFlash<0x800, 0x100>;

    fn layout() -> FlashLayout {
        FlashLayout {
            sector_size: 0x100,
            status: Region::new(0x000, 0x200),
            scratch: Region::new(0x200, 0x100),
            primary: Region::new(0x300, 0x200),
            secondary: Region::new(0x500, 0x200),
        }
    }

    fn sample() -> StatusRecord {
        StatusRecord {
            phase: SwapPhase::SwapInProgress,
            sub_step: 2,
            flags: flags::STEP_DONE | flags::PERMANENT,
            sequence: 9,
            cursor: 3,
            sector_count: 4,
            candidate_version: Version::new(1, 2, 3, 4),
            last_error: 0x0402,
            ..StatusRecord::INITIAL
        }
    }

    #[test]
    fn test_encode_layout() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..4], b"TSBE");
        assert_eq!(bytes[4], 2);
        assert_eq!(bytes[5], SwapPhase::SwapInProgress.as_u8());
        assert_eq!(&bytes[12..16], &[3, 0, 4, 0]);
        assert_eq!(&bytes[26..28], &[0xFF, 0xFF]);
        assert_eq!(StatusRecord::decode(&bytes), Ok(Some(sample())));
    }

    #[test]
    fn test_torn_record_ignored() {
        let mut bytes = sample().encode();
        bytes[20..].fill(0xFF);
        assert_eq!(StatusRecord::decode(&bytes), Ok(None));
    }

    fn reseal(bytes: &mut [u8; RECORD_SIZE]) {
        let crc = crc32(&bytes[..V2_CRC_OFFSET]);
        bytes[V2_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn test_newer_layout_rejected() {
        let mut bytes = sample().encode();
        bytes[4] = 3;
        reseal(&mut bytes);
        assert_eq!(StatusRecord::decode(&bytes), Err(StorageError::UnknownLayout));
    }

    #[test]
    fn test_partly_programmed_version_byte_is_torn() {
        for version in [0x03, 0x06, 0x42, 0xFE] {
            let mut bytes = [0xFFu8; RECORD_SIZE];
            bytes[0..4].copy_from_slice(&STATUS_MAGIC.to_le_bytes());
            bytes[4] = version;
            assert_eq!(StatusRecord::decode(&bytes), Ok(None), "version byte {version:#x}");

            // Same header with the rest of the record written but no CRC yet.
            let mut unsealed = sample().encode();
            unsealed[4] = version;
            unsealed[V2_CRC_OFFSET..].fill(0xFF);
            assert_eq!(StatusRecord::decode(&unsealed), Ok(None));
        }
    }

    #[test]
    fn test_torn_slot_after_commit_keeps_previous_state() {
        let mut flash = Flash::new();
        let mut store = StatusStore::new(&layout());
        store.load(&mut flash).unwrap();
        store.append(&mut flash, sample()).unwrap();

        let mut torn = [0xFFu8; RECORD_SIZE];
        torn[0..4].copy_from_slice(&STATUS_MAGIC.to_le_bytes());
        torn[4] = 0x06;
        flash.load(RECORD_SIZE as u32, &torn);

        for _ in 0..3 {
            let mut reloaded = StatusStore::new(&layout());
            let record = reloaded.load(&mut flash).unwrap();
            assert_eq!(record, StatusRecord { sequence: 1, ..sample() });
        }
    }

    #[test]
    fn test_v1_decoded_without_v2_fields() {
        let decoded = StatusRecord::decode(&sample().encode_v1()).unwrap().unwrap();
        assert_eq!(decoded.layout_version, 1);
        assert_eq!(decoded.cursor, 3);
        assert_eq!(decoded.candidate_version, Version::ZERO);
        assert_eq!(decoded.last_error, 0);
    }

    #[test]
    fn test_empty_store_is_initial() {
        let mut flash = Flash::new();
        let mut store = StatusStore::new(&layout());
        assert_eq!(store.load(&mut flash), Ok(StatusRecord::INITIAL));
        assert_eq!(flash.ops(), 0);
    }

    #[test]
    fn test_first_append_erases_and_starts_page() {
        let mut flash = Flash::new();
        let mut store = StatusStore::new(&layout());
        store.load(&mut flash).unwrap();
        store.append(&mut flash, sample()).unwrap();
        assert_eq!(store.current().sequence, 1);

        let mut reloaded = StatusStore::new(&layout());
        let record = reloaded.load(&mut flash).unwrap();
        assert_eq!(record, StatusRecord { sequence: 1, ..sample() });
    }

    #[test]
    fn test_flags() {
        let r = StatusRecord::INITIAL.with_flag(flags::UPGRADE_REQUESTED, true);
        assert!(r.has(flags::UPGRADE_REQUESTED));
        assert!(!r.has(flags::UPGRADE_REQUESTED | flags::PERMANENT));
        assert!(!r.with_flag(flags::UPGRADE_REQUESTED, false).has(flags::UPGRADE_REQUESTED));
    }
}
