// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Image Descriptor Parser
//!
//! Decodes the fixed header and the variable trailer that frame every image.
//! Parsing is pure: it works on byte slices the caller has already read.
//!
//! # Image layout
//!
//! ```text
//! ┌────────────────┬─────────────────────┬──────────────────────────┐
//! │ header (64 B)  │ body (image_size)   │ trailer (trailer_size)   │
//! └────────────────┴─────────────────────┴──────────────────────────┘
//! 0          header_size      header_size + image_size
//! ```
//!
//! # Header (little-endian)
//!
//! ```text
//! Offset  Size  Field
//! 0x00    4     Magic "EBIM"
//! 0x04    1     Format version
//! 0x05    1     Flags
//! 0x06    2     Header size
//! 0x08    4     Image size (body only)
//! 0x0C    4     Load address
//! 0x10    4     Entry point offset into the body
//! 0x14    8     Version
//! 0x1C    2     Hash algorithm
//! 0x1E    2     Signature algorithm
//! 0x20    4     Trailer size
//! 0x24    24    Reserved
//! 0x3C    4     CRC-32 over 0x00..0x3C
//! ```
//!
//! # Trailer
//!
//! ```text
//! 0x00    4     Magic "EBTR"
//! 0x04    2     Hash length
//! 0x06    2     Signature length
//! 0x08    2     Embedded key length (0 = none)
//! 0x0A    2     Reserved
//! 0x0C    ..    hash ‖ key ‖ signature
//! ```

use eb_common::{crc32, AlgorithmId, ParseError, Version};
use eb_crypto::falcon::{FALCON_512_PK_SIZE, FALCON_512_SIG_SIZE};
use eb_swap::HeaderInspector;
use heapless::Vec;

/// Header magic, "EBIM" in little-endian
pub const IMAGE_MAGIC: u32 = 0x4D49_4245;

/// Trailer magic, "EBTR" in little-endian
pub const TRAILER_MAGIC: u32 = 0x5254_4245;

/// Current image format version
pub const IMAGE_FORMAT_VERSION: u8 = 1;

/// Fixed header size
pub const HEADER_SIZE: usize = 64;

/// Trailer preamble size
pub const TRAILER_PREAMBLE_SIZE: usize = 12;

/// Largest hash a trailer may carry
pub const MAX_HASH_LEN: usize = 64;

/// Largest signature a trailer may carry
pub const MAX_SIGNATURE_LEN: usize = FALCON_512_SIG_SIZE;

/// Largest embedded key a trailer may carry
pub const MAX_KEY_LEN: usize = FALCON_512_PK_SIZE;

/// Largest trailer this build accepts
pub const MAX_TRAILER_SIZE: usize =
    TRAILER_PREAMBLE_SIZE + MAX_HASH_LEN + MAX_KEY_LEN + MAX_SIGNATURE_LEN;

const CRC_OFFSET: usize = HEADER_SIZE - 4;

/// Image header flags
pub mod flags {
    /// Body is encrypted
    pub const ENCRYPTED: u8 = 1 << 0;
    /// Image was confirmed before it was packaged
    pub const CONFIRMED: u8 = 1 << 1;
    /// Image expects a test boot
    pub const TEST_PENDING: u8 = 1 << 2;
}

fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ============================================================================
// Header
// ============================================================================

/// Validated fixed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Format version
    pub format_version: u8,
    /// Flag bits, see [`flags`]
    pub flags: u8,
    /// Bytes from the start of the image to the body
    pub header_size: u16,
    /// Body size
    pub image_size: u32,
    /// Address the image runs at
    pub load_address: u32,
    /// Entry point offset into the body
    pub entry_offset: u32,
    /// Image version
    pub version: Version,
    /// Measurement algorithm
    pub hash_algorithm: AlgorithmId,
    /// Signature algorithm
    pub signature_algorithm: AlgorithmId,
    /// Trailer size
    pub trailer_size: u32,
}

impl ImageHeader {
    /// Whether every bit in `mask` is set
    #[must_use]
    pub const fn has_flag(&self, mask: u8) -> bool {
        self.flags & mask == mask
    }

    /// Offset of the trailer from the image start
    #[must_use]
    pub const fn trailer_offset(&self) -> u32 {
        self.header_size as u32 + self.image_size
    }

    /// Bytes covered by the measurement (header and body)
    #[must_use]
    pub const fn signed_len(&self) -> u32 {
        self.trailer_offset()
    }

    /// Header, body and trailer
    #[must_use]
    pub const fn total_size(&self) -> u32 {
        self.trailer_offset() + self.trailer_size
    }

    /// Absolute entry point once loaded
    #[must_use]
    pub const fn entry_point(&self) -> u32 {
        self.load_address.wrapping_add(self.entry_offset)
    }

    /// Serialize, computing the header CRC
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0xFFu8; HEADER_SIZE];
        out[0x00..0x04].copy_from_slice(&IMAGE_MAGIC.to_le_bytes());
        out[0x04] = self.format_version;
        out[0x05] = self.flags;
        out[0x06..0x08].copy_from_slice(&self.header_size.to_le_bytes());
        out[0x08..0x0C].copy_from_slice(&self.image_size.to_le_bytes());
        out[0x0C..0x10].copy_from_slice(&self.load_address.to_le_bytes());
        out[0x10..0x14].copy_from_slice(&self.entry_offset.to_le_bytes());
        out[0x14..0x1C].copy_from_slice(&self.version.to_bytes());
        out[0x1C..0x1E].copy_from_slice(&self.hash_algorithm.as_u16().to_le_bytes());
        out[0x1E..0x20].copy_from_slice(&self.signature_algorithm.as_u16().to_le_bytes());
        out[0x20..0x24].copy_from_slice(&self.trailer_size.to_le_bytes());
        let crc = crc32(&out[..CRC_OFFSET]);
        out[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode a trailer read from [`Self::trailer_offset`]
    ///
    /// # Errors
    ///
    /// - `Truncated` if fewer than `trailer_size` bytes are given
    /// - `BadTrailer` for a wrong magic, lengths that do not add up to
    ///   `trailer_size`, or a field larger than this build supports
    pub fn parse_trailer(&self, trailer: &[u8]) -> Result<ImageDescriptor, ParseError> {
        let size = self.trailer_size as usize;
        if trailer.len() < size {
            return Err(ParseError::Truncated);
        }
        let trailer = &trailer[..size];
        if size < TRAILER_PREAMBLE_SIZE || le_u32(trailer, 0) != TRAILER_MAGIC {
            return Err(ParseError::BadTrailer);
        }

        let hash_len = usize::from(le_u16(trailer, 4));
        let sig_len = usize::from(le_u16(trailer, 6));
        let key_len = usize::from(le_u16(trailer, 8));

        if hash_len == 0
            || hash_len > MAX_HASH_LEN
            || sig_len == 0
            || sig_len > MAX_SIGNATURE_LEN
            || key_len > MAX_KEY_LEN
            || TRAILER_PREAMBLE_SIZE + hash_len + key_len + sig_len != size
        {
            return Err(ParseError::BadTrailer);
        }

        let hash_start = TRAILER_PREAMBLE_SIZE;
        let key_start = hash_start + hash_len;
        let sig_start = key_start + key_len;

        let hash = Vec::from_slice(&trailer[hash_start..key_start])
            .map_err(|()| ParseError::BadTrailer)?;
        let public_key = if key_len == 0 {
            None
        } else {
            Some(
                Vec::from_slice(&trailer[key_start..sig_start])
                    .map_err(|()| ParseError::BadTrailer)?,
            )
        };
        let signature =
            Vec::from_slice(&trailer[sig_start..]).map_err(|()| ParseError::BadTrailer)?;

        Ok(ImageDescriptor {
            header: *self,
            hash,
            public_key,
            signature,
        })
    }
}

/// Decode and validate the fixed header
///
/// Checks run in order: length, magic, CRC, format version, flags, sizes,
/// entry point.
///
/// # Errors
///
/// - `Truncated` for fewer than [`HEADER_SIZE`] bytes or a `header_size`
///   smaller than the fixed header
/// - `BadMagic`, `HeaderChecksum`, `UnsupportedFormat`
/// - `ConflictingFlags` if both `CONFIRMED` and `TEST_PENDING` are set
/// - `SizeOverflow` if header, body and trailer exceed `slot_capacity`
/// - `BadEntryPoint` if the entry offset lies outside the body
pub fn parse_header(bytes: &[u8], slot_capacity: u32) -> Result<ImageHeader, ParseError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ParseError::Truncated);
    }
    let bytes = &bytes[..HEADER_SIZE];

    if le_u32(bytes, 0x00) != IMAGE_MAGIC {
        return Err(ParseError::BadMagic);
    }
    if le_u32(bytes, CRC_OFFSET) != crc32(&bytes[..CRC_OFFSET]) {
        return Err(ParseError::HeaderChecksum);
    }

    let header = ImageHeader {
        format_version: bytes[0x04],
        flags: bytes[0x05],
        header_size: le_u16(bytes, 0x06),
        image_size: le_u32(bytes, 0x08),
        load_address: le_u32(bytes, 0x0C),
        entry_offset: le_u32(bytes, 0x10),
        version: Version::from_bytes(&bytes[0x14..0x1C]).ok_or(ParseError::Truncated)?,
        hash_algorithm: AlgorithmId::from_u16(le_u16(bytes, 0x1C)),
        signature_algorithm: AlgorithmId::from_u16(le_u16(bytes, 0x1E)),
        trailer_size: le_u32(bytes, 0x20),
    };

    if header.format_version != IMAGE_FORMAT_VERSION {
        return Err(ParseError::UnsupportedFormat);
    }
    if header.has_flag(flags::CONFIRMED | flags::TEST_PENDING) {
        return Err(ParseError::ConflictingFlags);
    }
    if usize::from(header.header_size) < HEADER_SIZE {
        return Err(ParseError::Truncated);
    }

    let total = u32::from(header.header_size)
        .checked_add(header.image_size)
        .and_then(|n| n.checked_add(header.trailer_size))
        .ok_or(ParseError::SizeOverflow)?;
    if total > slot_capacity || header.trailer_size as usize > MAX_TRAILER_SIZE {
        return Err(ParseError::SizeOverflow);
    }

    if header.entry_offset >= header.image_size {
        return Err(ParseError::BadEntryPoint);
    }

    Ok(header)
}

// ============================================================================
// Descriptor
// ============================================================================

/// Header plus trailer of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Fixed header
    pub header: ImageHeader,
    /// Expected measurement
    pub hash: Vec<u8, MAX_HASH_LEN>,
    /// Key the image claims to be signed with
    pub public_key: Option<Vec<u8, MAX_KEY_LEN>>,
    /// Signature over the measurement
    pub signature: Vec<u8, MAX_SIGNATURE_LEN>,
}

impl ImageDescriptor {
    /// Image version
    #[must_use]
    pub fn version(&self) -> Version {
        self.header.version
    }

    /// Offset of the trailer from the image start
    #[must_use]
    pub fn trailer_offset(&self) -> u32 {
        self.header.trailer_offset()
    }

    /// Trailer size
    #[must_use]
    pub fn trailer_size(&self) -> u32 {
        self.header.trailer_size
    }
}

/// Parse header and trailer from one buffer spanning the whole image
///
/// # Errors
///
/// Any [`parse_header`] error, `Truncated` if the buffer ends before the
/// trailer does, or a trailer error.
pub fn parse(raw: &[u8], slot_capacity: u32) -> Result<ImageDescriptor, ParseError> {
    let header = parse_header(raw, slot_capacity)?;
    let start = header.trailer_offset() as usize;
    let trailer = raw.get(start..).ok_or(ParseError::Truncated)?;
    header.parse_trailer(trailer)
}

/// Structural header check used by slot classification
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHeaderInspector;

impl HeaderInspector for ImageHeaderInspector {
    const HEADER_LEN: usize = HEADER_SIZE;

    fn is_well_formed(&self, header: &[u8], capacity: u32) -> bool {
        parse_header(header, capacity).is_ok()
    }
}
