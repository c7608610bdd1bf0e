// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! CRC-32 engine
//!
//! CRC-32/IEEE 802.3 (reflected polynomial `0xEDB8_8320`, register initialised
//! to `0xFFFF_FFFF`, output inverted). Used for integrity of non-adversarial
//! metadata only: image header checksums and swap status commit markers.
//! It is never a security boundary; image authenticity is the trust verifier's job.

/// Reflected IEEE polynomial
const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Register value before any byte is processed
pub const CRC32_INIT: u32 = 0xFFFF_FFFF;

/// CRC of the empty buffer: the inverted initialisation constant
pub const CRC32_EMPTY: u32 = !CRC32_INIT;

/// Lookup table generated at compile time
const CRC32_TABLE: [u32; 256] = generate_crc32_table();

/// Compute the CRC-32 of `data` in one shot
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

/// Incremental CRC-32, for checksums computed across chunked flash reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Start a new checksum
    #[must_use]
    pub const fn new() -> Self {
        Self { state: CRC32_INIT }
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.state;
        for &byte in data {
            let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
            crc = (crc >> 8) ^ CRC32_TABLE[index];
        }
        self.state = crc;
    }

    /// Finish and return the checksum
    #[must_use]
    pub const fn finalize(self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate CRC32 lookup table at compile time
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_value() {
        // Standard check value for CRC-32/IEEE
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(crc32(b""), CRC32_EMPTY);
        assert_eq!(CRC32_EMPTY, 0);
    }

    #[test]
    fn test_crc32_incremental_matches_oneshot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        for chunk in data.chunks(7) {
            crc.update(chunk);
        }
        assert_eq!(crc.finalize(), crc32(data));
        assert_eq!(crc32(data), 0x414F_A339);
    }

    #[test]
    fn test_table_spot_checks() {
        assert_eq!(CRC32_TABLE[0], 0);
        assert_eq!(CRC32_TABLE[1], 0x7707_3096);
        assert_eq!(CRC32_TABLE[255], 0x2D02_EF8D);
    }
}
