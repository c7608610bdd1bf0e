// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Image version
//!
//! Versions are compared for monotonic ordering to block rollback.
//! The comparison order is: major > minor > revision > build.

use core::fmt;

/// Image version as carried in the image header
///
/// Wire format (8 bytes, little-endian): major(1) minor(1) revision(2) build(4).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major version (breaking changes)
    pub major: u8,
    /// Minor version (new features)
    pub minor: u8,
    /// Revision (bug fixes)
    pub revision: u16,
    /// Build number
    pub build: u32,
}

impl Version {
    /// Encoded size in bytes
    pub const SIZE: usize = 8;

    /// Version 0.0.0+0
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Create a new version
    #[must_use]
    pub const fn new(major: u8, minor: u8, revision: u16, build: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            build,
        }
    }

    /// Decode from the 8-byte wire format
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            major: bytes[0],
            minor: bytes[1],
            revision: u16::from_le_bytes([bytes[2], bytes[3]]),
            build: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Encode to the 8-byte wire format
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.major;
        out[1] = self.minor;
        out[2..4].copy_from_slice(&self.revision.to_le_bytes());
        out[4..8].copy_from_slice(&self.build.to_le_bytes());
        out
    }

    /// Check if this version is at least `minimum`
    #[must_use]
    pub fn satisfies_minimum(&self, minimum: &Self) -> bool {
        self >= minimum
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}+{}",
            self.major, self.minor, self.revision, self.build
        )
    }
}
