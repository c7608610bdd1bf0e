// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common identifiers shared across EdgeBoot crates

use crate::config::UpgradeMode;
use core::fmt;

/// Cryptographic algorithm identifier as encoded in image headers
///
/// Wire values follow the Qbitel algorithm registry. Only
/// [`AlgorithmId::Sha3_256`] and [`AlgorithmId::Falcon512`] are verifiable
/// by this build; the others are recognised so that images using them are
/// rejected as unsupported rather than malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AlgorithmId {
    /// ML-DSA-65 (Dilithium3)
    Dilithium3 = 0x11,
    /// FN-DSA-512 (Falcon-512)
    Falcon512 = 0x20,
    /// ECDSA with P-256 curve
    EcdsaP256 = 0x80,
    /// Ed25519 signature scheme
    Ed25519 = 0x82,
    /// SHA3-256
    Sha3_256 = 0xA0,
    /// SHA3-512
    Sha3_512 = 0xA2,
    /// SHA-256
    Sha256 = 0xA8,
    /// Unrecognised identifier
    Unknown = 0xFFFF,
}

impl AlgorithmId {
    /// Decode a wire value
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            0x11 => Self::Dilithium3,
            0x20 => Self::Falcon512,
            0x80 => Self::EcdsaP256,
            0x82 => Self::Ed25519,
            0xA0 => Self::Sha3_256,
            0xA2 => Self::Sha3_512,
            0xA8 => Self::Sha256,
            _ => Self::Unknown,
        }
    }

    /// Wire value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether this is a hash algorithm
    #[must_use]
    pub const fn is_hash(self) -> bool {
        matches!(self, Self::Sha3_256 | Self::Sha3_512 | Self::Sha256)
    }

    /// Whether this is a signature algorithm
    #[must_use]
    pub const fn is_signature(self) -> bool {
        matches!(
            self,
            Self::Dilithium3 | Self::Falcon512 | Self::EcdsaP256 | Self::Ed25519
        )
    }

    /// Whether this build can verify the algorithm
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Sha3_256 | Self::Falcon512)
    }

    /// Algorithm name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dilithium3 => "ML-DSA-65",
            Self::Falcon512 => "FN-DSA-512",
            Self::EcdsaP256 => "ECDSA-P256",
            Self::Ed25519 => "Ed25519",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_512 => "SHA3-512",
            Self::Sha256 => "SHA-256",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flash slot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SlotId {
    /// Boot slot: the image that executes
    Primary = 0,
    /// Update slot: download target and rollback copy
    Secondary = 1,
    /// Swap scratch area
    Scratch = 2,
}

impl SlotId {
    /// All slots in scan order
    pub const ALL: [SlotId; 3] = [SlotId::Primary, SlotId::Secondary, SlotId::Scratch];

    /// Index into per-slot tables
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether images in this slot may be handed control under `mode`
    #[must_use]
    pub const fn is_bootable(self, mode: UpgradeMode) -> bool {
        match self {
            Self::Primary => true,
            Self::Secondary => matches!(mode, UpgradeMode::DirectXip),
            Self::Scratch => false,
        }
    }

    /// Slot name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Scratch => "scratch",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_roundtrip_known_values() {
        for alg in [
            AlgorithmId::Dilithium3,
            AlgorithmId::Falcon512,
            AlgorithmId::EcdsaP256,
            AlgorithmId::Ed25519,
            AlgorithmId::Sha3_256,
            AlgorithmId::Sha3_512,
            AlgorithmId::Sha256,
        ] {
            assert_eq!(AlgorithmId::from_u16(alg.as_u16()), alg);
        }
        assert_eq!(AlgorithmId::from_u16(0x1234), AlgorithmId::Unknown);
    }

    #[test]
    fn test_only_sha3_and_falcon_supported() {
        assert!(AlgorithmId::Sha3_256.is_supported());
        assert!(AlgorithmId::Falcon512.is_supported());
        assert!(!AlgorithmId::EcdsaP256.is_supported());
        assert!(!AlgorithmId::Unknown.is_supported());
    }

    #[test]
    fn test_bootable_slots_per_mode() {
        for mode in [UpgradeMode::Swap, UpgradeMode::Overwrite] {
            assert!(SlotId::Primary.is_bootable(mode));
            assert!(!SlotId::Secondary.is_bootable(mode));
            assert!(!SlotId::Scratch.is_bootable(mode));
        }
        assert!(SlotId::Secondary.is_bootable(UpgradeMode::DirectXip));
        assert!(!SlotId::Scratch.is_bootable(UpgradeMode::DirectXip));
    }
}
