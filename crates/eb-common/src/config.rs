// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Build-time boot policy
//!
//! The flash layout, upgrade mode and verification policy are fixed when the
//! bootloader is built. Nothing here is runtime input. A board crate declares
//! its policy as a `const` and passes it through [`BootConfig::checked`], so a
//! malformed layout is a compile error rather than a field failure:
//!
//! ```
//! use eb_common::config::{BootConfig, FlashLayout, Region};
//!
//! const LAYOUT: FlashLayout = FlashLayout {
//!     sector_size: 0x1000,
//!     status: Region::new(0x0000, 0x2000),
//!     scratch: Region::new(0x2000, 0x1000),
//!     primary: Region::new(0x4000, 0x8000),
//!     secondary: Region::new(0xC000, 0x8000),
//! };
//!
//! const CONFIG: BootConfig = BootConfig {
//!     layout: LAYOUT,
//!     max_image_size: 0x8000,
//!     ..BootConfig::DEFAULT
//! }
//! .checked();
//! # assert!(CONFIG.validate().is_ok());
//! ```

use crate::errors::ConfigError;
use crate::types::{AlgorithmId, SlotId};

/// Smallest sector that holds one swap status record
pub const MIN_SECTOR_SIZE: u32 = 32;

/// Most sectors a slot may span; swap cursors are 16-bit
#[allow(clippy::cast_lossless)]
pub const MAX_SLOT_SECTORS: u32 = u16::MAX as u32;

// =============================================================================
// Regions
// =============================================================================

/// A contiguous flash region, addressed absolutely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First byte of the region
    pub base: u32,
    /// Length in bytes
    pub size: u32,
}

impl Region {
    /// Create a region
    #[must_use]
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// One past the last byte, `None` if that overflows the address space
    #[must_use]
    pub const fn checked_end(&self) -> Option<u32> {
        self.base.checked_add(self.size)
    }

    /// One past the last byte
    ///
    /// Saturates; only meaningful for a layout that passed validation.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.base.saturating_add(self.size)
    }

    /// Whether `address` falls inside the region
    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.base && address < self.end()
    }

    /// Whether the two regions share at least one byte
    #[must_use]
    pub const fn overlaps(&self, other: &Region) -> bool {
        self.size != 0 && other.size != 0 && self.base < other.end() && other.base < self.end()
    }

    /// Whether base and size are multiples of `sector_size`
    #[must_use]
    pub const fn is_aligned(&self, sector_size: u32) -> bool {
        sector_size != 0 && self.base % sector_size == 0 && self.size % sector_size == 0
    }

    /// Absolute address of sector `index` within the region
    #[must_use]
    pub const fn sector_address(&self, sector_size: u32, index: u32) -> u32 {
        self.base + index * sector_size
    }
}

// =============================================================================
// Flash Layout
// =============================================================================

/// Placement of the boot slots, scratch area and swap status area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    /// Erase granularity shared by every region
    pub sector_size: u32,
    /// Boot slot
    pub primary: Region,
    /// Update slot
    pub secondary: Region,
    /// Swap scratch area (may be empty in overwrite mode)
    pub scratch: Region,
    /// Swap status record log (two sectors minimum)
    pub status: Region,
}

impl FlashLayout {
    /// Default layout: 8 KiB sectors, two 448 KiB slots above a 64 KiB boot area
    pub const DEFAULT: Self = Self {
        sector_size: 0x2000,
        status: Region::new(0x0801_0000, 0x4000),
        scratch: Region::new(0x0801_4000, 0x2000),
        primary: Region::new(0x0802_0000, 0x0007_0000),
        secondary: Region::new(0x0809_0000, 0x0007_0000),
    };

    /// Region backing a slot
    #[must_use]
    pub const fn region(&self, slot: SlotId) -> Region {
        match slot {
            SlotId::Primary => self.primary,
            SlotId::Secondary => self.secondary,
            SlotId::Scratch => self.scratch,
        }
    }

    /// Number of sectors in each image slot
    #[must_use]
    pub const fn sectors_per_slot(&self) -> u32 {
        if self.sector_size == 0 {
            return 0;
        }
        self.primary.size / self.sector_size
    }

    /// Number of sectors in the status area
    #[must_use]
    pub const fn status_sectors(&self) -> u32 {
        if self.sector_size == 0 {
            return 0;
        }
        self.status.size / self.sector_size
    }

    /// Check the layout invariants
    ///
    /// # Errors
    ///
    /// The first violated invariant, checked in this order: sector size,
    /// scratch placement, address range, alignment, slot sizes, status area
    /// size, overlap.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        let sector = self.sector_size;
        if sector == 0 || !sector.is_power_of_two() {
            return Err(ConfigError::InvalidSectorSize);
        }
        if sector < MIN_SECTOR_SIZE {
            return Err(ConfigError::SectorTooSmall);
        }

        if self.scratch.size != 0 && self.scratch.base == self.primary.base {
            return Err(ConfigError::ScratchIsBootSlot);
        }

        let regions = [self.primary, self.secondary, self.scratch, self.status];

        let mut i = 0;
        while i < regions.len() {
            if regions[i].checked_end().is_none() {
                return Err(ConfigError::RegionOutOfRange);
            }
            if !regions[i].is_aligned(sector) {
                return Err(ConfigError::MisalignedRegion);
            }
            i += 1;
        }

        if self.primary.size == 0 {
            return Err(ConfigError::SlotTooSmall);
        }
        if self.primary.size != self.secondary.size {
            return Err(ConfigError::SlotSizeMismatch);
        }
        if self.sectors_per_slot() > MAX_SLOT_SECTORS {
            return Err(ConfigError::SlotTooLarge);
        }
        if self.status.size < 2 * sector {
            return Err(ConfigError::StatusAreaTooSmall);
        }

        let mut a = 0;
        while a < regions.len() {
            let mut b = a + 1;
            while b < regions.len() {
                if regions[a].overlaps(&regions[b]) {
                    return Err(ConfigError::RegionOverlap);
                }
                b += 1;
            }
            a += 1;
        }

        Ok(())
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// Boot Policy
// =============================================================================

/// How a verified candidate is installed into the boot slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeMode {
    /// Exchange primary and secondary through scratch; supports test and revert
    Swap,
    /// Copy secondary over primary, then erase secondary; the new image is
    /// permanent
    Overwrite,
    /// Nothing is moved: the newest verified image runs from whichever slot
    /// holds it, the other slot is the fallback
    DirectXip,
}

impl UpgradeMode {
    /// Whether images are relocated into the primary slot
    #[must_use]
    pub const fn relocates(self) -> bool {
        !matches!(self, Self::DirectXip)
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::Overwrite => "overwrite",
            Self::DirectXip => "direct-xip",
        }
    }
}

/// Complete build-time boot policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Flash placement
    pub layout: FlashLayout,
    /// Installation strategy
    pub upgrade_mode: UpgradeMode,
    /// Hash algorithm images must declare
    pub hash_algorithm: AlgorithmId,
    /// Signature algorithm images must declare
    pub signature_algorithm: AlgorithmId,
    /// Largest accepted header + body, in bytes
    pub max_image_size: u32,
    /// Re-verify the primary image on every boot, not only after a swap
    pub validate_primary_on_boot: bool,
    /// Revert to the secondary image when the primary fails verification
    pub fallback_on_primary_failure: bool,
    /// Images must carry their public key in the trailer
    pub require_embedded_key: bool,
}

impl BootConfig {
    /// Default policy
    pub const DEFAULT: Self = Self {
        layout: FlashLayout::DEFAULT,
        upgrade_mode: UpgradeMode::Swap,
        hash_algorithm: AlgorithmId::Sha3_256,
        signature_algorithm: AlgorithmId::Falcon512,
        max_image_size: 0x0007_0000,
        validate_primary_on_boot: true,
        fallback_on_primary_failure: false,
        require_embedded_key: false,
    };

    /// Check the policy, including the flash layout
    ///
    /// # Errors
    ///
    /// The first violated invariant.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.layout.validate() {
            return Err(e);
        }

        if matches!(self.upgrade_mode, UpgradeMode::Swap)
            && self.layout.scratch.size < self.layout.sector_size
        {
            return Err(ConfigError::ScratchTooSmall);
        }

        if self.max_image_size == 0 || self.max_image_size > self.layout.primary.size {
            return Err(ConfigError::SlotTooSmall);
        }

        if !self.hash_algorithm.is_hash()
            || !self.hash_algorithm.is_supported()
            || !self.signature_algorithm.is_signature()
            || !self.signature_algorithm.is_supported()
        {
            return Err(ConfigError::UnsupportedAlgorithm);
        }

        Ok(())
    }

    /// Return `self` if valid, otherwise panic
    ///
    /// Intended for `const` items, where the panic becomes a compile error.
    #[must_use]
    pub const fn checked(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => reject(e),
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const fn reject(error: ConfigError) -> ! {
    match error {
        ConfigError::InvalidSectorSize => panic!("boot config: invalid sector size"),
        ConfigError::MisalignedRegion => panic!("boot config: region not sector aligned"),
        ConfigError::RegionOverlap => panic!("boot config: regions overlap"),
        ConfigError::SlotSizeMismatch => panic!("boot config: slot sizes differ"),
        ConfigError::SlotTooSmall => panic!("boot config: slot too small"),
        ConfigError::ScratchTooSmall => panic!("boot config: scratch too small"),
        ConfigError::ScratchIsBootSlot => panic!("boot config: scratch is the boot slot"),
        ConfigError::StatusAreaTooSmall => panic!("boot config: status area too small"),
        ConfigError::UnsupportedAlgorithm => panic!("boot config: unsupported algorithm"),
        ConfigError::RegionOutOfRange => panic!("boot config: region exceeds address space"),
        ConfigError::SectorTooSmall => panic!("boot config: sector smaller than a status record"),
        ConfigError::SlotTooLarge => panic!("boot config: slot has too many sectors"),
    }
}

const _: () = assert!(BootConfig::DEFAULT.validate().is_ok());
