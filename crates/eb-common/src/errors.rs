// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for EdgeBoot
//!
//! The boot error taxonomy. Every failure that can influence which image
//! receives control maps onto exactly one category, and the category decides
//! how the orchestrator reacts:
//!
//! | Category  | Codes  | Reaction                                            |
//! |-----------|--------|-----------------------------------------------------|
//! | Config    | 0x01xx | Fatal, ideally rejected at build time               |
//! | Parse     | 0x02xx | Reject candidate, keep running current image        |
//! | Trust     | 0x03xx | Reject candidate, never boot it                     |
//! | Storage   | 0x04xx | Halt this attempt, resume from persisted state      |
//! | Logic     | 0x05xx | Invariant violated, fatal                           |
//! | Platform  | 0x06xx | Platform init reported a failure status             |
//!
//! All errors are `Copy` and carry no heap data.

use core::fmt;

/// Result type alias for EdgeBoot operations
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Config Errors (0x01xx)
// =============================================================================

/// Malformed build-time policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Sector size is zero or not a power of two
    InvalidSectorSize,
    /// A region base or size is not sector aligned
    MisalignedRegion,
    /// Two flash regions overlap
    RegionOverlap,
    /// Primary and secondary slots differ in size
    SlotSizeMismatch,
    /// A slot is empty or cannot hold the maximum image
    SlotTooSmall,
    /// Scratch region is smaller than one sector
    ScratchTooSmall,
    /// Scratch region coincides with the boot slot
    ScratchIsBootSlot,
    /// Status area is smaller than two sectors
    StatusAreaTooSmall,
    /// Selected algorithm is not available in this build
    UnsupportedAlgorithm,
    /// Region end does not fit the 32-bit address space
    RegionOutOfRange,
    /// Sector cannot hold one status record
    SectorTooSmall,
    /// Slot has more sectors than a swap cursor can count
    SlotTooLarge,
}

impl ConfigError {
    /// Index within the category
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::InvalidSectorSize => 0x01,
            Self::MisalignedRegion => 0x02,
            Self::RegionOverlap => 0x03,
            Self::SlotSizeMismatch => 0x04,
            Self::SlotTooSmall => 0x05,
            Self::ScratchTooSmall => 0x06,
            Self::ScratchIsBootSlot => 0x07,
            Self::StatusAreaTooSmall => 0x08,
            Self::UnsupportedAlgorithm => 0x09,
            Self::RegionOutOfRange => 0x0A,
            Self::SectorTooSmall => 0x0B,
            Self::SlotTooLarge => 0x0C,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidSectorSize => "Sector size must be a non-zero power of two",
            Self::MisalignedRegion => "Flash region is not sector aligned",
            Self::RegionOverlap => "Flash regions overlap",
            Self::SlotSizeMismatch => "Primary and secondary slot sizes differ",
            Self::SlotTooSmall => "Slot cannot hold the maximum image size",
            Self::ScratchTooSmall => "Scratch region smaller than one sector",
            Self::ScratchIsBootSlot => "Scratch region is the boot slot",
            Self::StatusAreaTooSmall => "Status area needs at least two sectors",
            Self::UnsupportedAlgorithm => "Algorithm not available in this build",
            Self::RegionOutOfRange => "Flash region exceeds address space",
            Self::SectorTooSmall => "Sector smaller than a status record",
            Self::SlotTooLarge => "Slot exceeds 65535 sectors",
        }
    }
}

// =============================================================================
// Parse Errors (0x02xx)
// =============================================================================

/// Malformed image metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Header magic does not match
    BadMagic,
    /// Buffer ends before the declared structure
    Truncated,
    /// Declared sizes exceed the slot or overflow
    SizeOverflow,
    /// Trailer magic or lengths are malformed
    BadTrailer,
    /// Header format version is newer than this parser
    UnsupportedFormat,
    /// Header CRC does not match its contents
    HeaderChecksum,
    /// Flags that cannot be set together
    ConflictingFlags,
    /// Entry point lies outside the image
    BadEntryPoint,
}

impl ParseError {
    /// Index within the category
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::BadMagic => 0x01,
            Self::Truncated => 0x02,
            Self::SizeOverflow => 0x03,
            Self::BadTrailer => 0x04,
            Self::UnsupportedFormat => 0x05,
            Self::HeaderChecksum => 0x06,
            Self::ConflictingFlags => 0x07,
            Self::BadEntryPoint => 0x08,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::BadMagic => "Image header magic mismatch",
            Self::Truncated => "Image metadata truncated",
            Self::SizeOverflow => "Image sizes exceed slot capacity",
            Self::BadTrailer => "Image trailer malformed",
            Self::UnsupportedFormat => "Image format version not supported",
            Self::HeaderChecksum => "Image header checksum mismatch",
            Self::ConflictingFlags => "Image flags conflict",
            Self::BadEntryPoint => "Entry point outside image",
        }
    }
}

// =============================================================================
// Trust Errors (0x03xx)
// =============================================================================

/// Why the trust verifier rejected an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RejectReason {
    /// Measured hash differs from the descriptor hash
    HashMismatch,
    /// Signature does not verify under the trust anchor
    SignatureInvalid,
    /// Image version is below the anchor's minimum
    RollbackBlocked,
    /// Hash or signature algorithm (or encryption) not supported
    UnsupportedAlgorithm,
}

impl RejectReason {
    /// Index within the category
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::HashMismatch => 0x01,
            Self::SignatureInvalid => 0x02,
            Self::RollbackBlocked => 0x03,
            Self::UnsupportedAlgorithm => 0x04,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::HashMismatch => "Image hash mismatch",
            Self::SignatureInvalid => "Image signature invalid",
            Self::RollbackBlocked => "Image version below minimum (rollback blocked)",
            Self::UnsupportedAlgorithm => "Image algorithm not supported",
        }
    }
}

// =============================================================================
// Storage Errors (0x04xx)
// =============================================================================

/// Flash I/O failure or unreadable persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    /// Flash read failed
    ReadFailed,
    /// Flash program failed
    WriteFailed,
    /// Flash erase failed
    EraseFailed,
    /// Flash did not complete within the device timeout
    Timeout,
    /// Access outside the device or region
    OutOfBounds,
    /// Address or length violates write granularity
    Misaligned,
    /// Status record uses a layout newer than this firmware
    UnknownLayout,
    /// Read-back after programming differs
    VerifyFailed,
}

impl StorageError {
    /// Index within the category
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::ReadFailed => 0x01,
            Self::WriteFailed => 0x02,
            Self::EraseFailed => 0x03,
            Self::Timeout => 0x04,
            Self::OutOfBounds => 0x05,
            Self::Misaligned => 0x06,
            Self::UnknownLayout => 0x07,
            Self::VerifyFailed => 0x08,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ReadFailed => "Flash read failed",
            Self::WriteFailed => "Flash write failed",
            Self::EraseFailed => "Flash erase failed",
            Self::Timeout => "Flash operation timed out",
            Self::OutOfBounds => "Flash access out of bounds",
            Self::Misaligned => "Flash access misaligned",
            Self::UnknownLayout => "Status record layout unknown",
            Self::VerifyFailed => "Flash read-back mismatch",
        }
    }
}

// =============================================================================
// Logic Errors (0x05xx)
// =============================================================================

/// Invariant violation inside the boot core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogicError {
    /// More than one slot would hold an update candidate
    MultipleCandidates,
    /// The scratch slot was asked to act as a boot slot
    ScratchAsBootSlot,
    /// Requested phase transition is not allowed from the current phase
    InvalidTransition,
    /// Swap requested without an update candidate
    NoCandidate,
    /// Persisted cursor lies outside the swap range
    CursorOutOfRange,
}

impl LogicError {
    /// Index within the category
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::MultipleCandidates => 0x01,
            Self::ScratchAsBootSlot => 0x02,
            Self::InvalidTransition => 0x03,
            Self::NoCandidate => 0x04,
            Self::CursorOutOfRange => 0x05,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::MultipleCandidates => "More than one update candidate",
            Self::ScratchAsBootSlot => "Scratch slot used as boot slot",
            Self::InvalidTransition => "Invalid swap phase transition",
            Self::NoCandidate => "No update candidate",
            Self::CursorOutOfRange => "Swap cursor out of range",
        }
    }
}

// =============================================================================
// Unified Error
// =============================================================================

/// Error category, used to decide the orchestrator's reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Build-time policy
    Config = 0x01,
    /// Image metadata
    Parse = 0x02,
    /// Image authenticity
    Trust = 0x03,
    /// Flash and persisted state
    Storage = 0x04,
    /// Internal invariants
    Logic = 0x05,
    /// Platform bring-up
    Platform = 0x06,
}

/// Unified error type for EdgeBoot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Malformed build-time policy
    Config(ConfigError),
    /// Malformed image metadata
    Parse(ParseError),
    /// Image rejected by the trust verifier
    Trust(RejectReason),
    /// Flash or persisted state failure
    Storage(StorageError),
    /// Invariant violation
    Logic(LogicError),
    /// Platform init returned a non-zero status
    Platform(u8),
}

impl Error {
    /// Category of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Parse(_) => ErrorCategory::Parse,
            Self::Trust(_) => ErrorCategory::Trust,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Logic(_) => ErrorCategory::Logic,
            Self::Platform(_) => ErrorCategory::Platform,
        }
    }

    /// Get the error code for this error
    ///
    /// The high byte is the category, the low byte the variant.
    #[must_use]
    pub const fn code(&self) -> u16 {
        let low = match self {
            Self::Config(e) => e.code(),
            Self::Parse(e) => e.code(),
            Self::Trust(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Logic(e) => e.code(),
            Self::Platform(status) => *status,
        };
        ((self.category() as u16) << 8) | low as u16
    }

    /// Get a human-readable description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Config(e) => e.description(),
            Self::Parse(e) => e.description(),
            Self::Trust(e) => e.description(),
            Self::Storage(e) => e.description(),
            Self::Logic(e) => e.description(),
            Self::Platform(_) => "Platform initialisation failed",
        }
    }

    /// Whether the orchestrator may keep running the currently installed image
    ///
    /// Only candidate-image failures qualify. Storage, logic, config and
    /// platform errors stop the boot attempt.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Trust(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RejectReason> for Error {
    fn from(e: RejectReason) -> Self {
        Self::Trust(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<LogicError> for Error {
    fn from(e: LogicError) -> Self {
        Self::Logic(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_carry_category() {
        assert_eq!(Error::Config(ConfigError::RegionOverlap).code(), 0x0103);
        assert_eq!(Error::Parse(ParseError::BadMagic).code(), 0x0201);
        assert_eq!(Error::Trust(RejectReason::RollbackBlocked).code(), 0x0303);
        assert_eq!(Error::Storage(StorageError::Timeout).code(), 0x0404);
        assert_eq!(Error::Logic(LogicError::MultipleCandidates).code(), 0x0501);
        assert_eq!(Error::Platform(7).code(), 0x0607);
    }

    #[test]
    fn test_recoverable_only_for_candidate_failures() {
        assert!(Error::Parse(ParseError::Truncated).is_recoverable());
        assert!(Error::Trust(RejectReason::HashMismatch).is_recoverable());
        assert!(!Error::Storage(StorageError::WriteFailed).is_recoverable());
        assert!(!Error::Logic(LogicError::InvalidTransition).is_recoverable());
        assert!(!Error::Config(ConfigError::SlotTooSmall).is_recoverable());
    }

    #[test]
    fn test_from_conversions() {
        let e: Error = ParseError::BadTrailer.into();
        assert_eq!(e.category(), ErrorCategory::Parse);
        let e: Error = StorageError::EraseFailed.into();
        assert_eq!(e, Error::Storage(StorageError::EraseFailed));
    }
}
