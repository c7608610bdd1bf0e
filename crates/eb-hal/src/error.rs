// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;
use eb_common::{Error, StorageError};

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Platform bring-up returned a non-zero status
    InitFailed(u8),
    /// Flash read failed
    FlashReadFailed,
    /// Flash write failed
    FlashWriteFailed,
    /// Flash erase failed
    FlashEraseFailed,
    /// Flash verify failed
    FlashVerifyFailed,
    /// Flash address out of bounds
    FlashOutOfBounds,
    /// Address not aligned to the sector or write granularity
    FlashMisaligned,
    /// Flash is locked
    FlashLocked,
    /// Busy flag did not clear within the poll budget
    Timeout,
    /// Supply lost during the operation; contents may be torn
    PowerLoss,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InitFailed(_) => 0x0802,
            Self::FlashReadFailed => 0x0810,
            Self::FlashWriteFailed => 0x0811,
            Self::FlashEraseFailed => 0x0812,
            Self::FlashVerifyFailed => 0x0813,
            Self::FlashOutOfBounds => 0x0814,
            Self::FlashMisaligned => 0x0815,
            Self::FlashLocked => 0x0816,
            Self::Timeout => 0x08F1,
            Self::PowerLoss => 0x08D1,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InitFailed(_) => "platform initialization failed",
            Self::FlashReadFailed => "flash read failed",
            Self::FlashWriteFailed => "flash write failed",
            Self::FlashEraseFailed => "flash erase failed",
            Self::FlashVerifyFailed => "flash verify failed",
            Self::FlashOutOfBounds => "flash address out of bounds",
            Self::FlashMisaligned => "flash address misaligned",
            Self::FlashLocked => "flash locked",
            Self::Timeout => "flash operation timeout",
            Self::PowerLoss => "power lost during flash operation",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for StorageError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::FlashReadFailed | HalError::InitFailed(_) => Self::ReadFailed,
            HalError::FlashWriteFailed | HalError::FlashLocked | HalError::PowerLoss => {
                Self::WriteFailed
            }
            HalError::FlashEraseFailed => Self::EraseFailed,
            HalError::FlashVerifyFailed => Self::VerifyFailed,
            HalError::FlashOutOfBounds => Self::OutOfBounds,
            HalError::FlashMisaligned => Self::Misaligned,
            HalError::Timeout => Self::Timeout,
        }
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InitFailed(status) => Self::Platform(status),
            other => Self::Storage(other.into()),
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
