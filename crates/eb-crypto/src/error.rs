// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Crypto failures and how the verifier reads them

use core::fmt;
use eb_common::{Error, RejectReason};

/// Failure inside a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes have the wrong length or do not decode
    InvalidKey,
    /// Signature length is outside what the scheme can produce
    InvalidSignature,
    /// Entropy source reported an error
    RngFailure,
    /// Scheme not built into this image
    UnsupportedAlgorithm,
}

impl CryptoError {
    /// Stable numeric code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidKey => 0x0701,
            Self::InvalidSignature => 0x0702,
            Self::RngFailure => 0x0703,
            Self::UnsupportedAlgorithm => 0x0704,
        }
    }

    /// Short description for logs
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "key does not decode",
            Self::InvalidSignature => "signature length out of range",
            Self::RngFailure => "entropy source failed",
            Self::UnsupportedAlgorithm => "scheme not available",
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

/// Material that cannot be decoded never authenticates an image
impl From<CryptoError> for RejectReason {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::UnsupportedAlgorithm => Self::UnsupportedAlgorithm,
            CryptoError::InvalidKey | CryptoError::InvalidSignature | CryptoError::RngFailure => {
                Self::SignatureInvalid
            }
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Self::Trust(e.into())
    }
}

/// Result alias for eb-crypto
pub type CryptoResult<T> = Result<T, CryptoError>;
