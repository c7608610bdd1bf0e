// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SHA3-256 image measurement
//!
//! Wraps the `sha3` crate behind the [`Hash`] trait. Images are measured
//! incrementally, chunk by chunk, as they are read out of flash.

use crate::traits::{constant_time_eq, Hash};
use eb_common::AlgorithmId;
use sha3::{Digest, Sha3_256 as Sha3_256Impl};

/// Digest length in bytes
pub const DIGEST_LEN: usize = 32;

/// SHA3-256 hash output
#[derive(Clone, Copy)]
pub struct Sha3_256Output([u8; DIGEST_LEN]);

impl Sha3_256Output {
    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Constant-time comparison against an encoded digest of any length
    #[must_use]
    pub fn ct_matches(&self, other: &[u8]) -> bool {
        constant_time_eq(&self.0, other)
    }
}

/// Equality is constant-time
impl PartialEq for Sha3_256Output {
    fn eq(&self, other: &Self) -> bool {
        self.ct_matches(&other.0)
    }
}

impl Eq for Sha3_256Output {}

impl core::fmt::Debug for Sha3_256Output {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Sha3_256Output(")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        f.write_str("..)")
    }
}

impl AsRef<[u8]> for Sha3_256Output {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Sha3_256Output {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

/// SHA3-256 hasher
#[derive(Clone)]
pub struct Sha3_256 {
    inner: Sha3_256Impl,
}

impl Hash for Sha3_256 {
    const ALGORITHM_ID: AlgorithmId = AlgorithmId::Sha3_256;
    const OUTPUT_SIZE: usize = DIGEST_LEN;

    type Output = Sha3_256Output;

    fn hash(message: &[u8]) -> Self::Output {
        let result = Sha3_256Impl::digest(message);
        let mut output = [0u8; DIGEST_LEN];
        output.copy_from_slice(&result);
        Sha3_256Output(output)
    }

    fn new() -> Self {
        Self {
            inner: Sha3_256Impl::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Output {
        let result = self.inner.finalize();
        let mut output = [0u8; DIGEST_LEN];
        output.copy_from_slice(&result);
        Sha3_256Output(output)
    }
}

impl Default for Sha3_256 {
    fn default() -> Self {
        <Self as Hash>::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: [u8; 32] = [
        0xa7, 0xff, 0xc6, 0xf8, 0xbf, 0x1e, 0xd7, 0x66, 0x51, 0xc1, 0x47, 0x56, 0xa0, 0x61, 0xd6,
        0x62, 0xf5, 0x80, 0xff, 0x4d, 0xe4, 0x3b, 0x49, 0xfa, 0x82, 0xd8, 0x0a, 0x4b, 0x80, 0xf8,
        0x43, 0x4a,
    ];

    const ABC: [u8; 32] = [
        0x3a, 0x98, 0x5d, 0xa7, 0x4f, 0xe2, 0x25, 0xb2, 0x04, 0x5c, 0x17, 0x2d, 0x6b, 0xd3, 0x90,
        0xbd, 0x85, 0x5f, 0x08, 0x6e, 0x3e, 0x9d, 0x52, 0x5b, 0x46, 0xbf, 0xe2, 0x45, 0x11, 0x43,
        0x15, 0x32,
    ];

    #[test]
    fn test_sha3_256_known_vectors() {
        assert_eq!(Sha3_256::hash(b"").as_bytes(), &EMPTY);
        assert_eq!(Sha3_256::hash(b"abc").as_bytes(), &ABC);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = [0x42u8; 1000];
        let mut hasher = Sha3_256::new();
        for chunk in data.chunks(137) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), Sha3_256::hash(&data));
    }

    #[test]
    fn test_ct_matches_rejects_wrong_length() {
        let digest = Sha3_256::hash(b"abc");
        assert!(digest.ct_matches(&ABC));
        assert!(!digest.ct_matches(&ABC[..31]));
    }
}
