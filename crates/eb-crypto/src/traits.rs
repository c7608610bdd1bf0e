// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Seams between the boot path and the primitives
//!
//! The verifier only names these traits and the concrete SHA3/FN-DSA types
//! that implement them. Comparisons of digests and keys go through
//! [`constant_time_eq`].

use crate::error::CryptoError;
use eb_common::AlgorithmId;

/// Digest with one-shot and streaming forms
///
/// Streaming is what lets an image be measured straight from flash.
pub trait Hash: Sized {
    /// Wire identifier in image headers
    const ALGORITHM_ID: AlgorithmId;
    /// Digest length
    const OUTPUT_SIZE: usize;

    /// Digest value
    type Output: AsRef<[u8]> + Clone;

    /// Digest of `message`
    fn hash(message: &[u8]) -> Self::Output;

    /// Empty streaming state
    fn new() -> Self;

    /// Absorb the next chunk
    fn update(&mut self, data: &[u8]);

    /// Consume the state and produce the digest
    fn finalize(self) -> Self::Output;
}

/// Public-key signature check over encoded bytes
pub trait SignatureVerifier {
    /// Wire identifier in image headers
    const ALGORITHM_ID: AlgorithmId;
    /// Encoded public key length
    const PUBLIC_KEY_SIZE: usize;
    /// Longest encoded signature
    const SIGNATURE_SIZE: usize;

    /// `Ok(true)` when `signature` over `message` verifies under `public_key`
    ///
    /// # Errors
    ///
    /// `InvalidKey` for an undecodable key, `InvalidSignature` for a
    /// signature whose length the scheme cannot produce.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;
}

/// Entropy source for key generation and signing (host tooling only)
pub trait CryptoRng {
    /// Fill `dest`
    ///
    /// # Errors
    ///
    /// `CryptoError::RngFailure`.
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// Equality that inspects every byte regardless of where they differ
///
/// Lengths are public and compared first.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_mismatch_in_any_position_detected() {
        let reference = [0x5Au8; 32];
        for i in 0..32 {
            let mut other = reference;
            other[i] ^= 1;
            assert!(!constant_time_eq(&reference, &other));
        }
    }
}
