// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Trust Verifier
//!
//! The only gate between a parsed image and execution.
//!
//! # Verification Process
//!
//! 1. Algorithm and flag policy (encrypted images are not supported)
//! 2. Anti-rollback against the anchor's minimum version
//! 3. Key binding: the signing key must be, or hash to, the anchor
//! 4. SHA3-256 over header and body, compared in constant time
//! 5. FN-DSA-512 signature over the 32-byte measurement
//!
//! Rollback is checked before any cryptography, so an old image is refused
//! even when its signature is genuine.

use crate::descriptor::{flags, ImageDescriptor};
use eb_common::{AlgorithmId, BootConfig, RejectReason, StorageError, Version};
use eb_crypto::{
    constant_time_eq, Falcon512, Falcon512PublicKey, Falcon512Signature, Hash, Sha3_256,
    Sha3_256Output, DIGEST_LEN,
};
use eb_hal::FlashInterface;
use zeroize::Zeroize;

/// Bytes hashed per flash read
const MEASURE_CHUNK: usize = 256;

/// Outcome of verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Image may run
    Accept,
    /// Image must never run
    Reject(RejectReason),
}

impl Verdict {
    /// Whether the image was accepted
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// `Ok(())` on accept
    ///
    /// # Errors
    ///
    /// The reject reason.
    pub const fn into_result(self) -> Result<(), RejectReason> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(reason) => Err(reason),
        }
    }
}

impl From<Result<(), RejectReason>> for Verdict {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(reason) => Self::Reject(reason),
        }
    }
}

// ============================================================================
// Trust Anchor
// ============================================================================

/// How the anchor identifies the signing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorKey {
    /// The key itself; an embedded key, if any, must equal it
    PublicKey(Falcon512PublicKey),
    /// SHA3-256 of the key; the image must embed a key with this digest
    KeyHash(Sha3_256Output),
}

/// Root key and rollback floor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    /// Signing key identity
    pub key: AnchorKey,
    /// Oldest version allowed to boot
    pub minimum_version: Version,
}

impl TrustAnchor {
    /// Anchor holding the full public key
    #[must_use]
    pub const fn with_public_key(key: Falcon512PublicKey, minimum_version: Version) -> Self {
        Self {
            key: AnchorKey::PublicKey(key),
            minimum_version,
        }
    }

    /// Anchor holding only the key's SHA3-256 digest
    #[must_use]
    pub const fn with_key_hash(digest: [u8; DIGEST_LEN], minimum_version: Version) -> Self {
        Self {
            key: AnchorKey::KeyHash(Sha3_256Output::from_bytes(digest)),
            minimum_version,
        }
    }
}

/// Algorithm and key policy from the build configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    /// Required measurement algorithm
    pub hash_algorithm: AlgorithmId,
    /// Required signature algorithm
    pub signature_algorithm: AlgorithmId,
    /// Reject images without an embedded key
    pub require_embedded_key: bool,
}

impl VerifyPolicy {
    /// Policy of [`BootConfig::DEFAULT`]
    pub const DEFAULT: Self = Self::from_config(&BootConfig::DEFAULT);

    /// Extract the verification policy from a boot configuration
    #[must_use]
    pub const fn from_config(config: &BootConfig) -> Self {
        Self {
            hash_algorithm: config.hash_algorithm,
            signature_algorithm: config.signature_algorithm,
            require_embedded_key: config.require_embedded_key,
        }
    }
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Verify an image held in memory
///
/// `image_bytes` starts at the header and covers at least header and body.
#[must_use]
pub fn verify(
    descriptor: &ImageDescriptor,
    image_bytes: &[u8],
    anchor: &TrustAnchor,
    policy: &VerifyPolicy,
) -> Verdict {
    let key = match precheck(descriptor, anchor, policy) {
        Ok(key) => key,
        Err(reason) => return Verdict::Reject(reason),
    };

    let Some(signed) = image_bytes.get(..descriptor.header.signed_len() as usize) else {
        return Verdict::Reject(RejectReason::HashMismatch);
    };
    let measured = Sha3_256::hash(signed);

    check_measurement(descriptor, &measured, &key).into()
}

/// Verify an image in place, hashing it from flash in bounded chunks
///
/// `base` is the flash address of the image header.
///
/// # Errors
///
/// Flash read failures. A readable image always yields a [`Verdict`].
pub fn verify_in_flash<F: FlashInterface>(
    descriptor: &ImageDescriptor,
    flash: &F,
    base: u32,
    anchor: &TrustAnchor,
    policy: &VerifyPolicy,
) -> Result<Verdict, StorageError> {
    let key = match precheck(descriptor, anchor, policy) {
        Ok(key) => key,
        Err(reason) => return Ok(Verdict::Reject(reason)),
    };

    let measured = measure(flash, base, descriptor.header.signed_len())?;
    Ok(check_measurement(descriptor, &measured, &key).into())
}

/// SHA3-256 of `len` bytes of flash starting at `base`
///
/// # Errors
///
/// Flash read failures.
pub fn measure<F: FlashInterface>(
    flash: &F,
    base: u32,
    len: u32,
) -> Result<Sha3_256Output, StorageError> {
    let mut hasher = Sha3_256::new();
    let mut buffer = [0u8; MEASURE_CHUNK];
    let mut offset = 0u32;

    let result = loop {
        if offset >= len {
            break Ok(());
        }
        let chunk = ((len - offset) as usize).min(MEASURE_CHUNK);
        if let Err(e) = flash.read(base + offset, &mut buffer[..chunk]) {
            break Err(StorageError::from(e));
        }
        hasher.update(&buffer[..chunk]);
        offset += chunk as u32;
    };

    buffer.zeroize();
    result.map(|()| hasher.finalize())
}

/// Steps 1 to 3; yields the key the signature must verify under
fn precheck(
    descriptor: &ImageDescriptor,
    anchor: &TrustAnchor,
    policy: &VerifyPolicy,
) -> Result<Falcon512PublicKey, RejectReason> {
    let header = &descriptor.header;

    if header.has_flag(flags::ENCRYPTED)
        || header.hash_algorithm != policy.hash_algorithm
        || header.hash_algorithm != AlgorithmId::Sha3_256
        || header.signature_algorithm != policy.signature_algorithm
        || header.signature_algorithm != AlgorithmId::Falcon512
        || descriptor.hash.len() != DIGEST_LEN
    {
        return Err(RejectReason::UnsupportedAlgorithm);
    }

    if !header.version.satisfies_minimum(&anchor.minimum_version) {
        return Err(RejectReason::RollbackBlocked);
    }

    bind_key(descriptor, anchor, policy)
}

fn bind_key(
    descriptor: &ImageDescriptor,
    anchor: &TrustAnchor,
    policy: &VerifyPolicy,
) -> Result<Falcon512PublicKey, RejectReason> {
    let embedded = descriptor.public_key.as_deref();
    if policy.require_embedded_key && embedded.is_none() {
        return Err(RejectReason::SignatureInvalid);
    }

    match &anchor.key {
        AnchorKey::PublicKey(key) => match embedded {
            Some(bytes) if !constant_time_eq(bytes, key.as_bytes()) => {
                Err(RejectReason::SignatureInvalid)
            }
            _ => Ok(key.clone()),
        },
        AnchorKey::KeyHash(digest) => {
            let bytes = embedded.ok_or(RejectReason::SignatureInvalid)?;
            if !digest.ct_matches(Sha3_256::hash(bytes).as_bytes()) {
                return Err(RejectReason::SignatureInvalid);
            }
            Falcon512PublicKey::from_bytes(bytes).map_err(|_| RejectReason::SignatureInvalid)
        }
    }
}

/// Steps 4 and 5
fn check_measurement(
    descriptor: &ImageDescriptor,
    measured: &Sha3_256Output,
    key: &Falcon512PublicKey,
) -> Result<(), RejectReason> {
    if !measured.ct_matches(&descriptor.hash) {
        return Err(RejectReason::HashMismatch);
    }

    let signature = Falcon512Signature::from_bytes(&descriptor.signature)
        .map_err(|_| RejectReason::SignatureInvalid)?;

    match Falcon512::verify(key, measured.as_bytes(), &signature) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(RejectReason::SignatureInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ImageHeader, HEADER_SIZE, IMAGE_FORMAT_VERSION};
    use heapless::Vec;

    fn descriptor(version: Version) -> ImageDescriptor {
        ImageDescriptor {
            header: ImageHeader {
                format_version: IMAGE_FORMAT_VERSION,
                flags: 0,
                header_size: HEADER_SIZE as u16,
                image_size: 16,
                load_address: 0,
                entry_offset: 0,
                version,
                hash_algorithm: AlgorithmId::Sha3_256,
                signature_algorithm: AlgorithmId::Falcon512,
                trailer_size: 0,
            },
            hash: Vec::from_slice(&[0u8; DIGEST_LEN]).unwrap(),
            public_key: None,
            signature: Vec::from_slice(&[1u8; 8]).unwrap(),
        }
    }

    fn anchor(minimum: Version) -> TrustAnchor {
        TrustAnchor::with_key_hash([0x5A; DIGEST_LEN], minimum)
    }

    #[test]
    fn test_verdict_conversions() {
        assert!(Verdict::Accept.is_accept());
        assert_eq!(
            Verdict::Reject(RejectReason::HashMismatch).into_result(),
            Err(RejectReason::HashMismatch)
        );
        assert_eq!(Verdict::from(Ok(())), Verdict::Accept);
    }

    #[test]
    fn test_encrypted_rejected_as_unsupported() {
        let mut d = descriptor(Version::new(1, 0, 0, 0));
        d.header.flags = flags::ENCRYPTED;
        let verdict = verify(&d, &[0u8; 80], &anchor(Version::ZERO), &VerifyPolicy::DEFAULT);
        assert_eq!(verdict, Verdict::Reject(RejectReason::UnsupportedAlgorithm));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let mut d = descriptor(Version::new(1, 0, 0, 0));
        d.header.signature_algorithm = AlgorithmId::Ed25519;
        let verdict = verify(&d, &[0u8; 80], &anchor(Version::ZERO), &VerifyPolicy::DEFAULT);
        assert_eq!(verdict, Verdict::Reject(RejectReason::UnsupportedAlgorithm));
    }

    #[test]
    fn test_rollback_checked_before_key() {
        let d = descriptor(Version::new(1, 0, 0, 0));
        let verdict = verify(&d, &[0u8; 80], &anchor(Version::new(2, 0, 0, 0)), &VerifyPolicy::DEFAULT);
        assert_eq!(verdict, Verdict::Reject(RejectReason::RollbackBlocked));
    }

    #[test]
    fn test_key_hash_anchor_needs_embedded_key() {
        let d = descriptor(Version::new(1, 0, 0, 0));
        let verdict = verify(&d, &[0u8; 80], &anchor(Version::ZERO), &VerifyPolicy::DEFAULT);
        assert_eq!(verdict, Verdict::Reject(RejectReason::SignatureInvalid));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = VerifyPolicy::from_config(&BootConfig {
            require_embedded_key: true,
            ..BootConfig::DEFAULT
        });
        assert!(policy.require_embedded_key);
        assert_eq!(policy.hash_algorithm, AlgorithmId::Sha3_256);
    }
}
