// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FN-DSA (Falcon-512) signatures
//!
//! Wraps the `fn-dsa` crate by Thomas Pornin, a constant-time `no_std`
//! implementation of FIPS 206. Images are signed over their 32-byte SHA3-256
//! measurement with the raw hash identifier and an empty domain context.
//!
//! Verification is always available. Key generation and signing require the
//! `signing` feature.

use crate::error::CryptoError;
use crate::hash::{Sha3_256, Sha3_256Output};
use crate::traits::{Hash, SignatureVerifier};
use eb_common::AlgorithmId;
use fn_dsa::{VerifyingKey, VerifyingKey512, DOMAIN_NONE, HASH_ID_RAW};

/// Public key size in bytes
pub const FALCON_512_PK_SIZE: usize = 897;

/// Secret key size in bytes
pub const FALCON_512_SK_SIZE: usize = 1281;

/// Signature size in bytes (padded encoding)
pub const FALCON_512_SIG_SIZE: usize = 666;

/// Decodable FN-DSA-512 verifying key
#[derive(Clone, PartialEq, Eq)]
pub struct Falcon512PublicKey {
    data: [u8; FALCON_512_PK_SIZE],
}

impl Falcon512PublicKey {
    /// Accept an encoded key only if `fn-dsa` can decode it
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKey`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != FALCON_512_PK_SIZE || VerifyingKey512::decode(bytes).is_none() {
            return Err(CryptoError::InvalidKey);
        }
        let mut data = [0u8; FALCON_512_PK_SIZE];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// Encoded key
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// SHA3-256 of the encoded key, as provisioned in a key-hash trust anchor
    #[must_use]
    pub fn fingerprint(&self) -> Sha3_256Output {
        Sha3_256::hash(&self.data)
    }
}

impl AsRef<[u8]> for Falcon512PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl core::fmt::Debug for Falcon512PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Falcon512PublicKey({:?})", self.fingerprint())
    }
}

/// Signature as carried in an image trailer
#[derive(Clone)]
pub struct Falcon512Signature {
    data: [u8; FALCON_512_SIG_SIZE],
    len: usize,
}

impl Falcon512Signature {
    /// Copy a trailer signature; the content is only checked by `verify`
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidSignature` for 0 or more than 666 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() || bytes.len() > FALCON_512_SIG_SIZE {
            return Err(CryptoError::InvalidSignature);
        }
        let mut data = [0u8; FALCON_512_SIG_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            data,
            len: bytes.len(),
        })
    }

    /// Encoded signature
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Encoded length
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a constructed signature
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for Falcon512Signature {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// FN-DSA-512 with an empty context and the raw-message hash identifier
pub struct Falcon512;

impl Falcon512 {
    /// Whether `sig` over `message` verifies under `pk`
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKey` if the key no longer decodes.
    pub fn verify(
        pk: &Falcon512PublicKey,
        message: &[u8],
        sig: &Falcon512Signature,
    ) -> Result<bool, CryptoError> {
        let vk = VerifyingKey512::decode(&pk.data).ok_or(CryptoError::InvalidKey)?;
        Ok(vk.verify(sig.as_bytes(), &DOMAIN_NONE, &HASH_ID_RAW, message))
    }
}

impl SignatureVerifier for Falcon512 {
    const ALGORITHM_ID: AlgorithmId = AlgorithmId::Falcon512;
    const PUBLIC_KEY_SIZE: usize = FALCON_512_PK_SIZE;
    const SIGNATURE_SIZE: usize = FALCON_512_SIG_SIZE;

    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let pk = Falcon512PublicKey::from_bytes(public_key)?;
        let sig = Falcon512Signature::from_bytes(signature)?;
        Falcon512::verify(&pk, message, &sig)
    }
}

// =============================================================================
// Signing (host tooling and tests)
// =============================================================================

#[cfg(feature = "signing")]
mod signing {
    use super::{
        Falcon512, Falcon512PublicKey, Falcon512Signature, FALCON_512_PK_SIZE,
        FALCON_512_SIG_SIZE, FALCON_512_SK_SIZE,
    };
    use crate::error::CryptoError;
    use crate::hash::Sha3_256;
    use crate::traits::{CryptoRng, Hash};
    use fn_dsa::{
        KeyPairGenerator, KeyPairGenerator512, SigningKey, SigningKey512, DOMAIN_NONE,
        FN_DSA_LOGN_512, HASH_ID_RAW,
    };
    use zeroize::{Zeroize, ZeroizeOnDrop};

    /// Bridges [`CryptoRng`] to the `rand_core` traits `fn-dsa` expects
    ///
    /// `rand_core::RngCore::fill_bytes` cannot fail, so a failure is latched
    /// and checked once the `fn-dsa` call returns.
    struct RngAdapter<'a, R: CryptoRng> {
        inner: &'a mut R,
        failed: bool,
    }

    impl<'a, R: CryptoRng> RngAdapter<'a, R> {
        fn new(inner: &'a mut R) -> Self {
            Self {
                inner,
                failed: false,
            }
        }

        fn finish(self) -> Result<(), CryptoError> {
            if self.failed {
                Err(CryptoError::RngFailure)
            } else {
                Ok(())
            }
        }
    }

    impl<R: CryptoRng> rand_core::RngCore for RngAdapter<'_, R> {
        fn next_u32(&mut self) -> u32 {
            let mut buf = [0u8; 4];
            rand_core::RngCore::fill_bytes(self, &mut buf);
            u32::from_le_bytes(buf)
        }

        fn next_u64(&mut self) -> u64 {
            let mut buf = [0u8; 8];
            rand_core::RngCore::fill_bytes(self, &mut buf);
            u64::from_le_bytes(buf)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            if self.inner.fill_bytes(dest).is_err() {
                self.failed = true;
                dest.fill(0);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            rand_core::RngCore::fill_bytes(self, dest);
            Ok(())
        }
    }

    impl<R: CryptoRng> rand_core::CryptoRng for RngAdapter<'_, R> {}

    /// Falcon-512 secret key, wiped on drop
    #[derive(Zeroize, ZeroizeOnDrop)]
    pub struct Falcon512SecretKey {
        data: [u8; FALCON_512_SK_SIZE],
    }

    impl Falcon512SecretKey {
        /// Load an encoded signing key
        ///
        /// # Errors
        ///
        /// `CryptoError::InvalidKey` if `fn-dsa` cannot decode it.
        pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
            if bytes.len() != FALCON_512_SK_SIZE || SigningKey512::decode(bytes).is_none() {
                return Err(CryptoError::InvalidKey);
            }
            let mut data = [0u8; FALCON_512_SK_SIZE];
            data.copy_from_slice(bytes);
            Ok(Self { data })
        }

        /// Encoded signing key
        #[must_use]
        pub fn as_bytes(&self) -> &[u8] {
            &self.data
        }
    }

    impl Falcon512 {
        /// Fresh keypair drawn from `rng`
        ///
        /// # Errors
        ///
        /// `CryptoError::RngFailure` if the RNG fails.
        pub fn keypair<R: CryptoRng>(
            rng: &mut R,
        ) -> Result<(Falcon512PublicKey, Falcon512SecretKey), CryptoError> {
            let mut adapter = RngAdapter::new(rng);
            let mut kpg = KeyPairGenerator512::default();

            let mut sk = Falcon512SecretKey {
                data: [0u8; FALCON_512_SK_SIZE],
            };
            let mut pk = [0u8; FALCON_512_PK_SIZE];

            kpg.keygen(FN_DSA_LOGN_512, &mut adapter, &mut sk.data, &mut pk);
            adapter.finish()?;

            Ok((Falcon512PublicKey { data: pk }, sk))
        }

        /// Sign `message`, normally a 32-byte image measurement
        ///
        /// # Errors
        ///
        /// `CryptoError::InvalidKey` if the key does not decode,
        /// `CryptoError::RngFailure` if the RNG fails.
        pub fn sign<R: CryptoRng>(
            sk: &Falcon512SecretKey,
            message: &[u8],
            rng: &mut R,
        ) -> Result<Falcon512Signature, CryptoError> {
            let mut adapter = RngAdapter::new(rng);
            let mut signing_key =
                SigningKey512::decode(&sk.data).ok_or(CryptoError::InvalidKey)?;

            let mut sig = [0u8; FALCON_512_SIG_SIZE];
            signing_key.sign(&mut adapter, &DOMAIN_NONE, &HASH_ID_RAW, message, &mut sig);
            adapter.finish()?;

            Ok(Falcon512Signature {
                data: sig,
                len: FALCON_512_SIG_SIZE,
            })
        }
    }

    /// Deterministic hash-counter RNG for tooling and tests
    ///
    /// Output block `i` is `SHA3-256(seed || i)`. Not a substitute for a
    /// hardware entropy source.
    #[derive(Zeroize, ZeroizeOnDrop)]
    pub struct SeededRng {
        seed: [u8; 32],
        counter: u64,
    }

    impl SeededRng {
        /// Stream keyed by `seed`
        #[must_use]
        pub fn new(seed: [u8; 32]) -> Self {
            Self { seed, counter: 0 }
        }

        /// Stream keyed by SHA3-256 of `seed`
        #[must_use]
        pub fn from_u64(seed: u64) -> Self {
            Self::new(*Sha3_256::hash(&seed.to_le_bytes()).as_bytes())
        }
    }

    impl CryptoRng for SeededRng {
        fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), CryptoError> {
            for chunk in dest.chunks_mut(32) {
                self.counter = self.counter.wrapping_add(1);
                let mut hasher = Sha3_256::new();
                hasher.update(&self.seed);
                hasher.update(&self.counter.to_le_bytes());
                let block = hasher.finalize();
                chunk.copy_from_slice(&block.as_bytes()[..chunk.len()]);
            }
            Ok(())
        }
    }
}

#[cfg(feature = "signing")]
pub use signing::{Falcon512SecretKey, SeededRng};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_fn_dsa() {
        use fn_dsa::{signature_size, vrfy_key_size, FN_DSA_LOGN_512};
        assert_eq!(FALCON_512_PK_SIZE, vrfy_key_size(FN_DSA_LOGN_512));
        assert_eq!(FALCON_512_SIG_SIZE, signature_size(FN_DSA_LOGN_512));
    }

    #[test]
    fn test_public_key_length_checked() {
        assert_eq!(
            Falcon512PublicKey::from_bytes(&[0u8; 32]).unwrap_err(),
            CryptoError::InvalidKey
        );
    }

    #[test]
    fn test_garbage_public_key_rejected() {
        // Header byte must encode logn = 9
        let bytes = [0xFFu8; FALCON_512_PK_SIZE];
        assert_eq!(
            Falcon512PublicKey::from_bytes(&bytes).unwrap_err(),
            CryptoError::InvalidKey
        );
    }

    #[test]
    fn test_signature_length_checked() {
        assert!(Falcon512Signature::from_bytes(&[]).is_err());
        assert!(Falcon512Signature::from_bytes(&[0u8; FALCON_512_SIG_SIZE + 1]).is_err());
        let sig = Falcon512Signature::from_bytes(&[1u8; 10]).unwrap();
        assert_eq!(sig.len(), 10);
        assert!(!sig.is_empty());
    }

    #[cfg(feature = "signing")]
    mod signing_tests {
        use super::super::*;
        use crate::traits::{CryptoRng, SignatureVerifier};

        #[test]
        fn test_keypair_sign_verify() {
            let mut rng = SeededRng::new([0x42; 32]);
            let (pk, sk) = Falcon512::keypair(&mut rng).unwrap();

            let digest = Sha3_256::hash(b"image body");
            let sig = Falcon512::sign(&sk, digest.as_bytes(), &mut rng).unwrap();
            assert!(Falcon512::verify(&pk, digest.as_bytes(), &sig).unwrap());

            let other = Sha3_256::hash(b"image b0dy");
            assert!(!Falcon512::verify(&pk, other.as_bytes(), &sig).unwrap());

            assert!(
                <Falcon512 as SignatureVerifier>::verify(pk.as_bytes(), digest.as_bytes(), sig.as_bytes())
                    .unwrap()
            );
        }

        #[test]
        fn test_secret_key_roundtrip() {
            let mut rng = SeededRng::from_u64(7);
            let (_, sk) = Falcon512::keypair(&mut rng).unwrap();
            let again = Falcon512SecretKey::from_bytes(sk.as_bytes()).unwrap();
            assert_eq!(again.as_bytes(), sk.as_bytes());
        }

        #[test]
        fn test_seeded_rng_deterministic() {
            let mut a = SeededRng::from_u64(1);
            let mut b = SeededRng::from_u64(1);
            let mut x = [0u8; 70];
            let mut y = [0u8; 70];
            a.fill_bytes(&mut x).unwrap();
            b.fill_bytes(&mut y).unwrap();
            assert_eq!(x, y);
            assert_ne!(x[..32], x[32..64]);
        }
    }
}
