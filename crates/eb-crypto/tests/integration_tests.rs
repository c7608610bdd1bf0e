// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for eb-crypto
//!
//! Falcon round trips run with `--features signing`.

use eb_common::{Error, RejectReason};
use eb_crypto::{constant_time_eq, CryptoError, Hash, Sha3_256, SignatureVerifier, DIGEST_LEN};

mod hash_tests {
    use super::*;

    #[test]
    fn test_measurement_over_header_and_body() {
        let header = [0x11u8; 64];
        let body = [0x22u8; 300];

        let mut joined = Vec::new();
        joined.extend_from_slice(&header);
        joined.extend_from_slice(&body);

        let mut hasher = Sha3_256::new();
        hasher.update(&header);
        for chunk in body.chunks(64) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), Sha3_256::hash(&joined));
    }

    #[test]
    fn test_output_size() {
        assert_eq!(<Sha3_256 as Hash>::OUTPUT_SIZE, DIGEST_LEN);
        assert_eq!(Sha3_256::hash(b"x").as_ref().len(), DIGEST_LEN);
    }

    #[test]
    fn test_distinct_inputs_distinct_digests() {
        assert_ne!(Sha3_256::hash(b"v1"), Sha3_256::hash(b"v2"));
    }
}

mod comparison_tests {
    use super::*;

    #[test]
    fn test_digest_comparison() {
        let a = Sha3_256::hash(b"image");
        let b = Sha3_256::hash(b"image");
        assert!(constant_time_eq(a.as_ref(), b.as_ref()));
        assert!(!constant_time_eq(a.as_ref(), &[0u8; DIGEST_LEN]));
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_undecodable_material_is_signature_invalid() {
        assert_eq!(
            RejectReason::from(CryptoError::InvalidKey),
            RejectReason::SignatureInvalid
        );
        assert_eq!(
            Error::from(CryptoError::InvalidSignature),
            Error::Trust(RejectReason::SignatureInvalid)
        );
        assert_eq!(
            Error::from(CryptoError::UnsupportedAlgorithm),
            Error::Trust(RejectReason::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_verifier_rejects_short_key() {
        let result = <eb_crypto::Falcon512 as SignatureVerifier>::verify(&[0u8; 10], b"m", &[1u8; 10]);
        assert_eq!(result, Err(CryptoError::InvalidKey));
    }
}

#[cfg(feature = "signing")]
mod falcon_tests {
    use super::*;
    use eb_crypto::{Falcon512, Falcon512PublicKey, SeededRng};

    #[test]
    fn test_sign_digest_verify() {
        let mut rng = SeededRng::from_u64(2024);
        let (pk, sk) = Falcon512::keypair(&mut rng).unwrap();
        let digest = Sha3_256::hash(b"firmware");

        let sig = Falcon512::sign(&sk, digest.as_bytes(), &mut rng).unwrap();
        assert!(<Falcon512 as SignatureVerifier>::verify(
            pk.as_bytes(),
            digest.as_bytes(),
            sig.as_bytes()
        )
        .unwrap());

        let mut forged = [0u8; 666];
        forged.copy_from_slice(sig.as_bytes());
        forged[100] ^= 0x01;
        assert!(!<Falcon512 as SignatureVerifier>::verify(
            pk.as_bytes(),
            digest.as_bytes(),
            &forged
        )
        .unwrap_or(false));
    }

    #[test]
    fn test_fingerprint_stable() {
        let mut rng = SeededRng::from_u64(5);
        let (pk, _) = Falcon512::keypair(&mut rng).unwrap();
        let copy = Falcon512PublicKey::from_bytes(pk.as_bytes()).unwrap();
        assert_eq!(pk.fingerprint(), copy.fingerprint());
        assert_eq!(pk.fingerprint(), Sha3_256::hash(pk.as_bytes()));
    }
}
