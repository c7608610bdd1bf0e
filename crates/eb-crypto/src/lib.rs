// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! EdgeBoot Cryptographic Layer
//!
//! Thin, typed wrappers over audited ecosystem crates. Nothing in this crate
//! implements a primitive:
//!
//! - **SHA3-256** (`sha3`): image measurement and key fingerprints
//! - **FN-DSA-512 / Falcon-512** (`fn-dsa`): image signature verification
//! - **Constant-time comparison** (`subtle`): digest and fingerprint checks
//!
//! # Features
//!
//! - `signing`: key generation and signing, plus a seeded deterministic RNG.
//!   For host tooling and tests; a bootloader build only verifies.
//!
//! # Security Requirements
//!
//! - Comparisons of digests never short-circuit on the first differing byte
//! - Secret keys are zeroized on drop
//! - Key material is never logged

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod falcon;
pub mod hash;
pub mod traits;

pub use error::{CryptoError, CryptoResult};
pub use falcon::{Falcon512, Falcon512PublicKey, Falcon512Signature};
pub use hash::{Sha3_256, Sha3_256Output, DIGEST_LEN};
pub use traits::{constant_time_eq, CryptoRng, Hash, SignatureVerifier};

#[cfg(feature = "signing")]
pub use falcon::{Falcon512SecretKey, SeededRng};
