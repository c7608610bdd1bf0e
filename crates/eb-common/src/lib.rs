// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! EdgeBoot Common Library
//!
//! Types shared by every EdgeBoot crate:
//!
//! - **CRC Engine**: table-driven CRC-32 for non-cryptographic metadata
//! - **Errors**: the boot error taxonomy with stable numeric codes
//! - **Config**: build-time flash layout and verification policy
//! - **Log**: logging hooks that compile to nothing when disabled
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting and the defmt log forwarder
//! - `log-off`, `log-max-error`, `log-max-warn`, `log-max-info`: compile-time log ceilings
//!
//! No heap allocations are performed. All buffers are fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod crc;
pub mod errors;
pub mod log;
pub mod types;
pub mod version;

pub use config::{BootConfig, FlashLayout, Region, UpgradeMode};
pub use crc::{crc32, Crc32, CRC32_EMPTY};
pub use errors::{
    ConfigError, Error, ErrorCategory, LogicError, ParseError, RejectReason, Result, StorageError,
};
pub use log::{BootLogger, LogBuffer, LogLevel, NullLogger};
pub use types::{AlgorithmId, SlotId};
pub use version::Version;
