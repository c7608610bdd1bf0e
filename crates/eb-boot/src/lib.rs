// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! EdgeBoot Secure Boot Core
//!
//! This crate decides which image runs:
//!
//! - [`descriptor`]: parses the header and trailer that frame an image
//! - [`verify`]: anti-rollback, key binding, SHA3-256 measurement and
//!   FN-DSA-512 signature check
//! - [`orchestrator`]: one boot attempt, from platform init through
//!   upgrade handling to hand-off
//!
//! # Boot Flow
//!
//! ```text
//! ┌──────────┐  ┌────────────┐  ┌───────────┐  ┌──────────────┐  ┌─────────┐
//! │ Platform │─▶│ Resume any │─▶│ Scan and  │─▶│ Install via  │─▶│ Verify  │─▶ handoff
//! │   init   │  │ swap phase │  │ verify    │  │ swap machine │  │ primary │   or halt
//! └──────────┘  └────────────┘  │ candidate │  └──────────────┘  └─────────┘
//!                               └───────────┘
//! ```
//!
//! All state lives in a caller-owned [`BootContext`]. Host tests drive the
//! same code over the simulated flash from `eb-hal`.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod descriptor;
pub mod orchestrator;
pub mod verify;

pub use descriptor::{parse, parse_header, ImageDescriptor, ImageHeader, ImageHeaderInspector};
pub use orchestrator::{read_descriptor, BootContext, BootReport, Bootloader};
pub use verify::{verify, verify_in_flash, AnchorKey, TrustAnchor, Verdict, VerifyPolicy};
