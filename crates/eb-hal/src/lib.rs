// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for EdgeBoot
//!
//! The boot core touches hardware through two traits only:
//!
//! 1. [`FlashInterface`]: read, program and erase, the sole path to storage
//! 2. [`Platform`]: bring-up status, control transfer and halt
//!
//! Board crates implement them for real silicon. The `sim` feature provides
//! [`sim::SimFlash`], a RAM-backed NOR model with bounded busy polling and
//! power-cut injection, used by every host test in the workspace.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use error::{HalError, HalResult};
pub use traits::{poll_ready, BootTarget, FlashInterface, Platform};
