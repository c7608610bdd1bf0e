// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! EdgeBoot Slot and Swap Management
//!
//! - [`slots`]: classifies primary, secondary and scratch from flash contents
//! - [`status`]: the two-sector status log every phase change is committed to
//! - [`swap`]: the upgrade state machine (install, test, confirm, revert)
//!
//! Every flash mutation made by the state machine is bracketed by status
//! records, so the machine can be killed at any operation and resumed from
//! what is in flash.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod slots;
pub mod status;
pub mod swap;

pub use slots::{HeaderInspector, Slot, SlotManager, SlotMap, SlotState};
pub use status::{flags, StatusRecord, StatusStore};
pub use swap::{SwapMachine, SwapPhase, Transition, MAX_TRANSITIONS};
