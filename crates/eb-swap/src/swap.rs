// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Swap/upgrade state machine
//!
//! Exchanges the primary and secondary slots one sector at a time through the
//! scratch region, persisting progress in the status log so a power cut at
//! any point resumes to the same end state.
//!
//! # Phases
//!
//! ```text
//!  None ──request──▶ None+REQ ──install──▶ SwapInProgress ──▶ SwapDone
//!                                                               │
//!                        ┌─────────── permanent ────────────────┤
//!                        ▼                                      ▼
//!  None ◀──next boot── Confirmed ◀──confirm()────────────── TestPending
//!   ▲                                                           │
//!   └──────────────── RevertPending ◀──next boot, unconfirmed───┘
//! ```
//!
//! # Per-sector protocol
//!
//! Sector `i` of a swap takes three sub-steps:
//!
//! | Step | Action                                  |
//! |------|-----------------------------------------|
//! | S0   | erase scratch, copy primary[i] → scratch |
//! | S1   | erase primary[i], copy secondary[i] → primary[i] |
//! | S2   | erase secondary[i], copy scratch → secondary[i] |
//!
//! Each sub-step's source is untouched until the following sub-step, so every
//! sub-step can be replayed. A record with `STEP_DONE` clear is committed
//! before the sub-step and one with it set after; resume replays the first
//! sub-step without a done record.
//!
//! Overwrite mode takes two sub-steps per sector and never reverts:
//!
//! | Step | Action                                  |
//! |------|-----------------------------------------|
//! | O0   | erase primary[i], copy secondary[i] → primary[i] |
//! | O1   | erase secondary[i]                       |
//!
//! The candidate is gone from the secondary slot once `Confirmed` is
//! committed, so it cannot be installed a second time.
//!
//! In direct-XIP mode nothing is relocated: every moving operation is an
//! `InvalidTransition` and [`SwapMachine::resume`] does nothing.

use crate::status::{flags, StatusRecord, StatusStore};
use core::fmt;
use eb_common::{
    log_debug, log_info, log_trace, log_warn, BootConfig, BootLogger, Error, FlashLayout,
    LogicError, StorageError, UpgradeMode, Version,
};
use eb_hal::FlashInterface;
use heapless::Vec;

/// Transitions remembered for one boot
pub const MAX_TRANSITIONS: usize = 16;

/// Sub-steps per sector in swap mode
pub const SWAP_SUB_STEPS: u8 = 3;

/// Sub-steps per sector in overwrite mode
pub const OVERWRITE_SUB_STEPS: u8 = 2;

// =============================================================================
// Phase
// =============================================================================

/// Upgrade phase persisted in the status record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SwapPhase {
    /// Nothing in flight
    None = 0,
    /// Candidate being moved into the primary slot
    SwapInProgress = 1,
    /// Relocation finished, outcome not yet recorded
    SwapDone = 2,
    /// New image booted once and awaits confirmation
    TestPending = 3,
    /// New image confirmed by the application
    Confirmed = 4,
    /// Previous image being moved back into the primary slot
    RevertPending = 5,
}

impl SwapPhase {
    /// Persisted encoding
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a persisted phase
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::SwapInProgress),
            2 => Some(Self::SwapDone),
            3 => Some(Self::TestPending),
            4 => Some(Self::Confirmed),
            5 => Some(Self::RevertPending),
            _ => None,
        }
    }

    /// Whether sectors are being relocated
    #[must_use]
    pub const fn is_relocating(self) -> bool {
        matches!(self, Self::SwapInProgress | Self::RevertPending)
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SwapInProgress => "swap-in-progress",
            Self::SwapDone => "swap-done",
            Self::TestPending => "test-pending",
            Self::Confirmed => "confirmed",
            Self::RevertPending => "revert-pending",
        }
    }
}

impl fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One committed phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Phase before
    pub from: SwapPhase,
    /// Phase after
    pub to: SwapPhase,
}

// =============================================================================
// Machine
// =============================================================================

/// Swap/upgrade state machine over the status log
#[derive(Debug, Clone)]
pub struct SwapMachine {
    layout: FlashLayout,
    mode: UpgradeMode,
    store: StatusStore,
    transitions: Vec<Transition, MAX_TRANSITIONS>,
}

impl SwapMachine {
    /// Machine for a validated configuration; call [`Self::load`] first
    #[must_use]
    pub fn new(config: &BootConfig) -> Self {
        Self {
            layout: config.layout,
            mode: config.upgrade_mode,
            store: StatusStore::new(&config.layout),
            transitions: Vec::new(),
        }
    }

    /// Read the status log
    ///
    /// # Errors
    ///
    /// - `Storage` on flash failure or a status layout from newer firmware
    /// - `Logic(CursorOutOfRange)` if a relocation record points outside the
    ///   slots
    pub fn load<F: FlashInterface>(&mut self, flash: &mut F) -> Result<StatusRecord, Error> {
        let record = self.store.load(flash)?;

        if record.phase.is_relocating() {
            let steps = sub_steps(&record);
            let in_range = u32::from(record.sector_count) <= self.layout.sectors_per_slot()
                && record.cursor <= record.sector_count
                && record.sub_step < steps;
            if !in_range {
                return Err(LogicError::CursorOutOfRange.into());
            }
        }
        Ok(record)
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> SwapPhase {
        self.store.current().phase
    }

    /// Newest committed record
    #[must_use]
    pub fn record(&self) -> &StatusRecord {
        self.store.current()
    }

    /// Phase changes committed since this machine was created
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Hand over the recorded transitions, leaving the list empty
    pub fn take_transitions(&mut self) -> Vec<Transition, MAX_TRANSITIONS> {
        core::mem::take(&mut self.transitions)
    }

    /// Whether the updater has staged a candidate
    #[must_use]
    pub fn upgrade_requested(&self) -> bool {
        let record = self.store.current();
        record.phase == SwapPhase::None && record.has(flags::UPGRADE_REQUESTED)
    }

    // -------------------------------------------------------------------------
    // Application-facing
    // -------------------------------------------------------------------------

    /// Stage the secondary slot for installation at next boot
    ///
    /// `permanent` skips the test boot. A pending confirmation is finalized
    /// first.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` while a relocation or test boot is pending, or in
    /// direct-XIP mode; storage failures.
    pub fn request_upgrade<F: FlashInterface>(
        &mut self,
        flash: &mut F,
        permanent: bool,
    ) -> Result<(), Error> {
        let current = *self.store.current();
        let idle = matches!(current.phase, SwapPhase::None | SwapPhase::Confirmed);
        if !self.mode.relocates() || !idle {
            return Err(LogicError::InvalidTransition.into());
        }
        let record = StatusRecord {
            phase: SwapPhase::None,
            flags: flags::UPGRADE_REQUESTED,
            ..StatusRecord::INITIAL
        }
        .with_flag(flags::PERMANENT, permanent);
        self.commit(flash, record)
    }

    /// Keep the image under test
    ///
    /// Already-confirmed and idle states are accepted without a write.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` during a relocation; storage failures.
    pub fn confirm<F: FlashInterface>(&mut self, flash: &mut F) -> Result<(), Error> {
        let current = *self.store.current();
        match current.phase {
            SwapPhase::TestPending => self.commit(
                flash,
                StatusRecord {
                    phase: SwapPhase::Confirmed,
                    ..current
                },
            ),
            SwapPhase::Confirmed | SwapPhase::None => Ok(()),
            _ => Err(LogicError::InvalidTransition.into()),
        }
    }

    /// Drop a staged request, recording why
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn cancel_request<F: FlashInterface>(
        &mut self,
        flash: &mut F,
        reason: Error,
    ) -> Result<(), Error> {
        let current = *self.store.current();
        let record = StatusRecord {
            last_error: reason.code(),
            ..current
        }
        .with_flag(flags::UPGRADE_REQUESTED | flags::PERMANENT, false);
        self.commit(flash, record)
    }

    // -------------------------------------------------------------------------
    // Boot-facing
    // -------------------------------------------------------------------------

    /// Finish whatever the status log says is in flight
    ///
    /// - `SwapInProgress`/`SwapDone`: complete the install
    /// - `TestPending`: the test boot was not confirmed, revert
    /// - `RevertPending`: complete the revert
    /// - `Confirmed`: finalize to `None`
    ///
    /// # Errors
    ///
    /// Storage failures (recorded in `last_error` first).
    pub fn resume<F, L>(&mut self, flash: &mut F, logger: &mut L) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        let current = *self.store.current();
        if !self.mode.relocates() {
            return Ok(());
        }
        match current.phase {
            SwapPhase::None => Ok(()),
            SwapPhase::SwapInProgress => {
                log_warn!(
                    logger,
                    "resuming install at sector {}/{} step {}",
                    current.cursor,
                    current.sector_count,
                    current.sub_step
                );
                self.relocate(flash, logger)?;
                self.finish_install(flash, logger)
            }
            SwapPhase::SwapDone => self.finish_install(flash, logger),
            SwapPhase::TestPending => {
                log_warn!(logger, "test image {} not confirmed, reverting", current.candidate_version);
                self.start_revert(flash, logger, current.sector_count)
            }
            SwapPhase::RevertPending => {
                log_warn!(
                    logger,
                    "resuming revert at sector {}/{} step {}",
                    current.cursor,
                    current.sector_count,
                    current.sub_step
                );
                self.relocate(flash, logger)?;
                self.finish_revert(flash, logger)
            }
            SwapPhase::Confirmed => {
                let record = StatusRecord {
                    phase: SwapPhase::None,
                    ..current
                }
                .with_flag(flags::PERMANENT | flags::OVERWRITE | flags::STEP_DONE, false);
                self.transition(flash, logger, record)
            }
        }
    }

    /// Move the staged candidate into the primary slot
    ///
    /// `sector_count` sectors from the start of each slot take part.
    ///
    /// # Errors
    ///
    /// - `Logic(InvalidTransition)` in direct-XIP mode
    /// - `Logic(NoCandidate)` without a staged request
    /// - `Logic(CursorOutOfRange)` if `sector_count` exceeds the slot
    /// - storage failures (recorded in `last_error` first)
    pub fn install<F, L>(
        &mut self,
        flash: &mut F,
        logger: &mut L,
        sector_count: u16,
        version: Version,
    ) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        if !self.mode.relocates() {
            return Err(LogicError::InvalidTransition.into());
        }
        if !self.upgrade_requested() {
            return Err(LogicError::NoCandidate.into());
        }
        self.check_span(sector_count)?;

        let current = *self.store.current();
        let overwrite = self.mode == UpgradeMode::Overwrite;
        let mut record = StatusRecord {
            phase: SwapPhase::SwapInProgress,
            sub_step: 0,
            cursor: 0,
            sector_count,
            candidate_version: version,
            last_error: 0,
            ..current
        }
        .with_flag(flags::STEP_DONE | flags::UPGRADE_REQUESTED, false);
        if overwrite {
            record = record.with_flag(flags::OVERWRITE | flags::PERMANENT, true);
        }

        log_info!(
            logger,
            "installing {} over {} sectors ({})",
            version,
            sector_count,
            if overwrite { "overwrite" } else { "swap" }
        );
        self.transition(flash, logger, record)?;
        self.relocate(flash, logger)?;
        self.finish_install(flash, logger)
    }

    /// Swap the slots back so the secondary image runs from primary
    ///
    /// Used when the primary image fails verification and the secondary one
    /// passes.
    ///
    /// # Errors
    ///
    /// - `Logic(InvalidTransition)` outside swap mode or with work in flight
    /// - `Logic(CursorOutOfRange)` if `sector_count` exceeds the slot
    /// - storage failures
    pub fn fallback<F, L>(
        &mut self,
        flash: &mut F,
        logger: &mut L,
        sector_count: u16,
    ) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        if self.mode != UpgradeMode::Swap || self.phase() != SwapPhase::None {
            return Err(LogicError::InvalidTransition.into());
        }
        self.check_span(sector_count)?;
        log_warn!(logger, "falling back to secondary image");
        self.start_revert(flash, logger, sector_count)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn check_span(&self, sector_count: u16) -> Result<(), Error> {
        if sector_count == 0 || u32::from(sector_count) > self.layout.sectors_per_slot() {
            return Err(LogicError::CursorOutOfRange.into());
        }
        Ok(())
    }

    fn start_revert<F, L>(
        &mut self,
        flash: &mut F,
        logger: &mut L,
        sector_count: u16,
    ) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        if self.mode != UpgradeMode::Swap {
            return Err(LogicError::InvalidTransition.into());
        }
        let current = *self.store.current();
        let record = StatusRecord {
            phase: SwapPhase::RevertPending,
            sub_step: 0,
            cursor: 0,
            sector_count,
            ..current
        }
        .with_flag(flags::STEP_DONE | flags::OVERWRITE, false);
        self.transition(flash, logger, record)?;
        self.relocate(flash, logger)?;
        self.finish_revert(flash, logger)
    }

    fn finish_install<F, L>(&mut self, flash: &mut F, logger: &mut L) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        let current = *self.store.current();
        if current.phase == SwapPhase::SwapInProgress {
            let done = StatusRecord {
                phase: SwapPhase::SwapDone,
                ..current
            };
            self.transition(flash, logger, done)?;
        }

        let current = *self.store.current();
        let next = if current.has(flags::PERMANENT) {
            SwapPhase::Confirmed
        } else {
            SwapPhase::TestPending
        };
        self.transition(
            flash,
            logger,
            StatusRecord {
                phase: next,
                ..current
            },
        )
    }

    fn finish_revert<F, L>(&mut self, flash: &mut F, logger: &mut L) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        let current = *self.store.current();
        let record = StatusRecord {
            phase: SwapPhase::None,
            flags: 0,
            ..current
        };
        self.transition(flash, logger, record)
    }

    /// Run sub-steps from the persisted cursor to the end of the span
    fn relocate<F, L>(&mut self, flash: &mut F, logger: &mut L) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        loop {
            let current = *self.store.current();
            let (cursor, sub_step) = if current.has(flags::STEP_DONE) {
                next_step(&current)
            } else {
                (current.cursor, current.sub_step)
            };
            if cursor >= current.sector_count {
                return Ok(());
            }

            if current.has(flags::STEP_DONE) {
                let started = StatusRecord {
                    cursor,
                    sub_step,
                    ..current
                }
                .with_flag(flags::STEP_DONE, false);
                self.commit(flash, started)?;
            }

            log_trace!(logger, "sector {} step {}", cursor, sub_step);
            if let Err(e) = self.run_step(flash, &current, cursor, sub_step) {
                log_debug!(logger, "sector {} step {} failed: {:?}", cursor, sub_step, e);
                return Err(self.record_failure(flash, e));
            }

            let done = self.store.current().with_flag(flags::STEP_DONE, true);
            self.commit(flash, done)?;
        }
    }

    fn run_step<F: FlashInterface>(
        &self,
        flash: &mut F,
        record: &StatusRecord,
        cursor: u16,
        sub_step: u8,
    ) -> Result<(), StorageError> {
        let sector = self.layout.sector_size;
        let index = u32::from(cursor);
        let primary = self.layout.primary.sector_address(sector, index);
        let secondary = self.layout.secondary.sector_address(sector, index);
        let scratch = self.layout.scratch.base;

        let (src, dst) = match (record.has(flags::OVERWRITE), sub_step) {
            (true, 0) => (Some(secondary), primary),
            (true, _) => (None, secondary),
            (false, 0) => (Some(primary), scratch),
            (false, 1) => (Some(secondary), primary),
            (false, _) => (Some(scratch), secondary),
        };

        flash.erase_range(dst, dst + sector)?;
        if let Some(src) = src {
            flash.copy(src, dst, sector)?;
        }
        Ok(())
    }

    /// Note `error` in the log, then hand it back for propagation
    fn record_failure<F: FlashInterface>(&mut self, flash: &mut F, error: StorageError) -> Error {
        let error = Error::Storage(error);
        let record = StatusRecord {
            last_error: error.code(),
            ..*self.store.current()
        };
        // Best effort; the device may already be unusable.
        let _ = self.store.append(flash, record);
        error
    }

    fn commit<F: FlashInterface>(&mut self, flash: &mut F, record: StatusRecord) -> Result<(), Error> {
        self.store
            .append(flash, record)
            .map_err(|e| self.record_failure(flash, e))
    }

    fn transition<F, L>(&mut self, flash: &mut F, logger: &mut L, record: StatusRecord) -> Result<(), Error>
    where
        F: FlashInterface,
        L: BootLogger,
    {
        let from = self.store.current().phase;
        self.commit(flash, record)?;
        log_info!(logger, "phase {} -> {}", from, record.phase);
        let _ = self.transitions.push(Transition {
            from,
            to: record.phase,
        });
        Ok(())
    }
}

fn sub_steps(record: &StatusRecord) -> u8 {
    if record.has(flags::OVERWRITE) {
        OVERWRITE_SUB_STEPS
    } else {
        SWAP_SUB_STEPS
    }
}

fn next_step(record: &StatusRecord) -> (u16, u8) {
    if record.sub_step + 1 < sub_steps(record) {
        (record.cursor, record.sub_step + 1)
    } else {
        (record.cursor.saturating_add(1), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eb_common::log::static_enabled;
    use eb_common::{LogBuffer, LogLevel, Region};
    use eb_hal::sim::SimFlash;

    type Flash = SimFlash<0x800, 0x100>;

    fn config(mode: UpgradeMode) -> BootConfig {
        BootConfig {
            layout: FlashLayout {
                sector_size: 0x100,
                status: Region::new(0x000, 0x200),
                scratch: Region::new(0x200, 0x100),
                primary: Region::new(0x300, 0x200),
                secondary: Region::new(0x500, 0x200),
            },
            upgrade_mode: mode,
            max_image_size: 0x200,
            ..BootConfig::DEFAULT
        }
    }

    fn flash() -> Flash {
        let mut flash = Flash::new();
        flash.load(0x300, &[0xAA; 0x200]);
        flash.load(0x500, &[0x55; 0x200]);
        flash
    }

    #[test]
    fn test_phase_encoding() {
        for value in 0..=5 {
            let phase = SwapPhase::from_u8(value).unwrap();
            assert_eq!(phase.as_u8(), value);
        }
        assert_eq!(SwapPhase::from_u8(6), None);
        assert!(SwapPhase::RevertPending.is_relocating());
        assert!(!SwapPhase::TestPending.is_relocating());
    }

    #[test]
    fn test_next_step_wraps_sectors() {
        let r = StatusRecord {
            cursor: 1,
            sub_step: 2,
            ..StatusRecord::INITIAL
        };
        assert_eq!(next_step(&r), (2, 0));
        let r = r.with_flag(flags::OVERWRITE, true);
        assert_eq!(next_step(&StatusRecord { sub_step: 0, ..r }), (1, 1));
        assert_eq!(next_step(&StatusRecord { sub_step: 1, ..r }), (2, 0));
    }

    #[test]
    fn test_install_requires_request() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::Swap));
        machine.load(&mut flash).unwrap();
        let mut log = LogBuffer::new();
        assert_eq!(
            machine.install(&mut flash, &mut log, 2, Version::ZERO),
            Err(Error::Logic(LogicError::NoCandidate))
        );
    }

    #[test]
    fn test_install_swaps_contents() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::Swap));
        let mut log = LogBuffer::new();
        machine.load(&mut flash).unwrap();
        machine.request_upgrade(&mut flash, false).unwrap();
        machine.install(&mut flash, &mut log, 2, Version::new(2, 0, 0, 0)).unwrap();

        assert!(flash.slice(0x300, 0x200).iter().all(|&b| b == 0x55));
        assert!(flash.slice(0x500, 0x200).iter().all(|&b| b == 0xAA));
        assert_eq!(machine.phase(), SwapPhase::TestPending);
        if static_enabled(LogLevel::Info) {
            assert!(log.contains(LogLevel::Info, "swap-done -> test-pending"));
        }
    }

    #[test]
    fn test_overwrite_copies_then_erases_candidate() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::Overwrite));
        let mut log = LogBuffer::new();
        machine.load(&mut flash).unwrap();
        machine.request_upgrade(&mut flash, false).unwrap();
        machine.install(&mut flash, &mut log, 2, Version::ZERO).unwrap();

        assert!(flash.slice(0x300, 0x200).iter().all(|&b| b == 0x55));
        assert!(flash.is_erased(0x500, 0x200).unwrap());
        assert_eq!(machine.phase(), SwapPhase::Confirmed);
    }

    #[test]
    fn test_overwrite_erase_step_replays() {
        let mut flash = flash();
        let machine = SwapMachine::new(&config(UpgradeMode::Overwrite));
        let record = StatusRecord::INITIAL.with_flag(flags::OVERWRITE, true);
        machine.run_step(&mut flash, &record, 0, 0).unwrap();
        machine.run_step(&mut flash, &record, 0, 1).unwrap();
        machine.run_step(&mut flash, &record, 0, 1).unwrap();

        assert!(flash.slice(0x300, 0x100).iter().all(|&b| b == 0x55));
        assert!(flash.is_erased(0x500, 0x100).unwrap());
        assert!(flash.slice(0x600, 0x100).iter().all(|&b| b == 0x55));
    }

    #[test]
    fn test_direct_xip_moves_nothing() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::DirectXip));
        let mut log = LogBuffer::new();
        machine.load(&mut flash).unwrap();
        assert_eq!(
            machine.request_upgrade(&mut flash, false),
            Err(Error::Logic(LogicError::InvalidTransition))
        );
        assert_eq!(
            machine.install(&mut flash, &mut log, 2, Version::ZERO),
            Err(Error::Logic(LogicError::InvalidTransition))
        );
        assert_eq!(
            machine.fallback(&mut flash, &mut log, 2),
            Err(Error::Logic(LogicError::InvalidTransition))
        );
        machine.resume(&mut flash, &mut log).unwrap();
        assert_eq!(flash.ops(), 0);
        assert!(flash.slice(0x300, 0x200).iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_confirm_when_idle_writes_nothing() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::Swap));
        machine.load(&mut flash).unwrap();
        let ops = flash.ops();
        machine.confirm(&mut flash).unwrap();
        assert_eq!(flash.ops(), ops);
    }

    #[test]
    fn test_span_checked() {
        let mut flash = flash();
        let mut machine = SwapMachine::new(&config(UpgradeMode::Swap));
        let mut log = LogBuffer::new();
        machine.load(&mut flash).unwrap();
        machine.request_upgrade(&mut flash, false).unwrap();
        assert_eq!(
            machine.install(&mut flash, &mut log, 3, Version::ZERO),
            Err(Error::Logic(LogicError::CursorOutOfRange))
        );
        assert_eq!(
            machine.install(&mut flash, &mut log, 0, Version::ZERO),
            Err(Error::Logic(LogicError::CursorOutOfRange))
        );
    }
}
