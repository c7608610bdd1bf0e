// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot Orchestrator
//!
//! Sequences one boot attempt:
//!
//! 1. Platform init
//! 2. Load the status log
//! 3. Finish any interrupted install, revert or confirmation
//! 4. Scan slots
//! 5. Parse and verify a staged candidate
//! 6. Install it through the swap machine
//! 7. Verify the primary image, falling back to secondary if allowed
//!
//! In direct-XIP mode steps 3 to 7 are replaced by verifying both slots and
//! running the newest accepted image from wherever it lies.
//!
//! The slot scan is structural only. Verdicts the verifier reaches are
//! recorded on the slot map with [`SlotManager::mark`].
//!
//! Everything the attempt touches lives in a [`BootContext`]; there is no
//! global state. [`Bootloader::prepare`] returns a [`BootReport`] so the
//! whole decision is observable on a host. [`Bootloader::boot`] then either
//! hands off or halts, never both.

use crate::descriptor::{self, ImageDescriptor, ImageHeaderInspector, HEADER_SIZE, MAX_TRAILER_SIZE};
use crate::verify::{verify_in_flash, TrustAnchor, Verdict, VerifyPolicy};
use eb_common::{
    log_debug, log_error, log_info, log_warn, BootConfig, BootLogger, Error, FlashLayout,
    LogicError, ParseError, Region, SlotId, UpgradeMode,
};
use eb_hal::{BootTarget, FlashInterface, Platform};
use eb_swap::{
    SlotManager, SlotMap, SlotState, SwapMachine, SwapPhase, Transition, MAX_TRANSITIONS,
};
use heapless::Vec;

/// Everything one boot attempt works with
pub struct BootContext<F, P, L> {
    /// Flash driver
    pub flash: F,
    /// Board services
    pub platform: P,
    /// Log sink
    pub logger: L,
    /// Build-time policy
    pub config: BootConfig,
    /// Root of trust
    pub anchor: TrustAnchor,
}

impl<F, P, L> BootContext<F, P, L>
where
    F: FlashInterface,
    P: Platform,
    L: BootLogger,
{
    /// Assemble a context
    pub fn new(flash: F, platform: P, logger: L, config: BootConfig, anchor: TrustAnchor) -> Self {
        Self {
            flash,
            platform,
            logger,
            config,
            anchor,
        }
    }
}

/// Outcome of [`Bootloader::prepare`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    /// Image to hand off to
    pub target: BootTarget,
    /// Phase changes committed during this attempt, oldest first
    pub transitions: Vec<Transition, MAX_TRANSITIONS>,
    /// Why a staged candidate (or, in direct-XIP mode, a non-empty slot)
    /// was refused, if one was
    pub rejection: Option<Error>,
    /// Phase left in the status log
    pub phase: SwapPhase,
    /// Slot classification after all work was done
    pub slots: SlotMap,
    /// Whether the image that boots is the fallback because the preferred
    /// one failed verification
    pub fell_back: bool,
}

/// Boot orchestrator
pub struct Bootloader;

impl Bootloader {
    /// Run one boot attempt up to the hand-off decision
    ///
    /// # Errors
    ///
    /// - `Config` for an invalid configuration
    /// - `Platform` when init reports a non-zero status
    /// - `Storage` on flash failure (the next boot resumes)
    /// - `Logic` on corrupted persisted state
    /// - `Parse`/`Trust` when the primary image is unusable and no fallback
    ///   applies
    pub fn prepare<F, P, L>(ctx: &mut BootContext<F, P, L>) -> Result<BootReport, Error>
    where
        F: FlashInterface,
        P: Platform,
        L: BootLogger,
    {
        ctx.config.validate()?;
        ctx.platform.init()?;
        log_info!(ctx.logger, "platform up");

        let layout = ctx.config.layout;
        let policy = VerifyPolicy::from_config(&ctx.config);

        let mut machine = SwapMachine::new(&ctx.config);
        let record = machine.load(&mut ctx.flash)?;
        log_info!(ctx.logger, "status: phase {} seq {}", record.phase, record.sequence);
        if record.last_error != 0 {
            log_warn!(ctx.logger, "previous attempt failed with 0x{:04X}", record.last_error);
        }

        if !ctx.config.upgrade_mode.relocates() {
            return Self::select_in_place(ctx, &machine, &policy);
        }

        machine.resume(&mut ctx.flash, &mut ctx.logger)?;

        let mut slots = SlotManager::new(layout);
        slots.scan(&ctx.flash, &ImageHeaderInspector, machine.record())?;

        let mut rejection = None;
        if machine.upgrade_requested() {
            match Self::evaluate_candidate(ctx, &slots, &policy)? {
                Ok(candidate) => {
                    let span =
                        swap_span(&layout, Self::primary_total(ctx), candidate.header.total_size());
                    log_info!(ctx.logger, "candidate {} accepted", candidate.version());
                    machine.install(&mut ctx.flash, &mut ctx.logger, span, candidate.version())?;
                }
                Err(reason) => {
                    log_warn!(ctx.logger, "candidate rejected: {}", reason);
                    machine.cancel_request(&mut ctx.flash, reason)?;
                    rejection = Some(reason);
                }
            }
        }

        let mut fell_back = false;
        let full = ctx.config.validate_primary_on_boot;
        let primary = match Self::check_slot(ctx, layout.primary, &policy, full)? {
            Ok(primary) => primary,
            Err(primary_error) => {
                log_error!(ctx.logger, "primary image unusable: {}", primary_error);
                let fallback = ctx.config.fallback_on_primary_failure
                    && ctx.config.upgrade_mode == UpgradeMode::Swap
                    && machine.phase() == SwapPhase::None;
                if !fallback {
                    return Err(primary_error);
                }

                let secondary = match Self::check_slot(ctx, layout.secondary, &policy, true)? {
                    Ok(secondary) => secondary,
                    Err(e) => {
                        log_error!(ctx.logger, "no fallback image: {}", e);
                        return Err(primary_error);
                    }
                };
                let span =
                    swap_span(&layout, Self::primary_total(ctx), secondary.header.total_size());
                machine.fallback(&mut ctx.flash, &mut ctx.logger, span)?;
                fell_back = true;

                Self::check_slot(ctx, layout.primary, &policy, true)??
            }
        };

        slots.scan(&ctx.flash, &ImageHeaderInspector, machine.record())?;
        // A refused candidate, or the primary image swapped out by a
        // fallback, now sits in the secondary slot.
        let condemned = rejection.is_some() || fell_back;
        if condemned && slots.map().state(SlotId::Secondary) != SlotState::Empty {
            slots.mark(SlotId::Secondary, SlotState::HoldsInvalidImage)?;
        }

        Ok(BootReport {
            target: target(SlotId::Primary, layout.primary, &primary),
            transitions: machine.take_transitions(),
            rejection,
            phase: machine.phase(),
            slots: *slots.map(),
            fell_back,
        })
    }

    /// Prepare, then hand off or halt; never returns
    pub fn boot<F, P, L>(mut ctx: BootContext<F, P, L>) -> !
    where
        F: FlashInterface,
        P: Platform,
        L: BootLogger,
    {
        match Self::prepare(&mut ctx) {
            Ok(report) => {
                log_info!(
                    ctx.logger,
                    "booting {} at 0x{:08X}",
                    report.target.version,
                    report.target.entry_point
                );
                ctx.platform.handoff(&report.target)
            }
            Err(error) => {
                log_error!(ctx.logger, "boot halted: {}", error);
                ctx.platform.halt(error)
            }
        }
    }

    /// Verify both slots and pick the newest accepted image
    ///
    /// Nothing is written. On equal versions the primary slot wins.
    fn select_in_place<F, P, L>(
        ctx: &mut BootContext<F, P, L>,
        machine: &SwapMachine,
        policy: &VerifyPolicy,
    ) -> Result<BootReport, Error>
    where
        F: FlashInterface,
        P: Platform,
        L: BootLogger,
    {
        let layout = ctx.config.layout;
        let mode = ctx.config.upgrade_mode;
        if machine.phase() != SwapPhase::None {
            log_warn!(ctx.logger, "phase {} ignored in {} mode", machine.phase(), mode.name());
        }

        let mut slots = SlotManager::new(layout);
        slots.scan(&ctx.flash, &ImageHeaderInspector, machine.record())?;

        let mut chosen: Option<(SlotId, ImageDescriptor)> = None;
        let mut first_error = None;
        let mut rejection = None;
        for id in SlotId::ALL.into_iter().filter(|id| id.is_bootable(mode)) {
            let occupied = slots.map().state(id) != SlotState::Empty;
            match Self::check_slot(ctx, layout.region(id), policy, true)? {
                Ok(image) => {
                    log_debug!(ctx.logger, "{} slot holds {}", id, image.version());
                    let newer = chosen
                        .as_ref()
                        .map_or(true, |(_, best)| image.version() > best.version());
                    if newer {
                        chosen = Some((id, image));
                    }
                }
                Err(e) => {
                    if occupied {
                        log_warn!(ctx.logger, "{} slot rejected: {}", id, e);
                        slots.mark(id, SlotState::HoldsInvalidImage)?;
                        rejection.get_or_insert(e);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        let Some((slot, image)) = chosen else {
            let error = first_error.unwrap_or(Error::Logic(LogicError::NoCandidate));
            log_error!(ctx.logger, "no bootable image: {}", error);
            return Err(error);
        };
        log_info!(ctx.logger, "running {} in place from {} slot", image.version(), slot);

        Ok(BootReport {
            target: target(slot, layout.region(slot), &image),
            transitions: Vec::new(),
            rejection,
            phase: machine.phase(),
            slots: *slots.map(),
            fell_back: rejection.is_some(),
        })
    }

    /// Parse and verify the staged candidate
    ///
    /// The inner error is the rejection; the outer one is a flash failure.
    fn evaluate_candidate<F: FlashInterface, P, L>(
        ctx: &BootContext<F, P, L>,
        slots: &SlotManager,
        policy: &VerifyPolicy,
    ) -> Result<Result<ImageDescriptor, Error>, Error> {
        let region = ctx.config.layout.secondary;
        if slots.map().candidate() != Some(SlotId::Secondary) {
            // Requested, but the header did not pass the scan; report why.
            return match read_descriptor(&ctx.flash, region)? {
                Ok(_) => Ok(Err(LogicError::NoCandidate.into())),
                Err(e) => Ok(Err(e)),
            };
        }
        Self::check_slot(ctx, region, policy, true)
    }

    /// Parse the image at the start of `region`, and verify it when `full`
    fn check_slot<F: FlashInterface, P, L>(
        ctx: &BootContext<F, P, L>,
        region: Region,
        policy: &VerifyPolicy,
        full: bool,
    ) -> Result<Result<ImageDescriptor, Error>, Error> {
        let descriptor = match read_descriptor(&ctx.flash, region)? {
            Ok(descriptor) => descriptor,
            Err(e) => return Ok(Err(e)),
        };
        if descriptor.header.image_size > ctx.config.max_image_size {
            return Ok(Err(ParseError::SizeOverflow.into()));
        }
        if !full {
            return Ok(Ok(descriptor));
        }
        match verify_in_flash(&descriptor, &ctx.flash, region.base, &ctx.anchor, policy)? {
            Verdict::Accept => Ok(Ok(descriptor)),
            Verdict::Reject(reason) => Ok(Err(reason.into())),
        }
    }

    fn primary_total<F: FlashInterface, P, L>(ctx: &BootContext<F, P, L>) -> Option<u32> {
        let region = ctx.config.layout.primary;
        let mut header = [0u8; HEADER_SIZE];
        ctx.flash.read(region.base, &mut header).ok()?;
        descriptor::parse_header(&header, region.size)
            .ok()
            .map(|h| h.total_size())
    }
}

/// Read and parse header and trailer of the image at `region.base`
///
/// # Errors
///
/// Outer: flash failure. Inner: parse failure.
pub fn read_descriptor<F: FlashInterface>(
    flash: &F,
    region: Region,
) -> Result<Result<ImageDescriptor, Error>, Error> {
    let mut header = [0u8; HEADER_SIZE];
    flash.read(region.base, &mut header)?;
    let header = match descriptor::parse_header(&header, region.size) {
        Ok(header) => header,
        Err(e) => return Ok(Err(e.into())),
    };

    let mut trailer = [0u8; MAX_TRAILER_SIZE];
    let trailer = &mut trailer[..header.trailer_size as usize];
    flash.read(region.base + header.trailer_offset(), trailer)?;
    Ok(header.parse_trailer(trailer).map_err(Error::from))
}

fn target(slot: SlotId, region: Region, image: &ImageDescriptor) -> BootTarget {
    let header = &image.header;
    BootTarget {
        slot,
        image_address: region.base,
        load_address: header.load_address,
        entry_point: header.entry_point(),
        version: header.version,
    }
}

/// Sectors both images occupy, or the whole slot if primary is unreadable
fn swap_span(layout: &FlashLayout, primary_total: Option<u32>, candidate_total: u32) -> u16 {
    let slot_sectors = layout.sectors_per_slot();
    let sectors = match primary_total {
        Some(primary) => primary.max(candidate_total).div_ceil(layout.sector_size),
        None => slot_sectors,
    };
    // A validated layout has at most `MAX_SLOT_SECTORS` per slot.
    u16::try_from(sectors.min(slot_sectors)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FlashLayout {
        FlashLayout {
            sector_size: 0x100,
            status: Region::new(0x000, 0x200),
            scratch: Region::new(0x200, 0x100),
            primary: Region::new(0x300, 0x400),
            secondary: Region::new(0x700, 0x400),
        }
    }

    #[test]
    fn test_swap_span_covers_larger_image() {
        assert_eq!(swap_span(&layout(), Some(0x101), 0x80), 2);
        assert_eq!(swap_span(&layout(), Some(0x80), 0x280), 3);
        assert_eq!(swap_span(&layout(), Some(0x100), 0x100), 1);
    }

    #[test]
    fn test_swap_span_whole_slot_without_primary() {
        assert_eq!(swap_span(&layout(), None, 0x80), 4);
    }
}
