// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Slot classification
//!
//! Classifies the primary, secondary and scratch regions from what is in
//! flash and what the status log says. Image headers are judged through an
//! [`HeaderInspector`] so this crate stays independent of the image format.

use crate::status::{flags, StatusRecord};
use crate::swap::SwapPhase;
use eb_common::{FlashLayout, LogicError, Region, SlotId, StorageError};
use eb_hal::FlashInterface;

/// Largest header an inspector may ask for
pub const MAX_HEADER_PEEK: usize = 64;

// =============================================================================
// Slot State
// =============================================================================

/// What a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Header area is erased
    Empty = 0,
    /// Well-formed header, not staged for install
    HoldsValidImage = 1,
    /// Something other than a well-formed header
    HoldsInvalidImage = 2,
    /// Well-formed header staged by the updater
    HoldsUpdateCandidate = 3,
}

impl From<u8> for SlotState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Empty,
            1 => Self::HoldsValidImage,
            3 => Self::HoldsUpdateCandidate,
            _ => Self::HoldsInvalidImage,
        }
    }
}

/// Structural check of an image header
///
/// Implemented by the image format; only magic/checksum/bounds-level checks
/// belong here, never cryptographic ones.
pub trait HeaderInspector {
    /// Header bytes to read from the start of a slot (at most
    /// [`MAX_HEADER_PEEK`])
    const HEADER_LEN: usize;

    /// Whether `header` starts a structurally sound image fitting in
    /// `capacity` bytes
    fn is_well_formed(&self, header: &[u8], capacity: u32) -> bool;
}

// =============================================================================
// Slot Map
// =============================================================================

/// One classified slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Which slot
    pub id: SlotId,
    /// Where it lives
    pub region: Region,
    /// What it holds
    pub state: SlotState,
}

/// All three slots, indexed by [`SlotId::index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMap {
    slots: [Slot; 3],
}

impl SlotMap {
    fn empty(layout: &FlashLayout) -> Self {
        Self {
            slots: SlotId::ALL.map(|id| Slot {
                id,
                region: layout.region(id),
                state: SlotState::Empty,
            }),
        }
    }

    /// Slot by id
    #[must_use]
    pub fn get(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    /// State of a slot
    #[must_use]
    pub fn state(&self, id: SlotId) -> SlotState {
        self.get(id).state
    }

    /// Slot currently marked as update candidate
    #[must_use]
    pub fn candidate(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|s| s.state == SlotState::HoldsUpdateCandidate)
            .map(|s| s.id)
    }

    /// All slots in id order
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }
}

// =============================================================================
// Slot Manager
// =============================================================================

/// Slot manager
#[derive(Debug, Clone)]
pub struct SlotManager {
    layout: FlashLayout,
    map: SlotMap,
}

impl SlotManager {
    /// Manager with every slot `Empty` until scanned
    #[must_use]
    pub fn new(layout: FlashLayout) -> Self {
        Self {
            map: SlotMap::empty(&layout),
            layout,
        }
    }

    /// Current classification
    #[must_use]
    pub fn map(&self) -> &SlotMap {
        &self.map
    }

    /// Classify every slot from flash contents and the status record
    ///
    /// The secondary slot is the update candidate only when its header is
    /// well-formed, the record carries `UPGRADE_REQUESTED` and no relocation
    /// is under way. Scratch is always `Empty`.
    ///
    /// # Errors
    ///
    /// Flash read failures.
    pub fn scan<F, I>(
        &mut self,
        flash: &F,
        inspector: &I,
        status: &StatusRecord,
    ) -> Result<&SlotMap, StorageError>
    where
        F: FlashInterface,
        I: HeaderInspector,
    {
        let mut map = SlotMap::empty(&self.layout);

        for id in [SlotId::Primary, SlotId::Secondary] {
            let region = self.layout.region(id);
            let state = classify(flash, inspector, &region)?;
            map.slots[id.index()].state = state;
        }

        let staged = status.phase == SwapPhase::None && status.has(flags::UPGRADE_REQUESTED);
        let secondary = &mut map.slots[SlotId::Secondary.index()];
        if staged && secondary.state == SlotState::HoldsValidImage {
            secondary.state = SlotState::HoldsUpdateCandidate;
        }

        self.map = map;
        Ok(&self.map)
    }

    /// Set a slot's state
    ///
    /// # Errors
    ///
    /// - `ScratchAsBootSlot` for any non-`Empty` state on scratch
    /// - `MultipleCandidates` if another slot is already the candidate
    pub fn mark(&mut self, id: SlotId, state: SlotState) -> Result<(), LogicError> {
        if id == SlotId::Scratch && state != SlotState::Empty {
            return Err(LogicError::ScratchAsBootSlot);
        }
        if state == SlotState::HoldsUpdateCandidate {
            if let Some(existing) = self.map.candidate() {
                if existing != id {
                    return Err(LogicError::MultipleCandidates);
                }
            }
        }
        self.map.slots[id.index()].state = state;
        Ok(())
    }
}

fn classify<F, I>(flash: &F, inspector: &I, region: &Region) -> Result<SlotState, StorageError>
where
    F: FlashInterface,
    I: HeaderInspector,
{
    let len = I::HEADER_LEN.min(MAX_HEADER_PEEK);
    let mut header = [0u8; MAX_HEADER_PEEK];
    flash.read(region.base, &mut header[..len])?;
    let header = &header[..len];

    if header.iter().all(|&b| b == F::ERASED_BYTE) {
        Ok(SlotState::Empty)
    } else if inspector.is_well_formed(header, region.size) {
        Ok(SlotState::HoldsValidImage)
    } else {
        Ok(SlotState::HoldsInvalidImage)
    }
}
