// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated NOR flash
//!
//! A RAM-backed [`FlashInterface`] that behaves like the parts the boot core
//! is written for:
//!
//! - programming ANDs new data into the cell (bits only go from 1 to 0)
//! - every program/erase leaves the device busy for a configurable number of
//!   status polls, bounded by [`FlashInterface::TIMEOUT_POLLS`]
//! - a power cut can be scheduled after N mutating operations; the cut
//!   operation is torn according to the [`TearMode`] and the device stays
//!   dark until [`SimFlash::power_cycle`]
//!
//! Flash starts at address 0.

use crate::error::{HalError, HalResult};
use crate::traits::{poll_ready, FlashInterface};
use core::cell::Cell;

/// What a power cut leaves behind in the operation it interrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TearMode {
    /// The first half of the range is fully applied, the rest untouched
    #[default]
    Truncate,
    /// Every cell in the range is left part-way: a write clears only some
    /// of the bits it should, an erase sets only some of them
    PartialBits,
}

impl TearMode {
    /// Both modes, for sweeping
    pub const ALL: [Self; 2] = [Self::Truncate, Self::PartialBits];
}

/// Bits of cell `index` that a torn operation fails to change
#[allow(clippy::cast_possible_truncation)]
const fn stuck_bits(index: usize) -> u8 {
    0x55u8.rotate_left((index % 8) as u32)
}

/// Simulated flash of `SIZE` bytes with `SECTOR`-byte erase sectors
pub struct SimFlash<const SIZE: usize, const SECTOR: u32> {
    memory: [u8; SIZE],
    tear: TearMode,
    /// Polls each operation stays busy for
    latency: u32,
    /// Polls left before the busy flag clears
    busy: Cell<u32>,
    /// Mutating operations allowed before the supply drops
    cut_after: Option<u32>,
    powered: bool,
    ops: u32,
    reads: Cell<u32>,
}

impl<const SIZE: usize, const SECTOR: u32> SimFlash<SIZE, SECTOR> {
    /// Fully erased device
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: [0xFF; SIZE],
            tear: TearMode::Truncate,
            latency: 2,
            busy: Cell::new(0),
            cut_after: None,
            powered: true,
            ops: 0,
            reads: Cell::new(0),
        }
    }

    /// Set how many status polls each program/erase takes
    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Drop the supply during the mutating operation after the next `ops` ones
    ///
    /// `fail_after(0)` tears the very next write or erase.
    pub fn fail_after(&mut self, ops: u32) {
        self.cut_after = Some(ops);
    }

    /// Choose how the next power cuts tear their operation
    pub fn set_tear_mode(&mut self, mode: TearMode) {
        self.tear = mode;
    }

    /// Restore power and cancel any scheduled cut; contents are kept
    pub fn power_cycle(&mut self) {
        self.cut_after = None;
        self.powered = true;
        self.busy.set(0);
    }

    /// Whether a scheduled cut has happened
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Mutating operations completed or torn since creation
    #[must_use]
    pub fn ops(&self) -> u32 {
        self.ops
    }

    /// Read calls since creation
    #[must_use]
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    /// Raw contents
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.memory
    }

    /// Raw contents of `len` bytes at `address`
    ///
    /// # Panics
    ///
    /// If the range lies outside the device.
    #[must_use]
    pub fn slice(&self, address: u32, len: usize) -> &[u8] {
        &self.memory[address as usize..address as usize + len]
    }

    /// Overwrite raw contents, bypassing NOR semantics and fault injection
    ///
    /// # Panics
    ///
    /// If the range lies outside the device.
    pub fn load(&mut self, address: u32, data: &[u8]) {
        let start = address as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    fn range(address: u32, len: usize) -> HalResult<core::ops::Range<usize>> {
        let start = address
            .checked_sub(Self::BASE_ADDRESS)
            .ok_or(HalError::FlashOutOfBounds)? as usize;
        let end = start.checked_add(len).ok_or(HalError::FlashOutOfBounds)?;
        if end > SIZE {
            return Err(HalError::FlashOutOfBounds);
        }
        Ok(start..end)
    }

    /// Count a mutating operation; `false` means the supply drops during it
    fn begin_op(&mut self) -> HalResult<bool> {
        if !self.powered {
            return Err(HalError::PowerLoss);
        }
        self.ops += 1;
        match self.cut_after {
            Some(0) => {
                self.powered = false;
                self.cut_after = None;
                Ok(false)
            }
            Some(n) => {
                self.cut_after = Some(n - 1);
                Ok(true)
            }
            None => Ok(true),
        }
    }

    fn wait_ready(&self) -> HalResult<()> {
        self.busy.set(self.latency);
        poll_ready(Self::TIMEOUT_POLLS, || {
            let left = self.busy.get();
            if left == 0 {
                Ok(true)
            } else {
                self.busy.set(left - 1);
                Ok(false)
            }
        })
    }
}

impl<const SIZE: usize, const SECTOR: u32> Default for SimFlash<SIZE, SECTOR> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize, const SECTOR: u32> FlashInterface for SimFlash<SIZE, SECTOR> {
    const SECTOR_SIZE: u32 = SECTOR;
    const BASE_ADDRESS: u32 = 0;
    #[allow(clippy::cast_possible_truncation)]
    const TOTAL_SIZE: u32 = SIZE as u32;
    const TIMEOUT_POLLS: u32 = 64;

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        if !self.powered {
            return Err(HalError::PowerLoss);
        }
        let range = Self::range(address, buffer.len())?;
        buffer.copy_from_slice(&self.memory[range]);
        self.reads.set(self.reads.get().wrapping_add(1));
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        let range = Self::range(address, data.len())?;
        let completes = self.begin_op()?;

        let cells = self.memory[range].iter_mut().zip(data);
        match (completes, self.tear) {
            (true, _) => cells.for_each(|(cell, &byte)| *cell &= byte),
            (false, TearMode::Truncate) => cells
                .take(data.len() / 2)
                .for_each(|(cell, &byte)| *cell &= byte),
            (false, TearMode::PartialBits) => cells
                .enumerate()
                .for_each(|(i, (cell, &byte))| *cell &= byte | stuck_bits(i)),
        }

        if !completes {
            return Err(HalError::PowerLoss);
        }
        self.wait_ready()
    }

    fn erase_sector(&mut self, address: u32) -> HalResult<()> {
        if address % SECTOR != 0 {
            return Err(HalError::FlashMisaligned);
        }
        let range = Self::range(address, SECTOR as usize)?;
        let completes = self.begin_op()?;

        let cells = &mut self.memory[range];
        match (completes, self.tear) {
            (true, _) => cells.fill(Self::ERASED_BYTE),
            (false, TearMode::Truncate) => {
                let half = cells.len() / 2;
                cells[..half].fill(Self::ERASED_BYTE);
            }
            (false, TearMode::PartialBits) => {
                for (i, cell) in cells.iter_mut().enumerate() {
                    *cell |= !stuck_bits(i);
                }
            }
        }

        if !completes {
            return Err(HalError::PowerLoss);
        }
        self.wait_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Flash = SimFlash<0x1000, 0x100>;

    #[test]
    fn test_starts_erased() {
        let flash = Flash::new();
        assert!(flash.is_erased(0, 0x1000).unwrap());
    }

    #[test]
    fn test_write_ands_bits() {
        let mut flash = Flash::new();
        flash.write(0x10, &[0xF0]).unwrap();
        flash.write(0x10, &[0x3C]).unwrap();
        let mut out = [0u8; 1];
        flash.read(0x10, &mut out).unwrap();
        assert_eq!(out, [0x30]);
    }

    #[test]
    fn test_erase_restores_sector_only() {
        let mut flash = Flash::new();
        flash.write(0x0FF, &[0, 0]).unwrap();
        flash.erase_sector(0x100).unwrap();
        assert_eq!(flash.slice(0x0FF, 2), &[0x00, 0xFF]);
    }

    #[test]
    fn test_misaligned_erase_rejected() {
        let mut flash = Flash::new();
        assert_eq!(flash.erase_sector(0x180), Err(HalError::FlashMisaligned));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut flash = Flash::new();
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(0x0FFE, &mut buf), Err(HalError::FlashOutOfBounds));
        assert_eq!(flash.write(0x1000, &[0]), Err(HalError::FlashOutOfBounds));
    }

    #[test]
    fn test_latency_beyond_budget_times_out() {
        let mut flash = Flash::new();
        flash.set_latency(Flash::TIMEOUT_POLLS);
        assert_eq!(flash.write(0, &[0]), Err(HalError::Timeout));
        flash.set_latency(Flash::TIMEOUT_POLLS - 1);
        assert_eq!(flash.write(1, &[0]), Ok(()));
    }

    #[test]
    fn test_power_cut_tears_write() {
        let mut flash = Flash::new();
        flash.fail_after(1);
        flash.write(0, &[0x11; 4]).unwrap();
        assert_eq!(flash.write(4, &[0x22; 4]), Err(HalError::PowerLoss));
        assert!(!flash.is_powered());
        assert_eq!(flash.slice(4, 4), &[0x22, 0x22, 0xFF, 0xFF]);

        let mut buf = [0u8; 1];
        assert_eq!(flash.read(0, &mut buf), Err(HalError::PowerLoss));
        assert_eq!(flash.erase_sector(0), Err(HalError::PowerLoss));

        flash.power_cycle();
        flash.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0x11]);
        assert_eq!(flash.ops(), 2);
    }

    #[test]
    fn test_power_cut_tears_erase() {
        let mut flash = Flash::new();
        flash.load(0, &[0u8; 0x100]);
        flash.fail_after(0);
        assert_eq!(flash.erase_sector(0), Err(HalError::PowerLoss));
        assert!(flash.slice(0, 0x80).iter().all(|&b| b == 0xFF));
        assert!(flash.slice(0x80, 0x80).iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_partial_bits_tear_write() {
        let mut flash = Flash::new();
        flash.set_tear_mode(TearMode::PartialBits);
        flash.fail_after(0);
        assert_eq!(flash.write(0, &[0x02, 0x00, 0x00]), Err(HalError::PowerLoss));
        flash.power_cycle();

        let torn = flash.slice(0, 3);
        assert_eq!(torn, &[0x57, 0xAA, 0x55]);
        for (&cell, &target) in torn.iter().zip(&[0x02u8, 0x00, 0x00]) {
            assert_ne!(cell, target);
            assert_ne!(cell, 0xFF);
            assert_eq!(cell & target, target);
        }
    }

    #[test]
    fn test_partial_bits_tear_erase() {
        let mut flash = Flash::new();
        flash.load(0, &[0u8; 0x100]);
        flash.set_tear_mode(TearMode::PartialBits);
        flash.fail_after(0);
        assert_eq!(flash.erase_sector(0), Err(HalError::PowerLoss));
        flash.power_cycle();

        assert_eq!(flash.slice(0, 2), &[0xAA, 0x55]);
        assert!(!flash.is_erased(0, 0x100).unwrap());
        flash.erase_sector(0).unwrap();
        assert!(flash.is_erased(0, 0x100).unwrap());
    }

    #[test]
    fn test_copy_and_verify() {
        let mut flash = Flash::new();
        let data: [u8; 300] = core::array::from_fn(|i| i as u8);
        flash.write(0, &data).unwrap();
        flash.copy(0, 0x400, 300).unwrap();
        assert!(flash.verify(0x400, &data).unwrap());
        flash.erase_range(0x400, 0x600).unwrap();
        assert!(!flash.verify(0x400, &data).unwrap());
    }
}
