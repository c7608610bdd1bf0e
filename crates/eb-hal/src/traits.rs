// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL traits
//!
//! Platform-agnostic interfaces the boot core is written against.

use crate::error::{HalError, HalResult};
use eb_common::{Error, SlotId, Version};

/// Scratch buffer size for chunked flash helpers
const CHUNK: usize = 256;

/// Flash driver interface
///
/// Addresses are absolute. `write` programs bits from 1 to 0 only, so a
/// region must be erased before it is rewritten.
pub trait FlashInterface {
    /// Erase granularity in bytes
    const SECTOR_SIZE: u32;

    /// Base address of flash
    const BASE_ADDRESS: u32;

    /// Total flash size in bytes
    const TOTAL_SIZE: u32;

    /// Value of every byte after erase
    const ERASED_BYTE: u8 = 0xFF;

    /// Busy-flag polls allowed before an operation is declared timed out
    const TIMEOUT_POLLS: u32 = 1_000_000;

    /// Read data from flash
    ///
    /// # Errors
    ///
    /// `FlashOutOfBounds` outside the device, `FlashReadFailed` on a bus error.
    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()>;

    /// Program data and wait for completion
    ///
    /// # Errors
    ///
    /// `Timeout` if the device stays busy past [`Self::TIMEOUT_POLLS`]; the
    /// write is then unconfirmed and must be treated as failed.
    fn write(&mut self, address: u32, data: &[u8]) -> HalResult<()>;

    /// Erase the sector starting at `address`
    ///
    /// # Errors
    ///
    /// `FlashMisaligned` if `address` is not a sector boundary.
    fn erase_sector(&mut self, address: u32) -> HalResult<()>;

    /// Erase every sector in `start..end`
    ///
    /// # Errors
    ///
    /// The first failing sector erase.
    fn erase_range(&mut self, start: u32, end: u32) -> HalResult<()> {
        let mut addr = start;
        while addr < end {
            self.erase_sector(addr)?;
            addr += Self::SECTOR_SIZE;
        }
        Ok(())
    }

    /// Verify flash contents match expected data
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    fn verify(&self, address: u32, expected: &[u8]) -> HalResult<bool> {
        let mut buffer = [0u8; CHUNK];
        let mut offset = 0;

        while offset < expected.len() {
            let chunk_size = (expected.len() - offset).min(buffer.len());
            self.read(address + offset as u32, &mut buffer[..chunk_size])?;

            if buffer[..chunk_size] != expected[offset..offset + chunk_size] {
                return Ok(false);
            }
            offset += chunk_size;
        }

        Ok(true)
    }

    /// Whether `len` bytes from `address` all read as erased
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    fn is_erased(&self, address: u32, len: u32) -> HalResult<bool> {
        let mut buffer = [0u8; CHUNK];
        let mut offset = 0u32;

        while offset < len {
            let chunk_size = ((len - offset) as usize).min(buffer.len());
            self.read(address + offset, &mut buffer[..chunk_size])?;
            if buffer[..chunk_size].iter().any(|&b| b != Self::ERASED_BYTE) {
                return Ok(false);
            }
            offset += chunk_size as u32;
        }

        Ok(true)
    }

    /// Copy `len` bytes from `src` to the erased region at `dst`
    ///
    /// # Errors
    ///
    /// The first failing read or write.
    fn copy(&mut self, src: u32, dst: u32, len: u32) -> HalResult<()> {
        let mut buffer = [0u8; CHUNK];
        let mut offset = 0u32;

        while offset < len {
            let chunk_size = ((len - offset) as usize).min(buffer.len());
            self.read(src + offset, &mut buffer[..chunk_size])?;
            self.write(dst + offset, &buffer[..chunk_size])?;
            offset += chunk_size as u32;
        }

        Ok(())
    }
}

impl<F: FlashInterface> FlashInterface for &mut F {
    const SECTOR_SIZE: u32 = F::SECTOR_SIZE;
    const BASE_ADDRESS: u32 = F::BASE_ADDRESS;
    const TOTAL_SIZE: u32 = F::TOTAL_SIZE;
    const ERASED_BYTE: u8 = F::ERASED_BYTE;
    const TIMEOUT_POLLS: u32 = F::TIMEOUT_POLLS;

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        (**self).read(address, buffer)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        (**self).write(address, data)
    }

    fn erase_sector(&mut self, address: u32) -> HalResult<()> {
        (**self).erase_sector(address)
    }
}

/// Poll `is_ready` until it reports completion, at most `budget` times
///
/// Drivers wrap their busy-flag check in this so no flash wait is unbounded.
///
/// # Errors
///
/// `HalError::Timeout` when the budget runs out; any error from `is_ready`.
pub fn poll_ready<F>(budget: u32, mut is_ready: F) -> HalResult<()>
where
    F: FnMut() -> HalResult<bool>,
{
    for _ in 0..budget {
        if is_ready()? {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(HalError::Timeout)
}

/// Where control goes after a successful boot decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootTarget {
    /// Slot the image executes from
    pub slot: SlotId,
    /// Flash address of the image header
    pub image_address: u32,
    /// Address the image expects to run at
    pub load_address: u32,
    /// Absolute entry point
    pub entry_point: u32,
    /// Image version
    pub version: Version,
}

/// Board services the orchestrator needs around the boot core
pub trait Platform {
    /// Bring up clocks and peripherals the boot core depends on
    ///
    /// # Errors
    ///
    /// `HalError::InitFailed(status)` with the board's non-zero status.
    fn init(&mut self) -> HalResult<()>;

    /// Transfer control to the verified image; never returns
    fn handoff(&mut self, target: &BootTarget) -> !;

    /// Stop after a fatal error; never returns
    fn halt(&mut self, error: Error) -> !;
}
