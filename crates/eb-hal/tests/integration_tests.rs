// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for eb-hal
//!
//! Run with `--features sim`.

#![cfg(feature = "sim")]

use eb_common::{Error, StorageError};
use eb_hal::sim::SimFlash;
use eb_hal::{FlashInterface, HalError};

type Flash = SimFlash<0x2000, 0x400>;

mod flash_tests {
    use super::*;

    #[test]
    fn test_geometry_constants() {
        assert_eq!(Flash::SECTOR_SIZE, 0x400);
        assert_eq!(Flash::TOTAL_SIZE, 0x2000);
        assert_eq!(Flash::BASE_ADDRESS, 0);
        assert_eq!(Flash::ERASED_BYTE, 0xFF);
    }

    #[test]
    fn test_generic_code_through_mut_ref() {
        fn stamp<F: FlashInterface>(mut flash: F) -> Result<(), HalError> {
            flash.erase_sector(0)?;
            flash.write(0, b"EB")
        }
        let mut flash = Flash::new();
        stamp(&mut flash).unwrap();
        assert_eq!(flash.slice(0, 2), b"EB");
    }

    #[test]
    fn test_erase_range_covers_sectors() {
        let mut flash = Flash::new();
        flash.load(0, &[0u8; 0x2000]);
        flash.erase_range(0x400, 0xC00).unwrap();
        assert!(flash.is_erased(0x400, 0x800).unwrap());
        assert!(!flash.is_erased(0, 0x400).unwrap());
        assert!(!flash.is_erased(0xC00, 0x400).unwrap());
    }
}

mod fault_tests {
    use super::*;

    #[test]
    fn test_timeout_surfaces_as_storage_timeout() {
        let mut flash = Flash::new();
        flash.set_latency(u32::MAX);
        let err = flash.erase_sector(0).unwrap_err();
        assert_eq!(Error::from(err), Error::Storage(StorageError::Timeout));
    }

    #[test]
    fn test_every_cut_point_reported() {
        for cut in 0..4 {
            let mut flash = Flash::new();
            flash.fail_after(cut);
            let mut result = Ok(());
            for i in 0..4u32 {
                result = flash.write(i * 16, &[0u8; 16]);
                if result.is_err() {
                    break;
                }
            }
            assert_eq!(result, Err(HalError::PowerLoss));
            assert_eq!(flash.ops(), cut + 1);
        }
    }
}
