// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for eb-common
//!
//! Exercises the public surface as dependent crates see it: CRC engine,
//! error taxonomy, build-time policy, version ordering and the log macros.

use eb_common::{
    crc32, AlgorithmId, BootConfig, BootLogger, ConfigError, Crc32, Error, ErrorCategory,
    FlashLayout, LogBuffer, LogLevel, NullLogger, ParseError, Region, RejectReason, SlotId,
    StorageError, UpgradeMode, Version, CRC32_EMPTY,
};

mod crc_tests {
    use super::*;

    #[test]
    fn test_deterministic_over_many_buffers() {
        let mut buf = [0u8; 257];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i * 31 % 251) as u8;
        }
        for len in [0, 1, 2, 63, 64, 65, 256, 257] {
            assert_eq!(crc32(&buf[..len]), crc32(&buf[..len]));
        }
    }

    #[test]
    fn test_empty_buffer_constant() {
        assert_eq!(crc32(&[]), CRC32_EMPTY);
        assert_eq!(Crc32::new().finalize(), CRC32_EMPTY);
    }

    #[test]
    fn test_single_bit_flip_detected() {
        let mut record = [0x5Au8; 28];
        let before = crc32(&record);
        record[13] ^= 0x04;
        assert_ne!(crc32(&record), before);
    }

    #[test]
    fn test_chunked_equals_oneshot() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i ^ (i >> 3)) as u8).collect();
        for chunk in [1, 3, 64, 999] {
            let mut crc = Crc32::default();
            for part in data.chunks(chunk) {
                crc.update(part);
            }
            assert_eq!(crc.finalize(), crc32(&data));
        }
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_category_high_byte() {
        let errors = [
            (Error::Config(ConfigError::SlotTooSmall), ErrorCategory::Config),
            (Error::Parse(ParseError::Truncated), ErrorCategory::Parse),
            (Error::Trust(RejectReason::SignatureInvalid), ErrorCategory::Trust),
            (Error::Storage(StorageError::ReadFailed), ErrorCategory::Storage),
            (Error::Platform(3), ErrorCategory::Platform),
        ];
        for (error, category) in errors {
            assert_eq!(error.category(), category);
            assert_eq!((error.code() >> 8) as u8, category as u8);
            assert!(!error.description().is_empty());
        }
    }

    #[test]
    fn test_display_contains_code() {
        let text = Error::Storage(StorageError::Timeout).to_string();
        assert!(text.starts_with("[0x0404]"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_codes_unique_within_category() {
        let parse = [
            ParseError::BadMagic,
            ParseError::Truncated,
            ParseError::SizeOverflow,
            ParseError::BadTrailer,
            ParseError::UnsupportedFormat,
            ParseError::HeaderChecksum,
            ParseError::ConflictingFlags,
            ParseError::BadEntryPoint,
        ];
        let mut seen = std::collections::HashSet::new();
        for e in parse {
            assert!(seen.insert(e.code()));
        }
    }
}

mod config_tests {
    use super::*;

    const SMALL: BootConfig = BootConfig {
        layout: FlashLayout {
            sector_size: 0x400,
            status: Region::new(0x0000, 0x0800),
            scratch: Region::new(0x0800, 0x0400),
            primary: Region::new(0x1000, 0x2000),
            secondary: Region::new(0x3000, 0x2000),
        },
        max_image_size: 0x2000,
        ..BootConfig::DEFAULT
    }
    .checked();

    #[test]
    fn test_const_checked_config() {
        assert_eq!(SMALL.layout.sectors_per_slot(), 8);
        assert_eq!(SMALL.layout.region(SlotId::Scratch).size, 0x400);
        assert_eq!(SMALL.upgrade_mode, UpgradeMode::Swap);
    }

    #[test]
    fn test_default_algorithms_supported() {
        let config = BootConfig::default();
        assert_eq!(config.hash_algorithm, AlgorithmId::Sha3_256);
        assert_eq!(config.signature_algorithm, AlgorithmId::Falcon512);
        assert!(config.hash_algorithm.is_supported());
        assert!(config.signature_algorithm.is_supported());
    }

    #[test]
    fn test_status_area_overlapping_slot() {
        let mut config = SMALL;
        config.layout.status = Region::new(0x2800, 0x0800);
        assert_eq!(config.validate(), Err(ConfigError::RegionOverlap));
    }
}

mod version_tests {
    use super::*;

    #[test]
    fn test_header_bytes_decode() {
        let v = Version::from_bytes(&[1, 4, 0x10, 0x00, 0x2A, 0, 0, 0]).unwrap();
        assert_eq!(v, Version::new(1, 4, 16, 42));
        assert_eq!(v.to_string(), "1.4.16+42");
    }

    #[test]
    fn test_rollback_ordering() {
        let installed = Version::new(2, 0, 0, 0);
        assert!(Version::new(1, 9, 65535, u32::MAX) < installed);
        assert!(!Version::new(1, 9, 0, 0).satisfies_minimum(&installed));
        assert!(Version::ZERO.satisfies_minimum(&Version::ZERO));
    }
}

mod log_tests {
    use super::*;
    use eb_common::log::static_enabled;

    #[test]
    fn test_macros_with_buffer() {
        if !static_enabled(LogLevel::Error) {
            return;
        }
        let mut log = LogBuffer::new();
        eb_common::log_error!(log, "flash error at 0x{:08X}", 0x0802_0000u32);
        eb_common::log_trace!(log, "below default level");
        assert_eq!(log.len(), 1);
        assert!(log.contains(LogLevel::Error, "0x08020000"));
    }

    #[test]
    fn test_entry_display() {
        if !static_enabled(LogLevel::Warn) {
            return;
        }
        let mut log = LogBuffer::new();
        eb_common::log_warn!(log, "candidate rejected");
        let line = log.iter().next().unwrap().to_string();
        assert!(line.starts_with("[0000] W ["));
        assert!(line.ends_with("candidate rejected"));
    }

    #[test]
    fn test_null_logger_never_evaluates_sink() {
        let mut logger = NullLogger;
        eb_common::log_info!(logger, "{}", 1);
        assert!(!<NullLogger as BootLogger>::ENABLED);
    }
}
