// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Logging hooks for EdgeBoot
//!
//! Boot code logs every phase transition and every error through a
//! [`BootLogger`]. The logger is a type parameter of the boot context, so the
//! sink is chosen at compile time:
//!
//! - [`NullLogger`]: `ENABLED = false`; every call site compiles to nothing
//! - [`LogBuffer`]: fixed-size ring buffer, readable after boot or from tests
//! - `DefmtLogger`: forwards to `defmt` (feature `defmt`)
//!
//! The `log-off` / `log-max-*` features cap the level globally, independent
//! of the logger in use.
//!
//! # Security
//!
//! Key material and signatures must never be logged.

use core::fmt::{self, Write};
use heapless::String;

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 128;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that decide the boot outcome
    Error = 0,
    /// Rejected candidates, recovered state
    Warn = 1,
    /// Phase transitions
    Info = 2,
    /// Per-step detail
    Debug = 3,
    /// Per-sector detail
    Trace = 4,
}

impl LogLevel {
    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Get a short prefix for the log level
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Compile-time ceiling
// =============================================================================

/// Most verbose level compiled in, `None` when logging is compiled out
#[cfg(feature = "log-off")]
pub const STATIC_MAX_LEVEL: Option<LogLevel> = None;

/// Most verbose level compiled in, `None` when logging is compiled out
#[cfg(all(not(feature = "log-off"), feature = "log-max-error"))]
pub const STATIC_MAX_LEVEL: Option<LogLevel> = Some(LogLevel::Error);

/// Most verbose level compiled in, `None` when logging is compiled out
#[cfg(all(
    not(feature = "log-off"),
    not(feature = "log-max-error"),
    feature = "log-max-warn"
))]
pub const STATIC_MAX_LEVEL: Option<LogLevel> = Some(LogLevel::Warn);

/// Most verbose level compiled in, `None` when logging is compiled out
#[cfg(all(
    not(feature = "log-off"),
    not(feature = "log-max-error"),
    not(feature = "log-max-warn"),
    feature = "log-max-info"
))]
pub const STATIC_MAX_LEVEL: Option<LogLevel> = Some(LogLevel::Info);

/// Most verbose level compiled in, `None` when logging is compiled out
#[cfg(not(any(
    feature = "log-off",
    feature = "log-max-error",
    feature = "log-max-warn",
    feature = "log-max-info"
)))]
pub const STATIC_MAX_LEVEL: Option<LogLevel> = Some(LogLevel::Trace);

/// Whether `level` survives the compile-time ceiling
#[inline(always)]
#[must_use]
pub const fn static_enabled(level: LogLevel) -> bool {
    match STATIC_MAX_LEVEL {
        Some(max) => (level as u8) <= (max as u8),
        None => false,
    }
}

// =============================================================================
// Logger trait
// =============================================================================

/// Sink for boot log messages
pub trait BootLogger {
    /// `false` removes every call site at compile time
    const ENABLED: bool = true;

    /// Record one message
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>);

    /// Most verbose level this logger accepts at runtime
    fn max_level(&self) -> LogLevel {
        LogLevel::Trace
    }

    /// Filter and record; this is what the `log_*!` macros call
    #[inline(always)]
    fn emit(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>)
    where
        Self: Sized,
    {
        if Self::ENABLED && static_enabled(level) && level <= self.max_level() {
            self.log(level, module, args);
        }
    }
}

impl<L: BootLogger> BootLogger for &mut L {
    const ENABLED: bool = L::ENABLED;

    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        (**self).log(level, module, args);
    }

    fn max_level(&self) -> LogLevel {
        (**self).max_level()
    }
}

/// Logger that discards everything at compile time
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl BootLogger for NullLogger {
    const ENABLED: bool = false;

    #[inline(always)]
    fn log(&mut self, _level: LogLevel, _module: &'static str, _args: fmt::Arguments<'_>) {}
}

// =============================================================================
// Ring buffer
// =============================================================================

/// Log entry structure
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Position in the overall message stream
    pub sequence: u32,
    /// Module path of the call site
    pub module: &'static str,
    /// Formatted message, truncated to [`MAX_LOG_MESSAGE_LEN`]
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:04}] {} [{}] {}",
            self.sequence,
            self.level.prefix(),
            self.module,
            self.message
        )
    }
}

/// Writer that keeps what fits and silently drops the rest
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular log buffer; the oldest entry is overwritten when full
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    write_index: usize,
    count: usize,
    sequence: u32,
    level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty log buffer recording up to `Debug`
    #[must_use]
    pub const fn new() -> Self {
        const NONE: Option<LogEntry> = None;
        Self {
            entries: [NONE; LOG_BUFFER_SIZE],
            write_index: 0,
            count: 0,
            sequence: 0,
            level: LogLevel::Debug,
        }
    }

    /// Set the most verbose level recorded
    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    /// Get the number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Messages recorded since creation, including overwritten ones
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.sequence
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.write_index = 0;
        self.count = 0;
    }

    /// Whether any retained message at `level` contains `needle`
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let start = if self.count < LOG_BUFFER_SIZE {
            0
        } else {
            self.write_index
        };
        (0..self.count).filter_map(move |i| self.entries[(start + i) % LOG_BUFFER_SIZE].as_ref())
    }

    fn push(&mut self, entry: LogEntry) {
        self.entries[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % LOG_BUFFER_SIZE;
        if self.count < LOG_BUFFER_SIZE {
            self.count += 1;
        }
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BootLogger for LogBuffer {
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        self.push(LogEntry {
            level,
            sequence,
            module,
            message,
        });
    }

    fn max_level(&self) -> LogLevel {
        self.level
    }
}

// =============================================================================
// defmt forwarder
// =============================================================================

/// Logger that forwards to the `defmt` global logger
#[cfg(feature = "defmt")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtLogger;

#[cfg(feature = "defmt")]
impl BootLogger for DefmtLogger {
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        let msg = defmt::Display2Format(&args);
        match level {
            LogLevel::Error => defmt::error!("[{=str}] {}", module, msg),
            LogLevel::Warn => defmt::warn!("[{=str}] {}", module, msg),
            LogLevel::Info => defmt::info!("[{=str}] {}", module, msg),
            LogLevel::Debug => defmt::debug!("[{=str}] {}", module, msg),
            LogLevel::Trace => defmt::trace!("[{=str}] {}", module, msg),
        }
    }
}

// =============================================================================
// Macros
// =============================================================================

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {{
        use $crate::log::BootLogger as _;
        $logger.emit($crate::log::LogLevel::Error, module_path!(), format_args!($($arg)*))
    }};
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {{
        use $crate::log::BootLogger as _;
        $logger.emit($crate::log::LogLevel::Warn, module_path!(), format_args!($($arg)*))
    }};
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {{
        use $crate::log::BootLogger as _;
        $logger.emit($crate::log::LogLevel::Info, module_path!(), format_args!($($arg)*))
    }};
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {{
        use $crate::log::BootLogger as _;
        $logger.emit($crate::log::LogLevel::Debug, module_path!(), format_args!($($arg)*))
    }};
}

/// Log a trace-level message
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)*) => {{
        use $crate::log::BootLogger as _;
        $logger.emit($crate::log::LogLevel::Trace, module_path!(), format_args!($($arg)*))
    }};
}
