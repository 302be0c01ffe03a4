//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag.
//!
//! The capture and upload loops log on every phase change; these macros let a
//! module silence that chatter without touching the global `RUST_LOG` filter.
//!
//! Usage:
//! ```ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("countdown started for session {}", session_id);
//! ```

/// Conditional info logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional debug logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional warn logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Remembers the last logged marker so a loop that runs once per frame only
/// logs when something actually changed.
#[derive(Debug, Clone, Default)]
pub struct LogState<K> {
    last: Option<K>,
}

impl<K: PartialEq> LogState<K> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Returns `true` when `mark` differs from the previous one.
    pub fn changed(&mut self, mark: K) -> bool {
        if self.last.as_ref() == Some(&mark) {
            return false;
        }
        self.last = Some(mark);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
