//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The polling loop and the presenter log on every tick; these macros let a
//! module silence itself without touching `RUST_LOG`. Each record is tagged
//! with the calling module path so the filter in `env_logger` still applies.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info};
//!
//! log_info!("checked {} reminders", 3);
//! ```

/// Info record, emitted only when the caller's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!(target: module_path!(), $($arg)*);
        }
    };
}

/// Debug record, emitted only when the caller's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!(target: module_path!(), $($arg)*);
        }
    };
}

/// Warn record, emitted only when the caller's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!(target: module_path!(), $($arg)*);
        }
    };
}

/// Errors bypass the flag; a silenced module still reports failures.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!(target: module_path!(), $($arg)*);
    };
}

/// Initialise `env_logger` at `Info`, letting `RUST_LOG` override.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
