//! Forwards `log` records from the core to a host-provided sink.
//!
//! The host registers a [`Logger`] once at startup with [`set_logger`]. Until
//! then records are dropped. Debug and trace records are only forwarded when
//! they originate from `keyguard` modules so third-party crates do not flood
//! the host log.
//!
//! ## Kotlin
//!
//! ```kotlin
//! object KeyguardLogBridge : Logger {
//!     override fun log(level: LogLevel, message: String) {
//!         when (level) {
//!             LogLevel.ERROR -> Log.e("keyguard", message)
//!             LogLevel.WARN -> Log.w("keyguard", message)
//!             else -> Log.d("keyguard", message)
//!         }
//!     }
//! }
//!
//! setLogger(KeyguardLogBridge) // once, in Application.onCreate
//! ```

use std::sync::{Arc, OnceLock};

/// Host log sink.
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of the encrypt and decrypt flows.
    Info,
    /// Recoverable problems, such as a purged invalidated key.
    Warn,
    /// Failed operations.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

struct ForeignLogger;

impl ForeignLogger {
    fn should_forward(metadata: &log::Metadata) -> bool {
        let verbose = metadata.level() >= log::Level::Debug;
        !verbose || metadata.target().starts_with("keyguard")
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::should_forward(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !Self::should_forward(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Registers the host log sink.
///
/// Only the first registration takes effect; later calls are ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    static LOGGER: ForeignLogger = ForeignLogger;

    if LOGGER_INSTANCE.set(logger).is_err() {
        log::warn!("keyguard logger already set, ignoring");
        return;
    }
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(level: log::Level, target: &str) -> log::Metadata<'_> {
        log::Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn test_debug_records_only_from_keyguard() {
        assert!(ForeignLogger::should_forward(&metadata(
            log::Level::Debug,
            "keyguard_core::vault"
        )));
        assert!(!ForeignLogger::should_forward(&metadata(
            log::Level::Trace,
            "uniffi::ffi"
        )));
    }

    #[test]
    fn test_warnings_forwarded_from_any_module() {
        assert!(ForeignLogger::should_forward(&metadata(
            log::Level::Warn,
            "tokio::runtime"
        )));
        assert!(ForeignLogger::should_forward(&metadata(
            log::Level::Error,
            "keyguard_core::codec"
        )));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Info), LogLevel::Info);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
