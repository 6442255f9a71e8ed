//! Logging setup for binaries and tests

pub use log::{debug, error, info, trace, warn};

/// Initialize env_logger with millisecond timestamps.
///
/// Call once at process start; the library itself only emits through the
/// `log` facade.
pub fn init() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}
