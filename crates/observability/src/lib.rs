//! Process-wide logging setup and request span helpers.

/// Tracing configuration (filters, output format, spans).
pub mod tracing;

pub use self::tracing::{LogFormat, request_span};

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env(), "info");
}
