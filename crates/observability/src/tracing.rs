//! Tracing/logging initialization.
//!
//! `RUST_LOG` selects the filter (falling back to the given default
//! directive), `LOG_FORMAT=pretty` switches from JSON lines to
//! human-readable output for local runs.

use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(format: LogFormat, default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

/// Root span for one inbound request; every event logged while handling
/// the request carries its correlation id.
pub fn request_span(correlation_id: Uuid, method: &str, path: &str) -> Span {
    tracing::info_span!("request", %correlation_id, method, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_json() {
        assert_eq!(LogFormat::parse(None), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("bogus")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" Pretty ")), LogFormat::Pretty);
    }

    #[test]
    fn init_is_idempotent() {
        init(LogFormat::Json, "warn");
        init(LogFormat::Pretty, "debug");
    }
}
