//! Observability for the lending service
//!
//! - Structured logging through `tracing`, each line tagged with an [`Event`]
//! - In-process counters in [`LibraryMetrics`]
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on lending decisions
//! 3. Logging setup failure never stops the service
//!
//! # Usage
//!
//! ```ignore
//! use libris::observability::{Event, LibraryMetrics};
//!
//! tracing::info!(event = %Event::BookBorrowed, book_id = 7, "book borrowed");
//!
//! let metrics = LibraryMetrics::new();
//! metrics.increment_borrows();
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{LibraryMetrics, MetricsSnapshot};

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    Text,
    /// One JSON object per line
    Json,
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is
/// harmless; the second subscriber is ignored.
pub fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    let result = if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parses_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Auto);
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(LogFormat::Text);
        init_logging(LogFormat::Json);
    }
}
