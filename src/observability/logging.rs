//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick pretty or JSON output from settings
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Initialising twice is not an error (tests and embedders may race)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Filter used when neither `RUST_LOG` nor settings say otherwise.
pub const DEFAULT_FILTER: &str = "content_rewriter=info";

/// Build the filter directive for a configured level.
pub fn filter_directive(settings: &LoggingSettings) -> String {
    format!("content_rewriter={}", settings.level.to_ascii_lowercase())
}

/// Install the global subscriber.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(settings)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
