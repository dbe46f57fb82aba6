//! Structured operational logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once at startup
//! - Emit JSON on stderr, leaving stdout to the flow records
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - tower_http spans stay quiet unless asked for explicitly

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("mirror_sink={level},tower_http=warn")
}

/// Install the global JSON subscriber on stderr.
pub fn init(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
