//! Structured logging setup.
//!
//! Component-targeted `tracing` with an env-filter. Filter examples:
//!
//! ```bash
//! # Debug only the analytics pipeline
//! RUST_LOG=linewatch::analytics=debug
//!
//! # Warn for all, debug for the signal lifecycle
//! RUST_LOG=warn,linewatch::signals=debug
//! ```

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`; falls back to `info` with noisy transport crates
/// capped at `warn`. Safe to call once per process; returns an error
/// string if a subscriber is already installed.
pub fn init_logging(env_filter_override: Option<&str>) -> Result<(), String> {
    let filter = if let Some(directives) = env_filter_override {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
                .add_directive("hyper=warn".parse().expect("static directive"))
                .add_directive("reqwest=warn".parse().expect("static directive"))
                .add_directive("tokio_tungstenite=warn".parse().expect("static directive"))
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Log target constants for component-specific filtering.
///
/// ```ignore
/// tracing::debug!(target: targets::SIGNALS, key = %key, "candidate emitted");
/// ```
pub mod targets {
    /// Session worker lifecycle and tick cadence.
    pub const SESSION: &str = "linewatch::session";
    /// Upstream feed transport.
    pub const FEED: &str = "linewatch::feed";
    /// Book, stats, and ladder computation.
    pub const ANALYTICS: &str = "linewatch::analytics";
    /// Signal lifecycle (persistence, cooldown, eviction).
    pub const SIGNALS: &str = "linewatch::signals";
    /// Market discovery.
    pub const RESOLVER: &str = "linewatch::resolver";
}
