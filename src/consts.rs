//! Session and analytics constants.
//!
//! Every tunable here has a matching field on a config struct; the constants
//! are the defaults and the single place reviewers look for the numbers.

/// Production WebSocket endpoint for the upstream market feed.
pub const MAINNET_WS_URL: &str = "wss://api.elections.kalshi.com/trade-api/ws/v2";
/// Production REST endpoint for market discovery.
pub const MAINNET_REST_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";
/// Demo environment WebSocket endpoint.
pub const DEMO_WS_URL: &str = "wss://demo-api.kalshi.co/trade-api/ws/v2";
/// Demo environment REST endpoint.
pub const DEMO_REST_URL: &str = "https://demo-api.kalshi.co/trade-api/v2";

/// Hard cap on subscribed markets per session; the tail is trimmed.
pub const MAX_MARKETS: usize = 50;

/// Coalesced ticker echo flush interval.
pub const TICKER_BATCH_INTERVAL_MS: u64 = 300;
/// Raw inbound event batch flush interval.
pub const RAW_BATCH_INTERVAL_MS: u64 = 500;
/// Fast tick: per-market stats recompute and emit.
pub const STATS_EMIT_INTERVAL_MS: u64 = 500;
/// Slow tick: ladders, arbitrage, and signal lifecycle.
pub const SIGNALS_EMIT_INTERVAL_MS: u64 = 1_000;

/// Rolling raw event buffer capacity.
pub const RAW_BUFFER_CAP: usize = 50;

/// Ring buffers keep at most this many entries per market.
pub const RING_BUFFER_MAX_SIZE: usize = 500;
/// Ring buffers keep at most this much history per market.
pub const RING_BUFFER_WINDOW_MS: u64 = 60_000;

/// A market with no update within this window reports a stale feed.
pub const STALE_THRESHOLD_MS: u64 = 3_000;
/// Mid move over the 5s anchor that flags a jump.
pub const JUMP_THRESHOLD_CENTS: f64 = 5.0;
/// Visible depth per book side.
pub const TOP_N_LEVELS: usize = 5;

/// Ladder gating: minimum top-5 depth before a point is analyzed.
pub const MIN_LIQUIDITY_DEPTH: i64 = 2_000;
/// Ladder gating: lifetime volume that can substitute for depth.
pub const MIN_LIQUIDITY_VOLUME: i64 = 5_000;
/// Ladder gating: widest spread an analyzed point may carry.
pub const MAX_SPREAD_CENTS: i64 = 3;
/// Ladder gating: oldest quote age an analyzed point may carry.
pub const MAX_STALE_MS: u64 = 5_000;

/// Minimum residual for an outlier-line candidate.
pub const OUTLIER_MIN_CENTS: f64 = 5.0;
/// Minimum bound-aware margin for a monotonicity candidate.
pub const MONO_MIN_CENTS: f64 = 3.0;
/// Monotonicity epsilon floor (probability units).
pub const MONO_EPSILON: f64 = 0.015;

/// A candidate must re-trigger continuously for this long before emit.
pub const PERSIST_MS: u64 = 3_000;
/// Minimum gap between emissions of the same canonical signal key.
pub const COOLDOWN_MS: u64 = 30_000;
/// Pending candidates unseen for this long are forgotten.
pub const PENDING_EVICT_MS: u64 = 2_000;
/// Active signals older than this are evicted.
pub const ACTIVE_SIGNAL_MAX_AGE_MS: u64 = 60_000;
/// Active-signal snapshots return at most this many entries.
pub const TOP_K_SIGNALS: usize = 8;

/// Per-market wide-spread flag threshold.
pub const WIDE_SPREAD_CENTS: i64 = 8;
/// Cross-ladder overpricing buffer above probability mass 1.0.
pub const ARB_BUFFER: f64 = 0.01;

/// Window after connect in which an upstream error is read as auth-required.
pub const AUTH_WINDOW_MS: u64 = 5_000;
