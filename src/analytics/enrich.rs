//! Stats enrichment.
//!
//! Joins per-market statistics with parsed ladder metadata and derives the
//! per-market scores and alert flags. Flags here are point-in-time reads
//! of the current snapshot; the persisted signal stream is the
//! [`SignalTracker`](crate::analytics::signals::SignalTracker)'s job.

use serde::Serialize;

use crate::analytics::history::MarketHistory;
use crate::analytics::parser::{GroupType, ParseSource, ParsedMarket};
use crate::analytics::signals::SignalType;
use crate::analytics::stats::MarketStats;
use crate::consts::WIDE_SPREAD_CENTS;

/// Statistics joined with ladder metadata and derived scores.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedStats {
    #[serde(flatten)]
    pub stats: MarketStats,

    pub group_type: GroupType,
    pub line: Option<f64>,
    pub side: String,
    pub parse_source: ParseSource,
    pub ladder_key: Option<String>,

    /// Depth and spread quality in `[0, 1]`.
    pub liquidity_score: f64,
    /// Age-based staleness in `[0, 1]`; 1 before any update.
    pub staleness_score: f64,
    /// Absolute mid move against history at least 5s old, in cents.
    pub jump_score_5s: f64,
    /// Absolute mid move against history at least 30s old, in cents.
    pub jump_score_30s: f64,
    /// Estimated cost in cents to exit a position now. Clamped up to 50;
    /// 99 when the top of book is empty.
    pub exitability_cents: f64,
    /// Point-in-time alert flags for this market.
    pub signals: Vec<SignalType>,
}

/// Enrich one market's stats with metadata and scores.
pub fn enrich(
    stats: MarketStats,
    meta: &ParsedMarket,
    group_type: GroupType,
    history: &MarketHistory,
    now_ms: u64,
) -> EnrichedStats {
    let liquidity_score = match stats.spread_cents {
        Some(spread) => {
            let depth = stats.bid_size.min(stats.ask_size) as f64;
            (depth / 500.0).min(1.0) * (1.0 - (spread as f64 / 20.0).min(0.5))
        }
        None => 0.0,
    };

    let known_ages: Vec<u64> = [
        stats.last_ticker_age_ms,
        stats.last_orderbook_age_ms,
        stats.last_trade_age_ms,
    ]
    .into_iter()
    .flatten()
    .collect();
    let staleness_score = match known_ages.iter().max() {
        Some(max_age) => (*max_age as f64 / 10_000.0).min(1.0),
        None => 1.0,
    };

    let jump_score = |window_ms: u64| -> f64 {
        match (stats.mid, history.mid_at_least_as_old(now_ms, window_ms)) {
            (Some(mid), Some(old)) => (mid - old).abs(),
            _ => 0.0,
        }
    };
    let jump_score_5s = jump_score(5_000);
    let jump_score_30s = jump_score(30_000);

    let avg_top_size = (stats.bid_size + stats.ask_size) as f64 / 2.0;
    let exitability_cents = match stats.spread_cents {
        Some(spread) if avg_top_size > 0.0 => {
            (spread as f64 / 2.0 + 100.0 / avg_top_size.max(1.0)).min(50.0)
        }
        _ => 99.0,
    };

    let mut signals = Vec::new();
    if staleness_score > 0.7 {
        signals.push(SignalType::StaleQuote);
    }
    if stats.jump_flag {
        signals.push(SignalType::Jump);
    }
    if liquidity_score < 0.2 {
        signals.push(SignalType::LowLiquidity);
    }
    if stats.spread_cents.map(|s| s >= WIDE_SPREAD_CENTS).unwrap_or(false) {
        signals.push(SignalType::WideSpread);
    }

    EnrichedStats {
        stats,
        group_type,
        line: meta.line,
        side: meta.side.clone(),
        parse_source: meta.parse_source,
        ladder_key: meta.ladder_key.clone(),
        liquidity_score,
        staleness_score,
        jump_score_5s,
        jump_score_30s,
        exitability_cents,
        signals,
    }
}
