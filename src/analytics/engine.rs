//! Per-session analytics state machine.
//!
//! Owns every market's book, history, and cached enriched stats, plus the
//! signal tracker. The session worker feeds it messages and drives the two
//! periodic computations; everything here is synchronous and runs to
//! completion without yielding.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::analytics::arb;
use crate::analytics::book::{MarketBook, TickerRecord};
use crate::analytics::enrich::{enrich, EnrichedStats};
use crate::analytics::history::MarketHistory;
use crate::analytics::ladder::{build_ladders, Ladder, LadderConfig};
use crate::analytics::parser::{GroupType, ParsedMarket};
use crate::analytics::signals::{Signal, SignalTracker};
use crate::analytics::stats::{compute_stats, FeedStatus};
use crate::consts::STALE_THRESHOLD_MS;
use crate::feed::message_types::FeedMessage;
use crate::logging::targets;

/// Frozen per-market metadata, attached at session start.
#[derive(Debug, Clone)]
pub struct MarketMeta {
    pub ticker: String,
    pub title: String,
    pub event_ticker: String,
    pub group_type: GroupType,
    pub parsed: ParsedMarket,
}

/// Mutable per-market state.
#[derive(Debug)]
struct MarketState {
    meta: MarketMeta,
    book: MarketBook,
    history: MarketHistory,
}

/// Output of one slow tick.
#[derive(Debug, Default)]
pub struct SlowTickOutput {
    pub signals: Vec<Signal>,
    pub ladders: Vec<Ladder>,
}

/// The analytics core for one session.
#[derive(Debug)]
pub struct AnalyticsEngine {
    ladder_cfg: LadderConfig,
    markets: HashMap<String, MarketState>,
    dirty: HashSet<String>,
    enriched: HashMap<String, EnrichedStats>,
    tracker: SignalTracker,
}

impl AnalyticsEngine {
    pub fn new(ladder_cfg: LadderConfig) -> Self {
        Self {
            ladder_cfg,
            markets: HashMap::new(),
            dirty: HashSet::new(),
            enriched: HashMap::new(),
            tracker: SignalTracker::new(),
        }
    }

    /// Register one market. Metadata is frozen for the session.
    pub fn register_market(&mut self, meta: MarketMeta) {
        let ticker = meta.ticker.clone();
        self.markets.insert(
            ticker.clone(),
            MarketState {
                meta,
                book: MarketBook::new(),
                history: MarketHistory::new(),
            },
        );
        self.dirty.insert(ticker);
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    /// Apply one upstream message. Events for unregistered markets are
    /// dropped; control records are no-ops here.
    pub fn apply(&mut self, message: &FeedMessage, now_ms: u64) {
        let ticker = match message.market_ticker() {
            Some(t) => t.to_string(),
            None => return,
        };
        let state = match self.markets.get_mut(&ticker) {
            Some(s) => s,
            None => {
                debug!(
                    target: targets::ANALYTICS,
                    ticker = %ticker,
                    "event for unsubscribed market dropped"
                );
                return;
            }
        };

        match message {
            FeedMessage::Ticker(msg) => {
                state.book.apply_ticker(
                    now_ms,
                    TickerRecord {
                        yes_bid: msg.yes_bid,
                        yes_ask: msg.yes_ask,
                        last_price: msg.last_price,
                        volume: msg.volume,
                        volume_24h: msg.volume_24h,
                        open_interest: msg.open_interest,
                    },
                );
            }
            FeedMessage::OrderbookSnapshot(msg) => {
                state.book.apply_snapshot(now_ms, &msg.yes, &msg.no);
            }
            FeedMessage::OrderbookDelta(msg) => {
                state.book.apply_delta(now_ms, msg.side, msg.price, msg.delta);
            }
            FeedMessage::Trade(msg) => {
                let price = msg
                    .yes_price
                    .or_else(|| msg.no_price.map(|p| 100 - p))
                    .unwrap_or(0);
                let side = state.book.classify_trade(msg.taker_side.as_deref(), price);
                state.book.apply_trade(now_ms);
                state
                    .history
                    .record_trade(now_ms, price, msg.count.unwrap_or(1), side);
            }
            FeedMessage::Subscribed(_) | FeedMessage::Error(_) => return,
        }

        if let Some(mid) = state.book.mid() {
            state.history.record_mid(now_ms, mid);
        }
        self.dirty.insert(ticker);
    }

    /// Fast tick: recompute dirty markets fully and age-refresh the rest.
    /// Returns the full enriched map.
    pub fn compute_dirty(&mut self, now_ms: u64) -> &HashMap<String, EnrichedStats> {
        let dirty: Vec<String> = self.dirty.drain().collect();
        for ticker in dirty {
            if let Some(state) = self.markets.get(&ticker) {
                let stats = compute_stats(&ticker, &state.book, &state.history, now_ms);
                let enriched = enrich(
                    stats,
                    &state.meta.parsed,
                    state.meta.group_type,
                    &state.history,
                    now_ms,
                );
                self.enriched.insert(ticker, enriched);
            }
        }

        // Clean markets still age: keep recency-derived fields current.
        for (ticker, cached) in &mut self.enriched {
            if cached.stats.ts == now_ms {
                continue;
            }
            if let Some(state) = self.markets.get(ticker) {
                let mut stats = cached.stats.clone();
                stats.ts = now_ms;
                stats.last_ticker_age_ms =
                    state.book.last_ticker_ts().map(|t| now_ms.saturating_sub(t));
                stats.last_orderbook_age_ms = state
                    .book
                    .last_orderbook_ts()
                    .map(|t| now_ms.saturating_sub(t));
                stats.last_trade_age_ms =
                    state.book.last_trade_ts().map(|t| now_ms.saturating_sub(t));
                let ages = [
                    stats.last_ticker_age_ms,
                    stats.last_orderbook_age_ms,
                    stats.last_trade_age_ms,
                ];
                stats.feed_status = if ages.iter().all(|a| a.is_none()) {
                    FeedStatus::Unknown
                } else if ages.iter().flatten().any(|a| *a <= STALE_THRESHOLD_MS) {
                    FeedStatus::Fresh
                } else {
                    FeedStatus::Stale
                };
                *cached = enrich(
                    stats,
                    &state.meta.parsed,
                    state.meta.group_type,
                    &state.history,
                    now_ms,
                );
            }
        }

        &self.enriched
    }

    /// Full recompute regardless of dirtiness.
    pub fn compute_all(&mut self, now_ms: u64) -> &HashMap<String, EnrichedStats> {
        self.dirty.extend(self.markets.keys().cloned());
        self.compute_dirty(now_ms)
    }

    /// Slow tick: ladders, arbitrage, and the signal lifecycle.
    pub fn slow_tick(&mut self, now_ms: u64) -> SlowTickOutput {
        self.compute_dirty(now_ms);

        let mut build = build_ladders(&self.enriched, &self.ladder_cfg, now_ms);
        let arb_candidates = arb::scan(&build.ladders);

        for candidate in build.candidates.drain(..).chain(arb_candidates) {
            self.tracker.observe(candidate, now_ms);
        }
        self.tracker.cleanup(now_ms);

        let signals = self.tracker.active_signals();
        for ladder in &mut build.ladders {
            ladder.violations = signals
                .iter()
                .filter(|s| s.candidate.ladder_key.as_deref() == Some(ladder.ladder_key.as_str()))
                .map(|s| s.id.clone())
                .collect();
        }

        SlowTickOutput {
            signals,
            ladders: build.ladders,
        }
    }

    /// Current enriched snapshot without recomputation.
    pub fn enriched(&self) -> &HashMap<String, EnrichedStats> {
        &self.enriched
    }
}
