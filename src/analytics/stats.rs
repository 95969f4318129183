//! Per-market statistics.
//!
//! Pure computation over book and history state; no inputs are mutated.
//! Price-like fields are integer cents, probabilities are `cents / 100`.
//! A crossed quote (bid above ask) suppresses every price-derived field
//! rather than reporting an impossible book.

use serde::Serialize;

use crate::analytics::book::{BookSide, MarketBook};
use crate::analytics::history::{MarketHistory, TradeSide};
use crate::consts::{JUMP_THRESHOLD_CENTS, STALE_THRESHOLD_MS};

/// Upstream feed recency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Fresh,
    Stale,
    /// No update of any kind observed yet.
    Unknown,
}

/// One market's statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MarketStats {
    pub ticker: String,
    pub ts: u64,

    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,

    pub mid: Option<f64>,
    pub spread_cents: Option<i64>,
    pub spread_bps: Option<f64>,
    pub implied_prob: Option<f64>,
    pub microprice: Option<f64>,
    pub imbalance_top: Option<f64>,

    pub sum_bid_top5: i64,
    pub sum_ask_top5: i64,
    pub book_imbalance_top5: Option<f64>,
    pub wall_bid_size: i64,
    pub wall_bid_ratio: Option<f64>,
    pub wall_ask_size: i64,
    pub wall_ask_ratio: Option<f64>,

    pub trades_per_min: usize,
    pub vwap_60s: Option<f64>,
    pub buy_pressure: Option<f64>,
    pub sell_pressure: Option<f64>,
    pub vol_mid_60s: Option<f64>,

    pub price_delta_1m: Option<f64>,
    pub jump_flag: bool,
    pub jump_size: Option<f64>,

    pub last_ticker_age_ms: Option<u64>,
    pub last_orderbook_age_ms: Option<u64>,
    pub last_trade_age_ms: Option<u64>,
    pub feed_status: FeedStatus,

    /// Lifetime contract volume from the latest ticker.
    pub volume: i64,
}

/// Compute the statistics snapshot for one market at `now_ms`.
pub fn compute_stats(
    ticker: &str,
    book: &MarketBook,
    history: &MarketHistory,
    now_ms: u64,
) -> MarketStats {
    let top = book.top_of_book();

    // A crossed quote invalidates every price-derived field.
    let (best_bid, best_ask) = match (top.bid, top.ask) {
        (Some(b), Some(a)) if b > a => (None, None),
        pair => pair,
    };

    let mid = match (best_bid, best_ask) {
        (Some(b), Some(a)) => Some((b + a) as f64 / 2.0),
        _ => None,
    };
    let spread_cents = match (best_bid, best_ask) {
        (Some(b), Some(a)) => Some(a - b),
        _ => None,
    };
    let spread_bps = match (spread_cents, mid) {
        (Some(s), Some(m)) if m > 0.0 => Some(s as f64 / m * 10_000.0),
        _ => None,
    };
    let implied_prob = mid.map(|m| m / 100.0);

    let microprice = match (best_bid, best_ask) {
        (Some(b), Some(a)) if top.bid_size + top.ask_size > 0 => Some(
            (a as f64 * top.bid_size as f64 + b as f64 * top.ask_size as f64)
                / (top.bid_size + top.ask_size) as f64,
        ),
        _ => None,
    };
    let imbalance_top = if top.bid_size + top.ask_size > 0 {
        Some((top.bid_size - top.ask_size) as f64 / (top.bid_size + top.ask_size) as f64)
    } else {
        None
    };

    let bid_levels = book.top_levels(BookSide::Yes);
    let ask_levels = book.top_levels(BookSide::No);
    let sum_bid_top5: i64 = bid_levels.iter().map(|(_, s)| s).sum();
    let sum_ask_top5: i64 = ask_levels.iter().map(|(_, s)| s).sum();
    let book_imbalance_top5 = if sum_bid_top5 + sum_ask_top5 > 0 {
        Some((sum_bid_top5 - sum_ask_top5) as f64 / (sum_bid_top5 + sum_ask_top5) as f64)
    } else {
        None
    };
    let wall_bid_size = bid_levels.iter().map(|(_, s)| *s).max().unwrap_or(0);
    let wall_ask_size = ask_levels.iter().map(|(_, s)| *s).max().unwrap_or(0);
    let wall_bid_ratio = (sum_bid_top5 > 0).then(|| wall_bid_size as f64 / sum_bid_top5 as f64);
    let wall_ask_ratio = (sum_ask_top5 > 0).then(|| wall_ask_size as f64 / sum_ask_top5 as f64);

    let cutoff = now_ms.saturating_sub(60_000);
    let window: Vec<_> = history.trades_since(cutoff).collect();
    let trades_per_min = window.len();
    let total_count: i64 = window.iter().map(|t| t.count).sum();
    let vwap_60s = if total_count > 0 {
        let notional: f64 = window
            .iter()
            .map(|t| t.price as f64 * t.count as f64)
            .sum();
        Some(notional / total_count as f64)
    } else {
        None
    };
    let buys = window.iter().filter(|t| t.side == TradeSide::Buy).count();
    let sells = window.iter().filter(|t| t.side == TradeSide::Sell).count();
    let (buy_pressure, sell_pressure) = if buys + sells > 0 {
        (
            Some(buys as f64 / (buys + sells) as f64),
            Some(sells as f64 / (buys + sells) as f64),
        )
    } else {
        (None, None)
    };

    let vol_mid_60s = mid_change_stddev(history, cutoff);

    let price_delta_1m = match (mid, history.mid_1m_ago()) {
        (Some(m), Some(ago)) => Some(m - ago),
        _ => None,
    };
    let jump_size = match (mid, history.mid_5s_ago()) {
        (Some(m), Some(ago)) => Some(m - ago),
        _ => None,
    };
    let jump_flag = jump_size
        .map(|j| j.abs() >= JUMP_THRESHOLD_CENTS)
        .unwrap_or(false);

    let last_ticker_age_ms = book.last_ticker_ts().map(|ts| now_ms.saturating_sub(ts));
    let last_orderbook_age_ms = book.last_orderbook_ts().map(|ts| now_ms.saturating_sub(ts));
    let last_trade_age_ms = book.last_trade_ts().map(|ts| now_ms.saturating_sub(ts));

    let ages = [last_ticker_age_ms, last_orderbook_age_ms, last_trade_age_ms];
    let feed_status = if ages.iter().all(|a| a.is_none()) {
        FeedStatus::Unknown
    } else if ages.iter().flatten().any(|a| *a <= STALE_THRESHOLD_MS) {
        FeedStatus::Fresh
    } else {
        FeedStatus::Stale
    };

    MarketStats {
        ticker: ticker.to_string(),
        ts: now_ms,
        best_bid,
        best_ask,
        bid_size: top.bid_size,
        ask_size: top.ask_size,
        mid,
        spread_cents,
        spread_bps,
        implied_prob,
        microprice,
        imbalance_top,
        sum_bid_top5,
        sum_ask_top5,
        book_imbalance_top5,
        wall_bid_size,
        wall_bid_ratio,
        wall_ask_size,
        wall_ask_ratio,
        trades_per_min,
        vwap_60s,
        buy_pressure,
        sell_pressure,
        vol_mid_60s,
        price_delta_1m,
        jump_flag,
        jump_size,
        last_ticker_age_ms,
        last_orderbook_age_ms,
        last_trade_age_ms,
        feed_status,
        volume: book.volume(),
    }
}

/// Standard deviation of successive mid changes within the window.
fn mid_change_stddev(history: &MarketHistory, cutoff_ms: u64) -> Option<f64> {
    let mids: Vec<f64> = history.mids_since(cutoff_ms).map(|m| m.mid).collect();
    if mids.len() < 3 {
        return None;
    }
    let deltas: Vec<f64> = mids.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let var = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / deltas.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::book::TickerRecord;

    fn seeded_book() -> MarketBook {
        let mut book = MarketBook::new();
        book.apply_snapshot(1_000, &[(45, 100), (44, 300)], &[(53, 200), (52, 100)]);
        book
    }

    #[test]
    fn test_price_bounds_hold() {
        let book = seeded_book();
        let stats = compute_stats("T", &book, &MarketHistory::new(), 2_000);
        let bid = stats.best_bid.unwrap();
        let ask = stats.best_ask.unwrap();
        assert!(bid <= ask);
        assert!((0..=100).contains(&bid));
        assert!((0..=100).contains(&ask));
        assert!(stats.spread_cents.unwrap() >= 0);
        let prob = stats.implied_prob.unwrap();
        assert!((0.0..=1.0).contains(&prob));
    }

    #[test]
    fn test_microprice_and_imbalance() {
        let book = seeded_book();
        let stats = compute_stats("T", &book, &MarketHistory::new(), 2_000);
        // bid=45 (size 100), ask=47 (size 200).
        let micro = stats.microprice.unwrap();
        assert!((micro - (47.0 * 100.0 + 45.0 * 200.0) / 300.0).abs() < 1e-9);
        let imb = stats.imbalance_top.unwrap();
        assert!((imb - (100.0 - 200.0) / 300.0).abs() < 1e-9);
        assert_eq!(stats.sum_bid_top5, 400);
        assert_eq!(stats.sum_ask_top5, 300);
        assert_eq!(stats.wall_bid_size, 300);
    }

    #[test]
    fn test_trade_window_stats() {
        let book = seeded_book();
        let mut history = MarketHistory::new();
        history.record_trade(10_000, 46, 10, TradeSide::Buy);
        history.record_trade(20_000, 48, 30, TradeSide::Buy);
        history.record_trade(30_000, 44, 10, TradeSide::Sell);

        let stats = compute_stats("T", &book, &history, 40_000);
        assert_eq!(stats.trades_per_min, 3);
        // VWAP = (46*10 + 48*30 + 44*10) / 50 = 46.8
        assert!((stats.vwap_60s.unwrap() - 46.8).abs() < 1e-9);
        assert!((stats.buy_pressure.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.sell_pressure.unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_jump_detection() {
        let mut book = MarketBook::new();
        let mut history = MarketHistory::new();

        book.apply_ticker(
            0,
            TickerRecord {
                yes_bid: Some(40),
                yes_ask: Some(42),
                ..Default::default()
            },
        );
        history.record_mid(0, 41.0);

        // Mid moves 7 cents against the 5s anchor.
        book.apply_ticker(
            6_000,
            TickerRecord {
                yes_bid: Some(47),
                yes_ask: Some(49),
                ..Default::default()
            },
        );
        let stats = compute_stats("T", &book, &history, 6_000);
        assert!(stats.jump_flag);
        assert!((stats.jump_size.unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_transitions() {
        let mut book = MarketBook::new();
        let history = MarketHistory::new();

        let stats = compute_stats("T", &book, &history, 0);
        assert_eq!(stats.feed_status, FeedStatus::Unknown);

        book.apply_ticker(1_000, TickerRecord::default());
        let stats = compute_stats("T", &book, &history, 2_000);
        assert_eq!(stats.feed_status, FeedStatus::Fresh);

        let stats = compute_stats("T", &book, &history, 4_001);
        assert_eq!(stats.feed_status, FeedStatus::Stale);
    }

    #[test]
    fn test_vol_requires_history() {
        let book = seeded_book();
        let mut history = MarketHistory::new();
        let stats = compute_stats("T", &book, &history, 1_000);
        assert!(stats.vol_mid_60s.is_none());

        history.record_mid(100, 40.0);
        history.record_mid(200, 42.0);
        history.record_mid(300, 41.0);
        history.record_mid(400, 43.0);
        let stats = compute_stats("T", &book, &history, 1_000);
        assert!(stats.vol_mid_60s.unwrap() > 0.0);
    }
}
