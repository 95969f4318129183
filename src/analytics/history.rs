//! Per-market rolling history.
//!
//! Bounded mid and trade rings pruned by entry count and age, plus the
//! horizon anchors (`mid_5s_ago`, `mid_1m_ago`) used for jump and delta
//! measurement. Anchors refresh only once their horizon has elapsed, so a
//! `mid - anchor` difference always spans at least the named horizon.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::{RING_BUFFER_MAX_SIZE, RING_BUFFER_WINDOW_MS};

/// Aggressor side of a recorded trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
    Unknown,
}

/// One mid observation.
#[derive(Debug, Clone, Copy)]
pub struct MidPoint {
    pub ts: u64,
    /// Mid in cents; carries halves from odd spreads.
    pub mid: f64,
}

/// One trade print.
#[derive(Debug, Clone, Copy)]
pub struct TradePoint {
    pub ts: u64,
    /// YES price in cents.
    pub price: i64,
    /// Contracts traded.
    pub count: i64,
    pub side: TradeSide,
}

/// Horizon anchor: the mid captured when the anchor last refreshed.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    ts: u64,
    mid: f64,
}

/// Bounded history for one market.
#[derive(Debug, Default)]
pub struct MarketHistory {
    mids: VecDeque<MidPoint>,
    trades: VecDeque<TradePoint>,
    last_mid: Option<f64>,
    anchor_5s: Option<Anchor>,
    anchor_1m: Option<Anchor>,
}

impl MarketHistory {
    pub fn new() -> Self {
        Self {
            mids: VecDeque::with_capacity(64),
            trades: VecDeque::with_capacity(64),
            ..Default::default()
        }
    }

    /// Record a derived mid and refresh any elapsed anchors.
    pub fn record_mid(&mut self, now_ms: u64, mid: f64) {
        self.mids.push_back(MidPoint { ts: now_ms, mid });
        self.last_mid = Some(mid);

        match self.anchor_5s {
            None => self.anchor_5s = Some(Anchor { ts: now_ms, mid }),
            Some(a) if now_ms.saturating_sub(a.ts) >= 5_000 => {
                self.anchor_5s = Some(Anchor { ts: now_ms, mid });
            }
            _ => {}
        }
        match self.anchor_1m {
            None => self.anchor_1m = Some(Anchor { ts: now_ms, mid }),
            Some(a) if now_ms.saturating_sub(a.ts) >= 60_000 => {
                self.anchor_1m = Some(Anchor { ts: now_ms, mid });
            }
            _ => {}
        }

        self.prune(now_ms);
    }

    /// Record a trade print.
    pub fn record_trade(&mut self, now_ms: u64, price: i64, count: i64, side: TradeSide) {
        self.trades.push_back(TradePoint {
            ts: now_ms,
            price,
            count,
            side,
        });
        self.prune(now_ms);
    }

    /// Drop entries beyond the size cap or older than the window.
    fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(RING_BUFFER_WINDOW_MS);
        while self.mids.len() > RING_BUFFER_MAX_SIZE
            || self.mids.front().map(|m| m.ts < cutoff).unwrap_or(false)
        {
            self.mids.pop_front();
        }
        while self.trades.len() > RING_BUFFER_MAX_SIZE
            || self.trades.front().map(|t| t.ts < cutoff).unwrap_or(false)
        {
            self.trades.pop_front();
        }
    }

    pub fn last_mid(&self) -> Option<f64> {
        self.last_mid
    }

    /// Anchor value for the 5s horizon, if one has been captured.
    pub fn mid_5s_ago(&self) -> Option<f64> {
        self.anchor_5s.map(|a| a.mid)
    }

    /// Anchor value for the 1m horizon.
    pub fn mid_1m_ago(&self) -> Option<f64> {
        self.anchor_1m.map(|a| a.mid)
    }

    /// Mids within the trailing window, oldest first.
    pub fn mids_since(&self, cutoff_ms: u64) -> impl Iterator<Item = &MidPoint> {
        self.mids.iter().filter(move |m| m.ts >= cutoff_ms)
    }

    /// Trades within the trailing window, oldest first.
    pub fn trades_since(&self, cutoff_ms: u64) -> impl Iterator<Item = &TradePoint> {
        self.trades.iter().filter(move |t| t.ts >= cutoff_ms)
    }

    /// Newest mid whose age is at least `window_ms`, walking backwards.
    pub fn mid_at_least_as_old(&self, now_ms: u64, window_ms: u64) -> Option<f64> {
        self.mids
            .iter()
            .rev()
            .find(|m| now_ms.saturating_sub(m.ts) >= window_ms)
            .map(|m| m.mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_by_count() {
        let mut h = MarketHistory::new();
        for i in 0..(RING_BUFFER_MAX_SIZE as u64 + 100) {
            h.record_mid(i, 50.0);
        }
        assert_eq!(h.mids_since(0).count(), RING_BUFFER_MAX_SIZE);
    }

    #[test]
    fn test_prune_by_age() {
        let mut h = MarketHistory::new();
        h.record_trade(1_000, 50, 10, TradeSide::Buy);
        h.record_trade(70_000, 51, 10, TradeSide::Sell);
        // The 1s-old trade is outside the 60s window at t=70s.
        assert_eq!(h.trades_since(0).count(), 1);
    }

    #[test]
    fn test_anchor_refresh_respects_horizon() {
        let mut h = MarketHistory::new();
        h.record_mid(0, 40.0);
        assert_eq!(h.mid_5s_ago(), Some(40.0));

        // Not yet 5s: anchor must hold.
        h.record_mid(4_000, 44.0);
        assert_eq!(h.mid_5s_ago(), Some(40.0));

        // 5s elapsed: refresh to the current mid.
        h.record_mid(5_000, 45.0);
        assert_eq!(h.mid_5s_ago(), Some(45.0));

        // 1m anchor still on the first observation.
        assert_eq!(h.mid_1m_ago(), Some(40.0));
        h.record_mid(60_000, 55.0);
        assert_eq!(h.mid_1m_ago(), Some(55.0));
    }

    #[test]
    fn test_mid_at_least_as_old() {
        let mut h = MarketHistory::new();
        h.record_mid(0, 40.0);
        h.record_mid(10_000, 44.0);
        h.record_mid(14_000, 48.0);
        // At t=15s, newest mid aged >= 5s is the one from t=10s.
        assert_eq!(h.mid_at_least_as_old(15_000, 5_000), Some(44.0));
        // Nothing is 30s old yet.
        assert_eq!(h.mid_at_least_as_old(15_000, 30_000), None);
    }
}
