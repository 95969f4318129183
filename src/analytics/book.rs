//! Per-market order book state.
//!
//! YES and NO sides are `price -> size` maps in integer cents with strictly
//! positive sizes. Snapshots replace a side wholesale; deltas adjust one
//! level and remove it at zero or below. The latest ticker record is kept
//! alongside so top-of-book reads can prefer upstream-quoted prices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::history::TradeSide;
use crate::consts::TOP_N_LEVELS;

/// Book side selector from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSide {
    Yes,
    No,
}

/// Most recent ticker record for a market.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TickerRecord {
    pub yes_bid: Option<i64>,
    pub yes_ask: Option<i64>,
    pub last_price: Option<i64>,
    pub volume: Option<i64>,
    pub volume_24h: Option<i64>,
    pub open_interest: Option<i64>,
}

/// Best-of-book read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopOfBook {
    pub bid: Option<i64>,
    pub ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,
}

/// One market's book and feed timestamps.
#[derive(Debug, Default)]
pub struct MarketBook {
    yes: BTreeMap<i64, i64>,
    no: BTreeMap<i64, i64>,
    ticker: Option<TickerRecord>,
    last_ticker_ts: Option<u64>,
    last_orderbook_ts: Option<u64>,
    last_trade_ts: Option<u64>,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest ticker record.
    pub fn apply_ticker(&mut self, now_ms: u64, record: TickerRecord) {
        self.ticker = Some(record);
        self.last_ticker_ts = Some(now_ms);
    }

    /// Replace both sides; non-positive sizes are dropped on the way in.
    pub fn apply_snapshot(&mut self, now_ms: u64, yes: &[(i64, i64)], no: &[(i64, i64)]) {
        self.yes = yes.iter().filter(|(_, sz)| *sz > 0).copied().collect();
        self.no = no.iter().filter(|(_, sz)| *sz > 0).copied().collect();
        self.last_orderbook_ts = Some(now_ms);
    }

    /// Adjust one level; zero or negative results remove it.
    pub fn apply_delta(&mut self, now_ms: u64, side: BookSide, price: i64, delta: i64) {
        let map = match side {
            BookSide::Yes => &mut self.yes,
            BookSide::No => &mut self.no,
        };
        let next = map.get(&price).copied().unwrap_or(0) + delta;
        if next <= 0 {
            map.remove(&price);
        } else {
            map.insert(price, next);
        }
        self.last_orderbook_ts = Some(now_ms);
    }

    /// Stamp a trade arrival. Ring recording lives in
    /// [`MarketHistory`](crate::analytics::history::MarketHistory); the book
    /// only tracks recency and classifies the aggressor.
    pub fn apply_trade(&mut self, now_ms: u64) {
        self.last_trade_ts = Some(now_ms);
    }

    /// Classify a trade's aggressor: explicit taker side wins, else the
    /// print is compared against the current mid (at-or-above is a buy).
    pub fn classify_trade(&self, taker_side: Option<&str>, price: i64) -> TradeSide {
        match taker_side {
            Some(s) if s.eq_ignore_ascii_case("yes") => TradeSide::Buy,
            Some(s) if s.eq_ignore_ascii_case("no") => TradeSide::Sell,
            _ => match self.mid() {
                Some(mid) if (price as f64) >= mid => TradeSide::Buy,
                Some(_) => TradeSide::Sell,
                None => TradeSide::Unknown,
            },
        }
    }

    /// Best bid/ask and their sizes. Ticker-quoted prices are preferred;
    /// sizes always come from the book levels.
    pub fn top_of_book(&self) -> TopOfBook {
        let book_bid = self.yes.keys().next_back().copied();
        let best_no_bid = self.no.keys().next_back().copied();
        let book_ask = best_no_bid.map(|p| 100 - p);

        let ticker = self.ticker.as_ref();
        let bid = ticker.and_then(|t| t.yes_bid).or(book_bid);
        let ask = ticker.and_then(|t| t.yes_ask).or(book_ask);

        TopOfBook {
            bid,
            ask,
            bid_size: book_bid.and_then(|p| self.yes.get(&p)).copied().unwrap_or(0),
            ask_size: best_no_bid.and_then(|p| self.no.get(&p)).copied().unwrap_or(0),
        }
    }

    /// Current mid when an uncrossed bid/ask pair exists.
    pub fn mid(&self) -> Option<f64> {
        let top = self.top_of_book();
        match (top.bid, top.ask) {
            (Some(bid), Some(ask)) if bid <= ask => Some((bid + ask) as f64 / 2.0),
            _ => None,
        }
    }

    /// Top-N `(price, size)` levels by price descending for one side.
    /// Small fixed N: insertion scan, not a full sort.
    pub fn top_levels(&self, side: BookSide) -> Vec<(i64, i64)> {
        let map = match side {
            BookSide::Yes => &self.yes,
            BookSide::No => &self.no,
        };
        map.iter()
            .rev()
            .take(TOP_N_LEVELS)
            .map(|(p, s)| (*p, *s))
            .collect()
    }

    pub fn ticker_record(&self) -> Option<&TickerRecord> {
        self.ticker.as_ref()
    }

    pub fn last_ticker_ts(&self) -> Option<u64> {
        self.last_ticker_ts
    }

    pub fn last_orderbook_ts(&self) -> Option<u64> {
        self.last_orderbook_ts
    }

    pub fn last_trade_ts(&self) -> Option<u64> {
        self.last_trade_ts
    }

    /// Lifetime contract volume from the latest ticker, zero before one.
    pub fn volume(&self) -> i64 {
        self.ticker.and_then(|t| t.volume).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn level(&self, side: BookSide, price: i64) -> Option<i64> {
        match side {
            BookSide::Yes => self.yes.get(&price).copied(),
            BookSide::No => self.no.get(&price).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_replaces_and_filters() {
        let mut book = MarketBook::new();
        book.apply_snapshot(1_000, &[(45, 100), (44, 0), (43, -5)], &[(50, 200)]);
        assert_eq!(book.level(BookSide::Yes, 45), Some(100));
        assert_eq!(book.level(BookSide::Yes, 44), None);
        assert_eq!(book.level(BookSide::Yes, 43), None);

        book.apply_snapshot(2_000, &[(40, 10)], &[]);
        assert_eq!(book.level(BookSide::Yes, 45), None);
        assert_eq!(book.level(BookSide::Yes, 40), Some(10));
        assert_eq!(book.level(BookSide::No, 50), None);
    }

    #[test]
    fn test_delta_adjusts_and_removes() {
        let mut book = MarketBook::new();
        book.apply_snapshot(0, &[(45, 100)], &[]);
        book.apply_delta(1, BookSide::Yes, 45, 50);
        assert_eq!(book.level(BookSide::Yes, 45), Some(150));

        book.apply_delta(2, BookSide::Yes, 45, -150);
        assert_eq!(book.level(BookSide::Yes, 45), None);

        // Delta on an absent level creates it.
        book.apply_delta(3, BookSide::No, 52, 30);
        assert_eq!(book.level(BookSide::No, 52), Some(30));

        // Negative result stays absent.
        book.apply_delta(4, BookSide::No, 52, -40);
        assert_eq!(book.level(BookSide::No, 52), None);
    }

    #[test]
    fn test_top_of_book_derives_ask_from_no_side() {
        let mut book = MarketBook::new();
        book.apply_snapshot(0, &[(45, 100), (44, 300)], &[(53, 200), (50, 400)]);
        let top = book.top_of_book();
        assert_eq!(top.bid, Some(45));
        // Best NO bid 53 -> YES ask 47.
        assert_eq!(top.ask, Some(47));
        assert_eq!(top.bid_size, 100);
        assert_eq!(top.ask_size, 200);
        assert_eq!(book.mid(), Some(46.0));
    }

    #[test]
    fn test_ticker_quotes_preferred() {
        let mut book = MarketBook::new();
        book.apply_snapshot(0, &[(45, 100)], &[(53, 200)]);
        book.apply_ticker(
            1,
            TickerRecord {
                yes_bid: Some(46),
                yes_ask: Some(48),
                ..Default::default()
            },
        );
        let top = book.top_of_book();
        assert_eq!(top.bid, Some(46));
        assert_eq!(top.ask, Some(48));
        assert_eq!(book.mid(), Some(47.0));
    }

    #[test]
    fn test_crossed_book_reports_no_mid() {
        let mut book = MarketBook::new();
        book.apply_ticker(
            0,
            TickerRecord {
                yes_bid: Some(60),
                yes_ask: Some(55),
                ..Default::default()
            },
        );
        assert_eq!(book.mid(), None);
    }

    #[test]
    fn test_trade_classification() {
        let mut book = MarketBook::new();
        assert_eq!(book.classify_trade(Some("yes"), 50), TradeSide::Buy);
        assert_eq!(book.classify_trade(Some("no"), 50), TradeSide::Sell);
        // No mid yet: unknown.
        assert_eq!(book.classify_trade(None, 50), TradeSide::Unknown);

        book.apply_snapshot(0, &[(45, 100)], &[(53, 200)]);
        // Mid is 46: at-or-above is a buy.
        assert_eq!(book.classify_trade(None, 46), TradeSide::Buy);
        assert_eq!(book.classify_trade(None, 45), TradeSide::Sell);
    }

    #[test]
    fn test_top_levels_descending_capped() {
        let mut book = MarketBook::new();
        let yes: Vec<(i64, i64)> = (30..40).map(|p| (p, 10)).collect();
        book.apply_snapshot(0, &yes, &[]);
        let top = book.top_levels(BookSide::Yes);
        assert_eq!(top.len(), TOP_N_LEVELS);
        assert_eq!(top[0], (39, 10));
        assert_eq!(top[4], (35, 10));
    }
}
