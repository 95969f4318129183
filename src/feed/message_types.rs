//! Upstream feed wire types.
//!
//! The feed is a stream of tagged records; unknown tags are dropped
//! silently at the parse boundary. Prices are integer cents in `[0, 100]`.

use serde::{Deserialize, Serialize};

use crate::analytics::book::BookSide;

/// One parsed upstream record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "msg", rename_all = "snake_case")]
pub enum FeedMessage {
    Ticker(TickerMsg),
    OrderbookSnapshot(OrderbookSnapshotMsg),
    OrderbookDelta(OrderbookDeltaMsg),
    Trade(TradeMsg),
    Subscribed(SubscribedMsg),
    Error(ErrorMsg),
}

impl FeedMessage {
    /// Market this record belongs to, when it names one.
    pub fn market_ticker(&self) -> Option<&str> {
        match self {
            FeedMessage::Ticker(m) => Some(&m.market_ticker),
            FeedMessage::OrderbookSnapshot(m) => Some(&m.market_ticker),
            FeedMessage::OrderbookDelta(m) => Some(&m.market_ticker),
            FeedMessage::Trade(m) => Some(&m.market_ticker),
            FeedMessage::Subscribed(_) | FeedMessage::Error(_) => None,
        }
    }
}

/// Best-quote and volume update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerMsg {
    pub market_ticker: String,
    #[serde(default)]
    pub yes_bid: Option<i64>,
    #[serde(default)]
    pub yes_ask: Option<i64>,
    #[serde(default)]
    pub last_price: Option<i64>,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub volume_24h: Option<i64>,
    #[serde(default)]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub ts: Option<u64>,
}

/// Full book replacement; levels are `(price, size)` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderbookSnapshotMsg {
    pub market_ticker: String,
    #[serde(default)]
    pub yes: Vec<(i64, i64)>,
    #[serde(default)]
    pub no: Vec<(i64, i64)>,
    #[serde(default)]
    pub ts: Option<u64>,
}

/// Single-level size adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookDeltaMsg {
    pub market_ticker: String,
    pub price: i64,
    pub delta: i64,
    pub side: BookSide,
    #[serde(default)]
    pub ts: Option<u64>,
}

/// Trade print.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeMsg {
    pub market_ticker: String,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub yes_price: Option<i64>,
    #[serde(default)]
    pub no_price: Option<i64>,
    #[serde(default)]
    pub taker_side: Option<String>,
    #[serde(default)]
    pub ts: Option<u64>,
}

/// Subscription acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribedMsg {
    #[serde(default)]
    pub sid: Option<u64>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Upstream error control record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorMsg {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorMsg {
    /// Whether this error reads as an authentication demand.
    pub fn is_auth_error(&self) -> bool {
        self.message
            .as_deref()
            .map(|m| {
                let lower = m.to_lowercase();
                lower.contains("auth") || lower.contains("unauthorized") || lower.contains("forbidden")
            })
            .unwrap_or(false)
    }
}

/// Outbound subscription command.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeCommand {
    pub id: u64,
    pub cmd: &'static str,
    pub params: SubscribeParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeParams {
    pub channels: Vec<String>,
    pub market_tickers: Vec<String>,
}

impl SubscribeCommand {
    /// Subscribe to the standard channels for a set of markets.
    pub fn for_markets(id: u64, market_tickers: Vec<String>) -> Self {
        Self {
            id,
            cmd: "subscribe",
            params: SubscribeParams {
                channels: vec![
                    "ticker".to_string(),
                    "orderbook_delta".to_string(),
                    "trade".to_string(),
                ],
                market_tickers,
            },
        }
    }
}

/// Raw wire envelope used at the parse boundary.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    msg: serde_json::Value,
}

/// Decode one text frame. Unknown tags and malformed payloads yield
/// `None`; the caller logs and drops.
pub fn parse_frame(text: &str) -> Option<FeedMessage> {
    let envelope: RawEnvelope = serde_json::from_str(text).ok()?;
    let msg = envelope.msg;
    match envelope.tag.as_str() {
        "ticker" => serde_json::from_value(msg).map(FeedMessage::Ticker).ok(),
        "orderbook_snapshot" => serde_json::from_value(msg)
            .map(FeedMessage::OrderbookSnapshot)
            .ok(),
        "orderbook_delta" => serde_json::from_value(msg)
            .map(FeedMessage::OrderbookDelta)
            .ok(),
        "trade" => serde_json::from_value(msg).map(FeedMessage::Trade).ok(),
        "subscribed" => serde_json::from_value(msg).map(FeedMessage::Subscribed).ok(),
        "error" => serde_json::from_value(msg).map(FeedMessage::Error).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker_frame() {
        let text = r#"{"type":"ticker","msg":{"market_ticker":"T1","yes_bid":45,"yes_ask":47,"volume":1200}}"#;
        let msg = parse_frame(text).unwrap();
        match msg {
            FeedMessage::Ticker(t) => {
                assert_eq!(t.market_ticker, "T1");
                assert_eq!(t.yes_bid, Some(45));
                assert_eq!(t.yes_ask, Some(47));
                assert_eq!(t.volume, Some(1200));
                assert_eq!(t.open_interest, None);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_parse_snapshot_frame() {
        let text = r#"{"type":"orderbook_snapshot","msg":{"market_ticker":"T1","yes":[[45,100],[44,50]],"no":[[53,200]]}}"#;
        match parse_frame(text).unwrap() {
            FeedMessage::OrderbookSnapshot(s) => {
                assert_eq!(s.yes, vec![(45, 100), (44, 50)]);
                assert_eq!(s.no, vec![(53, 200)]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_parse_delta_frame() {
        let text = r#"{"type":"orderbook_delta","msg":{"market_ticker":"T1","price":45,"delta":-20,"side":"no"}}"#;
        match parse_frame(text).unwrap() {
            FeedMessage::OrderbookDelta(d) => {
                assert_eq!(d.delta, -20);
                assert_eq!(d.side, BookSide::No);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_dropped() {
        assert!(parse_frame(r#"{"type":"heartbeat","msg":{}}"#).is_none());
        assert!(parse_frame("not json").is_none());
        assert!(parse_frame(r#"{"type":"trade","msg":{"no_market":true}}"#).is_none());
    }

    #[test]
    fn test_auth_error_detection() {
        let err = ErrorMsg {
            message: Some("Unauthorized: API key required".to_string()),
        };
        assert!(err.is_auth_error());
        let err = ErrorMsg {
            message: Some("rate limited".to_string()),
        };
        assert!(!err.is_auth_error());
        assert!(!ErrorMsg::default().is_auth_error());
    }

    #[test]
    fn test_subscribe_command_shape() {
        let cmd = SubscribeCommand::for_markets(1, vec!["T1".to_string()]);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["cmd"], "subscribe");
        assert_eq!(json["params"]["channels"][0], "ticker");
        assert_eq!(json["params"]["market_tickers"][0], "T1");
    }
}
