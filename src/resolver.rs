//! Market discovery.
//!
//! Resolves a game's event ticker into the set of related markets across
//! the winner, spread, and total series, with enough metadata for the
//! parser to build ladder keys. The session consumes this through
//! [`GameResolver`] so tests can script a game.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analytics::parser::GroupType;
use crate::errors::{ResolveError, Result};
use crate::logging::targets;

/// One discovered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEvent {
    pub event_ticker: String,
    pub title: String,
}

/// One discovered market with resolver-supplied metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedMarket {
    pub ticker: String,
    pub title: String,
    pub event_ticker: String,
    pub group_type: GroupType,
    #[serde(default)]
    pub line: Option<f64>,
    #[serde(default)]
    pub side: Option<String>,
}

/// A fully resolved game.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedGame {
    pub game_id: String,
    pub primary_event: ResolvedEvent,
    pub enriched_markets: Vec<EnrichedMarket>,
    pub resolved_events: Vec<ResolvedEvent>,
}

/// Market discovery for one game.
#[async_trait]
pub trait GameResolver: Send + Sync {
    async fn resolve(&self, event_ticker: &str) -> Result<ResolvedGame>;
}

/// Series prefixes that share a game with a winner event.
const SIBLING_SERIES: &[&str] = &["KXNFLSPREAD", "KXNFLTOTAL"];

/// Classify a market's family from its series prefix.
pub fn classify_group(ticker: &str) -> GroupType {
    let series = ticker.split('-').next().unwrap_or("");
    if series.contains("SPREAD") {
        GroupType::Spread
    } else if series.contains("TOTAL") {
        GroupType::Total
    } else if series.contains("GAME") || series.contains("WINNER") {
        GroupType::Winner
    } else {
        GroupType::Other
    }
}

/// The game identity shared by sibling events: everything after the
/// series prefix (date plus matchup).
pub fn game_id_of(event_ticker: &str) -> String {
    event_ticker
        .split_once('-')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_else(|| event_ticker.to_string())
}

// === REST DTOs ===

#[derive(Debug, Deserialize)]
struct EventResponse {
    event: EventDto,
    #[serde(default)]
    markets: Vec<MarketDto>,
}

#[derive(Debug, Deserialize)]
struct EventDto {
    event_ticker: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct MarketDto {
    ticker: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    event_ticker: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    floor_strike: Option<f64>,
    #[serde(default)]
    yes_sub_title: Option<String>,
}

/// REST resolver against the upstream trade API.
#[derive(Debug, Clone)]
pub struct RestResolver {
    base_url: String,
    client: reqwest::Client,
}

impl RestResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_event(&self, event_ticker: &str) -> Result<EventResponse> {
        let url = format!(
            "{}/events/{}?with_nested_markets=true",
            self.base_url, event_ticker
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(event_ticker.to_string()).into());
        }
        let response = response
            .error_for_status()
            .map_err(|e| ResolveError::Request(e.to_string()))?;
        response
            .json::<EventResponse>()
            .await
            .map_err(|e| ResolveError::Request(e.to_string()).into())
    }

    fn markets_of(&self, response: &EventResponse) -> Vec<EnrichedMarket> {
        response
            .markets
            .iter()
            .filter(|m| {
                m.status
                    .as_deref()
                    .map(|s| s != "finalized" && s != "settled")
                    .unwrap_or(true)
            })
            .map(|m| EnrichedMarket {
                ticker: m.ticker.clone(),
                title: if m.title.is_empty() {
                    m.yes_sub_title.clone().unwrap_or_default()
                } else {
                    m.title.clone()
                },
                event_ticker: m
                    .event_ticker
                    .clone()
                    .unwrap_or_else(|| response.event.event_ticker.clone()),
                group_type: classify_group(&m.ticker),
                line: m.floor_strike,
                side: None,
            })
            .collect()
    }
}

#[async_trait]
impl GameResolver for RestResolver {
    async fn resolve(&self, event_ticker: &str) -> Result<ResolvedGame> {
        let primary = self.fetch_event(event_ticker).await?;
        let game_id = game_id_of(event_ticker);

        let mut resolved_events = vec![ResolvedEvent {
            event_ticker: primary.event.event_ticker.clone(),
            title: primary.event.title.clone(),
        }];
        let mut markets = self.markets_of(&primary);

        // Sibling series share the game suffix; absent ones are normal.
        for series in SIBLING_SERIES {
            let sibling_ticker = format!("{series}-{game_id}");
            if sibling_ticker == event_ticker {
                continue;
            }
            match self.fetch_event(&sibling_ticker).await {
                Ok(sibling) => {
                    markets.extend(self.markets_of(&sibling));
                    resolved_events.push(ResolvedEvent {
                        event_ticker: sibling.event.event_ticker,
                        title: sibling.event.title,
                    });
                }
                Err(e) => {
                    debug!(
                        target: targets::RESOLVER,
                        event = %sibling_ticker,
                        error = %e,
                        "sibling event not resolved"
                    );
                }
            }
        }

        if markets.is_empty() {
            warn!(target: targets::RESOLVER, event = %event_ticker, "no markets resolved");
            return Err(ResolveError::NoMarkets(event_ticker.to_string()).into());
        }

        debug!(
            target: targets::RESOLVER,
            event = %event_ticker,
            markets = markets.len(),
            events = resolved_events.len(),
            "game resolved"
        );

        Ok(ResolvedGame {
            game_id,
            primary_event: ResolvedEvent {
                event_ticker: primary.event.event_ticker,
                title: primary.event.title,
            },
            enriched_markets: markets,
            resolved_events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_group_from_series() {
        assert_eq!(classify_group("KXNFLSPREAD-26JAN04BALPIT-BAL3"), GroupType::Spread);
        assert_eq!(classify_group("KXNFLTOTAL-26JAN04BALPIT-O45"), GroupType::Total);
        assert_eq!(classify_group("KXNFLGAME-26JAN04BALPIT-BAL"), GroupType::Winner);
        assert_eq!(classify_group("KXSOMETHING-X-Y"), GroupType::Other);
    }

    #[test]
    fn test_game_id_strips_series() {
        assert_eq!(game_id_of("KXNFLGAME-26JAN04BALPIT"), "26JAN04BALPIT");
        assert_eq!(game_id_of("NOSEP"), "NOSEP");
    }

    #[test]
    fn test_event_response_parses_kalshi_shape() {
        let json = r#"{
            "event": {"event_ticker": "KXNFLGAME-26JAN04BALPIT", "title": "Ravens at Steelers"},
            "markets": [
                {"ticker": "KXNFLGAME-26JAN04BALPIT-BAL", "title": "Ravens win", "status": "active"},
                {"ticker": "KXNFLGAME-26JAN04BALPIT-PIT", "yes_sub_title": "Steelers win", "status": "finalized"}
            ]
        }"#;
        let response: EventResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.markets.len(), 2);

        let resolver = RestResolver::new("http://unused");
        let markets = resolver.markets_of(&response);
        // Finalized markets are filtered out.
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].group_type, GroupType::Winner);
        assert_eq!(markets[0].event_ticker, "KXNFLGAME-26JAN04BALPIT");
    }
}
