//! Outbound subscriber stream types.
//!
//! Tagged records pushed to the single subscribing client. Stats and
//! signals are independent channels; each is monotonic on its own but a
//! signals snapshot may reference markets whose stats are slightly stale.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::enrich::EnrichedStats;
use crate::analytics::ladder::Ladder;
use crate::analytics::signals::Signal;
use crate::feed::message_types::TickerMsg;
use crate::resolver::{EnrichedMarket, ResolvedEvent};

/// Session lifecycle states surfaced to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Resolving,
    Connecting,
    Streaming,
    Disconnected,
    Error,
}

/// One record on the subscriber stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    Status {
        status: SessionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Meta {
        game_id: String,
        event: ResolvedEvent,
        markets: Vec<EnrichedMarket>,
        resolved_events: Vec<ResolvedEvent>,
    },
    /// Coalesced raw ticker echo.
    Ticker { data: HashMap<String, TickerMsg> },
    /// Rolling raw feed batch for debugging.
    Raw { messages: Vec<serde_json::Value> },
    Stats {
        ts: u64,
        markets: HashMap<String, EnrichedStats>,
    },
    Signals {
        ts: u64,
        signals: Vec<Signal>,
        ladders: Vec<Ladder>,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        requires_auth: Option<bool>,
    },
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        SessionUpdate::Status {
            status,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SessionUpdate::Error {
            message: message.into(),
            requires_auth: None,
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        SessionUpdate::Error {
            message: message.into(),
            requires_auth: Some(true),
        }
    }
}
