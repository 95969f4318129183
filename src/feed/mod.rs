//! Upstream market feed.
//!
//! Wire types, credential signing, and the WebSocket client. The session
//! consumes the feed through [`MarketFeed`] so tests can script one.

pub mod client;
pub mod message_types;
pub mod signing;

use async_trait::async_trait;

use crate::errors::Result;
use message_types::FeedMessage;

pub use client::KalshiFeedClient;
pub use signing::FeedCredentials;

/// One session's upstream feed.
///
/// `next` yields parsed records in receive order; `None` means the
/// upstream closed. Malformed frames are dropped inside the
/// implementation and never surface here.
#[async_trait]
pub trait MarketFeed: Send {
    /// Subscribe to the standard channels for the given markets.
    async fn subscribe(&mut self, market_tickers: Vec<String>) -> Result<()>;

    /// Next parsed record, an error on transport failure, or `None` on a
    /// clean close.
    async fn next(&mut self) -> Option<Result<FeedMessage>>;

    /// Close the upstream connection.
    async fn close(&mut self);
}
