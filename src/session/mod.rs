//! Session orchestration.
//!
//! One session is one logical worker: it resolves the game, subscribes
//! the feed, folds messages into the analytics engine, and drives four
//! interval timers (ticker coalesce, raw batch, stats, signals) from a
//! single `select!` loop. All per-session state lives on this task.
//!
//! Cancellation is cooperative and observed only at the loop's
//! suspension points; a subscriber that goes away cancels the session.

pub mod snapshot;

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analytics::engine::{AnalyticsEngine, MarketMeta};
use crate::analytics::ladder::LadderConfig;
use crate::analytics::parser::parse_market;
use crate::clock::Clock;
use crate::consts::{
    AUTH_WINDOW_MS, MAX_MARKETS, RAW_BATCH_INTERVAL_MS, RAW_BUFFER_CAP, SIGNALS_EMIT_INTERVAL_MS,
    STATS_EMIT_INTERVAL_MS, TICKER_BATCH_INTERVAL_MS,
};
use crate::errors::{Error, Result};
use crate::feed::message_types::{FeedMessage, TickerMsg};
use crate::feed::MarketFeed;
use crate::logging::targets;
use crate::resolver::GameResolver;
use snapshot::{SessionStatus, SessionUpdate};

/// Session tunables; defaults come from [`crate::consts`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_markets: usize,
    pub ticker_batch_interval: Duration,
    pub raw_batch_interval: Duration,
    pub stats_emit_interval: Duration,
    pub signals_emit_interval: Duration,
    pub ladder: LadderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_markets: MAX_MARKETS,
            ticker_batch_interval: Duration::from_millis(TICKER_BATCH_INTERVAL_MS),
            raw_batch_interval: Duration::from_millis(RAW_BATCH_INTERVAL_MS),
            stats_emit_interval: Duration::from_millis(STATS_EMIT_INTERVAL_MS),
            signals_emit_interval: Duration::from_millis(SIGNALS_EMIT_INTERVAL_MS),
            ladder: LadderConfig::default(),
        }
    }
}

/// What ended the streaming loop.
enum LoopExit {
    Cancelled,
    Disconnected(Option<String>),
    AuthRequired(String),
    SubscriberGone,
}

/// One subscriber's analytics session.
pub struct Session<R, C> {
    config: SessionConfig,
    resolver: R,
    clock: C,
    out: mpsc::Sender<SessionUpdate>,
    cancel: CancellationToken,
}

impl<R: GameResolver, C: Clock> Session<R, C> {
    pub fn new(
        config: SessionConfig,
        resolver: R,
        clock: C,
        out: mpsc::Sender<SessionUpdate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            resolver,
            clock,
            out,
            cancel,
        }
    }

    /// Run the session to completion. A vanished subscriber is a normal
    /// exit; every other failure was already reported on the stream.
    pub async fn run<F: MarketFeed>(self, event_ticker: &str, feed: F) -> Result<()> {
        match self.run_inner(event_ticker, feed).await {
            Err(Error::SubscriberGone) => {
                info!(target: targets::SESSION, "subscriber gone, session cancelled");
                Ok(())
            }
            other => other,
        }
    }

    async fn run_inner<F: MarketFeed>(mut self, event_ticker: &str, mut feed: F) -> Result<()> {
        self.emit(SessionUpdate::status(SessionStatus::Resolving))
            .await?;

        let game = match self.resolver.resolve(event_ticker).await {
            Ok(game) => game,
            Err(e) => {
                self.emit(SessionUpdate::error(e.to_string())).await?;
                self.emit(SessionUpdate::status(SessionStatus::Error)).await?;
                return Ok(());
            }
        };

        let mut markets = game.enriched_markets.clone();
        if markets.len() > self.config.max_markets {
            warn!(
                target: targets::SESSION,
                resolved = markets.len(),
                cap = self.config.max_markets,
                "market cap exceeded, trimming tail"
            );
            markets.truncate(self.config.max_markets);
        }

        let mut engine = AnalyticsEngine::new(self.config.ladder.clone());
        for market in &markets {
            engine.register_market(MarketMeta {
                ticker: market.ticker.clone(),
                title: market.title.clone(),
                event_ticker: market.event_ticker.clone(),
                group_type: market.group_type,
                parsed: parse_market(
                    &market.ticker,
                    &market.title,
                    market.group_type,
                    &game.game_id,
                ),
            });
        }
        info!(
            target: targets::SESSION,
            game_id = %game.game_id,
            markets = engine.market_count(),
            "session resolved"
        );

        let tickers: Vec<String> = markets.iter().map(|m| m.ticker.clone()).collect();
        self.emit(SessionUpdate::Meta {
            game_id: game.game_id.clone(),
            event: game.primary_event.clone(),
            markets,
            resolved_events: game.resolved_events.clone(),
        })
        .await?;

        self.emit(SessionUpdate::status(SessionStatus::Connecting))
            .await?;
        if let Err(e) = feed.subscribe(tickers).await {
            self.emit(SessionUpdate::error(e.to_string())).await?;
            self.emit(SessionUpdate::status(SessionStatus::Disconnected))
                .await?;
            return Ok(());
        }
        self.emit(SessionUpdate::status(SessionStatus::Streaming))
            .await?;

        let exit = self.stream_loop(&mut feed, &mut engine).await;
        feed.close().await;

        match exit {
            Ok(LoopExit::Cancelled) => {
                debug!(target: targets::SESSION, "session cancelled");
            }
            Ok(LoopExit::Disconnected(message)) => {
                if let Some(message) = message {
                    self.emit(SessionUpdate::error(message)).await?;
                }
                self.emit(SessionUpdate::status(SessionStatus::Disconnected))
                    .await?;
            }
            Ok(LoopExit::AuthRequired(message)) => {
                self.emit(SessionUpdate::auth_error(message)).await?;
                self.emit(SessionUpdate::status(SessionStatus::Disconnected))
                    .await?;
            }
            Ok(LoopExit::SubscriberGone) | Err(Error::SubscriberGone) => {
                return Err(Error::SubscriberGone);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn stream_loop<F: MarketFeed>(
        &mut self,
        feed: &mut F,
        engine: &mut AnalyticsEngine,
    ) -> Result<LoopExit> {
        let mut ticker_flush = tokio::time::interval(self.config.ticker_batch_interval);
        let mut raw_flush = tokio::time::interval(self.config.raw_batch_interval);
        let mut stats_tick = tokio::time::interval(self.config.stats_emit_interval);
        let mut signals_tick = tokio::time::interval(self.config.signals_emit_interval);
        for interval in [
            &mut ticker_flush,
            &mut raw_flush,
            &mut stats_tick,
            &mut signals_tick,
        ] {
            // Overrun ticks are not queued; the next one fires immediately.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the immediate first tick.
            interval.tick().await;
        }

        let mut coalesced_tickers: HashMap<String, TickerMsg> = HashMap::new();
        let mut raw_buffer: VecDeque<serde_json::Value> = VecDeque::with_capacity(RAW_BUFFER_CAP);
        let streaming_since = self.clock.now_ms();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Ok(LoopExit::Cancelled);
                }

                message = feed.next() => {
                    let now_ms = self.clock.now_ms();
                    match message {
                        Some(Ok(message)) => {
                            if raw_buffer.len() == RAW_BUFFER_CAP {
                                raw_buffer.pop_front();
                            }
                            if let Ok(value) = serde_json::to_value(&message) {
                                raw_buffer.push_back(value);
                            }

                            match &message {
                                FeedMessage::Error(err) => {
                                    let text = err
                                        .message
                                        .clone()
                                        .unwrap_or_else(|| "upstream error".to_string());
                                    let in_auth_window =
                                        now_ms.saturating_sub(streaming_since) <= AUTH_WINDOW_MS;
                                    if in_auth_window && err.is_auth_error() {
                                        return Ok(LoopExit::AuthRequired(text));
                                    }
                                    return Ok(LoopExit::Disconnected(Some(text)));
                                }
                                FeedMessage::Subscribed(ack) => {
                                    debug!(
                                        target: targets::SESSION,
                                        channel = ack.channel.as_deref().unwrap_or("?"),
                                        "subscription acknowledged"
                                    );
                                }
                                FeedMessage::Ticker(ticker) => {
                                    coalesced_tickers
                                        .insert(ticker.market_ticker.clone(), ticker.clone());
                                    engine.apply(&message, now_ms);
                                }
                                _ => engine.apply(&message, now_ms),
                            }
                        }
                        Some(Err(e)) => {
                            return Ok(LoopExit::Disconnected(Some(e.to_string())));
                        }
                        None => {
                            return Ok(LoopExit::Disconnected(None));
                        }
                    }
                }

                _ = ticker_flush.tick() => {
                    if !coalesced_tickers.is_empty() {
                        let data = std::mem::take(&mut coalesced_tickers);
                        if self.emit(SessionUpdate::Ticker { data }).await.is_err() {
                            return Ok(LoopExit::SubscriberGone);
                        }
                    }
                }

                _ = raw_flush.tick() => {
                    if !raw_buffer.is_empty() {
                        let messages: Vec<serde_json::Value> = raw_buffer.drain(..).collect();
                        if self.emit(SessionUpdate::Raw { messages }).await.is_err() {
                            return Ok(LoopExit::SubscriberGone);
                        }
                    }
                }

                _ = stats_tick.tick() => {
                    let now_ms = self.clock.now_ms();
                    let markets = engine.compute_dirty(now_ms).clone();
                    if self
                        .emit(SessionUpdate::Stats { ts: now_ms, markets })
                        .await
                        .is_err()
                    {
                        return Ok(LoopExit::SubscriberGone);
                    }
                }

                _ = signals_tick.tick() => {
                    let now_ms = self.clock.now_ms();
                    let output = engine.slow_tick(now_ms);
                    if output.signals.is_empty() && output.ladders.is_empty() {
                        continue;
                    }
                    let update = SessionUpdate::Signals {
                        ts: now_ms,
                        signals: output.signals,
                        ladders: output.ladders,
                    };
                    if self.emit(update).await.is_err() {
                        return Ok(LoopExit::SubscriberGone);
                    }
                }
            }
        }
    }

    async fn emit(&self, update: SessionUpdate) -> Result<()> {
        self.out
            .send(update)
            .await
            .map_err(|_| Error::SubscriberGone)
    }
}
