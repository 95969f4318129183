#![deny(unreachable_pub)]

//! linewatch: live ladder analytics for one sporting event's binary
//! contract markets.
//!
//! A session resolves a game into its winner/spread/total markets,
//! subscribes the upstream feed, folds ticker/book/trade messages into
//! per-market state, and pushes periodic stats and signal snapshots to a
//! single subscriber. The interesting machinery is in [`analytics`]:
//! ladder construction, isotonic fitting, monotonicity and outlier
//! detection, cross-ladder arbitrage, and the signal lifecycle.

// Core modules
pub mod clock;
pub mod consts;
mod errors;
pub mod logging;

// Feature modules
pub mod analytics;
pub mod feed;
pub mod resolver;
pub mod session;

// Re-exports
pub use analytics::engine::{AnalyticsEngine, MarketMeta, SlowTickOutput};
pub use analytics::enrich::EnrichedStats;
pub use analytics::isotonic::Direction;
pub use analytics::ladder::{Ladder, LadderConfig, LadderPoint, LadderType};
pub use analytics::parser::{parse_market, GroupType, ParseSource, ParsedMarket, Predicate};
pub use analytics::signals::{Confidence, Signal, SignalCandidate, SignalType};
pub use analytics::stats::{FeedStatus, MarketStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{Error, ResolveError, Result, SigningError, WsError};
pub use feed::message_types::FeedMessage;
pub use feed::{FeedCredentials, KalshiFeedClient, MarketFeed};
pub use logging::init_logging;
pub use resolver::{EnrichedMarket, GameResolver, ResolvedEvent, ResolvedGame, RestResolver};
pub use session::snapshot::{SessionStatus, SessionUpdate};
pub use session::{Session, SessionConfig};
