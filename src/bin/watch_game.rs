//! Watch one game's markets and print session updates as JSON lines.
//!
//! ```bash
//! KALSHI_API_KEY_ID=... KALSHI_PRIVATE_KEY_PEM=... \
//!     cargo run --bin watch_game -- KXNFLGAME-26JAN04BALPIT
//! ```
//!
//! Credentials are optional; public feeds stream without them.

use std::env;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use linewatch::consts::{MAINNET_REST_URL, MAINNET_WS_URL};
use linewatch::{
    init_logging, FeedCredentials, KalshiFeedClient, RestResolver, Session, SessionConfig,
    SystemClock,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None).ok();

    let event_ticker = env::args()
        .nth(1)
        .ok_or("usage: watch_game <EVENT_TICKER>")?;

    let credentials = match FeedCredentials::from_env() {
        Ok(c) => Some(c),
        Err(e) => {
            warn!(error = %e, "no credentials, connecting unauthenticated");
            None
        }
    };

    let feed = KalshiFeedClient::connect(MAINNET_WS_URL, credentials.as_ref()).await?;
    let resolver = RestResolver::new(MAINNET_REST_URL);

    let (out_tx, mut out_rx) = mpsc::channel(256);
    let cancel = CancellationToken::new();

    let printer = tokio::spawn(async move {
        while let Some(update) = out_rx.recv().await {
            match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "snapshot serialization failed"),
            }
        }
    });

    let session = Session::new(
        SessionConfig::default(),
        resolver,
        SystemClock::new(),
        out_tx,
        cancel.clone(),
    );
    let mut session_task =
        tokio::spawn(async move { session.run(&event_ticker, feed).await });

    tokio::select! {
        result = &mut session_task => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            cancel.cancel();
            session_task.await??;
        }
    }

    printer.await?;
    Ok(())
}
