//! WebSocket feed client.
//!
//! Thin transport wrapper: connects (optionally with signed auth
//! headers), sends the subscribe command, and yields parsed records.
//! Malformed and unknown frames are logged and dropped; there is no
//! automatic reconnection, per the session's error contract.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::errors::{Result, WsError};
use crate::feed::message_types::{parse_frame, FeedMessage, SubscribeCommand};
use crate::feed::signing::FeedCredentials;
use crate::feed::MarketFeed;
use crate::logging::targets;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live upstream feed over tokio-tungstenite.
pub struct KalshiFeedClient {
    stream: WsStream,
    next_command_id: u64,
}

impl KalshiFeedClient {
    /// Connect to `url`, signing the handshake when credentials are given.
    pub async fn connect(url: &str, credentials: Option<&FeedCredentials>) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| WsError::Connection(e.to_string()))?;

        if let Some(credentials) = credentials {
            let path = request.uri().path().to_string();
            for (name, value) in credentials.auth_headers("GET", &path)? {
                let name: tokio_tungstenite::tungstenite::http::HeaderName = name
                    .parse()
                    .map_err(|_| WsError::Connection(format!("bad header name {name}")))?;
                let value = value
                    .parse()
                    .map_err(|_| WsError::Connection("bad header value".to_string()))?;
                request.headers_mut().insert(name, value);
            }
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| WsError::Connection(e.to_string()))?;
        debug!(
            target: targets::FEED,
            status = %response.status(),
            "feed connected"
        );

        Ok(Self {
            stream,
            next_command_id: 1,
        })
    }
}

#[async_trait]
impl MarketFeed for KalshiFeedClient {
    async fn subscribe(&mut self, market_tickers: Vec<String>) -> Result<()> {
        let command = SubscribeCommand::for_markets(self.next_command_id, market_tickers);
        self.next_command_id += 1;
        let text = serde_json::to_string(&command).map_err(|e| crate::errors::Error::json(e.to_string()))?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| WsError::Send(e.to_string()))?;
        Ok(())
    }

    async fn next(&mut self) -> Option<Result<FeedMessage>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => match parse_frame(&text) {
                    Some(message) => return Some(Ok(message)),
                    None => {
                        // Unknown tag or malformed payload: log and drop.
                        warn!(target: targets::FEED, frame = %text, "unparseable frame dropped");
                    }
                },
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {}
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(WsError::Connection(e.to_string()).into())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
