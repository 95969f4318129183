use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// WebSocket-specific errors.
#[derive(Error, Debug, Clone)]
pub enum WsError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("send error: {0}")]
    Send(String),
    #[error("upstream requires authentication")]
    AuthRequired,
    #[error("stream closed by upstream")]
    Closed,
}

/// Credential and request-signing errors.
#[derive(Error, Debug, Clone)]
pub enum SigningError {
    #[error("private key parse error: {0}")]
    PrivateKeyParse(String),
    #[error("RSA-PSS signature failed: {0}")]
    Signature(String),
    #[error("missing credential material: {0}")]
    MissingCredential(String),
}

/// Market discovery errors.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("event not found: {0}")]
    NotFound(String),
    #[error("no markets resolved for event {0}")]
    NoMarkets(String),
    #[error("resolver request failed: {0}")]
    Request(String),
}

/// Main crate error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Upstream WebSocket failure.
    #[error("websocket error: {0}")]
    Ws(#[from] WsError),

    /// Request signing failure.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// Market discovery failure.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Inbound or outbound JSON failure.
    #[error("json error: {0}")]
    Json(String),

    /// The subscriber channel closed; treated as session cancellation.
    #[error("subscriber gone")]
    SubscriberGone,
}

impl Error {
    /// Create a JSON error from any displayable cause.
    pub fn json(msg: impl Into<String>) -> Self {
        Error::Json(msg.into())
    }

    /// Create a WebSocket connection error.
    pub fn ws_connection(msg: impl Into<String>) -> Self {
        Error::Ws(WsError::Connection(msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_cause() {
        let err = Error::ws_connection("dns failure");
        assert!(err.to_string().contains("dns failure"));

        let err: Error = ResolveError::NotFound("KXNFLGAME-X".to_string()).into();
        assert!(err.to_string().contains("KXNFLGAME-X"));
    }
}
