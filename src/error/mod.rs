use thiserror::Error;

/// Failures at the push-channel transport layer.
///
/// Per the client contract these never reach callers of
/// [`RealtimeClient`](crate::RealtimeClient) directly: open failures feed the
/// bounded retry procedure, send failures surface as a `false` return, and
/// teardown failures are logged without blocking cleanup.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Bearer credential is not a valid header value")]
    Credential,

    #[error("Transport error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
