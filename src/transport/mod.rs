//! Transport seam between the client and the wire
//!
//! The client talks to trait objects so tests can script connection outcomes
//! without a network. Production uses [`WebSocketTransport`].

pub mod websocket;

pub use websocket::WebSocketTransport;

pub use crate::error::TransportError;

use crate::error::Result;

use async_trait::async_trait;

/// Factory for push-channel connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open one connection to `url`, authenticating with `bearer_token`.
    /// Returns the write and read halves so they can live on different tasks.
    async fn open(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)>;
}

/// Write half of an open connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, text: String) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Read half of an open connection
#[async_trait]
pub trait FrameStream: Send {
    /// Next inbound text frame. `None` means the server closed the
    /// connection; `Some(Err(_))` means the transport failed mid-read.
    async fn next_frame(&mut self) -> Option<Result<String>>;
}
