use serde::{Deserialize, Serialize};

use crate::events::{ChatMessage, Notification};

/// Frames sent from client to hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    SendMessage { channel_id: String, content: String },
}

/// Frames pushed from hub to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerFrame {
    ReceiveMessage(ChatMessage),
    ReceiveNotification(Notification),
}

impl ClientFrame {
    pub fn send_message(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::SendMessage {
            channel_id: channel_id.into(),
            content: content.into(),
        }
    }
}

/// Parse an inbound text frame. Unknown frame types return `None` so the
/// reader can skip them without tearing the connection down.
pub fn parse_server_frame(text: &str) -> Option<ServerFrame> {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unrecognized hub frame");
            None
        }
    }
}
