use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat message pushed by the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique identifier for this message
    pub id: Uuid,
    /// Conversation the message belongs to
    pub channel_id: String,
    /// User who sent the message
    pub sender_id: String,
    /// Display name of the sender (optional, may lag behind profile edits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,
    /// Message body
    pub content: String,
    /// When the server accepted the message
    pub sent_at: DateTime<Utc>,
}

/// Notification pushed by the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    /// User this notification is addressed to
    pub recipient_user_id: String,
    pub kind: NotificationKind,
    /// Human-readable body
    pub content: String,
    /// Entity the notification points at (post, comment, user, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_kind: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification categories used by the MoodLink backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    ChatMessage,
    MoodReport,
    Activity,
    System,
}

/// User-visible alert emitted by the client itself (not server-originated)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientAlert {
    pub message: String,
}

impl ClientAlert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
