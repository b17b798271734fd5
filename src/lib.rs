// Infrastructure layer (shared components)
pub mod auth;
pub mod config;
pub mod error;

// Domain layer (events and delivery contracts)
pub mod events;
pub mod fanout;
pub mod protocol;
pub mod retry;

// Connection layer
pub mod client;
pub mod transport;

pub use client::{ConnectionState, RealtimeClient};
pub use events::{ChatMessage, ClientAlert, Notification, NotificationKind};
pub use fanout::Subscription;
