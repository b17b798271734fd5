use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodlink_realtime::auth::InMemoryTokenStore;
use moodlink_realtime::config::Settings;
use moodlink_realtime::transport::WebSocketTransport;
use moodlink_realtime::RealtimeClient;

/// Console tail for the MoodLink hub: connects as the user from the
/// environment and prints every inbound message and notification.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!(hub_url = %settings.server.hub_url(), "Configuration loaded");

    let token = std::env::var("MOODLINK_TOKEN").context("MOODLINK_TOKEN must be set")?;
    let user_id = std::env::var("MOODLINK_USER_ID").context("MOODLINK_USER_ID must be set")?;

    let tokens = Arc::new(InMemoryTokenStore::with_token(token.clone()));
    let client = RealtimeClient::new(&settings, Arc::new(WebSocketTransport), tokens);

    let _messages = client.on_receive_message(|message| {
        println!(
            "[{}] {}: {}",
            message.channel_id,
            message
                .sender_display_name
                .as_deref()
                .unwrap_or(&message.sender_id),
            message.content
        );
    });
    let _notifications = client.on_receive_notification(|notification| {
        println!("[notification/{:?}] {}", notification.kind, notification.content);
    });
    let _connection = client.on_connection_change(|connected| {
        tracing::info!(connected = connected, "Connection availability changed");
    });
    let _alerts = client.on_alert(|alert| {
        eprintln!("! {}", alert.message);
    });

    if !client.start_connection(&token, &user_id).await {
        tracing::warn!("Initial connect failed, bounded retry running in background");
    }

    shutdown_signal().await;
    tracing::info!("Shutting down");
    client.stop_connection().await;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
