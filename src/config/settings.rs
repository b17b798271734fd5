use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerEndpoint,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerEndpoint {
    /// Base URL of the MoodLink backend (http or https)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Hub path appended to the base URL
    #[serde(default = "default_hub_path")]
    pub hub_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    /// Maximum transport opens per start cycle before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between initial-open retries in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Delays walked after a mid-session drop, in milliseconds
    #[serde(default = "default_resume_delays_ms")]
    pub resume_delays_ms: Vec<u64>,
    /// Jitter factor (0.0 to 1.0) applied to the resume delays
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_hub_path() -> String {
    "/hubs/notifications".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_resume_delays_ms() -> Vec<u64> {
    vec![0, 2_000, 10_000, 30_000]
}

fn default_jitter_factor() -> f64 {
    0.1
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.base_url", default_base_url())?
            .set_default("server.hub_path", default_hub_path())?
            .set_default("reconnect.max_attempts", 5)?
            .set_default("reconnect.retry_delay_ms", 5000)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_BASE_URL, RECONNECT_MAX_ATTEMPTS, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }
}

impl ServerEndpoint {
    /// WebSocket URL for the notification hub, with http(s) mapped to ws(s).
    pub fn hub_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", ws_base, self.hub_path)
    }
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            hub_path: default_hub_path(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            resume_delays_ms: default_resume_delays_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}
