pub mod settings;

pub use settings::{ReconnectSettings, ServerEndpoint, Settings};
