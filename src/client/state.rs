/// Lifecycle of the single hub connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, nothing in flight. Initial state and the state after
    /// teardown or retry exhaustion.
    Disconnected,
    /// An open is in flight (initial or scheduled retry)
    Connecting,
    /// Live connection, sends allowed
    Connected,
    /// Live connection dropped, resume ladder running
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
