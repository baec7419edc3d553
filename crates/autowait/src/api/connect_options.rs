use std::collections::HashMap;
use std::time::Duration;

/// Options for `CdpDriver::connect`.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Browser-level DevTools WebSocket URL,
    /// e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`.
    pub endpoint: String,
    /// Additional HTTP headers to send with the WebSocket handshake.
    pub headers: Option<HashMap<String, String>>,
    /// Maximum time to wait for the connection to be established.
    /// Defaults to 30 seconds.
    pub timeout: Option<Duration>,
}

impl ConnectOptions {
    /// Environment variable consulted by [`ConnectOptions::from_env`].
    pub const ENDPOINT_ENV: &'static str = "AUTOWAIT_CDP_ENDPOINT";

    /// Creates `ConnectOptions` for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: None,
            timeout: None,
        }
    }

    /// Reads the endpoint from `AUTOWAIT_CDP_ENDPOINT`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var(Self::ENDPOINT_ENV)
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .map(Self::new)
    }

    /// Set additional HTTP headers to send with the WebSocket handshake.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
