//! Client configuration from environment variables.

use std::time::Duration;

use linkup_shared::{endpoint_url, is_local_address, WS_PATH};
use url::Url;

use crate::error::ClientError;

/// Delay between losing a connection and the next attempt. Fixed, no backoff.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

/// Period of the keep-alive heartbeat while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Where the application is served from: its scheme and network host.
///
/// The socket URL is derived from this so a deployment behind a reverse proxy
/// never hardcodes a backend address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    /// Whether the page was loaded over a secure origin.
    pub secure: bool,
    /// Host with optional port, e.g. `app.example.com` or `localhost:8080`.
    pub host: String,
}

impl PageOrigin {
    pub fn new(secure: bool, host: impl Into<String>) -> Self {
        Self {
            secure,
            host: host.into(),
        }
    }

    /// Parse `https://host`, `http://host` (or their `wss`/`ws` forms), or a bare
    /// host. Bare hosts are treated as secure unless they are local addresses.
    pub fn parse(origin: &str) -> Result<Self, ClientError> {
        let origin = origin.trim();
        if origin.is_empty() {
            return Err(ClientError::InvalidOrigin(origin.to_string()));
        }

        if !origin.contains("://") {
            let host = origin.trim_end_matches('/');
            return Ok(Self::new(!is_local_address(host), host));
        }

        let url = Url::parse(origin).map_err(|_| ClientError::InvalidOrigin(origin.to_string()))?;
        let secure = match url.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            _ => return Err(ClientError::InvalidOrigin(origin.to_string())),
        };
        let Some(host) = url.host_str() else {
            return Err(ClientError::InvalidOrigin(origin.to_string()));
        };
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self::new(secure, host))
    }
}

impl Default for PageOrigin {
    fn default() -> Self {
        Self::new(false, "localhost")
    }
}

/// Settings for a [`RealtimeClient`](crate::RealtimeClient).
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub origin: PageOrigin,
    /// Socket path on the origin host.
    pub path: String,
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            origin: PageOrigin::default(),
            path: WS_PATH.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl RealtimeConfig {
    pub fn new(origin: PageOrigin) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Full socket URL carrying `token` as its query credential.
    pub fn endpoint_url(&self, token: &str) -> String {
        endpoint_url(self.origin.secure, &self.origin.host, &self.path, token)
    }

    /// Socket URL without the credential, for logs.
    pub fn endpoint_display(&self) -> String {
        let scheme = if self.origin.secure { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.origin.host, self.path)
    }

    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `LINKUP_HOST`: page origin, `https://host` or a bare host (default: "localhost")
    /// - `LINKUP_SECURE`: "true"/"1" or "false"/"0", overrides the scheme from `LINKUP_HOST`
    /// - `LINKUP_WS_PATH`: socket path (default: "/ws/mobile")
    /// - `LINKUP_RECONNECT_DELAY_MS`: reconnect delay (default: 3000)
    /// - `LINKUP_HEARTBEAT_INTERVAL_MS`: heartbeat period (default: 30000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Unparseable values fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("LINKUP_HOST") {
            match PageOrigin::parse(&host) {
                Ok(origin) => config.origin = origin,
                Err(e) => crate::log_warn!("ignoring LINKUP_HOST: {}", e),
            }
        }

        if let Some(secure) = lookup("LINKUP_SECURE") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" => config.origin.secure = true,
                "0" | "false" | "no" => config.origin.secure = false,
                other => crate::log_warn!("ignoring LINKUP_SECURE={}", other),
            }
        }

        if let Some(path) = lookup("LINKUP_WS_PATH") {
            if path.starts_with('/') {
                config.path = path;
            } else {
                config.path = format!("/{}", path);
            }
        }

        if let Some(delay) = millis(&lookup, "LINKUP_RECONNECT_DELAY_MS") {
            config.reconnect_delay = delay;
        }
        if let Some(interval) = millis(&lookup, "LINKUP_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval = interval;
        }

        config
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            crate::log_warn!("ignoring {}={}: expected a positive number of milliseconds", key, raw);
            None
        }
    }
}
