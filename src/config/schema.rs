//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for the relay process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen port.
    pub port: u16,

    /// Gate the whole inbound surface behind HTTP Basic credentials.
    pub challenge: bool,

    /// Credential map (username → password) for the auth gate.
    pub users: HashMap<String, String>,

    /// Enable the static page routes.
    pub routes: bool,

    /// Enable the fixed-mirror fetch helpers.
    pub local: bool,

    /// Directory served under `/static` and holding the page files.
    pub static_dir: String,

    /// Page routes served when `routes` is enabled.
    pub pages: Vec<PageRoute>,

    /// Fixed-mirror helpers served when `local` is enabled.
    pub mirrors: Vec<MirrorConfig>,

    /// Relay engine settings.
    pub relay: RelaySettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A fixed path → file mapping for the static page routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageRoute {
    /// Request path (e.g. `/`).
    pub path: String,

    /// File inside `static_dir` to serve.
    pub file: String,
}

/// One fixed-mirror helper: everything under `prefix` is fetched from the
/// hardcoded upstream base and streamed back verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    /// Local path prefix (e.g. `/y/`).
    pub prefix: String,

    /// Upstream base URL the remainder of the path is appended to.
    pub upstream: String,
}

/// Relay engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Reserved path prefix all relay traffic lives under.
    pub prefix: String,

    /// Upstream connect/handshake deadline in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for the upstream response head in seconds.
    pub request_timeout_secs: u64,

    /// Per-direction WebSocket idle timeout in seconds.
    pub idle_timeout_secs: u64,

    /// Grace window for propagating a close across the tunnel, in seconds.
    pub close_grace_secs: u64,

    /// Security-policy response headers exempted from stripping.
    pub keep_response_headers: Vec<String>,
}

impl RelaySettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_secs(self.close_grace_secs)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            prefix: "/relay/".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            idle_timeout_secs: 60,
            close_grace_secs: 5,
            keep_response_headers: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            challenge: false,
            users: HashMap::new(),
            routes: true,
            local: true,
            static_dir: "static".to_string(),
            pages: default_pages(),
            mirrors: default_mirrors(),
            relay: RelaySettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_pages() -> Vec<PageRoute> {
    [
        ("/~", "apps.html"),
        ("/-", "games.html"),
        ("/!", "settings.html"),
        ("/0", "tabs.html"),
        ("/1", "go.html"),
        ("/", "index.html"),
    ]
    .into_iter()
    .map(|(path, file)| PageRoute {
        path: path.to_string(),
        file: file.to_string(),
    })
    .collect()
}

fn default_mirrors() -> Vec<MirrorConfig> {
    vec![
        MirrorConfig {
            prefix: "/y/".to_string(),
            upstream: "https://raw.githubusercontent.com/ypxa/y/main".to_string(),
        },
        MirrorConfig {
            prefix: "/f/".to_string(),
            upstream: "https://raw.githubusercontent.com/4x-a/x/fixy".to_string(),
        },
    ]
}
