//! Configuration system for the gateway.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PEERWAY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/peerway/config.toml
//!   3. ~/.config/peerway/config.toml
//!
//! The loaded value is immutable for the life of the process. Every listener
//! task receives its own `ListenerConfig` copy derived from the `web` section.

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub web: WebConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen addresses in host:port form. The host may be omitted (":8080")
    /// to listen on all interfaces.
    pub listen: Vec<String>,
    /// Serve HTTPS on every listen address.
    pub use_tls: bool,
    /// Certificate chain in PEM form, leaf first.
    pub certificate_file: PathBuf,
    /// Private key in PEM form.
    pub certificate_key: PathBuf,
    /// Maximum time to read request headers. Zero disables the limit.
    #[serde(with = "humantime_serde")]
    pub timeout_read: Duration,
    /// Maximum time for handling a request including writing the response
    /// body. Large file transfers are cut off when it expires. Zero disables
    /// the limit.
    #[serde(with = "humantime_serde")]
    pub timeout_write: Duration,
    /// Host to serve the port 80 → HTTPS redirect on. Empty = disabled.
    pub redirect_80: String,
    /// Directory holding index.html and favicon.ico.
    pub files: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base URL of the local peer node's HTTP API.
    pub node_api: String,
    /// Deadline for establishing a connection to a remote peer.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

/// Settings for one listener, derived from [`WebConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub address: String,
    pub use_tls: bool,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Connect timeout applied to ledger and file queries alike.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: vec!["0.0.0.0:8080".to_string()],
            use_tls: false,
            certificate_file: PathBuf::new(),
            certificate_key: PathBuf::new(),
            timeout_read: Duration::from_secs(10),
            timeout_write: Duration::from_secs(10 * 60),
            redirect_80: String::new(),
            files: PathBuf::from("html/"),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_api: "http://127.0.0.1:112".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("peerway")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid listen address {0:?}")]
    InvalidListenAddress(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl GatewayConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            GatewayConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PEERWAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&GatewayConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply PEERWAY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PEERWAY_WEB__LISTEN") {
            self.web.listen = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = var("PEERWAY_WEB__USE_TLS") {
            self.web.use_tls = v == "true" || v == "1";
        }
        if let Some(v) = var("PEERWAY_WEB__FILES") {
            self.web.files = PathBuf::from(v);
        }
        if let Some(v) = var("PEERWAY_WEB__REDIRECT_80") {
            self.web.redirect_80 = v;
        }
        if let Some(v) = var("PEERWAY_NETWORK__NODE_API") {
            self.network.node_api = v;
        }
    }

    /// One listener per configured address, all sharing the web settings.
    pub fn listeners(&self) -> Vec<ListenerConfig> {
        self.web
            .listen
            .iter()
            .map(|address| ListenerConfig {
                address: address.clone(),
                use_tls: self.web.use_tls,
                cert_file: self.web.certificate_file.clone(),
                key_file: self.web.certificate_key.clone(),
                read_timeout: self.web.timeout_read,
                write_timeout: self.web.timeout_write,
            })
            .collect()
    }

    /// Address of the plaintext redirect listener, if enabled.
    pub fn redirect_address(&self) -> Option<String> {
        let host = self.web.redirect_80.trim();
        if host.is_empty() {
            return None;
        }
        if host.contains(':') && !host.starts_with('[') {
            // bare IPv6 literal
            return Some(format!("[{host}]:80"));
        }
        Some(format!("{host}:80"))
    }
}

impl ListenerConfig {
    /// Resolve the configured address. A missing host means all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        resolve_listen_address(&self.address)
    }
}

/// Resolve a host:port listen string. ":port" binds every interface.
pub fn resolve_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let full = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    };
    full.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::InvalidListenAddress(address.to_string()))
}
