//! Configuration management for the newsfeed client
//!
//! Holds the API base URL, endpoint paths, credential storage settings and
//! polling defaults. Persisted as JSON in the per-user config directory.
//! Supports Windows, macOS, and Linux.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`ClientConfig::api_base_url`]
pub const BASE_URL_ENV: &str = "NEWSFEED_API_BASE_URL";

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory could be determined for this platform
    #[error("Could not determine config path")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents are not valid config JSON
    #[error("Invalid config format: {0}")]
    Format(#[from] serde_json::Error),
}

/// Paths of the authentication endpoints, relative to the base URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointPaths {
    pub signin: String,
    pub register: String,
    pub refresh: String,
    pub logout: String,
    pub password_reset: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            signin: "/auth/signin/".to_string(),
            register: "/auth/register/".to_string(),
            refresh: "/auth/token/refresh/".to_string(),
            logout: "/auth/logout/".to_string(),
            password_reset: "/auth/password-reset/".to_string(),
        }
    }
}

/// Path prefixes of the backend services, relative to the base URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServicePaths {
    pub chat: String,
    pub knowledge: String,
    pub hashtags: String,
    pub video_analysis: String,
}

impl Default for ServicePaths {
    fn default() -> Self {
        Self {
            chat: "/api/chat".to_string(),
            knowledge: "/api/rag".to_string(),
            hashtags: "/api/hashtags".to_string(),
            video_analysis: "/api/video-analysis".to_string(),
        }
    }
}

/// Where credentials are persisted between runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON file next to the config file
    File,
    /// OS credential manager (Keychain, Credential Manager, Secret Service)
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

/// Credential storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub kind: StorageKind,
    /// Key under which the access credential is stored
    pub access_key: String,
    /// Key under which the refresh credential is stored
    pub refresh_key: String,
    /// Keyring service name
    pub service: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: StorageKind::File,
            access_key: "access_token".to_string(),
            refresh_key: "refresh_token".to_string(),
            service: "newsfeed-client".to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash
    pub api_base_url: String,
    #[serde(default)]
    pub endpoints: EndpointPaths,
    #[serde(default)]
    pub services: ServicePaths,
    /// Path substrings for which a 401 never triggers a refresh
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
    /// Location handed to the session-ended callback
    #[serde(default = "default_signin_redirect")]
    pub signin_redirect: String,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Default interval for the polling agent in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_exempt_paths() -> Vec<String> {
    vec![
        "/auth/signin".to_string(),
        "/auth/register".to_string(),
        "/auth/token/refresh".to_string(),
    ]
}

fn default_signin_redirect() -> String {
    "/signin".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            endpoints: EndpointPaths::default(),
            services: ServicePaths::default(),
            exempt_paths: default_exempt_paths(),
            signin_redirect: default_signin_redirect(),
            storage: StorageSettings::default(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ClientConfig {
    /// Creates a default config pointed at the given base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Gets the config directory path (cross-platform)
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|p| PathBuf::from(p).join("NewsfeedClient"))
        }

        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|p| PathBuf::from(p).join("Library/Application Support/NewsfeedClient"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::var("HOME").ok().map(|p| PathBuf::from(p).join(".config")))
                .map(|p| p.join("newsfeed-client"))
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }

    /// Gets the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    /// Gets the path of the file-backed credential store
    pub fn credentials_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("credentials.json"))
    }

    /// Loads configuration from disk, falling back to defaults
    ///
    /// The base URL can be overridden with `NEWSFEED_API_BASE_URL`.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable config at {:?}: {}", path, e);
                    None
                }
            })
            .unwrap_or_default();

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                config.api_base_url = url.trim_end_matches('/').to_string();
            }
        }

        config
    }

    /// Loads configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Saves configuration to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Absolute URL for an API path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.api_base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Path of `endpoint` under a service prefix
    ///
    /// ```
    /// use newsfeed_client::ClientConfig;
    ///
    /// let config = ClientConfig::default();
    /// assert_eq!(config.service_path(&config.services.chat, "status/"), "/api/chat/status/");
    /// ```
    pub fn service_path(&self, prefix: &str, endpoint: &str) -> String {
        format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// True when a 401 on this path must be propagated without refreshing
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths
            .iter()
            .any(|exempt| !exempt.is_empty() && path.contains(exempt.as_str()))
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Default polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
