//! Configuration loading for the dashboard.
//!
//! Loads configuration from TOML files and/or environment variables using figment.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (if it exists)
//! 3. Environment variables (prefix: `BOURSE_`, nested with `__`)
//!
//! # Environment Variable Naming
//!
//! - `BOURSE_SERVER__LISTEN_ADDR` → `server.listen_addr`
//! - `BOURSE_BACKEND__BASE_URL` → `backend.base_url`
//! - `BOURSE_SESSION__COOKIE_NAME` → `session.cookie_name`
//! - `BOURSE_LISTING__DEFAULT_PAGE_SIZE` → `listing.default_page_size`

use anyhow::{Context, Result, bail};
use bourse_api::PageSize;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the dashboard.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Where the REST backend lives
    #[serde(default)]
    pub backend: BackendConfig,

    /// Session cookie contract shared with the backend
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub listing: ListingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the versioned API, e.g. `http://localhost:8080/api/v1`.
    ///
    /// `/api/...` pass-through requests go to the same host.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. A backend that does not answer in time is
    /// reported like any other transient failure.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Name of the cookie the backend issues on login and reads on every
    /// call. The dashboard gate checks the same cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Lifetime of the cookie set after login
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Mark the cookie `Secure` (only enable when served over HTTPS)
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age_secs(),
            secure: false,
        }
    }
}

fn default_cookie_name() -> String {
    "jwt".to_string()
}

fn default_max_age_secs() -> u64 {
    86400
}

/// Table defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListingConfig {
    /// Rows per page when the request does not say (5, 10, 20 or 50)
    #[serde(default)]
    pub default_page_size: PageSize,
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Configuration sources are merged in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. TOML config file (if it exists)
    /// 3. Environment variables (prefix: `BOURSE_`, nested with `__`)
    ///
    /// # Example
    ///
    /// ```bash
    /// # Point the dashboard at another backend
    /// export BOURSE_BACKEND__BASE_URL=http://backend:8080/api/v1
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if path.exists() {
            figment = figment.merge(Toml::file(path));
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
        }

        figment = figment.merge(Env::prefixed("BOURSE_").split("__"));

        let config: Config = figment.extract().with_context(|| {
            format!("Failed to load config from {} and environment", path.display())
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later at request time.
    pub fn validate(&self) -> Result<()> {
        if self.session.cookie_name.trim().is_empty() {
            bail!("session.cookie_name must not be empty");
        }
        if self.backend.request_timeout_secs == 0 {
            bail!("backend.request_timeout_secs must be greater than 0");
        }
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            bail!(
                "backend.base_url must be an http(s) URL, got {:?}",
                self.backend.base_url
            );
        }
        Ok(())
    }

    /// Get the default config file path
    /// - macOS: ~/Library/Application Support/bourse-dashboard/config.toml
    /// - Linux: ~/.config/bourse-dashboard/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bourse-dashboard")
            .join("config.toml")
    }

    /// Get the default data directory (logs)
    /// - macOS: ~/Library/Application Support/bourse-dashboard/
    /// - Linux: ~/.local/share/bourse-dashboard/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bourse-dashboard")
    }
}

/// Create a default configuration template
pub fn default_config_template() -> String {
    let data_dir = Config::default_data_dir();
    let data_dir_str = data_dir.display();

    format!(
        r#"# Bourse Dashboard Configuration
# Data directory: {data_dir_str} (logs are written to {data_dir_str}/logs)
#
# Every setting can be overridden with an environment variable, e.g.
#   BOURSE_BACKEND__BASE_URL=http://backend:8080/api/v1

[server]
listen_addr = "127.0.0.1:3000"

[backend]
base_url = "http://localhost:8080/api/v1"
request_timeout_secs = 10

# =============================================================================
# Session
# =============================================================================
#
# The backend sets this cookie on login and reads it on every call. The
# dashboard only checks that it is present; the backend decides if it is valid.

[session]
cookie_name = "jwt"
max_age_secs = 86400
# Enable when the dashboard is served over HTTPS
secure = false

[listing]
# One of 5, 10, 20, 50
default_page_size = 10
"#
    )
}
