//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STALECACHE_*)
//! 2. TOML config file (if STALECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod policy;
mod validation;

pub use policy::PolicyConfig;
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STALECACHE_*)
/// 2. TOML config file (if STALECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag naming the current cache generation.
    ///
    /// Must change whenever the manifest or policy logic changes so the
    /// previous generation is rotated out on activation.
    /// Set via STALECACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the application being served; relative manifest entries
    /// resolve against it and same-origin responses are classified `basic`.
    ///
    /// Set via STALECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Critical assets fetched into the generation at install time.
    ///
    /// Set via STALECACHE_MANIFEST environment variable (e.g. `["/", "/app.js"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Hostname substrings that are never served from or written to the cache.
    ///
    /// Set via STALECACHE_EXCLUDED_HOSTS environment variable.
    #[serde(default = "default_excluded_hosts")]
    pub excluded_hosts: Vec<String>,

    /// Path to SQLite cache database (`:memory:` for a throwaway database).
    ///
    /// Set via STALECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via STALECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via STALECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects the network layer follows.
    ///
    /// Set via STALECACHE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_excluded_hosts() -> Vec<String> {
    vec!["supabase.co".into(), "googleapis.com".into(), "generativelanguage.googleapis.com".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stalecache.sqlite")
}

fn default_user_agent() -> String {
    "stalecache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            manifest: default_manifest(),
            excluded_hosts: default_excluded_hosts(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STALECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("STALECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// The engine-facing subset of the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn policy(&self) -> Result<PolicyConfig, ConfigError> {
        let origin = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        Ok(PolicyConfig {
            version: self.version.clone(),
            origin,
            manifest: self.manifest.clone(),
            excluded_hosts: self.excluded_hosts.iter().cloned().map(policy::normalize_host).collect(),
        })
    }
}
