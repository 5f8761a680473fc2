//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use axum::http::HeaderValue;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Read once at process entry and shared behind an `Arc`; nothing re-reads
/// the environment after startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime environment name (`production`, `development`, ...).
    #[serde(default)]
    pub node_env: Option<String>,

    /// The single origin allowed by the CORS policy.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Path prefix for every API route (e.g., "/api/v1").
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    // === Static Bundle ===
    /// Directory holding the prebuilt frontend bundle (production only).
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    // === Observability ===
    /// Log filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Port for the Prometheus exporter; disabled when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_api_base_url() -> String {
    "/api/v1".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024 // 10mb
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Build configuration from explicit key/value pairs instead of the
    /// process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.api_base_url.starts_with('/') {
            return Err("API_BASE_URL must start with '/'".to_string());
        }

        if self.api_base_url == "/" || self.api_base_url.ends_with('/') {
            return Err("API_BASE_URL must not be '/' or end with '/'".to_string());
        }

        if let Err(e) = self.cors_origin_header() {
            return Err(format!("CORS_ORIGIN is not a valid header value: {}", e));
        }

        if self.body_limit_bytes == 0 {
            return Err("BODY_LIMIT_BYTES must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Whether the server runs in production mode.
    pub fn is_production(&self) -> bool {
        self.node_env.as_deref() == Some("production")
    }

    /// Environment name as reported by the health endpoint.
    pub fn environment(&self) -> Option<&str> {
        self.node_env.as_deref()
    }

    /// The configured CORS origin as a header value.
    pub fn cors_origin_header(&self) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
        HeaderValue::from_str(&self.cors_origin)
    }

    /// Entry document of the static bundle.
    pub fn index_document(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }

    /// Log filter directive; `verbose` forces debug output for this crate.
    pub fn log_directive(&self, verbose: bool) -> &str {
        if verbose {
            VERBOSE_LOG_DIRECTIVE
        } else {
            &self.rust_log
        }
    }
}

/// Log filter used with `--verbose`.
pub const VERBOSE_LOG_DIRECTIVE: &str = "spa_starter=debug,info";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            node_env: None,
            cors_origin: default_cors_origin(),
            api_base_url: default_api_base_url(),
            static_dir: default_static_dir(),
            body_limit_bytes: default_body_limit(),
            rust_log: default_log_level(),
            metrics_port: None,
        }
    }
}
