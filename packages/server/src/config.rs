use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Pool size. SQLite databases are always capped to a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded photos and audio clips.
    pub uploads_dir: PathBuf,
    /// Maximum size of a single attachment in bytes. Default: 32 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Public path prefix under which blobs are served. Default: "/uploads".
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

/// Orphan blob sweep settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps. Default: 3600.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Unreferenced blobs younger than this are left alone. Default: 86400.
    #[serde(default = "default_sweep_grace_period_secs")]
    pub grace_period_secs: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}
fn default_max_connections() -> u32 {
    10
}
fn default_max_blob_size() -> u64 {
    32 * 1024 * 1024
}
fn default_public_prefix() -> String {
    "/uploads".into()
}
fn default_sweep_interval_secs() -> u64 {
    3600
}
fn default_sweep_grace_period_secs() -> u64 {
    86400
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_sweep_interval_secs(),
            grace_period_secs: default_sweep_grace_period_secs(),
        }
    }
}

impl SweepConfig {
    /// The grace period, saturated at the largest span chrono represents.
    pub fn grace_period(&self) -> chrono::TimeDelta {
        i64::try_from(self.grace_period_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("BIRDWATCH_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600_i64)?
            .set_default("database.url", "sqlite://birdwatch.db?mode=rwc")?
            .set_default("storage.uploads_dir", "./uploads")?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., BIRDWATCH__DATABASE__URL)
            .add_source(Environment::with_prefix("BIRDWATCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Path prefix blobs are served under: leading slash, no trailing slash.
    pub fn public_prefix(&self) -> String {
        let trimmed = self.storage.public_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/uploads".to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Public URL path of a stored blob.
    pub fn public_url(&self, blob: &str) -> String {
        format!("{}/{}", self.public_prefix(), blob)
    }
}
