//! Process configuration assembled from the environment (and `.env`).

use anyhow::{ensure, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::util::env as env_util;

pub const DEFAULT_COUNTRIES_API: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_EXCHANGE_API: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://countries.db";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated origins, or `*` for any.
    pub allowed_origins: String,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub countries_url: String,
    pub exchange_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub auto_migrate: bool,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let port = env_util::env_or("API_PORT", "8080")
            .trim()
            .parse()
            .context("Invalid API_PORT")?;

        let timeout_secs: u64 = env_util::env_parse("UPSTREAM_TIMEOUT_SECS", 15);
        ensure!(timeout_secs > 0, "UPSTREAM_TIMEOUT_SECS must be positive");

        let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 5);
        ensure!(max_connections > 0, "DB_MAX_CONNS must be positive");

        let cfg = Self {
            server: ServerConfig {
                host: env_util::env_or("API_HOST", "0.0.0.0"),
                port,
                allowed_origins: env_util::env_or("ALLOWED_ORIGINS", "*"),
            },
            upstream: UpstreamConfig {
                countries_url: env_util::env_or("COUNTRIES_API_URL", DEFAULT_COUNTRIES_API),
                exchange_url: env_util::env_or("EXCHANGE_API_URL", DEFAULT_EXCHANGE_API),
                timeout: Duration::from_secs(timeout_secs),
            },
            storage: StorageConfig {
                database_url: env_util::env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections,
                auto_migrate: env_util::env_flag("AUTO_MIGRATE", true),
                cache_dir: PathBuf::from(env_util::env_or("CACHE_DIR", "./cache")),
            },
        };
        cfg.log_snapshot();
        Ok(cfg)
    }

    fn log_snapshot(&self) {
        info!(
            target = "config",
            host = %self.server.host,
            port = self.server.port,
            database = %env_util::redact_url(&self.storage.database_url),
            cache_dir = %self.storage.cache_dir.display(),
            countries_api = %self.upstream.countries_url,
            exchange_api = %self.upstream.exchange_url,
            timeout_secs = self.upstream.timeout.as_secs(),
            "configuration snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        for key in [
            "API_HOST",
            "API_PORT",
            "DATABASE_URL",
            "COUNTRIES_API_URL",
            "EXCHANGE_API_URL",
            "UPSTREAM_TIMEOUT_SECS",
            "CACHE_DIR",
            "DB_MAX_CONNS",
        ] {
            std::env::remove_var(key);
        }
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.upstream.countries_url, DEFAULT_COUNTRIES_API);
        assert_eq!(cfg.upstream.exchange_url, DEFAULT_EXCHANGE_API);
        assert_eq!(cfg.upstream.timeout, Duration::from_secs(15));
        assert_eq!(cfg.storage.cache_dir, PathBuf::from("./cache"));
        assert_eq!(cfg.storage.max_connections, 5);
    }
}
