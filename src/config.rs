use anyhow::{Result, anyhow};
use std::env;
use tracing::{info, warn};

use crate::deck_store::SeedPolicy;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub share: ShareConfig,
}

/// Where the deck collection lives and how an empty slot is seeded
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub directory: String,
    pub seed_default_decks: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

/// Share link configuration
#[derive(Debug, Clone)]
pub struct ShareConfig {
    pub base_url: String,
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();
        Ok(config)
    }

    /// Build configuration from any key lookup (the process env in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            storage: StorageConfig::from_lookup(&lookup),
            server: ServerConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup),
            share: ShareConfig::from_lookup(&lookup),
        })
    }

    fn log_configuration_summary(&self) {
        info!(
            storage_directory = %self.storage.directory,
            seed_default_decks = self.storage.seed_default_decks,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            share_base_url = %self.share.base_url,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.storage.directory.trim().is_empty() {
            return Err(anyhow!("STORAGE_DIR must not be empty"));
        }

        let base = &self.share.base_url;
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(anyhow!(
                "SHARE_BASE_URL must start with 'http://' or 'https://', got '{}'",
                base
            ));
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
            && !self.logging.level.contains('=')
        {
            warn!("Unrecognized log level '{}', filter may fall back to defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl StorageConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        StorageConfig {
            directory: lookup("STORAGE_DIR").unwrap_or_else(|| "data".to_string()),
            seed_default_decks: flag(lookup, "SEED_DEFAULT_DECKS", true),
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        if self.seed_default_decks {
            SeedPolicy::DefaultDecks
        } else {
            SeedPolicy::Empty
        }
    }
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port_str = lookup("PORT").unwrap_or_else(|| "3000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        LoggingConfig {
            level: lookup("RUST_LOG").unwrap_or_else(|| "info,vivid_decks=debug".to_string()),
            file_enabled: flag(lookup, "LOG_FILE_ENABLED", true),
            console_enabled: flag(lookup, "LOG_CONSOLE_ENABLED", true),
            log_directory: lookup("LOG_DIRECTORY").unwrap_or_else(|| "logs".to_string()),
        }
    }
}

impl ShareConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        ShareConfig {
            base_url: lookup("SHARE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000/".to_string()),
        }
    }
}
