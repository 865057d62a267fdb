//! Configuration management for Colloquy
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ColloquyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Colloquy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Streaming exchange configuration
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            exchange: ExchangeConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Provider configuration
///
/// Specifies which model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenRouter configuration
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

fn default_provider_type() -> String {
    "openrouter".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openrouter: OpenRouterConfig::default(),
        }
    }
}

/// OpenRouter provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API base URL (useful for tests and local mocks)
    #[serde(default = "default_openrouter_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,

    /// Default model when a request does not name one
    #[serde(default = "default_openrouter_model")]
    pub model: String,
}

fn default_openrouter_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_openrouter_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: default_openrouter_api_base(),
            api_key_env: default_openrouter_key_env(),
            model: default_openrouter_model(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file path; falls back to the platform data directory
    #[serde(default)]
    pub db_path: Option<String>,
}

/// Streaming exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Timeout for opening the provider stream (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, applying CLI overrides
    ///
    /// A missing file yields the defaults so the binary runs without any
    /// configuration on disk.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ColloquyError::Config(format!("Failed to read {}: {}", path, e)))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| ColloquyError::Config(format!("Failed to parse {}: {}", path, e)))?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            Self::default()
        };

        if let Some(db_path) = &cli.storage_path {
            config.storage.db_path = Some(db_path.clone());
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(ColloquyError::Config("server.host must not be empty".into()).into());
        }

        if self.provider.provider_type != "openrouter" {
            return Err(ColloquyError::Config(format!(
                "Unknown provider type: {}",
                self.provider.provider_type
            ))
            .into());
        }

        if self.provider.openrouter.api_base.is_empty() {
            return Err(
                ColloquyError::Config("provider.openrouter.api_base must not be empty".into())
                    .into(),
            );
        }

        if self.exchange.request_timeout_seconds == 0 {
            return Err(ColloquyError::Config(
                "exchange.request_timeout_seconds must be greater than zero".into(),
            )
            .into());
        }

        Ok(())
    }
}
