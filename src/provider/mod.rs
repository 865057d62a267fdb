//! Provider module for Colloquy
//!
//! This module contains the model-provider abstraction and the OpenRouter
//! implementation.

pub mod base;
pub mod openrouter;
pub(crate) mod sse;

pub use base::{ChatProvider, ChatRequest, ProviderStream, StreamEvent, WireMessage};
pub use openrouter::OpenRouterProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns an error if the provider type is unknown or initialization
/// fails (e.g., missing credentials).
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    match config.provider_type.as_str() {
        "openrouter" => Ok(Arc::new(OpenRouterProvider::new(config.openrouter.clone())?)),
        other => Err(crate::error::ColloquyError::Provider(format!(
            "Unknown provider type: {}",
            other
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenRouterConfig;
    use serial_test::serial;

    #[test]
    fn test_create_provider_invalid_type() {
        let config = ProviderConfig {
            provider_type: "invalid".to_string(),
            openrouter: OpenRouterConfig::default(),
        };

        let result = create_provider(&config);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_create_provider_openrouter_with_key() {
        std::env::set_var("COLLOQUY_TEST_OR_KEY", "test-key");
        let config = ProviderConfig {
            provider_type: "openrouter".to_string(),
            openrouter: OpenRouterConfig {
                api_key_env: "COLLOQUY_TEST_OR_KEY".to_string(),
                ..Default::default()
            },
        };

        let result = create_provider(&config);
        assert!(result.is_ok());
        std::env::remove_var("COLLOQUY_TEST_OR_KEY");
    }

    #[test]
    #[serial]
    fn test_create_provider_missing_credentials() {
        std::env::remove_var("COLLOQUY_TEST_MISSING_KEY");
        let config = ProviderConfig {
            provider_type: "openrouter".to_string(),
            openrouter: OpenRouterConfig {
                api_key_env: "COLLOQUY_TEST_MISSING_KEY".to_string(),
                ..Default::default()
            },
        };

        let result = create_provider(&config);
        assert!(result.is_err());
    }
}
