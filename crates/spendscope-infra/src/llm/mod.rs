//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible client used for Gemini and a factory
//! ([`create_provider`]) that builds it from the `[model]` config section.
//! [`UnconfiguredProvider`] stands in when no API key is set, so read-only
//! commands keep working and chat turns fail as an upstream error.

pub mod openai_compat;

use secrecy::SecretString;

use spendscope_core::llm::box_provider::BoxLlmProvider;
use spendscope_core::llm::provider::LlmProvider;
use spendscope_types::config::ModelSettings;
use spendscope_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Read the model API key from the environment variable named by
/// `settings.api_key_env`. Empty values count as missing.
pub fn resolve_api_key(settings: &ModelSettings) -> Option<SecretString> {
    std::env::var(&settings.api_key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Create a [`BoxLlmProvider`] from the `[model]` settings.
///
/// # Errors
///
/// Returns `LlmError::AuthenticationFailed` when no API key is available.
pub fn create_provider(
    settings: &ModelSettings,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let config = OpenAiCompatConfig::from_settings(settings, key);

    tracing::debug!(
        provider = %config.provider_name,
        base_url = %config.base_url,
        "Creating model provider"
    );

    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(config)))
}

/// Provider used when no API key is configured. Every call fails with
/// `LlmError::AuthenticationFailed`.
pub struct UnconfiguredProvider {
    provider_name: String,
    api_key_env: String,
}

impl UnconfiguredProvider {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            provider_name: settings.provider_name.clone(),
            api_key_env: settings.api_key_env.clone(),
        }
    }
}

impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        tracing::error!(env = %self.api_key_env, "Model API key is not set");
        Err(LlmError::AuthenticationFailed)
    }
}

/// Build the configured provider, or an [`UnconfiguredProvider`] when the
/// API key environment variable is unset.
pub fn provider_from_env(settings: &ModelSettings) -> BoxLlmProvider {
    match create_provider(settings, resolve_api_key(settings)) {
        Ok(provider) => provider,
        Err(_) => {
            tracing::warn!(
                env = %settings.api_key_env,
                "No model API key found; chat requests will fail until it is set"
            );
            BoxLlmProvider::new(UnconfiguredProvider::new(settings))
        }
    }
}
