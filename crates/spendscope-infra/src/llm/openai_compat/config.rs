//! Configuration and per-provider defaults for OpenAI-compatible endpoints.
//!
//! Each endpoint that speaks the OpenAI chat completions protocol gets a
//! factory returning an [`OpenAiCompatConfig`] with its base URL.

use secrecy::SecretString;
use spendscope_types::config::ModelSettings;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "gemini", "openai").
    pub provider_name: String,
    /// Base URL for the API.
    pub base_url: String,
    pub api_key: SecretString,
    /// Model used when a request does not name one.
    pub model: String,
}

impl OpenAiCompatConfig {
    /// Build from the `[model]` section of `config.toml`.
    pub fn from_settings(settings: &ModelSettings, api_key: SecretString) -> Self {
        Self {
            provider_name: settings.provider_name.clone(),
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.flash_model.clone(),
        }
    }
}

/// Google Gemini default configuration (OpenAI-compatible beta endpoint).
///
/// Base URL: `https://generativelanguage.googleapis.com/v1beta/openai`
pub fn gemini_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "gemini".into(),
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        api_key,
        model: model.into(),
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
    }
}
