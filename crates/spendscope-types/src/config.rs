//! Configuration types for SpendScope.
//!
//! `AssistantConfig` represents the top-level `config.toml` that controls the
//! chat engine (memory window, title length) and the model boundary
//! (endpoint, model names, sampling, timeout).

use serde::{Deserialize, Serialize};

use crate::llm::ModelSize;

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub chat: ChatSettings,

    #[serde(default)]
    pub model: ModelSettings,
}

/// Settings for the conversational engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Number of messages drawn from other sessions for cross-session memory.
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Character budget for titles derived from the first message.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Whether memory is injected when a request does not say.
    #[serde(default = "default_memory_default")]
    pub memory_default: bool,
}

fn default_memory_window() -> usize {
    10
}

fn default_title_max_chars() -> usize {
    20
}

fn default_memory_default() -> bool {
    true
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            memory_window: default_memory_window(),
            title_max_chars: default_title_max_chars(),
            memory_default: default_memory_default(),
        }
    }
}

/// Settings for the model boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_flash_model")]
    pub flash_model: String,

    #[serde(default = "default_pro_model")]
    pub pro_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on a single model call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "gemini".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_flash_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_pro_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            flash_model: default_flash_model(),
            pro_model: default_pro_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelSettings {
    /// Wire model name for a size selector.
    pub fn model_for(&self, size: ModelSize) -> &str {
        match size {
            ModelSize::Flash => &self.flash_model,
            ModelSize::Pro => &self.pro_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = AssistantConfig::default();
        assert_eq!(config.chat.memory_window, 10);
        assert_eq!(config.chat.title_max_chars, 20);
        assert!(config.chat.memory_default);
        assert_eq!(config.model.provider_name, "gemini");
        assert_eq!(config.model.timeout_secs, 120);
        assert!((config.model.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: AssistantConfig = toml::from_str("").unwrap();
        assert_eq!(config.chat.memory_window, 10);
        assert_eq!(config.model.flash_model, "gemini-3-flash-preview");
    }

    #[test]
    fn test_config_deserialize_partial_sections() {
        let toml_str = r#"
[chat]
memory_window = 4

[model]
pro_model = "gemini-2.5-pro"
timeout_secs = 30
"#;
        let config: AssistantConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chat.memory_window, 4);
        assert_eq!(config.chat.title_max_chars, 20);
        assert_eq!(config.model.pro_model, "gemini-2.5-pro");
        assert_eq!(config.model.flash_model, "gemini-3-flash-preview");
        assert_eq!(config.model.timeout_secs, 30);
    }

    #[test]
    fn test_model_for_size() {
        let settings = ModelSettings::default();
        assert_eq!(settings.model_for(ModelSize::Flash), "gemini-3-flash-preview");
        assert_eq!(settings.model_for(ModelSize::Pro), "gemini-3-pro-preview");
    }
}
