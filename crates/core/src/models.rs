//! # Dossier Models
//!
//! Centralized LLM provider configuration. Dossier talks to
//! OpenAI-compatible chat-completions endpoints; each provider contributes a
//! default base URL and the environment variable its API key is read from.

use serde::{Deserialize, Serialize};

/// Supported LLM providers.
///
/// All of these expose the OpenAI chat-completions wire format:
/// - OpenAI - `OPENAI_API_KEY`
/// - OpenRouter (gateway) - `OPENROUTER_API_KEY`
/// - Grok (xAI) - `XAI_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    OpenRouter,
    Grok,
    DeepSeek,
}

impl LlmProvider {
    /// Display name for logs and status payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::Grok => "Grok",
            LlmProvider::DeepSeek => "DeepSeek",
        }
    }

    /// Environment variable the API key is loaded from.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
            LlmProvider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Default API base URL, overridable per config.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LlmProvider::Grok => "https://api.x.ai/v1",
            LlmProvider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// Default model when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
            LlmProvider::Grok => "grok-2-latest",
            LlmProvider::DeepSeek => "deepseek-chat",
        }
    }
}

/// Which provider and model a run generates with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// LLM provider to use.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g. "gpt-4o-mini", "deepseek-chat").
    pub model: String,
    /// Base URL override for self-hosted or proxy endpoints.
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: None,
        }
    }
}

impl ModelConfig {
    /// Config for the default provider with a specific model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::default(),
            model: model.into(),
            base_url: None,
        }
    }

    /// Config for a specific provider, using its default model.
    pub fn for_provider(provider: LlmProvider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: None,
        }
    }

    /// Config for a specific provider and model.
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
        }
    }

    /// Set a base URL (for OpenAI-compatible proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Effective base URL: the override if set, the provider default
    /// otherwise. Trailing slashes are dropped so path joins stay clean.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert!(config.model.contains("gpt"));
    }

    #[test]
    fn test_provider_env_keys() {
        assert_eq!(LlmProvider::OpenAI.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(LlmProvider::Grok.api_key_env(), "XAI_API_KEY");
    }

    #[test]
    fn test_effective_base_url_prefers_override() {
        let config = ModelConfig::new("gpt-4o-mini").with_base_url("http://localhost:11434/v1/");
        assert_eq!(config.effective_base_url(), "http://localhost:11434/v1");

        let config = ModelConfig::for_provider(LlmProvider::DeepSeek);
        assert_eq!(config.effective_base_url(), "https://api.deepseek.com/v1");
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::with_provider(LlmProvider::DeepSeek, "deepseek-chat");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("deepseek"));
    }
}
