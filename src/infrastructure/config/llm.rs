//! Model provider configuration.
//!
//! The provider API key is not configured here. Each organization stores its
//! own key, encrypted, and it is decrypted per chat turn.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    ///
    /// Defaults to "gpt-4o-mini".
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for generation. Defaults to 0.7.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens in one model response. Defaults to 4096.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Chat Completions endpoint of an OpenAI-compatible provider.
    ///
    /// Uses api.openai.com when unset.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> usize {
    4096
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: None,
        }
    }
}
