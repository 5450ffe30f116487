//! LLM configuration
//!
//! Model settings the binary uses when building a provider agent.

use serde::{Deserialize, Serialize};

/// Configuration for LLM requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model identifier (e.g., "gemini-2.0-flash", "llama3.2")
    pub model: String,

    /// Temperature for response randomness
    pub temperature: Option<f64>,

    /// Maximum tokens in response
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    /// Create a new config with the specified model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl From<&crate::config::ResearchConfig> for LLMConfig {
    fn from(config: &crate::config::ResearchConfig) -> Self {
        Self::new(config.model.clone()).with_temperature(config.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResearchConfig;

    #[test]
    fn test_llm_config_builder() {
        let config = LLMConfig::new("llama3.2")
            .with_temperature(0.2)
            .with_max_tokens(2048);

        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(2048));
    }

    #[test]
    fn test_from_research_config() {
        let config = LLMConfig::from(&ResearchConfig::default());
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.temperature, Some(0.1));
        assert_eq!(config.max_tokens, None);
    }
}
