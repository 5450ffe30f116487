//! LLM Provider trait definition
//!
//! The workflow only needs prompt-in, text-out generation. Structured
//! output is never assumed; every reply goes through [`crate::extract`].

use async_trait::async_trait;

use crate::error::ResearchError;

/// Core generation backend trait
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct EchoProvider;
///
/// #[async_trait]
/// impl LLMProvider for EchoProvider {
///     async fn generate(&self, prompt: &str) -> Result<String, ResearchError> {
///         Ok(prompt.to_string())
///     }
///
///     fn name(&self) -> &str { "echo" }
///     fn default_model(&self) -> &str { "echo-1" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a reply for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String, ResearchError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model used when none is configured
    fn default_model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct MockProvider {
        reply: String,
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ResearchError> {
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }
    }

    #[tokio::test]
    async fn test_provider_as_trait_object() {
        let provider: Arc<dyn LLMProvider> = Arc::new(MockProvider {
            reply: "{\"ok\": true}".to_string(),
        });

        let reply = provider.generate("anything").await.unwrap();
        assert_eq!(reply, "{\"ok\": true}");
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.default_model(), "mock-model");
    }
}
