//! Adapter for using Rig Agents as the research [`LLMProvider`]
//!
//! Rig agents are built once with their preamble and temperature; each
//! research stage then sends a single rendered prompt and reads back raw
//! text. No tool calling is involved.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig::providers::gemini::Client;
//! use research_flow::compat::RigAgentAdapter;
//!
//! let client = Client::from_env();
//! let agent = client.agent("gemini-2.0-flash").temperature(0.1).build();
//! let provider = RigAgentAdapter::with_names(agent, "gemini", "gemini-2.0-flash");
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};

use crate::error::ResearchError;
use crate::llm::LLMProvider;

/// Wraps a Rig `Agent<M>` so the workflow can use any Rig-backed model.
pub struct RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    provider_name: String,
    model_name: String,
}

impl<M> RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: "rig".to_string(),
            model_name: "rig-agent".to_string(),
        }
    }

    /// Create adapter with custom provider/model names for logging.
    pub fn with_names(
        agent: Agent<M>,
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: provider_name.into(),
            model_name: model_name.into(),
        }
    }

    pub fn agent(&self) -> &Agent<M> {
        &self.agent
    }
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn generate(&self, prompt: &str) -> Result<String, ResearchError> {
        debug!(
            provider = %self.provider_name,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        let response = self
            .agent
            .prompt(prompt)
            .await
            .map_err(|e| ResearchError::Llm(format!("Rig agent error: {}", e)))?;

        check_reply(&self.provider_name, response)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.model_name
    }
}

/// An empty reply is a failed generation, not an empty answer.
fn check_reply(provider: &str, response: String) -> Result<String, ResearchError> {
    if response.trim().is_empty() {
        return Err(ResearchError::Llm(format!(
            "{} returned an empty reply",
            provider
        )));
    }
    Ok(response)
}

impl<M> std::fmt::Debug for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter")
            .field("provider_name", &self.provider_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}
