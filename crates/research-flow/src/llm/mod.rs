//! Generation backend abstraction

pub mod config;
pub mod provider;

pub use config::LLMConfig;
pub use provider::LLMProvider;
