//! LLM Client module for timelog
//!
//! Provides completion requests against OpenAI and Anthropic, plus a scripted
//! mock for tests.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{
    CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, StopReason, StreamChunk, TokenUsage,
};

use crate::config::{LlmConfig, ResolvedLlmConfig};

/// Create an LLM client based on the provider specified in config
///
/// Resolves the default provider/model from the config and creates the appropriate client.
/// Supports "anthropic" and "openai" providers.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let resolved = config.resolve().map_err(|e| LlmError::Config(e.to_string()))?;

    create_client_from_resolved(&resolved)
}

/// Create an LLM client from a resolved configuration
pub fn create_client_from_resolved(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client_from_resolved: called");
    match config.provider.as_str() {
        "anthropic" => {
            debug!("create_client_from_resolved: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(config)?))
        }
        "openai" => {
            debug!("create_client_from_resolved: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client_from_resolved: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: anthropic, openai",
                other
            )))
        }
    }
}
