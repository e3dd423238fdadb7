//! LLM request/response types for timelog
//!
//! Provider-agnostic shapes for a chat transcript, a completion request, and
//! the streamed fragments of a reply.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (rendered from a Handlebars template)
    pub system_prompt: String,

    /// The chat transcript, oldest first
    pub messages: Vec<Message>,

    /// Max tokens for response (capped by the client's configured limit)
    pub max_tokens: u32,

    /// Whether the reply must be a JSON object
    pub response_format: ResponseFormat,
}

/// Shape the model is asked to reply in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        debug!("Message::assistant: called");
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage
    pub usage: TokenUsage,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Parse from Anthropic API stop_reason string
    pub fn from_anthropic(s: &str) -> Self {
        debug!(%s, "StopReason::from_anthropic: called");
        match s {
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => {
                debug!("StopReason::from_anthropic: unknown, defaulting to EndTurn");
                StopReason::EndTurn
            }
        }
    }

    /// Parse from OpenAI API finish_reason string
    pub fn from_openai(s: &str) -> Self {
        debug!(%s, "StopReason::from_openai: called");
        match s {
            "stop" => StopReason::EndTurn,
            "length" => StopReason::MaxTokens,
            _ => {
                debug!("StopReason::from_openai: unknown, defaulting to EndTurn");
                StopReason::EndTurn
            }
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Streaming chunk for incremental reply display
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Text being generated
    TextDelta(String),

    /// Message complete with final stats
    MessageDone { stop_reason: StopReason, usage: TokenUsage },

    /// Error during streaming
    Error(String),
}
