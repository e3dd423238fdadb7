//! Anthropic Claude API client implementation
//!
//! Implements the LlmClient trait for Anthropic's Messages API with
//! support for both blocking and streaming responses.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, ResponseFormat, StopReason, StreamChunk,
    TokenUsage,
};
use crate::config::ResolvedLlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 529)
}

/// Anthropic Claude API client
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Create a new client from resolved configuration
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(provider = %config.provider, model = %config.model, "from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the Anthropic API
    ///
    /// The Messages API has no JSON mode, so a JSON request only gets an
    /// extra line in the system prompt.
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let system = match request.response_format {
            ResponseFormat::Json => format!(
                "{}\n\nRespond with a single JSON object and nothing else.",
                request.system_prompt
            ),
            ResponseFormat::Text => request.system_prompt.clone(),
        };

        serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "system": system,
            "messages": self.convert_messages(&request.messages),
        })
    }

    /// Convert transcript messages to Anthropic API format
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role,
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Parse the Anthropic API response
    fn parse_response(&self, api_response: AnthropicResponse) -> CompletionResponse {
        debug!(?api_response.stop_reason, "parse_response: called");
        let text: String = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        CompletionResponse {
            content: if text.is_empty() { None } else { Some(text) },
            stop_reason: StopReason::from_anthropic(&api_response.stop_reason),
            usage: TokenUsage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(
                    attempt,
                    backoff_ms = backoff,
                    "complete: retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("x-api-key", self.api_key.clone())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                debug!("complete: rate limited (429)");
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                });
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "complete: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            debug!("complete: success");
            let api_response: AnthropicResponse = response.json().await?;
            return Ok(self.parse_response(api_response));
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "stream: called");
        let url = format!("{}/v1/messages", self.base_url);
        let mut body = self.build_request_body(&request);
        body["stream"] = serde_json::json!(true);

        let http_request = self
            .http
            .post(url)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(http_request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut full_content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Message(msg)) => {
                    let data: serde_json::Value = serde_json::from_str(&msg.data).map_err(LlmError::Json)?;

                    match data["type"].as_str() {
                        Some("content_block_delta") => {
                            if let Some(text) = data["delta"]["text"].as_str()
                                && !text.is_empty()
                            {
                                full_content.push_str(text);
                                let _ = chunk_tx.send(StreamChunk::TextDelta(text.to_string())).await;
                            }
                        }
                        Some("message_delta") => {
                            debug!("stream: message_delta");
                            if let Some(sr) = data["delta"]["stop_reason"].as_str() {
                                stop_reason = StopReason::from_anthropic(sr);
                            }
                            if let Some(u) = data.get("usage") {
                                usage.output_tokens = u["output_tokens"].as_u64().unwrap_or(0);
                            }
                        }
                        Some("message_start") => {
                            debug!("stream: message_start");
                            if let Some(u) = data["message"].get("usage") {
                                usage.input_tokens = u["input_tokens"].as_u64().unwrap_or(0);
                            }
                        }
                        Some("message_stop") => {
                            debug!("stream: message_stop");
                            break;
                        }
                        Some("error") => {
                            let message = data["error"]["message"].as_str().unwrap_or("unknown error").to_string();
                            debug!(%message, "stream: error event");
                            let _ = chunk_tx.send(StreamChunk::Error(message.clone())).await;
                            es.close();
                            return Err(LlmError::InvalidResponse(message));
                        }
                        _ => {}
                    }
                }
                Ok(Event::Open) => {
                    debug!("stream: Event::Open");
                }
                Err(e) => {
                    debug!(%e, "stream: Event error");
                    es.close();
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }
        es.close();

        debug!(content_len = full_content.len(), ?usage, "stream: complete");
        let _ = chunk_tx
            .send(StreamChunk::MessageDone {
                stop_reason: stop_reason.clone(),
                usage: usage.clone(),
            })
            .await;

        Ok(CompletionResponse {
            content: if full_content.is_empty() { None } else { Some(full_content) },
            stop_reason,
            usage,
        })
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
