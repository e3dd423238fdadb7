//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API with
//! support for both blocking and streaming responses.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
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

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAIClient {
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

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(self.convert_messages(&request.messages));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // GPT-5.x and o1/o3 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request.response_format == ResponseFormat::Json {
            debug!("build_request_body: requesting json_object response");
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    /// Convert transcript messages to OpenAI API format
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect()
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choice_count = %api_response.choices.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.choices.into_iter().next() {
            Some(c) => (
                c.message.content,
                c.finish_reason
                    .as_deref()
                    .map(StopReason::from_openai)
                    .unwrap_or(StopReason::EndTurn),
            ),
            None => (None, StopReason::EndTurn),
        };

        CompletionResponse {
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: api_response.usage.prompt_tokens,
                output_tokens: api_response.usage.completion_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
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
                .header("Authorization", format!("Bearer {}", self.api_key))
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
            let api_response: OpenAIResponse = response.json().await?;
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
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut body = self.build_request_body(&request);
        body["stream"] = serde_json::json!(true);
        body["stream_options"] = serde_json::json!({ "include_usage": true });

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Network)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        let mut stream = response.bytes_stream();
        let mut full_content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();
        let mut buffer = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    debug!(error = %e, "stream: body error");
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::Network(e));
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete SSE lines
            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.is_empty() || line == "data: [DONE]" {
                    continue;
                }

                if let Some(data) = line.strip_prefix("data: ")
                    && let Ok(chunk_data) = serde_json::from_str::<OpenAIStreamChunk>(data)
                {
                    if let Some(choice) = chunk_data.choices.first() {
                        if let Some(content) = &choice.delta.content
                            && !content.is_empty()
                        {
                            full_content.push_str(content);
                            let _ = chunk_tx.send(StreamChunk::TextDelta(content.clone())).await;
                        }

                        if let Some(reason) = &choice.finish_reason {
                            stop_reason = StopReason::from_openai(reason);
                        }
                    }

                    // Usage arrives in the final chunk when stream_options.include_usage is set
                    if let Some(u) = chunk_data.usage {
                        usage.input_tokens = u.prompt_tokens;
                        usage.output_tokens = u.completion_tokens;
                    }
                }
            }
        }

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

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

// Streaming types

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    choices: Vec<OpenAIStreamChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str, max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: model.to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens,
        }
    }

    fn request(max_tokens: u32, response_format: ResponseFormat) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You log time".to_string(),
            messages: vec![Message::user("1h on planning"), Message::assistant("Which project?")],
            max_tokens,
            response_format,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let body = client("gpt-4o-mini", 8192).build_request_body(&request(1000, ResponseFormat::Text));

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You log time");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "Which project?");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_json_response_format() {
        let body = client("gpt-4o-mini", 8192).build_request_body(&request(500, ResponseFormat::Json));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_max_tokens_capped() {
        let body = client("gpt-4o-mini", 1000).build_request_body(&request(5000, ResponseFormat::Text));
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_completion_tokens_for_reasoning_models() {
        let body = client("o3-mini", 4096).build_request_body(&request(500, ResponseFormat::Text));
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let api_response: OpenAIResponse = serde_json::from_str(
            r#"{
                "choices": [{"message": {"content": "{\"draft\": {}}"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            }"#,
        )
        .unwrap();

        let response = client("gpt-4o-mini", 1000).parse_response(api_response);
        assert_eq!(response.content.as_deref(), Some("{\"draft\": {}}"));
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 12);
    }
}
