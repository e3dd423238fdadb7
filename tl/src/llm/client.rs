//! LlmClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionRequest, CompletionResponse, LlmError, StreamChunk};

/// Stateless LLM client - each call is independent
///
/// The full transcript travels with every request; the client keeps no
/// conversation state between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the whole reply
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Streaming completion
    ///
    /// Sends chunks to the provided channel as they arrive.
    /// Returns the final complete response.
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::llm::{StopReason, TokenUsage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted replies in order and records every request it sees.
    pub struct MockLlmClient {
        responses: Vec<CompletionResponse>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Mock that replies with each text in turn
        pub fn with_texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| text_response(t)).collect())
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests received so far, oldest first
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn next(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::next: fetching response");
            self.responses
                .get(idx)
                .cloned()
                .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))
        }
    }

    /// A plain end-of-turn reply
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            content: Some(text.to_string()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.next(request)
        }

        async fn stream(
            &self,
            request: CompletionRequest,
            chunk_tx: mpsc::Sender<StreamChunk>,
        ) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::stream: called");
            let response = self.next(request)?;

            // Replay the text word by word, keeping the separating whitespace
            if let Some(content) = &response.content {
                for piece in content.split_inclusive(' ') {
                    let _ = chunk_tx.send(StreamChunk::TextDelta(piece.to_string())).await;
                }
            }
            let _ = chunk_tx
                .send(StreamChunk::MessageDone {
                    stop_reason: response.stop_reason.clone(),
                    usage: response.usage.clone(),
                })
                .await;

            Ok(response)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::{Message, ResponseFormat};

        fn request() -> CompletionRequest {
            CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![Message::user("hi")],
                max_tokens: 1000,
                response_format: ResponseFormat::Text,
            }
        }

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::with_texts(&["Response 1", "Response 2"]);

            let resp1 = client.complete(request()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(request()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.complete(request()).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_streams_fragments() {
            let client = MockLlmClient::with_texts(&["one two three"]);
            let (tx, mut rx) = mpsc::channel(16);

            let response = client.stream(request(), tx).await.unwrap();

            let mut fragments = Vec::new();
            while let Some(chunk) = rx.recv().await {
                if let StreamChunk::TextDelta(text) = chunk {
                    fragments.push(text);
                }
            }
            assert_eq!(fragments, vec!["one ", "two ", "three"]);
            assert_eq!(response.content.as_deref(), Some("one two three"));
        }
    }
}
