//! Assistant reply composition

use tokio::sync::mpsc;
use tracing::debug;

use super::{FlowError, Turn};
use crate::llm::{CompletionRequest, LlmClient, Message, ResponseFormat, StreamChunk};
use crate::prompts::{PromptLoader, RespondContext};

/// Stream one reply, forwarding text fragments to `fragment_tx`
///
/// A closed `fragment_tx` does not stop the stream; the full reply is still
/// returned.
pub(super) async fn compose(
    llm: &dyn LlmClient,
    prompts: &PromptLoader,
    max_tokens: u32,
    transcript: &[Message],
    turn: &Turn,
    fragment_tx: mpsc::Sender<String>,
) -> Result<String, FlowError> {
    debug!(status = ?turn.status.state, missing = turn.missing.len(), "compose: called");
    let missing = turn.missing.iter().map(|f| f.name()).collect();
    let context = RespondContext::new(turn.draft.to_json(), missing, &turn.status)
        .map_err(|e| FlowError::Prompt(e.to_string()))?;
    let system_prompt = prompts
        .render("respond", &context)
        .map_err(|e| FlowError::Prompt(e.to_string()))?;

    let request = CompletionRequest {
        system_prompt,
        messages: transcript.to_vec(),
        max_tokens,
        response_format: ResponseFormat::Text,
    };

    let (chunk_tx, mut chunk_rx) = mpsc::channel::<StreamChunk>(64);
    let forward = async move {
        while let Some(chunk) = chunk_rx.recv().await {
            match chunk {
                StreamChunk::TextDelta(text) if !text.is_empty() => {
                    let _ = fragment_tx.send(text).await;
                }
                StreamChunk::Error(message) => debug!(%message, "compose: stream error"),
                _ => {}
            }
        }
    };

    let (response, ()) = tokio::join!(llm.stream(request, chunk_tx), forward);
    let response = response?;
    debug!(usage = ?response.usage, "compose: complete");

    Ok(response.content.unwrap_or_default())
}
