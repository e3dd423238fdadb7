//! Field extraction
//!
//! One non-streaming model call per user message. The reply must be a JSON
//! object `{"draft": {...}}`; its values are validated and merged into a copy
//! of the current draft.

use chrono::Utc;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FlowError, FlowSettings, PARSE_ERROR};
use crate::entry::{Draft, DraftUpdate, FieldIssue};
use crate::llm::{CompletionRequest, LlmClient, Message, ResponseFormat};
use crate::prompts::{ExtractContext, PromptLoader};

/// Expected shape of the extraction reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractionReply {
    pub draft: DraftUpdate,
}

/// Draft after one extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub draft: Draft,
    /// `Some("parse")` when the reply could not be read
    pub error: Option<String>,
    pub invalid: Vec<FieldIssue>,
}

/// Merge the model's reply text into a copy of `draft`
///
/// A reply that does not match [`ExtractionReply`] leaves the draft as it was
/// and sets the parse error tag.
pub fn apply_reply(draft: &Draft, reply: &str, default_tz: Tz) -> Extraction {
    debug!(reply_len = reply.len(), "apply_reply: called");
    match serde_json::from_str::<ExtractionReply>(strip_code_fence(reply)) {
        Ok(parsed) => {
            let mut next = draft.clone();
            let invalid = next.merge(&parsed.draft, default_tz);
            Extraction {
                draft: next,
                error: None,
                invalid,
            }
        }
        Err(e) => {
            warn!(error = %e, "apply_reply: extraction reply is not a draft object");
            Extraction {
                draft: draft.clone(),
                error: Some(PARSE_ERROR.to_string()),
                invalid: Vec::new(),
            }
        }
    }
}

/// Drop a surrounding Markdown code fence, if any
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub(super) async fn extract(
    llm: &dyn LlmClient,
    prompts: &PromptLoader,
    settings: &FlowSettings,
    transcript: &[Message],
    draft: &Draft,
) -> Result<Extraction, FlowError> {
    debug!(messages = transcript.len(), "extract: called");
    let now = Utc::now().with_timezone(&settings.default_tz);
    let context = ExtractContext {
        draft_json: draft.to_json(),
        now: now.format("%A %Y-%m-%d %H:%M").to_string(),
        default_timezone: settings.default_tz.name().to_string(),
    };
    let system_prompt = prompts
        .render("extract", &context)
        .map_err(|e| FlowError::Prompt(e.to_string()))?;

    let request = CompletionRequest {
        system_prompt,
        messages: transcript.to_vec(),
        max_tokens: settings.extract_max_tokens,
        response_format: ResponseFormat::Json,
    };

    let response = llm.complete(request).await?;
    let content = response.content.unwrap_or_default();
    debug!(%content, "extract: model reply");

    Ok(apply_reply(draft, &content, settings.default_tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Field;
    use crate::llm::client::mock::MockLlmClient;
    use chrono_tz::America::Los_Angeles;

    #[test]
    fn test_apply_reply_merges() {
        let extraction = apply_reply(
            &Draft::new(),
            r#"{"draft": {"duration": 90, "project": "Apollo", "topic": null}}"#,
            Los_Angeles,
        );
        assert_eq!(extraction.error, None);
        assert_eq!(extraction.draft.duration, Some(90));
        assert_eq!(extraction.draft.project.as_deref(), Some("Apollo"));
        assert!(!extraction.draft.is_set(Field::Topic));
    }

    #[test]
    fn test_apply_reply_rejects_non_json() {
        let mut draft = Draft::new();
        draft.topic = Some("planning".to_string());

        for reply in ["", "I think the topic is planning", "[1, 2]", r#"{"fields": {}}"#] {
            let extraction = apply_reply(&draft, reply, Los_Angeles);
            assert_eq!(extraction.error.as_deref(), Some(PARSE_ERROR), "reply {reply:?}");
            assert_eq!(extraction.draft, draft);
        }
    }

    #[test]
    fn test_apply_reply_rejects_unknown_draft_keys() {
        let extraction = apply_reply(
            &Draft::new(),
            r#"{"draft": {"topic": "planning", "billable": true}}"#,
            Los_Angeles,
        );
        assert_eq!(extraction.error.as_deref(), Some(PARSE_ERROR));
        assert!(extraction.draft.is_empty());
    }

    #[test]
    fn test_apply_reply_accepts_code_fence() {
        let extraction = apply_reply(
            &Draft::new(),
            "```json\n{\"draft\": {\"location\": \"zoom\"}}\n```",
            Los_Angeles,
        );
        assert_eq!(extraction.error, None);
        assert_eq!(extraction.draft.location.as_deref(), Some("Zoom"));
    }

    #[test]
    fn test_apply_reply_cannot_blank_fields() {
        let mut draft = Draft::new();
        draft.project = Some("Apollo".to_string());

        let extraction = apply_reply(&draft, r#"{"draft": {"project": "", "duration": ""}}"#, Los_Angeles);
        assert_eq!(extraction.draft, draft);
        assert!(extraction.invalid.is_empty());
    }

    #[tokio::test]
    async fn test_extract_sends_json_request_with_draft() {
        let llm = MockLlmClient::with_texts(&[r#"{"draft": {"topic": "retro"}}"#]);
        let mut draft = Draft::new();
        draft.project = Some("Apollo".to_string());

        let extraction = extract(
            &llm,
            &PromptLoader::embedded_only(),
            &FlowSettings::default(),
            &[Message::user("it was the retro")],
            &draft,
        )
        .await
        .unwrap();

        assert_eq!(extraction.draft.topic.as_deref(), Some("retro"));
        assert_eq!(extraction.draft.project.as_deref(), Some("Apollo"));

        let request = &llm.requests()[0];
        assert_eq!(request.response_format, ResponseFormat::Json);
        assert_eq!(request.max_tokens, 1024);
        assert!(request.system_prompt.contains(r#""project": "Apollo""#));
        assert!(request.system_prompt.contains("America/Los_Angeles"));
    }
}
