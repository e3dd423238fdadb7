//! Time entry dialogue
//!
//! Each user message drives one [`TimeEntryFlow::advance`] (extract fields or
//! handle a yes/no) followed by one [`TimeEntryFlow::respond`] (stream the
//! next assistant message). The flow itself is stateless: the caller owns the
//! [`Session`] and passes it in on every turn.

mod compose;
mod confirm;
mod extract;

pub use confirm::{Reply, classify};
pub use extract::{Extraction, ExtractionReply, apply_reply};

use std::sync::Arc;

use chrono_tz::Tz;
use entrystore::{EntryStore, NewTimeEntry};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::FlowConfig;
use crate::entry::{Draft, Field, FieldIssue};
use crate::llm::{LlmClient, LlmError, Message, Role};
use crate::prompts::PromptLoader;

/// Error tag reported when the extraction reply is not valid JSON
pub const PARSE_ERROR: &str = "parse";

/// Errors that stop a turn
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("No user message to respond to")]
    NoUserMessage,
}

/// Where the dialogue is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Fresh session, or an entry was just saved
    #[default]
    Idle,
    /// Some required field is missing
    Collecting,
    /// All required fields set, waiting for yes or no
    Confirming,
}

/// Per-chat state carried between turns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub state: DialogueState,
    pub draft: Draft,
    /// Insert payload, present only while confirming
    pub pending: Option<NewTimeEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of a turn, as shown to the reply prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Collect,
    Confirm,
    Saved,
    Rejected,
    Error,
}

/// Turn status passed to the composer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub state: StatusState,
    pub error: Option<String>,
    pub invalid: Vec<FieldIssue>,
}

impl Status {
    pub fn new(state: StatusState) -> Self {
        Self {
            state,
            error: None,
            invalid: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Result of [`TimeEntryFlow::advance`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Session to carry into the next turn
    pub session: Session,
    pub status: Status,
    /// Draft the reply should describe (the saved values after a save)
    pub draft: Draft,
    /// Required fields still missing from `draft`
    pub missing: Vec<Field>,
}

/// Tunables for the dialogue
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub default_tz: Tz,
    pub extract_max_tokens: u32,
    pub respond_max_tokens: u32,
}

impl FlowSettings {
    pub fn from_config(config: &FlowConfig) -> eyre::Result<Self> {
        Ok(Self {
            default_tz: config.default_tz()?,
            extract_max_tokens: config.extract_max_tokens,
            respond_max_tokens: config.respond_max_tokens,
        })
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            default_tz: chrono_tz::America::Los_Angeles,
            extract_max_tokens: 1024,
            respond_max_tokens: 512,
        }
    }
}

/// Session after extraction produced `draft`
///
/// A complete draft moves to `Confirming` with a fresh pending entry;
/// anything else keeps collecting.
pub fn collect_transition(draft: Draft, profile_id: Option<&str>) -> Session {
    match draft.to_entry(Uuid::now_v7(), profile_id) {
        Some(pending) => {
            debug!(id = %pending.id, "collect_transition: draft complete, confirming");
            Session {
                state: DialogueState::Confirming,
                draft,
                pending: Some(pending),
            }
        }
        None => Session {
            state: DialogueState::Collecting,
            draft,
            pending: None,
        },
    }
}

/// Drives the slot-filling dialogue
pub struct TimeEntryFlow {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn EntryStore>,
    prompts: PromptLoader,
    settings: FlowSettings,
}

impl TimeEntryFlow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn EntryStore>,
        prompts: PromptLoader,
        settings: FlowSettings,
    ) -> Self {
        debug!(default_tz = %settings.default_tz.name(), "TimeEntryFlow::new: called");
        Self {
            llm,
            store,
            prompts,
            settings,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Apply the latest user message to the session
    ///
    /// While confirming, the message is read as yes/no and never sent to the
    /// model. Otherwise the model extracts field updates from the transcript.
    pub async fn advance(
        &self,
        session: &Session,
        transcript: &[Message],
        profile_id: Option<&str>,
    ) -> Result<Turn, FlowError> {
        debug!(state = ?session.state, messages = transcript.len(), "advance: called");
        let latest = latest_user_message(transcript).ok_or(FlowError::NoUserMessage)?;

        if session.state == DialogueState::Confirming {
            return Ok(confirm::handle(self.store.as_ref(), session, latest).await);
        }

        let extraction = extract::extract(
            self.llm.as_ref(),
            &self.prompts,
            &self.settings,
            transcript,
            &session.draft,
        )
        .await?;

        let next = collect_transition(extraction.draft, profile_id);
        let missing = next.draft.missing_fields();
        info!(state = ?next.state, missing = missing.len(), "Extraction applied");

        Ok(Turn {
            draft: next.draft.clone(),
            session: next,
            status: Status {
                state: StatusState::Collect,
                error: extraction.error,
                invalid: extraction.invalid,
            },
            missing,
        })
    }

    /// Stream the next assistant message for `turn`
    ///
    /// Text fragments go to `fragment_tx` as they arrive; the full reply is
    /// returned for the transcript.
    pub async fn respond(
        &self,
        transcript: &[Message],
        turn: &Turn,
        fragment_tx: mpsc::Sender<String>,
    ) -> Result<String, FlowError> {
        debug!(status = ?turn.status.state, "respond: called");
        compose::compose(
            self.llm.as_ref(),
            &self.prompts,
            self.settings.respond_max_tokens,
            transcript,
            turn,
            fragment_tx,
        )
        .await
    }
}

fn latest_user_message(transcript: &[Message]) -> Option<&str> {
    transcript
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}
