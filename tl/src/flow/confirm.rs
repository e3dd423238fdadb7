//! Yes/no handling while an entry awaits confirmation

use entrystore::{EntryStore, StoreError};
use tracing::{debug, info, warn};

use super::{DialogueState, Session, Status, StatusState, Turn};
use crate::entry::Draft;

const AFFIRMATIVE: &[&str] = &["yes", "y", "sure", "confirm", "ok", "okay"];
const NEGATIVE: &[&str] = &["no", "n", "nope", "nah", "cancel"];

/// How a reply to "save this entry?" reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    Other,
}

/// Classify a reply by exact (trimmed, case-insensitive) match
pub fn classify(text: &str) -> Reply {
    let normalized = text.trim().to_lowercase();
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        Reply::Affirmative
    } else if NEGATIVE.contains(&normalized.as_str()) {
        Reply::Negative
    } else {
        Reply::Other
    }
}

pub(super) async fn handle(store: &dyn EntryStore, session: &Session, text: &str) -> Turn {
    let reply = classify(text);
    debug!(?reply, "handle: called");

    let Some(pending) = &session.pending else {
        warn!("handle: confirming without a pending entry, collecting again");
        let next = Session {
            state: DialogueState::Collecting,
            draft: session.draft.clone(),
            pending: None,
        };
        return Turn {
            missing: next.draft.missing_fields(),
            draft: next.draft.clone(),
            session: next,
            status: Status::new(StatusState::Collect),
        };
    };

    match reply {
        Reply::Affirmative => {
            match store.insert(pending).await {
                Ok(()) => {}
                Err(StoreError::Duplicate(id)) => {
                    // an earlier attempt reported failure but the row landed
                    info!(%id, "handle: entry already stored");
                }
                Err(e) => {
                    warn!(id = %pending.id, error = %e, retryable = e.is_retryable(), "Failed to save time entry");
                    return Turn {
                        session: session.clone(),
                        status: Status::new(StatusState::Error).with_error(e.to_string()),
                        draft: session.draft.clone(),
                        missing: Vec::new(),
                    };
                }
            }
            info!(id = %pending.id, "Saved time entry");
            Turn {
                session: Session::new(),
                status: Status::new(StatusState::Saved),
                draft: Draft::from(pending),
                missing: Vec::new(),
            }
        }
        Reply::Negative => {
            info!(id = %pending.id, "Entry not confirmed, back to editing");
            let next = Session {
                state: DialogueState::Collecting,
                draft: session.draft.clone(),
                pending: None,
            };
            Turn {
                missing: next.draft.missing_fields(),
                draft: next.draft.clone(),
                session: next,
                status: Status::new(StatusState::Rejected),
            }
        }
        Reply::Other => Turn {
            session: session.clone(),
            status: Status::new(StatusState::Confirm),
            draft: session.draft.clone(),
            missing: Vec::new(),
        },
    }
}
