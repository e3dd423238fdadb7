//! Row types written to and read from the store

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fully formed time entry ready to insert
///
/// Mirrors the `time_entries` table. Optional columns are omitted from the
/// JSON body when unset so the table defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    /// Client-generated primary key
    pub id: Uuid,

    /// Start of the work as an RFC 3339 timestamp with offset
    pub started_at: String,

    /// IANA timezone the entry was logged in
    pub timezone: String,

    /// Length of the work in minutes
    pub duration: u32,

    pub location: String,
    pub topic: String,
    pub progress: String,
    pub project: String,

    /// Owning profile, when the user is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// A user profile row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
}
