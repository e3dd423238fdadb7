//! Draft time entry
//!
//! The in-progress record the dialogue fills in, plus the update shape the
//! extraction call proposes.

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use entrystore::NewTimeEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::fields::{
    DurationParts, FieldError, parse_comments, parse_duration, parse_location, parse_started_at, parse_text,
    parse_timezone, rezone_started_at,
};

/// One field of a time entry, in prompt order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    StartedAt,
    Timezone,
    Duration,
    Location,
    Topic,
    Progress,
    Project,
    Comments,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::StartedAt,
        Field::Timezone,
        Field::Duration,
        Field::Location,
        Field::Topic,
        Field::Progress,
        Field::Project,
        Field::Comments,
    ];

    /// Fields that must be set before an entry can be saved
    pub const REQUIRED: [Field; 7] = [
        Field::StartedAt,
        Field::Timezone,
        Field::Duration,
        Field::Location,
        Field::Topic,
        Field::Progress,
        Field::Project,
    ];

    /// Wire name used in prompts and JSON
    pub fn name(&self) -> &'static str {
        match self {
            Field::StartedAt => "started_at",
            Field::Timezone => "timezone",
            Field::Duration => "duration",
            Field::Location => "location",
            Field::Topic => "topic",
            Field::Progress => "progress",
            Field::Project => "project",
            Field::Comments => "comments",
        }
    }

    /// Human label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Field::StartedAt => "Start time",
            Field::Timezone => "Timezone",
            Field::Duration => "Duration",
            Field::Location => "Location",
            Field::Topic => "Topic",
            Field::Progress => "Progress",
            Field::Project => "Project",
            Field::Comments => "Comments",
        }
    }

    pub fn is_required(&self) -> bool {
        *self != Field::Comments
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Field::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
                format!("unknown field '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// A proposed value that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: Field,
    pub message: String,
}

impl FieldIssue {
    fn new(field: Field, err: FieldError) -> Self {
        Self {
            field,
            message: err.to_string(),
        }
    }
}

/// Duration as the model may send it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    /// Minutes
    Number(serde_json::Number),
    /// The user's own wording, e.g. "1h 30m"
    Text(String),
}

/// Field values proposed by one extraction call
///
/// Unknown keys are rejected so a reply with the wrong shape takes the
/// parse-error path instead of being half-applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftUpdate {
    pub started_at: Option<String>,
    pub timezone: Option<String>,
    pub duration: Option<DurationValue>,
    pub location: Option<String>,
    pub topic: Option<String>,
    pub progress: Option<String>,
    pub project: Option<String>,
    pub comments: Option<String>,
}

impl DraftUpdate {
    /// Proposed text for a field; `None` when absent, null or blank
    fn proposed(&self, field: Field) -> Option<String> {
        let raw = match field {
            Field::StartedAt => self.started_at.clone(),
            Field::Timezone => self.timezone.clone(),
            Field::Duration => self.duration.as_ref().map(|d| match d {
                DurationValue::Number(n) => n.to_string(),
                DurationValue::Text(t) => t.clone(),
            }),
            Field::Location => self.location.clone(),
            Field::Topic => self.topic.clone(),
            Field::Progress => self.progress.clone(),
            Field::Project => self.project.clone(),
            Field::Comments => self.comments.clone(),
        };
        raw.filter(|v| !v.trim().is_empty())
    }
}

/// The in-progress time entry
///
/// A field is set when it holds a non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// RFC 3339 timestamp with offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    /// IANA zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::StartedAt => self.started_at.as_deref(),
            Field::Timezone => self.timezone.as_deref(),
            Field::Duration => None,
            Field::Location => self.location.as_deref(),
            Field::Topic => self.topic.as_deref(),
            Field::Progress => self.progress.as_deref(),
            Field::Project => self.project.as_deref(),
            Field::Comments => self.comments.as_deref(),
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Duration => self.duration.is_some_and(|d| d > 0),
            other => self.text(other).is_some_and(|v| !v.is_empty()),
        }
    }

    /// Required fields still unset, in prompt order
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::REQUIRED.into_iter().filter(|f| !self.is_set(*f)).collect()
    }

    pub fn is_complete(&self) -> bool {
        Field::REQUIRED.iter().all(|f| self.is_set(*f))
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| !self.is_set(*f))
    }

    pub fn clear(&mut self) {
        debug!("Draft::clear: called");
        *self = Self::default();
    }

    /// Pretty JSON of the set fields, for prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Stored form of a field's value (minutes for duration), if set
    pub fn stored_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Duration => self.duration.map(|d| d.to_string()),
            other => self.text(other).map(str::to_string),
        }
    }

    /// Display form of a field's value, if set
    pub fn display_value(&self, field: Field) -> Option<String> {
        if !self.is_set(field) {
            return None;
        }
        match field {
            Field::Duration => self.duration.map(|d| DurationParts::from_minutes(d).to_string()),
            other => self.text(other).map(str::to_string),
        }
    }

    /// Merge model-proposed values into the draft
    ///
    /// Blank or absent values are ignored. Each value goes through its field
    /// parser; failures are returned as issues and leave the field untouched.
    /// The timezone is applied first so a start time in the same update is
    /// read in the new zone.
    pub fn merge(&mut self, update: &DraftUpdate, default_tz: Tz) -> Vec<FieldIssue> {
        debug!(?update, "Draft::merge: called");
        let mut issues = Vec::new();

        const ORDER: [Field; 8] = [
            Field::Timezone,
            Field::StartedAt,
            Field::Duration,
            Field::Location,
            Field::Topic,
            Field::Progress,
            Field::Project,
            Field::Comments,
        ];

        for field in ORDER {
            let Some(raw) = update.proposed(field) else {
                continue;
            };
            if let Err(err) = self.apply(field, &raw, default_tz) {
                debug!(%field, %raw, %err, "Draft::merge: rejected value");
                issues.push(FieldIssue::new(field, err));
            }
        }

        issues
    }

    /// Parse `raw` with the field's parser and store the normalized value
    pub fn apply(&mut self, field: Field, raw: &str, default_tz: Tz) -> Result<(), FieldError> {
        match field {
            Field::Timezone => {
                let tz = parse_timezone(raw, default_tz)?;
                // a start time given earlier keeps its wall-clock time in the new zone
                if let Some(stored) = self.started_at.as_deref()
                    && let Some(moved) = rezone_started_at(stored, tz)?
                {
                    self.started_at = Some(moved.fixed_offset().to_rfc3339());
                }
                self.timezone = Some(tz.name().to_string());
            }
            Field::StartedAt => {
                let tz = self.zone(default_tz);
                let started = parse_started_at(raw, tz)?;
                self.started_at = Some(started.fixed_offset().to_rfc3339());
            }
            Field::Duration => {
                self.duration = Some(parse_duration(raw)?.total_minutes());
            }
            Field::Location => {
                self.location = Some(parse_location(raw)?);
            }
            Field::Topic => self.topic = Some(parse_text(field.label(), raw)?),
            Field::Progress => self.progress = Some(parse_text(field.label(), raw)?),
            Field::Project => self.project = Some(parse_text(field.label(), raw)?),
            Field::Comments => {
                // "no comments" leaves any earlier comment in place
                if let Some(comments) = parse_comments(raw) {
                    self.comments = Some(comments);
                }
            }
        }
        Ok(())
    }

    /// The draft's zone, or the default when unset or unparseable
    fn zone(&self, default_tz: Tz) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(default_tz)
    }

    /// Build the insert payload, or `None` while required fields are missing
    pub fn to_entry(&self, id: Uuid, user_id: Option<&str>) -> Option<NewTimeEntry> {
        debug!(%id, ?user_id, "Draft::to_entry: called");
        if !self.is_complete() {
            return None;
        }
        Some(NewTimeEntry {
            id,
            started_at: self.started_at.clone()?,
            timezone: self.timezone.clone()?,
            duration: self.duration?,
            location: self.location.clone()?,
            topic: self.topic.clone()?,
            progress: self.progress.clone()?,
            project: self.project.clone()?,
            user_id: user_id.map(str::to_string),
            comments: self.comments.clone().filter(|c| !c.is_empty()),
        })
    }
}

impl From<&NewTimeEntry> for Draft {
    fn from(entry: &NewTimeEntry) -> Self {
        Self {
            started_at: Some(entry.started_at.clone()),
            timezone: Some(entry.timezone.clone()),
            duration: Some(entry.duration),
            location: Some(entry.location.clone()),
            topic: Some(entry.topic.clone()),
            progress: Some(entry.progress.clone()),
            project: Some(entry.project.clone()),
            comments: entry.comments.clone(),
        }
    }
}
