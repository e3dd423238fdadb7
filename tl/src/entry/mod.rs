//! Time entry fields
//!
//! Field parsers and the draft the dialogue fills in.

mod draft;
pub mod fields;

pub use draft::{Draft, DraftUpdate, DurationValue, Field, FieldIssue};
pub use fields::{DurationParts, FieldError};
