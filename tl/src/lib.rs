//! timelog - conversational billable time entry logger
//!
//! A user describes work in free text; a language model pulls out the fields
//! of a time entry, asks for whatever is still missing, and once the entry is
//! complete asks for a yes/no before writing it to the entry store.
//!
//! # Modules
//!
//! - [`entry`] - the draft record, field names and field parsers
//! - [`flow`] - the dialogue: extraction, confirmation and reply streaming
//! - [`llm`] - LLM client trait with OpenAI and Anthropic implementations
//! - [`prompts`] - Handlebars prompt templates
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`repl`] - interactive chat

pub mod cli;
pub mod config;
pub mod entry;
pub mod flow;
pub mod llm;
pub mod prompts;
pub mod repl;

pub use config::Config;
pub use entry::{Draft, Field};
pub use flow::{DialogueState, Session, TimeEntryFlow, Turn};
