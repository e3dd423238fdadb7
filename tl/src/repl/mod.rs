//! Interactive chat for logging time
//!
//! Reads one line at a time, runs it through the dialogue and streams the
//! assistant's reply back to the terminal.

mod session;

pub use session::ReplSession;

use std::sync::Arc;

use colored::Colorize;
use entrystore::{EntryStore, MemoryStore, RestStore};
use eyre::{Context, Result};
use tracing::{info, warn};

use crate::cli::ChatArgs;
use crate::config::Config;
use crate::flow::{FlowSettings, TimeEntryFlow};
use crate::llm::create_client;
use crate::prompts::PromptLoader;

/// Run the interactive REPL
///
/// This is the main entry point for `tl chat`.
pub async fn run_interactive(config: &Config, args: ChatArgs) -> Result<()> {
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let store: Arc<dyn EntryStore> = if args.offline {
        info!("Using in-memory entry store");
        Arc::new(MemoryStore::new())
    } else {
        let rest_config = config.store.rest_config()?;
        Arc::new(RestStore::new(rest_config).context("Failed to create entry store")?)
    };

    let email = args.email.or_else(|| config.profile.email.clone());
    let name = args.name.or_else(|| config.profile.name.clone());
    let profile_id = match email {
        Some(email) => resolve_profile(store.as_ref(), &email).await,
        None => None,
    };

    let prompts = PromptLoader::new(std::env::current_dir()?);
    let settings = FlowSettings::from_config(&config.flow)?;
    let flow = TimeEntryFlow::new(llm, store.clone(), prompts, settings);

    let mut session = ReplSession::new(flow, store, profile_id, name);
    session.run(args.message).await
}

/// Look up the profile for `email`, warning instead of failing
async fn resolve_profile(store: &dyn EntryStore, email: &str) -> Option<String> {
    match store.get_or_create_profile(email).await {
        Ok(profile) => {
            info!(id = %profile.id, "Using profile");
            Some(profile.id)
        }
        Err(e) => {
            warn!(%email, error = %e, "Failed to load profile");
            eprintln!(
                "{} could not load profile for {}: {}. Entries will be saved without an owner.",
                "Warning:".yellow(),
                email,
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_profile_creates_once() {
        let store = MemoryStore::new();

        let first = resolve_profile(&store, "me@example.com").await;
        let second = resolve_profile(&store, "me@example.com").await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(store.profiles().len(), 1);
    }
}
