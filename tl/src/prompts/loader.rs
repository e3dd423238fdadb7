//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the `extract` template
#[derive(Debug, Clone, Serialize)]
pub struct ExtractContext {
    /// Current draft as pretty JSON
    pub draft_json: String,
    /// Current local time in the default zone, for relative dates
    pub now: String,
    /// Name of the configured default zone
    pub default_timezone: String,
}

/// Context for the `respond` template
#[derive(Debug, Clone, Serialize)]
pub struct RespondContext {
    /// Draft the reply should describe, as pretty JSON
    pub draft_json: String,
    /// Wire names of the required fields still missing
    pub missing: Vec<&'static str>,
    /// Turn status, for conditionals in the template
    pub status: serde_json::Value,
    /// Turn status as pretty JSON
    pub status_json: String,
}

impl RespondContext {
    pub fn new(draft_json: String, missing: Vec<&'static str>, status: &impl Serialize) -> Result<Self> {
        let status = serde_json::to_value(status)?;
        let status_json = serde_json::to_string_pretty(&status)?;
        Ok(Self {
            draft_json,
            missing,
            status,
            status_json,
        })
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.timelog/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `base`
    ///
    /// Looks for `.timelog/prompts/` and `prompts/` under `base`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        debug!(?base, "PromptLoader::new: called");
        let user_dir = base.join(".timelog/prompts");
        let repo_dir = base.join("prompts");

        let user_dir_exists = user_dir.exists();
        let repo_dir_exists = repo_dir.exists();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
            repo_dir: if repo_dir_exists { Some(repo_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    /// Prompts are plain text, so nothing is HTML-escaped
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.timelog/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found");
        }

        // Fall back to embedded
        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &impl Serialize) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
