//! timelog configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use entrystore::RestStoreConfig;
use tracing::debug;

/// Zone used when the user does not name one
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Main timelog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Entry store connection
    pub store: StoreConfig,

    /// Dialogue settings
    pub flow: FlowConfig,

    /// Who is logging time
    pub profile: ProfileConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// API keys and store credentials are checked when the clients are built,
    /// so offline commands work without them.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        self.llm.resolve()?;
        self.flow.default_tz()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        #[derive(Deserialize)]
        struct LogLevelOnly {
            #[serde(rename = "log-level")]
            log_level: Option<String>,
        }

        let path = match config_path {
            Some(p) => p.clone(),
            None => Self::search_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<LogLevelOnly>(&content).ok()?.log_level
    }

    /// Project-local `.timelog.yml`, then `~/.config/timelog/timelog.yml`
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".timelog.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("timelog").join("timelog.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Default model as `provider/model`
    pub default: String,

    /// Per-provider connection settings
    pub providers: HashMap<String, ProviderConfig>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let providers = ["openai", "anthropic"]
            .into_iter()
            .filter_map(|name| ProviderConfig::builtin(name).map(|p| (name.to_string(), p)))
            .collect();

        Self {
            default: "openai/gpt-4o-mini".to_string(),
            providers,
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// Split `default` into provider and model and attach the provider settings
    ///
    /// A provider missing from `providers` falls back to its built-in settings.
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        debug!(default = %self.default, "LlmConfig::resolve: called");
        let (provider, model) = self
            .default
            .split_once('/')
            .filter(|(p, m)| !p.is_empty() && !m.is_empty())
            .ok_or_else(|| {
                eyre::eyre!(
                    "Invalid llm.default '{}': expected 'provider/model', e.g. 'openai/gpt-4o-mini'",
                    self.default
                )
            })?;

        let settings = self
            .providers
            .get(provider)
            .cloned()
            .or_else(|| ProviderConfig::builtin(provider))
            .ok_or_else(|| eyre::eyre!("No settings for LLM provider '{}'", provider))?;

        Ok(ResolvedLlmConfig {
            provider: provider.to_string(),
            model: model.to_string(),
            api_key_env: settings.api_key_env,
            api_key_file: settings.api_key_file,
            base_url: settings.base_url,
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// Connection settings for one LLM provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// File holding the API key, used when the variable is unset
    #[serde(rename = "api-key-file", default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl ProviderConfig {
    /// Built-in settings for the supported providers
    pub fn builtin(provider: &str) -> Option<Self> {
        let (env, url) = match provider {
            "openai" => ("OPENAI_API_KEY", "https://api.openai.com"),
            "anthropic" => ("ANTHROPIC_API_KEY", "https://api.anthropic.com"),
            _ => return None,
        };
        Some(Self {
            api_key_env: env.to_string(),
            api_key_file: None,
            base_url: url.to_string(),
        })
    }
}

/// Fully resolved provider, model and connection settings
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub api_key_file: Option<String>,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl ResolvedLlmConfig {
    /// Read the API key from the environment, then from the key file
    pub fn get_api_key(&self) -> Result<String> {
        debug!(env = %self.api_key_env, "ResolvedLlmConfig::get_api_key: called");
        if let Ok(key) = std::env::var(&self.api_key_env)
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_string());
        }

        if let Some(file) = &self.api_key_file {
            let path = expand_home(file);
            let key = fs::read_to_string(&path).context(format!("Failed to read API key file {}", path.display()))?;
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        Err(eyre::eyre!(
            "{} API key not found. Set the {} environment variable.",
            self.provider,
            self.api_key_env
        ))
    }
}

/// Entry store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Environment variable holding the project URL
    #[serde(rename = "url-env")]
    pub url_env: String,

    /// Environment variable holding the API key
    #[serde(rename = "key-env")]
    pub key_env: String,

    #[serde(rename = "entries-table")]
    pub entries_table: String,

    #[serde(rename = "profiles-table")]
    pub profiles_table: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url_env: "SUPABASE_URL".to_string(),
            key_env: "SUPABASE_KEY".to_string(),
            entries_table: entrystore::DEFAULT_ENTRIES_TABLE.to_string(),
            profiles_table: entrystore::DEFAULT_PROFILES_TABLE.to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl StoreConfig {
    /// Build REST store settings from the configured environment variables
    pub fn rest_config(&self) -> Result<RestStoreConfig> {
        debug!(url_env = %self.url_env, key_env = %self.key_env, "StoreConfig::rest_config: called");
        let url = read_env(&self.url_env)?;
        let key = read_env(&self.key_env)?;

        let mut config = RestStoreConfig::new(url, key);
        config.entries_table = self.entries_table.clone();
        config.profiles_table = self.profiles_table.clone();
        config.timeout = Duration::from_millis(self.timeout_ms);
        Ok(config)
    }
}

/// Dialogue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// IANA zone used for "default" and the Pacific aliases
    #[serde(rename = "default-timezone")]
    pub default_timezone: String,

    /// Token cap for the extraction call
    #[serde(rename = "extract-max-tokens")]
    pub extract_max_tokens: u32,

    /// Token cap for the reply call
    #[serde(rename = "respond-max-tokens")]
    pub respond_max_tokens: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            extract_max_tokens: 1024,
            respond_max_tokens: 512,
        }
    }
}

impl FlowConfig {
    /// The configured default zone
    pub fn default_tz(&self) -> Result<Tz> {
        self.default_timezone
            .parse::<Tz>()
            .map_err(|_| eyre::eyre!("Invalid flow.default-timezone '{}'", self.default_timezone))
    }
}

/// The user logging time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub email: Option<String>,
    pub name: Option<String>,
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(eyre::eyre!("Store not configured. Set the {} environment variable.", name)),
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
