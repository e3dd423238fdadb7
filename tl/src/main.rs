//! timelog - conversational billable time entry logger
//!
//! CLI entry point.

use std::fs;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use timelog::cli::{ChatArgs, Cli, Command, get_log_path};
use timelog::config::Config;
use timelog::entry::{Draft, Field};
use timelog::repl;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!(?level, "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // A read-only data dir should not stop time logging
    if let Err(e) = setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("timelog loaded config: default={}", config.llm.default);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat(args)) => cmd_chat(&config, args).await,
        Some(Command::Parse { field, text, timezone }) => cmd_parse(&config, field, &text, timezone.as_deref()),
        None => cmd_chat(&config, ChatArgs::default()).await,
    }
}

/// Start the interactive chat
async fn cmd_chat(config: &Config, args: ChatArgs) -> Result<()> {
    debug!(offline = args.offline, "cmd_chat: called");
    repl::run_interactive(config, args).await
}

/// Run one field parser and print the stored form of the value
fn cmd_parse(config: &Config, field: Field, text: &str, timezone: Option<&str>) -> Result<()> {
    debug!(%field, %text, ?timezone, "cmd_parse: called");
    let default_tz = config.flow.default_tz()?;

    let mut draft = Draft::new();
    if let Some(zone) = timezone {
        draft.apply(Field::Timezone, zone, default_tz)?;
    }
    draft.apply(field, text, default_tz)?;

    match draft.stored_value(field) {
        Some(value) => println!("{}", value),
        None => println!("(none)"),
    }
    Ok(())
}
