//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::entry::Field;

/// timelog - log billable time by chatting
#[derive(Debug, Parser)]
#[command(
    name = "tl",
    about = "Log billable time entries through a short chat",
    version,
    after_help = "Logs are written to: ~/.local/share/timelog/logs/timelog.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive chat that logs time entries
    Chat(ChatArgs),

    /// Validate one field value offline and print the normalized result
    Parse {
        /// Field to parse (started_at, timezone, duration, location, topic, progress, project, comments)
        #[arg(value_name = "FIELD")]
        field: Field,

        /// Raw text to parse
        #[arg(value_name = "TEXT")]
        text: String,

        /// Timezone used for started_at (defaults to the configured zone)
        #[arg(short, long)]
        timezone: Option<String>,
    },
}

/// Options for the chat session
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ChatArgs {
    /// Email of the profile that owns new entries
    #[arg(short, long)]
    pub email: Option<String>,

    /// Name used to greet you
    #[arg(short, long)]
    pub name: Option<String>,

    /// Keep entries in memory instead of the remote store
    #[arg(long)]
    pub offline: bool,

    /// First message to send
    #[arg(value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("timelog")
        .join("logs")
        .join("timelog.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["tl"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_chat_args() {
        let cli = Cli::try_parse_from(["tl", "-l", "debug", "chat", "--email", "me@example.com", "--offline", "1h on zoom"])
            .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Command::Chat(args)) => {
                assert_eq!(args.email.as_deref(), Some("me@example.com"));
                assert!(args.offline);
                assert_eq!(args.message.as_deref(), Some("1h on zoom"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["tl", "parse", "started-at", "2025-01-15 09:30", "--timezone", "UTC"]).unwrap();
        match cli.command {
            Some(Command::Parse { field, text, timezone }) => {
                assert_eq!(field, Field::StartedAt);
                assert_eq!(text, "2025-01-15 09:30");
                assert_eq!(timezone.as_deref(), Some("UTC"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        assert!(Cli::try_parse_from(["tl", "parse", "billable", "yes"]).is_err());
    }
}
