//! REPL session management

use std::io::{self, Write};
use std::sync::Arc;

use chrono::DateTime;
use colored::Colorize;
use entrystore::{EntryStore, NewTimeEntry};
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::entry::{DurationParts, Field};
use crate::flow::{DialogueState, FlowError, Session, TimeEntryFlow};
use crate::llm::{LlmError, Message, Role};

/// Interactive time logging session
pub struct ReplSession {
    flow: TimeEntryFlow,
    store: Arc<dyn EntryStore>,
    session: Session,
    transcript: Vec<Message>,
    profile_id: Option<String>,
    name: Option<String>,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(
        flow: TimeEntryFlow,
        store: Arc<dyn EntryStore>,
        profile_id: Option<String>,
        name: Option<String>,
    ) -> Self {
        debug!(?profile_id, "ReplSession::new: called");
        Self {
            flow,
            store,
            session: Session::new(),
            transcript: Vec::new(),
            profile_id,
            name,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_message: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(message) = initial_message {
            println!("{} {}", ">".bright_green(), message);
            self.process_user_input(&message).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "timelog".bright_cyan().bold());
        match &self.name {
            Some(name) => println!("Hi {}! Tell me about the time you want to log.", name),
            None => println!("Tell me about the time you want to log."),
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/draft" | "/d" => {
                self.print_draft();
                SlashResult::Continue
            }
            "/reset" | "/r" => {
                self.session = Session::new();
                self.transcript.clear();
                println!("{}", "Draft and conversation cleared.".dimmed());
                SlashResult::Continue
            }
            "/entries" | "/e" => {
                self.print_entries().await;
                SlashResult::Continue
            }
            "/history" => {
                self.print_history();
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit timelog", "/quit".yellow());
        println!("  {:14} Show the entry so far", "/draft".yellow());
        println!("  {:14} Discard the draft and start over", "/reset".yellow());
        println!("  {:14} List your saved time entries", "/entries".yellow());
        println!("  {:14} Show conversation history", "/history".yellow());
        println!();
        println!("{}", "While confirming:".bright_cyan());
        println!("  {:14} Save the entry", "yes".yellow());
        println!("  {:14} Keep editing", "no".yellow());
        println!();
    }

    fn print_draft(&self) {
        println!();
        println!("{} {}", "Draft".bright_cyan(), format!("({})", state_label(self.session.state)).dimmed());
        for field in Field::ALL {
            let value = match self.session.draft.display_value(field) {
                Some(value) => value.normal(),
                None if field.is_required() => "missing".red(),
                None => "-".dimmed(),
            };
            println!("  {:12} {}", field.label(), value);
        }
        println!();
    }

    async fn print_entries(&self) {
        let Some(profile_id) = self.profile_id.as_deref() else {
            println!("{}", "Start timelog with --email to see your entries.".dimmed());
            return;
        };

        let entries = match self.store.list_entries(profile_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to fetch entries");
                eprintln!("{} failed to fetch entries: {}", "Error:".red(), e);
                return;
            }
        };

        if entries.is_empty() {
            println!("{}", "No entries yet.".dimmed());
            return;
        }

        println!();
        println!("{}", "Your time entries:".bright_cyan());
        println!(
            "  {}",
            format!(
                "{:16}  {:8}  {:10}  {:16}  {:12}  {}",
                "Start", "Duration", "Location", "Topic", "Progress", "Comments"
            )
            .dimmed()
        );
        for entry in &entries {
            println!("  {}", entry_row(entry));
        }
        println!();
    }

    fn print_history(&self) {
        if self.transcript.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for (i, msg) in self.transcript.iter().enumerate() {
            let role = match msg.role {
                Role::User => "You".bright_green(),
                Role::Assistant => "Assistant".bright_blue(),
            };
            let preview: String = msg.content.chars().take(60).collect();
            let preview = if msg.content.chars().count() > 60 {
                format!("{}...", preview)
            } else {
                preview
            };
            println!("  {}. {}: {}", i + 1, role, preview);
        }
        println!();
    }

    /// Run one turn: advance the dialogue, then stream the reply
    ///
    /// A failed turn leaves the session and transcript as they were.
    async fn process_user_input(&mut self, input: &str) {
        self.transcript.push(Message::user(input));

        let turn = match self
            .flow
            .advance(&self.session, &self.transcript, self.profile_id.as_deref())
            .await
        {
            Ok(turn) => turn,
            Err(e) => {
                self.transcript.pop();
                print_error(&e);
                return;
            }
        };
        self.session = turn.session.clone();

        let (tx, mut rx) = mpsc::channel::<String>(100);
        let print_handle = tokio::spawn(async move {
            while let Some(fragment) = rx.recv().await {
                print!("{}", fragment);
                let _ = io::stdout().flush();
            }
        });

        let reply = self.flow.respond(&self.transcript, &turn, tx).await;
        let _ = print_handle.await;
        println!();

        match reply {
            Ok(reply) => self.transcript.push(Message::assistant(reply)),
            Err(e) => print_error(&e),
        }
        println!();
    }
}

/// One `/entries` table row
fn entry_row(entry: &NewTimeEntry) -> String {
    let start = DateTime::parse_from_rfc3339(&entry.started_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| entry.started_at.clone());
    format!(
        "{:16}  {:8}  {:10}  {:16}  {:12}  {}",
        start,
        DurationParts::from_minutes(entry.duration).to_string(),
        entry.location,
        entry.topic,
        entry.progress,
        entry.comments.as_deref().unwrap_or("")
    )
}

fn state_label(state: DialogueState) -> &'static str {
    match state {
        DialogueState::Idle => "new",
        DialogueState::Collecting => "collecting",
        DialogueState::Confirming => "waiting for yes or no",
    }
}

fn print_error(error: &FlowError) {
    warn!(error = %error, "Turn failed");
    match error {
        FlowError::Llm(e) if e.is_rate_limit() => {
            let wait = e.retry_after().map(|d| d.as_secs()).unwrap_or(0);
            eprintln!("{} rate limited, try again in {}s", "Error:".red(), wait);
        }
        FlowError::Llm(LlmError::Config(message)) => {
            eprintln!("{} {}", "Configuration error:".red(), message);
        }
        other => eprintln!("{} {}", "Error:".red(), other),
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}
