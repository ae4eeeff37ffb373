//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop for db-console.

use crate::cli::command_menu::{self, MenuResult};
use crate::cli::commands::{self, format_error, Command, CommandType};
use crate::cli::export::{resolve_export_path, write_export};
use crate::cli::output::{format_profiles, format_result};
use crate::cli::prompt::TerminalCredentials;
use crate::config::{ConnectionProfile, ProfileStore, Settings};
use crate::database::{execute, introspect, render, Dialect, QueryResult, Session};
use crate::error::{DbConsoleError, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use tracing::{debug, warn};

const COMMANDS: &[&str] = &[
    "/profiles",
    "/use",
    "/new",
    "/edit",
    "/connect",
    "/disconnect",
    "/reconnect",
    "/schema",
    "/limit",
    "/export",
    "/help",
    "/quit",
    "/exit",
];

/// db-console command completer
struct DbConsoleHelper;

impl Completer for DbConsoleHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        if line.starts_with('/') {
            let matches: Vec<String> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|s| s.to_string())
                .collect();
            Ok((0, matches))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Hinter for DbConsoleHelper {
    type Hint = String;
}

impl Highlighter for DbConsoleHelper {}

impl Validator for DbConsoleHelper {}

impl Helper for DbConsoleHelper {}

/// Outcome of reading one line
enum Input {
    Line(String),
    Cancelled,
    Eof,
}

/// db-console REPL
pub struct Repl {
    /// The rustyline editor
    editor: Editor<DbConsoleHelper, DefaultHistory>,
    /// Whether the REPL should continue running
    running: bool,
    /// The database session
    session: Session,
    /// Stored connection profiles
    store: ProfileStore,
    /// Application settings
    settings: Settings,
    /// Last `Rows` result, kept for `/export`
    last_result: Option<QueryResult>,
    /// Where the line history lives
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(session: Session, store: ProfileStore, settings: Settings) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();

        let mut editor = Editor::<DbConsoleHelper, DefaultHistory>::with_config(config)
            .map_err(|e| {
                DbConsoleError::Io(std::io::Error::other(format!(
                    "Failed to initialize editor: {}",
                    e
                )))
            })?;

        editor.set_helper(Some(DbConsoleHelper));

        let history_path = dirs::home_dir()
            .map(|p| p.join(".db-console").join("history"))
            .unwrap_or_else(|| ".db-console-history".into());

        if let Err(e) = editor.load_history(&history_path) {
            debug!(error = %e, "no history loaded");
        }

        Ok(Self {
            editor,
            running: true,
            session,
            store,
            settings,
            last_result: None,
            history_path,
        })
    }

    /// Run the REPL loop, then tear the session down
    pub async fn run(mut self) -> Result<()> {
        self.print_welcome();

        let outcome = self.run_loop().await;

        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            debug!(error = %e, "could not save history");
        }

        let Repl { session, .. } = self;
        session.close().await;

        outcome
    }

    async fn run_loop(&mut self) -> Result<()> {
        while self.running {
            let prompt = self.prompt();
            let line = match self.read_line(&prompt, "")? {
                Input::Line(line) => line,
                Input::Cancelled => {
                    println!("^C");
                    continue;
                }
                Input::Eof => {
                    println!();
                    break;
                }
            };

            // A lone "/" opens the command menu
            if line == "/" {
                let input = match command_menu::show_command_menu() {
                    Ok(MenuResult::Command(cmd)) => {
                        let initial = if command_menu::needs_argument(&cmd) {
                            format!("{} ", cmd)
                        } else {
                            cmd
                        };
                        self.read_line(&prompt, &initial)?
                    }
                    Ok(MenuResult::TextInput) => self.read_line(&prompt, "/")?,
                    Ok(MenuResult::Cancelled) => {
                        println!();
                        continue;
                    }
                    Err(e) => {
                        println!("Error showing menu: {}", e);
                        continue;
                    }
                };

                match input {
                    Input::Line(line) => self.dispatch(&line).await,
                    Input::Cancelled => println!("^C"),
                    Input::Eof => {
                        println!();
                        break;
                    }
                }
                continue;
            }

            self.dispatch(&line).await;
        }

        Ok(())
    }

    /// Read one trimmed, non-empty line
    fn read_line(&mut self, prompt: &str, initial: &str) -> Result<Input> {
        loop {
            match self.editor.readline_with_initial(prompt, (initial, "")) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        if initial.is_empty() {
                            continue;
                        }
                        return Ok(Input::Cancelled);
                    }
                    return Ok(Input::Line(line.to_string()));
                }
                Err(ReadlineError::Interrupted) => return Ok(Input::Cancelled),
                Err(ReadlineError::Eof) => return Ok(Input::Eof),
                Err(err) => {
                    return Err(DbConsoleError::Io(std::io::Error::other(err.to_string())));
                }
            }
        }
    }

    async fn dispatch(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
        match Command::parse(line) {
            Ok(command) => {
                if let Err(e) = self.handle_command(command).await {
                    println!("{}", format_error(&e));
                }
            }
            Err(e) => println!("{}", format_error(&e)),
        }
    }

    fn prompt(&self) -> String {
        match self.session.profile() {
            Some(profile) if self.session.is_connected() => format!("{}> ", profile.database),
            _ => "> ".to_string(),
        }
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!(" ██████╗ ██████╗        ██████╗ ██████╗ ███╗   ██╗███████╗ ██████╗ ██╗     ███████╗");
        println!(" ██╔══██╗██╔══██╗      ██╔════╝██╔═══██╗████╗  ██║██╔════╝██╔═══██╗██║     ██╔════╝");
        println!(" ██║  ██║██████╔╝█████╗██║     ██║   ██║██╔██╗ ██║███████╗██║   ██║██║     █████╗  ");
        println!(" ██║  ██║██╔══██╗╚════╝██║     ██║   ██║██║╚██╗██║╚════██║██║   ██║██║     ██╔══╝  ");
        println!(" ██████╔╝██████╔╝      ╚██████╗╚██████╔╝██║ ╚████║███████║╚██████╔╝███████╗███████╗");
        println!(" ╚═════╝ ╚═════╝        ╚═════╝ ╚═════╝ ╚═╝  ╚═══╝╚══════╝ ╚═════╝ ╚══════╝╚══════╝");
        println!();
        println!("Interactive Database Console v{}", env!("CARGO_PKG_VERSION"));
        println!();
        if self.store.is_empty() {
            println!("No profiles stored yet. Use /new to register one.");
        } else {
            println!("{}", format_profiles(&self.store, self.session.profile_index()));
            println!("Use /use <n> to connect.");
        }
        println!("Type / for available commands, or /help for more information.");
        println!();
    }

    /// Handle a command
    async fn handle_command(&mut self, command: Command) -> Result<()> {
        match command.command_type {
            CommandType::Profiles => {
                println!("{}", format_profiles(&self.store, self.session.profile_index()));
            }
            CommandType::Use { index } => {
                self.session.select_profile(&self.store, index)?;
                self.connect_interactive().await;
            }
            CommandType::New => {
                let Some(profile) = self.prompt_profile(None)? else {
                    println!("Cancelled.");
                    return Ok(());
                };
                let index = self.session.register_profile(&mut self.store, profile)?;
                println!("Saved profile #{}.", index);
                self.connect_interactive().await;
            }
            CommandType::Edit => {
                let current = self.session.profile().cloned().ok_or(
                    DbConsoleError::InvalidState {
                        operation: "edit the profile",
                        state: self.session.state(),
                    },
                )?;
                let Some(profile) = self.prompt_profile(Some(&current))? else {
                    println!("Cancelled.");
                    return Ok(());
                };
                self.session.modify_profile(&mut self.store, profile)?;
                println!("Profile updated.");
            }
            CommandType::Connect => {
                self.connect_interactive().await;
            }
            CommandType::Disconnect => {
                self.session.disconnect().await;
                println!("Disconnected.");
            }
            CommandType::Reconnect { index } => {
                let mut credentials = TerminalCredentials;
                let outcome = self
                    .session
                    .reconnect(&self.store, index, &mut credentials)
                    .await;
                self.recover_connection(outcome, &mut credentials).await;
            }
            CommandType::Schema => {
                let tree = introspect(&mut self.session).await?;
                for line in render(&tree) {
                    println!("{}", line);
                }
            }
            CommandType::Limit { limit } => {
                self.session.set_result_limit(limit);
                self.settings.result_limit = limit;
                if let Err(e) = self.settings.save() {
                    warn!(error = %e, "could not persist the row limit");
                }
                println!("Row limit set to {}.", limit);
            }
            CommandType::Export { path } => {
                let Some(QueryResult::Rows { column_names, rows }) = &self.last_result else {
                    println!("Nothing to export. Run a SELECT first.");
                    return Ok(());
                };
                let target = resolve_export_path(&path, self.settings.export_dir.as_deref());
                write_export(&target, column_names, rows)?;
                println!("Exported {} rows to {}", rows.len(), target.display());
            }
            CommandType::Help => {
                println!("{}", commands::help_text());
            }
            CommandType::Quit => {
                println!("Goodbye!");
                self.running = false;
            }
            CommandType::Query { sql } => {
                let result = execute(&mut self.session, &sql).await?;
                println!("{}", format_result(&result));
                if matches!(result, QueryResult::Rows { .. }) {
                    self.last_result = Some(result);
                }
            }
        }

        Ok(())
    }

    /// Connect the selected profile, offering recovery on refusal
    async fn connect_interactive(&mut self) {
        let mut credentials = TerminalCredentials;
        let outcome = self.session.connect(&mut credentials).await;
        self.recover_connection(outcome, &mut credentials).await;
    }

    /// Report a connection attempt; on refusal offer to fix the profile or
    /// retry, each retry being a fresh `connect`
    async fn recover_connection(
        &mut self,
        mut outcome: Result<()>,
        credentials: &mut TerminalCredentials,
    ) {
        loop {
            match outcome {
                Ok(()) => {
                    if let Some(profile) = self.session.profile() {
                        println!("✓ Connected to {}", profile.label());
                    }
                    return;
                }
                Err(e) if e.is_database_not_found() => {
                    println!("{}", format_error(&e));
                    if !self.confirm("Modify the profile and retry? [y/N] ") {
                        return;
                    }
                    let Some(current) = self.session.profile().cloned() else {
                        return;
                    };
                    match self.prompt_profile(Some(&current)) {
                        Ok(Some(profile)) => {
                            if let Err(e) = self.session.modify_profile(&mut self.store, profile) {
                                println!("{}", format_error(&e));
                                return;
                            }
                        }
                        Ok(None) => return,
                        Err(e) => {
                            println!("{}", format_error(&e));
                            return;
                        }
                    }
                }
                Err(e @ DbConsoleError::Connection { .. }) => {
                    println!("{}", format_error(&e));
                    if !self.confirm("Retry? [y/N] ") {
                        return;
                    }
                }
                Err(e) => {
                    println!("{}", format_error(&e));
                    return;
                }
            }
            outcome = self.session.connect(credentials).await;
        }
    }

    fn confirm(&mut self, question: &str) -> bool {
        match self.editor.readline(question) {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!(error = %e, "confirmation prompt failed");
                false
            }
        }
    }

    /// Ask for every profile field, prefilled from `current` when editing
    ///
    /// Returns `None` when the user cancels with Ctrl-C or Ctrl-D.
    fn prompt_profile(
        &mut self,
        current: Option<&ConnectionProfile>,
    ) -> Result<Option<ConnectionProfile>> {
        let dialect_initial = current
            .map(|p| p.dialect.name().to_string())
            .unwrap_or_else(|| Dialect::Postgres.name().to_string());
        let dialect = loop {
            let Some(text) = self.prompt_field("Dialect (postgres/mysql)", &dialect_initial)? else {
                return Ok(None);
            };
            match text.parse::<Dialect>() {
                Ok(dialect) => break dialect,
                Err(e) => println!("{}", format_error(&e)),
            }
        };

        let host_initial = current.map_or("localhost", |p| p.host.as_str()).to_string();
        let Some(host) = self.prompt_field("Host", &host_initial)? else {
            return Ok(None);
        };

        let port_initial = current
            .map(|p| p.port.clone())
            .unwrap_or_else(|| dialect.default_port().to_string());
        let Some(port) = self.prompt_field("Port", &port_initial)? else {
            return Ok(None);
        };

        let database_initial = current.map(|p| p.database.clone()).unwrap_or_default();
        let Some(database) = self.prompt_field("Database", &database_initial)? else {
            return Ok(None);
        };

        let user_initial = current.map(|p| p.user.clone()).unwrap_or_default();
        let Some(user) = self.prompt_field("User", &user_initial)? else {
            return Ok(None);
        };

        let profile = ConnectionProfile::new(host, port, database, user, dialect);
        profile.port_number()?;
        Ok(Some(profile))
    }

    fn prompt_field(&mut self, label: &str, initial: &str) -> Result<Option<String>> {
        match self
            .editor
            .readline_with_initial(&format!("{}: ", label), (initial, ""))
        {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(DbConsoleError::Io(std::io::Error::other(err.to_string()))),
        }
    }
}
