//! Command parsing for the CLI
//!
//! This module parses the `/` commands of the db-console shell. Any input
//! without a leading `/` is a SQL statement.

use crate::error::{DbConsoleError, Result};
use std::path::PathBuf;

/// Command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// List stored profiles
    Profiles,
    /// Select a stored profile and connect
    Use { index: usize },
    /// Register a new profile and connect
    New,
    /// Modify the selected profile
    Edit,
    /// Connect with the selected profile
    Connect,
    /// Release the connection
    Disconnect,
    /// Disconnect, select another profile, connect
    Reconnect { index: usize },
    /// Print the schema tree
    Schema,
    /// Set the row limit for unbounded reads
    Limit { limit: u64 },
    /// Export the last result set
    Export { path: PathBuf },
    /// Show help message
    Help,
    /// Exit the application
    Quit,
    /// Raw SQL statement
    Query { sql: String },
}

/// Parsed command
#[derive(Debug, Clone)]
pub struct Command {
    /// The type of command
    pub command_type: CommandType,
}

fn parse_index(cmd: &str, arg: Option<&str>, expected: &str) -> Result<usize> {
    arg.and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| DbConsoleError::CommandParse(format!("{} expects {}", cmd, expected)))
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if !input.starts_with('/') {
            return Ok(Command {
                command_type: CommandType::Query {
                    sql: input.to_string(),
                },
            });
        }

        let (cmd, arg) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|s| !s.is_empty())),
            None => (input, None),
        };

        let command_type = match cmd {
            "/profiles" => CommandType::Profiles,
            "/use" => CommandType::Use {
                index: parse_index(cmd, arg, "/use <profile number>")?,
            },
            "/new" => CommandType::New,
            "/edit" => CommandType::Edit,
            "/connect" => CommandType::Connect,
            "/disconnect" => CommandType::Disconnect,
            "/reconnect" => CommandType::Reconnect {
                index: parse_index(cmd, arg, "/reconnect <profile number>")?,
            },
            "/schema" => CommandType::Schema,
            "/limit" => {
                let limit = arg
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| {
                        DbConsoleError::CommandParse("/limit expects a number".to_string())
                    })?;
                CommandType::Limit { limit }
            }
            "/export" => {
                let path = arg.ok_or_else(|| {
                    DbConsoleError::CommandParse("/export expects a file or directory".to_string())
                })?;
                CommandType::Export {
                    path: PathBuf::from(path),
                }
            }
            "/help" => CommandType::Help,
            "/quit" | "/exit" => CommandType::Quit,
            _ => {
                return Err(DbConsoleError::CommandParse(format!(
                    "unknown command: {}",
                    cmd
                )))
            }
        };

        Ok(Command { command_type })
    }
}

/// Help text for the shell
pub fn help_text() -> &'static str {
    r#"
db-console Commands

Profiles:
  /profiles            List stored connection profiles
  /new                 Register a new profile and connect to it
  /edit                Modify the selected profile
  /use <n>             Select profile n and connect

Connection:
  /connect             Connect with the selected profile
  /disconnect          Close the connection
  /reconnect <n>       Disconnect and connect to profile n

Database:
  /schema              Show tables, columns and views as a tree
  /limit <n>           Row limit added to SELECTs without a LIMIT
  /export <path>       Export the last result (.json or CSV)

Session:
  /help                Show this help message
  /quit, /exit         Exit db-console

SQL:
  Any text without a / prefix is executed as a SQL statement.
  SELECTs are limited automatically; other statements are committed at once.
"#
}

/// Format an error for display
pub fn format_error(error: &DbConsoleError) -> String {
    format!("Error: {}", error)
}
