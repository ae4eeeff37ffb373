//! CLI module
//!
//! This module provides the interactive shell for db-console: command
//! parsing, the REPL, the popup command menu, password entry, result
//! display and export.

pub mod command_menu;
pub mod commands;
pub mod export;
pub mod output;
pub mod prompt;
pub mod repl;

// Re-exports
pub use repl::Repl;
