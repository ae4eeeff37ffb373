//! Terminal prompts
//!
//! Password entry with echo disabled, used as the session's credential
//! provider.

use crate::database::session::CredentialProvider;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{self, Write};

/// Credential provider reading passwords from the terminal
#[derive(Debug, Default)]
pub struct TerminalCredentials;

impl CredentialProvider for TerminalCredentials {
    fn get_secret(&mut self, prompt_label: &str) -> Result<String> {
        Ok(read_password(prompt_label)?)
    }
}

/// Prompt for a password without echoing it
pub fn read_password(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    crossterm::terminal::enable_raw_mode()?;
    let result = read_hidden_line();
    crossterm::terminal::disable_raw_mode()?;
    println!();

    result
}

fn read_hidden_line() -> io::Result<String> {
    let mut secret = String::new();

    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "password entry cancelled",
                    ));
                }
                KeyCode::Esc => {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "password entry cancelled",
                    ));
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}
