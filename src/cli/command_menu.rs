//! Command Menu (TUI popup)
//!
//! Shown when the user types a lone "/". Arrow keys move, Enter picks,
//! Esc closes, and typing "/" again drops back to free text input.

use ratatui::{
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use std::io;

/// One menu entry: command, what it does, an example invocation
pub type CommandItem = (&'static str, &'static str, &'static str);

const MENU: &[CommandItem] = &[
    ("/profiles", "List stored connection profiles", "/profiles"),
    ("/new", "Register a new profile and connect", "/new"),
    ("/use", "Select a profile and connect", "/use 0"),
    ("/edit", "Modify the selected profile", "/edit"),
    ("/connect", "Connect with the selected profile", "/connect"),
    ("/disconnect", "Close the connection", "/disconnect"),
    ("/reconnect", "Switch to another profile", "/reconnect 1"),
    ("/schema", "Show the schema tree", "/schema"),
    ("/limit", "Set the automatic row limit", "/limit 500"),
    ("/export", "Export the last result", "/export users.csv"),
    ("/help", "Show detailed help", "/help"),
    ("/quit", "Exit db-console", "/quit"),
];

/// All menu entries, in display order
pub fn get_commands() -> &'static [CommandItem] {
    MENU
}

/// Commands that take an argument after the name
pub fn needs_argument(command: &str) -> bool {
    matches!(command, "/use" | "/reconnect" | "/limit" | "/export")
}

/// Result of running the command menu
pub enum MenuResult {
    /// User selected a command
    Command(String),
    /// User cancelled (ESC)
    Cancelled,
    /// User wants to type their own input
    TextInput,
}

/// What a key press does to the menu
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Move(usize),
    Pick(usize),
    Close,
    Type,
    Ignore,
}

fn step(code: KeyCode, selected: usize, len: usize) -> Step {
    let last = len.saturating_sub(1);
    match code {
        KeyCode::Esc | KeyCode::Char('q') => Step::Close,
        KeyCode::Char('/') => Step::Type,
        KeyCode::Enter if len > 0 => Step::Pick(selected.min(last)),
        KeyCode::Down | KeyCode::Char('j') => Step::Move((selected + 1).min(last)),
        KeyCode::Up | KeyCode::Char('k') => Step::Move(selected.saturating_sub(1)),
        KeyCode::Home => Step::Move(0),
        KeyCode::End => Step::Move(last),
        _ => Step::Ignore,
    }
}

/// Display the command menu and return the user's choice
pub fn show_command_menu() -> io::Result<MenuResult> {
    crossterm::terminal::enable_raw_mode()?;
    let mut terminal = ratatui::Terminal::new(ratatui::backend::CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let result = event_loop(&mut terminal);

    terminal.clear()?;
    crossterm::terminal::disable_raw_mode()?;
    result
}

fn event_loop(
    terminal: &mut ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
) -> io::Result<MenuResult> {
    let mut state = ListState::default().with_selected(Some(0));

    loop {
        terminal.draw(|f| draw(f, &mut state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match step(key.code, state.selected().unwrap_or(0), MENU.len()) {
            Step::Move(i) => state.select(Some(i)),
            Step::Pick(i) => return Ok(MenuResult::Command(MENU[i].0.to_string())),
            Step::Close => return Ok(MenuResult::Cancelled),
            Step::Type => return Ok(MenuResult::TextInput),
            Step::Ignore => {}
        }
    }
}

fn draw(f: &mut Frame, state: &mut ListState) {
    let [list_area, footer_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(f.area());

    let items: Vec<ListItem> = MENU
        .iter()
        .map(|(name, description, example)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<12}", name), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{:<38}", description)),
                Span::styled(*example, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" db-console ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, list_area, state);

    let footer = Line::from(" ↑/↓ move   Enter select   Esc cancel   / type ")
        .style(Style::default().fg(Color::Gray));
    f.render_widget(footer, footer_area);
}
