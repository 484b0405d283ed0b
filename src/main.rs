use anyhow::Result;
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use std::io;
use std::time::Duration;

mod config;
mod service;
mod storage;
mod tui;

use tui::app::App;

// Drives the inactivity lock and the transient animation deadlines even
// while no input arrives.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    // Setup terminal
    enable_raw_mode().map_err(|e| anyhow::anyhow!("Failed to enable raw mode: {}. Make sure you're running in a terminal.", e))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).map_err(|e| anyhow::anyhow!("Failed to enter alternate screen: {}. Make sure you're running in a terminal.", e))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| anyhow::anyhow!("Failed to create terminal: {}. Make sure you're running in a terminal.", e))?;

    // Create app
    let mut app = App::new()?;

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| app.render(f))?;

        if event::poll(TICK_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key.code, key.modifiers)?;
                }
                Event::Paste(text) => app.handle_paste(text),
                Event::Mouse(_) | Event::Resize(_, _) => app.record_activity(),
                _ => {}
            }
        }
        app.tick();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    Ok(())
}
