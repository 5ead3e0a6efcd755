//! Draw targets and terminal setup.

use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use tracing::warn;

/// Something the renderer can draw a frame of text lines on.
pub trait DrawTarget: Send + 'static {
    fn draw(&mut self, lines: &[String]) -> io::Result<()>;
}

/// Draws on the terminal through crossterm.
pub struct TerminalTarget {
    out: Stdout,
}

impl TerminalTarget {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for TerminalTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawTarget for TerminalTarget {
    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in lines.iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(self.out, MoveTo(0, row), Print(line))?;
        }
        self.out.flush()
    }
}

/// Discards every frame. Used when there is no terminal, e.g. in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTarget;

impl DrawTarget for NullTarget {
    fn draw(&mut self, _lines: &[String]) -> io::Result<()> {
        Ok(())
    }
}

/// Raw mode and alternate screen for the duration of a run.
///
/// The terminal is restored when the session is dropped.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!(error = %e, "failed to leave alternate screen");
        }
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "failed to disable raw mode");
        }
    }
}
