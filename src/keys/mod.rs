//! Keyboard input.
//!
//! A dedicated thread polls crossterm and forwards key presses into a
//! crossbeam channel. The coordinator and the renderer read from clones of
//! the same receiver; only one of them reads at any time. Ctrl-C goes to a
//! separate interrupt channel because raw mode swallows SIGINT.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How long one crossterm poll waits before checking the stop flag.
const POLL: Duration = Duration::from_millis(100);

/// A key the application understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Esc,
}

impl KeyInput {
    /// Maps a crossterm key event; returns `None` for keys nobody handles.
    pub fn from_event(key: &KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Esc => Some(KeyInput::Esc),
            _ => None,
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && key.code == KeyCode::Char('c')
}

/// Background thread reading the terminal.
pub struct KeyReader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl KeyReader {
    /// Starts the reader thread.
    pub fn spawn(
        keys_tx: Sender<KeyInput>,
        interrupt_tx: mpsc::UnboundedSender<()>,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("tomato-keys".to_string())
            .spawn(move || read_keys(&thread_stop, &keys_tx, &interrupt_tx))?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stops the thread and waits for it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("key reader thread panicked");
            }
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn read_keys(
    stop: &AtomicBool,
    keys_tx: &Sender<KeyInput>,
    interrupt_tx: &mpsc::UnboundedSender<()>,
) {
    while !stop.load(Ordering::SeqCst) {
        match event::poll(POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(error = %e, "terminal poll failed");
                return;
            }
        }

        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "terminal read failed");
                return;
            }
        };

        if is_interrupt(&key) {
            debug!("ctrl-c pressed");
            let _ = interrupt_tx.send(());
        } else if let Some(input) = KeyInput::from_event(&key) {
            if keys_tx.send(input).is_err() {
                return;
            }
        }
    }
}
