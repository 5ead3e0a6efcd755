//! CLI module for tomato.
//!
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting

pub mod commands;
pub mod display;

pub use commands::{Cli, Commands, ConfigArgs, PomodoroArgs, SessionArgs, TimerArgs};
pub use display::Display;
