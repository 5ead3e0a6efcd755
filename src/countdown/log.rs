//! Append-only interval log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::CountdownError;

/// Formats one log line: `🍅 YY-MM-DD , HH:MM[ , #tag][ , purpose]`.
///
/// When only a purpose is present the tag field is left empty (`, ,`).
/// Empty strings count as absent.
pub fn format_log_line(at: NaiveDateTime, tag: Option<&str>, purpose: Option<&str>) -> String {
    let tag = tag.filter(|t| !t.is_empty());
    let purpose = purpose.filter(|p| !p.is_empty());

    let mut line = format!("🍅 {}", at.format("%y-%m-%d , %H:%M"));
    match (tag, purpose) {
        (Some(tag), Some(purpose)) => line.push_str(&format!(" , #{tag} , {purpose}")),
        (Some(tag), None) => line.push_str(&format!(" , #{tag}")),
        (None, Some(purpose)) => line.push_str(&format!(" , , {purpose}")),
        (None, None) => {}
    }
    line
}

/// The log file the single live engine appends to.
#[derive(Debug, Clone)]
pub struct IntervalLog {
    path: PathBuf,
}

impl IntervalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line`, preceded by a newline. Creates the file if needed.
    pub fn append(&self, line: &str) -> Result<(), CountdownError> {
        let to_log_error = |source| CountdownError::Log {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_log_error)?;
        write!(file, "\n{line}").map_err(to_log_error)
    }
}
