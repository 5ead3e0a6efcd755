//! Output formatting for the tomato CLI.

use std::path::Path;

use crate::config::{Profile, ProfileConfig};
use crate::coordinator::RunOutcome;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows an error message with an optional hint.
    pub fn show_error(message: &str, suggestion: Option<&str>) {
        eprintln!("error: {}", message);
        if let Some(suggestion) = suggestion {
            eprintln!("  hint: {}", suggestion);
        }
    }

    /// Shows how a run ended.
    pub fn show_outcome(outcome: &RunOutcome) {
        println!("{}", Self::outcome_line(outcome));
    }

    pub fn show_config(path: &Path, profile: Profile, stored: &ProfileConfig) {
        for line in Self::config_lines(path, profile, stored) {
            println!("{}", line);
        }
    }

    fn outcome_line(outcome: &RunOutcome) -> String {
        match outcome {
            RunOutcome::Completed => "Run completed".to_string(),
            RunOutcome::Stopped => "Run stopped".to_string(),
            RunOutcome::Interrupted { terminated } => {
                let names: Vec<String> = terminated.iter().map(ToString::to_string).collect();
                if names.is_empty() {
                    "Run interrupted".to_string()
                } else {
                    format!("Run interrupted, terminated: {}", names.join(", "))
                }
            }
        }
    }

    fn config_lines(path: &Path, profile: Profile, stored: &ProfileConfig) -> Vec<String> {
        fn value<T: ToString>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "(not set)".to_string())
        }
        fn path_value(p: &Option<std::path::PathBuf>) -> String {
            value(p.as_ref().map(|p| p.display()))
        }

        vec![
            format!("Profile {} ({})", profile.as_str(), path.display()),
            "─────────────────────────────".to_string(),
            format!("interval_minutes:   {}", value(stored.interval_minutes)),
            format!("break_minutes:      {}", value(stored.break_minutes)),
            format!("log_path:           {}", path_value(&stored.log_path)),
            format!("finish_sound:       {}", path_value(&stored.finish_sound)),
            format!("between_sound:      {}", path_value(&stored.between_sound)),
            format!("break_finish_sound: {}", path_value(&stored.break_finish_sound)),
            format!("can_pause:          {}", value(stored.can_pause)),
            format!("allowed_tags:       {}", stored.allowed_tags.join(", ")),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
