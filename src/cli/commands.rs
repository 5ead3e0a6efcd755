//! Command definitions for the tomato CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigUpdate, Profile};

// ============================================================================
// CLI Structure
// ============================================================================

/// Terminal pomodoro clock with an interval log
#[derive(Parser, Debug)]
#[command(
    name = "tomato",
    version,
    about = "Terminal pomodoro clock",
    long_about = "Runs a work timer or a work/break cycle in the terminal.\n\
                  Finished intervals are appended to a log file and announced with sounds \
                  and a desktop notification.",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use the test profile of the configuration
    #[arg(long, global = true)]
    pub test: bool,

    /// Write debug output to the log file
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Cli {
    pub fn profile(&self) -> Profile {
        if self.test {
            Profile::Test
        } else {
            Profile::Production
        }
    }
}

// ============================================================================
// Subcommands
// ============================================================================

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a single timer, logging every configured interval
    Timer(TimerArgs),

    /// Run a number of pomodoros with breaks in between
    Pomodoro(PomodoroArgs),

    /// Show or edit the configuration of the selected profile
    Config(ConfigArgs),

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Run Arguments
// ============================================================================

/// Options shared by `timer` and `pomodoro`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Tag written to the log
    #[arg(short, long, value_parser = validate_label)]
    pub tag: Option<String>,

    /// What the session is for
    #[arg(short, long, value_parser = validate_label)]
    pub purpose: Option<String>,

    /// Disable sounds
    #[arg(long)]
    pub no_sound: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TimerArgs {
    /// Duration in minutes
    #[arg(value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub minutes: u32,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PomodoroArgs {
    /// Number of pomodoros
    #[arg(value_parser = clap::value_parser!(u32).range(1..=48))]
    pub count: u32,

    #[command(flatten)]
    pub session: SessionArgs,
}

// ============================================================================
// Config Arguments
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Length of one interval in minutes
    #[arg(long)]
    pub interval_minutes: Option<u32>,

    /// Length of a break in minutes
    #[arg(long)]
    pub break_minutes: Option<u32>,

    /// Sound played when a run finishes (copied into the data directory)
    #[arg(long)]
    pub finish_sound: Option<PathBuf>,

    /// Sound played between intervals
    #[arg(long)]
    pub between_sound: Option<PathBuf>,

    /// Sound played when a break ends
    #[arg(long)]
    pub break_finish_sound: Option<PathBuf>,

    /// Interval log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Whether pomodoro runs may be paused
    #[arg(long)]
    pub can_pause: Option<bool>,

    /// Tags to allow, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tag_add: Vec<String>,

    /// Tag to remove
    #[arg(long)]
    pub tag_delete: Option<String>,

    /// Print the profile after applying any changes
    #[arg(long)]
    pub show: bool,
}

impl ConfigArgs {
    pub fn to_update(&self) -> ConfigUpdate {
        ConfigUpdate {
            interval_minutes: self.interval_minutes,
            break_minutes: self.break_minutes,
            finish_sound: self.finish_sound.clone(),
            between_sound: self.between_sound.clone(),
            break_finish_sound: self.break_finish_sound.clone(),
            log_file: self.log_file.clone(),
            can_pause: self.can_pause,
            tag_add: self.tag_add.clone(),
            tag_delete: self.tag_delete.clone(),
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Tags and purposes must be non-empty and at most 100 characters.
fn validate_label(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.chars().count() > 100 {
        return Err("must be at most 100 characters".to_string());
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Global Flag Tests
    // ------------------------------------------------------------------------

    mod global_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["tomato"]);
            assert!(cli.command.is_none());
            assert_eq!(cli.profile(), Profile::Production);
            assert!(!cli.debug);
        }

        #[test]
        fn test_test_flag_selects_profile() {
            let cli = Cli::parse_from(["tomato", "timer", "5", "--test"]);
            assert_eq!(cli.profile(), Profile::Test);
        }

        #[test]
        fn test_debug_flag() {
            let cli = Cli::parse_from(["tomato", "--debug", "pomodoro", "2"]);
            assert!(cli.debug);
        }
    }

    // ------------------------------------------------------------------------
    // Run Command Tests
    // ------------------------------------------------------------------------

    mod run_tests {
        use super::*;

        #[test]
        fn test_parse_timer() {
            let cli = Cli::parse_from(["tomato", "timer", "50", "-t", "work", "-p", "write"]);
            match cli.command {
                Some(Commands::Timer(args)) => {
                    assert_eq!(args.minutes, 50);
                    assert_eq!(args.session.tag.as_deref(), Some("work"));
                    assert_eq!(args.session.purpose.as_deref(), Some("write"));
                    assert!(!args.session.no_sound);
                }
                other => panic!("expected timer, got {other:?}"),
            }
        }

        #[test]
        fn test_parse_pomodoro_no_sound() {
            let cli = Cli::parse_from(["tomato", "pomodoro", "4", "--no-sound"]);
            match cli.command {
                Some(Commands::Pomodoro(args)) => {
                    assert_eq!(args.count, 4);
                    assert!(args.session.no_sound);
                }
                other => panic!("expected pomodoro, got {other:?}"),
            }
        }

        #[test]
        fn test_zero_minutes_rejected() {
            assert!(Cli::try_parse_from(["tomato", "timer", "0"]).is_err());
            assert!(Cli::try_parse_from(["tomato", "pomodoro", "0"]).is_err());
        }

        #[test]
        fn test_empty_tag_rejected() {
            assert!(Cli::try_parse_from(["tomato", "timer", "5", "--tag", " "]).is_err());
        }

        #[test]
        fn test_validate_label_length() {
            assert!(validate_label(&"a".repeat(100)).is_ok());
            assert!(validate_label(&"a".repeat(101)).is_err());
            assert_eq!(validate_label(" x ").unwrap(), "x");
        }
    }

    // ------------------------------------------------------------------------
    // Config Command Tests
    // ------------------------------------------------------------------------

    mod config_tests {
        use super::*;

        #[test]
        fn test_parse_config_update() {
            let cli = Cli::parse_from([
                "tomato",
                "config",
                "--interval-minutes",
                "30",
                "--can-pause",
                "false",
                "--tag-add",
                "work,study",
            ]);
            let Some(Commands::Config(args)) = cli.command else {
                panic!("expected config");
            };
            let update = args.to_update();
            assert_eq!(update.interval_minutes, Some(30));
            assert_eq!(update.can_pause, Some(false));
            assert_eq!(update.tag_add, vec!["work", "study"]);
            assert!(!args.show);
        }

        #[test]
        fn test_show_only_is_empty_update() {
            let cli = Cli::parse_from(["tomato", "config", "--show"]);
            let Some(Commands::Config(args)) = cli.command else {
                panic!("expected config");
            };
            assert!(args.show);
            assert!(args.to_update().is_empty());
        }
    }
}
