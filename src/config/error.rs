//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, validating or editing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required keys are not set for the selected profile.
    #[error("missing configuration for profile {profile}: {}", .keys.join(", "))]
    MissingKeys {
        profile: &'static str,
        keys: Vec<&'static str>,
    },

    /// A value is out of range or otherwise unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// A platform directory could not be determined.
    #[error("could not determine the {0} directory")]
    NoDirectory(&'static str),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sound file could not be copied into the data directory.
    #[error("failed to copy sound {}: {source}", .path.display())]
    SoundCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::MissingKeys { .. } => "set the missing values with `tomato config`",
            Self::Invalid { .. } => "fix the value with `tomato config`",
            Self::NoDirectory(_) => "set HOME (and the XDG base directories) for this user",
            Self::Read { .. } | Self::Write { .. } => {
                "check the permissions of the config directory"
            }
            Self::Parse { .. } => "fix or remove the config file",
            Self::SoundCopy { .. } => "check that the sound file exists and is readable",
        }
    }
}
