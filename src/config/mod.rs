//! Configuration file.
//!
//! The file lives at `<config dir>/tomato/config.json` and holds two
//! profiles:
//!
//! ```json
//! {
//!   "production": { "interval_minutes": 25, "break_minutes": 5, ... },
//!   "test": { ... }
//! }
//! ```
//!
//! Every key is required except `allowed_tags`. Sound files set through
//! `tomato config` are copied into `<data dir>/tomato/` as `<role>.<profile>`.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Directory name under the platform config, data and cache directories.
pub const APP_DIR: &str = "tomato";

const CONFIG_FILE: &str = "config.json";

// ============================================================================
// Profile
// ============================================================================

/// Which half of the config file a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Production,
    Test,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Production => "production",
            Profile::Test => "test",
        }
    }
}

// ============================================================================
// ProfileConfig / ConfigFile
// ============================================================================

/// One profile as stored on disk. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_sound: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between_sound: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_finish_sound: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_pause: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tags: Vec<String>,
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub production: ProfileConfig,
    #[serde(default)]
    pub test: ProfileConfig,
}

impl ConfigFile {
    pub fn profile(&self, profile: Profile) -> &ProfileConfig {
        match profile {
            Profile::Production => &self.production,
            Profile::Test => &self.test,
        }
    }

    pub fn profile_mut(&mut self, profile: Profile) -> &mut ProfileConfig {
        match profile {
            Profile::Production => &mut self.production,
            Profile::Test => &mut self.test,
        }
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Sound files for the three cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSet {
    /// Completion cue at the end of a run
    pub finish: PathBuf,
    /// Short cue between intervals
    pub between: PathBuf,
    /// Short cue when a break ends
    pub break_finish: PathBuf,
}

/// A validated profile, ready for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub interval_minutes: u32,
    pub break_minutes: u32,
    pub log_path: PathBuf,
    pub sounds: SoundSet,
    pub can_pause: bool,
    pub allowed_tags: Vec<String>,
}

impl AppConfig {
    /// Validates a stored profile. Relative paths resolve against `home`.
    ///
    /// All missing keys are reported together.
    pub fn from_profile(
        stored: &ProfileConfig,
        profile: Profile,
        home: &Path,
    ) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |present: bool, key: &'static str| {
            if !present {
                missing.push(key);
            }
        };
        require(stored.interval_minutes.is_some(), "interval_minutes");
        require(stored.break_minutes.is_some(), "break_minutes");
        require(stored.log_path.is_some(), "log_path");
        require(stored.finish_sound.is_some(), "finish_sound");
        require(stored.between_sound.is_some(), "between_sound");
        require(stored.break_finish_sound.is_some(), "break_finish_sound");
        require(stored.can_pause.is_some(), "can_pause");

        let (
            Some(interval_minutes),
            Some(break_minutes),
            Some(log_path),
            Some(finish),
            Some(between),
            Some(break_finish),
            Some(can_pause),
        ) = (
            stored.interval_minutes,
            stored.break_minutes,
            stored.log_path.as_deref(),
            stored.finish_sound.as_deref(),
            stored.between_sound.as_deref(),
            stored.break_finish_sound.as_deref(),
            stored.can_pause,
        )
        else {
            return Err(ConfigError::MissingKeys {
                profile: profile.as_str(),
                keys: missing,
            });
        };

        validate_minutes("interval_minutes", interval_minutes)?;
        validate_minutes("break_minutes", break_minutes)?;

        Ok(Self {
            interval_minutes,
            break_minutes,
            log_path: resolve_home_path(log_path, home),
            sounds: SoundSet {
                finish: resolve_home_path(finish, home),
                between: resolve_home_path(between, home),
                break_finish: resolve_home_path(break_finish, home),
            },
            can_pause,
            allowed_tags: stored.allowed_tags.clone(),
        })
    }
}

fn validate_minutes(key: &'static str, value: u32) -> Result<(), ConfigError> {
    if value < 1 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be at least 1 minute".to_string(),
        });
    }
    Ok(())
}

/// Resolves `path` against `home` unless it is absolute. A leading `~/` is
/// treated as home too.
pub fn resolve_home_path(path: &Path, home: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        return home.join(rest);
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

// ============================================================================
// ConfigUpdate
// ============================================================================

/// Changes requested by `tomato config`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub interval_minutes: Option<u32>,
    pub break_minutes: Option<u32>,
    pub finish_sound: Option<PathBuf>,
    pub between_sound: Option<PathBuf>,
    pub break_finish_sound: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub can_pause: Option<bool>,
    pub tag_add: Vec<String>,
    pub tag_delete: Option<String>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// Locations of the config file, copied sounds and the home directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    data_dir: PathBuf,
    home: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf, data_dir: PathBuf, home: PathBuf) -> Self {
        Self {
            path,
            data_dir,
            home,
        }
    }

    /// Uses the platform directories of the current user.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
        let home = dirs::home_dir().ok_or(ConfigError::NoDirectory("home"))?;
        Ok(Self::new(
            config_dir.join(APP_DIR).join(CONFIG_FILE),
            data_dir.join(APP_DIR),
            home,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file. A missing file is an empty configuration.
    pub fn load_file(&self) -> Result<ConfigFile, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config file not found");
                return Ok(ConfigFile::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save_file(&self, file: &ConfigFile) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(file).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(write_error)
    }

    /// Loads and validates `profile`.
    pub fn load(&self, profile: Profile) -> Result<AppConfig, ConfigError> {
        let file = self.load_file()?;
        AppConfig::from_profile(file.profile(profile), profile, &self.home)
    }

    /// Applies `update` to `profile`, saves the file and returns the profile.
    pub fn update(
        &self,
        profile: Profile,
        update: ConfigUpdate,
    ) -> Result<ProfileConfig, ConfigError> {
        if let Some(minutes) = update.interval_minutes {
            validate_minutes("interval_minutes", minutes)?;
        }
        if let Some(minutes) = update.break_minutes {
            validate_minutes("break_minutes", minutes)?;
        }

        let mut file = self.load_file()?;
        let stored = file.profile_mut(profile);

        if let Some(minutes) = update.interval_minutes {
            stored.interval_minutes = Some(minutes);
        }
        if let Some(minutes) = update.break_minutes {
            stored.break_minutes = Some(minutes);
        }
        if let Some(can_pause) = update.can_pause {
            stored.can_pause = Some(can_pause);
        }
        if let Some(log_file) = update.log_file {
            stored.log_path = Some(log_file);
        }
        if let Some(source) = update.finish_sound {
            stored.finish_sound = Some(self.copy_sound(&source, "finish", profile)?);
        }
        if let Some(source) = update.between_sound {
            stored.between_sound = Some(self.copy_sound(&source, "between", profile)?);
        }
        if let Some(source) = update.break_finish_sound {
            stored.break_finish_sound = Some(self.copy_sound(&source, "break_finish", profile)?);
        }
        for tag in update.tag_add {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !stored.allowed_tags.contains(&tag) {
                stored.allowed_tags.push(tag);
            }
        }
        if let Some(tag) = update.tag_delete {
            let before = stored.allowed_tags.len();
            stored.allowed_tags.retain(|t| *t != tag);
            if stored.allowed_tags.len() == before {
                return Err(ConfigError::Invalid {
                    key: "allowed_tags",
                    reason: format!("tag {tag} is not configured"),
                });
            }
        }

        let updated = stored.clone();
        self.save_file(&file)?;
        info!(profile = profile.as_str(), path = %self.path.display(), "configuration saved");
        Ok(updated)
    }

    /// Copies a sound into the data directory as `<role>.<profile>`.
    fn copy_sound(
        &self,
        source: &Path,
        role: &str,
        profile: Profile,
    ) -> Result<PathBuf, ConfigError> {
        let copy_error = |e| ConfigError::SoundCopy {
            path: source.to_path_buf(),
            source: e,
        };
        fs::create_dir_all(&self.data_dir).map_err(copy_error)?;
        let target = self.data_dir.join(format!("{role}.{}", profile.as_str()));
        fs::copy(source, &target).map_err(copy_error)?;
        debug!(from = %source.display(), to = %target.display(), "sound copied");
        Ok(target)
    }
}

// ============================================================================
// Tests
// ============================================================================
