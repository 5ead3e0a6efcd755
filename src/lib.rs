//! Tomato clock library
//!
//! A terminal countdown and pomodoro tracker built from independent workers
//! that only talk through an event broker:
//! - `broker`: publish/subscribe hub with replay for late subscribers
//! - `countdown`: the ticking engine and the interval log
//! - `coordinator`: spawns, drives and shuts down every other worker
//! - `render`, `keys`: terminal view and keyboard input
//! - `sound`, `notification`, `stopwatch`: on-demand collaborators
//! - `config`, `cli`: configuration file and command line

pub mod broker;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod countdown;
pub mod keys;
pub mod notification;
pub mod render;
pub mod sound;
pub mod stopwatch;
pub mod types;

// Re-export commonly used types for convenience
pub use broker::{BrokerError, BrokerHandle, EventBroker, Subscription};
pub use config::{AppConfig, ConfigError, ConfigStore, Profile};
pub use coordinator::{
    ChildKind, Collaborators, CoordinatorError, MainCoordinator, RunOutcome, RunSettings,
};
pub use countdown::{CountdownEngine, CountdownError, CountdownMode};
pub use notification::{MockNotifier, NotificationError, Notifier, NotifySend};
pub use sound::{MockSoundPlayer, RodioSoundPlayer, SoundError, SoundPlayer};
pub use types::{EventKind, EventMessage, FinishReason, SubscriberId};
