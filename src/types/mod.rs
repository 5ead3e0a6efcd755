//! Core data types shared by every worker.
//!
//! This module defines:
//! - The closed event vocabulary (`EventKind`)
//! - Broker messages (`EventMessage`)
//! - Subscriber identities
//! - The reason a countdown finished

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// EventKind
// ============================================================================

/// Every event kind the broker knows about.
///
/// The set is closed: consumers match on it exhaustively, and string names
/// outside of it are rejected by [`EventKind::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // Timer lifecycle
    /// Countdown started ticking; payload is the projected finish time (`HH:MM`)
    TimerInit,
    /// Remaining time changed; payload is `HH:MM:SS`
    TimeChange,
    /// Countdown paused
    TimerStopped,
    /// Countdown resumed; payload is the new projected finish time
    TimerResumed,
    /// Countdown exited; payload is a [`FinishReason`]
    TimerFinished,
    /// Request to pause the countdown
    StopTimer,
    /// Request to resume the countdown
    ResumeTimer,

    // Interval / break lifecycle
    /// Number of intervals the run will log
    IntervalsPlanned,
    /// A work interval started (cycle mode, after a break)
    IntervalBegin,
    /// A work interval was completed and logged
    IntervalFinished,
    /// Interior interval boundary; triggers the between-intervals sound
    IntervalAudio,
    /// A break started
    BreakBegin,
    /// A break finished
    BreakFinished,

    // Audio lifecycle
    /// A sound cue started
    AudioPlayback,
    /// A short cue finished
    AudioStopped,
    /// The completion cue finished or was cut off
    AudioEnded,
    /// Request to cut off the completion cue; payload is the cue id
    AudioTerminate,

    // Input lifecycle
    /// Open the purpose prompt
    AddPurpose,
    /// Purpose set; payload is the purpose text
    PurposeAdded,
    /// Purpose prompt closed
    PurposeFinished,
    /// Open the tag prompt
    TagChange,
    /// Tag set; payload is the tag
    TagChanged,
    /// Tag prompt closed
    TagFinished,
    /// Echo of the last dispatched key
    KeyPressed,

    // Stopwatch
    /// Stop a stopwatch; payload is the stopwatch id
    StopStopwatch,

    // Application
    /// Human-readable status line
    AppMessage,
    /// Desktop notification request; payload is `summary\nbody`
    Notification,

    // Process lifecycle
    /// The renderer is ready to draw
    PrinterReady,
    /// Forced end of the countdown
    Termination,
    /// The renderer and notifier should exit
    StopPrinter,
}

impl EventKind {
    /// All event kinds, in declaration order.
    pub const ALL: [EventKind; 30] = [
        EventKind::TimerInit,
        EventKind::TimeChange,
        EventKind::TimerStopped,
        EventKind::TimerResumed,
        EventKind::TimerFinished,
        EventKind::StopTimer,
        EventKind::ResumeTimer,
        EventKind::IntervalsPlanned,
        EventKind::IntervalBegin,
        EventKind::IntervalFinished,
        EventKind::IntervalAudio,
        EventKind::BreakBegin,
        EventKind::BreakFinished,
        EventKind::AudioPlayback,
        EventKind::AudioStopped,
        EventKind::AudioEnded,
        EventKind::AudioTerminate,
        EventKind::AddPurpose,
        EventKind::PurposeAdded,
        EventKind::PurposeFinished,
        EventKind::TagChange,
        EventKind::TagChanged,
        EventKind::TagFinished,
        EventKind::KeyPressed,
        EventKind::StopStopwatch,
        EventKind::AppMessage,
        EventKind::Notification,
        EventKind::PrinterReady,
        EventKind::Termination,
        EventKind::StopPrinter,
    ];

    /// Returns the canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TimerInit => "timer_init",
            EventKind::TimeChange => "time_change",
            EventKind::TimerStopped => "timer_stopped",
            EventKind::TimerResumed => "timer_resumed",
            EventKind::TimerFinished => "timer_finished",
            EventKind::StopTimer => "stop_timer",
            EventKind::ResumeTimer => "resume_timer",
            EventKind::IntervalsPlanned => "intervals_planned",
            EventKind::IntervalBegin => "interval_begin",
            EventKind::IntervalFinished => "interval_finished",
            EventKind::IntervalAudio => "interval_audio",
            EventKind::BreakBegin => "break_begin",
            EventKind::BreakFinished => "break_finished",
            EventKind::AudioPlayback => "audio_playback",
            EventKind::AudioStopped => "audio_stopped",
            EventKind::AudioEnded => "audio_ended",
            EventKind::AudioTerminate => "audio_terminate",
            EventKind::AddPurpose => "add_purpose",
            EventKind::PurposeAdded => "purpose_added",
            EventKind::PurposeFinished => "purpose_finished",
            EventKind::TagChange => "tag_change",
            EventKind::TagChanged => "tag_changed",
            EventKind::TagFinished => "tag_finished",
            EventKind::KeyPressed => "key_pressed",
            EventKind::StopStopwatch => "stop_stopwatch",
            EventKind::AppMessage => "app_message",
            EventKind::Notification => "notification",
            EventKind::PrinterReady => "printer_ready",
            EventKind::Termination => "termination",
            EventKind::StopPrinter => "stop_printer",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not part of the event vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

// ============================================================================
// EventMessage
// ============================================================================

/// An immutable message carried by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event kind used for routing
    pub kind: EventKind,
    /// Kind-specific payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl EventMessage {
    /// Creates a message without payload.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Creates a message carrying a payload.
    pub fn with_payload(kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Some(payload.into()),
        }
    }

    /// Returns the payload as a string slice.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl fmt::Display for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "{} ({})", self.kind, payload),
            None => write!(f, "{}", self.kind),
        }
    }
}

// ============================================================================
// SubscriberId
// ============================================================================

/// Identity of a broker subscriber.
///
/// Each worker draws a fresh id when it is created. Ids are also used as the
/// payload of addressed control events (`AudioTerminate`, `StopStopwatch`) so
/// that replayed controls meant for an earlier worker are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Generates a new random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns true if `payload` addresses this subscriber.
    pub fn is_addressed_by(&self, payload: Option<&str>) -> bool {
        payload.and_then(|p| Uuid::parse_str(p).ok()) == Some(self.0)
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FinishReason
// ============================================================================

/// Why a countdown left its loop; carried by `TimerFinished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// All time elapsed
    Completed,
    /// A `Termination` event arrived
    Terminated,
}

impl FinishReason {
    /// Returns the payload representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::Terminated => "terminated",
        }
    }

    /// Parses a `TimerFinished` payload; anything unrecognized counts as completed.
    pub fn from_payload(payload: Option<&str>) -> Self {
        match payload {
            Some("terminated") => FinishReason::Terminated,
            _ => FinishReason::Completed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
