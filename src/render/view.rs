//! Pure view state built from broker events.

use std::collections::VecDeque;

use crate::keys::KeyInput;
use crate::types::{EventKind, EventMessage, FinishReason};

/// Status lines kept on screen.
const MAX_MESSAGES: usize = 5;

// ============================================================================
// InputPrompt
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Purpose,
    Tag,
}

/// Outcome of a finished prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    Submitted(String),
    Cancelled,
}

/// Line editor for purpose and tag entry.
///
/// Tag entry picks from `choices` by number; with no choices it is free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPrompt {
    kind: PromptKind,
    buffer: String,
    choices: Vec<String>,
    rejected: bool,
}

impl InputPrompt {
    pub fn purpose() -> Self {
        Self {
            kind: PromptKind::Purpose,
            buffer: String::new(),
            choices: Vec::new(),
            rejected: false,
        }
    }

    pub fn tag(choices: Vec<String>) -> Self {
        Self {
            kind: PromptKind::Tag,
            buffer: String::new(),
            choices,
            rejected: false,
        }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Feeds one key. Returns a result when the prompt is done.
    pub fn handle_key(&mut self, key: KeyInput) -> Option<InputResult> {
        match key {
            KeyInput::Char(c) => {
                self.buffer.push(c);
                None
            }
            KeyInput::Backspace => {
                self.buffer.pop();
                None
            }
            KeyInput::Esc => Some(InputResult::Cancelled),
            KeyInput::Enter => self.submit(),
        }
    }

    fn submit(&mut self) -> Option<InputResult> {
        let text = self.buffer.trim().to_string();
        if self.kind == PromptKind::Purpose || self.choices.is_empty() {
            return Some(InputResult::Submitted(text));
        }

        let choice = text
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.choices.get(index))
            .or_else(|| self.choices.iter().find(|c| **c == text));
        match choice {
            Some(choice) => Some(InputResult::Submitted(choice.clone())),
            None => {
                self.buffer.clear();
                self.rejected = true;
                None
            }
        }
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.kind {
            PromptKind::Purpose => lines.push(format!("Purpose: {}_", self.buffer)),
            PromptKind::Tag => {
                for (index, choice) in self.choices.iter().enumerate() {
                    lines.push(format!("  {}) {}", index + 1, choice));
                }
                if self.rejected {
                    lines.push("  no such tag".to_string());
                }
                lines.push(format!("Tag: {}_", self.buffer));
            }
        }
        lines.push("(Enter to confirm, Esc to cancel)".to_string());
        lines
    }
}

// ============================================================================
// ViewState
// ============================================================================

/// Everything the screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub remaining: Option<String>,
    pub finish_time: Option<String>,
    pub paused: bool,
    pub on_break: bool,
    pub audio_playing: bool,
    pub tag: Option<String>,
    pub purpose: Option<String>,
    pub intervals_done: u32,
    pub intervals_planned: u32,
    pub last_key: Option<String>,
    pub finished: Option<FinishReason>,
    pub messages: VecDeque<String>,
    pub prompt: Option<InputPrompt>,
    allowed_tags: Vec<String>,
}

impl ViewState {
    pub fn new(allowed_tags: Vec<String>) -> Self {
        Self {
            allowed_tags,
            ..Self::default()
        }
    }

    /// Folds one event into the view. Returns true if the screen changed.
    pub fn apply(&mut self, message: &EventMessage) -> bool {
        let payload = message.payload().map(str::to_string);
        match message.kind {
            EventKind::TimerInit => {
                self.finish_time = payload;
                self.finished = None;
            }
            EventKind::TimeChange => self.remaining = payload,
            EventKind::TimerStopped => self.paused = true,
            EventKind::TimerResumed => {
                self.paused = false;
                self.finish_time = payload;
            }
            EventKind::TimerFinished => {
                self.finished = Some(FinishReason::from_payload(message.payload()));
                self.paused = false;
            }
            EventKind::IntervalsPlanned => {
                self.intervals_planned = parse_count(message.payload());
            }
            EventKind::IntervalFinished => self.intervals_done = parse_count(message.payload()),
            EventKind::BreakBegin => self.on_break = true,
            EventKind::BreakFinished => self.on_break = false,
            EventKind::AudioPlayback => self.audio_playing = true,
            EventKind::AudioStopped | EventKind::AudioEnded => self.audio_playing = false,
            EventKind::AddPurpose => self.prompt = Some(InputPrompt::purpose()),
            EventKind::TagChange => self.prompt = Some(InputPrompt::tag(self.allowed_tags.clone())),
            EventKind::PurposeAdded => self.purpose = payload.filter(|p| !p.is_empty()),
            EventKind::TagChanged => self.tag = payload.filter(|t| !t.is_empty()),
            EventKind::PurposeFinished | EventKind::TagFinished => self.prompt = None,
            EventKind::KeyPressed => self.last_key = payload,
            EventKind::AppMessage => {
                if let Some(text) = payload {
                    if self.messages.len() == MAX_MESSAGES {
                        self.messages.pop_front();
                    }
                    self.messages.push_back(text);
                }
            }
            EventKind::StopTimer
            | EventKind::ResumeTimer
            | EventKind::IntervalBegin
            | EventKind::IntervalAudio
            | EventKind::AudioTerminate
            | EventKind::StopStopwatch
            | EventKind::Notification
            | EventKind::PrinterReady
            | EventKind::Termination
            | EventKind::StopPrinter => return false,
        }
        true
    }

    /// Renders the view as text lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["🍅 tomato".to_string(), String::new()];

        let mut status = format!(
            "Remaining: {}",
            self.remaining.as_deref().unwrap_or("--:--:--")
        );
        if self.paused {
            status.push_str("  [paused]");
        }
        if self.on_break {
            status.push_str("  [break]");
        }
        if self.audio_playing {
            status.push_str("  ♪");
        }
        lines.push(status);

        match self.finished {
            Some(FinishReason::Completed) => lines.push("Finished".to_string()),
            Some(FinishReason::Terminated) => lines.push("Stopped".to_string()),
            None => lines.push(format!(
                "Finish at: {}",
                self.finish_time.as_deref().unwrap_or("--:--")
            )),
        }
        lines.push(format!(
            "Intervals: {}/{}",
            self.intervals_done, self.intervals_planned
        ));
        lines.push(format!("Tag: {}", self.tag.as_deref().unwrap_or("-")));
        lines.push(format!("Purpose: {}", self.purpose.as_deref().unwrap_or("-")));
        if let Some(key) = &self.last_key {
            lines.push(format!("Last key: {key}"));
        }

        lines.push(String::new());
        lines.extend(self.messages.iter().cloned());

        lines.push(String::new());
        match &self.prompt {
            Some(prompt) => lines.extend(prompt.lines()),
            None => lines.push(
                "[p] pause/resume  [s] stop  [t] stopwatch  [i] purpose  [g] tag".to_string(),
            ),
        }
        lines
    }
}

fn parse_count(payload: Option<&str>) -> u32 {
    payload.and_then(|p| p.parse().ok()).unwrap_or(0)
}
