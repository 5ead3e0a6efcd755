//! Countdown state machine.
//!
//! `CountdownState` is mutated only by the engine. It knows nothing about the
//! broker: [`CountdownState::tick`] returns the boundaries crossed during one
//! second and the engine turns them into events.

// ============================================================================
// CountdownMode
// ============================================================================

/// What kind of run the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownMode {
    /// One countdown, logging an interval every `interval_minutes`.
    FixedDuration {
        total_minutes: u32,
        interval_minutes: u32,
    },
    /// `cycles` work intervals separated by breaks.
    IntervalCycle {
        work_minutes: u32,
        break_minutes: u32,
        cycles: u32,
    },
}

impl CountdownMode {
    /// Number of intervals a complete run will log.
    ///
    /// A trailing partial interval of a fixed run is not logged.
    pub fn planned_intervals(&self) -> u32 {
        match *self {
            CountdownMode::FixedDuration {
                total_minutes,
                interval_minutes,
            } => total_minutes.checked_div(interval_minutes).unwrap_or(0),
            CountdownMode::IntervalCycle { cycles, .. } => cycles,
        }
    }
}

/// Phase of a cycle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Working,
    OnBreak,
}

/// Boundary crossed by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A work interval completed and must be logged.
    IntervalCompleted {
        /// More work follows this interval
        more_remaining: bool,
    },
    /// A break started.
    BreakStarted,
    /// A break finished and the next work interval started.
    BreakFinished,
}

// ============================================================================
// CountdownState
// ============================================================================

/// Remaining time, pause flag and cycle bookkeeping for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownState {
    mode: CountdownMode,
    /// Seconds left in the current countdown (whole run, or current phase)
    pub remaining_seconds: u64,
    /// Whether ticking is suspended
    pub paused: bool,
    /// Current phase (always `Working` for fixed runs)
    pub phase: CyclePhase,
    /// Work intervals still to complete (cycle runs)
    pub cycles_remaining: u32,
    /// Seconds since the last logged boundary (fixed runs)
    pub since_last_interval: u64,
    /// Intervals completed so far
    pub intervals_completed: u32,
    /// Tag attached to logged intervals
    pub tag: Option<String>,
    /// Purpose attached to logged intervals
    pub purpose: Option<String>,
}

impl CountdownState {
    /// Creates the initial state for `mode`.
    pub fn new(mode: CountdownMode, tag: Option<String>, purpose: Option<String>) -> Self {
        let (remaining_seconds, cycles_remaining) = match mode {
            CountdownMode::FixedDuration { total_minutes, .. } => (minutes(total_minutes), 0),
            CountdownMode::IntervalCycle {
                work_minutes,
                cycles,
                ..
            } => (minutes(work_minutes), cycles),
        };

        Self {
            mode,
            remaining_seconds,
            paused: false,
            phase: CyclePhase::Working,
            cycles_remaining,
            since_last_interval: 0,
            intervals_completed: 0,
            tag: non_empty(tag),
            purpose: non_empty(purpose),
        }
    }

    /// Returns the run mode.
    pub fn mode(&self) -> CountdownMode {
        self.mode
    }

    /// Returns true once the run has nothing left to count.
    pub fn is_finished(&self) -> bool {
        match self.mode {
            CountdownMode::FixedDuration { .. } => self.remaining_seconds == 0,
            CountdownMode::IntervalCycle { .. } => self.cycles_remaining == 0,
        }
    }

    /// Seconds until the whole run ends, including future intervals and breaks.
    pub fn pending_seconds(&self) -> u64 {
        match self.mode {
            CountdownMode::FixedDuration { .. } => self.remaining_seconds,
            CountdownMode::IntervalCycle {
                work_minutes,
                break_minutes,
                ..
            } => {
                let work = minutes(work_minutes);
                let rest = minutes(break_minutes);
                let cycles = u64::from(self.cycles_remaining);
                match self.phase {
                    CyclePhase::Working => {
                        self.remaining_seconds + cycles.saturating_sub(1) * (work + rest)
                    }
                    CyclePhase::OnBreak => {
                        self.remaining_seconds + cycles * work + cycles.saturating_sub(1) * rest
                    }
                }
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Advances the run by one second.
    pub fn tick(&mut self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        if self.is_finished() {
            return transitions;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);

        match self.mode {
            CountdownMode::FixedDuration {
                interval_minutes, ..
            } => {
                self.since_last_interval += 1;
                let interval = minutes(interval_minutes);
                if interval > 0 && self.since_last_interval >= interval {
                    self.since_last_interval = 0;
                    self.intervals_completed += 1;
                    transitions.push(Transition::IntervalCompleted {
                        more_remaining: self.remaining_seconds > 0,
                    });
                }
            }
            CountdownMode::IntervalCycle {
                work_minutes,
                break_minutes,
                ..
            } => {
                if self.remaining_seconds > 0 {
                    return transitions;
                }
                match self.phase {
                    CyclePhase::Working => {
                        self.cycles_remaining -= 1;
                        self.intervals_completed += 1;
                        let more_remaining = self.cycles_remaining > 0;
                        transitions.push(Transition::IntervalCompleted { more_remaining });
                        if more_remaining {
                            transitions.push(Transition::BreakStarted);
                            self.phase = CyclePhase::OnBreak;
                            self.remaining_seconds = minutes(break_minutes);
                        }
                    }
                    CyclePhase::OnBreak => {
                        transitions.push(Transition::BreakFinished);
                        self.phase = CyclePhase::Working;
                        self.remaining_seconds = minutes(work_minutes);
                    }
                }
            }
        }

        transitions
    }
}

fn minutes(value: u32) -> u64 {
    u64::from(value) * 60
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Formats seconds as `HH:MM:SS`.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

// ============================================================================
// Tests
// ============================================================================
