//! Countdown engine.
//!
//! This module provides the worker that owns the remaining time:
//! - Waits for the renderer before the first tick
//! - Ticks once per second and publishes the remaining time
//! - Handles pause/resume, tag and purpose changes, and termination
//! - Writes the interval log and announces interval/break boundaries

mod log;
mod state;

pub use log::{format_log_line, IntervalLog};
pub use state::{format_hms, CountdownMode, CountdownState, CyclePhase, Transition};

use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, Local};
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::types::{EventKind, EventMessage, FinishReason, SubscriberId};

/// Tick length while running.
const TICK: Duration = Duration::from_secs(1);

/// Backoff while paused.
const PAUSED_POLL: Duration = Duration::from_millis(500);

/// Kinds the engine consumes.
const SUBSCRIBED_KINDS: [EventKind; 6] = [
    EventKind::PrinterReady,
    EventKind::StopTimer,
    EventKind::ResumeTimer,
    EventKind::Termination,
    EventKind::PurposeAdded,
    EventKind::TagChanged,
];

// ============================================================================
// CountdownError
// ============================================================================

#[derive(Debug, Error)]
pub enum CountdownError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A kind arrived that the engine has no case for.
    #[error("countdown received unexpected event: {0}")]
    UnexpectedEvent(EventKind),

    #[error("failed to append to interval log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether the engine keeps going after handling events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Terminate,
}

// ============================================================================
// CountdownEngine
// ============================================================================

/// Worker driving one fixed or cycle run.
pub struct CountdownEngine {
    broker: BrokerHandle,
    subscription: Subscription,
    state: CountdownState,
    log: IntervalLog,
    printer_ready: bool,
}

impl CountdownEngine {
    /// Creates the engine, subscribes it and announces tag, purpose and the
    /// planned interval count.
    pub fn new(
        broker: BrokerHandle,
        mode: CountdownMode,
        tag: Option<String>,
        purpose: Option<String>,
        log: IntervalLog,
    ) -> Result<Self, CountdownError> {
        let subscription = broker.subscribe(SubscriberId::new(), &SUBSCRIBED_KINDS)?;
        let state = CountdownState::new(mode, tag, purpose);

        if let Some(tag) = &state.tag {
            broker.emit_with(EventKind::TagChanged, tag.clone())?;
        }
        if let Some(purpose) = &state.purpose {
            broker.emit_with(EventKind::PurposeAdded, purpose.clone())?;
        }
        broker.emit_with(
            EventKind::IntervalsPlanned,
            mode.planned_intervals().to_string(),
        )?;

        Ok(Self {
            broker,
            subscription,
            state,
            log,
            printer_ready: false,
        })
    }

    /// Returns the subscriber id of this engine.
    pub fn id(&self) -> SubscriberId {
        self.subscription.subscriber()
    }

    /// Runs until the countdown completes or is terminated.
    ///
    /// Always unsubscribes and publishes exactly one `TimerFinished` on the
    /// way out, including when the loop fails.
    pub async fn run(mut self) -> Result<(), CountdownError> {
        let outcome = self.run_loop().await;
        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(err) => {
                warn!(error = %err, "countdown failed");
                FinishReason::Terminated
            }
        };
        let finished = self.finish(reason);
        outcome?;
        finished
    }

    async fn run_loop(&mut self) -> Result<FinishReason, CountdownError> {
        // WaitingForRenderer
        while !self.printer_ready {
            let Some(message) = self.subscription.recv().await else {
                return Err(BrokerError::Closed.into());
            };
            if self.handle(message)? == Flow::Terminate {
                return Ok(FinishReason::Terminated);
            }
        }

        self.broker
            .emit_with(EventKind::TimerInit, self.projected_finish())?;
        info!(mode = ?self.state.mode(), "countdown started");

        loop {
            if self.poll_events()? == Flow::Terminate {
                return Ok(FinishReason::Terminated);
            }
            if self.state.paused {
                sleep(PAUSED_POLL).await;
                continue;
            }

            self.broker.emit_with(
                EventKind::TimeChange,
                format_hms(self.state.remaining_seconds),
            )?;
            if self.wait_tick().await? == Flow::Terminate {
                return Ok(FinishReason::Terminated);
            }

            for transition in self.state.tick() {
                self.apply(transition)?;
            }
            if self.state.is_finished() {
                return Ok(FinishReason::Completed);
            }
        }
    }

    /// Sleeps one tick, handling events as they arrive.
    ///
    /// A termination ends the wait at once; the pending second is never
    /// counted.
    async fn wait_tick(&mut self) -> Result<Flow, CountdownError> {
        let tick = sleep(TICK);
        tokio::pin!(tick);

        loop {
            tokio::select! {
                _ = &mut tick => return self.poll_events(),
                message = self.subscription.recv() => {
                    let Some(message) = message else {
                        return Err(BrokerError::Closed.into());
                    };
                    if self.handle(message)? == Flow::Terminate {
                        return Ok(Flow::Terminate);
                    }
                }
            }
        }
    }

    /// Handles every queued event without waiting.
    fn poll_events(&mut self) -> Result<Flow, CountdownError> {
        while let Some(message) = self.subscription.try_next() {
            if self.handle(message)? == Flow::Terminate {
                return Ok(Flow::Terminate);
            }
        }
        Ok(Flow::Continue)
    }

    fn handle(&mut self, message: EventMessage) -> Result<Flow, CountdownError> {
        debug!(event = %message, "countdown event");
        match message.kind {
            EventKind::PrinterReady => self.printer_ready = true,
            EventKind::StopTimer => {
                if !self.state.paused {
                    self.state.pause();
                    self.broker.emit(EventKind::TimerStopped)?;
                    self.broker.emit_with(
                        EventKind::AppMessage,
                        format!(
                            "Timer paused at {}",
                            format_hms(self.state.remaining_seconds)
                        ),
                    )?;
                }
            }
            EventKind::ResumeTimer => {
                if self.state.paused {
                    self.state.resume();
                    let finish = self.projected_finish();
                    self.broker
                        .emit_with(EventKind::TimerResumed, finish.clone())?;
                    self.broker.emit_with(
                        EventKind::AppMessage,
                        format!("Timer resumed, finishing at {finish}"),
                    )?;
                }
            }
            EventKind::Termination => return Ok(Flow::Terminate),
            EventKind::PurposeAdded => {
                self.state.purpose = message.payload.filter(|p| !p.is_empty());
            }
            EventKind::TagChanged => {
                self.state.tag = message.payload.filter(|t| !t.is_empty());
            }
            other => return Err(CountdownError::UnexpectedEvent(other)),
        }
        Ok(Flow::Continue)
    }

    fn apply(&mut self, transition: Transition) -> Result<(), CountdownError> {
        match transition {
            Transition::IntervalCompleted { more_remaining } => {
                let line = format_log_line(
                    Local::now().naive_local(),
                    self.state.tag.as_deref(),
                    self.state.purpose.as_deref(),
                );
                if let Err(err) = self.log.append(&line) {
                    warn!(error = %err, "interval not logged");
                }
                self.broker.emit_with(EventKind::AppMessage, line)?;
                self.broker.emit_with(
                    EventKind::IntervalFinished,
                    self.state.intervals_completed.to_string(),
                )?;
                if more_remaining {
                    self.broker.emit(EventKind::IntervalAudio)?;
                }
            }
            Transition::BreakStarted => self.broker.emit(EventKind::BreakBegin)?,
            Transition::BreakFinished => {
                self.broker.emit(EventKind::BreakFinished)?;
                self.broker.emit(EventKind::IntervalBegin)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self, reason: FinishReason) -> Result<(), CountdownError> {
        self.broker.unsubscribe(self.id(), &SUBSCRIBED_KINDS)?;
        self.broker
            .emit_with(EventKind::TimerFinished, reason.as_str())?;
        info!(reason = reason.as_str(), "countdown finished");
        Ok(())
    }

    /// Wall-clock time the run ends at if it is not paused again.
    fn projected_finish(&self) -> String {
        let pending = i64::try_from(self.state.pending_seconds()).unwrap_or(i64::MAX);
        let finish = Local::now() + ChronoDuration::seconds(pending);
        finish.format("%H:%M").to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::EventBroker;
    use tempfile::TempDir;

    fn create_engine(mode: CountdownMode) -> (BrokerHandle, CountdownEngine, TempDir) {
        let (broker, handle) = EventBroker::new();
        tokio::spawn(broker.run());
        let dir = TempDir::new().unwrap();
        let log = IntervalLog::new(dir.path().join("tomato.log"));
        let engine = CountdownEngine::new(handle.clone(), mode, None, None, log).unwrap();
        (handle, engine, dir)
    }

    fn fixed_one_minute() -> CountdownMode {
        CountdownMode::FixedDuration {
            total_minutes: 1,
            interval_minutes: 1,
        }
    }

    // ------------------------------------------------------------------------
    // Event Handling Tests
    // ------------------------------------------------------------------------

    mod handle_tests {
        use super::*;

        #[tokio::test]
        async fn test_unexpected_event_is_an_error() {
            let (_handle, mut engine, _dir) = create_engine(fixed_one_minute());
            let err = engine
                .handle(EventMessage::new(EventKind::AudioEnded))
                .unwrap_err();
            assert!(matches!(
                err,
                CountdownError::UnexpectedEvent(EventKind::AudioEnded)
            ));
        }

        #[tokio::test]
        async fn test_stop_is_ignored_while_paused() {
            let (handle, mut engine, _dir) = create_engine(fixed_one_minute());
            let mut watcher = handle
                .subscribe(
                    SubscriberId::new(),
                    &[EventKind::TimerStopped, EventKind::Termination],
                )
                .unwrap();

            engine.handle(EventMessage::new(EventKind::StopTimer)).unwrap();
            engine.handle(EventMessage::new(EventKind::StopTimer)).unwrap();
            assert!(engine.state.paused);
            handle.emit(EventKind::Termination).unwrap();

            let mut stopped = 0;
            while let Some(message) = watcher.recv().await {
                match message.kind {
                    EventKind::TimerStopped => stopped += 1,
                    _ => break,
                }
            }
            assert_eq!(stopped, 1);
        }

        #[tokio::test]
        async fn test_tag_and_purpose_updates() {
            let (_handle, mut engine, _dir) = create_engine(fixed_one_minute());
            engine
                .handle(EventMessage::with_payload(EventKind::TagChanged, "deep"))
                .unwrap();
            engine
                .handle(EventMessage::with_payload(EventKind::PurposeAdded, ""))
                .unwrap();

            assert_eq!(engine.state.tag.as_deref(), Some("deep"));
            assert_eq!(engine.state.purpose, None);
            assert!(!engine.state.paused);
        }

        #[tokio::test]
        async fn test_termination_flow() {
            let (_handle, mut engine, _dir) = create_engine(fixed_one_minute());
            let flow = engine
                .handle(EventMessage::new(EventKind::Termination))
                .unwrap();
            assert_eq!(flow, Flow::Terminate);
        }
    }

    // ------------------------------------------------------------------------
    // Run Tests
    // ------------------------------------------------------------------------

    mod run_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_announces_before_running() {
            let (handle, engine, _dir) = create_engine(CountdownMode::IntervalCycle {
                work_minutes: 25,
                break_minutes: 5,
                cycles: 4,
            });
            drop(engine);

            let mut sub = handle
                .subscribe(SubscriberId::new(), &[EventKind::IntervalsPlanned])
                .unwrap();
            let planned = sub.recv().await.unwrap();
            assert_eq!(planned.payload(), Some("4"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_fixed_run_logs_one_interval() {
            let (handle, engine, dir) = create_engine(fixed_one_minute());
            handle.emit(EventKind::PrinterReady).unwrap();
            engine.run().await.unwrap();

            let content = std::fs::read_to_string(dir.path().join("tomato.log")).unwrap();
            assert_eq!(content.lines().filter(|l| !l.is_empty()).count(), 1);

            let mut sub = handle
                .subscribe(
                    SubscriberId::new(),
                    &[
                        EventKind::TimeChange,
                        EventKind::IntervalAudio,
                        EventKind::TimerFinished,
                    ],
                )
                .unwrap();
            let mut changes = 0;
            loop {
                let message = sub.recv().await.unwrap();
                match message.kind {
                    EventKind::TimeChange => changes += 1,
                    EventKind::IntervalAudio => panic!("last interval must not trigger audio"),
                    EventKind::TimerFinished => {
                        assert_eq!(message.payload(), Some("completed"));
                        break;
                    }
                    _ => unreachable!(),
                }
            }
            assert_eq!(changes, 60);
        }

        #[tokio::test(start_paused = true)]
        async fn test_termination_while_waiting_for_renderer() {
            let (handle, engine, dir) = create_engine(fixed_one_minute());
            handle.emit(EventKind::Termination).unwrap();
            engine.run().await.unwrap();

            assert!(!dir.path().join("tomato.log").exists());
            let mut sub = handle
                .subscribe(SubscriberId::new(), &[EventKind::TimerFinished, EventKind::TimerInit])
                .unwrap();
            let message = sub.recv().await.unwrap();
            assert_eq!(message.kind, EventKind::TimerFinished);
            assert_eq!(message.payload(), Some("terminated"));
        }
    }
}
