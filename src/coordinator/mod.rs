//! Main coordinator.
//!
//! This module drives one run:
//! - Spawns the countdown, renderer and notifier
//! - Reacts to countdown and audio events (notification, sound cues)
//! - Dispatches keyboard commands while no prompt is open
//! - Shuts every child down, gracefully or by force on interrupt

mod children;
mod command;

pub use children::{ChildKind, ChildSet};
pub use command::KeyCommand;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::config::{AppConfig, SoundSet};
use crate::countdown::{CountdownEngine, CountdownError, CountdownMode, IntervalLog};
use crate::keys::KeyInput;
use crate::notification::{completion_content, NotificationWorker, Notifier, RunSummary};
use crate::render::{DrawTarget, Renderer};
use crate::sound::{CueKind, SoundCue, SoundPlayer};
use crate::stopwatch::Stopwatch;
use crate::types::{EventKind, EventMessage, FinishReason, SubscriberId};

/// Loop period.
const POLL: Duration = Duration::from_millis(100);

const SUBSCRIBED_KINDS: [EventKind; 7] = [
    EventKind::TimerFinished,
    EventKind::IntervalAudio,
    EventKind::BreakFinished,
    EventKind::AudioEnded,
    EventKind::PurposeFinished,
    EventKind::TagFinished,
    EventKind::TagChanged,
];

// ============================================================================
// Errors and results
// ============================================================================

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Countdown(#[from] CountdownError),

    /// A kind arrived that the coordinator has no case for.
    #[error("coordinator received unexpected event: {0}")]
    UnexpectedEvent(EventKind),

    #[error("a countdown is already running")]
    AlreadyRunning,

    #[error("{kind} failed: {message}")]
    ChildFailed { kind: ChildKind, message: String },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The countdown completed and the completion cue ended.
    Completed,
    /// The user stopped the countdown.
    Stopped,
    /// The run was interrupted; these children were aborted.
    Interrupted { terminated: Vec<ChildKind> },
}

// ============================================================================
// RunSettings
// ============================================================================

/// Everything a run needs from the command line and the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub mode: CountdownMode,
    pub tag: Option<String>,
    pub purpose: Option<String>,
    pub can_pause: bool,
    pub log_path: PathBuf,
    pub sounds: SoundSet,
    pub allowed_tags: Vec<String>,
}

impl RunSettings {
    /// A fixed run of `minutes`. Timers can always be paused.
    pub fn timer(
        config: &AppConfig,
        minutes: u32,
        tag: Option<String>,
        purpose: Option<String>,
    ) -> Self {
        Self::from_config(
            config,
            CountdownMode::FixedDuration {
                total_minutes: minutes,
                interval_minutes: config.interval_minutes,
            },
            true,
            tag,
            purpose,
        )
    }

    /// A cycle run of `count` pomodoros.
    pub fn pomodoro(
        config: &AppConfig,
        count: u32,
        tag: Option<String>,
        purpose: Option<String>,
    ) -> Self {
        Self::from_config(
            config,
            CountdownMode::IntervalCycle {
                work_minutes: config.interval_minutes,
                break_minutes: config.break_minutes,
                cycles: count,
            },
            config.can_pause,
            tag,
            purpose,
        )
    }

    fn from_config(
        config: &AppConfig,
        mode: CountdownMode,
        can_pause: bool,
        tag: Option<String>,
        purpose: Option<String>,
    ) -> Self {
        Self {
            mode,
            tag,
            purpose,
            can_pause,
            log_path: config.log_path.clone(),
            sounds: config.sounds.clone(),
            allowed_tags: config.allowed_tags.clone(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        match self.mode {
            CountdownMode::FixedDuration { total_minutes, .. } => RunSummary::Timer {
                minutes: total_minutes,
            },
            CountdownMode::IntervalCycle { cycles, .. } => RunSummary::Pomodoros { count: cycles },
        }
    }
}

/// Injected seams: audio, notifications, drawing and keys.
pub struct Collaborators<T: DrawTarget> {
    pub sound: Arc<dyn SoundPlayer>,
    pub notifier: Arc<dyn Notifier>,
    pub target: T,
    pub keys: Receiver<KeyInput>,
}

// ============================================================================
// MainCoordinator
// ============================================================================

#[derive(Debug, Default)]
struct CoordinatorState {
    paused: bool,
    must_finish: bool,
    in_input_mode: bool,
    countdown_done: bool,
    completed: bool,
}

pub struct MainCoordinator<T: DrawTarget> {
    broker: BrokerHandle,
    subscription: Subscription,
    settings: RunSettings,
    sound: Arc<dyn SoundPlayer>,
    notifier: Arc<dyn Notifier>,
    target: Option<T>,
    keys: Receiver<KeyInput>,
    tag: Option<String>,
    children: ChildSet,
    state: CoordinatorState,
}

impl<T: DrawTarget> MainCoordinator<T> {
    pub fn new(
        broker: BrokerHandle,
        settings: RunSettings,
        collaborators: Collaborators<T>,
    ) -> Result<Self, CoordinatorError> {
        let subscription = broker.subscribe(SubscriberId::new(), &SUBSCRIBED_KINDS)?;
        Ok(Self {
            broker,
            subscription,
            tag: settings.tag.clone(),
            settings,
            sound: collaborators.sound,
            notifier: collaborators.notifier,
            target: Some(collaborators.target),
            keys: collaborators.keys,
            children: ChildSet::new(),
            state: CoordinatorState::default(),
        })
    }

    /// Runs until the run finishes or `interrupt` resolves.
    pub async fn run<F>(mut self, interrupt: F) -> Result<RunOutcome, CoordinatorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let result = match self.start() {
            Ok(()) => loop {
                if self.state.must_finish {
                    break Ok(());
                }
                if let Err(e) = self.step().await {
                    break Err(e);
                }
                tokio::select! {
                    _ = &mut interrupt => {
                        info!("interrupted");
                        return self.forced_shutdown().await;
                    }
                    _ = sleep(POLL) => {}
                }
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.graceful_shutdown().await,
            Err(e) => {
                warn!(error = %e, "run failed, terminating children");
                self.forced_shutdown().await?;
                Err(e)
            }
        }
    }

    fn start(&mut self) -> Result<(), CoordinatorError> {
        let engine = CountdownEngine::new(
            self.broker.clone(),
            self.settings.mode,
            self.settings.tag.clone(),
            self.settings.purpose.clone(),
            IntervalLog::new(self.settings.log_path.clone()),
        )?;
        self.children.spawn_countdown(engine.run())?;

        if let Some(target) = self.target.take() {
            let renderer = Renderer::new(
                self.broker.clone(),
                target,
                self.keys.clone(),
                self.settings.allowed_tags.clone(),
            )?;
            self.children.spawn_renderer(renderer.run());
        }

        let notifier = NotificationWorker::new(self.broker.clone(), Arc::clone(&self.notifier))?;
        self.children.spawn_notifier(notifier.run());

        info!(mode = ?self.settings.mode, "run started");
        Ok(())
    }

    async fn step(&mut self) -> Result<(), CoordinatorError> {
        for message in self.subscription.drain() {
            self.handle_event(message)?;
        }
        if self.state.in_input_mode || self.state.must_finish {
            return Ok(());
        }
        if let Ok(key) = self.keys.try_recv() {
            if let Some(command) = KeyCommand::from_key(key) {
                self.handle_command(command).await?;
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, message: EventMessage) -> Result<(), CoordinatorError> {
        debug!(event = %message, "coordinator event");
        match message.kind {
            EventKind::TimerFinished => {
                self.state.countdown_done = true;
                match FinishReason::from_payload(message.payload()) {
                    FinishReason::Completed => self.on_completed()?,
                    FinishReason::Terminated => {
                        self.broker
                            .emit_with(EventKind::AppMessage, "Timer stopped")?;
                        self.state.must_finish = true;
                    }
                }
            }
            EventKind::IntervalAudio => self.spawn_short_cue(self.settings.sounds.between.clone())?,
            EventKind::BreakFinished => {
                self.spawn_short_cue(self.settings.sounds.break_finish.clone())?
            }
            EventKind::AudioEnded => {
                self.state.completed = true;
                self.state.must_finish = true;
            }
            EventKind::PurposeFinished | EventKind::TagFinished => {
                self.state.in_input_mode = false;
            }
            EventKind::TagChanged => {
                self.tag = message.payload.filter(|t| !t.is_empty());
            }
            other => return Err(CoordinatorError::UnexpectedEvent(other)),
        }
        Ok(())
    }

    fn on_completed(&mut self) -> Result<(), CoordinatorError> {
        let content = completion_content(self.settings.summary(), self.tag.as_deref());
        self.broker
            .emit_with(EventKind::Notification, content.to_payload())?;

        let cue = SoundCue::new(
            self.broker.clone(),
            Arc::clone(&self.sound),
            self.settings.sounds.finish.clone(),
            CueKind::Completion,
        )?;
        self.children.spawn_completion_cue(cue.id(), cue.run());
        Ok(())
    }

    fn spawn_short_cue(&mut self, path: PathBuf) -> Result<(), CoordinatorError> {
        let cue = SoundCue::new(
            self.broker.clone(),
            Arc::clone(&self.sound),
            path,
            CueKind::Short,
        )?;
        self.children.spawn_short_cue(cue.run());
        Ok(())
    }

    async fn handle_command(&mut self, command: KeyCommand) -> Result<(), CoordinatorError> {
        debug!(?command, "key command");
        self.broker
            .emit_with(EventKind::KeyPressed, command.key().to_string())?;

        match command {
            KeyCommand::TogglePause => {
                if !self.settings.can_pause || self.state.countdown_done {
                    self.broker
                        .emit_with(EventKind::AppMessage, "Pausing is not available")?;
                    return Ok(());
                }
                self.state.paused = !self.state.paused;
                let kind = if self.state.paused {
                    EventKind::StopTimer
                } else {
                    EventKind::ResumeTimer
                };
                self.broker.emit(kind)?;
            }
            KeyCommand::Stop => match self.children.completion_cue_id() {
                Some(id) => {
                    self.broker
                        .emit_with(EventKind::AudioTerminate, id.to_string())?;
                    self.children.join_completion_cue().await;
                }
                None => self.broker.emit(EventKind::Termination)?,
            },
            KeyCommand::ToggleStopwatch => match self.children.stopwatch_id() {
                Some(id) => {
                    self.broker
                        .emit_with(EventKind::StopStopwatch, id.to_string())?;
                    self.children.join_stopwatch().await;
                }
                None => {
                    let stopwatch = Stopwatch::new(self.broker.clone())?;
                    self.children.spawn_stopwatch(stopwatch.id(), stopwatch.run());
                }
            },
            KeyCommand::AddPurpose => {
                self.broker.emit(EventKind::AddPurpose)?;
                self.state.in_input_mode = true;
            }
            KeyCommand::ChangeTag => {
                self.broker.emit(EventKind::TagChange)?;
                self.state.in_input_mode = true;
            }
        }
        Ok(())
    }

    async fn graceful_shutdown(mut self) -> Result<RunOutcome, CoordinatorError> {
        if let Err(e) = self.children.join_countdown().await {
            warn!(error = %e, "countdown failed, terminating children");
            self.forced_shutdown().await?;
            return Err(e);
        }
        if let Some(id) = self.children.stopwatch_id() {
            self.broker
                .emit_with(EventKind::StopStopwatch, id.to_string())?;
            self.children.join_stopwatch().await;
        }
        self.children.join_completion_cue().await;
        self.children.join_short_cues().await;

        self.broker.emit(EventKind::StopPrinter)?;
        self.children.join_renderer().await;
        self.children.join_notifier().await;

        self.broker
            .unsubscribe(self.subscription.subscriber(), &SUBSCRIBED_KINDS)?;

        let outcome = if self.state.completed {
            RunOutcome::Completed
        } else {
            RunOutcome::Stopped
        };
        info!(?outcome, "run finished");
        Ok(outcome)
    }

    async fn forced_shutdown(mut self) -> Result<RunOutcome, CoordinatorError> {
        let terminated = self.children.terminate_all().await;
        self.broker
            .unsubscribe(self.subscription.subscriber(), &SUBSCRIBED_KINDS)?;
        info!(?terminated, "children terminated");
        Ok(RunOutcome::Interrupted { terminated })
    }
}
