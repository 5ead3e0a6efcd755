//! Handles of every worker the coordinator spawned.
//!
//! The coordinator is the only owner of these handles; nobody else joins or
//! aborts a child.

use std::fmt;
use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::CoordinatorError;
use crate::types::SubscriberId;

type Child = JoinHandle<anyhow::Result<()>>;

/// Which worker a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Countdown,
    Renderer,
    Notifier,
    Stopwatch,
    CompletionCue,
    ShortCue,
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChildKind::Countdown => "countdown",
            ChildKind::Renderer => "renderer",
            ChildKind::Notifier => "notifier",
            ChildKind::Stopwatch => "stopwatch",
            ChildKind::CompletionCue => "completion cue",
            ChildKind::ShortCue => "short cue",
        };
        f.write_str(name)
    }
}

/// Spawns a worker future, erasing its error type.
fn spawn<F, E>(future: F) -> Child
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::spawn(async move { future.await.map_err(anyhow::Error::from) })
}

/// Owned child handles.
#[derive(Default)]
pub struct ChildSet {
    countdown: Option<Child>,
    renderer: Option<Child>,
    notifier: Option<Child>,
    stopwatch: Option<(SubscriberId, Child)>,
    completion_cue: Option<(SubscriberId, Child)>,
    short_cues: Vec<Child>,
}

impl ChildSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the countdown. At most one may exist per run.
    pub fn spawn_countdown<F, E>(&mut self, future: F) -> Result<(), CoordinatorError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        if self.countdown.is_some() {
            return Err(CoordinatorError::AlreadyRunning);
        }
        self.countdown = Some(spawn(future));
        Ok(())
    }

    pub fn spawn_renderer<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.renderer = Some(spawn(future));
    }

    pub fn spawn_notifier<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.notifier = Some(spawn(future));
    }

    pub fn spawn_stopwatch<F, E>(&mut self, id: SubscriberId, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.stopwatch = Some((id, spawn(future)));
    }

    pub fn spawn_completion_cue<F, E>(&mut self, id: SubscriberId, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.completion_cue = Some((id, spawn(future)));
    }

    pub fn spawn_short_cue<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.short_cues.push(spawn(future));
    }

    /// Id of the running stopwatch, if any.
    pub fn stopwatch_id(&self) -> Option<SubscriberId> {
        self.stopwatch.as_ref().map(|(id, _)| *id)
    }

    /// Id of the running completion cue, if any.
    pub fn completion_cue_id(&self) -> Option<SubscriberId> {
        self.completion_cue.as_ref().map(|(id, _)| *id)
    }

    /// Waits for the countdown. A countdown failure is fatal for the run.
    pub async fn join_countdown(&mut self) -> Result<(), CoordinatorError> {
        let Some(handle) = self.countdown.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CoordinatorError::ChildFailed {
                kind: ChildKind::Countdown,
                message: e.to_string(),
            }),
            Err(e) => Err(CoordinatorError::ChildFailed {
                kind: ChildKind::Countdown,
                message: e.to_string(),
            }),
        }
    }

    pub async fn join_renderer(&mut self) {
        if let Some(handle) = self.renderer.take() {
            join(ChildKind::Renderer, handle).await;
        }
    }

    pub async fn join_notifier(&mut self) {
        if let Some(handle) = self.notifier.take() {
            join(ChildKind::Notifier, handle).await;
        }
    }

    pub async fn join_stopwatch(&mut self) {
        if let Some((_, handle)) = self.stopwatch.take() {
            join(ChildKind::Stopwatch, handle).await;
        }
    }

    pub async fn join_completion_cue(&mut self) {
        if let Some((_, handle)) = self.completion_cue.take() {
            join(ChildKind::CompletionCue, handle).await;
        }
    }

    pub async fn join_short_cues(&mut self) {
        for handle in self.short_cues.drain(..) {
            join(ChildKind::ShortCue, handle).await;
        }
    }

    /// Aborts every child and waits until each one is gone.
    ///
    /// Returns the kinds that were terminated, in a fixed order.
    pub async fn terminate_all(&mut self) -> Vec<ChildKind> {
        let mut handles: Vec<(ChildKind, Child)> = Vec::new();
        handles.extend(self.countdown.take().map(|h| (ChildKind::Countdown, h)));
        handles.extend(self.renderer.take().map(|h| (ChildKind::Renderer, h)));
        handles.extend(self.notifier.take().map(|h| (ChildKind::Notifier, h)));
        handles.extend(self.stopwatch.take().map(|(_, h)| (ChildKind::Stopwatch, h)));
        handles.extend(
            self.completion_cue
                .take()
                .map(|(_, h)| (ChildKind::CompletionCue, h)),
        );
        handles.extend(self.short_cues.drain(..).map(|h| (ChildKind::ShortCue, h)));

        for (_, handle) in &handles {
            handle.abort();
        }

        let mut terminated = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            match handle.await {
                Err(e) if e.is_cancelled() => debug!(child = %kind, "child aborted"),
                Err(e) => warn!(child = %kind, error = %e, "child panicked"),
                Ok(Err(e)) => warn!(child = %kind, error = %e, "child failed"),
                Ok(Ok(())) => debug!(child = %kind, "child had already finished"),
            }
            terminated.push(kind);
        }
        terminated
    }
}

async fn join(kind: ChildKind, handle: Child) {
    match handle.await {
        Ok(Ok(())) => debug!(child = %kind, "child finished"),
        Ok(Err(e)) => warn!(child = %kind, error = %e, "child failed"),
        Err(e) => warn!(child = %kind, error = %e, "child task failed"),
    }
}
