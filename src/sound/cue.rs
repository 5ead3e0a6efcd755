//! Sound cue worker.
//!
//! A cue plays one file and reports the end on the broker. Short cues mark
//! interval and break boundaries; the completion cue plays when the run ends
//! and can be cut off with an `AudioTerminate` addressed to its id.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use super::{Playback, SoundPlayer};
use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::types::{EventKind, SubscriberId};

/// How often a running cue checks for completion and cutoff.
const POLL: Duration = Duration::from_millis(100);

/// Which cue is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    /// Between intervals or after a break.
    Short,
    /// End of the whole run.
    Completion,
}

impl CueKind {
    /// Event published when the cue ends.
    pub fn end_event(&self) -> EventKind {
        match self {
            CueKind::Short => EventKind::AudioStopped,
            CueKind::Completion => EventKind::AudioEnded,
        }
    }
}

/// One sound cue, spawned as its own task.
pub struct SoundCue {
    broker: BrokerHandle,
    player: Arc<dyn SoundPlayer>,
    path: PathBuf,
    kind: CueKind,
    id: SubscriberId,
    terminate: Option<Subscription>,
}

impl SoundCue {
    /// Creates a cue. A completion cue subscribes to `AudioTerminate` here, so
    /// a cutoff published right after spawning is not missed.
    pub fn new(
        broker: BrokerHandle,
        player: Arc<dyn SoundPlayer>,
        path: PathBuf,
        kind: CueKind,
    ) -> Result<Self, BrokerError> {
        let id = SubscriberId::new();
        let terminate = match kind {
            CueKind::Completion => Some(broker.subscribe(id, &[EventKind::AudioTerminate])?),
            CueKind::Short => None,
        };
        Ok(Self {
            broker,
            player,
            path,
            kind,
            id,
            terminate,
        })
    }

    /// Id that `AudioTerminate` must carry to cut this cue off.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Plays the file and publishes the end event, even when playback fails.
    pub async fn run(mut self) -> Result<(), BrokerError> {
        self.broker
            .emit_with(EventKind::AudioPlayback, self.path.display().to_string())?;

        let player = Arc::clone(&self.player);
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || player.play(&path)).await {
            Ok(Ok(playback)) => self.wait(playback).await,
            Ok(Err(e)) => warn!(
                path = %self.path.display(),
                error = %e,
                suggestion = e.suggestion(),
                "sound cue failed"
            ),
            Err(e) => warn!(error = %e, "sound cue task failed"),
        }

        if self.terminate.take().is_some() {
            self.broker.unsubscribe(self.id, &[EventKind::AudioTerminate])?;
        }
        self.broker.emit(self.kind.end_event())?;
        debug!(kind = ?self.kind, "sound cue ended");
        Ok(())
    }

    async fn wait(&mut self, playback: Playback) {
        loop {
            if playback.is_finished() {
                return;
            }
            if self.cut_off() {
                playback.stop();
                while !playback.is_finished() {
                    sleep(POLL).await;
                }
                return;
            }
            sleep(POLL).await;
        }
    }

    /// Returns true if an `AudioTerminate` addressed to this cue arrived.
    fn cut_off(&mut self) -> bool {
        let Some(subscription) = self.terminate.as_mut() else {
            return false;
        };
        subscription
            .drain()
            .iter()
            .any(|message| self.id.is_addressed_by(message.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::EventBroker;
    use crate::sound::MockSoundPlayer;

    async fn next_end(broker: &BrokerHandle) -> EventKind {
        let mut sub = broker
            .subscribe(
                SubscriberId::new(),
                &[EventKind::AudioStopped, EventKind::AudioEnded],
            )
            .unwrap();
        sub.recv().await.unwrap().kind
    }

    #[tokio::test]
    async fn test_short_cue_reports_stopped() {
        let (_task, broker) = EventBroker::spawn();
        let player = Arc::new(MockSoundPlayer::new());
        let cue = SoundCue::new(
            broker.clone(),
            player.clone(),
            PathBuf::from("between.production"),
            CueKind::Short,
        )
        .unwrap();

        cue.run().await.unwrap();
        assert_eq!(next_end(&broker).await, EventKind::AudioStopped);
        assert_eq!(player.play_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_playback_still_reports_end() {
        let (_task, broker) = EventBroker::spawn();
        let player = Arc::new(MockSoundPlayer::new());
        player.set_should_fail(true);
        let cue = SoundCue::new(
            broker.clone(),
            player,
            PathBuf::from("finish.production"),
            CueKind::Completion,
        )
        .unwrap();

        cue.run().await.unwrap();
        assert_eq!(next_end(&broker).await, EventKind::AudioEnded);
    }

    #[tokio::test]
    async fn test_completion_cue_is_cut_off_by_own_id_only() {
        let (_task, broker) = EventBroker::spawn();
        let player = Arc::new(MockSoundPlayer::new());
        player.set_hold(true);
        let cue = SoundCue::new(
            broker.clone(),
            player.clone(),
            PathBuf::from("finish.production"),
            CueKind::Completion,
        )
        .unwrap();
        let id = cue.id();

        broker
            .emit_with(EventKind::AudioTerminate, SubscriberId::new().to_string())
            .unwrap();
        let task = tokio::spawn(cue.run());
        sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished());

        broker
            .emit_with(EventKind::AudioTerminate, id.to_string())
            .unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(next_end(&broker).await, EventKind::AudioEnded);
        assert_eq!(player.stop_requests(), 1);
    }
}
