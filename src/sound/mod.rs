//! Sound playback system.
//!
//! This module provides audio cues for interval transitions:
//!
//! - A `SoundPlayer` seam with a rodio backend and a mock
//! - Cancellable `Playback` handles
//! - The `SoundCue` worker that announces playback on the broker
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  play()   ┌──────────────────┐
//! │    SoundCue      │──────────▶│   SoundPlayer    │
//! │  (tokio task)    │           └────────┬─────────┘
//! └────────┬─────────┘                    │ spawns
//!          │ Playback (stop / finished)   ▼
//!          │◀─────────────────── ┌──────────────────┐
//!          │   crossbeam-channel │  output thread   │
//!          ▼                     │  (rodio Sink)    │
//!     EventBroker                └──────────────────┘
//! ```

mod cue;
mod error;
mod player;

pub use cue::{CueKind, SoundCue};
pub use error::SoundError;
pub use player::RodioSoundPlayer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Trait for sound playback implementations.
pub trait SoundPlayer: Send + Sync {
    /// Starts playing the file at `path`.
    ///
    /// Blocks until the output is running, then returns a handle; the sound
    /// keeps playing in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded, or if no
    /// audio device is available.
    fn play(&self, path: &Path) -> Result<Playback, SoundError>;
}

// ============================================================================
// Playback
// ============================================================================

/// Handle to one running sound. Dropping it stops the sound.
#[derive(Debug)]
pub struct Playback {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Playback {
    pub(crate) fn new(stop_tx: Sender<()>, done_rx: Receiver<()>) -> Self {
        Self { stop_tx, done_rx }
    }

    /// A playback that has already ended.
    #[must_use]
    pub fn finished() -> Self {
        let (stop_tx, _) = bounded(1);
        let (_, done_rx) = bounded(0);
        Self { stop_tx, done_rx }
    }

    /// Returns true once the output has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.done_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Asks the output to stop early.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }
}

// ============================================================================
// MockSoundPlayer
// ============================================================================

/// Mock sound player for testing.
///
/// By default every playback finishes immediately. With `set_hold(true)`
/// playbacks keep running until they are stopped or dropped.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<PathBuf>>,
    should_fail: AtomicBool,
    hold: AtomicBool,
    stop_requests: Arc<AtomicUsize>,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<PathBuf> {
        self.play_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of held playbacks stopped through [`Playback::stop`].
    #[must_use]
    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, path: &Path) -> Result<Playback, SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if let Ok(mut calls) = self.play_calls.lock() {
            calls.push(path.to_path_buf());
        }
        if !self.hold.load(Ordering::SeqCst) {
            return Ok(Playback::finished());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(0);
        let stop_requests = Arc::clone(&self.stop_requests);
        thread::spawn(move || {
            let _done = done_tx;
            if stop_rx.recv().is_ok() {
                stop_requests.fetch_add(1, Ordering::SeqCst);
            }
        });
        Ok(Playback::new(stop_tx, done_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_finished(playback: &Playback) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if playback.is_finished() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_finished_playback() {
        let playback = Playback::finished();
        assert!(playback.is_finished());
        playback.stop();
    }

    #[test]
    fn test_mock_records_calls() {
        let player = MockSoundPlayer::new();
        let playback = player.play(Path::new("/sounds/between.production")).unwrap();

        assert!(playback.is_finished());
        assert_eq!(player.play_count(), 1);
        assert_eq!(
            player.get_play_calls(),
            vec![PathBuf::from("/sounds/between.production")]
        );
    }

    #[test]
    fn test_mock_failure() {
        let player = MockSoundPlayer::new();
        player.set_should_fail(true);
        assert!(player.play(Path::new("x")).is_err());
        assert_eq!(player.play_count(), 0);
    }

    #[test]
    fn test_held_playback_stops_on_request() {
        let player = MockSoundPlayer::new();
        player.set_hold(true);

        let playback = player.play(Path::new("finish.production")).unwrap();
        assert!(!playback.is_finished());

        playback.stop();
        assert!(wait_finished(&playback));
        assert_eq!(player.stop_requests(), 1);
    }

    #[test]
    fn test_dropping_held_playback_ends_it() {
        let player = MockSoundPlayer::new();
        player.set_hold(true);

        drop(player.play(Path::new("finish.production")).unwrap());
        assert_eq!(player.stop_requests(), 0);
    }
}
