//! Sound player implementation using rodio.
//!
//! Every cue gets its own output thread: the rodio `OutputStream` is not
//! `Send`, so the thread opens the device, plays the file and reports back
//! over crossbeam channels.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, Sink, Source};
use tracing::{debug, warn};

use super::error::SoundError;
use super::{Playback, SoundPlayer};

/// How often the output thread checks for a stop request.
const STOP_POLL: Duration = Duration::from_millis(50);

/// A sound player that uses rodio for audio playback.
pub struct RodioSoundPlayer {
    /// Set by `--no-sound`; every cue then ends immediately.
    disabled: bool,
}

impl RodioSoundPlayer {
    /// Creates a new sound player.
    ///
    /// The audio device is opened lazily by each cue, so creating a player
    /// never fails.
    #[must_use]
    pub fn new(disabled: bool) -> Self {
        Self { disabled }
    }

    /// Returns true if sound playback is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, path: &Path) -> Result<Playback, SoundError> {
        if self.is_disabled() {
            debug!("Sound playback disabled, skipping");
            return Ok(Playback::finished());
        }

        let (ready_tx, ready_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(0);
        let owned_path = path.to_path_buf();

        thread::Builder::new()
            .name("tomato-audio".to_string())
            .spawn(move || output_thread(owned_path, ready_tx, stop_rx, done_tx))
            .map_err(|e| SoundError::PlaybackError(e.to_string()))?;

        let duration = ready_rx
            .recv()
            .map_err(|_| SoundError::PlaybackError("audio thread exited".to_string()))??;
        debug!(path = %path.display(), ?duration, "Sound playback started");

        Ok(Playback::new(stop_tx, done_rx))
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Body of the per-cue output thread. Dropping `done_tx` signals the end.
fn output_thread(
    path: PathBuf,
    ready_tx: Sender<Result<Option<Duration>, SoundError>>,
    stop_rx: Receiver<()>,
    done_tx: Sender<()>,
) {
    let _done = done_tx;

    let (_stream, sink, duration) = match open_sink(&path) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    if ready_tx.send(Ok(duration)).is_err() {
        return;
    }

    while !sink.empty() {
        match stop_rx.recv_timeout(STOP_POLL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop();
                debug!(path = %path.display(), "Sound playback stopped early");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Opens the default device and queues the decoded file.
fn open_sink(path: &Path) -> Result<(OutputStream, Sink, Option<Duration>), SoundError> {
    let file = File::open(path)
        .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
    let decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| SoundError::DecodeError(e.to_string()))?;
    let duration = decoder.total_duration();

    let (stream, handle) =
        OutputStream::try_default().map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;
    let sink = Sink::try_new(&handle).map_err(|e| SoundError::StreamError(e.to_string()))?;
    sink.append(decoder);

    if duration.is_none() {
        warn!(path = %path.display(), "Sound duration unknown, playing until the source ends");
    }
    Ok((stream, sink, duration))
}
