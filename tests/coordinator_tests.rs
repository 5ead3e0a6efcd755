//! End-to-end tests for the main coordinator.
//!
//! Every run uses a real broker, mock sound and notification collaborators,
//! a [`NullTarget`] renderer and keys fed through a channel. Time is paused,
//! so minute-long runs finish instantly.

use std::future::{pending, Future};
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use tomato_clock::broker::{BrokerHandle, EventBroker};
use tomato_clock::config::{AppConfig, SoundSet};
use tomato_clock::coordinator::{
    ChildKind, Collaborators, CoordinatorError, MainCoordinator, RunOutcome, RunSettings,
};
use tomato_clock::keys::KeyInput;
use tomato_clock::notification::MockNotifier;
use tomato_clock::render::NullTarget;
use tomato_clock::sound::MockSoundPlayer;
use tomato_clock::types::{EventKind, SubscriberId};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    broker: BrokerHandle,
    sound: Arc<MockSoundPlayer>,
    notifier: Arc<MockNotifier>,
    keys: Sender<KeyInput>,
    config: AppConfig,
    dir: TempDir,
    collaborators: Option<Collaborators<NullTarget>>,
}

impl Harness {
    fn new(can_pause: bool) -> Self {
        let (_task, broker) = EventBroker::spawn();
        let dir = TempDir::new().unwrap();
        let sound = Arc::new(MockSoundPlayer::new());
        let notifier = Arc::new(MockNotifier::new());
        let (keys, keys_rx) = unbounded();

        let config = AppConfig {
            interval_minutes: 1,
            break_minutes: 1,
            log_path: dir.path().join("intervals.log"),
            sounds: SoundSet {
                finish: PathBuf::from("finish.test"),
                between: PathBuf::from("between.test"),
                break_finish: PathBuf::from("break_finish.test"),
            },
            can_pause,
            allowed_tags: vec!["work".to_string()],
        };

        let collaborators = Collaborators {
            sound: sound.clone(),
            notifier: notifier.clone(),
            target: NullTarget,
            keys: keys_rx,
        };

        Self {
            broker,
            sound,
            notifier,
            keys,
            config,
            dir,
            collaborators: Some(collaborators),
        }
    }

    fn press(&self, keys: &[KeyInput]) {
        for key in keys {
            self.keys.send(*key).unwrap();
        }
    }

    fn spawn<F>(
        &mut self,
        settings: RunSettings,
        interrupt: F,
    ) -> JoinHandle<Result<RunOutcome, CoordinatorError>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let collaborators = self.collaborators.take().unwrap();
        let coordinator =
            MainCoordinator::new(self.broker.clone(), settings, collaborators).unwrap();
        tokio::spawn(coordinator.run(interrupt))
    }

    fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("intervals.log"))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    /// Kinds published so far, in order, restricted to `kinds`.
    async fn history(&self, kinds: &[EventKind]) -> Vec<EventKind> {
        let mut all = kinds.to_vec();
        all.push(EventKind::IntervalsPlanned);
        let mut sub = self.broker.subscribe(SubscriberId::new(), &all).unwrap();
        self.broker.emit(EventKind::IntervalsPlanned).unwrap();

        let mut seen = Vec::new();
        let mut planned = 0;
        while let Some(message) = sub.recv().await {
            if message.kind == EventKind::IntervalsPlanned {
                // the engine's own announcement comes first, ours last
                planned += 1;
                if planned == 2 {
                    break;
                }
                continue;
            }
            seen.push(message.kind);
        }
        seen
    }
}

fn chars(text: &str) -> Vec<KeyInput> {
    text.chars().map(KeyInput::Char).collect()
}

// ============================================================================
// Completion Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_completes_with_notification_and_log() {
    let mut harness = Harness::new(false);
    let settings = RunSettings::timer(&harness.config, 1, Some("work".into()), None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.log_lines().len(), 1);
    assert!(harness.log_lines()[0].ends_with(" , #work"));

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].summary, "Timer of 1 minutes finished for task work.");
    assert_eq!(
        harness.sound.get_play_calls(),
        vec![PathBuf::from("finish.test")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pomodoro_plays_cues_at_transitions() {
    let mut harness = Harness::new(false);
    let settings = RunSettings::pomodoro(&harness.config, 2, None, None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.log_lines().len(), 2);
    assert_eq!(
        harness.sound.get_play_calls(),
        vec![
            PathBuf::from("between.test"),
            PathBuf::from("break_finish.test"),
            PathBuf::from("finish.test"),
        ]
    );
    assert_eq!(harness.notifier.sent()[0].summary, "2 pomodoros finished.");
}

#[tokio::test(start_paused = true)]
async fn test_stop_cuts_off_completion_cue() {
    let mut harness = Harness::new(false);
    harness.sound.set_hold(true);
    let settings = RunSettings::timer(&harness.config, 1, None, None);
    let run = harness.spawn(settings, pending());

    sleep(Duration::from_secs(90)).await;
    assert!(!run.is_finished());
    harness.press(&chars("s"));

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.sound.stop_requests(), 1);
}

// ============================================================================
// Keyboard Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_key_terminates_run() {
    let mut harness = Harness::new(false);
    harness.press(&chars("s"));
    let settings = RunSettings::timer(&harness.config, 25, None, None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert!(harness.log_lines().is_empty());
    assert!(harness.notifier.sent().is_empty());
    assert_eq!(harness.sound.play_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pause_is_refused_when_not_allowed() {
    let mut harness = Harness::new(false);
    harness.press(&chars("ps"));
    let settings = RunSettings::pomodoro(&harness.config, 1, None, None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);

    let seen = harness
        .history(&[
            EventKind::KeyPressed,
            EventKind::StopTimer,
            EventKind::Termination,
        ])
        .await;
    assert_eq!(
        seen,
        vec![
            EventKind::KeyPressed,
            EventKind::KeyPressed,
            EventKind::Termination,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_keys() {
    let mut harness = Harness::new(true);
    harness.press(&chars("pp"));
    let settings = RunSettings::pomodoro(&harness.config, 1, None, None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let seen = harness
        .history(&[EventKind::StopTimer, EventKind::ResumeTimer])
        .await;
    assert_eq!(seen, vec![EventKind::StopTimer, EventKind::ResumeTimer]);
}

#[tokio::test(start_paused = true)]
async fn test_purpose_entry_reaches_the_log() {
    let mut harness = Harness::new(false);
    let mut keys = chars("iab");
    keys.push(KeyInput::Enter);
    harness.press(&keys);

    let settings = RunSettings::timer(&harness.config, 1, None, None);
    let outcome = harness.spawn(settings, pending()).await.unwrap().unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    let lines = harness.log_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" , , ab"), "unexpected line {}", lines[0]);
}

#[tokio::test(start_paused = true)]
async fn test_stopwatch_toggle() {
    let mut harness = Harness::new(false);
    let settings = RunSettings::timer(&harness.config, 5, None, None);
    let run = harness.spawn(settings, pending());

    harness.press(&chars("t"));
    sleep(Duration::from_secs(70)).await;
    harness.press(&chars("t"));
    sleep(Duration::from_secs(1)).await;
    harness.press(&chars("s"));
    assert_eq!(run.await.unwrap().unwrap(), RunOutcome::Stopped);

    let seen = harness
        .history(&[EventKind::StopStopwatch, EventKind::Termination])
        .await;
    assert_eq!(seen, vec![EventKind::StopStopwatch, EventKind::Termination]);
}

// ============================================================================
// Interrupt Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_interrupt_terminates_every_child() {
    let mut harness = Harness::new(false);
    let settings = RunSettings::timer(&harness.config, 25, None, None);
    let outcome = harness
        .spawn(settings, sleep(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            terminated: vec![ChildKind::Countdown, ChildKind::Renderer, ChildKind::Notifier],
        }
    );
    assert!(harness.log_lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_terminates_stopwatch_and_held_cue() {
    let mut harness = Harness::new(false);
    harness.sound.set_hold(true);
    harness.press(&chars("t"));
    let settings = RunSettings::timer(&harness.config, 1, None, None);
    let outcome = harness
        .spawn(settings, sleep(Duration::from_secs(90)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            terminated: vec![
                ChildKind::Countdown,
                ChildKind::Renderer,
                ChildKind::Notifier,
                ChildKind::Stopwatch,
                ChildKind::CompletionCue,
            ],
        }
    );
    assert_eq!(harness.log_lines().len(), 1);
    assert_eq!(
        harness.sound.get_play_calls(),
        vec![PathBuf::from("finish.test")]
    );
}
