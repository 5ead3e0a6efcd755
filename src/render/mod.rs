//! Terminal renderer.
//!
//! The renderer subscribes to every event kind, folds them into a
//! [`ViewState`] and draws it on a [`DrawTarget`]. It only publishes
//! `PrinterReady` and the results of purpose/tag prompts; while a prompt is
//! open it owns the keyboard.

mod target;
mod view;

pub use target::{DrawTarget, NullTarget, TerminalSession, TerminalTarget};
pub use view::{InputPrompt, InputResult, PromptKind, ViewState};

use crossbeam_channel::Receiver;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::keys::KeyInput;
use crate::types::{EventKind, EventMessage, SubscriberId};

/// Key polling interval while a prompt is open.
const KEY_POLL: Duration = Duration::from_millis(50);

pub struct Renderer<T: DrawTarget> {
    broker: BrokerHandle,
    subscription: Subscription,
    target: T,
    keys: Receiver<KeyInput>,
    view: ViewState,
}

impl<T: DrawTarget> Renderer<T> {
    pub fn new(
        broker: BrokerHandle,
        target: T,
        keys: Receiver<KeyInput>,
        allowed_tags: Vec<String>,
    ) -> Result<Self, BrokerError> {
        let subscription = broker.subscribe(SubscriberId::new(), &EventKind::ALL)?;
        Ok(Self {
            broker,
            subscription,
            target,
            keys,
            view: ViewState::new(allowed_tags),
        })
    }

    /// Draws until `StopPrinter` arrives.
    pub async fn run(mut self) -> Result<(), BrokerError> {
        self.broker.emit(EventKind::PrinterReady)?;
        self.draw();

        loop {
            tokio::select! {
                message = self.subscription.recv() => {
                    let Some(message) = message else { break };
                    if message.kind == EventKind::StopPrinter {
                        break;
                    }
                    self.on_event(&message);
                }
                _ = sleep(KEY_POLL), if self.view.prompt.is_some() => self.poll_keys()?,
            }
        }

        self.broker
            .unsubscribe(self.subscription.subscriber(), &EventKind::ALL)?;
        debug!("renderer stopped");
        Ok(())
    }

    fn on_event(&mut self, message: &EventMessage) {
        if self.view.apply(message) {
            self.draw();
        }
    }

    fn poll_keys(&mut self) -> Result<(), BrokerError> {
        while let Some(prompt) = self.view.prompt.as_mut() {
            let Ok(key) = self.keys.try_recv() else {
                break;
            };
            let kind = prompt.kind();
            match prompt.handle_key(key) {
                Some(result) => {
                    self.view.prompt = None;
                    self.publish_result(kind, result)?;
                }
                None => self.draw(),
            }
        }
        Ok(())
    }

    fn publish_result(&self, kind: PromptKind, result: InputResult) -> Result<(), BrokerError> {
        let (added, finished) = match kind {
            PromptKind::Purpose => (EventKind::PurposeAdded, EventKind::PurposeFinished),
            PromptKind::Tag => (EventKind::TagChanged, EventKind::TagFinished),
        };
        if let InputResult::Submitted(text) = result {
            self.broker.emit_with(added, text)?;
        }
        self.broker.emit(finished)
    }

    fn draw(&mut self) {
        if let Err(e) = self.target.draw(&self.view.lines()) {
            warn!(error = %e, "failed to draw");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::EventBroker;
    use crossbeam_channel::unbounded;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Keeps the last frame for assertions.
    #[derive(Clone, Default)]
    struct RecordingTarget {
        frame: Arc<Mutex<Vec<String>>>,
    }

    impl DrawTarget for RecordingTarget {
        fn draw(&mut self, lines: &[String]) -> io::Result<()> {
            *self.frame.lock().unwrap() = lines.to_vec();
            Ok(())
        }
    }

    async fn recv_kind(sub: &mut Subscription, kind: EventKind) -> EventMessage {
        loop {
            let message = sub.recv().await.unwrap();
            if message.kind == kind {
                return message;
            }
        }
    }

    #[tokio::test]
    async fn test_announces_ready_and_stops() {
        let (_task, broker) = EventBroker::spawn();
        let (_keys_tx, keys_rx) = unbounded();
        let target = RecordingTarget::default();
        let renderer = Renderer::new(broker.clone(), target.clone(), keys_rx, Vec::new()).unwrap();

        broker.emit_with(EventKind::TimeChange, "00:00:42").unwrap();
        broker.emit(EventKind::StopPrinter).unwrap();
        renderer.run().await.unwrap();

        let mut sub = broker
            .subscribe(SubscriberId::new(), &[EventKind::PrinterReady])
            .unwrap();
        recv_kind(&mut sub, EventKind::PrinterReady).await;
        assert!(target
            .frame
            .lock()
            .unwrap()
            .contains(&"Remaining: 00:00:42".to_string()));
    }

    #[tokio::test]
    async fn test_purpose_prompt_publishes_result() {
        let (_task, broker) = EventBroker::spawn();
        let (keys_tx, keys_rx) = unbounded();
        let renderer =
            Renderer::new(broker.clone(), NullTarget, keys_rx, Vec::new()).unwrap();
        let mut sub = broker
            .subscribe(
                SubscriberId::new(),
                &[EventKind::PurposeAdded, EventKind::PurposeFinished],
            )
            .unwrap();
        let task = tokio::spawn(renderer.run());

        for key in [KeyInput::Char('a'), KeyInput::Char('b'), KeyInput::Enter] {
            keys_tx.send(key).unwrap();
        }
        broker.emit(EventKind::AddPurpose).unwrap();

        let added = recv_kind(&mut sub, EventKind::PurposeAdded).await;
        assert_eq!(added.payload(), Some("ab"));
        recv_kind(&mut sub, EventKind::PurposeFinished).await;

        broker.emit(EventKind::StopPrinter).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_tag_prompt_only_finishes() {
        let (_task, broker) = EventBroker::spawn();
        let (keys_tx, keys_rx) = unbounded();
        let renderer = Renderer::new(
            broker.clone(),
            NullTarget,
            keys_rx,
            vec!["work".to_string()],
        )
        .unwrap();
        let mut sub = broker
            .subscribe(
                SubscriberId::new(),
                &[EventKind::TagChanged, EventKind::TagFinished],
            )
            .unwrap();
        let task = tokio::spawn(renderer.run());

        keys_tx.send(KeyInput::Char('1')).unwrap();
        keys_tx.send(KeyInput::Esc).unwrap();
        broker.emit(EventKind::TagChange).unwrap();

        let message = sub.recv().await.unwrap();
        assert_eq!(message.kind, EventKind::TagFinished);

        broker.emit(EventKind::StopPrinter).unwrap();
        task.await.unwrap().unwrap();
    }
}
