//! In-memory publish/subscribe hub with replay for late subscribers.
//!
//! The broker runs as a single task that owns every registration and the
//! replay log. Handles talk to it through an unbounded command queue, so the
//! queue order is the global publish order:
//! - A subscription replays every earlier matching message before any later one
//! - Each subscription receives messages in publish order
//! - A closed subscriber channel is pruned without affecting other subscribers

mod error;

pub use error::BrokerError;

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::{EventKind, EventMessage, SubscriberId};

// ============================================================================
// Commands
// ============================================================================

/// Requests processed by the broker task.
#[derive(Debug)]
enum Command {
    Subscribe {
        subscriber: SubscriberId,
        kinds: Vec<EventKind>,
        sender: mpsc::UnboundedSender<EventMessage>,
    },
    Publish(EventMessage),
    Unsubscribe {
        subscriber: SubscriberId,
        kinds: Vec<EventKind>,
    },
    Shutdown,
}

/// One delivery target registered for a kind.
#[derive(Debug)]
struct Registration {
    subscriber: SubscriberId,
    sender: mpsc::UnboundedSender<EventMessage>,
}

// ============================================================================
// EventBroker
// ============================================================================

/// The broker task state.
#[derive(Debug)]
pub struct EventBroker {
    /// Incoming commands from every handle
    commands: mpsc::UnboundedReceiver<Command>,
    /// Delivery targets per event kind
    registrations: HashMap<EventKind, Vec<Registration>>,
    /// Every message published during this run, in order
    replay_log: Vec<EventMessage>,
}

impl EventBroker {
    /// Creates a broker and the handle used to reach it.
    pub fn new() -> (Self, BrokerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broker = Self {
            commands: rx,
            registrations: HashMap::new(),
            replay_log: Vec::new(),
        };
        (broker, BrokerHandle { commands: tx })
    }

    /// Creates a broker and spawns it onto the current runtime.
    pub fn spawn() -> (JoinHandle<()>, BrokerHandle) {
        let (broker, handle) = Self::new();
        (tokio::spawn(broker.run()), handle)
    }

    /// Processes commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        debug!("event broker started");
        while let Some(command) = self.commands.recv().await {
            if !self.process(command) {
                break;
            }
        }
        debug!(published = self.replay_log.len(), "event broker stopped");
    }

    /// Applies one command. Returns false when the broker should stop.
    fn process(&mut self, command: Command) -> bool {
        match command {
            Command::Subscribe {
                subscriber,
                kinds,
                sender,
            } => self.subscribe(subscriber, kinds, sender),
            Command::Publish(message) => self.publish(message),
            Command::Unsubscribe { subscriber, kinds } => self.unsubscribe(subscriber, &kinds),
            Command::Shutdown => return false,
        }
        true
    }

    fn subscribe(
        &mut self,
        subscriber: SubscriberId,
        kinds: Vec<EventKind>,
        sender: mpsc::UnboundedSender<EventMessage>,
    ) {
        // Replay first; nothing else can interleave while this command runs.
        for message in self.replay_log.iter().filter(|m| kinds.contains(&m.kind)) {
            if sender.send(message.clone()).is_err() {
                warn!(%subscriber, "subscriber dropped during replay");
                return;
            }
        }

        for kind in kinds {
            self.registrations
                .entry(kind)
                .or_default()
                .push(Registration {
                    subscriber,
                    sender: sender.clone(),
                });
        }
        debug!(%subscriber, "subscribed");
    }

    fn publish(&mut self, message: EventMessage) {
        debug!(event = %message, "publish");
        if let Some(targets) = self.registrations.get_mut(&message.kind) {
            targets.retain(|target| match target.sender.send(message.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(
                        subscriber = %target.subscriber,
                        kind = %message.kind,
                        "delivery failed, dropping subscription"
                    );
                    false
                }
            });
        }
        self.replay_log.push(message);
    }

    fn unsubscribe(&mut self, subscriber: SubscriberId, kinds: &[EventKind]) {
        for kind in kinds {
            if let Some(targets) = self.registrations.get_mut(kind) {
                targets.retain(|target| target.subscriber != subscriber);
            }
        }
        debug!(%subscriber, "unsubscribed");
    }
}

// ============================================================================
// BrokerHandle
// ============================================================================

/// Cloneable handle injected into every worker.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl BrokerHandle {
    fn send(&self, command: Command) -> Result<(), BrokerError> {
        self.commands.send(command).map_err(|_| BrokerError::Closed)
    }

    /// Subscribes `subscriber` to `kinds`.
    ///
    /// The returned subscription first yields every earlier message of those
    /// kinds, in publish order, and then live messages. Duplicate kinds are
    /// registered once.
    pub fn subscribe(
        &self,
        subscriber: SubscriberId,
        kinds: &[EventKind],
    ) -> Result<Subscription, BrokerError> {
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Command::Subscribe {
            subscriber,
            kinds: unique,
            sender: tx,
        })?;
        Ok(Subscription {
            subscriber,
            receiver: rx,
        })
    }

    /// String-keyed variant of [`subscribe`](Self::subscribe).
    ///
    /// Fails with [`BrokerError::UnknownEventKind`] before registering anything
    /// if one of the names is not part of the vocabulary.
    pub fn subscribe_named(
        &self,
        subscriber: SubscriberId,
        names: &[&str],
    ) -> Result<Subscription, BrokerError> {
        let kinds = names
            .iter()
            .map(|name| name.parse::<EventKind>())
            .collect::<Result<Vec<_>, _>>()?;
        self.subscribe(subscriber, &kinds)
    }

    /// Publishes a message to every current and future subscriber of its kind.
    pub fn publish(&self, message: EventMessage) -> Result<(), BrokerError> {
        self.send(Command::Publish(message))
    }

    /// Publishes a message without payload.
    pub fn emit(&self, kind: EventKind) -> Result<(), BrokerError> {
        self.publish(EventMessage::new(kind))
    }

    /// Publishes a message with a payload.
    pub fn emit_with(
        &self,
        kind: EventKind,
        payload: impl Into<String>,
    ) -> Result<(), BrokerError> {
        self.publish(EventMessage::with_payload(kind, payload))
    }

    /// Removes every registration of `subscriber` for `kinds`. Idempotent.
    pub fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        kinds: &[EventKind],
    ) -> Result<(), BrokerError> {
        self.send(Command::Unsubscribe {
            subscriber,
            kinds: kinds.to_vec(),
        })
    }

    /// Stops the broker task. Later calls on any handle fail with `Closed`.
    pub fn shutdown(&self) -> Result<(), BrokerError> {
        self.send(Command::Shutdown)
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Receiving side of one subscribe call.
#[derive(Debug)]
pub struct Subscription {
    subscriber: SubscriberId,
    receiver: mpsc::UnboundedReceiver<EventMessage>,
}

impl Subscription {
    /// Returns the owning subscriber id.
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// Returns the next queued message without waiting.
    pub fn try_next(&mut self) -> Option<EventMessage> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next message. Returns `None` once the broker is gone and
    /// the queue is empty.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        self.receiver.recv().await
    }

    /// Returns every queued message without waiting.
    pub fn drain(&mut self) -> Vec<EventMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

// ============================================================================
// Tests
// ============================================================================
