//! Optional elapsed-time counter.
//!
//! Started and stopped with the `t` key. Each stopwatch has its own id, and a
//! `StopStopwatch` event only stops the stopwatch it is addressed to.

use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::broker::{BrokerError, BrokerHandle, Subscription};
use crate::types::{EventKind, SubscriberId};

const SUBSCRIBED_KINDS: [EventKind; 2] = [EventKind::StopStopwatch, EventKind::Termination];

#[derive(Debug, Error)]
pub enum StopwatchError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("stopwatch received unexpected event: {0}")]
    UnexpectedEvent(EventKind),
}

/// Formats the closing status line. Minutes are rounded up.
pub fn elapsed_message(elapsed_seconds: u64) -> String {
    let minutes = elapsed_seconds.div_ceil(60);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("Stopwatch ran for {minutes} {unit}")
}

pub struct Stopwatch {
    broker: BrokerHandle,
    subscription: Subscription,
    elapsed_seconds: u64,
}

impl Stopwatch {
    pub fn new(broker: BrokerHandle) -> Result<Self, BrokerError> {
        let subscription = broker.subscribe(SubscriberId::new(), &SUBSCRIBED_KINDS)?;
        Ok(Self {
            broker,
            subscription,
            elapsed_seconds: 0,
        })
    }

    /// Id that `StopStopwatch` must carry to stop this stopwatch.
    pub fn id(&self) -> SubscriberId {
        self.subscription.subscriber()
    }

    pub async fn run(mut self) -> Result<(), StopwatchError> {
        self.broker
            .emit_with(EventKind::AppMessage, "Stopwatch started")?;

        while !self.should_stop()? {
            sleep(Duration::from_secs(1)).await;
            self.elapsed_seconds += 1;
        }

        self.broker.unsubscribe(self.id(), &SUBSCRIBED_KINDS)?;
        self.broker
            .emit_with(EventKind::AppMessage, elapsed_message(self.elapsed_seconds))?;
        debug!(elapsed = self.elapsed_seconds, "stopwatch stopped");
        Ok(())
    }

    fn should_stop(&mut self) -> Result<bool, StopwatchError> {
        let id = self.id();
        for message in self.subscription.drain() {
            match message.kind {
                EventKind::Termination => return Ok(true),
                EventKind::StopStopwatch if id.is_addressed_by(message.payload()) => {
                    return Ok(true)
                }
                EventKind::StopStopwatch => {}
                other => return Err(StopwatchError::UnexpectedEvent(other)),
            }
        }
        Ok(false)
    }
}
