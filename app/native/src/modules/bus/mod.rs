//! In-process message bus.
//!
//! Every window process talks to the hub through named one-way channels.
//! Inside one address space those channels are multiplexed over a single
//! `tokio::sync::broadcast` channel: each listener receives every event in
//! emit order and filters what it cares about.
//!
//! Emitting is fire-and-forget. An event with no listener is dropped, and a
//! listener that falls behind skips the events it missed.

mod messages;

pub use messages::{BusEvent, ContentChanged, Empty, Hydrate, NoteRect, NoteRef, PersistFailure};
use tokio::sync::broadcast;

/// Default number of buffered events per listener.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Cloneable sender side of the bus.
#[derive(Clone, Debug)]
pub struct MessageBus {
    sender: broadcast::Sender<BusEvent>,
}

impl Default for MessageBus {
    fn default() -> Self { Self::new(DEFAULT_BUS_CAPACITY) }
}

impl MessageBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to every current listener.
    pub fn emit(&self, event: BusEvent) {
        tracing::trace!(channel = event.channel(), "bus: emit");
        // No listeners is not an error.
        let _ = self.sender.send(event);
    }

    /// Start listening. Only events emitted after this call are received.
    #[must_use]
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription { receiver: self.sender.subscribe() }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize { self.sender.receiver_count() }
}

/// Receiving side of the bus.
#[derive(Debug)]
pub struct BusSubscription {
    receiver: broadcast::Receiver<BusEvent>,
}

impl BusSubscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once every [`MessageBus`] handle has been dropped.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus: listener lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus: listener lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every buffered event.
    pub fn drain(&mut self) -> Vec<BusEvent> { std::iter::from_fn(|| self.try_recv()).collect() }
}
