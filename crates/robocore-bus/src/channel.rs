//! The in-process half of the bus: a typed, topic-based publish/subscribe
//! channel built on [`tokio::sync::broadcast`].
//!
//! One [`Channel`] backs each direction (upstream, downstream). Every
//! in-process collaborator (orchestrator, motor bridge, remote) holds a
//! clone of both; the hub additionally bridges each channel to a TCP
//! listener for out-of-process collaborators (see [`crate::hub`]).

use tokio::sync::broadcast;

use robocore_types::{Envelope, RobocoreError, Topic};

/// Default channel capacity: the number of buffered envelopes a slow
/// subscriber may lag behind before older ones are dropped.
pub const DEFAULT_CAPACITY: usize = 256;

/// One direction of the bus. Cheaply clonable; clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct Channel {
    sender: broadcast::Sender<Envelope>,
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Non-blocking best-effort send. Returns the number of receivers that
    /// were sent the envelope, or a [`RobocoreError::Transport`] if there
    /// are currently no subscribers. No delivery confirmation beyond that
    /// count.
    pub fn publish(&self, envelope: Envelope) -> Result<usize, RobocoreError> {
        self.sender
            .send(envelope)
            .map_err(|e| RobocoreError::Transport(format!("no active subscribers: {e}")))
    }

    /// Subscribes to every envelope on this channel, unfiltered.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Subscribes filtered to a single topic. The empty-prefix case (every
    /// topic) is `subscribe()` — this crate's topics are a closed enum, not
    /// a namespaced string, so prefix matching only ever narrows to one
    /// topic at a time.
    pub fn subscribe_topic(&self, topic: Topic) -> TopicSubscriber {
        TopicSubscriber {
            topic,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A subscriber that only yields envelopes matching one [`Topic`].
pub struct TopicSubscriber {
    topic: Topic,
    receiver: broadcast::Receiver<Envelope>,
}

impl TopicSubscriber {
    /// Waits for the next envelope on the subscribed topic. `None` means
    /// the channel is closed (the hub has shut down) and nothing further
    /// will arrive. A lagged receiver is logged and retried transparently —
    /// dropped envelopes are an expected at-most-once outcome, not an
    /// error the caller needs to see.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.topic() == self.topic => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(topic = ?self.topic, skipped = n, "subscriber lagged, dropping oldest");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
