use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;

/// A pre-serialized stream frame: the event name plus its JSON payload.
/// Serialization happens once at publish time, not per subscriber.
#[derive(Debug, Clone)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Fan-out hub feeding live stream subscribers. Built on a bounded
/// broadcast channel: every subscriber owns an independent cursor, a
/// subscriber that falls more than the channel capacity behind loses the
/// oldest frames, and publishing never waits on any receiver. Receivers
/// deregister themselves when dropped, so a disconnecting client needs no
/// explicit unsubscribe.
#[derive(Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<Frame>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new subscriber. Returns the `connected` confirmation
    /// frame (delivered to this subscriber only) and the live receiver.
    pub fn subscribe(&self) -> (Frame, broadcast::Receiver<Frame>) {
        let rx = self.tx.subscribe();
        let connected = Frame {
            event: "connected".to_string(),
            data: json!({ "ts": Utc::now() }).to_string(),
        };
        (connected, rx)
    }

    /// Serialize once and push to every live subscriber. A send with no
    /// subscribers is a no-op, not an error.
    pub fn publish(&self, event: &str, data: serde_json::Value) {
        let frame = Frame {
            event: event.to_string(),
            data: data.to_string(),
        };
        let _ = self.tx.send(frame);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
