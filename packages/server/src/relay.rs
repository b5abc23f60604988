use common::{RelayEvent, RelayEventType};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out of relay events to live client sessions.
///
/// Each user id is a topic backed by a broadcast channel; every session of
/// that user holds a receiver. Events without a user go to the global channel.
pub struct Relay {
    users: DashMap<i32, broadcast::Sender<RelayEvent>>,
    global: broadcast::Sender<RelayEvent>,
    capacity: usize,
}

impl Relay {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (global, _) = broadcast::channel(capacity);
        Self {
            users: DashMap::new(),
            global,
            capacity,
        }
    }

    pub fn subscribe_user(&self, user_id: i32) -> broadcast::Receiver<RelayEvent> {
        self.users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<RelayEvent> {
        self.global.subscribe()
    }

    /// Routes by `user_id`. Returns the number of sessions reached.
    pub fn publish(&self, event: RelayEvent) -> usize {
        let event_type = event.event_type;
        let reached = match event.user_id {
            Some(user_id) => self
                .users
                .get(&user_id)
                .and_then(|tx| tx.send(event).ok())
                .unwrap_or(0),
            None => self.global.send(event).unwrap_or(0),
        };
        trace!(%event_type, reached, "Relayed event");
        reached
    }

    pub fn send_to(&self, user_id: i32, event_type: RelayEventType, payload: Value) -> usize {
        self.publish(RelayEvent::to_user(user_id, event_type, payload))
    }

    pub fn broadcast(&self, event_type: RelayEventType, payload: Value) -> usize {
        self.publish(RelayEvent::broadcast(event_type, payload))
    }

    /// Drops topics nobody listens to any more.
    pub fn prune(&self) {
        self.users.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn topic_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(64)
    }
}
