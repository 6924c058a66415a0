// spec.md §4.7 step 7: "if notify, enqueue to client streams
// (notify_clients)." One process-wide broadcast channel of published
// events; a `/sync`-shaped endpoint (out of scope per spec.md §1) would
// be the thing subscribing, filtering by room membership on its own side.

use std::sync::Arc;
use submerge_model::EventSource;
use tokio::sync::broadcast;

/// Lagging subscribers drop the oldest unread events rather than block
/// publishers - spec.md §5 requires post-effects publication not to
/// stall other evals waiting on the retired-dock.
const CHANNEL_CAPACITY: usize = 4096;

pub struct ClientStream {
    tx: broadcast::Sender<Arc<EventSource>>,
}

impl Default for ClientStream {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        ClientStream { tx }
    }
}

impl ClientStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventSource>> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is not an error; it just means no
    /// client happens to be caught up right now.
    pub fn publish(&self, event: Arc<EventSource>) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use submerge_model::{Event, RoomVersion};
    use test_log::test;

    fn fixture() -> Arc<EventSource> {
        Arc::new(EventSource {
            tuple: Event {
                kind: "m.room.message".into(),
                sender: "@alice:example.org".into(),
                room_id: "!room:example.org".into(),
                state_key: None,
                content: serde_json::json!({}),
                depth: 1,
                prev_events: vec![],
                auth_events: vec![],
                hashes: None,
                signatures: Default::default(),
                origin: "example.org".into(),
                origin_server_ts: 0,
                unsigned: None,
                event_id: Some("$a".into()),
            },
            source: None,
            room_version: RoomVersion::V11,
        })
    }

    #[test(tokio::test)]
    async fn subscribers_receive_published_events() {
        let stream = ClientStream::new();
        let mut rx = stream.subscribe();
        stream.publish(fixture());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_id().unwrap().as_str(), "$a");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let stream = ClientStream::new();
        stream.publish(fixture());
    }
}
