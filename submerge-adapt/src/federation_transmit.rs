// spec.md §4.7 step 7: "enqueue to ... the federation transmit queue
// (notify_servers)." One unbounded mpsc queue per destination server;
// the actual `/send/` HTTP push is a collaborator (spec.md §1), so this
// type only owns the queueing, not delivery.

use dashmap::DashMap;
use submerge_model::ServerName;
use submerge_net::PduJson;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct FederationTransmit {
    queues: DashMap<ServerName, mpsc::UnboundedSender<PduJson>>,
}

impl FederationTransmit {
    pub fn new() -> Self {
        FederationTransmit::default()
    }

    /// Registers interest in a destination server's outbound queue,
    /// returning the receiving half. Calling this twice for the same
    /// server replaces the prior receiver's sender, which is fine: only
    /// one federation-transmit worker per destination should exist.
    pub fn register(&self, destination: ServerName) -> mpsc::UnboundedReceiver<PduJson> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.insert(destination, tx);
        rx
    }

    /// Enqueues `pdu` for every destination with a registered worker.
    /// Destinations with no worker registered are silently skipped -
    /// there is nothing standing by to deliver to them yet.
    pub fn enqueue(&self, destinations: &[ServerName], pdu: PduJson) {
        for destination in destinations {
            if let Some(queue) = self.queues.get(destination) {
                let _ = queue.send(pdu.clone());
            }
        }
    }

    pub fn registered_count(&self) -> usize {
        self.queues.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test(tokio::test)]
    async fn enqueue_reaches_registered_destination() {
        let transmit = FederationTransmit::new();
        let mut rx = transmit.register(ServerName::new("peer.example.org"));
        transmit.enqueue(&[ServerName::new("peer.example.org")], std::sync::Arc::from("{}"));
        let pdu = rx.recv().await.unwrap();
        assert_eq!(&*pdu, "{}");
    }

    #[test]
    fn enqueue_to_unregistered_destination_is_a_no_op() {
        let transmit = FederationTransmit::new();
        transmit.enqueue(&[ServerName::new("nobody.example.org")], std::sync::Arc::from("{}"));
        assert_eq!(transmit.registered_count(), 0);
    }
}
