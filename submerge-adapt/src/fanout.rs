// spec.md §4.7 step 7 (Notify), gated independently by
// `notify_clients`/`notify_servers` the way `submerge-vm::options`
// exposes them. One `NotifyFanout` per node, shared by every eval's
// writer phase.

use crate::client_stream::ClientStream;
use crate::federation_transmit::FederationTransmit;
use std::sync::Arc;
use submerge_model::{EventSource, ServerName};
use submerge_net::PduJson;

#[derive(Default)]
pub struct NotifyFanout {
    pub clients: ClientStream,
    pub federation: FederationTransmit,
}

impl NotifyFanout {
    pub fn new() -> Self {
        NotifyFanout::default()
    }

    pub fn notify_clients(&self, event: Arc<EventSource>) {
        self.clients.publish(event);
    }

    pub fn notify_servers(&self, destinations: &[ServerName], pdu: PduJson) {
        self.federation.enqueue(destinations, pdu);
    }
}
