//! The writer's notify fan-out (spec.md §4.7 step 7): one broadcast
//! stream for locally-connected clients, one outbound queue per
//! federation destination, bundled so `submerge-vm` only needs to hold
//! one handle per node.

mod client_stream;
mod fanout;
mod federation_transmit;

pub use client_stream::ClientStream;
pub use fanout::NotifyFanout;
pub use federation_transmit::FederationTransmit;
