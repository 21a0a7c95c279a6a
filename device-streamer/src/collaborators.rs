//! External collaborators consumed by the core: the packet source and the payload handlers.

use crate::device::packet::{DeviceId, Packet};
use async_trait::async_trait;

/// Source of control and data packets.
///
/// `None` signals end-of-stream; every task treats it as a request to stop.
#[async_trait]
pub trait PacketSource: Send + Sync {
    async fn next_incoming_packet(&self) -> Option<Packet>;
}

/// Sink for payloads drained from device queues.
///
/// Implementations must contain their own failures. A handler that panics takes its
/// device's consumer task down with it.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle_read(&self, device: DeviceId, payload: Vec<u8>);

    async fn handle_write(&self, device: DeviceId, payload: Vec<u8>);
}
