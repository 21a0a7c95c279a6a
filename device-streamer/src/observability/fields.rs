//! Field formatters shared by log call sites.

use crate::device::packet::Packet;

/// Short printable form of a packet target, `-` when absent.
pub fn format_target(packet: &Packet) -> String {
    packet
        .target()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Payload length only; payloads are opaque and never logged.
pub fn format_payload_len(packet: &Packet) -> usize {
    packet.payload().len()
}
