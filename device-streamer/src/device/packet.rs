//! Packet and device identity types shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Opaque, stable identity of a managed device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "device-{}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    AddDevice,
    Read,
    Write,
}

impl Display for PacketKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::AddDevice => write!(f, "ADD_DEVICE"),
            PacketKind::Read => write!(f, "READ"),
            PacketKind::Write => write!(f, "WRITE"),
        }
    }
}

/// Unit of work handed out by a [`crate::PacketSource`].
///
/// A packet is immutable once built. Ownership moves into whichever queue accepts it
/// and from there into the payload handler, which consumes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    target: Option<DeviceId>,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(kind: PacketKind, target: Option<DeviceId>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            target,
            payload: payload.into(),
        }
    }

    /// Control packet announcing a new device. With `None` the dispatcher picks the id.
    pub fn add_device(target: Option<DeviceId>) -> Self {
        Self::new(PacketKind::AddDevice, target, Vec::new())
    }

    pub fn read(target: DeviceId, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(PacketKind::Read, Some(target), payload)
    }

    pub fn write(target: DeviceId, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(PacketKind::Write, Some(target), payload)
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn target(&self) -> Option<DeviceId> {
        self.target
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
