//! Error types for device lifecycle, routing and configuration.

use crate::device::lifecycle::LifecycleState;
use crate::device::packet::{DeviceId, PacketKind};
use std::time::Duration;
use thiserror::Error;

/// Per-device and dispatch-level failures.
///
/// None of these are fatal to the dispatch loop: the offending packet or device is
/// dropped and a diagnostic is emitted.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no live device with id {0}")]
    UnknownDevice(DeviceId),

    #[error("protocol violation for {kind} packet: {reason}")]
    ProtocolViolation { kind: PacketKind, reason: String },

    #[error("device {0} is already registered")]
    DuplicateDevice(DeviceId),

    #[error("device {device}: invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        device: DeviceId,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("device {device}: producer did not quiesce within {waited:?}")]
    ShutdownTimeout { device: DeviceId, waited: Duration },

    #[error("device {0} no longer accepts packets")]
    InboxClosed(DeviceId),
}

impl DeviceError {
    pub(crate) fn protocol_violation(kind: PacketKind, reason: impl Into<String>) -> Self {
        DeviceError::ProtocolViolation {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse config: {0}")]
    Parse(#[from] json5::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
