//! Device lifecycle state machine.
//!
//! `Starting -> Running -> Stopping -> Drained -> Removed`, strictly forward, one step
//! at a time. The state lives in a single atomic so every transition is a
//! compare-and-swap from the expected predecessor; a transition attempted from any
//! other state is rejected rather than applied.

use crate::error::DeviceError;
use crate::device::packet::DeviceId;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Created, not yet registered.
    Starting = 0,
    /// Registered; producer enqueues, consumer drains.
    Running = 1,
    /// Producer has been told to stop enqueueing.
    Stopping = 2,
    /// Producer quiescence observed (or forced after a timeout).
    Drained = 3,
    /// Removed from the registry. Terminal.
    Removed = 4,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LifecycleState::Starting,
            1 => LifecycleState::Running,
            2 => LifecycleState::Stopping,
            3 => LifecycleState::Drained,
            _ => LifecycleState::Removed,
        }
    }

    /// The only state this one may move to, if any.
    pub fn successor(self) -> Option<LifecycleState> {
        match self {
            LifecycleState::Starting => Some(LifecycleState::Running),
            LifecycleState::Running => Some(LifecycleState::Stopping),
            LifecycleState::Stopping => Some(LifecycleState::Drained),
            LifecycleState::Drained => Some(LifecycleState::Removed),
            LifecycleState::Removed => None,
        }
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Drained => "drained",
            LifecycleState::Removed => "removed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    device: DeviceId,
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new(device: DeviceId) -> Self {
        Self {
            device,
            state: AtomicU8::new(LifecycleState::Starting as u8),
        }
    }

    pub(crate) fn current(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from -> to`. Fails if `to` is not `from`'s successor or if the state is
    /// no longer `from`.
    pub(crate) fn advance(&self, from: LifecycleState, to: LifecycleState) -> Result<(), DeviceError> {
        if from.successor() != Some(to) {
            return Err(DeviceError::InvalidTransition {
                device: self.device,
                from,
                to,
            });
        }

        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| DeviceError::InvalidTransition {
                device: self.device,
                from: LifecycleState::from_u8(actual),
                to,
            })
    }
}
