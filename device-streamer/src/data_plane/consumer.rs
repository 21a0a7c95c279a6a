//! Consumer task: drains a device's queues and drives its shutdown and removal.

use crate::collaborators::PacketHandler;
use crate::control_plane::device_registry::DeviceRegistry;
use crate::device::device_object::Device;
use crate::device::lifecycle::LifecycleState;
use crate::device::packet::PacketKind;
use crate::device::packet_queue::PacketQueue;
use crate::error::DeviceError;
use crate::observability::events;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

const COMPONENT: &str = "consumer";

#[derive(Clone, Copy, Debug)]
enum Direction {
    Read,
    Write,
}

impl Direction {
    fn kind(self) -> PacketKind {
        match self {
            Direction::Read => PacketKind::Read,
            Direction::Write => PacketKind::Write,
        }
    }
}

/// How a consumer finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumerReport {
    pub handled: u64,
    pub final_drain: u64,
    pub shutdown_timed_out: bool,
}

pub(crate) struct DeviceConsumer {
    device: Arc<Device>,
    registry: Arc<DeviceRegistry>,
    handler: Arc<dyn PacketHandler>,
    poll_interval: Duration,
    shutdown_timeout: Duration,
}

impl DeviceConsumer {
    pub(crate) fn new(
        device: Arc<Device>,
        registry: Arc<DeviceRegistry>,
        handler: Arc<dyn PacketHandler>,
        poll_interval: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            device,
            registry,
            handler,
            poll_interval,
            shutdown_timeout,
        }
    }

    /// Drains until a stop is requested, then walks the device through
    /// `Stopping -> Drained -> Removed`.
    pub(crate) async fn consume_loop(self) -> Result<ConsumerReport, DeviceError> {
        let device_id = self.device.id();
        info!(
            event = events::CONSUMER_START,
            component = COMPONENT,
            device_id = %device_id,
            "consumer started"
        );

        let mut handled: u64 = 0;
        while self.device.state() == LifecycleState::Running {
            let drained = self.drain_queues().await;
            handled += drained;

            if self.device.shutdown_requested() {
                break;
            }
            if drained == 0 {
                tokio::time::sleep(self.poll_interval).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        debug!(
            event = events::CONSUMER_STOP_OBSERVED,
            component = COMPONENT,
            device_id = %device_id,
            handled,
            "stop observed"
        );
        self.device
            .transition(LifecycleState::Running, LifecycleState::Stopping)?;
        self.device.signal_producer_stop();

        let shutdown_timed_out = match self.await_producer_quiescence().await {
            Ok(()) => false,
            Err(err) => {
                error!(
                    event = events::CONSUMER_SHUTDOWN_TIMEOUT,
                    component = COMPONENT,
                    device_id = %device_id,
                    potential_data_loss = true,
                    err = %err,
                    "forcing device to drained"
                );
                true
            }
        };
        self.device
            .transition(LifecycleState::Stopping, LifecycleState::Drained)?;

        // Pushes made between the stop signal and the flag being observed land here.
        let final_drain = self.drain_queues().await;
        handled += final_drain;
        debug!(
            event = events::CONSUMER_FINAL_DRAIN,
            component = COMPONENT,
            device_id = %device_id,
            final_drain,
            "final drain complete"
        );

        self.registry.remove(device_id).await;
        self.device
            .transition(LifecycleState::Drained, LifecycleState::Removed)?;
        info!(
            event = events::CONSUMER_REMOVED,
            component = COMPONENT,
            device_id = %device_id,
            handled,
            shutdown_timed_out,
            "device removed"
        );

        Ok(ConsumerReport {
            handled,
            final_drain,
            shutdown_timed_out,
        })
    }

    /// Polls the producer-stopped flag until it is set or the timeout expires.
    async fn await_producer_quiescence(&self) -> Result<(), DeviceError> {
        let deadline = Instant::now() + self.shutdown_timeout;
        while !self.device.producer_stopped() {
            if Instant::now() >= deadline {
                return Err(DeviceError::ShutdownTimeout {
                    device: self.device.id(),
                    waited: self.shutdown_timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// One pass: the read queue until empty, then the write queue until empty.
    async fn drain_queues(&self) -> u64 {
        let reads = self.drain(self.device.read_queue(), Direction::Read).await;
        let writes = self.drain(self.device.write_queue(), Direction::Write).await;
        reads + writes
    }

    async fn drain(&self, queue: &PacketQueue, direction: Direction) -> u64 {
        let device_id = self.device.id();
        let kind = direction.kind();
        let mut count = 0;
        // try_pop releases the queue lock before the handler runs.
        while let Some(packet) = queue.try_pop() {
            let payload = packet.into_payload();
            trace!(
                event = events::CONSUMER_HANDLED,
                component = COMPONENT,
                device_id = %device_id,
                %kind,
                payload_len = payload.len(),
                "handling packet"
            );
            match direction {
                Direction::Read => {
                    self.handler.handle_read(device_id, payload).await;
                    self.device.record_read_handled();
                }
                Direction::Write => {
                    self.handler.handle_write(device_id, payload).await;
                    self.device.record_write_handled();
                }
            }
            count += 1;
        }
        count
    }
}
