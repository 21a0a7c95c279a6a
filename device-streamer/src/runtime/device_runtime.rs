//! Runtime helper for spawning a device's producer/consumer pair.

use crate::collaborators::PacketHandler;
use crate::config::DispatcherConfig;
use crate::control_plane::device_registry::DeviceRegistry;
use crate::data_plane::consumer::{ConsumerReport, DeviceConsumer};
use crate::data_plane::producer::DeviceProducer;
use crate::device::device_object::{Device, DeviceStats};
use crate::device::packet::{DeviceId, Packet};
use crate::error::DeviceError;
use crate::observability::events;
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::error;

const COMPONENT: &str = "device_runtime";

/// Join handles for one device's task pair.
pub(crate) struct DeviceTasks {
    device: Arc<Device>,
    producer: JoinHandle<()>,
    consumer: JoinHandle<Result<ConsumerReport, DeviceError>>,
}

/// Final outcome of a device's task pair, once both have exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeviceOutcome {
    Completed {
        report: ConsumerReport,
        stats: DeviceStats,
    },
    Failed {
        stats: DeviceStats,
    },
}

impl DeviceOutcome {
    pub(crate) fn stats(&self) -> DeviceStats {
        match self {
            DeviceOutcome::Completed { stats, .. } | DeviceOutcome::Failed { stats } => *stats,
        }
    }

    pub(crate) fn shutdown_timed_out(&self) -> bool {
        matches!(
            self,
            DeviceOutcome::Completed { report, .. } if report.shutdown_timed_out
        )
    }
}

pub(crate) fn spawn_device_tasks(
    device: Arc<Device>,
    inbox: Receiver<Packet>,
    registry: Arc<DeviceRegistry>,
    handler: Arc<dyn PacketHandler>,
    config: &DispatcherConfig,
) -> DeviceTasks {
    let producer = tokio::spawn(DeviceProducer::new(device.clone(), inbox).produce_loop());
    let consumer = DeviceConsumer::new(
        device.clone(),
        registry.clone(),
        handler,
        config.poll_interval(),
        config.shutdown_timeout(),
    );
    let retirement = Retirement {
        device: device.clone(),
        registry,
        poll_interval: config.poll_interval(),
        shutdown_timeout: config.shutdown_timeout(),
    };
    let consumer = tokio::spawn(supervise_consumer(consumer, retirement));

    DeviceTasks {
        device,
        producer,
        consumer,
    }
}

/// Runs the consumer and, if it errors or panics, retires its device on the spot so
/// the registry and the producer never wait on a dead consumer.
async fn supervise_consumer(
    consumer: DeviceConsumer,
    retirement: Retirement,
) -> Result<ConsumerReport, DeviceError> {
    match AssertUnwindSafe(consumer.consume_loop()).catch_unwind().await {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(err)) => {
            retirement.run(&err.to_string()).await;
            Err(err)
        }
        Err(payload) => {
            // The packet being handled when the handler panicked is lost.
            retirement.device.record_discarded(1);
            retirement.run(&panic_message(payload.as_ref())).await;
            panic::resume_unwind(payload)
        }
    }
}

/// Cleanup for a device whose consumer is gone.
struct Retirement {
    device: Arc<Device>,
    registry: Arc<DeviceRegistry>,
    poll_interval: Duration,
    shutdown_timeout: Duration,
}

impl Retirement {
    async fn run(&self, reason: &str) {
        let device_id = self.device.id();
        if self.registry.contains(device_id).await {
            self.registry.remove(device_id).await;
        }
        self.device.retire();

        // Queues are only emptied once the producer can no longer push into them.
        let deadline = Instant::now() + self.shutdown_timeout;
        while !self.device.producer_stopped() && Instant::now() < deadline {
            tokio::time::sleep(self.poll_interval).await;
        }
        let discarded = self.device.discard_queued();

        error!(
            event = events::CONSUMER_FAILED,
            component = COMPONENT,
            device_id = %device_id,
            discarded,
            producer_stopped = self.device.producer_stopped(),
            potential_data_loss = true,
            reason,
            "consumer failed, device retired"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "consumer panicked".to_string()
    }
}

impl DeviceTasks {
    pub(crate) fn device(&self) -> DeviceId {
        self.device.id()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.producer.is_finished() && self.consumer.is_finished()
    }

    /// Waits for both tasks and reports how the pair ended.
    pub(crate) async fn join(self) -> DeviceOutcome {
        let device_id = self.device.id();
        let consumer = match self.consumer.await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(err)) => {
                error!(
                    event = events::DISPATCH_TASK_FAILED,
                    component = COMPONENT,
                    device_id = %device_id,
                    task = "consumer",
                    err = %err,
                    "consumer failed"
                );
                None
            }
            Err(join_err) => {
                error!(
                    event = events::DISPATCH_TASK_FAILED,
                    component = COMPONENT,
                    device_id = %device_id,
                    task = "consumer",
                    err = %join_err,
                    "consumer task panicked"
                );
                None
            }
        };

        if let Err(join_err) = self.producer.await {
            error!(
                event = events::DISPATCH_TASK_FAILED,
                component = COMPONENT,
                device_id = %device_id,
                task = "producer",
                err = %join_err,
                "producer task aborted"
            );
        }

        let stats = self.device.stats();
        match consumer {
            Some(report) => DeviceOutcome::Completed { report, stats },
            None => DeviceOutcome::Failed { stats },
        }
    }
}
