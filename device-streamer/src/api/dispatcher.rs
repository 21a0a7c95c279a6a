//! API facade helpers for the outward [`crate::Dispatcher`] contract.

use crate::{ConfigError, DeviceError, DeviceId, DispatchSummary, Dispatcher, DispatcherConfig};
use crate::{PacketHandler, PacketSource};
use std::sync::Arc;

pub fn new(
    config: DispatcherConfig,
    source: Arc<dyn PacketSource>,
    handler: Arc<dyn PacketHandler>,
) -> Result<Dispatcher, ConfigError> {
    Dispatcher::new(config, source, handler)
}

pub async fn dispatcher_run(dispatcher: &Dispatcher) -> DispatchSummary {
    dispatcher.run().await
}

pub async fn request_shutdown(dispatcher: &Dispatcher, device_id: DeviceId) -> Result<(), DeviceError> {
    dispatcher.request_shutdown(device_id).await
}

pub async fn registry_snapshot(dispatcher: &Dispatcher) -> Vec<DeviceId> {
    dispatcher.registry_snapshot().await
}
