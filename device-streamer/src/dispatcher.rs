/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::collaborators::{PacketHandler, PacketSource};
use crate::config::DispatcherConfig;
use crate::control_plane::device_registry::DeviceRegistry;
use crate::device::device_object::Device;
use crate::device::lifecycle::LifecycleState;
use crate::device::packet::{DeviceId, Packet, PacketKind};
use crate::error::{ConfigError, DeviceError};
use crate::observability::{events, fields};
use crate::runtime::device_runtime::{spawn_device_tasks, DeviceOutcome, DeviceTasks};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "dispatcher";

/// Counters reported by [`Dispatcher::run`] once the packet source is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub devices_added: u64,
    /// Packets accepted into a device's inbox. Each one is later either handled or
    /// counted in `packets_discarded`.
    pub packets_routed: u64,
    /// Packets rejected by the dispatcher itself.
    pub packets_dropped: u64,
    /// Routed packets a device threw away: left in its inbox after its producer
    /// stopped, or stranded by a failed consumer.
    pub packets_discarded: u64,
    pub shutdown_timeouts: u64,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &DeviceOutcome) {
        self.packets_discarded += outcome.stats().discarded;
        if outcome.shutdown_timed_out() {
            self.shutdown_timeouts += 1;
        }
    }
}

/// Top-level loop: turns `AddDevice` packets into running devices and routes every
/// other packet to the device it names.
///
/// Share it behind an `Arc` to call [`request_shutdown`](Self::request_shutdown) or
/// [`registry_snapshot`](Self::registry_snapshot) while [`run`](Self::run) is active.
pub struct Dispatcher {
    config: DispatcherConfig,
    source: Arc<dyn PacketSource>,
    handler: Arc<dyn PacketHandler>,
    registry: Arc<DeviceRegistry>,
}

struct DispatchState {
    next_auto_id: u64,
    tasks: Vec<DeviceTasks>,
    summary: DispatchSummary,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        source: Arc<dyn PacketSource>,
        handler: Arc<dyn PacketHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            component = COMPONENT,
            name = %config.name,
            poll_interval_ms = config.poll_interval_ms,
            shutdown_timeout_ms = config.shutdown_timeout_ms,
            inbox_capacity = config.inbox_capacity,
            "dispatcher created"
        );
        Ok(Self {
            config,
            source,
            handler,
            registry: Arc::new(DeviceRegistry::new()),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        self.registry.clone()
    }

    /// Runs until the packet source reports end-of-stream, then closes every live
    /// device's inbox and waits until all of them have drained and deregistered.
    pub async fn run(&self) -> DispatchSummary {
        let name = self.config.name.as_str();
        info!(event = events::DISPATCH_START, component = COMPONENT, name, "dispatcher running");

        let mut state = DispatchState {
            next_auto_id: 1,
            tasks: Vec::new(),
            summary: DispatchSummary::default(),
        };

        while let Some(packet) = self.source.next_incoming_packet().await {
            let kind = packet.kind();
            let packet_target = fields::format_target(&packet);
            if let Err(err) = self.dispatch(packet, &mut state).await {
                state.summary.packets_dropped += 1;
                let event = match &err {
                    DeviceError::UnknownDevice(_) => events::DISPATCH_DROP_UNKNOWN_DEVICE,
                    DeviceError::DuplicateDevice(_) => events::DISPATCH_DROP_DUPLICATE_DEVICE,
                    DeviceError::InboxClosed(_) => events::DISPATCH_DROP_INBOX_CLOSED,
                    _ => events::DISPATCH_DROP_PROTOCOL_VIOLATION,
                };
                warn!(
                    event,
                    component = COMPONENT,
                    name,
                    %kind,
                    packet_target = packet_target.as_str(),
                    err = %err,
                    "dropping packet"
                );
            }
            Self::reap_finished(&mut state).await;
        }

        let live = self.registry.snapshot().await;
        info!(
            event = events::DISPATCH_END_OF_STREAM,
            component = COMPONENT,
            name,
            live_devices = live.len(),
            "end of stream, draining devices"
        );
        for device in live {
            device.close_inbox();
        }

        let outcomes = join_all(state.tasks.drain(..).map(DeviceTasks::join)).await;
        for outcome in &outcomes {
            state.summary.record(outcome);
        }

        info!(
            event = events::DISPATCH_COMPLETE,
            component = COMPONENT,
            name,
            devices_added = state.summary.devices_added,
            packets_routed = state.summary.packets_routed,
            packets_dropped = state.summary.packets_dropped,
            packets_discarded = state.summary.packets_discarded,
            shutdown_timeouts = state.summary.shutdown_timeouts,
            "dispatcher finished"
        );
        state.summary
    }

    /// Triggers the `Stopping` transition of one live device.
    pub async fn request_shutdown(&self, device_id: DeviceId) -> Result<(), DeviceError> {
        let device = self
            .registry
            .find(device_id)
            .await
            .ok_or(DeviceError::UnknownDevice(device_id))?;
        device.request_shutdown();
        Ok(())
    }

    /// Ids of all live devices, ordered.
    pub async fn registry_snapshot(&self) -> Vec<DeviceId> {
        self.registry.ids().await
    }

    pub async fn device(&self, device_id: DeviceId) -> Option<Arc<Device>> {
        self.registry.find(device_id).await
    }

    async fn dispatch(&self, packet: Packet, state: &mut DispatchState) -> Result<(), DeviceError> {
        match packet.kind() {
            PacketKind::AddDevice => {
                let device_id = match packet.target() {
                    Some(device_id) => device_id,
                    None => self.next_free_id(state).await,
                };
                self.add_device(device_id, state).await
            }
            kind @ (PacketKind::Read | PacketKind::Write) => {
                let device_id = packet.target().ok_or_else(|| {
                    DeviceError::protocol_violation(kind, "packet carries no target device id")
                })?;
                let device = self
                    .registry
                    .find(device_id)
                    .await
                    .ok_or(DeviceError::UnknownDevice(device_id))?;
                device.deliver(packet).await?;
                state.summary.packets_routed += 1;
                debug!(
                    event = events::DISPATCH_ROUTED,
                    component = COMPONENT,
                    device_id = %device_id,
                    %kind,
                    "routed packet"
                );
                Ok(())
            }
        }
    }

    async fn next_free_id(&self, state: &mut DispatchState) -> DeviceId {
        loop {
            let candidate = DeviceId(state.next_auto_id);
            state.next_auto_id += 1;
            if !self.registry.contains(candidate).await {
                return candidate;
            }
        }
    }

    async fn add_device(&self, device_id: DeviceId, state: &mut DispatchState) -> Result<(), DeviceError> {
        let (device, inbox) = Device::new(device_id, self.config.inbox_capacity);
        let device = Arc::new(device);

        self.registry.insert(device.clone()).await?;
        device.transition(LifecycleState::Starting, LifecycleState::Running)?;

        state.tasks.push(spawn_device_tasks(
            device,
            inbox,
            self.registry.clone(),
            self.handler.clone(),
            &self.config,
        ));
        state.summary.devices_added += 1;
        info!(
            event = events::DISPATCH_DEVICE_ADDED,
            component = COMPONENT,
            device_id = %device_id,
            "device added"
        );
        Ok(())
    }

    /// Collects task pairs that have already exited so the list does not grow with
    /// every device ever added.
    async fn reap_finished(state: &mut DispatchState) {
        let mut index = 0;
        while index < state.tasks.len() {
            if state.tasks[index].is_finished() {
                let tasks = state.tasks.swap_remove(index);
                let device_id = tasks.device();
                let outcome = tasks.join().await;
                debug!(component = COMPONENT, device_id = %device_id, ?outcome, "reaped device tasks");
                state.summary.record(&outcome);
            } else {
                index += 1;
            }
        }
    }
}
