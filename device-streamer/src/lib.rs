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

//! # device-streamer
//!
//! `device-streamer` runs a set of devices concurrently. Each device owns a read
//! queue and a write queue, fed by a producer task and drained by a consumer task.
//! A [`Dispatcher`] pulls packets from a [`PacketSource`], creates devices on
//! `AddDevice` packets and routes `Read`/`Write` packets to the device they target.
//! Drained packets are handed to a [`PacketHandler`].
//!
//! ## Quick start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use async_trait::async_trait;
//! use device_streamer::{
//!     DeviceId, Dispatcher, DispatcherConfig, Packet, PacketHandler, PacketSource,
//! };
//!
//! struct Script(Mutex<Vec<Packet>>);
//!
//! #[async_trait]
//! impl PacketSource for Script {
//!     async fn next_incoming_packet(&self) -> Option<Packet> {
//!         self.0.lock().unwrap().pop()
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Writes(Mutex<Vec<Vec<u8>>>);
//!
//! #[async_trait]
//! impl PacketHandler for Writes {
//!     async fn handle_read(&self, _device: DeviceId, _payload: Vec<u8>) {}
//!     async fn handle_write(&self, _device: DeviceId, payload: Vec<u8>) {
//!         self.0.lock().unwrap().push(payload);
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Popped from the back: AddDevice first, then the write.
//! let source = Arc::new(Script(Mutex::new(vec![
//!     Packet::write(DeviceId(1), "hello"),
//!     Packet::add_device(Some(DeviceId(1))),
//! ])));
//! let handler = Arc::new(Writes::default());
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default(), source, handler.clone()).unwrap();
//! let summary = dispatcher.run().await;
//!
//! assert_eq!(summary.devices_added, 1);
//! assert_eq!(*handler.0.lock().unwrap(), vec![b"hello".to_vec()]);
//! assert!(dispatcher.registry_snapshot().await.is_empty());
//! # });
//! ```
//!
//! ## Device lifecycle
//!
//! `Starting -> Running -> Stopping -> Drained -> Removed`, strictly forward.
//! A shutdown request moves a running device to `Stopping`; the consumer then waits
//! (bounded by [`DispatcherConfig::shutdown_timeout_ms`]) for the producer to confirm
//! it has stopped pushing, drains both queues one last time, deregisters the device
//! and marks it `Removed`.
//!
//! ## Internal architecture map
//!
//! - API facade: free functions over the dispatcher
//! - Device: packet model, packet queues and the lifecycle state machine
//! - Control plane: device registry ownership
//! - Data plane: producer and consumer tasks
//! - Runtime: spawning and joining a device's task pair
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events. Library code emits events and never
//! installs a global subscriber; binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization.

pub mod api;
mod collaborators;
pub use collaborators::{PacketHandler, PacketSource};

mod config;
pub use config::DispatcherConfig;

mod control_plane;
pub use control_plane::device_registry::DeviceRegistry;

mod data_plane;
pub use data_plane::consumer::ConsumerReport;

mod device;
pub use device::device_object::{Device, DeviceStats};
pub use device::lifecycle::LifecycleState;
pub use device::packet::{DeviceId, Packet, PacketKind};
pub use device::packet_queue::PacketQueue;

mod dispatcher;
pub use dispatcher::{DispatchSummary, Dispatcher};

mod error;
pub use error::{ConfigError, DeviceError};

#[doc(hidden)]
pub mod observability;
mod runtime;
