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

//! Device layer.
//!
//! Owns the packet model, the per-direction packet queues and the device lifecycle
//! state machine. Nothing in this layer touches the registry.
//!
//! ```
//! use device_streamer::{Device, DeviceId, LifecycleState, Packet};
//!
//! let (device, _inbox) = Device::new(DeviceId(1), 8);
//! assert_eq!(device.state(), LifecycleState::Starting);
//!
//! device.write_queue().push(Packet::write(DeviceId(1), "a"));
//! assert_eq!(device.write_queue().try_pop().map(|p| p.into_payload()), Some(b"a".to_vec()));
//! assert!(device.write_queue().try_pop().is_none());
//! ```

pub(crate) mod device_object;
pub(crate) mod lifecycle;
pub(crate) mod packet;
pub(crate) mod packet_queue;
