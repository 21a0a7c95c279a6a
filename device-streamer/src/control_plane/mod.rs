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

//! Control-plane layer.
//!
//! Owns the device registry: the single place a device becomes discoverable and the
//! single place it stops being discoverable. Removal is idempotent so a second,
//! spurious removal never disturbs other entries.
//!
//! ```
//! use std::sync::Arc;
//! use device_streamer::{Device, DeviceId, DeviceRegistry};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = DeviceRegistry::new();
//! let (device, _inbox) = Device::new(DeviceId(7), 8);
//! registry.insert(Arc::new(device)).await.unwrap();
//!
//! assert_eq!(registry.ids().await, vec![DeviceId(7)]);
//! assert!(registry.remove(DeviceId(7)).await.is_some());
//! assert!(registry.remove(DeviceId(7)).await.is_none());
//! # });
//! ```

pub(crate) mod device_registry;
