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

//! Data-plane layer.
//!
//! Owns the per-device producer and consumer task bodies. The producer is the only
//! writer of a device's queues and of its producer-stopped flag; the consumer is the
//! only reader of the queues and the only driver of the lifecycle past `Running`.
//!
//! Handshake on shutdown:
//!
//! 1. consumer observes a stop request and moves the device to `Stopping`,
//! 2. consumer signals the producer, which finishes its current packet and sets its
//!    stopped flag,
//! 3. consumer observes the flag (or times out), moves to `Drained`, drains both
//!    queues one last time, deregisters the device and moves it to `Removed`.

pub(crate) mod consumer;
pub(crate) mod producer;
