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

//! Stable event names and field formatters for `tracing` output.
//!
//! Every event emitted by this crate carries `event = events::...` and
//! `component = ...` fields so log consumers can match on them without parsing
//! the human-readable message.

pub mod events;
pub mod fields;
