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

//! Dispatcher configuration, loadable from JSON5.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const DEFAULT_NAME: &str = "device-streamer";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_INBOX_CAPACITY: usize = 1_024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Label attached to dispatcher diagnostics.
    pub name: String,
    /// Consumer sleep between empty drain passes and between shutdown-wait polls.
    pub poll_interval_ms: u64,
    /// Upper bound on the consumer's wait for producer quiescence.
    pub shutdown_timeout_ms: u64,
    /// Bound of each device's inbox between dispatcher and producer.
    pub inbox_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    pub fn from_json5_str(raw: &str) -> Result<Self, ConfigError> {
        let config: DispatcherConfig = json5::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading dispatcher config");
        let raw = fs::read_to_string(path)?;
        Self::from_json5_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "shutdown_timeout_ms ({}) must be at least poll_interval_ms ({})",
                self.shutdown_timeout_ms, self.poll_interval_ms
            )));
        }
        if self.inbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inbox_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
