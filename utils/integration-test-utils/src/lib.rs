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

//! Packet sources, handlers and tracing setup shared by `device-streamer`
//! integration tests.

use async_trait::async_trait;
use device_streamer::{DeviceId, Packet, PacketHandler, PacketKind, PacketSource};
use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `warn`). Safe to call
/// from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_ids(true)
            .try_init();
    });
}

/// A source fed from the test body. End-of-stream is reached once every
/// [`PacketFeed`] is dropped and the buffered packets are consumed.
pub struct ChannelPacketSource {
    packets: tokio::sync::Mutex<UnboundedReceiver<Packet>>,
}

#[derive(Clone)]
pub struct PacketFeed {
    sender: UnboundedSender<Packet>,
}

impl ChannelPacketSource {
    pub fn new() -> (Self, PacketFeed) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                packets: tokio::sync::Mutex::new(receiver),
            },
            PacketFeed { sender },
        )
    }
}

#[async_trait]
impl PacketSource for ChannelPacketSource {
    async fn next_incoming_packet(&self) -> Option<Packet> {
        self.packets.lock().await.recv().await
    }
}

impl PacketFeed {
    pub fn send(&self, packet: Packet) -> Result<(), SendError<Packet>> {
        self.sender.send(packet)
    }

    pub fn add_device(&self, device: DeviceId) -> Result<(), SendError<Packet>> {
        self.send(Packet::add_device(Some(device)))
    }
}

/// A fixed list of packets followed by end-of-stream.
pub struct ScriptedPacketSource {
    packets: Mutex<VecDeque<Packet>>,
    pause: Duration,
}

impl ScriptedPacketSource {
    pub fn new(packets: impl IntoIterator<Item = Packet>) -> Self {
        Self {
            packets: Mutex::new(packets.into_iter().collect()),
            pause: Duration::ZERO,
        }
    }

    /// Sleeps this long before handing out each packet.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn remaining(&self) -> usize {
        self.packets.lock().map(|packets| packets.len()).unwrap_or_default()
    }
}

#[async_trait]
impl PacketSource for ScriptedPacketSource {
    async fn next_incoming_packet(&self) -> Option<Packet> {
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        self.packets.lock().ok()?.pop_front()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandledPacket {
    pub device: DeviceId,
    pub kind: PacketKind,
    pub payload: Vec<u8>,
}

/// Records every handler invocation in call order.
#[derive(Default)]
pub struct RecordingHandler {
    handled: Mutex<Vec<HandledPacket>>,
    delay: Duration,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before recording.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            handled: Mutex::default(),
            delay,
        }
    }

    pub fn handled(&self) -> Vec<HandledPacket> {
        self.handled.lock().map(|handled| handled.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.handled.lock().map(|handled| handled.len()).unwrap_or_default()
    }

    pub fn payloads(&self, device: DeviceId, kind: PacketKind) -> Vec<Vec<u8>> {
        self.handled()
            .into_iter()
            .filter(|packet| packet.device == device && packet.kind == kind)
            .map(|packet| packet.payload)
            .collect()
    }

    /// Polls until at least `expected` calls were recorded. Returns `false` on timeout.
    pub async fn wait_for_count(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.count() < expected {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        true
    }

    async fn record(&self, device: DeviceId, kind: PacketKind, payload: Vec<u8>) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Ok(mut handled) = self.handled.lock() {
            handled.push(HandledPacket {
                device,
                kind,
                payload,
            });
        }
    }
}

#[async_trait]
impl PacketHandler for RecordingHandler {
    async fn handle_read(&self, device: DeviceId, payload: Vec<u8>) {
        self.record(device, PacketKind::Read, payload).await;
    }

    async fn handle_write(&self, device: DeviceId, payload: Vec<u8>) {
        self.record(device, PacketKind::Write, payload).await;
    }
}

/// Polls `condition` every millisecond until it holds. Returns `false` on timeout.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    true
}
