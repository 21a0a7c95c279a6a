//! Producer task: moves packets from a device's inbox into its read/write queues.

use crate::device::device_object::Device;
use crate::device::packet::Packet;
use crate::error::DeviceError;
use crate::observability::{events, fields};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, trace, warn};

const COMPONENT: &str = "producer";

pub(crate) struct DeviceProducer {
    device: Arc<Device>,
    inbox: Receiver<Packet>,
}

impl DeviceProducer {
    pub(crate) fn new(device: Arc<Device>, inbox: Receiver<Packet>) -> Self {
        Self { device, inbox }
    }

    /// Runs until the consumer signals stop or the inbox reaches end-of-stream, then
    /// confirms quiescence exactly once.
    pub(crate) async fn produce_loop(mut self) {
        let device_id = self.device.id();
        info!(
            event = events::PRODUCER_START,
            component = COMPONENT,
            device_id = %device_id,
            "producer started"
        );

        let mut enqueued: u64 = 0;
        loop {
            if self.device.producer_should_stop() {
                break;
            }

            // The stop arm only wins at an iteration boundary; an enqueue in progress
            // always completes first.
            let next = tokio::select! {
                biased;
                _ = self.device.producer_stop_signalled() => break,
                packet = self.inbox.recv() => packet,
            };

            match next {
                Some(packet) => {
                    if self.route(packet) {
                        enqueued += 1;
                    }
                }
                None => {
                    debug!(
                        event = events::PRODUCER_END_OF_STREAM,
                        component = COMPONENT,
                        device_id = %device_id,
                        "inbox closed, requesting device shutdown"
                    );
                    self.device.request_shutdown();
                    break;
                }
            }
        }

        self.inbox.close();
        let mut discarded: u64 = 0;
        while self.inbox.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.device.record_discarded(discarded);
            warn!(
                event = events::PRODUCER_DISCARD_AFTER_STOP,
                component = COMPONENT,
                device_id = %device_id,
                discarded,
                "packets delivered after stop were not enqueued"
            );
        }

        self.device.confirm_producer_stopped();
        info!(
            event = events::PRODUCER_STOPPED,
            component = COMPONENT,
            device_id = %device_id,
            enqueued,
            "producer stopped"
        );
    }

    /// Pushes one packet onto the matching queue. Returns `false` if it was dropped.
    fn route(&self, packet: Packet) -> bool {
        let device_id = self.device.id();
        if packet.target() != Some(device_id) {
            let err = DeviceError::protocol_violation(
                packet.kind(),
                format!("targets {} but reached {device_id}", fields::format_target(&packet)),
            );
            warn!(
                event = events::PRODUCER_DROP_PROTOCOL_VIOLATION,
                component = COMPONENT,
                device_id = %device_id,
                err = %err,
                "dropping misrouted packet"
            );
            self.device.record_discarded(1);
            return false;
        }

        let kind = packet.kind();
        let payload_len = fields::format_payload_len(&packet);
        match self.device.enqueue(packet) {
            Ok(()) => {
                trace!(
                    event = events::PRODUCER_ENQUEUE,
                    component = COMPONENT,
                    device_id = %device_id,
                    %kind,
                    payload_len,
                    "enqueued packet"
                );
                true
            }
            Err(err) => {
                warn!(
                    event = events::PRODUCER_DROP_PROTOCOL_VIOLATION,
                    component = COMPONENT,
                    device_id = %device_id,
                    err = %err,
                    "dropping packet"
                );
                self.device.record_discarded(1);
                false
            }
        }
    }
}
