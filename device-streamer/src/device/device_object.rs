//! A managed device: identity, two packet queues, lifecycle and stop signalling.

use crate::device::lifecycle::{Lifecycle, LifecycleState};
use crate::device::packet::{DeviceId, Packet, PacketKind};
use crate::device::packet_queue::PacketQueue;
use crate::error::DeviceError;
use crate::observability::events;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Notify;
use tracing::debug;

const COMPONENT: &str = "device";

/// Counters for one device, readable at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub reads_enqueued: u64,
    pub writes_enqueued: u64,
    pub reads_handled: u64,
    pub writes_handled: u64,
    /// Packets accepted into the inbox or queues that were never handled.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    reads_enqueued: AtomicU64,
    writes_enqueued: AtomicU64,
    reads_handled: AtomicU64,
    writes_handled: AtomicU64,
    discarded: AtomicU64,
}

/// One managed endpoint.
///
/// Shared as `Arc<Device>` between the registry, the producer and the consumer.
/// Only the registry's handle keeps it discoverable; the producer and consumer
/// handles exist for the lifetime of their tasks and are dropped when they exit.
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    read_queue: PacketQueue,
    write_queue: PacketQueue,
    lifecycle: Lifecycle,
    shutdown_requested: AtomicBool,
    producer_stopped: AtomicBool,
    stop_producer: Notify,
    inbox: Mutex<Option<Sender<Packet>>>,
    stats: StatCounters,
}

impl Device {
    /// Builds a device in `Starting` together with the receiving end of its inbox,
    /// which becomes the producer's packet source.
    pub fn new(id: DeviceId, inbox_capacity: usize) -> (Self, Receiver<Packet>) {
        let (tx, rx) = mpsc::channel(inbox_capacity.max(1));
        let device = Self {
            id,
            read_queue: PacketQueue::new(),
            write_queue: PacketQueue::new(),
            lifecycle: Lifecycle::new(id),
            shutdown_requested: AtomicBool::new(false),
            producer_stopped: AtomicBool::new(false),
            stop_producer: Notify::new(),
            inbox: Mutex::new(Some(tx)),
            stats: StatCounters::default(),
        };
        (device, rx)
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    pub fn read_queue(&self) -> &PacketQueue {
        &self.read_queue
    }

    pub fn write_queue(&self) -> &PacketQueue {
        &self.write_queue
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            reads_enqueued: self.stats.reads_enqueued.load(Ordering::Relaxed),
            writes_enqueued: self.stats.writes_enqueued.load(Ordering::Relaxed),
            reads_handled: self.stats.reads_handled.load(Ordering::Relaxed),
            writes_handled: self.stats.writes_handled.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), DeviceError> {
        self.lifecycle.advance(from, to)?;
        debug!(
            event = events::DEVICE_TRANSITION,
            component = COMPONENT,
            device_id = %self.id,
            %from,
            %to,
            "lifecycle transition"
        );
        Ok(())
    }

    /// Asks the consumer to begin shutdown. Idempotent; returns `false` if a request
    /// was already pending.
    pub fn request_shutdown(&self) -> bool {
        let first = !self.shutdown_requested.swap(true, Ordering::AcqRel);
        if first {
            debug!(
                event = events::DEVICE_SHUTDOWN_REQUESTED,
                component = COMPONENT,
                device_id = %self.id,
                "shutdown requested"
            );
        }
        first
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Hands a packet to this device's producer.
    pub(crate) async fn deliver(&self, packet: Packet) -> Result<(), DeviceError> {
        // Clone the sender out so the inbox lock is not held across the send.
        let sender = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender {
            Some(sender) => sender
                .send(packet)
                .await
                .map_err(|_| DeviceError::InboxClosed(self.id)),
            None => Err(DeviceError::InboxClosed(self.id)),
        }
    }

    /// Ends the producer's packet stream once what is already buffered is consumed.
    pub(crate) fn close_inbox(&self) {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn signal_producer_stop(&self) {
        // notify_one stores a permit, so a producer not yet parked still sees it.
        self.stop_producer.notify_one();
    }

    pub(crate) async fn producer_stop_signalled(&self) {
        self.stop_producer.notified().await;
    }

    pub(crate) fn producer_should_stop(&self) -> bool {
        self.state() >= LifecycleState::Stopping
    }

    /// Set by the producer exactly once, after its final enqueue.
    pub(crate) fn confirm_producer_stopped(&self) -> bool {
        !self.producer_stopped.swap(true, Ordering::AcqRel)
    }

    pub fn producer_stopped(&self) -> bool {
        self.producer_stopped.load(Ordering::Acquire)
    }

    pub(crate) fn enqueue(&self, packet: Packet) -> Result<(), DeviceError> {
        match packet.kind() {
            PacketKind::Read => {
                self.read_queue.push(packet);
                self.stats.reads_enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            PacketKind::Write => {
                self.write_queue.push(packet);
                self.stats.writes_enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            kind @ PacketKind::AddDevice => Err(
                DeviceError::protocol_violation(kind, "ADD_DEVICE is only valid at the dispatcher"),
            ),
        }
    }

    pub(crate) fn record_read_handled(&self) {
        self.stats.reads_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_handled(&self) {
        self.stats.writes_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: u64) {
        self.stats.discarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Tears down a device whose consumer died: walks the lifecycle forward to
    /// `Removed`, closes the inbox and tells the producer to stop.
    pub(crate) fn retire(&self) {
        let mut state = self.state();
        while let Some(next) = state.successor() {
            // The dying consumer may have stepped it concurrently.
            if let Err(DeviceError::InvalidTransition { from, .. }) = self.transition(state, next) {
                state = from;
                continue;
            }
            state = next;
        }
        self.close_inbox();
        self.signal_producer_stop();
    }

    /// Empties both queues without handling anything. Returns how many packets went.
    pub(crate) fn discard_queued(&self) -> u64 {
        let mut discarded = 0;
        for queue in [&self.read_queue, &self.write_queue] {
            while queue.try_pop().is_some() {
                discarded += 1;
            }
        }
        self.record_discarded(discarded);
        discarded
    }
}
