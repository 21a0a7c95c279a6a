//! Per-direction FIFO packet queue owned by one device.

use crate::device::packet::Packet;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Unbounded FIFO of packets guarded by its own lock.
///
/// Every operation takes the lock, does a single push or pop, and releases it before
/// returning, so a queue lock is never held together with any other lock and never
/// across an `.await`. `push` wakes nobody; the consumer polls with [`try_pop`](Self::try_pop).
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: Mutex<VecDeque<Packet>>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // push/pop never leave the deque half-updated, so a poisoned lock is still usable.
    fn guard(&self) -> MutexGuard<'_, VecDeque<Packet>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, packet: Packet) {
        self.guard().push_back(packet);
    }

    /// Removes and returns the head, or `None` immediately when the queue is empty.
    pub fn try_pop(&self) -> Option<Packet> {
        self.guard().pop_front()
    }

    /// Racy emptiness check for diagnostics only; `try_pop` is authoritative.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }
}

#[cfg(test)]
mod tests {
    use super::PacketQueue;
    use crate::device::packet::{DeviceId, Packet};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_pop_on_empty_queue_returns_none_repeatedly() {
        let queue = PacketQueue::new();
        for _ in 0..10_000 {
            assert!(queue.try_pop().is_none());
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn pops_in_push_order() {
        let queue = PacketQueue::new();
        for i in 0..5u8 {
            queue.push(Packet::read(DeviceId(1), vec![i]));
        }
        assert_eq!(queue.len(), 5);

        let popped: Vec<u8> = std::iter::from_fn(|| queue.try_pop())
            .map(|packet| packet.payload()[0])
            .collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn concurrent_pushers_and_poppers_lose_and_duplicate_nothing() {
        const PUSHERS: u32 = 4;
        const PER_PUSHER: u32 = 2_500;

        let queue = Arc::new(PacketQueue::new());

        let pushers: Vec<_> = (0..PUSHERS)
            .map(|pusher| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for seq in 0..PER_PUSHER {
                        let mut payload = pusher.to_be_bytes().to_vec();
                        payload.extend_from_slice(&seq.to_be_bytes());
                        queue.push(Packet::write(DeviceId(1), payload));
                    }
                })
            })
            .collect();

        let poppers: Vec<_> = (0..2)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    let mut idle_rounds = 0;
                    while idle_rounds < 1_000 {
                        match queue.try_pop() {
                            Some(packet) => {
                                idle_rounds = 0;
                                seen.push(packet.into_payload());
                            }
                            None => {
                                idle_rounds += 1;
                                thread::yield_now();
                            }
                        }
                    }
                    seen
                })
            })
            .collect();

        for pusher in pushers {
            pusher.join().expect("pusher thread");
        }
        let mut popped: Vec<Vec<Vec<u8>>> = poppers
            .into_iter()
            .map(|popper| popper.join().expect("popper thread"))
            .collect();
        // Whatever the poppers gave up on is still queued.
        popped.push(std::iter::from_fn(|| queue.try_pop()).map(|p| p.into_payload()).collect());

        // Per popper, each pusher's sequence numbers must come out increasing.
        for seen in &popped {
            let mut last_seq = vec![None::<u32>; PUSHERS as usize];
            for payload in seen {
                let pusher = u32::from_be_bytes(payload[0..4].try_into().unwrap()) as usize;
                let seq = u32::from_be_bytes(payload[4..8].try_into().unwrap());
                if let Some(prev) = last_seq[pusher] {
                    assert!(seq > prev, "pusher {pusher} reordered: {prev} then {seq}");
                }
                last_seq[pusher] = Some(seq);
            }
        }

        let all: Vec<&Vec<u8>> = popped.iter().flatten().collect();
        let unique: HashSet<&Vec<u8>> = all.iter().copied().collect();
        assert_eq!(all.len(), (PUSHERS * PER_PUSHER) as usize);
        assert_eq!(unique.len(), all.len());
    }
}
