use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use device_streamer::{DeviceId, Packet, PacketQueue};
use std::sync::Arc;
use std::thread;

fn bench_push_pop_single_thread(c: &mut Criterion) {
    let queue = PacketQueue::new();
    c.bench_function("packet_queue_push_pop", |b| {
        b.iter(|| {
            queue.push(Packet::write(DeviceId(1), black_box(&b"payload"[..])));
            black_box(queue.try_pop());
        })
    });
}

fn bench_drain_after_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_queue_drain");
    for burst in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(burst as u64));
        group.bench_function(format!("burst_{burst}"), |b| {
            b.iter_batched(
                || {
                    let queue = PacketQueue::new();
                    for n in 0..burst {
                        queue.push(Packet::read(DeviceId(1), n.to_le_bytes().to_vec()));
                    }
                    queue
                },
                |queue| {
                    while let Some(packet) = queue.try_pop() {
                        black_box(packet);
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_contended_pushers(c: &mut Criterion) {
    const PER_PUSHER: usize = 1_000;
    let mut group = c.benchmark_group("packet_queue_contended");
    group.throughput(Throughput::Elements(2 * PER_PUSHER as u64));
    group.bench_function("two_pushers_one_popper", |b| {
        b.iter(|| {
            let queue = Arc::new(PacketQueue::new());
            let pushers: Vec<_> = (0..2)
                .map(|_| {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        for _ in 0..PER_PUSHER {
                            queue.push(Packet::write(DeviceId(1), &b"x"[..]));
                        }
                    })
                })
                .collect();

            let mut popped = 0;
            while popped < 2 * PER_PUSHER {
                if queue.try_pop().is_some() {
                    popped += 1;
                } else {
                    thread::yield_now();
                }
            }
            for pusher in pushers {
                pusher.join().unwrap();
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_push_pop_single_thread,
    bench_drain_after_burst,
    bench_contended_pushers
);
criterion_main!(benches);
