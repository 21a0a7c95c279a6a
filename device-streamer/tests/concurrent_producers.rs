use device_streamer::{DeviceId, Dispatcher, DispatcherConfig, Packet, PacketKind};
use integration_test_utils::{init_tracing, ChannelPacketSource, RecordingHandler};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);
const PER_WRITER: usize = 500;

fn payload(writer: usize, n: usize) -> Vec<u8> {
    format!("{writer}:{n}").into_bytes()
}

fn assert_per_writer_order(handled: &[Vec<u8>], writers: usize) {
    for writer in 0..writers {
        let prefix = format!("{writer}:");
        let seen: Vec<&Vec<u8>> = handled
            .iter()
            .filter(|payload| payload.starts_with(prefix.as_bytes()))
            .collect();
        let expected: Vec<Vec<u8>> = (0..PER_WRITER).map(|n| payload(writer, n)).collect();
        assert_eq!(seen.len(), PER_WRITER, "writer {writer} lost or duplicated packets");
        assert!(
            seen.iter().zip(expected.iter()).all(|(got, want)| *got == want),
            "writer {writer} order was not preserved"
        );
    }
}

async fn started_dispatcher(
    handler: Arc<RecordingHandler>,
) -> (
    Arc<Dispatcher>,
    integration_test_utils::PacketFeed,
    tokio::task::JoinHandle<device_streamer::DispatchSummary>,
) {
    let (source, feed) = ChannelPacketSource::new();
    let dispatcher = Arc::new(
        Dispatcher::new(DispatcherConfig::default(), Arc::new(source), handler).expect("dispatcher"),
    );
    let run = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.run().await }
    });
    (dispatcher, feed, run)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_writers_on_one_queue_deliver_every_packet_exactly_once() {
    init_tracing();
    let handler = Arc::new(RecordingHandler::new());
    let (dispatcher, feed, run) = started_dispatcher(handler.clone()).await;

    feed.add_device(DeviceId(1)).expect("feed");
    let device = loop {
        if let Some(device) = dispatcher.device(DeviceId(1)).await {
            break device;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    };

    let writers: Vec<_> = (0..2)
        .map(|writer| {
            let device = device.clone();
            tokio::spawn(async move {
                for n in 0..PER_WRITER {
                    device
                        .write_queue()
                        .push(Packet::write(DeviceId(1), payload(writer, n)));
                    if n % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.expect("writer task");
    }

    drop(feed);
    tokio::time::timeout(WAIT, run)
        .await
        .expect("run must return")
        .expect("run task");

    let handled = handler.payloads(DeviceId(1), PacketKind::Write);
    assert_eq!(handled.len(), 2 * PER_WRITER);
    assert_eq!(handler.count(), 2 * PER_WRITER);
    assert_per_writer_order(&handled, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_feeds_keep_per_device_order_end_to_end() {
    init_tracing();
    let handler = Arc::new(RecordingHandler::new());
    let (_dispatcher, feed, run) = started_dispatcher(handler.clone()).await;

    feed.add_device(DeviceId(1)).expect("feed");
    feed.add_device(DeviceId(2)).expect("feed");

    let feeders: Vec<_> = (0..2)
        .map(|writer| {
            let feed = feed.clone();
            let device = DeviceId(writer as u64 + 1);
            tokio::spawn(async move {
                for n in 0..PER_WRITER {
                    feed.send(Packet::write(device, payload(writer, n))).expect("feed");
                    feed.send(Packet::read(device, payload(writer, n))).expect("feed");
                }
            })
        })
        .collect();
    for feeder in feeders {
        feeder.await.expect("feeder task");
    }

    drop(feed);
    let summary = tokio::time::timeout(WAIT, run)
        .await
        .expect("run must return")
        .expect("run task");

    assert_eq!(summary.devices_added, 2);
    assert_eq!(summary.packets_routed, 4 * PER_WRITER as u64);
    assert_eq!(summary.packets_dropped, 0);
    for writer in 0..2 {
        let device = DeviceId(writer as u64 + 1);
        let expected: Vec<Vec<u8>> = (0..PER_WRITER).map(|n| payload(writer, n)).collect();
        assert_eq!(handler.payloads(device, PacketKind::Write), expected);
        assert_eq!(handler.payloads(device, PacketKind::Read), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_devices_drain_and_deregister_on_end_of_stream() {
    init_tracing();
    let handler = Arc::new(RecordingHandler::new());
    let (dispatcher, feed, run) = started_dispatcher(handler.clone()).await;

    for id in 1..=32 {
        feed.add_device(DeviceId(id)).expect("feed");
        feed.send(Packet::write(DeviceId(id), "w")).expect("feed");
        feed.send(Packet::read(DeviceId(id), "r")).expect("feed");
    }
    drop(feed);

    let summary = tokio::time::timeout(WAIT, run)
        .await
        .expect("run must return")
        .expect("run task");

    assert_eq!(summary.devices_added, 32);
    assert_eq!(handler.count(), 64);
    assert!(dispatcher.registry_snapshot().await.is_empty());
}
