use std::time::{Duration, Instant, SystemTime};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feedwatch_core::{encode_frame, DataType, Endpoint, FeedMonitor, FrameFormat};

/// Benchmark record_message latency (hot receive path)
fn bench_record_message(c: &mut Criterion) {
    let monitor = FeedMonitor::new();
    let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "bench"), DataType::String);
    let handle = monitor.handle(&id).unwrap();

    c.bench_function("record_message", |b| {
        b.iter(|| {
            handle.record_message(black_box(&b"bench payload"[..]));
        });
    });
}

/// Benchmark record_message with varying payload sizes
fn bench_record_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_message_sizes");
    let monitor = FeedMonitor::new();
    let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "bench"), DataType::Image);
    let handle = monitor.handle(&id).unwrap();

    for size in [16usize, 1024, 64 * 1024].iter() {
        let payload = bytes::Bytes::from(vec![0u8; *size]);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                handle.record_message(black_box(payload.clone()));
            });
        });
    }
    group.finish();
}

/// Benchmark latest-value reads while the feed is being written
fn bench_get_most_recent_data(c: &mut Criterion) {
    let monitor = FeedMonitor::new();
    let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "bench"), DataType::String);
    monitor.handle(&id).unwrap().record_message("latest");

    c.bench_function("get_most_recent_data", |b| {
        b.iter(|| black_box(monitor.get_most_recent_data(black_box(&id))));
    });
}

/// Benchmark one aggregation cycle across many feeds
fn bench_aggregation_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_cycle");

    for feed_count in [1u16, 10, 100, 1000].iter() {
        let monitor = FeedMonitor::new();
        for port in 0..*feed_count {
            let id = monitor.register(Endpoint::new("127.0.0.1", 10_000 + port), DataType::String);
            monitor.handle(&id).unwrap().record_message("x");
        }
        let mut now = Instant::now();

        group.bench_with_input(BenchmarkId::from_parameter(feed_count), feed_count, |b, _| {
            b.iter(|| {
                now += Duration::from_millis(1);
                black_box(monitor.aggregate_at(now));
            });
        });
    }
    group.finish();
}

/// Benchmark frame encoding for both layouts
fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    let payload = vec![7u8; 1024];
    let mut out = Vec::with_capacity(2048);

    for format in [FrameFormat::Plain, FrameFormat::Timestamped] {
        group.bench_function(format!("{:?}", format), |b| {
            b.iter(|| {
                out.clear();
                encode_frame(format, black_box(&payload), SystemTime::now(), &mut out).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_record_message,
    bench_record_message_sizes,
    bench_get_most_recent_data,
    bench_aggregation_cycle,
    bench_encode_frame
);
criterion_main!(benches);
