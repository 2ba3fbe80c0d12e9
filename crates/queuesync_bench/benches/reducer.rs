//! Queue reducer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use queuesync_bench::terminal_workload;
use queuesync_engine::reducer::{apply_event, sort_vehicles};
use queuesync_protocol::{QueueEvent, VehicleStatus};
use queuesync_testkit::{queue_of, vehicle};

const SIZES: [u32; 3] = [10, 100, 1000];

/// Benchmark single incremental events against growing queues.
fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental");

    for size in SIZES {
        let queue = queue_of(size);
        let middle = format!("v{}", size / 2);

        group.bench_with_input(BenchmarkId::new("join_tail", size), &queue, |b, queue| {
            let event = QueueEvent::joined(vehicle("new", size + 1, 14));
            b.iter(|| black_box(apply_event(queue.clone(), black_box(&event))));
        });

        group.bench_with_input(BenchmarkId::new("leave_front", size), &queue, |b, queue| {
            let event = QueueEvent::left("v1");
            b.iter(|| black_box(apply_event(queue.clone(), black_box(&event))));
        });

        group.bench_with_input(BenchmarkId::new("seat_change", size), &queue, |b, queue| {
            let event = QueueEvent::seat_count_changed(middle.as_str(), 3);
            b.iter(|| black_box(apply_event(queue.clone(), black_box(&event))));
        });

        group.bench_with_input(BenchmarkId::new("depart_front", size), &queue, |b, queue| {
            let event = QueueEvent::status_changed("v1", VehicleStatus::Departed);
            b.iter(|| black_box(apply_event(queue.clone(), black_box(&event))));
        });
    }

    group.finish();
}

/// Benchmark full syncs, sorted and reversed.
fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync");

    for size in SIZES {
        let sorted = queue_of(size);
        let mut reversed = sorted.clone();
        reversed.reverse();
        group.throughput(Throughput::Elements(u64::from(size)));

        group.bench_with_input(BenchmarkId::new("sorted", size), &sorted, |b, snapshot| {
            let event = QueueEvent::synced(snapshot.clone());
            b.iter(|| black_box(apply_event(Vec::new(), black_box(&event))));
        });

        group.bench_with_input(BenchmarkId::new("reversed", size), &reversed, |b, snapshot| {
            b.iter(|| black_box(sort_vehicles(black_box(snapshot.clone()))));
        });
    }

    group.finish();
}

/// Benchmark a realistic stream of mixed events.
fn bench_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("workload");

    for size in SIZES {
        let queue = queue_of(size);
        let events = terminal_workload(size, 200);
        group.throughput(Throughput::Elements(events.len() as u64));

        group.bench_with_input(BenchmarkId::new("terminal", size), &events, |b, events| {
            b.iter(|| {
                let mut vehicles = queue.clone();
                for event in events {
                    vehicles = apply_event(vehicles, black_box(event));
                }
                black_box(vehicles)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_incremental, bench_sync, bench_workload);
criterion_main!(benches);
