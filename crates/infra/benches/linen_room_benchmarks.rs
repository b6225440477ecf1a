use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{FixedOffset, Utc};
use linenroom_core::ChangeId;
use linenroom_infra::{ChangeFeed, InMemoryLinenStore, LinenStore, Reporting, RequestEngine};
use linenroom_supplies::{Catalog, Floor, FloorRange, RequestBatch, RequestLine};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .build()
        .expect("failed to build tokio runtime")
}

fn seeded_store() -> Arc<InMemoryLinenStore> {
    Arc::new(InMemoryLinenStore::seeded(
        &Catalog::defaults(),
        &FloorRange::default(),
        Utc::now(),
    ))
}

fn batch(floor: i32, lines: usize) -> RequestBatch {
    let catalog = Catalog::defaults();
    RequestBatch::new(
        Floor::new(floor),
        catalog
            .names()
            .cycle()
            .take(lines)
            .map(|name| RequestLine {
                item: name.to_string(),
                quantity: 2,
            })
            .collect(),
    )
}

/// Fill the log with `n` single-line requests spread over every floor.
fn populate(rt: &Runtime, store: &Arc<InMemoryLinenStore>, n: usize) {
    let floors = FloorRange::default();
    let floor_numbers: Vec<i32> = floors.iter().map(|f| f.number()).collect();
    rt.block_on(async {
        for i in 0..n {
            let floor = floor_numbers[i % floor_numbers.len()];
            store
                .record_request(&batch(floor, 1), &floors, Utc::now())
                .await
                .expect("populate failed");
        }
    });
}

fn bench_request_submission(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("request_submission");

    for lines in [1usize, 5, 20].iter() {
        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, &lines| {
            let engine = RequestEngine::new(seeded_store(), FloorRange::default());
            let request = batch(5, lines);
            b.iter(|| {
                rt.block_on(engine.submit_request(black_box(request.clone())))
                    .expect("request failed")
            });
        });
    }
    group.finish();
}

fn bench_pending_summary(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("admin_summary");

    for movements in [100usize, 1_000, 10_000].iter() {
        let store = seeded_store();
        populate(&rt, &store, *movements);
        let reporting = Reporting::new(store, FloorRange::default(), 50, FixedOffset::east_opt(0).expect("utc"));
        group.bench_with_input(BenchmarkId::from_parameter(movements), movements, |b, _| {
            b.iter(|| rt.block_on(reporting.admin_summary()).expect("summary failed"));
        });
    }
    group.finish();
}

fn bench_change_feed_poll(c: &mut Criterion) {
    let rt = runtime();
    let store = seeded_store();
    populate(&rt, &store, 10_000);
    let feed = ChangeFeed::new(store);

    c.bench_function("change_feed_poll_tail", |b| {
        b.iter(|| {
            rt.block_on(feed.poll_since(black_box(ChangeId::new(9_990))))
                .expect("poll failed")
        });
    });
}

criterion_group!(
    benches,
    bench_request_submission,
    bench_pending_summary,
    bench_change_feed_poll
);
criterion_main!(benches);
