//! Trace reconstruction throughput benchmark
//!
//! Measures how fast flow events are turned into execution and message
//! traces:
//!
//! 1. `reconstruct` on a single deep call chain
//! 2. `reconstruct` on a wide trace (one root, many siblings)
//! 3. `reconstruct_all` over a batch of traces with 1..8 workers
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench reconstruction_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowtrace::config::ReconstructionConfig;
use flowtrace::flow_event::{FlowEvent, TraceEventRecords, TraceMetadata};
use flowtrace::reconstruction::TraceReconstructor;

fn signature(level: usize) -> (String, String) {
    let class = format!("bench.C{}", level % 16);
    (format!("void {}.op{}(int, long)", class, level), class)
}

/// `depth` nested invocations, each announced by a call marker
fn deep_chain(trace_id: i64, depth: usize) -> TraceEventRecords {
    let mut events = Vec::with_capacity(depth * 3);
    let push = |events: &mut Vec<FlowEvent>, f: &dyn Fn(i64, i32) -> FlowEvent| {
        let idx = events.len() as i32;
        events.push(f(i64::from(idx), idx));
    };

    for level in 0..depth {
        let (sig, class) = signature(level);
        if level > 0 {
            let (caller_sig, caller_class) = signature(level - 1);
            push(&mut events, &|ts: i64, idx: i32| {
                FlowEvent::call_operation(ts, trace_id, idx, &caller_sig, &caller_class, &sig, &class)
            });
        }
        push(&mut events, &|ts: i64, idx: i32| {
            FlowEvent::before_operation(ts, trace_id, idx, &sig, &class)
        });
    }
    for level in (0..depth).rev() {
        let (sig, class) = signature(level);
        push(&mut events, &|ts: i64, idx: i32| {
            FlowEvent::after_operation(ts, trace_id, idx, &sig, &class)
        });
    }

    TraceEventRecords::new(TraceMetadata::new(trace_id, "bench", "srv"), events)
}

/// One root calling `width` leaves in sequence
fn wide_trace(trace_id: i64, width: usize) -> TraceEventRecords {
    let (root_sig, root_class) = signature(0);
    let mut events = vec![FlowEvent::before_operation(0, trace_id, 0, &root_sig, &root_class)];

    for leaf in 1..=width {
        let (sig, class) = signature(leaf);
        let idx = events.len() as i32;
        let ts = i64::from(idx);
        events.push(FlowEvent::call_operation(
            ts, trace_id, idx, &root_sig, &root_class, &sig, &class,
        ));
        events.push(FlowEvent::before_operation(ts + 1, trace_id, idx + 1, &sig, &class));
        events.push(FlowEvent::after_operation(ts + 2, trace_id, idx + 2, &sig, &class));
    }

    let idx = events.len() as i32;
    events.push(FlowEvent::after_operation(
        i64::from(idx),
        trace_id,
        idx,
        &root_sig,
        &root_class,
    ));
    TraceEventRecords::new(TraceMetadata::new(trace_id, "bench", "srv"), events)
}

/// Benchmark: single deep trace at increasing depth
fn bench_deep_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_deep_chain");
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());

    for depth in [8, 64, 256] {
        let records = deep_chain(1, depth);
        group.throughput(Throughput::Elements(records.events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &records, |b, records| {
            b.iter(|| black_box(reconstructor.reconstruct(records.clone())));
        });
    }

    group.finish();
}

/// Benchmark: one root with many children
fn bench_wide_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_wide_trace");
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());

    for width in [16, 256, 1024] {
        let records = wide_trace(1, width);
        group.throughput(Throughput::Elements(records.events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &records, |b, records| {
            b.iter(|| black_box(reconstructor.reconstruct(records.clone())));
        });
    }

    group.finish();
}

/// Benchmark: batch reconstruction with varying worker counts
fn bench_reconstruct_all_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_all_workers");
    let batch: Vec<TraceEventRecords> = (0..256).map(|id| deep_chain(id, 32)).collect();
    group.throughput(Throughput::Elements(batch.len() as u64));

    for workers in [1, 2, 4, 8] {
        let reconstructor = TraceReconstructor::new(ReconstructionConfig {
            workers,
            ..ReconstructionConfig::default()
        });
        group.bench_with_input(BenchmarkId::from_parameter(workers), &batch, |b, batch| {
            b.iter(|| black_box(reconstructor.reconstruct_all(batch.clone())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_deep_chain,
    bench_wide_trace,
    bench_reconstruct_all_workers
);
criterion_main!(benches);
