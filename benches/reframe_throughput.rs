//! Benchmarks for the reframing scan
//!
//! Measures bytes per second through `Reframer::process` for:
//! - Whole-stream chunks versus small network-sized chunks
//! - A sink that applies backpressure on every frame
//! - Streams with corrupt indicators that force resynchronization
//!
//! Platform: Cross-platform (synthetic in-memory streams, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use speechframe::sources::MemorySource;
use speechframe::test_utils::{amr_stream, drain};
use speechframe::{CollectingSink, ControlEvent, Reframer, ReframerConfig};
use std::hint::black_box;

/// Ten minutes of 12.2 kbit/s AMR.
fn ten_minutes() -> Vec<u8> {
    amr_stream(&vec![7; 30_000])
}

fn reframe(bytes: &[u8], chunk: usize, would_block_every: Option<usize>) -> usize {
    let mut source = MemorySource::new(bytes.to_vec()).with_chunk_sizes(&[chunk]);
    let mut sink = match would_block_every {
        Some(n) => CollectingSink::with_would_block_every(n),
        None => CollectingSink::new(),
    };
    let mut reframer = Reframer::new(ReframerConfig::default());
    reframer.handle_event(ControlEvent::Play { start: 0.0 });
    drain(&mut reframer, &mut source, &mut sink).expect("reframe");
    sink.frames.len()
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let bytes = ten_minutes();

    let mut group = c.benchmark_group("reframe_chunk_size");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for chunk in [7usize, 188, 4096, bytes.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, chunk| {
            b.iter(|| black_box(reframe(black_box(&bytes), *chunk, None)))
        });
    }
    group.finish();
}

fn bench_backpressure(c: &mut Criterion) {
    let bytes = ten_minutes();

    let mut group = c.benchmark_group("reframe_backpressure");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("would_block_every_frame", |b| {
        b.iter(|| black_box(reframe(black_box(&bytes), 4096, Some(1))))
    });
    group.bench_function("would_block_every_32_frames", |b| {
        b.iter(|| black_box(reframe(black_box(&bytes), 4096, Some(32))))
    });
    group.finish();
}

fn bench_resync(c: &mut Criterion) {
    let mut bytes = ten_minutes();
    // invalid frame type 12 every 500 frames
    for frame in (0..30_000).step_by(500) {
        bytes[6 + frame * 32] = 12 << 3 | 0x04;
    }

    let mut group = c.benchmark_group("reframe_resync");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("corrupt_every_500_frames", |b| {
        b.iter(|| black_box(reframe(black_box(&bytes), 4096, None)))
    });
    group.finish();
}

criterion_group!(benches, bench_chunk_sizes, bench_backpressure, bench_resync);
criterion_main!(benches);
