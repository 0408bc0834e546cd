//! Benchmarks for answer re-segmentation.
//!
//! Measures [`Restreamer`] throughput on a realistic multi-paragraph answer
//! delivered in small chunks, the way the upstream stream delivers it.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use medichat_chat::Restreamer;

/// Build a long answer (~4 KB) with mixed sentence and list boundaries.
fn generate_answer() -> String {
    let paragraph = "Most seasonal colds resolve within seven to ten days. \
         Rest and fluids help the body recover! If a fever lasts longer than \
         three days, contact your doctor. Do you also have a sore throat?\n\
         Common symptoms include:\n- runny nose\n- mild headache\n- fatigue\n";
    paragraph.repeat(12)
}

fn bench_restream_chunk_sizes(c: &mut Criterion) {
    let answer = generate_answer();
    let bytes = answer.as_bytes();

    let mut group = c.benchmark_group("restream");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.measurement_time(Duration::from_secs(5));

    for chunk_size in [7usize, 64, 512] {
        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let mut restreamer = Restreamer::new();
                let mut segments = Vec::new();
                for chunk in bytes.chunks(chunk_size) {
                    segments.extend(restreamer.push_bytes(chunk));
                }
                segments.extend(restreamer.finish());
                segments
            });
        });
    }

    group.finish();
}

/// Single-byte feeding splits every multi-byte character.
fn bench_restream_multibyte(c: &mut Criterion) {
    let answer = "Né à Zürich. Rendez-vous à 14h avec le médecin! Ça va?\n".repeat(40);
    let bytes = answer.as_bytes();

    let mut group = c.benchmark_group("restream_multibyte");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("byte_at_a_time", |b| {
        b.iter(|| {
            let mut restreamer = Restreamer::new();
            let mut count = 0usize;
            for chunk in bytes.chunks(1) {
                count += restreamer.push_bytes(chunk).len();
            }
            count + usize::from(restreamer.finish().is_some())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_restream_chunk_sizes, bench_restream_multibyte);
criterion_main!(benches);
