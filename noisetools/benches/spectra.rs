#[allow(unused_imports)]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use noisetools::calc::{self, Periodogram};
use noisetools::source::MemorySource;

fn waveform(n_ticks: usize, seed: usize) -> Vec<i16> {
    (0..n_ticks)
        .map(|t| {
            let x = ((t * 7919 + seed * 104729) % 251) as i16 - 125;
            2048 + x / 8 + if t % 41 == 0 { 30 } else { 0 }
        })
        .collect()
}

fn periodogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("Periodogram");
    for n_ticks in [1024, 4096] {
        let p = Periodogram::new(n_ticks);
        let wf: Vec<f64> = waveform(n_ticks, 1).iter().map(|&x| x as f64).collect();
        let (mut input, mut spectrum, mut scratch) = p.buffers();
        let mut acc = vec![0f64; p.bins()];
        group.bench_with_input(BenchmarkId::new("accumulate", n_ticks), &n_ticks, |b, _| {
            b.iter(|| {
                input.copy_from_slice(&wf);
                p.accumulate(&mut input, &mut spectrum, &mut scratch, black_box(&mut acc)).unwrap();
            });
        });
    }
    group.finish();
}

fn run_averages(c: &mut Criterion) {
    let mut group = c.benchmark_group("Run averages");
    group.sample_size(10);
    let channels: Vec<u32> = (0..576).collect();
    let events = (0..5)
        .map(|e| channels.iter().map(|&ch| waveform(4096, e * 1000 + ch as usize)).collect())
        .collect();
    let src = MemorySource::new(channels, events).unwrap();
    group.bench_function("rms", |b| {
        b.iter(|| black_box(calc::rms(&src, 5).unwrap()));
    });
    group.bench_function("power", |b| {
        b.iter(|| black_box(calc::power(&src, 5, true).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, periodogram, run_averages);

criterion_main!(benches);
