#[allow(unused_imports)]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use noisetools::calc;
use noisetools::snip::{self, SnipParams};

fn spectrum() -> Vec<f64> {
    calc::frequencies(4096)
        .iter()
        .enumerate()
        .map(|(k, f)| 1e4 / (1.0 + 10.0 * f) + if k % 97 == 0 { 5e4 } else { 0.0 })
        .collect()
}

fn background(c: &mut Criterion) {
    let mut group = c.benchmark_group("SNIP");
    let s = spectrum();
    for iterations in [5, 20, 50] {
        for apply_lls in [false, true] {
            let params = SnipParams { iterations, apply_lls, ..SnipParams::default() };
            let name = if apply_lls { "lls" } else { "linear" };
            group.bench_with_input(BenchmarkId::new(name, iterations), &params, |b, params| {
                b.iter(|| black_box(snip::background(&s, params).unwrap()));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, background);

criterion_main!(benches);
