//! Benchmarks for the questions a [`ConcreteDfa`] answers about its language.
//!
//! Run with: cargo bench -p byte-dfa --bench enumerate

use byte_dfa::{prelude::*, random::random_dfa};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Accepts exactly the words of length `length` over all bytes.
fn fixed_length(length: StateId) -> ConcreteDfa {
    ConcreteDfa::new(
        (0..=length).map(|n| {
            if n < length {
                TransitionSpec::ranges([(0, 255, n + 1)])
            } else {
                TransitionSpec::none()
            }
        }),
        [length],
        0,
    )
}

fn enumeration(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_matching_strings");
    for length in [4, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, length| {
            b.iter(|| {
                let dfa = fixed_length(*length);
                black_box(dfa.all_matching_strings().take(1000).count())
            })
        });
    }
    group.finish();
}

fn counting(c: &mut Criterion) {
    c.bench_function("count_strings", |b| {
        b.iter(|| {
            let dfa = fixed_length(64);
            black_box(dfa.count_strings(0, 64))
        })
    });
}

fn canonicalisation(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(42);
    let automata: Vec<_> = (0..50).map(|_| random_dfa(&mut rng, 30, 16)).collect();
    c.bench_function("canonicalise", |b| {
        b.iter(|| {
            for dfa in &automata {
                black_box(dfa.canonicalise());
            }
        })
    });
}

criterion_group!(benches, enumeration, counting, canonicalisation);
criterion_main!(benches);
