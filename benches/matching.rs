use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use entalign::{
    Alignment, AlignmentSet, BeamSearch, Bijective, EntityRef, Greedy, Matcher,
    MonteCarloTreeSearch, UniqueAssignment,
};

/// `n` left and right entities, each left linked to `fanout` random rights.
fn make_candidates(n: usize, fanout: usize, seed: u64) -> AlignmentSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let lefts: Vec<EntityRef> = (0..n)
        .map(|i| EntityRef::new(format!("http://left.example/{i}"), "left").unwrap())
        .collect();
    let rights: Vec<EntityRef> = (0..n)
        .map(|i| EntityRef::new(format!("http://right.example/{i}"), "right").unwrap())
        .collect();
    let mut set = AlignmentSet::new();
    for left in &lefts {
        for _ in 0..fanout {
            let right = &rights[rng.gen_range(0..n)];
            set.push(Alignment::new(left.clone(), right.clone(), rng.gen_range(0.0..1.0)));
        }
    }
    set
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("solvers");
    for n in [50usize, 200] {
        let candidates = make_candidates(n, 5, 42);
        group.throughput(Throughput::Elements(candidates.len() as u64));

        group.bench_with_input(BenchmarkId::new("greedy", n), &candidates, |b, input| {
            let matcher = Greedy::new(Bijective::default());
            b.iter(|| matcher.align(black_box(input.clone())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("beam-search", n), &candidates, |b, input| {
            let matcher = BeamSearch::new(Bijective::default()).with_beam_size(10);
            b.iter(|| matcher.align(black_box(input.clone())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("monte-carlo", n), &candidates, |b, input| {
            let matcher = MonteCarloTreeSearch::new(Bijective::default())
                .with_seed(7)
                .with_max_iterations(1_000);
            b.iter(|| matcher.align(black_box(input.clone())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("unique", n), &candidates, |b, input| {
            let matcher = UniqueAssignment::new();
            b.iter(|| matcher.align(black_box(input.clone())).unwrap());
        });
    }
    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let candidates = make_candidates(1_000, 10, 7);
    c.bench_function("sort_alignments_10k", |b| {
        b.iter(|| {
            let mut set = candidates.clone();
            set.sort_alignments();
            black_box(set.len())
        });
    });
}

criterion_group!(benches, bench_solvers, bench_sort);
criterion_main!(benches);
