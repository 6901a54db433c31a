use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use range_tree::{AsyncIntervalTree, IntervalTree, RebuildPolicy};
use std::hint::black_box;

struct IntervalGenerator {
    rng: StdRng,
    limit: u32,
}
impl IntervalGenerator {
    fn new() -> Self {
        const LIMIT: u32 = 1000;
        Self {
            rng: StdRng::from_seed([0; 32]),
            limit: LIMIT,
        }
    }

    fn next(&mut self) -> (u32, u32) {
        let low = self.rng.gen_range(0..self.limit);
        let high = self.rng.gen_range(low..=self.limit);
        (low, high)
    }
}

fn filled_tree(count: usize) -> IntervalTree<u32, usize> {
    let mut gen = IntervalGenerator::new();
    let mut tree = IntervalTree::new();
    for v in 0..count {
        let (low, high) = gen.next();
        tree.add(low, high, v).unwrap();
    }
    tree
}

// build helper fn
fn interval_tree_build(count: usize, bench: &mut Bencher) {
    let tree = filled_tree(count);
    bench.iter(|| {
        let mut tree = IntervalTree::from_entries(tree.iter().cloned());
        black_box(tree.query(&500).len());
    });
}

// point query helper fn
fn interval_tree_query(count: usize, bench: &mut Bencher) {
    let mut tree = filled_tree(count);
    tree.rebuild();
    let mut gen = IntervalGenerator::new();
    let points: Vec<_> = std::iter::repeat_with(|| gen.next().0).take(100).collect();
    bench.iter(|| {
        for p in &points {
            black_box(tree.query(p).len());
        }
    });
}

// range query helper fn
fn interval_tree_query_range(count: usize, bench: &mut Bencher) {
    let mut tree = filled_tree(count);
    tree.rebuild();
    let mut gen = IntervalGenerator::new();
    let ranges: Vec<_> = std::iter::repeat_with(|| gen.next()).take(100).collect();
    bench.iter(|| {
        for (from, to) in &ranges {
            black_box(tree.query_range(from, to).len());
        }
    });
}

// interleaved add and query helper fn
fn async_tree_add_query(count: usize, bench: &mut Bencher) {
    let mut gen = IntervalGenerator::new();
    let intervals: Vec<_> = std::iter::repeat_with(|| gen.next()).take(count).collect();
    bench.iter(|| {
        let tree = AsyncIntervalTree::with_policy(RebuildPolicy::default());
        for (v, &(low, high)) in intervals.iter().enumerate() {
            tree.add(low, high, v).unwrap();
            black_box(tree.query(&low).len());
        }
        tree.wait_for_rebuild();
    });
}

fn bench_interval_tree_build(c: &mut Criterion) {
    c.bench_function("bench_interval_tree_build_100", |b| {
        interval_tree_build(100, b)
    });
    c.bench_function("bench_interval_tree_build_1000", |b| {
        interval_tree_build(1000, b)
    });
    c.bench_function("bench_interval_tree_build_10,000", |b| {
        interval_tree_build(10_000, b)
    });
    c.bench_function("bench_interval_tree_build_100,000", |b| {
        interval_tree_build(100_000, b)
    });
}

fn bench_interval_tree_query(c: &mut Criterion) {
    c.bench_function("bench_interval_tree_query_1000", |b| {
        interval_tree_query(1000, b)
    });
    c.bench_function("bench_interval_tree_query_10,000", |b| {
        interval_tree_query(10_000, b)
    });
    c.bench_function("bench_interval_tree_query_range_1000", |b| {
        interval_tree_query_range(1000, b)
    });
    c.bench_function("bench_interval_tree_query_range_10,000", |b| {
        interval_tree_query_range(10_000, b)
    });
}

fn bench_async_tree(c: &mut Criterion) {
    c.bench_function("bench_async_tree_add_query_1000", |b| {
        async_tree_add_query(1000, b)
    });
}

criterion_group!(
    benches,
    bench_interval_tree_build,
    bench_interval_tree_query,
    bench_async_tree
);
criterion_main!(benches);
