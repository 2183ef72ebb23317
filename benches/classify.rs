//! Benchmarks for classification and realisation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dlbridge::reasoner::Reasoner;

/// A balanced told hierarchy with `width` children per class, `depth` levels
/// deep, and one individual per leaf.
fn tree_kb(width: usize, depth: usize) -> Reasoner {
    let mut r = Reasoner::new();
    let root = r.declare_class("C").unwrap();
    let mut level = vec![(String::from("C"), root)];
    for _ in 0..depth {
        let mut next = Vec::new();
        for (name, parent) in &level {
            for i in 0..width {
                let child_name = format!("{name}.{i}");
                let child = r.declare_class(&child_name).unwrap();
                r.implies_concepts(&child, parent).unwrap();
                next.push((child_name, child));
            }
        }
        level = next;
    }
    for (name, leaf) in &level {
        let ind = r.declare_individual(&format!("i{name}")).unwrap();
        r.instance_of(&ind, leaf).unwrap();
    }
    r
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_tree_4x4", |bench| {
        bench.iter_with_setup(
            || tree_kb(4, 4),
            |mut r| {
                r.classify().unwrap();
                black_box(r)
            },
        )
    });
}

fn bench_realise(c: &mut Criterion) {
    c.bench_function("realise_tree_4x3", |bench| {
        bench.iter_with_setup(
            || {
                let mut r = tree_kb(4, 3);
                r.classify().unwrap();
                r
            },
            |mut r| {
                r.realise().unwrap();
                black_box(r)
            },
        )
    });
}

fn bench_subsumption(c: &mut Criterion) {
    let mut r = tree_kb(4, 4);
    r.classify().unwrap();
    let root = r.class("C").unwrap();
    let leaf = r.class("C.3.3.3.3").unwrap();

    c.bench_function("is_subsumed_by_leaf_root", |bench| {
        bench.iter(|| black_box(r.is_subsumed_by(&leaf, &root).unwrap()))
    });
}

criterion_group!(benches, bench_classify, bench_realise, bench_subsumption);
criterion_main!(benches);
