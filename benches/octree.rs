use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use starforge::{Octree, Vec3};

fn random_points(n: usize) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            )
        })
        .collect()
}

fn octree_insert(c: &mut Criterion) {
    let points = random_points(10_000);
    c.bench_function("octree insert 10k", |b| {
        b.iter(|| {
            let mut tree = Octree::with_max_depth(Vec3::zeros(), 100.0, 5);
            for p in &points {
                tree.insert(black_box(*p));
            }
            black_box(tree.size())
        })
    });
}

fn octree_query(c: &mut Criterion) {
    let points = random_points(10_000);
    let mut tree = Octree::with_max_depth(Vec3::zeros(), 100.0, 5);
    for p in &points {
        tree.insert(*p);
    }
    c.bench_function("octree query r=5", |b| {
        b.iter(|| black_box(tree.query(&Vec3::zeros(), black_box(5.0))))
    });
}

criterion_group!(benches, octree_insert, octree_query);
criterion_main!(benches);
