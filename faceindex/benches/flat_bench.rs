use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rollcall_faceindex::{IndexRegistry, MemoryStorage, Persistence, RegistryConfig};

fn random_unit_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
    }
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let s = (1.0 / norm) as f32;
        for x in &mut v {
            *x *= s;
        }
    }
    v
}

fn gallery(dim: usize, n: usize) -> IndexRegistry {
    let reg = IndexRegistry::new(
        RegistryConfig {
            dim,
            persistence: Persistence::Deferred,
        },
        Arc::new(MemoryStorage::new()),
    );
    let embeddings: Vec<Vec<f32>> = (0..n).map(|i| random_unit_vec(dim, i as u64 + 1)).collect();
    let ids: Vec<u32> = (0..n as u32).map(|i| 1000 + i).collect();
    let names: Vec<String> = (0..n).map(|i| format!("student-{i}")).collect();
    reg.build(&embeddings, &ids, &names, "AI").unwrap();
    reg
}

fn bench_query(c: &mut Criterion) {
    let dim = 512;
    let query = random_unit_vec(dim, 424242);

    for n in [100, 1000, 5000] {
        let reg = gallery(dim, n);
        c.bench_function(&format!("flat_query_512d_{n}"), |b| {
            b.iter(|| {
                let _ = black_box(reg.query(black_box(&query), "AI", 1));
            });
        });
    }
}

fn bench_append_write_through(c: &mut Criterion) {
    let dim = 512;

    c.bench_function("append_write_through_512d_1000", |b| {
        b.iter_with_setup(
            || {
                let reg = IndexRegistry::new(
                    RegistryConfig {
                        dim,
                        persistence: Persistence::WriteThrough,
                    },
                    Arc::new(MemoryStorage::new()),
                );
                let embeddings: Vec<Vec<f32>> =
                    (0..1000).map(|i| random_unit_vec(dim, i as u64 + 1)).collect();
                let ids: Vec<u32> = (0..1000).map(|i| 1000 + i).collect();
                let names: Vec<String> = (0..1000).map(|i| format!("s{i}")).collect();
                reg.build(&embeddings, &ids, &names, "AI").unwrap();
                (reg, random_unit_vec(dim, 7))
            },
            |(reg, v)| {
                let _ = black_box(reg.append_vector(&v, 9999, "new", "AI"));
            },
        );
    });
}

criterion_group!(benches, bench_query, bench_append_write_through);
criterion_main!(benches);
