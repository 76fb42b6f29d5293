use criterion::{Criterion, black_box, criterion_group, criterion_main};
use facegate_registry::{Config, Registry};

fn pseudo_random_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
    }
    v
}

fn bench_verify(c: &mut Criterion) {
    let dim = 128;
    let reg = Registry::with_memory_store(Config {
        dim,
        refine_on_verify: false,
        ..Config::default()
    });

    // 500 enrolled identities with distinct names.
    for i in 0..500u64 {
        let given = format!("Person{i}");
        let family = format!("Family{i}");
        reg.enroll(&given, &family, &pseudo_random_vec(dim, i + 1))
            .unwrap();
    }

    let probe = pseudo_random_vec(dim, 7);

    c.bench_function("registry_verify_128d_500ids", |b| {
        b.iter(|| {
            let _ = black_box(reg.verify(black_box(&probe)).unwrap());
        });
    });
}

fn bench_enroll_fold(c: &mut Criterion) {
    let dim = 128;
    let reg = Registry::with_memory_store(Config {
        dim,
        ..Config::default()
    });
    reg.enroll("Min", "Kim", &pseudo_random_vec(dim, 1)).unwrap();

    c.bench_function("registry_enroll_fold_128d", |b| {
        let emb = pseudo_random_vec(dim, 42);
        b.iter(|| {
            let _ = black_box(reg.enroll("Min", "Kim", black_box(&emb)).unwrap());
        });
    });
}

criterion_group!(benches, bench_verify, bench_enroll_fold);
criterion_main!(benches);
