use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use finchain_core::ChainVerifier;
use finchain_testkit::{sample_payload, TestFixture};

fn bench_mining(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine_block");
    group.sample_size(20);

    for difficulty in [1usize, 2, 3] {
        let fixture = TestFixture::with_difficulty("bench", difficulty);
        let genesis = fixture.make_genesis();
        let payload = sample_payload(1);

        group.bench_with_input(
            BenchmarkId::from_parameter(difficulty),
            &difficulty,
            |b, _| b.iter(|| fixture.make_block("bench-tx", black_box(&payload), &genesis)),
        );
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let chain = TestFixture::new("bench").make_chain(100);

    c.bench_function("verify_chain_100", |b| {
        b.iter(|| ChainVerifier::new().verify(black_box(&chain)))
    });
}

criterion_group!(benches, bench_mining, bench_verify);
criterion_main!(benches);
