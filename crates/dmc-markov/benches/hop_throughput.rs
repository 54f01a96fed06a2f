use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dmc_core::{Lattice, Spin};
use dmc_diagram::{AnalyticOracle, Diagram, GaussianWormWeight, SeedSpec};
use dmc_markov::{Markov, MarkovConfig};

const BETA: f64 = 0.8;

fn lattice() -> Lattice {
    Lattice::new(vec![8, 8], 1).unwrap()
}

fn chain(order: usize, seed: u64) -> Markov {
    let spec = SeedSpec::ring(lattice(), BETA, order, Spin::Up);
    let oracle = AnalyticOracle::new(lattice(), BETA);
    let diagram = Diagram::seed_ring(&spec, &oracle).unwrap();
    let config = MarkovConfig {
        beta: BETA,
        max_order: 6,
        seed,
        ..MarkovConfig::default()
    };
    Markov::new(
        config,
        diagram,
        Box::new(oracle),
        Box::new(GaussianWormWeight::new(lattice(), 2.0, 0.3)),
    )
    .unwrap()
}

fn bench_hop(c: &mut Criterion) {
    c.bench_function("markov_hop_1000", |b| {
        b.iter_batched(
            || chain(2, 42),
            |mut markov| markov.hop(1000).unwrap(),
            BatchSize::SmallInput,
        )
    });

    let mut checked = chain(3, 7);
    c.bench_function("markov_verify", |b| {
        b.iter(|| {
            checked.hop(10).unwrap();
            checked.verify(None).unwrap()
        })
    });
}

criterion_group!(benches, bench_hop);
criterion_main!(benches);
