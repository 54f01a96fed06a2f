mod common;

use common::seeded_chain;
use dmc_markov::{chain_seed, StepOutcome};

fn trace(seed: u64, steps: usize) -> (Vec<StepOutcome>, String, u64, u64) {
    let mut markov = seeded_chain(2, seed);
    let outcomes = (0..steps).map(|_| markov.step().unwrap()).collect();
    let diagram = markov.diagram();
    let snapshot = diagram.momentum_snapshot().to_json().unwrap();
    (
        outcomes,
        snapshot,
        diagram.weight().re.to_bits(),
        diagram.weight().im.to_bits(),
    )
}

#[test]
fn identical_seeds_reproduce_bit_for_bit() {
    let first = trace(31, 300);
    let second = trace(31, 300);
    assert_eq!(first, second);
}

#[test]
fn chains_of_one_run_get_distinct_seeds() {
    let seeds: Vec<u64> = (0..8).map(|chain| chain_seed(31, chain)).collect();
    for (i, a) in seeds.iter().enumerate() {
        for b in &seeds[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(chain_seed(31, 3), chain_seed(31, 3));
}
