mod common;

use common::{
    assert_consistent, chain_with, config, lattice, momentum_profile, ring, seeded_chain,
    ScriptedSource, BETA,
};
use dmc_diagram::{AnalyticOracle, GaussianWormWeight};
use dmc_markov::{Markov, MarkovConfig, MoveKind};

#[test]
fn create_worm_ten_times_on_first_order_ring() {
    let mut markov = seeded_chain(1, 17);
    for attempt in 0..10 {
        let outcome = markov.attempt(MoveKind::CreateWorm).unwrap();
        if attempt == 0 {
            assert!(outcome.accepted);
        } else {
            assert!(!outcome.proposed);
        }
        assert_consistent(&markov);
    }
    let stats = markov.stats(MoveKind::CreateWorm);
    assert_eq!(stats.proposed, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.noop, 9);

    let diagram = markov.diagram();
    let worm = diagram.worm().unwrap();
    let ira = diagram.vertex(worm.ira).unwrap();
    let masha = diagram.vertex(worm.masha).unwrap();
    assert_eq!(ira.w, masha.w);
    assert!(diagram.wline(ira.w).unwrap().is_worm);
    assert_eq!(diagram.order(), 1);
}

#[test]
fn add_then_delete_restores_the_diagram() {
    let source = ScriptedSource::new().ints(&[0, 0, 5, 1]);
    let mut markov = chain_with(config(), ring(1), source);
    assert!(markov.attempt(MoveKind::CreateWorm).unwrap().accepted);

    let weight = markov.diagram().weight();
    let phase = markov.diagram().phase();
    let profile = momentum_profile(&markov);
    let measure_k = {
        let diagram = markov.diagram();
        match diagram.measure() {
            dmc_diagram::MeasureLine::G(g) => diagram.gline(g).unwrap().k,
            dmc_diagram::MeasureLine::W(w) => diagram.wline(w).unwrap().k,
        }
    };

    markov.rng_mut().push_ints(&[-7, 1, 0]);
    markov.rng_mut().push_uniforms(&[0.15, 0.55]);
    assert!(markov.attempt(MoveKind::AddInteraction).unwrap().accepted);
    assert_eq!(markov.diagram().order(), 2);
    assert_eq!(markov.diagram().vertices().len(), 4);
    assert_eq!(markov.diagram().worm().unwrap().k.raw(), 5 - (-7));
    assert_consistent(&markov);

    markov.rng_mut().push_ints(&[1]);
    assert!(markov.attempt(MoveKind::DeleteInteraction).unwrap().accepted);
    assert_consistent(&markov);

    let diagram = markov.diagram();
    assert_eq!(diagram.order(), 1);
    assert_eq!(diagram.glines().len(), 2);
    assert_eq!(momentum_profile(&markov), profile);
    assert!((diagram.weight() - weight).norm() < 1e-10 * weight.norm());
    assert!((diagram.phase() - phase).norm() < 1e-10);
    let restored_k = match diagram.measure() {
        dmc_diagram::MeasureLine::G(g) => diagram.gline(g).unwrap().k,
        dmc_diagram::MeasureLine::W(w) => diagram.wline(w).unwrap().k,
    };
    assert_eq!(restored_k, measure_k);
}

#[test]
fn five_hundred_mixed_sweeps_stay_consistent() {
    common::init_logging();
    let config = MarkovConfig {
        check_interval: 50,
        seed: 2024,
        ..config()
    };
    let mut markov = Markov::new(
        config,
        ring(2),
        Box::new(AnalyticOracle::new(lattice(), BETA)),
        Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
    )
    .unwrap();

    for _ in 0..500 {
        let outcome = markov.step().unwrap();
        if let Some(p) = outcome.acceptance_prob {
            assert!(p >= 0.0);
        }
        let diagram = markov.diagram();
        assert!(diagram.order() >= 1 && diagram.order() <= 4);
        assert_eq!(diagram.vertices().len(), 2 * diagram.order());
        assert_eq!(diagram.glines().len(), 2 * diagram.order());
    }
    assert_eq!(markov.steps(), 500);
    assert_consistent(&markov);

    let proposed: u64 = MoveKind::ALL
        .iter()
        .map(|&kind| markov.stats(kind).proposed)
        .sum();
    assert!(proposed > 0);
    for rate in markov.acceptance_rates().values() {
        assert!((0.0..=1.0).contains(rate));
    }
}

#[test]
fn momentum_is_conserved_after_every_accepted_move() {
    let mut markov = seeded_chain(2, 99);
    for _ in 0..400 {
        let outcome = markov.step().unwrap();
        if outcome.accepted {
            let report = markov.verify(Some(outcome.kind)).unwrap();
            assert!(report.passed);
        }
    }
}

#[test]
fn tampered_chain_reports_an_invariant_error() {
    let mut markov = chain_with(config(), ring(1), ScriptedSource::new());
    // a weight ratio applied without its patch desynchronises the running weight
    markov.rng_mut().push_ints(&[1]);
    markov.rng_mut().push_uniforms(&[0.9]);
    assert!(markov.attempt(MoveKind::ChangeTau).unwrap().accepted);
    assert_consistent(&markov);

    let broken = {
        let mut diagram = markov.diagram().clone();
        diagram.apply_ratio(num_complex::Complex64::new(2.0, 0.0));
        diagram
    };
    let err = Markov::with_rng(
        config(),
        broken,
        Box::new(AnalyticOracle::new(lattice(), BETA)),
        Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
        ScriptedSource::new(),
    )
    .err()
    .unwrap();
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "diagram-inconsistent");
    assert!(err.info().context.contains_key("momentum"));
    assert!(err.info().context.contains_key("order"));
}
