mod common;

use common::{chain_with, config, ring, ScriptedSource};
use dmc_markov::{MarkovConfig, MoveKind, MoveTable, MoveWeights};

#[test]
fn uniform_table_selects_every_move() {
    let table = MoveTable::new(&MoveWeights::default());
    for kind in MoveKind::ALL {
        assert!((table.probability(kind) - 1.0 / 14.0).abs() < 1e-12);
        let centre = (kind.index() as f64 + 0.5) / 14.0;
        assert_eq!(table.select(centre), kind);
    }
    assert_eq!(table.select(0.0), MoveKind::CreateWorm);
    assert_eq!(table.select(0.999_999_999), MoveKind::ChangeNotDeltaToDelta);
}

#[test]
fn zero_weight_moves_are_never_selected() {
    let weights = MoveWeights {
        change_r_loop: 0.0,
        change_not_delta_to_delta: 0.0,
        ..MoveWeights::uniform(2.0)
    };
    let table = MoveTable::new(&weights);
    assert_eq!(table.probability(MoveKind::ChangeRLoop), 0.0);
    assert_eq!(table.select(0.999_999_999), MoveKind::ChangeDeltaToNotDelta);
    for i in 0..1000 {
        let kind = table.select(i as f64 / 1000.0);
        assert_ne!(kind, MoveKind::ChangeRLoop);
        assert_ne!(kind, MoveKind::ChangeNotDeltaToDelta);
    }
    assert_eq!(
        table.selection_ratio(MoveKind::ChangeDeltaToNotDelta, MoveKind::ChangeNotDeltaToDelta),
        0.0
    );
    assert!(
        (table.selection_ratio(MoveKind::DeleteWorm, MoveKind::CreateWorm) - 1.0).abs() < 1e-12
    );
}

#[test]
fn every_move_has_a_stable_name_and_reverse() {
    let names: std::collections::BTreeSet<_> = MoveKind::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(names.len(), 14);
    for kind in MoveKind::ALL {
        assert_eq!(kind.reverse().reverse(), kind);
        assert_eq!(MoveKind::ALL[kind.index()], kind);
    }
    assert_eq!(MoveKind::AddInteraction.reverse(), MoveKind::DeleteInteraction);
    assert_eq!(MoveKind::Reconnect.reverse(), MoveKind::Reconnect);
}

#[test]
fn yaml_config_fills_defaults() {
    let yaml = r#"
beta: 0.8
max_order: 3
order_reweight: [1.0, 1.0, 0.5, 0.25]
move_weights:
  change_r_loop: 0.0
  reconnect: 3.0
seed: 11
"#;
    let config = MarkovConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.max_order, 3);
    assert_eq!(config.order_weights(), vec![1.0, 1.0, 0.5, 0.25]);
    assert_eq!(config.move_weights.change_r_loop, 0.0);
    assert_eq!(config.move_weights.reconnect, 3.0);
    assert_eq!(config.move_weights.create_worm, 1.0);
    assert_eq!(config.check_interval, 0);
    assert!((config.worm_space_reweight - 0.05).abs() < 1e-12);
}

#[test]
fn invalid_configs_are_rejected() {
    let cases = [
        ("beta: -1.0", "bad-beta"),
        ("max_order: 0", "bad-max-order"),
        ("max_order: 2\norder_reweight: [1.0, 1.0]", "order-reweight-length"),
        ("max_order: 1\norder_reweight: [1.0, 0.0]", "order-reweight-value"),
        ("worm_space_reweight: 0.0", "bad-worm-reweight"),
        ("move_weights:\n  reconnect: -1.0", "bad-move-weight"),
        ("beta: [oops]", "config-parse"),
    ];
    for (yaml, code) in cases {
        let err = MarkovConfig::from_yaml_str(yaml).unwrap_err();
        assert_eq!(err.info().code, code, "{yaml}");
    }

    let all_zero = MarkovConfig {
        move_weights: MoveWeights::uniform(0.0),
        ..MarkovConfig::default()
    };
    assert_eq!(all_zero.validate().unwrap_err().info().code, "no-moves");
}

#[test]
fn chain_rejects_mismatched_beta_and_order() {
    let source = ScriptedSource::new();
    let mismatched = MarkovConfig {
        beta: 1.0,
        ..config()
    };
    let err = dmc_markov::Markov::with_rng(
        mismatched,
        ring(1),
        Box::new(dmc_diagram::AnalyticOracle::new(common::lattice(), common::BETA)),
        Box::new(dmc_diagram::GaussianWormWeight::new(common::lattice(), 1.5, 0.3)),
        source.clone(),
    )
    .err()
    .unwrap();
    assert_eq!(err.info().code, "beta-mismatch");

    let small = MarkovConfig {
        max_order: 1,
        ..config()
    };
    let err = dmc_markov::Markov::with_rng(
        small,
        ring(2),
        Box::new(dmc_diagram::AnalyticOracle::new(common::lattice(), common::BETA)),
        Box::new(dmc_diagram::GaussianWormWeight::new(common::lattice(), 1.5, 0.3)),
        source,
    )
    .err()
    .unwrap();
    assert_eq!(err.info().code, "order-exceeds-max");
}

#[test]
fn reweight_changes_bias_but_not_selection() {
    let mut markov = chain_with(config(), ring(1), ScriptedSource::new());
    let table = markov.table().clone();

    markov.reweight(&[1.0, 2.0, 4.0, 8.0, 16.0], 0.2).unwrap();
    assert_eq!(markov.table(), &table);
    assert_eq!(markov.config().order_reweight, vec![1.0, 2.0, 4.0, 8.0, 16.0]);
    assert!((markov.config().worm_space_reweight - 0.2).abs() < 1e-12);

    let err = markov.reweight(&[1.0, 2.0], 0.2).unwrap_err();
    assert_eq!(err.info().code, "order-reweight-length");
    let err = markov.reweight(&[1.0; 5], f64::NAN).unwrap_err();
    assert_eq!(err.info().code, "bad-worm-reweight");
    assert_eq!(markov.config().worm_space_reweight, 0.2);
}

#[test]
fn order_bias_scales_the_add_acceptance() {
    let draws = [0, 0, 5, 1];
    let add = ([-7, 1, 0], [0.15, 0.55]);

    let mut flat = chain_with(config(), ring(1), ScriptedSource::new().ints(&draws));
    flat.attempt(MoveKind::CreateWorm).unwrap();
    flat.rng_mut().push_ints(&add.0);
    flat.rng_mut().push_uniforms(&add.1);
    let p_flat = flat.attempt(MoveKind::AddInteraction).unwrap().acceptance_prob.unwrap();

    let mut biased = chain_with(config(), ring(1), ScriptedSource::new().ints(&draws));
    biased.reweight(&[1.0, 1.0, 0.25, 1.0, 1.0], 0.05).unwrap();
    biased.attempt(MoveKind::CreateWorm).unwrap();
    biased.rng_mut().push_ints(&add.0);
    biased.rng_mut().push_uniforms(&add.1);
    let p_biased = biased.attempt(MoveKind::AddInteraction).unwrap().acceptance_prob.unwrap();

    assert!((p_biased / p_flat - 0.25).abs() < 1e-12);
}
