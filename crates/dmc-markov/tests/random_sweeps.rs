mod common;

use common::{lattice, ring, BETA};
use dmc_diagram::{AnalyticOracle, GaussianWormWeight};
use dmc_markov::{Markov, MarkovConfig, MoveWeights};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_sweeps_keep_the_diagram_consistent(
        seed in any::<u64>(),
        order in 1usize..=3,
        worm_bias in 0.5f64..4.0,
    ) {
        common::init_logging();
        let config = MarkovConfig {
            beta: BETA,
            max_order: 4,
            check_interval: 25,
            seed,
            move_weights: MoveWeights {
                create_worm: worm_bias,
                add_interaction: worm_bias,
                ..MoveWeights::default()
            },
            ..MarkovConfig::default()
        };
        let mut markov = Markov::new(
            config,
            ring(order),
            Box::new(AnalyticOracle::new(lattice(), BETA)),
            Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
        )
        .unwrap();

        for _ in 0..200 {
            let outcome = markov.step().unwrap();
            if let Some(p) = outcome.acceptance_prob {
                prop_assert!(p >= 0.0 && p.is_finite());
            }
            let diagram = markov.diagram();
            prop_assert_eq!(diagram.wlines().len(), diagram.order());
            prop_assert!(diagram.order() <= 4);
            if let Some(worm) = diagram.worm() {
                prop_assert!(worm.ira != worm.masha);
            }
        }
        let report = markov.verify(None).unwrap();
        prop_assert!(report.passed, "{:?}", report.issues);
    }
}
