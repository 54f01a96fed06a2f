use dmc_core::{Momentum, RngHandle, MAX_K, MOMENTUM_SPACE};
use proptest::prelude::*;

#[test]
fn wraps_into_half_open_range() {
    assert_eq!(Momentum::new(MAX_K).raw(), -MAX_K);
    assert_eq!(Momentum::new(-MAX_K - 1).raw(), MAX_K - 1);
    assert_eq!(Momentum::new(MOMENTUM_SPACE + 5).raw(), 5);
    assert_eq!(Momentum::new(0), Momentum::ZERO);
}

#[test]
fn random_momenta_are_in_range() {
    let mut rng = RngHandle::from_seed(11);
    for _ in 0..500 {
        let k = Momentum::random(&mut rng).raw();
        assert!((-MAX_K..MAX_K).contains(&k));
    }
    assert!((Momentum::probability() * MOMENTUM_SPACE as f64 - 1.0).abs() < 1e-15);
}

proptest! {
    #[test]
    fn arithmetic_is_modular(a in -1000i64..1000, b in -1000i64..1000) {
        let ka = Momentum::new(a);
        let kb = Momentum::new(b);
        prop_assert_eq!(ka + kb, Momentum::new(a + b));
        prop_assert_eq!(ka - kb, Momentum::new(a - b));
        prop_assert_eq!((ka + kb) - kb, ka);
        prop_assert_eq!(-ka + ka, Momentum::ZERO);
        prop_assert_eq!(ka * -1, -ka);
        let mut acc = ka;
        acc += kb;
        acc -= kb;
        prop_assert_eq!(acc, ka);
    }
}
