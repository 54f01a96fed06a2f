#![allow(dead_code)]

use std::collections::VecDeque;

use dmc_core::{Lattice, RandomSource, Site, Spin};
use dmc_diagram::{
    AnalyticOracle, Diagram, GEnd, GaussianWormWeight, SeedMeasure, SeedSpec, SeedVertex, WEnd,
    WFlags, WeightOracle,
};
use dmc_markov::{Markov, MarkovConfig};
use num_complex::Complex64;

pub const BETA: f64 = 0.8;

/// Replays scripted draws. Exhausted queues fall back to `0.0` for uniforms
/// and the lower bound for integers, so an unscripted Metropolis test accepts
/// any proposal with non-zero probability.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    uniforms: VecDeque<f64>,
    ints: VecDeque<i64>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ints(mut self, values: &[i64]) -> Self {
        self.ints.extend(values);
        self
    }

    pub fn uniforms(mut self, values: &[f64]) -> Self {
        self.uniforms.extend(values);
        self
    }

    pub fn push_ints(&mut self, values: &[i64]) {
        self.ints.extend(values);
    }

    pub fn push_uniforms(&mut self, values: &[f64]) {
        self.uniforms.extend(values);
    }

    pub fn is_drained(&self) -> bool {
        self.uniforms.is_empty() && self.ints.is_empty()
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self) -> f64 {
        self.uniforms.pop_front().unwrap_or(0.0)
    }

    fn int_in(&mut self, low: i64, high: i64) -> i64 {
        match self.ints.pop_front() {
            Some(value) => value.clamp(low, high.max(low)),
            None => low,
        }
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn lattice() -> Lattice {
    Lattice::new(vec![4, 4], 1).unwrap()
}

pub fn config() -> MarkovConfig {
    MarkovConfig {
        beta: BETA,
        max_order: 4,
        tolerance: 1e-8,
        ..MarkovConfig::default()
    }
}

pub fn ring(order: usize) -> Diagram {
    let spec = SeedSpec::ring(lattice(), BETA, order, Spin::Up);
    Diagram::seed_ring(&spec, &AnalyticOracle::new(lattice(), BETA)).unwrap()
}

/// Ring with explicit per-vertex `(site, [spin_in, spin_out])`, evenly
/// spread times and the given measured line and delta lines.
pub fn custom_ring(
    vertices: &[(u32, [Spin; 2])],
    measure: SeedMeasure,
    delta_lines: &[usize],
    oracle: &dyn WeightOracle,
) -> Diagram {
    let n = vertices.len();
    let mut spec = SeedSpec::ring(lattice(), BETA, n / 2, Spin::Up);
    spec.vertices = vertices
        .iter()
        .enumerate()
        .map(|(i, &(site, spin))| SeedVertex {
            site: Site::from_raw(site),
            tau: BETA * (i as f64 + 0.5) / n as f64,
            spin,
        })
        .collect();
    for &j in delta_lines {
        spec.vertices[2 * j + 1].tau = spec.vertices[2 * j].tau;
    }
    spec.measure = measure;
    spec.delta_lines = delta_lines.to_vec();
    Diagram::seed_ring(&spec, oracle).unwrap()
}

/// Analytic amplitudes with the interaction spin rule switched off, for
/// reaching spin configurations the lattice model forbids.
pub struct SpinBlindOracle(pub AnalyticOracle);

impl WeightOracle for SpinBlindOracle {
    fn propagator(&self, from: &GEnd, to: &GEnd, is_measure: bool) -> Complex64 {
        self.0.propagator(from, to, is_measure)
    }

    fn interaction(&self, from: &WEnd, to: &WEnd, flags: WFlags) -> Complex64 {
        let flat = |end: &WEnd| WEnd {
            spin: [Spin::Up; 2],
            ..*end
        };
        self.0.interaction(&flat(from), &flat(to), flags)
    }
}

pub fn chain_on<R: RandomSource>(
    diagram: Diagram,
    oracle: Box<dyn WeightOracle>,
    rng: R,
) -> Markov<R> {
    init_logging();
    Markov::with_rng(
        config(),
        diagram,
        oracle,
        Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
        rng,
    )
    .unwrap()
}

pub fn chain_with<R: RandomSource>(config: MarkovConfig, diagram: Diagram, rng: R) -> Markov<R> {
    init_logging();
    Markov::with_rng(
        config,
        diagram,
        Box::new(AnalyticOracle::new(lattice(), BETA)),
        Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
        rng,
    )
    .unwrap()
}

pub fn seeded_chain(order: usize, seed: u64) -> Markov {
    init_logging();
    let config = MarkovConfig {
        seed,
        ..config()
    };
    Markov::new(
        config,
        ring(order),
        Box::new(AnalyticOracle::new(lattice(), BETA)),
        Box::new(GaussianWormWeight::new(lattice(), 1.5, 0.3)),
    )
    .unwrap()
}

pub fn assert_consistent<R: RandomSource>(markov: &Markov<R>) {
    if let Err(err) = markov.verify(None) {
        panic!("diagram inconsistent: {err}");
    }
}

/// Sorted line momenta, independent of which slots the lines occupy.
pub fn momentum_profile<R: RandomSource>(markov: &Markov<R>) -> (Vec<i64>, Vec<i64>, Option<i64>) {
    let snapshot = markov.diagram().momentum_snapshot();
    let mut g: Vec<i64> = snapshot.glines.values().copied().collect();
    let mut w: Vec<i64> = snapshot.wlines.values().copied().collect();
    g.sort_unstable();
    w.sort_unstable();
    (g, w, snapshot.worm)
}
