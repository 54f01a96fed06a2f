//! Closed-form reference amplitudes.
//!
//! These stand in for the tabulated weights in tests and benches. They are
//! smooth in time and space, obey the spin selection rules the move engine
//! assumes, and use distinct complex factors for the measurement, worm and
//! delta conventions so that a wrong flag shows up as a weight mismatch.

use dmc_core::{Dir, Lattice, Site};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::weight::{GEnd, WEnd, WFlags, WeightOracle, WormWeight};

/// Parameters of [`AnalyticOracle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticParams {
    /// Decay rate of the propagator in imaginary time.
    pub energy: f64,
    /// Phase winding of the propagator per unit time.
    pub frequency: f64,
    /// Overall interaction strength.
    pub coupling: f64,
    /// Decay rate of retarded interactions in imaginary time.
    pub retardation: f64,
    /// Extra factor on the measured line.
    pub measure_factor: Complex64,
    /// Extra factor on worm lines.
    pub worm_factor: Complex64,
    /// Amplitude of instantaneous interactions.
    pub delta_factor: Complex64,
}

impl Default for AnalyticParams {
    fn default() -> Self {
        Self {
            energy: 0.4,
            frequency: 0.7,
            coupling: 0.9,
            retardation: 0.6,
            measure_factor: Complex64::new(1.3, 0.4),
            worm_factor: Complex64::new(0.8, -0.3),
            delta_factor: Complex64::new(0.5, 0.2),
        }
    }
}

/// Antiperiodic propagator and spin-conserving interaction on a lattice.
#[derive(Debug, Clone)]
pub struct AnalyticOracle {
    lattice: Lattice,
    beta: f64,
    params: AnalyticParams,
}

impl AnalyticOracle {
    /// Oracle with default parameters.
    pub fn new(lattice: Lattice, beta: f64) -> Self {
        Self::with_params(lattice, beta, AnalyticParams::default())
    }

    /// Oracle with explicit parameters.
    pub fn with_params(lattice: Lattice, beta: f64, params: AnalyticParams) -> Self {
        Self {
            lattice,
            beta,
            params,
        }
    }

    fn spatial(&self, a: Site, b: Site) -> f64 {
        (-0.5 * self.lattice.distance_squared(a, b) as f64).exp()
    }
}

fn spin_allowed(from: &WEnd, to: &WEnd) -> bool {
    let diagonal = |end: &WEnd| end.spin[0] == end.spin[1];
    let (i, o) = (Dir::In.index(), Dir::Out.index());
    let exchange = from.spin[i] != from.spin[o]
        && from.spin[i] == to.spin[o]
        && from.spin[o] == to.spin[i];
    (diagonal(from) && diagonal(to)) || exchange
}

impl WeightOracle for AnalyticOracle {
    fn propagator(&self, from: &GEnd, to: &GEnd, is_measure: bool) -> Complex64 {
        if from.spin != to.spin {
            return Complex64::new(0.0, 0.0);
        }
        let mut dt = to.tau - from.tau;
        let mut sign = 1.0;
        if dt < 0.0 {
            dt += self.beta;
            sign = -1.0;
        }
        let p = &self.params;
        let amplitude = sign * (-p.energy * dt).exp() * self.spatial(from.site, to.site);
        let value = Complex64::from_polar(amplitude, p.frequency * dt);
        if is_measure {
            value * p.measure_factor
        } else {
            value
        }
    }

    fn interaction(&self, from: &WEnd, to: &WEnd, flags: WFlags) -> Complex64 {
        if !flags.is_worm && !spin_allowed(from, to) {
            return Complex64::new(0.0, 0.0);
        }
        let p = &self.params;
        let mut value = Complex64::from(p.coupling * self.spatial(from.site, to.site));
        if flags.is_delta {
            value *= p.delta_factor;
        } else {
            let dt = (to.tau - from.tau).abs();
            value *= Complex64::from_polar((-p.retardation * dt).exp(), 0.3 * dt);
        }
        if flags.is_measure {
            value *= p.measure_factor;
        }
        if flags.is_worm {
            value *= p.worm_factor;
        }
        value
    }
}

/// Gaussian worm weight in the Ira–Masha separation.
#[derive(Debug, Clone)]
pub struct GaussianWormWeight {
    lattice: Lattice,
    width: f64,
    decay: f64,
}

impl GaussianWormWeight {
    /// Weight `exp(-d^2 / (2 width^2) - decay |dt|)`.
    pub fn new(lattice: Lattice, width: f64, decay: f64) -> Self {
        Self {
            lattice,
            width,
            decay,
        }
    }
}

impl WormWeight for GaussianWormWeight {
    fn weight(&self, ira: Site, masha: Site, ira_tau: f64, masha_tau: f64) -> f64 {
        let d2 = self.lattice.distance_squared(ira, masha) as f64;
        (-d2 / (2.0 * self.width * self.width) - self.decay * (ira_tau - masha_tau).abs()).exp()
    }
}
