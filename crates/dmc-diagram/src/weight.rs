//! Narrow interfaces to the weight tables and the worm-weight function.
//!
//! Both traits are pure: the move engine calls them repeatedly on trial
//! states and expects identical answers for identical inputs.

use dmc_core::{Site, Spin};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// One end of a propagator line as seen by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GEnd {
    /// Lattice site.
    pub site: Site,
    /// Imaginary time.
    pub tau: f64,
    /// Spin of the leg the line attaches to.
    pub spin: Spin,
}

/// One end of an interaction line as seen by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WEnd {
    /// Lattice site.
    pub site: Site,
    /// Imaginary time.
    pub tau: f64,
    /// In and out leg spins of the vertex.
    pub spin: [Spin; 2],
}

/// Flags that select the interaction amplitude convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WFlags {
    /// The line touches a worm end.
    pub is_worm: bool,
    /// The line carries the measured observable.
    pub is_measure: bool,
    /// Instantaneous interaction.
    pub is_delta: bool,
}

/// Complex amplitudes of propagator and interaction lines.
///
/// Ends are passed in line orientation: `from` is the source of a G-line or
/// the `In` end of a W-line.
pub trait WeightOracle: Send + Sync {
    /// Propagator amplitude for a line from `from` to `to`.
    fn propagator(&self, from: &GEnd, to: &GEnd, is_measure: bool) -> Complex64;

    /// Interaction amplitude for a line from `from` to `to`.
    fn interaction(&self, from: &WEnd, to: &WEnd, flags: WFlags) -> Complex64;
}

/// Positive proposal-density weight of a worm configuration.
pub trait WormWeight: Send + Sync {
    /// Weight for Ira at (`ira`, `ira_tau`) and Masha at (`masha`, `masha_tau`).
    fn weight(&self, ira: Site, masha: Site, ira_tau: f64, masha_tau: f64) -> f64;
}
