use dmc_core::{Dir, DmcError, ErrorInfo, Lattice, Momentum, Site, Spin};
use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::diagram::Diagram;
use crate::ids::{GLineId, PoolId, VertexId, WLineId};
use crate::pool::Pool;
use crate::records::{GLine, MeasureLine, Vertex, WLine};
use crate::weight::{WFlags, WeightOracle};

/// Local state of one vertex of a seed ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedVertex {
    /// Lattice site.
    pub site: Site,
    /// Imaginary time.
    pub tau: f64,
    /// Leg spins, indexed by [`Dir`].
    pub spin: [Spin; 2],
}

/// Which line of the seed ring carries the observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedMeasure {
    /// The G-line leaving vertex `i`.
    G(usize),
    /// The `i`-th W-line.
    W(usize),
}

/// Description of a closed single-loop seed diagram.
///
/// Vertex `i` feeds vertex `i + 1` (cyclically) through a G-line carrying
/// `loop_momentum`, and W-line `j` joins vertex `2j` (its `In` end) with
/// vertex `2j + 1` (its `Out` end) at zero momentum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSpec {
    /// Inverse temperature.
    pub beta: f64,
    /// Lattice geometry.
    pub lattice: Lattice,
    /// Ring vertices; the count must be even and non-zero.
    pub vertices: Vec<SeedVertex>,
    /// Momentum running around the loop.
    pub loop_momentum: Momentum,
    /// Measured line.
    pub measure: SeedMeasure,
    /// Indices of W-lines that start out instantaneous.
    pub delta_lines: Vec<usize>,
}

impl SeedSpec {
    /// Spin-diagonal ring of `order` W-lines on site 0 with evenly spread
    /// times and the measurement on the first G-line.
    pub fn ring(lattice: Lattice, beta: f64, order: usize, spin: Spin) -> Self {
        let n = 2 * order;
        let site = Site::from_raw(0);
        let vertices = (0..n)
            .map(|i| SeedVertex {
                site,
                tau: beta * (i as f64 + 0.5) / n as f64,
                spin: [spin; 2],
            })
            .collect();
        Self {
            beta,
            lattice,
            vertices,
            loop_momentum: Momentum::ZERO,
            measure: SeedMeasure::G(0),
            delta_lines: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), DmcError> {
        let n = self.vertices.len();
        if n == 0 || n % 2 != 0 {
            return Err(seed_error("odd-ring", "seed ring needs a positive even vertex count")
                .with_context("vertices", n));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(seed_error("bad-beta", "beta must be positive and finite")
                .with_context("beta", self.beta));
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if !(0.0..self.beta).contains(&v.tau) {
                return Err(seed_error("tau-range", "vertex time outside [0, beta)")
                    .with_context("vertex", i)
                    .with_context("tau", v.tau));
            }
            if v.site.as_raw() >= self.lattice.site_count() {
                return Err(seed_error("site-range", "vertex site outside the lattice")
                    .with_context("vertex", i)
                    .with_context("site", v.site.as_raw()));
            }
            let next = &self.vertices[(i + 1) % n];
            if v.spin[Dir::Out.index()] != next.spin[Dir::In.index()] {
                return Err(seed_error("spin-mismatch", "G-line ends carry different spins")
                    .with_context("vertex", i));
            }
        }
        let order = n / 2;
        for &j in &self.delta_lines {
            if j >= order {
                return Err(seed_error("delta-range", "delta line index out of range")
                    .with_context("wline", j));
            }
            if self.vertices[2 * j].tau != self.vertices[2 * j + 1].tau {
                return Err(seed_error("delta-times", "delta line ends have different times")
                    .with_context("wline", j));
            }
        }
        match self.measure {
            SeedMeasure::G(i) if i >= n => {
                Err(seed_error("measure-range", "measured G-line out of range").with_context("gline", i))
            }
            SeedMeasure::W(j) if j >= order => {
                Err(seed_error("measure-range", "measured W-line out of range").with_context("wline", j))
            }
            SeedMeasure::W(j) if self.delta_lines.contains(&j) => Err(seed_error(
                "measure-delta",
                "the measured W-line cannot be a delta line",
            )
            .with_context("wline", j)),
            _ => Ok(()),
        }
    }
}

impl Diagram {
    /// Builds the seed ring described by `spec`, computing every line weight
    /// from `oracle` and the running weight, phase and loop sign from scratch.
    pub fn seed_ring(spec: &SeedSpec, oracle: &dyn WeightOracle) -> Result<Diagram, DmcError> {
        spec.validate()?;
        let n = spec.vertices.len();
        let order = n / 2;

        let mut vertices: Pool<VertexId, Vertex> = Pool::new();
        let mut glines: Pool<GLineId, GLine> = Pool::new();
        let mut wlines: Pool<WLineId, WLine> = Pool::new();

        let vids: Vec<VertexId> = (0..n).map(VertexId::from_index).collect();
        let gids: Vec<GLineId> = (0..n).map(GLineId::from_index).collect();
        let wids: Vec<WLineId> = (0..order).map(WLineId::from_index).collect();

        for (i, seed) in spec.vertices.iter().enumerate() {
            let id = vertices.insert(Vertex {
                site: seed.site,
                tau: seed.tau,
                spin: seed.spin,
                dir: if i % 2 == 0 { Dir::In } else { Dir::Out },
                g: [gids[(i + n - 1) % n], gids[i]],
                w: wids[i / 2],
            });
            debug_assert_eq!(id, vids[i]);
        }

        for i in 0..n {
            let is_measure = spec.measure == SeedMeasure::G(i);
            let from = vertices.get(vids[i])?.state();
            let to = vertices.get(vids[(i + 1) % n])?.state();
            let weight = oracle.propagator(&from.g_end(Dir::Out), &to.g_end(Dir::In), is_measure);
            glines.insert(GLine {
                ends: [vids[i], vids[(i + 1) % n]],
                k: spec.loop_momentum,
                weight,
                is_measure,
            });
        }

        for j in 0..order {
            let flags = WFlags {
                is_worm: false,
                is_measure: spec.measure == SeedMeasure::W(j),
                is_delta: spec.delta_lines.contains(&j),
            };
            let from = vertices.get(vids[2 * j])?.state();
            let to = vertices.get(vids[2 * j + 1])?.state();
            let weight = oracle.interaction(&from.w_end(), &to.w_end(), flags);
            wlines.insert(WLine {
                ends: [vids[2 * j], vids[2 * j + 1]],
                k: Momentum::ZERO,
                weight,
                is_measure: flags.is_measure,
                is_delta: flags.is_delta,
                is_worm: false,
            });
        }

        let measure = match spec.measure {
            SeedMeasure::G(i) => MeasureLine::G(gids[i]),
            SeedMeasure::W(j) => MeasureLine::W(wids[j]),
        };

        let mut diagram = Diagram {
            beta: spec.beta,
            lattice: spec.lattice.clone(),
            vertices,
            glines,
            wlines,
            order,
            weight: Complex64::new(1.0, 0.0),
            phase: Complex64::new(1.0, 0.0),
            sign_fermi_loop: 1,
            measure,
            worm: None,
        };
        if diagram.count_loops()? % 2 == 1 {
            diagram.sign_fermi_loop = -1;
        }
        let weight = diagram.recomputed_weight();
        if !(weight.norm() > 0.0 && weight.norm().is_finite()) {
            return Err(seed_error("zero-weight", "seed diagram has zero or non-finite weight")
                .with_context("weight", weight));
        }
        diagram.weight = weight;
        diagram.phase = weight / weight.norm();
        debug!(
            "seeded order-{order} ring: weight={weight}, sign={}",
            diagram.sign_fermi_loop
        );
        Ok(diagram)
    }
}

fn seed_error(code: &str, message: &str) -> DmcError {
    DmcError::Diagram(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: &str, value: impl ToString) -> DmcError;
}

impl ContextExt for DmcError {
    fn with_context(self, key: &str, value: impl ToString) -> DmcError {
        match self {
            DmcError::Diagram(info) => DmcError::Diagram(info.with_context(key, value.to_string())),
            other => other,
        }
    }
}
