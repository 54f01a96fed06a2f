use std::collections::{BTreeMap, BTreeSet};

use dmc_core::{Dir, DmcError, ErrorInfo, Lattice, RandomSource};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::ids::{GLineId, VertexId, WLineId};
use crate::pool::Pool;
use crate::records::{GLine, MeasureLine, Vertex, VertexState, WLine, Worm};
use crate::weight::{WFlags, WeightOracle};

/// A Feynman diagram together with its running weight bookkeeping.
///
/// `weight` is a running product of accepted ratios and is never recomputed on
/// the hot path; [`Diagram::check_consistency`] compares it against the
/// product of the cached line weights.
#[derive(Debug, Clone)]
pub struct Diagram {
    pub(crate) beta: f64,
    pub(crate) lattice: Lattice,
    pub(crate) vertices: Pool<VertexId, Vertex>,
    pub(crate) glines: Pool<GLineId, GLine>,
    pub(crate) wlines: Pool<WLineId, WLine>,
    pub(crate) order: usize,
    pub(crate) weight: Complex64,
    pub(crate) phase: Complex64,
    pub(crate) sign_fermi_loop: i8,
    pub(crate) measure: MeasureLine,
    pub(crate) worm: Option<Worm>,
}

impl Diagram {
    /// Inverse temperature; all times live in `[0, beta)`.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Lattice the vertices live on.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Number of interaction lines.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Running complex weight.
    pub fn weight(&self) -> Complex64 {
        self.weight
    }

    /// Running unit-modulus phase.
    pub fn phase(&self) -> Complex64 {
        self.phase
    }

    /// `(-1)^(number of fermion loops)`.
    pub fn sign_fermi_loop(&self) -> i8 {
        self.sign_fermi_loop
    }

    /// The line carrying the observable.
    pub fn measure(&self) -> MeasureLine {
        self.measure
    }

    /// The worm, when the diagram is in the worm sector.
    pub fn worm(&self) -> Option<&Worm> {
        self.worm.as_ref()
    }

    /// Vertex pool.
    pub fn vertices(&self) -> &Pool<VertexId, Vertex> {
        &self.vertices
    }

    /// Propagator pool.
    pub fn glines(&self) -> &Pool<GLineId, GLine> {
        &self.glines
    }

    /// Interaction pool.
    pub fn wlines(&self) -> &Pool<WLineId, WLine> {
        &self.wlines
    }

    /// Shared access to a vertex.
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex, DmcError> {
        self.vertices.get(id)
    }

    /// Shared access to a G-line.
    pub fn gline(&self, id: GLineId) -> Result<&GLine, DmcError> {
        self.glines.get(id)
    }

    /// Shared access to a W-line.
    pub fn wline(&self, id: WLineId) -> Result<&WLine, DmcError> {
        self.wlines.get(id)
    }

    /// Mutable access to a vertex.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex, DmcError> {
        self.vertices.get_mut(id)
    }

    /// Mutable access to a G-line.
    pub fn gline_mut(&mut self, id: GLineId) -> Result<&mut GLine, DmcError> {
        self.glines.get_mut(id)
    }

    /// Mutable access to a W-line.
    pub fn wline_mut(&mut self, id: WLineId) -> Result<&mut WLine, DmcError> {
        self.wlines.get_mut(id)
    }

    /// Uniformly random vertex.
    pub fn random_vertex<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<VertexId> {
        self.vertices.random_pick(rng)
    }

    /// Uniformly random G-line.
    pub fn random_gline<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<GLineId> {
        self.glines.random_pick(rng)
    }

    /// Uniformly random W-line.
    pub fn random_wline<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<WLineId> {
        self.wlines.random_pick(rng)
    }

    /// Adds a vertex record; the caller wires up its lines.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> VertexId {
        self.vertices.insert(vertex)
    }

    /// Adds a G-line record.
    pub fn insert_gline(&mut self, line: GLine) -> GLineId {
        self.glines.insert(line)
    }

    /// Adds a W-line record.
    pub fn insert_wline(&mut self, line: WLine) -> WLineId {
        self.wlines.insert(line)
    }

    /// Returns a vertex slot to the freelist.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex, DmcError> {
        self.vertices.remove(id)
    }

    /// Returns a G-line slot to the freelist.
    pub fn remove_gline(&mut self, id: GLineId) -> Result<GLine, DmcError> {
        self.glines.remove(id)
    }

    /// Returns a W-line slot to the freelist.
    pub fn remove_wline(&mut self, id: WLineId) -> Result<WLine, DmcError> {
        self.wlines.remove(id)
    }

    /// Replaces the worm.
    pub fn set_worm(&mut self, worm: Option<Worm>) {
        self.worm = worm;
    }

    /// Moves the measurement marker; line flags are the caller's business.
    pub fn set_measure(&mut self, measure: MeasureLine) {
        self.measure = measure;
    }

    /// Sets the order counter.
    pub fn set_order(&mut self, order: usize) {
        self.order = order;
    }

    /// Flips the fermion loop sign.
    pub fn flip_fermi_sign(&mut self) {
        self.sign_fermi_loop = -self.sign_fermi_loop;
    }

    /// Multiplies the running weight by `ratio` and the phase by its unit part.
    pub fn apply_ratio(&mut self, ratio: Complex64) {
        self.weight *= ratio;
        let norm = ratio.norm();
        if norm > 0.0 {
            self.phase *= ratio / norm;
        }
    }

    /// State of `v`, taking a pending override into account.
    pub fn vertex_state(
        &self,
        v: VertexId,
        overrides: &[(VertexId, VertexState)],
    ) -> Result<VertexState, DmcError> {
        match overrides.iter().rev().find(|(id, _)| *id == v) {
            Some((_, state)) => Ok(*state),
            None => Ok(self.vertices.get(v)?.state()),
        }
    }

    /// Oracle value of G-line `g` under the given vertex overrides.
    pub fn evaluate_gline(
        &self,
        oracle: &dyn WeightOracle,
        g: GLineId,
        overrides: &[(VertexId, VertexState)],
        is_measure: bool,
    ) -> Result<Complex64, DmcError> {
        let line = self.glines.get(g)?;
        let from = self.vertex_state(line.end(Dir::In), overrides)?;
        let to = self.vertex_state(line.end(Dir::Out), overrides)?;
        Ok(oracle.propagator(&from.g_end(Dir::Out), &to.g_end(Dir::In), is_measure))
    }

    /// Oracle value of W-line `w` under the given vertex overrides.
    pub fn evaluate_wline(
        &self,
        oracle: &dyn WeightOracle,
        w: WLineId,
        overrides: &[(VertexId, VertexState)],
        flags: WFlags,
    ) -> Result<Complex64, DmcError> {
        let line = self.wlines.get(w)?;
        let from = self.vertex_state(line.end(Dir::In), overrides)?;
        let to = self.vertex_state(line.end(Dir::Out), overrides)?;
        Ok(oracle.interaction(&from.w_end(), &to.w_end(), flags))
    }

    /// Current flags of `w`.
    pub fn wline_flags(&self, w: WLineId) -> Result<WFlags, DmcError> {
        let line = self.wlines.get(w)?;
        Ok(WFlags {
            is_worm: line.is_worm,
            is_measure: line.is_measure,
            is_delta: line.is_delta,
        })
    }

    /// Whether `w` would be a worm line for the given worm placement.
    pub fn touches_worm(&self, w: WLineId, worm: Option<&Worm>) -> Result<bool, DmcError> {
        let line = self.wlines.get(w)?;
        Ok(worm.is_some_and(|worm| line.ends.iter().any(|&v| worm.is_end(v))))
    }

    /// `(-1)^order * sign * prod(G) * prod(W)` from the cached line weights.
    pub fn recomputed_weight(&self) -> Complex64 {
        let order_sign = if self.order % 2 == 0 { 1.0 } else { -1.0 };
        let sign = order_sign * f64::from(self.sign_fermi_loop);
        let g: Complex64 = self.glines.iter().map(|(_, line)| line.weight).product();
        let w: Complex64 = self.wlines.iter().map(|(_, line)| line.weight).product();
        g * w * sign
    }

    /// Number of closed cycles formed by following outgoing G-lines.
    pub fn count_loops(&self) -> Result<usize, DmcError> {
        let mut seen = BTreeSet::new();
        let mut loops = 0;
        for start in self.vertices.ids() {
            if seen.contains(&start) {
                continue;
            }
            loops += 1;
            let mut v = start;
            while seen.insert(v) {
                let out = self.vertices.get(v)?.gline(Dir::Out);
                v = self.glines.get(out)?.end(Dir::Out);
            }
            if v != start {
                return Err(DmcError::Diagram(
                    ErrorInfo::new("broken-loop", "G-line walk did not close on its start")
                        .with_context("start", start.to_string())
                        .with_context("stuck", v.to_string()),
                ));
            }
        }
        Ok(loops)
    }

    /// Line momenta keyed by raw id, for diagnostics.
    pub fn momentum_snapshot(&self) -> MomentumSnapshot {
        MomentumSnapshot {
            order: self.order,
            glines: self
                .glines
                .iter()
                .map(|(id, line)| (id.as_raw(), line.k.raw()))
                .collect(),
            wlines: self
                .wlines
                .iter()
                .map(|(id, line)| (id.as_raw(), line.k.raw()))
                .collect(),
            worm: self.worm.as_ref().map(|worm| worm.k.raw()),
        }
    }
}

/// Serializable momentum assignment of a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumSnapshot {
    /// Diagram order.
    pub order: usize,
    /// G-line momenta.
    pub glines: BTreeMap<u32, i64>,
    /// W-line momenta.
    pub wlines: BTreeMap<u32, i64>,
    /// Worm momentum.
    pub worm: Option<i64>,
}

impl MomentumSnapshot {
    /// Renders the snapshot as compact JSON.
    pub fn to_json(&self) -> Result<String, DmcError> {
        serde_json::to_string(self).map_err(|err| {
            DmcError::Serde(ErrorInfo::new("snapshot-encode", err.to_string()))
        })
    }
}
