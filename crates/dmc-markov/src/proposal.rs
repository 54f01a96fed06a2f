use dmc_core::{Dir, DmcError, Momentum};
use dmc_diagram::{
    Diagram, GLine, GLineId, MeasureLine, Vertex, VertexId, VertexState, WLine, WLineId,
    WeightOracle, Worm, WormWeight,
};
use num_complex::Complex64;

use crate::dispatch::{MoveKind, MoveTable};
use crate::rules::orient;

/// Order and worm-sector bias of the target distribution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bias {
    pub order_weights: Vec<f64>,
    pub worm_space_reweight: f64,
    pub max_order: usize,
}

impl Bias {
    /// `OW[to] / OW[from]`.
    pub fn order_ratio(&self, from: usize, to: usize) -> f64 {
        match (self.order_weights.get(from), self.order_weights.get(to)) {
            (Some(a), Some(b)) => b / a,
            _ => 0.0,
        }
    }
}

/// Read-only view of the chain handed to a move, plus its generator.
pub(crate) struct MoveContext<'a, R: ?Sized> {
    pub diagram: &'a Diagram,
    pub oracle: &'a dyn WeightOracle,
    pub worm_weight: &'a dyn WormWeight,
    pub table: &'a MoveTable,
    pub bias: &'a Bias,
    pub rng: &'a mut R,
}

impl<R: ?Sized> MoveContext<'_, R> {
    /// Selection probability of the reverse move over that of `forward`.
    pub fn selection_ratio(&self, forward: MoveKind) -> f64 {
        self.table.selection_ratio(forward.reverse(), forward)
    }

    /// Worm weight for ends at the given vertices under `overrides`.
    pub fn worm_weight_at(
        &self,
        ira: VertexId,
        masha: VertexId,
        overrides: &[(VertexId, VertexState)],
    ) -> Result<f64, DmcError> {
        let ira = self.diagram.vertex_state(ira, overrides)?;
        let masha = self.diagram.vertex_state(masha, overrides)?;
        Ok(self
            .worm_weight
            .weight(ira.site, masha.site, ira.tau, masha.tau))
    }

    /// Amplitude of a propagator hanging off leg `dir` of `near` and ending at `far`.
    pub fn propagator(
        &self,
        dir: Dir,
        near: VertexState,
        far: VertexState,
        is_measure: bool,
    ) -> Complex64 {
        let (from, to) = orient(dir, near, far);
        self.oracle
            .propagator(&from.g_end(Dir::Out), &to.g_end(Dir::In), is_measure)
    }

    /// Re-evaluates every line touching the `moved` vertices.
    ///
    /// `retag` replaces the delta flag of one W-line. Each line is evaluated
    /// once even when both of its ends moved.
    pub fn relocate(
        &self,
        moved: &[(VertexId, VertexState)],
        retag: Option<(WLineId, bool)>,
    ) -> Result<Relocation, DmcError> {
        let mut out = Relocation {
            ratio: Complex64::new(1.0, 0.0),
            glines: Vec::new(),
            wlines: Vec::new(),
        };
        for &(id, _) in moved {
            let v = self.diagram.vertex(id)?;
            for leg in Dir::ALL {
                let g = v.gline(leg);
                if out.glines.iter().any(|(seen, _)| *seen == g) {
                    continue;
                }
                let line = self.diagram.gline(g)?;
                let weight = self.diagram.evaluate_gline(self.oracle, g, moved, line.is_measure)?;
                out.ratio *= weight / line.weight;
                out.glines.push((
                    g,
                    GLineUpdate {
                        weight,
                        ..GLineUpdate::from(line)
                    },
                ));
            }
            if out.wlines.iter().any(|(seen, _)| *seen == v.w) {
                continue;
            }
            let line = self.diagram.wline(v.w)?;
            let mut flags = self.diagram.wline_flags(v.w)?;
            if let Some((w, is_delta)) = retag {
                if w == v.w {
                    flags.is_delta = is_delta;
                }
            }
            let weight = self.diagram.evaluate_wline(self.oracle, v.w, moved, flags)?;
            out.ratio *= weight / line.weight;
            out.wlines.push((
                v.w,
                WLineUpdate {
                    weight,
                    is_delta: flags.is_delta,
                    ..WLineUpdate::from(line)
                },
            ));
        }
        Ok(out)
    }

    /// The worm after `moved` and its weight ratio, when a worm end moved.
    pub fn rescale_worm(
        &self,
        moved: &[(VertexId, VertexState)],
    ) -> Result<Option<(Worm, f64)>, DmcError> {
        let Some(worm) = self.diagram.worm() else {
            return Ok(None);
        };
        if !moved.iter().any(|(id, _)| worm.is_end(*id)) {
            return Ok(None);
        }
        let weight = self.worm_weight_at(worm.ira, worm.masha, moved)?;
        let ratio = weight / worm.weight;
        Ok(Some((Worm { weight, ..worm.clone() }, ratio)))
    }
}

/// Line updates produced by moving vertices in place.
#[derive(Debug, Clone)]
pub(crate) struct Relocation {
    pub ratio: Complex64,
    pub glines: Vec<(GLineId, GLineUpdate)>,
    pub wlines: Vec<(WLineId, WLineUpdate)>,
}

impl Relocation {
    /// Turns the relocation into a patch that also moves the vertices.
    pub fn into_patch(self, moved: Vec<(VertexId, VertexState)>) -> Patch {
        Patch {
            vertices: moved,
            glines: self.glines,
            wlines: self.wlines,
            ..Patch::default()
        }
    }
}

/// A fully evaluated candidate state.
#[derive(Debug, Clone)]
pub(crate) struct Proposal {
    /// `new / old` of the diagram weight.
    pub ratio: Complex64,
    /// Every non-weight factor of the acceptance probability.
    pub bias: f64,
    /// What to write into the diagram on acceptance.
    pub patch: Patch,
}

/// New values of a propagator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GLineUpdate {
    pub k: Momentum,
    pub weight: Complex64,
    pub is_measure: bool,
}

impl From<&GLine> for GLineUpdate {
    fn from(line: &GLine) -> Self {
        Self {
            k: line.k,
            weight: line.weight,
            is_measure: line.is_measure,
        }
    }
}

/// New values of an interaction line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WLineUpdate {
    pub k: Momentum,
    pub weight: Complex64,
    pub is_measure: bool,
    pub is_delta: bool,
    pub is_worm: bool,
}

impl From<&WLine> for WLineUpdate {
    fn from(line: &WLine) -> Self {
        Self {
            k: line.k,
            weight: line.weight,
            is_measure: line.is_measure,
            is_delta: line.is_delta,
            is_worm: line.is_worm,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum WormChange {
    #[default]
    Keep,
    Set(Worm),
    Remove,
}

/// Two new vertices joined by a new W-line, spliced into the propagators
/// leaving Ira and Masha on leg `dir`.
#[derive(Debug, Clone)]
pub(crate) struct InsertPair {
    pub dir: Dir,
    pub dir_w: Dir,
    pub ira: VertexId,
    pub masha: VertexId,
    pub c: VertexId,
    pub d: VertexId,
    pub gic: GLineId,
    pub gmd: GLineId,
    pub a: VertexState,
    pub b: VertexState,
    pub w: WLineUpdate,
    pub gia: GLineUpdate,
    pub gac: GLineUpdate,
    pub gmb: GLineUpdate,
    pub gbd: GLineUpdate,
}

/// The inverse of [`InsertPair`].
#[derive(Debug, Clone)]
pub(crate) struct RemovePair {
    pub dir: Dir,
    pub ira: VertexId,
    pub masha: VertexId,
    pub a: VertexId,
    pub b: VertexId,
    pub c: VertexId,
    pub d: VertexId,
    pub w: WLineId,
    pub old_glines: [GLineId; 4],
    pub gic: GLineUpdate,
    pub gmd: GLineUpdate,
}

#[derive(Debug, Clone)]
pub(crate) enum Splice {
    Insert(Box<InsertPair>),
    Remove(Box<RemovePair>),
}

/// Every write an accepted move performs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Patch {
    pub vertices: Vec<(VertexId, VertexState)>,
    pub glines: Vec<(GLineId, GLineUpdate)>,
    pub wlines: Vec<(WLineId, WLineUpdate)>,
    /// `vertex.g[leg] = line`.
    pub vertex_legs: Vec<(VertexId, Dir, GLineId)>,
    /// `line.ends[end] = vertex`.
    pub gline_ends: Vec<(GLineId, Dir, VertexId)>,
    pub worm: WormChange,
    pub measure: Option<MeasureLine>,
    pub flip_fermi_sign: bool,
    pub splice: Option<Splice>,
}

impl Patch {
    /// Writes the patch into `diagram`. The running weight is not touched.
    pub fn apply(self, diagram: &mut Diagram) -> Result<(), DmcError> {
        match self.splice {
            Some(Splice::Insert(pair)) => insert_pair(diagram, *pair)?,
            Some(Splice::Remove(pair)) => remove_pair(diagram, *pair)?,
            None => {}
        }
        for (id, state) in self.vertices {
            let v = diagram.vertex_mut(id)?;
            v.site = state.site;
            v.tau = state.tau;
            v.spin = state.spin;
        }
        for (id, update) in self.glines {
            let g = diagram.gline_mut(id)?;
            g.k = update.k;
            g.weight = update.weight;
            g.is_measure = update.is_measure;
        }
        for (id, update) in self.wlines {
            let w = diagram.wline_mut(id)?;
            w.k = update.k;
            w.weight = update.weight;
            w.is_measure = update.is_measure;
            w.is_delta = update.is_delta;
            w.is_worm = update.is_worm;
        }
        for (v, leg, g) in self.vertex_legs {
            diagram.vertex_mut(v)?.g[leg.index()] = g;
        }
        for (g, end, v) in self.gline_ends {
            diagram.gline_mut(g)?.ends[end.index()] = v;
        }
        match self.worm {
            WormChange::Keep => {}
            WormChange::Set(worm) => diagram.set_worm(Some(worm)),
            WormChange::Remove => diagram.set_worm(None),
        }
        if let Some(measure) = self.measure {
            diagram.set_measure(measure);
        }
        if self.flip_fermi_sign {
            diagram.flip_fermi_sign();
        }
        Ok(())
    }
}

/// Wires `near --line--> far` so that `line` hangs off leg `dir` of `near`.
fn connect(
    diagram: &mut Diagram,
    near: VertexId,
    dir: Dir,
    line: GLineId,
    far: VertexId,
) -> Result<(), DmcError> {
    diagram.vertex_mut(near)?.g[dir.index()] = line;
    diagram.vertex_mut(far)?.g[dir.flip().index()] = line;
    let g = diagram.gline_mut(line)?;
    g.ends[dir.flip().index()] = near;
    g.ends[dir.index()] = far;
    Ok(())
}

fn new_gline(update: GLineUpdate, placeholder: VertexId) -> GLine {
    GLine {
        ends: [placeholder; 2],
        k: update.k,
        weight: update.weight,
        is_measure: update.is_measure,
    }
}

fn insert_pair(diagram: &mut Diagram, pair: InsertPair) -> Result<(), DmcError> {
    diagram.remove_gline(pair.gic)?;
    diagram.remove_gline(pair.gmd)?;

    let placeholder = pair.ira;
    let gia = diagram.insert_gline(new_gline(pair.gia, placeholder));
    let gac = diagram.insert_gline(new_gline(pair.gac, placeholder));
    let gmb = diagram.insert_gline(new_gline(pair.gmb, placeholder));
    let gbd = diagram.insert_gline(new_gline(pair.gbd, placeholder));
    let w = diagram.insert_wline(WLine {
        ends: [placeholder; 2],
        k: pair.w.k,
        weight: pair.w.weight,
        is_measure: pair.w.is_measure,
        is_delta: pair.w.is_delta,
        is_worm: pair.w.is_worm,
    });
    let a = diagram.insert_vertex(Vertex {
        site: pair.a.site,
        tau: pair.a.tau,
        spin: pair.a.spin,
        dir: pair.dir_w,
        g: [gia; 2],
        w,
    });
    let b = diagram.insert_vertex(Vertex {
        site: pair.b.site,
        tau: pair.b.tau,
        spin: pair.b.spin,
        dir: pair.dir_w.flip(),
        g: [gmb; 2],
        w,
    });
    let line = diagram.wline_mut(w)?;
    line.ends[pair.dir_w.index()] = a;
    line.ends[pair.dir_w.flip().index()] = b;

    connect(diagram, pair.ira, pair.dir, gia, a)?;
    connect(diagram, a, pair.dir, gac, pair.c)?;
    connect(diagram, pair.masha, pair.dir, gmb, b)?;
    connect(diagram, b, pair.dir, gbd, pair.d)?;

    if pair.gac.is_measure {
        diagram.set_measure(MeasureLine::G(gac));
    }
    if pair.gbd.is_measure {
        diagram.set_measure(MeasureLine::G(gbd));
    }
    diagram.set_order(diagram.order() + 1);
    Ok(())
}

fn remove_pair(diagram: &mut Diagram, pair: RemovePair) -> Result<(), DmcError> {
    for g in pair.old_glines {
        diagram.remove_gline(g)?;
    }
    diagram.remove_wline(pair.w)?;
    diagram.remove_vertex(pair.a)?;
    diagram.remove_vertex(pair.b)?;

    let gic = diagram.insert_gline(new_gline(pair.gic, pair.ira));
    let gmd = diagram.insert_gline(new_gline(pair.gmd, pair.masha));
    connect(diagram, pair.ira, pair.dir, gic, pair.c)?;
    connect(diagram, pair.masha, pair.dir, gmd, pair.d)?;

    if pair.gic.is_measure {
        diagram.set_measure(MeasureLine::G(gic));
    }
    if pair.gmd.is_measure {
        diagram.set_measure(MeasureLine::G(gmd));
    }
    diagram.set_order(diagram.order().saturating_sub(1));
    Ok(())
}
