use dmc_core::{Dir, Momentum, Site, Spin};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::ids::{GLineId, VertexId, WLineId};
use crate::weight::{GEnd, WEnd};

/// Interaction vertex: one end of a W-line joining two propagator legs.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Lattice site.
    pub site: Site,
    /// Imaginary time in `[0, beta)`.
    pub tau: f64,
    /// Spin of the incoming and outgoing propagator legs.
    pub spin: [Spin; 2],
    /// Which end of its W-line this vertex is.
    pub dir: Dir,
    /// Incoming (`In`) and outgoing (`Out`) G-lines.
    pub g: [GLineId; 2],
    /// Incident W-line.
    pub w: WLineId,
}

impl Vertex {
    /// Local state of the vertex, detached from its topology.
    pub fn state(&self) -> VertexState {
        VertexState {
            site: self.site,
            tau: self.tau,
            spin: self.spin,
        }
    }

    /// Spin on leg `leg`.
    pub fn spin(&self, leg: Dir) -> Spin {
        self.spin[leg.index()]
    }

    /// G-line attached to leg `leg`.
    pub fn gline(&self, leg: Dir) -> GLineId {
        self.g[leg.index()]
    }

    /// Non-spin-flip vertex.
    pub fn is_diagonal(&self) -> bool {
        self.spin[0] == self.spin[1]
    }
}

/// The part of a vertex the weight functions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexState {
    /// Lattice site.
    pub site: Site,
    /// Imaginary time.
    pub tau: f64,
    /// Leg spins, indexed by [`Dir`].
    pub spin: [Spin; 2],
}

impl VertexState {
    /// The end of a G-line attached to leg `leg` of this vertex.
    pub fn g_end(&self, leg: Dir) -> GEnd {
        GEnd {
            site: self.site,
            tau: self.tau,
            spin: self.spin[leg.index()],
        }
    }

    /// The end of the W-line attached to this vertex.
    pub fn w_end(&self) -> WEnd {
        WEnd {
            site: self.site,
            tau: self.tau,
            spin: self.spin,
        }
    }
}

/// Propagator line `ends[In] -> ends[Out]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GLine {
    /// Source (`In`) and target (`Out`) vertices.
    pub ends: [VertexId; 2],
    /// Momentum carried from source to target.
    pub k: Momentum,
    /// Cached oracle value.
    pub weight: Complex64,
    /// Carries the measured observable.
    pub is_measure: bool,
}

impl GLine {
    /// Vertex at end `end`.
    pub fn end(&self, end: Dir) -> VertexId {
        self.ends[end.index()]
    }
}

/// Interaction line; momentum flows from `ends[In]` to `ends[Out]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WLine {
    /// The two vertices, in momentum-flow order.
    pub ends: [VertexId; 2],
    /// Momentum carried from `ends[In]` to `ends[Out]`.
    pub k: Momentum,
    /// Cached oracle value.
    pub weight: Complex64,
    /// Carries the measured observable.
    pub is_measure: bool,
    /// Instantaneous interaction: both ends share one time.
    pub is_delta: bool,
    /// At least one end is a worm end.
    pub is_worm: bool,
}

impl WLine {
    /// Vertex at end `end`.
    pub fn end(&self, end: Dir) -> VertexId {
        self.ends[end.index()]
    }
}

/// Open ends of a worm diagram.
///
/// The worm carries momentum `k` from Ira to Masha, so Ira has a net inflow
/// excess of `k` and Masha a net outflow excess of `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worm {
    /// First open end.
    pub ira: VertexId,
    /// Second open end.
    pub masha: VertexId,
    /// Spin current carried by the worm, `+1` or `-1`.
    pub dspin: i8,
    /// Momentum carried from Ira to Masha.
    pub k: Momentum,
    /// Cached worm-weight value.
    pub weight: f64,
}

impl Worm {
    /// Whether `v` is Ira or Masha.
    pub fn is_end(&self, v: VertexId) -> bool {
        v == self.ira || v == self.masha
    }

    /// The requested end.
    pub fn end(&self, end: WormEnd) -> VertexId {
        match end {
            WormEnd::Ira => self.ira,
            WormEnd::Masha => self.masha,
        }
    }

    /// Moves the requested end to `v`.
    pub fn set_end(&mut self, end: WormEnd, v: VertexId) {
        match end {
            WormEnd::Ira => self.ira = v,
            WormEnd::Masha => self.masha = v,
        }
    }
}

/// One of the two worm ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WormEnd {
    /// The momentum-absorbing end.
    Ira,
    /// The momentum-emitting end.
    Masha,
}

impl WormEnd {
    /// Maps `0` to Ira and anything else to Masha.
    pub fn from_bit(bit: i64) -> Self {
        if bit == 0 {
            WormEnd::Ira
        } else {
            WormEnd::Masha
        }
    }

    /// `+1` for Ira, `-1` for Masha: the sign of momentum and spin currents
    /// the end injects.
    pub fn sign(self) -> i64 {
        match self {
            WormEnd::Ira => 1,
            WormEnd::Masha => -1,
        }
    }
}

/// The line carrying the measured observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureLine {
    /// A propagator line.
    G(GLineId),
    /// An interaction line.
    W(WLineId),
}
