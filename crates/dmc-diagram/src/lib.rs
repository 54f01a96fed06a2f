#![deny(missing_docs)]

//! Diagram graph for the diagrammatic Monte Carlo engine.
//!
//! Vertices, propagator lines and interaction lines live in separate arenas
//! and refer to each other by typed ids. Freed slots are recycled, alive ids
//! stay stable, and every arena supports O(1) uniform random selection.

pub mod analytic;
mod check;
mod diagram;
mod ids;
mod pool;
mod records;
mod seed;
pub mod weight;

pub use analytic::{AnalyticOracle, AnalyticParams, GaussianWormWeight};
pub use check::ConsistencyReport;
pub use diagram::{Diagram, MomentumSnapshot};
pub use ids::{GLineId, PoolId, VertexId, WLineId};
pub use pool::Pool;
pub use records::{GLine, MeasureLine, Vertex, VertexState, WLine, Worm, WormEnd};
pub use seed::{SeedMeasure, SeedSpec, SeedVertex};
pub use weight::{GEnd, WEnd, WFlags, WeightOracle, WormWeight};
