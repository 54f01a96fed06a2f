#![deny(missing_docs)]
#![doc = "Shared primitives for the diagrammatic Monte Carlo engine: errors, seeded randomness, lattice sites, momenta and spins."]

/// Structured error types.
pub mod errors;
/// Periodic lattice indexing.
pub mod lattice;
/// Discrete periodic momenta.
pub mod momentum;
/// Deterministic randomness.
pub mod rng;
mod types;

pub use errors::{DmcError, ErrorInfo};
pub use lattice::{Lattice, Site};
pub use momentum::{Momentum, MAX_K, MOMENTUM_SPACE};
pub use rng::{derive_substream_seed, RandomSource, RngHandle};
pub use types::{Dir, Spin};
