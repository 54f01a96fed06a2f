#![deny(missing_docs)]

//! Metropolis move engine and dispatcher for diagrammatic Monte Carlo.
//!
//! A [`Markov`] chain owns one [`dmc_diagram::Diagram`] and mutates it with
//! fourteen detailed-balance-preserving updates. Every update draws its
//! random numbers from the chain's generator in a fixed order, evaluates the
//! weight ratio of the candidate state without touching the diagram, and
//! commits the candidate only when it is accepted.

/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic per-chain seed derivation.
pub mod determinism;
/// Move kinds and the selection table.
pub mod dispatch;
/// The chain context and its Metropolis skeleton.
pub mod kernel;
/// Per-move counters and step outcomes.
pub mod metrics;
/// Spin selection rules and proposal helpers.
pub mod rules;

mod moves_local;
mod moves_measure;
mod moves_order;
mod moves_worm;
mod proposal;

pub use config::{MarkovConfig, MoveWeights};
pub use determinism::{chain_rng, chain_seed};
pub use dispatch::{MoveKind, MoveTable};
pub use kernel::Markov;
pub use metrics::{MoveStats, StepOutcome};
