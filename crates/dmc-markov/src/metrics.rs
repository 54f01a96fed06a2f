use serde::{Deserialize, Serialize};

use crate::dispatch::MoveKind;

/// Per-move counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStats {
    /// Times the move produced a proposal and reached the Metropolis test.
    pub proposed: u64,
    /// Proposals that were accepted.
    pub accepted: u64,
    /// Times the move was drawn but its guard turned it into a no-op.
    pub noop: u64,
}

impl MoveStats {
    /// Accepted over proposed, `0` before the first proposal.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// What a single Markov step did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The move that was attempted.
    pub kind: MoveKind,
    /// The move built a proposal.
    pub proposed: bool,
    /// The proposal was accepted.
    pub accepted: bool,
    /// Metropolis acceptance probability, unclipped. `None` for no-ops.
    pub acceptance_prob: Option<f64>,
}

impl StepOutcome {
    pub(crate) fn noop(kind: MoveKind) -> Self {
        Self {
            kind,
            proposed: false,
            accepted: false,
            acceptance_prob: None,
        }
    }
}
