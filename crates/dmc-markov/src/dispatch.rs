use serde::{Deserialize, Serialize};

use crate::config::MoveWeights;

/// The fourteen diagram updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// Open a worm on an interaction line.
    CreateWorm,
    /// Close a worm whose ends share an interaction line.
    DeleteWorm,
    /// Move a worm end along a propagator.
    MoveWormOnG,
    /// Move a worm end across its interaction line.
    MoveWormOnW,
    /// Swap the propagators leaving Ira and Masha.
    Reconnect,
    /// Insert an interaction line next to the worm ends.
    AddInteraction,
    /// Remove the interaction line next to the worm ends.
    DeleteInteraction,
    /// Resample the time of a vertex.
    ChangeTau,
    /// Resample the site of a vertex.
    ChangeR,
    /// Reserved loop-momentum resampling; never changes the diagram.
    ChangeRLoop,
    /// Move the observable from a propagator to an interaction line.
    ChangeMeasureFromGToW,
    /// Move the observable from an interaction line to a propagator.
    ChangeMeasureFromWToG,
    /// Make an instantaneous interaction retarded.
    ChangeDeltaToNotDelta,
    /// Make a retarded interaction instantaneous.
    ChangeNotDeltaToDelta,
}

impl MoveKind {
    /// Every move, in table order.
    pub const ALL: [MoveKind; 14] = [
        MoveKind::CreateWorm,
        MoveKind::DeleteWorm,
        MoveKind::MoveWormOnG,
        MoveKind::MoveWormOnW,
        MoveKind::Reconnect,
        MoveKind::AddInteraction,
        MoveKind::DeleteInteraction,
        MoveKind::ChangeTau,
        MoveKind::ChangeR,
        MoveKind::ChangeRLoop,
        MoveKind::ChangeMeasureFromGToW,
        MoveKind::ChangeMeasureFromWToG,
        MoveKind::ChangeDeltaToNotDelta,
        MoveKind::ChangeNotDeltaToDelta,
    ];

    /// Stable name used in statistics and error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::CreateWorm => "create-worm",
            MoveKind::DeleteWorm => "delete-worm",
            MoveKind::MoveWormOnG => "move-worm-on-g",
            MoveKind::MoveWormOnW => "move-worm-on-w",
            MoveKind::Reconnect => "reconnect",
            MoveKind::AddInteraction => "add-interaction",
            MoveKind::DeleteInteraction => "delete-interaction",
            MoveKind::ChangeTau => "change-tau",
            MoveKind::ChangeR => "change-r",
            MoveKind::ChangeRLoop => "change-r-loop",
            MoveKind::ChangeMeasureFromGToW => "change-measure-g-to-w",
            MoveKind::ChangeMeasureFromWToG => "change-measure-w-to-g",
            MoveKind::ChangeDeltaToNotDelta => "change-delta-to-not-delta",
            MoveKind::ChangeNotDeltaToDelta => "change-not-delta-to-delta",
        }
    }

    /// Position in [`MoveKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The move that undoes this one.
    pub fn reverse(self) -> MoveKind {
        match self {
            MoveKind::CreateWorm => MoveKind::DeleteWorm,
            MoveKind::DeleteWorm => MoveKind::CreateWorm,
            MoveKind::AddInteraction => MoveKind::DeleteInteraction,
            MoveKind::DeleteInteraction => MoveKind::AddInteraction,
            MoveKind::ChangeMeasureFromGToW => MoveKind::ChangeMeasureFromWToG,
            MoveKind::ChangeMeasureFromWToG => MoveKind::ChangeMeasureFromGToW,
            MoveKind::ChangeDeltaToNotDelta => MoveKind::ChangeNotDeltaToDelta,
            MoveKind::ChangeNotDeltaToDelta => MoveKind::ChangeDeltaToNotDelta,
            other => other,
        }
    }
}

/// Fixed categorical distribution over the moves.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTable {
    probability: [f64; 14],
    cumulative: [f64; 14],
}

impl MoveTable {
    /// Normalises the configured weights. Weights must already be validated.
    pub fn new(weights: &MoveWeights) -> Self {
        let total: f64 = MoveKind::ALL.iter().map(|&kind| weights.weight(kind)).sum();
        let mut probability = [0.0; 14];
        let mut cumulative = [0.0; 14];
        let mut running = 0.0;
        for kind in MoveKind::ALL {
            let p = weights.weight(kind) / total;
            probability[kind.index()] = p;
            running += p;
            cumulative[kind.index()] = running;
        }
        if let Some(last) = MoveKind::ALL
            .iter()
            .rev()
            .find(|kind| probability[kind.index()] > 0.0)
        {
            for c in &mut cumulative[last.index()..] {
                *c = 1.0;
            }
        }
        Self {
            probability,
            cumulative,
        }
    }

    /// Selection probability of `kind`.
    pub fn probability(&self, kind: MoveKind) -> f64 {
        self.probability[kind.index()]
    }

    /// `P(reverse) / P(forward)`; zero when the forward move is never drawn.
    pub fn selection_ratio(&self, reverse: MoveKind, forward: MoveKind) -> f64 {
        let forward = self.probability(forward);
        if forward > 0.0 {
            self.probability(reverse) / forward
        } else {
            0.0
        }
    }

    /// Move owning the cumulative bin that contains `u` in `[0, 1)`.
    pub fn select(&self, u: f64) -> MoveKind {
        let index = self.cumulative.partition_point(|&c| c <= u);
        MoveKind::ALL[index.min(MoveKind::ALL.len() - 1)]
    }
}
