use dmc_core::{DmcError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::dispatch::MoveKind;

/// YAML-configurable parameters of one Markov chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovConfig {
    /// Inverse temperature; must match the seed diagram.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Largest diagram order the chain may reach.
    #[serde(default = "default_max_order")]
    pub max_order: usize,
    /// Bias per order, `max_order + 1` positive entries. Empty means flat.
    #[serde(default)]
    pub order_reweight: Vec<f64>,
    /// Extra weight of the worm sector relative to closed diagrams.
    #[serde(default = "default_worm_space_reweight")]
    pub worm_space_reweight: f64,
    /// Relative selection weights of the moves.
    #[serde(default)]
    pub move_weights: MoveWeights,
    /// Audit the diagram every this many steps; `0` disables auditing.
    #[serde(default)]
    pub check_interval: u64,
    /// Relative tolerance of the audit.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Master seed.
    #[serde(default)]
    pub seed: u64,
    /// Chain index used to derive this chain's substream.
    #[serde(default)]
    pub chain: u64,
}

fn default_beta() -> f64 {
    1.0
}

fn default_max_order() -> usize {
    4
}

fn default_worm_space_reweight() -> f64 {
    0.05
}

fn default_tolerance() -> f64 {
    1e-8
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            beta: default_beta(),
            max_order: default_max_order(),
            order_reweight: Vec::new(),
            worm_space_reweight: default_worm_space_reweight(),
            move_weights: MoveWeights::default(),
            check_interval: 0,
            tolerance: default_tolerance(),
            seed: 0,
            chain: 0,
        }
    }
}

impl MarkovConfig {
    /// Parses a configuration from YAML and validates it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DmcError> {
        let config: MarkovConfig = serde_yaml::from_str(yaml).map_err(|err| {
            DmcError::Serde(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and table lengths.
    pub fn validate(&self) -> Result<(), DmcError> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(DmcError::Config(
                ErrorInfo::new("bad-beta", "beta must be positive and finite")
                    .with_context("beta", self.beta.to_string()),
            ));
        }
        if self.max_order == 0 {
            return Err(DmcError::Config(ErrorInfo::new(
                "bad-max-order",
                "max_order must be at least 1",
            )));
        }
        if !self.order_reweight.is_empty() {
            check_order_weights(&self.order_reweight, self.max_order)?;
        }
        if !(self.worm_space_reweight.is_finite() && self.worm_space_reweight > 0.0) {
            return Err(DmcError::Config(ErrorInfo::new(
                "bad-worm-reweight",
                "worm_space_reweight must be positive and finite",
            )
            .with_context("value", self.worm_space_reweight.to_string())));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(DmcError::Config(ErrorInfo::new(
                "bad-tolerance",
                "tolerance must be positive",
            )));
        }
        self.move_weights.validate()
    }

    /// Order bias table, expanded to a flat table when none was configured.
    pub fn order_weights(&self) -> Vec<f64> {
        if self.order_reweight.is_empty() {
            vec![1.0; self.max_order + 1]
        } else {
            self.order_reweight.clone()
        }
    }
}

pub(crate) fn check_order_weights(weights: &[f64], max_order: usize) -> Result<(), DmcError> {
    if weights.len() != max_order + 1 {
        return Err(DmcError::Config(ErrorInfo::new(
            "order-reweight-length",
            "order_reweight needs one entry per order from 0 to max_order",
        )
        .with_context("expected", (max_order + 1).to_string())
        .with_context("actual", weights.len().to_string())
        .with_hint("pad the table or lower max_order")));
    }
    if let Some((order, value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(DmcError::Config(
            ErrorInfo::new("order-reweight-value", "order weights must be positive")
                .with_context("order", order.to_string())
                .with_context("value", value.to_string()),
        ));
    }
    Ok(())
}

/// Relative selection weights of the fourteen moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    /// Open a worm on an interaction line.
    #[serde(default = "default_move_weight")]
    pub create_worm: f64,
    /// Close a worm sitting on one interaction line.
    #[serde(default = "default_move_weight")]
    pub delete_worm: f64,
    /// Move a worm end along a propagator.
    #[serde(default = "default_move_weight")]
    pub move_worm_on_g: f64,
    /// Move a worm end across its interaction line.
    #[serde(default = "default_move_weight")]
    pub move_worm_on_w: f64,
    /// Swap the propagators leaving Ira and Masha.
    #[serde(default = "default_move_weight")]
    pub reconnect: f64,
    /// Insert an interaction line next to the worm.
    #[serde(default = "default_move_weight")]
    pub add_interaction: f64,
    /// Remove the interaction line next to the worm.
    #[serde(default = "default_move_weight")]
    pub delete_interaction: f64,
    /// Resample a vertex time.
    #[serde(default = "default_move_weight")]
    pub change_tau: f64,
    /// Resample a vertex site.
    #[serde(default = "default_move_weight")]
    pub change_r: f64,
    /// Reserved loop resampling.
    #[serde(default = "default_move_weight")]
    pub change_r_loop: f64,
    /// Move the observable from a propagator to an interaction line.
    #[serde(default = "default_move_weight")]
    pub change_measure_g_to_w: f64,
    /// Move the observable from an interaction line to a propagator.
    #[serde(default = "default_move_weight")]
    pub change_measure_w_to_g: f64,
    /// Make an instantaneous interaction retarded.
    #[serde(default = "default_move_weight")]
    pub change_delta_to_not_delta: f64,
    /// Make a retarded interaction instantaneous.
    #[serde(default = "default_move_weight")]
    pub change_not_delta_to_delta: f64,
}

fn default_move_weight() -> f64 {
    1.0
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self::uniform(default_move_weight())
    }
}

impl MoveWeights {
    /// Every move gets `weight`.
    pub fn uniform(weight: f64) -> Self {
        Self {
            create_worm: weight,
            delete_worm: weight,
            move_worm_on_g: weight,
            move_worm_on_w: weight,
            reconnect: weight,
            add_interaction: weight,
            delete_interaction: weight,
            change_tau: weight,
            change_r: weight,
            change_r_loop: weight,
            change_measure_g_to_w: weight,
            change_measure_w_to_g: weight,
            change_delta_to_not_delta: weight,
            change_not_delta_to_delta: weight,
        }
    }

    /// Configured weight of `kind`.
    pub fn weight(&self, kind: MoveKind) -> f64 {
        match kind {
            MoveKind::CreateWorm => self.create_worm,
            MoveKind::DeleteWorm => self.delete_worm,
            MoveKind::MoveWormOnG => self.move_worm_on_g,
            MoveKind::MoveWormOnW => self.move_worm_on_w,
            MoveKind::Reconnect => self.reconnect,
            MoveKind::AddInteraction => self.add_interaction,
            MoveKind::DeleteInteraction => self.delete_interaction,
            MoveKind::ChangeTau => self.change_tau,
            MoveKind::ChangeR => self.change_r,
            MoveKind::ChangeRLoop => self.change_r_loop,
            MoveKind::ChangeMeasureFromGToW => self.change_measure_g_to_w,
            MoveKind::ChangeMeasureFromWToG => self.change_measure_w_to_g,
            MoveKind::ChangeDeltaToNotDelta => self.change_delta_to_not_delta,
            MoveKind::ChangeNotDeltaToDelta => self.change_not_delta_to_delta,
        }
    }

    fn validate(&self) -> Result<(), DmcError> {
        if let Some(kind) = MoveKind::ALL
            .into_iter()
            .find(|&kind| !(self.weight(kind).is_finite() && self.weight(kind) >= 0.0))
        {
            return Err(DmcError::Config(
                ErrorInfo::new("bad-move-weight", "move weights must be finite and non-negative")
                    .with_context("move", kind.as_str())
                    .with_context("value", self.weight(kind).to_string()),
            ));
        }
        let total: f64 = MoveKind::ALL.into_iter().map(|kind| self.weight(kind)).sum();
        if total <= 0.0 {
            return Err(DmcError::Config(ErrorInfo::new(
                "no-moves",
                "at least one move needs a positive weight",
            )));
        }
        Ok(())
    }
}
