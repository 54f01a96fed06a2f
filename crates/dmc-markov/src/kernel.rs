use std::collections::BTreeMap;

use dmc_core::{DmcError, ErrorInfo, RandomSource, RngHandle};
use dmc_diagram::{ConsistencyReport, Diagram, WeightOracle, WormWeight};
use log::{debug, error, trace, warn};

use crate::config::{check_order_weights, MarkovConfig};
use crate::determinism::chain_rng;
use crate::dispatch::{MoveKind, MoveTable};
use crate::metrics::{MoveStats, StepOutcome};
use crate::proposal::{Bias, MoveContext, Proposal};
use crate::{moves_local, moves_measure, moves_order, moves_worm};

/// One Markov chain: the diagram it evolves, the weight functions, its own
/// generator and the per-move statistics.
pub struct Markov<R: RandomSource = RngHandle> {
    config: MarkovConfig,
    diagram: Diagram,
    oracle: Box<dyn WeightOracle>,
    worm_weight: Box<dyn WormWeight>,
    rng: R,
    table: MoveTable,
    bias: Bias,
    stats: BTreeMap<MoveKind, MoveStats>,
    steps: u64,
}

impl Markov<RngHandle> {
    /// Builds a chain whose generator is derived from `config.seed` and
    /// `config.chain`.
    pub fn new(
        config: MarkovConfig,
        diagram: Diagram,
        oracle: Box<dyn WeightOracle>,
        worm_weight: Box<dyn WormWeight>,
    ) -> Result<Self, DmcError> {
        let rng = chain_rng(config.seed, config.chain);
        Self::with_rng(config, diagram, oracle, worm_weight, rng)
    }
}

impl<R: RandomSource> Markov<R> {
    /// Builds a chain driven by an explicit random source.
    ///
    /// The configuration is validated and the seed diagram audited before the
    /// chain is handed out.
    pub fn with_rng(
        config: MarkovConfig,
        diagram: Diagram,
        oracle: Box<dyn WeightOracle>,
        worm_weight: Box<dyn WormWeight>,
        rng: R,
    ) -> Result<Self, DmcError> {
        config.validate()?;
        let scale = config.beta.abs().max(diagram.beta().abs());
        if (config.beta - diagram.beta()).abs() > 1e-12 * scale {
            return Err(DmcError::Config(
                ErrorInfo::new("beta-mismatch", "configured beta differs from the diagram's")
                    .with_context("config", config.beta.to_string())
                    .with_context("diagram", diagram.beta().to_string())
                    .with_hint("cached line weights depend on beta; rebuild the seed"),
            ));
        }
        if diagram.order() > config.max_order {
            return Err(DmcError::Config(
                ErrorInfo::new("order-exceeds-max", "seed diagram is above max_order")
                    .with_context("order", diagram.order().to_string())
                    .with_context("max_order", config.max_order.to_string()),
            ));
        }

        let table = MoveTable::new(&config.move_weights);
        let bias = Bias {
            order_weights: config.order_weights(),
            worm_space_reweight: config.worm_space_reweight,
            max_order: config.max_order,
        };
        let markov = Self {
            config,
            diagram,
            oracle,
            worm_weight,
            rng,
            table,
            bias,
            stats: BTreeMap::new(),
            steps: 0,
        };
        markov.verify(None)?;
        debug!(
            "chain {} ready: order {}, beta {}, max_order {}",
            markov.config.chain,
            markov.diagram.order(),
            markov.diagram.beta(),
            markov.config.max_order
        );
        Ok(markov)
    }

    /// Runs `sweeps` steps.
    pub fn hop(&mut self, sweeps: u64) -> Result<(), DmcError> {
        for _ in 0..sweeps {
            self.step()?;
        }
        Ok(())
    }

    /// Draws a move from the table and attempts it.
    pub fn step(&mut self) -> Result<StepOutcome, DmcError> {
        let u = self.rng.uniform();
        let kind = self.table.select(u);
        self.attempt(kind)
    }

    /// Proposes `kind` and accepts or rejects it with the Metropolis rule.
    pub fn attempt(&mut self, kind: MoveKind) -> Result<StepOutcome, DmcError> {
        let proposal = {
            let mut ctx = MoveContext {
                diagram: &self.diagram,
                oracle: &*self.oracle,
                worm_weight: &*self.worm_weight,
                table: &self.table,
                bias: &self.bias,
                rng: &mut self.rng,
            };
            propose(kind, &mut ctx)?
        };
        self.steps += 1;

        let outcome = match proposal {
            None => StepOutcome::noop(kind),
            Some(proposal) => self.metropolis(kind, proposal)?,
        };
        self.record(&outcome);

        if self.config.check_interval > 0 && self.steps % self.config.check_interval == 0 {
            self.verify(Some(kind))?;
        }
        Ok(outcome)
    }

    fn metropolis(&mut self, kind: MoveKind, proposal: Proposal) -> Result<StepOutcome, DmcError> {
        let p = proposal.ratio.norm() * proposal.bias;
        if !(p.is_finite() && p >= 0.0) {
            return Err(DmcError::Invariant(
                ErrorInfo::new("bad-acceptance", "acceptance probability is not a finite non-negative number")
                    .with_context("move", kind.as_str())
                    .with_context("probability", p.to_string())
                    .with_context("ratio", proposal.ratio.to_string())
                    .with_context("bias", proposal.bias.to_string()),
            ));
        }
        let accepted = p >= 1.0 || self.rng.uniform() < p;
        if accepted {
            self.diagram.apply_ratio(proposal.ratio);
            proposal.patch.apply(&mut self.diagram)?;
            trace!(
                "{} accepted with p = {p:.4}, order {}",
                kind.as_str(),
                self.diagram.order()
            );
        }
        Ok(StepOutcome {
            kind,
            proposed: true,
            accepted,
            acceptance_prob: Some(p),
        })
    }

    fn record(&mut self, outcome: &StepOutcome) {
        let entry = self.stats.entry(outcome.kind).or_default();
        if outcome.proposed {
            entry.proposed += 1;
            if outcome.accepted {
                entry.accepted += 1;
            }
        } else {
            entry.noop += 1;
        }
    }

    /// Replaces the order bias table and the worm-sector bias.
    pub fn reweight(
        &mut self,
        order_weights: &[f64],
        worm_space_reweight: f64,
    ) -> Result<(), DmcError> {
        check_order_weights(order_weights, self.config.max_order)?;
        if !(worm_space_reweight.is_finite() && worm_space_reweight > 0.0) {
            return Err(DmcError::Config(
                ErrorInfo::new("bad-worm-reweight", "worm_space_reweight must be positive and finite")
                    .with_context("value", worm_space_reweight.to_string()),
            ));
        }
        self.bias.order_weights = order_weights.to_vec();
        self.bias.worm_space_reweight = worm_space_reweight;
        self.config.order_reweight = order_weights.to_vec();
        self.config.worm_space_reweight = worm_space_reweight;
        debug!("reweighted chain {}: worm sector {worm_space_reweight}", self.config.chain);
        Ok(())
    }

    /// Audits the diagram; failures become [`DmcError::Invariant`].
    pub fn verify(&self, last: Option<MoveKind>) -> Result<ConsistencyReport, DmcError> {
        let report = self.diagram.check_consistency(
            &*self.oracle,
            &*self.worm_weight,
            self.config.tolerance,
        )?;
        if report.passed {
            return Ok(report);
        }
        let name = last.map_or("seed", |kind| kind.as_str());
        for issue in &report.issues {
            warn!("after {name}: {issue}");
        }
        error!(
            "diagram failed verification after {name} at step {}: {} issue(s)",
            self.steps,
            report.issues.len()
        );
        Err(DmcError::Invariant(
            ErrorInfo::new("diagram-inconsistent", report.issues.join("; "))
                .with_context("move", name)
                .with_context("step", self.steps.to_string())
                .with_context("order", self.diagram.order().to_string())
                .with_context("discrepancy", report.discrepancy.to_string())
                .with_context("momentum", self.diagram.momentum_snapshot().to_json()?),
        ))
    }

    /// Acceptance rate per move name, for every move drawn so far.
    pub fn acceptance_rates(&self) -> BTreeMap<String, f64> {
        self.stats
            .iter()
            .map(|(kind, stats)| (kind.as_str().to_string(), stats.acceptance_rate()))
            .collect()
    }

    /// Counters of `kind`.
    pub fn stats(&self, kind: MoveKind) -> MoveStats {
        self.stats.get(&kind).copied().unwrap_or_default()
    }

    /// Steps attempted so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The current diagram.
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Effective configuration, including any reweighting.
    pub fn config(&self) -> &MarkovConfig {
        &self.config
    }

    /// Move selection table.
    pub fn table(&self) -> &MoveTable {
        &self.table
    }

    /// The chain's generator.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

fn propose<R: RandomSource + ?Sized>(
    kind: MoveKind,
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    match kind {
        MoveKind::CreateWorm => moves_worm::create_worm(ctx),
        MoveKind::DeleteWorm => moves_worm::delete_worm(ctx),
        MoveKind::MoveWormOnG => moves_worm::move_worm_on_g(ctx),
        MoveKind::MoveWormOnW => moves_worm::move_worm_on_w(ctx),
        MoveKind::Reconnect => moves_worm::reconnect(ctx),
        MoveKind::AddInteraction => moves_order::add_interaction(ctx),
        MoveKind::DeleteInteraction => moves_order::delete_interaction(ctx),
        MoveKind::ChangeTau => moves_local::change_tau(ctx),
        MoveKind::ChangeR => moves_local::change_r(ctx),
        MoveKind::ChangeRLoop => moves_local::change_r_loop(ctx),
        MoveKind::ChangeMeasureFromGToW => moves_measure::change_measure_g_to_w(ctx),
        MoveKind::ChangeMeasureFromWToG => moves_measure::change_measure_w_to_g(ctx),
        MoveKind::ChangeDeltaToNotDelta => moves_local::change_delta_to_not_delta(ctx),
        MoveKind::ChangeNotDeltaToDelta => moves_local::change_not_delta_to_delta(ctx),
    }
}
