use std::collections::BTreeMap;

use dmc_core::{Dir, DmcError, Momentum};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::diagram::Diagram;
use crate::ids::VertexId;
use crate::records::MeasureLine;
use crate::weight::{WFlags, WeightOracle, WormWeight};

/// Result of a full diagram audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// No issue was found.
    pub passed: bool,
    /// Largest relative weight mismatch observed.
    pub discrepancy: f64,
    /// Human readable descriptions of every failed check.
    pub issues: Vec<String>,
}

impl Diagram {
    /// Recomputes every derived quantity of the diagram from scratch and
    /// compares it with the cached bookkeeping.
    ///
    /// Topology and momentum problems are reported as issues; the weight
    /// comparisons contribute to `discrepancy`, and any relative mismatch above
    /// `tolerance` is an issue as well. Errors are only returned when the pools
    /// reference dead records.
    pub fn check_consistency(
        &self,
        oracle: &dyn WeightOracle,
        worm_weight: &dyn WormWeight,
        tolerance: f64,
    ) -> Result<ConsistencyReport, DmcError> {
        let mut issues = Vec::new();
        let mut discrepancy: f64 = 0.0;
        let mut compare = |what: String,
                           cached: Complex64,
                           expected: Complex64,
                           issues: &mut Vec<String>| {
            let scale = expected.norm().max(f64::MIN_POSITIVE);
            let rel = (cached - expected).norm() / scale;
            let rel = if rel.is_nan() { f64::INFINITY } else { rel };
            discrepancy = discrepancy.max(rel);
            if rel > tolerance {
                issues.push(format!("{what}: cached {cached}, expected {expected}"));
            }
        };

        if self.order != self.wlines.len() || 2 * self.order != self.vertices.len() {
            issues.push(format!(
                "order {} disagrees with {} W-lines and {} vertices",
                self.order,
                self.wlines.len(),
                self.vertices.len()
            ));
        }
        if self.glines.len() != self.vertices.len() {
            issues.push(format!(
                "{} G-lines for {} vertices",
                self.glines.len(),
                self.vertices.len()
            ));
        }

        for (id, v) in self.vertices.iter() {
            for leg in Dir::ALL {
                let g = self.glines.get(v.gline(leg))?;
                // a vertex is the target of its In line and the source of its Out line
                if g.end(leg.flip()) != id {
                    issues.push(format!("{id} leg {leg:?} does not match {}", v.gline(leg)));
                }
            }
            let w = self.wlines.get(v.w)?;
            if w.end(v.dir) != id {
                issues.push(format!("{id} is not the {:?} end of {}", v.dir, v.w));
            }
            if !(0.0..self.beta).contains(&v.tau) {
                issues.push(format!("{id} time {} outside [0, beta)", v.tau));
            }
        }

        for (id, g) in self.glines.iter() {
            let from = self.vertices.get(g.end(Dir::In))?;
            let to = self.vertices.get(g.end(Dir::Out))?;
            if from.spin(Dir::Out) != to.spin(Dir::In) {
                issues.push(format!("{id} joins legs of different spin"));
            }
            if g.is_measure != (self.measure == MeasureLine::G(id)) {
                issues.push(format!("{id} measure flag disagrees with the diagram marker"));
            }
            let expected = self.evaluate_gline(oracle, id, &[], g.is_measure)?;
            compare(format!("{id} weight"), g.weight, expected, &mut issues);
        }

        for (id, w) in self.wlines.iter() {
            if w.is_measure != (self.measure == MeasureLine::W(id)) {
                issues.push(format!("{id} measure flag disagrees with the diagram marker"));
            }
            if w.is_measure && w.is_delta {
                issues.push(format!("{id} is a measured delta line"));
            }
            if w.is_delta {
                let a = self.vertices.get(w.end(Dir::In))?;
                let b = self.vertices.get(w.end(Dir::Out))?;
                if a.tau != b.tau {
                    issues.push(format!("{id} is a delta line with unequal times"));
                }
            }
            let derived = self.touches_worm(id, self.worm.as_ref())?;
            if w.is_worm != derived {
                issues.push(format!("{id} worm flag is {}, expected {derived}", w.is_worm));
            }
            let flags = WFlags {
                is_worm: w.is_worm,
                is_measure: w.is_measure,
                is_delta: w.is_delta,
            };
            let expected = self.evaluate_wline(oracle, id, &[], flags)?;
            compare(format!("{id} weight"), w.weight, expected, &mut issues);
        }

        match self.measure {
            MeasureLine::G(g) if !self.glines.contains(g) => {
                issues.push(format!("measured {g} is not alive"));
            }
            MeasureLine::W(w) if !self.wlines.contains(w) => {
                issues.push(format!("measured {w} is not alive"));
            }
            _ => {}
        }

        for (vertex, imbalance) in self.momentum_imbalance()? {
            issues.push(format!("{vertex} violates momentum conservation by {imbalance}"));
        }

        let loops = self.count_loops()?;
        let expected_sign = if loops % 2 == 0 { 1 } else { -1 };
        if self.sign_fermi_loop != expected_sign {
            issues.push(format!(
                "fermion sign {} but {loops} loops",
                self.sign_fermi_loop
            ));
        }

        let expected = self.recomputed_weight();
        compare("running weight".to_string(), self.weight, expected, &mut issues);
        if expected.norm() > 0.0 {
            let phase = expected / expected.norm();
            compare("running phase".to_string(), self.phase, phase, &mut issues);
        }

        if let Some(worm) = &self.worm {
            if worm.ira == worm.masha {
                issues.push("Ira and Masha coincide".to_string());
            }
            if worm.dspin.abs() != 1 {
                issues.push(format!("worm spin current {} is not +-1", worm.dspin));
            }
            let ira = self.vertices.get(worm.ira)?;
            let masha = self.vertices.get(worm.masha)?;
            let expected = worm_weight.weight(ira.site, masha.site, ira.tau, masha.tau);
            compare(
                "worm weight".to_string(),
                Complex64::from(worm.weight),
                Complex64::from(expected),
                &mut issues,
            );
        }

        Ok(ConsistencyReport {
            passed: issues.is_empty(),
            discrepancy,
            issues,
        })
    }

    /// Vertices whose momentum balance differs from what the worm requires.
    fn momentum_imbalance(&self) -> Result<BTreeMap<VertexId, Momentum>, DmcError> {
        let mut out = BTreeMap::new();
        for (id, v) in self.vertices.iter() {
            let w = self.wlines.get(v.w)?;
            let mut balance = self.glines.get(v.gline(Dir::In))?.k
                - self.glines.get(v.gline(Dir::Out))?.k;
            // W momentum leaves through the In end and arrives at the Out end
            balance -= w.k * v.dir.sign();
            let mut expected = Momentum::ZERO;
            if let Some(worm) = &self.worm {
                if worm.ira == id {
                    expected += worm.k;
                }
                if worm.masha == id {
                    expected -= worm.k;
                }
            }
            if balance != expected {
                out.insert(id, balance - expected);
            }
        }
        Ok(out)
    }
}
