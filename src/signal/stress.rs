use serde::Serialize;

use crate::config::StressConfig;
use crate::indicator::hysteresis::{HysteresisFlag, PersistenceFlag};
use crate::model::market::StressIndicators;

/// Per-date flag breakdown behind a stress score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StressBreakdown {
    pub vix_flags: u32,
    pub credit_flags: u32,
    pub curve_flag: bool,
}

impl StressBreakdown {
    /// Each active flag subtracts exactly one point.
    pub fn score(&self) -> f64 {
        -((self.vix_flags + self.credit_flags + u32::from(self.curve_flag)) as f64)
    }
}

/// Tiered hysteresis scorer over VIX, credit spread and curve slope.
#[derive(Debug, Clone)]
pub struct StressScorer {
    vix: Vec<HysteresisFlag>,
    credit: Vec<HysteresisFlag>,
    curve: PersistenceFlag,
}

impl StressScorer {
    pub fn new(cfg: &StressConfig) -> Self {
        Self {
            vix: cfg.vix_tiers.iter().copied().map(HysteresisFlag::new).collect(),
            credit: cfg
                .credit_tiers
                .iter()
                .copied()
                .map(HysteresisFlag::new)
                .collect(),
            curve: PersistenceFlag::new(
                cfg.curve.invert_threshold,
                cfg.curve.exit_threshold,
                cfg.curve.persistence,
            ),
        }
    }

    pub fn update(&mut self, ind: &StressIndicators) -> StressBreakdown {
        let vix_flags = self
            .vix
            .iter_mut()
            .map(|f| u32::from(f.update(ind.vix)))
            .sum();
        let credit_flags = self
            .credit
            .iter_mut()
            .map(|f| u32::from(f.update(ind.credit_spread)))
            .sum();
        let curve_flag = self.curve.update(ind.curve_slope);
        StressBreakdown {
            vix_flags,
            credit_flags,
            curve_flag,
        }
    }

    /// Lowest score this scorer can produce.
    pub fn min_score(&self) -> f64 {
        -((self.vix.len() + self.credit.len() + 1) as f64)
    }
}
