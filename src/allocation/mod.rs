pub mod budget;
pub mod erc;
pub mod inverse_vol;
pub mod trend_filter;

use nalgebra::DMatrix;

use crate::config::{AllocatorConfig, WeightingMethod};
use crate::error::Result;

pub use budget::{RiskBudget, RiskBudgetTable};
pub use erc::{project_simplex, risk_contributions, solve_erc, ErcSolution, ErcStrategy};
pub use inverse_vol::{inverse_vol_weights, InverseVolStrategy};
pub use trend_filter::TrendFilter;

/// Everything a weighting method may read on a rebalance date.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    pub budget: &'a RiskBudget,
    /// Per-period sample covariance over the full universe.
    pub covariance: &'a DMatrix<f64>,
    pub cash_index: usize,
    pub periods_per_year: f64,
    /// Last successful solution, universe-ordered and unlevered.
    pub warm_start: Option<&'a [f64]>,
}

impl AllocationInput<'_> {
    /// Annualized per-asset vols from the covariance diagonal.
    pub fn asset_vols(&self) -> Vec<f64> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| (v.max(0.0) * self.periods_per_year).sqrt())
            .collect()
    }
}

/// Budget-to-weights conversion. Returned weights are unlevered, long-only
/// and sum to 1 including the cash slot.
pub trait WeightingStrategy: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn weights(&self, input: &AllocationInput<'_>) -> Result<Vec<f64>>;
}

pub fn strategy_for(cfg: &AllocatorConfig) -> Box<dyn WeightingStrategy> {
    match cfg.method {
        WeightingMethod::InverseVol => Box::new(InverseVolStrategy {
            min_asset_vol: cfg.min_asset_vol,
        }),
        WeightingMethod::Erc => Box::new(ErcStrategy { cfg: cfg.erc }),
    }
}
