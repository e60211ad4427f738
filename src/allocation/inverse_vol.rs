use super::{AllocationInput, WeightingStrategy};
use crate::allocation::budget::RiskBudget;
use crate::error::Result;
use crate::risk::covariance::check_active_variances;

/// Closed-form budget-weighted inverse volatility:
/// `w_i ∝ budget_i / max(vol_i, min_vol)`, scaled so risky weights sum to
/// `1 - cash_floor`, with the cash floor placed on `cash_index`.
///
/// Falls back to all cash when no asset carries a positive budget.
pub fn inverse_vol_weights(
    budget: &RiskBudget,
    vols: &[f64],
    cash_index: usize,
    min_vol: f64,
) -> Vec<f64> {
    let n = budget.budgets.len();
    let mut weights = vec![0.0; n];
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            let b = budget.budgets[i];
            if i == cash_index || b <= 0.0 {
                return 0.0;
            }
            let vol = vols.get(i).copied().unwrap_or(f64::NAN).max(min_vol);
            b / vol
        })
        .collect();
    let total: f64 = raw.iter().sum();
    if budget.is_all_cash() || !(total.is_finite() && total > 0.0) {
        weights[cash_index] = 1.0;
        return weights;
    }
    let share = budget.risky_share();
    for (w, r) in weights.iter_mut().zip(raw.iter()) {
        *w = r / total * share;
    }
    weights[cash_index] += 1.0 - share;
    weights
}

#[derive(Debug, Clone, Copy)]
pub struct InverseVolStrategy {
    pub min_asset_vol: f64,
}

impl WeightingStrategy for InverseVolStrategy {
    fn name(&self) -> &'static str {
        "inverse_vol"
    }

    fn weights(&self, input: &AllocationInput<'_>) -> Result<Vec<f64>> {
        let active: Vec<usize> = input
            .budget
            .active_indices()
            .into_iter()
            .filter(|&i| i != input.cash_index)
            .collect();
        check_active_variances(input.covariance, &active)?;
        let vols = input.asset_vols();
        Ok(inverse_vol_weights(
            input.budget,
            &vols,
            input.cash_index,
            self.min_asset_vol,
        ))
    }
}
