use nalgebra::{DMatrix, DVector};

use super::{AllocationInput, WeightingStrategy};
use crate::config::ErcConfig;
use crate::error::{PipelineError, Result};
use crate::risk::covariance::{check_active_variances, check_covariance, sub_covariance};

const ARMIJO_C: f64 = 1e-4;
const MIN_LINE_STEP: f64 = 1e-12;
const STEP_MIN: f64 = 1e-10;
const STEP_MAX: f64 = 1e10;
/// Projected-gradient norm below which the point is treated as stationary.
const STATIONARY_TOL: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct ErcSolution {
    /// Long-only weights summing to 1, same length as the budget vector.
    pub weights: Vec<f64>,
    pub iterations: usize,
    /// Final objective on the diagonal-scaled covariance.
    pub objective: f64,
}

/// Euclidean projection onto the probability simplex.
pub fn project_simplex(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n == 0 {
        return Vec::new();
    }
    let mut u: Vec<f64> = v.to_vec();
    u.sort_by(|a, b| b.total_cmp(a));
    let mut css = 0.0;
    let mut theta = 0.0;
    for (j, uj) in u.iter().enumerate() {
        css += uj;
        let t = (css - 1.0) / (j as f64 + 1.0);
        if uj - t > 0.0 {
            theta = t;
        }
    }
    v.iter().map(|x| (x - theta).max(0.0)).collect()
}

/// Sum of squared deviations of each risk contribution from its budgeted
/// share of total variance, and its gradient.
fn objective_and_gradient(
    cov: &DMatrix<f64>,
    budgets: &DVector<f64>,
    w: &DVector<f64>,
) -> (f64, DVector<f64>) {
    let s = cov * w;
    let variance = w.dot(&s);
    let err = w.component_mul(&s) - budgets * variance;
    let f = err.norm_squared();
    let eb = err.dot(budgets);
    let cross = cov * err.component_mul(w);
    let grad = (err.component_mul(&s) + cross - &s * (2.0 * eb)) * 2.0;
    (f, grad)
}

fn projected_gradient_norm(w: &DVector<f64>, grad: &DVector<f64>) -> f64 {
    let trial: Vec<f64> = w.iter().zip(grad.iter()).map(|(x, g)| x - g).collect();
    project_simplex(&trial)
        .iter()
        .zip(w.iter())
        .map(|(p, x)| (p - x).abs())
        .fold(0.0, f64::max)
}

fn starting_point(
    budgets: &DVector<f64>,
    cov: &DMatrix<f64>,
    warm: Option<&[f64]>,
) -> DVector<f64> {
    let n = budgets.len();
    if let Some(ws) = warm {
        if ws.len() == n && ws.iter().all(|x| x.is_finite()) {
            let projected = project_simplex(ws);
            if projected.iter().sum::<f64>() > 0.0 {
                return DVector::from_vec(projected);
            }
        }
    }
    // Cold start from budget-weighted inverse vol.
    let raw: Vec<f64> = (0..n)
        .map(|i| budgets[i] / cov[(i, i)].max(1e-12).sqrt())
        .collect();
    let total: f64 = raw.iter().sum();
    DVector::from_vec(raw.iter().map(|r| r / total).collect())
}

/// Risk-budgeting solve on the simplex, generalizing equal risk contribution
/// to arbitrary positive budgets (equal budgets give plain ERC).
///
/// Minimizes `Σ_i (w_i (Σw)_i - b_i w'Σw)^2` over `w >= 0, Σw = 1` where `b`
/// are the budgets normalized over assets with a positive budget; assets
/// with a zero budget are held at 0. Uses spectral projected gradient
/// (Barzilai-Borwein steps, Armijo backtracking). `warm_start` is the
/// previous solution, restricted to the active assets.
pub fn solve_erc(
    cov: &DMatrix<f64>,
    budgets: &[f64],
    warm_start: Option<&[f64]>,
    cfg: &ErcConfig,
) -> Result<ErcSolution> {
    let n = budgets.len();
    check_covariance(cov, n)?;
    let active: Vec<usize> = (0..n).filter(|&i| budgets[i] > 0.0).collect();
    if active.is_empty() {
        return Err(PipelineError::Config(
            "risk budgeting needs at least one positive budget".to_string(),
        ));
    }
    check_active_variances(cov, &active)?;
    let mut full = vec![0.0; n];
    if active.len() == 1 {
        full[active[0]] = 1.0;
        return Ok(ErcSolution {
            weights: full,
            iterations: 0,
            objective: 0.0,
        });
    }

    let sub = sub_covariance(cov, &active);
    let scale = sub.diagonal().mean();
    let budget_total: f64 = active.iter().map(|&i| budgets[i]).sum();
    let b = DVector::from_iterator(active.len(), active.iter().map(|&i| budgets[i] / budget_total));
    let sigma = sub / scale;

    let warm_sub: Option<Vec<f64>> =
        warm_start.map(|ws| active.iter().map(|&i| ws.get(i).copied().unwrap_or(0.0)).collect());
    let mut w = starting_point(&b, &sigma, warm_sub.as_deref());
    let (mut f, mut grad) = objective_and_gradient(&sigma, &b, &w);
    let mut step = 1.0 / projected_gradient_norm(&w, &grad).max(STEP_MIN);
    step = step.clamp(STEP_MIN, STEP_MAX);

    let mut converged = false;
    let mut iterations = 0;
    while iterations < cfg.max_iterations {
        if f <= cfg.tolerance || projected_gradient_norm(&w, &grad) <= STATIONARY_TOL {
            converged = true;
            break;
        }
        iterations += 1;

        let trial: Vec<f64> = w.iter().zip(grad.iter()).map(|(x, g)| x - step * g).collect();
        let direction = DVector::from_vec(project_simplex(&trial)) - &w;
        let slope = grad.dot(&direction);
        if slope >= 0.0 {
            // No descent left along the projected arc.
            converged = f <= cfg.tolerance * 1e3;
            break;
        }

        let mut lambda = 1.0;
        let (next_w, next_f, next_grad) = loop {
            let candidate = &w + &direction * lambda;
            let (cf, cg) = objective_and_gradient(&sigma, &b, &candidate);
            if cf <= f + ARMIJO_C * lambda * slope {
                break (candidate, cf, cg);
            }
            lambda *= 0.5;
            if lambda < MIN_LINE_STEP {
                return Err(PipelineError::NotConverged {
                    iterations,
                    objective: f,
                });
            }
        };

        let s_k = &next_w - &w;
        let y_k = &next_grad - &grad;
        let sy = s_k.dot(&y_k);
        step = if sy > 0.0 {
            (s_k.norm_squared() / sy).clamp(STEP_MIN, STEP_MAX)
        } else {
            STEP_MAX
        };
        w = next_w;
        f = next_f;
        grad = next_grad;
    }

    if !converged {
        return Err(PipelineError::NotConverged {
            iterations,
            objective: f,
        });
    }

    // Clean up round-off so the result sits exactly on the simplex.
    let cleaned = project_simplex(w.as_slice());
    for (k, &i) in active.iter().enumerate() {
        full[i] = cleaned[k];
    }
    Ok(ErcSolution {
        weights: full,
        iterations,
        objective: f,
    })
}

/// Risk contributions `w_i (Σw)_i` for a weight vector.
pub fn risk_contributions(cov: &DMatrix<f64>, weights: &[f64]) -> Vec<f64> {
    let w = DVector::from_column_slice(weights);
    let s = cov * &w;
    w.component_mul(&s).iter().copied().collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ErcStrategy {
    pub cfg: ErcConfig,
}

impl WeightingStrategy for ErcStrategy {
    fn name(&self) -> &'static str {
        "erc"
    }

    fn weights(&self, input: &AllocationInput<'_>) -> Result<Vec<f64>> {
        let n = input.budget.budgets.len();
        if input.budget.is_all_cash() {
            let mut w = vec![0.0; n];
            w[input.cash_index] = 1.0;
            return Ok(w);
        }
        let mut budgets = input.budget.budgets.clone();
        budgets[input.cash_index] = 0.0;
        let solution = solve_erc(input.covariance, &budgets, input.warm_start, &self.cfg)?;
        tracing::debug!(
            iterations = solution.iterations,
            objective = solution.objective,
            "Risk budgeting solve converged"
        );
        let share = input.budget.risky_share();
        let mut weights: Vec<f64> = solution.weights.iter().map(|w| w * share).collect();
        weights[input.cash_index] += 1.0 - share;
        Ok(weights)
    }
}
