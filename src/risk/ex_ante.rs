use nalgebra::{DMatrix, DVector};

use crate::config::RiskConfig;
use crate::error::{PipelineError, Result};

/// Annualized ex-ante portfolio volatility, clamped to `[vol_floor, vol_cap]`.
#[derive(Debug, Clone, Copy)]
pub struct ExAnteRisk {
    periods_per_year: f64,
    vol_floor: f64,
    vol_cap: f64,
}

impl ExAnteRisk {
    pub fn new(cfg: &RiskConfig) -> Self {
        Self {
            periods_per_year: cfg.periods_per_year,
            vol_floor: cfg.vol_floor_ann,
            vol_cap: cfg.vol_cap_ann,
        }
    }

    /// Unclamped annualized vol `sqrt(w' * cov * w * periods_per_year)`.
    pub fn raw_vol(&self, weights: &[f64], cov: &DMatrix<f64>) -> Result<f64> {
        let n = weights.len();
        if cov.nrows() != n || cov.ncols() != n {
            return Err(PipelineError::Dimension {
                expected: n,
                actual: cov.nrows(),
            });
        }
        let w = DVector::from_column_slice(weights);
        let variance = w.dot(&(cov * &w));
        if !variance.is_finite() {
            return Err(PipelineError::CovarianceUnavailable(
                "non-finite portfolio variance".to_string(),
            ));
        }
        // Tiny negative values come from round-off on near-singular inputs.
        Ok((variance.max(0.0) * self.periods_per_year).sqrt())
    }

    /// Clamped vol. Cash-only books land on the floor, which keeps the
    /// leverage ratio finite.
    pub fn portfolio_vol(&self, weights: &[f64], cov: &DMatrix<f64>) -> Result<f64> {
        let raw = self.raw_vol(weights, cov)?;
        Ok(raw.clamp(self.vol_floor, self.vol_cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk() -> ExAnteRisk {
        ExAnteRisk::new(&RiskConfig {
            lookback: 20,
            periods_per_year: 252.0,
            vol_floor_ann: 0.005,
            vol_cap_ann: 1.0,
        })
    }

    #[test]
    fn diagonal_case_matches_closed_form() {
        let daily_var = 0.01f64.powi(2);
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![daily_var, daily_var]));
        let vol = risk().portfolio_vol(&[0.5, 0.5], &cov).unwrap();
        let expected = (0.5 * daily_var * 252.0).sqrt();
        assert!((vol - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_exposure_hits_floor() {
        let cov = DMatrix::from_element(2, 2, 1e-4);
        let vol = risk().portfolio_vol(&[0.0, 0.0], &cov).unwrap();
        assert!((vol - 0.005).abs() < 1e-15);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let cov = DMatrix::from_element(3, 3, 1e-4);
        assert!(risk().raw_vol(&[0.5, 0.5], &cov).is_err());
    }
}
