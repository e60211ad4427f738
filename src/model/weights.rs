use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    pub date: NaiveDate,
    /// Universe-ordered weights. Levered vectors are not renormalized.
    pub weights: Vec<f64>,
}

impl PortfolioWeights {
    pub fn new(date: NaiveDate, weights: Vec<f64>) -> Self {
        Self { date, weights }
    }

    pub fn gross_exposure(&self) -> f64 {
        gross_exposure(&self.weights)
    }

    pub fn net_exposure(&self) -> f64 {
        self.weights.iter().sum()
    }
}

pub fn gross_exposure(weights: &[f64]) -> f64 {
    weights.iter().map(|w| w.abs()).sum()
}

/// Largest absolute per-asset difference between two weight vectors.
/// Vectors of unequal length compare missing entries as 0.
pub fn max_abs_deviation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().max(b.len());
    (0..n)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0.0);
            let y = b.get(i).copied().unwrap_or(0.0);
            (x - y).abs()
        })
        .fold(0.0, f64::max)
}
