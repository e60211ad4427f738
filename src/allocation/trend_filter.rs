use crate::indicator::rolling::RollingMean;

/// Per-asset price trend filter. A risky asset trading below its trailing
/// simple moving average hands its weight to the cash asset. Assets whose
/// average is still warming up pass.
#[derive(Debug, Clone)]
pub struct TrendFilter {
    averages: Vec<RollingMean>,
    last_prices: Vec<f64>,
    cash_index: usize,
}

impl TrendFilter {
    pub fn new(n_assets: usize, window: usize, cash_index: usize) -> Self {
        Self {
            averages: (0..n_assets).map(|_| RollingMean::new(window)).collect(),
            last_prices: vec![f64::NAN; n_assets],
            cash_index,
        }
    }

    /// Feed one date of prices. Must be called on every date, not only on
    /// rebalance dates.
    pub fn update(&mut self, prices: &[f64]) {
        for ((avg, last), p) in self
            .averages
            .iter_mut()
            .zip(self.last_prices.iter_mut())
            .zip(prices.iter())
        {
            if p.is_finite() {
                avg.push(*p);
                *last = *p;
            }
        }
    }

    pub fn is_below_trend(&self, idx: usize) -> bool {
        match (self.averages.get(idx).and_then(RollingMean::value), self.last_prices.get(idx)) {
            (Some(ma), Some(p)) if p.is_finite() => *p < ma,
            _ => false,
        }
    }

    /// Move filtered weight into cash. Returns the filtered indices.
    pub fn apply(&self, weights: &mut [f64]) -> Vec<usize> {
        let mut filtered = Vec::new();
        let mut recycled = 0.0;
        for (i, w) in weights.iter_mut().enumerate() {
            if i == self.cash_index || *w == 0.0 {
                continue;
            }
            if self.is_below_trend(i) {
                recycled += *w;
                *w = 0.0;
                filtered.push(i);
            }
        }
        if let Some(cash) = weights.get_mut(self.cash_index) {
            *cash += recycled;
        }
        filtered
    }
}
