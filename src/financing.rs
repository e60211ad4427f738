use crate::config::FinancingConfig;
use crate::model::weights::gross_exposure;

/// Gross exposure funded by borrowing: `max(gross - 1, 0)`.
pub fn borrow_ratio(weights: &[f64]) -> f64 {
    (gross_exposure(weights) - 1.0).max(0.0)
}

/// Per-period financing drag for a weight vector.
pub fn financing_cost(weights: &[f64], periodic_rate: f64) -> f64 {
    borrow_ratio(weights) * periodic_rate
}

/// Gross return less financing, floored at `floor`.
///
/// The floor only keeps compounded equity positive; it is not a loss model.
pub fn net_return(gross_return: f64, weights: &[f64], periodic_rate: f64, floor: f64) -> f64 {
    (gross_return - financing_cost(weights, periodic_rate)).max(floor)
}

/// Financing rate source: fixed annual rate, or the per-date market rate
/// when enabled and present.
#[derive(Debug, Clone, Copy)]
pub struct FinancingModel {
    rate_ann: f64,
    use_market_rate: bool,
    periods_per_year: f64,
    net_return_floor: f64,
}

impl FinancingModel {
    pub fn new(cfg: &FinancingConfig, periods_per_year: f64) -> Self {
        Self {
            rate_ann: cfg.rate_ann,
            use_market_rate: cfg.use_market_rate,
            periods_per_year,
            net_return_floor: cfg.net_return_floor,
        }
    }

    pub fn annual_rate(&self, market_rate_ann: Option<f64>) -> f64 {
        match market_rate_ann {
            Some(r) if self.use_market_rate && r.is_finite() => r,
            _ => self.rate_ann,
        }
    }

    pub fn periodic_rate(&self, market_rate_ann: Option<f64>) -> f64 {
        self.annual_rate(market_rate_ann) / self.periods_per_year
    }

    pub fn cost(&self, weights: &[f64], market_rate_ann: Option<f64>) -> f64 {
        financing_cost(weights, self.periodic_rate(market_rate_ann))
    }

    pub fn net_return(&self, gross_return: f64, weights: &[f64], market_rate_ann: Option<f64>) -> f64 {
        net_return(
            gross_return,
            weights,
            self.periodic_rate(market_rate_ann),
            self.net_return_floor,
        )
    }
}
