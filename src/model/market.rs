use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Macro levels as published, already forward-filled onto the trading day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroLevels {
    pub growth: f64,
    pub inflation_core: f64,
    /// Headline inflation is optional; without it the inflation trend is
    /// driven by the core series alone.
    #[serde(default)]
    pub inflation_headline: Option<f64>,
}

/// Market stress indicators. `None` means "not observed"; the scorer holds the
/// previous flag state for that indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StressIndicators {
    #[serde(default)]
    pub vix: Option<f64>,
    #[serde(default)]
    pub credit_spread: Option<f64>,
    #[serde(default)]
    pub curve_slope: Option<f64>,
}

/// One row of aligned market state. Immutable input supplied by the data
/// alignment layer; `prices` follows universe order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub date: NaiveDate,
    pub macro_levels: MacroLevels,
    #[serde(default)]
    pub indicators: StressIndicators,
    pub prices: Vec<f64>,
    /// Annualized borrowing rate observed on this date, if the feed carries one.
    #[serde(default)]
    pub financing_rate_ann: Option<f64>,
}

/// Per-asset simple returns. Non-positive or non-finite previous prices
/// yield a zero return for that asset.
pub fn simple_returns(prices: &[f64], prev: &[f64]) -> Vec<f64> {
    prices
        .iter()
        .zip(prev.iter())
        .map(|(p, q)| {
            if *q > 0.0 && q.is_finite() && p.is_finite() {
                p / q - 1.0
            } else {
                0.0
            }
        })
        .collect()
}
