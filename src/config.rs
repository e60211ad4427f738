use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::indicator::hysteresis::HysteresisBand;
use crate::model::regime::{Regime, RegimeSource, REACHABLE_KEYS};
use crate::model::universe::AssetUniverse;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "MACRO_REGIME_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub universe: UniverseConfig,
    pub trend: TrendConfig,
    pub stress: StressConfig,
    pub regime: RegimeConfig,
    pub budgets: Vec<BudgetEntryConfig>,
    pub allocator: AllocatorConfig,
    pub risk: RiskConfig,
    pub leverage: LeverageConfig,
    pub financing: FinancingConfig,
    pub rebalance: RebalanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    pub risky: Vec<String>,
    pub cash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub short_weight: f64,
    pub long_weight: f64,
    pub inflation_core_weight: f64,
    pub inflation_headline_weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub vix_tiers: Vec<HysteresisBand>,
    pub credit_tiers: Vec<HysteresisBand>,
    pub curve: CurveConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Slope strictly below this counts as inverted.
    pub invert_threshold: f64,
    /// Armed flag clears once the slope rises above this.
    pub exit_threshold: f64,
    pub persistence: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Minimum |trend| (z units) needed to flip a direction.
    pub direction_deadband: f64,
    pub sticky_inflation_level: f64,
    pub robust_growth_level: f64,
    pub alert_threshold: f64,
    pub alert_persistence: usize,
    pub panic_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetEntryConfig {
    pub regime: Regime,
    pub source: RegimeSource,
    #[serde(default)]
    pub cash_floor: f64,
    #[serde(default)]
    pub risk: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMethod {
    InverseVol,
    Erc,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    pub method: WeightingMethod,
    /// Trailing SMA window for the price trend filter; `None` disables it.
    pub trend_filter_window: Option<usize>,
    /// Per-asset annualized vol floor used by the inverse-vol weighting.
    pub min_asset_vol: f64,
    pub erc: ErcConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ErcConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub lookback: usize,
    pub periods_per_year: f64,
    pub vol_floor_ann: f64,
    pub vol_cap_ann: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeverageConfig {
    pub enabled: bool,
    pub target_vol_ann: f64,
    pub floor: f64,
    pub cap: f64,
    pub gross_exposure_cap: f64,
    pub regime_caps: Vec<RegimeCapConfig>,
    pub overrides: Vec<OverrideConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegimeCapConfig {
    pub regime: Regime,
    pub cap: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideConfig {
    pub regime: Regime,
    /// Restrict the override to one source tag; `None` matches both.
    #[serde(default)]
    pub source: Option<RegimeSource>,
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FinancingConfig {
    pub rate_ann: f64,
    pub use_market_rate: bool,
    pub net_return_floor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    pub frequency: RebalanceFrequency,
    /// Maximum absolute per-asset weight deviation tolerated without trading.
    pub deadband_abs: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            risky: [
                "SPY", "EFA", "EEM", "IWM", "TLT", "IEF", "LQD", "TIP", "DBC", "GLD",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cash: "SGOV".to_string(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short_window: 90,
            long_window: 252,
            short_weight: 0.4,
            long_weight: 0.6,
            inflation_core_weight: 0.7,
            inflation_headline_weight: 0.3,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            vix_tiers: vec![HysteresisBand::new(25.0, 22.0), HysteresisBand::new(35.0, 32.0)],
            credit_tiers: vec![HysteresisBand::new(2.5, 2.2), HysteresisBand::new(4.0, 3.7)],
            curve: CurveConfig::default(),
        }
    }
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            invert_threshold: 0.0,
            exit_threshold: 0.0,
            persistence: 20,
        }
    }
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            direction_deadband: 0.2,
            sticky_inflation_level: 3.0,
            robust_growth_level: 1.5,
            alert_threshold: -1.0,
            alert_persistence: 5,
            panic_threshold: -2.0,
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            method: WeightingMethod::Erc,
            trend_filter_window: None,
            min_asset_vol: 0.001,
            erc: ErcConfig::default(),
        }
    }
}

impl Default for ErcConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-10,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            lookback: 252,
            periods_per_year: 252.0,
            vol_floor_ann: 0.005,
            vol_cap_ann: 1.0,
        }
    }
}

impl Default for LeverageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_vol_ann: 0.10,
            floor: 0.0,
            cap: 2.0,
            gross_exposure_cap: 3.0,
            regime_caps: Vec::new(),
            overrides: vec![OverrideConfig {
                regime: Regime::Deflation,
                source: None,
                weights: BTreeMap::from([("SGOV".to_string(), 0.7), ("GLD".to_string(), 0.3)]),
            }],
        }
    }
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            rate_ann: 0.0,
            use_market_rate: false,
            net_return_floor: -0.95,
        }
    }
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            frequency: RebalanceFrequency::Monthly,
            deadband_abs: 0.02,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            trend: TrendConfig::default(),
            stress: StressConfig::default(),
            regime: RegimeConfig::default(),
            budgets: default_budgets(),
            allocator: AllocatorConfig::default(),
            risk: RiskConfig::default(),
            leverage: LeverageConfig::default(),
            financing: FinancingConfig::default(),
            rebalance: RebalanceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn budget(
    regime: Regime,
    source: RegimeSource,
    cash_floor: f64,
    risk: &[(&str, f64)],
) -> BudgetEntryConfig {
    BudgetEntryConfig {
        regime,
        source,
        cash_floor,
        risk: risk.iter().map(|(s, b)| (s.to_string(), *b)).collect(),
    }
}

/// Risk budgets for the default ten-asset universe.
pub fn default_budgets() -> Vec<BudgetEntryConfig> {
    use Regime::*;
    use RegimeSource::*;
    vec![
        budget(
            Goldilocks,
            MacroQuadrant,
            0.0,
            &[
                ("SPY", 4.0),
                ("EFA", 1.5),
                ("EEM", 1.0),
                ("IWM", 1.0),
                ("LQD", 2.0),
                ("IEF", 1.0),
            ],
        ),
        budget(
            Reflation,
            MacroQuadrant,
            0.0,
            &[
                ("SPY", 2.0),
                ("EEM", 1.0),
                ("DBC", 3.0),
                ("TIP", 2.0),
                ("GLD", 0.5),
                ("IWM", 1.0),
                ("EFA", 0.5),
            ],
        ),
        budget(
            Stagflation,
            MacroQuadrant,
            0.20,
            &[("GLD", 6.0), ("DBC", 4.0), ("TIP", 3.0), ("IEF", 0.5)],
        ),
        budget(
            Deflation,
            MacroQuadrant,
            0.0,
            &[("TLT", 8.0), ("IEF", 2.0), ("GLD", 1.5)],
        ),
        budget(Deflation, MarketCircuit, 1.0, &[]),
    ]
}

fn config_err(msg: impl Into<String>) -> PipelineError {
    PipelineError::Config(msg.into())
}

fn check_symbol(universe: &AssetUniverse, symbol: &str, context: &str) -> Result<()> {
    if universe.index_of(symbol).is_none() {
        return Err(config_err(format!(
            "{}: symbol '{}' is not in the universe",
            context, symbol
        )));
    }
    Ok(())
}

impl Config {
    /// Load from `$MACRO_REGIME_CONFIG` or `config/default.toml`.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate. Sections that are left out take their defaults;
    /// a config that lists no `[[budgets]]` gets the default table.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;
        if config.budgets.is_empty() {
            config.budgets = default_budgets();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn asset_universe(&self) -> Result<AssetUniverse> {
        let risky: Vec<&str> = self.universe.risky.iter().map(String::as_str).collect();
        AssetUniverse::new(&risky, &self.universe.cash)
    }

    /// Reject inconsistent shapes up front so nothing degrades into NaN
    /// mid-series.
    pub fn validate(&self) -> Result<()> {
        let universe = self.asset_universe()?;

        let t = &self.trend;
        if t.short_window < 2 || t.long_window < 2 {
            return Err(config_err("trend windows must be >= 2"));
        }
        if t.short_window > t.long_window {
            return Err(config_err("trend.short_window must not exceed long_window"));
        }
        if (t.short_weight + t.long_weight - 1.0).abs() > 1e-9
            || t.short_weight < 0.0
            || t.long_weight < 0.0
        {
            return Err(config_err("trend weights must be non-negative and sum to 1"));
        }
        if (t.inflation_core_weight + t.inflation_headline_weight - 1.0).abs() > 1e-9
            || t.inflation_core_weight < 0.0
            || t.inflation_headline_weight < 0.0
        {
            return Err(config_err(
                "inflation blend weights must be non-negative and sum to 1",
            ));
        }

        for band in self.stress.vix_tiers.iter().chain(self.stress.credit_tiers.iter()) {
            if !band.is_valid() {
                return Err(config_err(format!(
                    "stress tier exit {} must be strictly below enter {}",
                    band.exit, band.enter
                )));
            }
        }
        let curve = &self.stress.curve;
        if curve.persistence == 0 {
            return Err(config_err("stress.curve.persistence must be > 0"));
        }
        if curve.exit_threshold < curve.invert_threshold {
            return Err(config_err(
                "stress.curve.exit_threshold must be >= invert_threshold",
            ));
        }

        let r = &self.regime;
        if r.direction_deadband < 0.0 {
            return Err(config_err("regime.direction_deadband must be >= 0"));
        }
        if r.alert_persistence == 0 {
            return Err(config_err("regime.alert_persistence must be > 0"));
        }
        if r.panic_threshold > r.alert_threshold {
            return Err(config_err(
                "regime.panic_threshold must not be above alert_threshold",
            ));
        }

        for entry in &self.budgets {
            let ctx = format!("budget ({}, {})", entry.regime, entry.source.as_str());
            if !(0.0..=1.0).contains(&entry.cash_floor) {
                return Err(config_err(format!("{}: cash_floor must be in [0, 1]", ctx)));
            }
            for (symbol, b) in &entry.risk {
                check_symbol(&universe, symbol, &ctx)?;
                if universe.index_of(symbol) == Some(universe.cash_index()) {
                    return Err(config_err(format!(
                        "{}: cash asset takes its weight from cash_floor, not a risk budget",
                        ctx
                    )));
                }
                if !b.is_finite() || *b < 0.0 {
                    return Err(config_err(format!(
                        "{}: budget for '{}' must be finite and >= 0",
                        ctx, symbol
                    )));
                }
            }
            if entry.cash_floor < 1.0 && entry.risk.values().all(|b| *b <= 0.0) {
                return Err(config_err(format!(
                    "{}: no positive risk budget for the non-cash share",
                    ctx
                )));
            }
        }
        for (regime, source) in REACHABLE_KEYS {
            let n = self
                .budgets
                .iter()
                .filter(|e| e.regime == regime && e.source == source)
                .count();
            if n != 1 {
                return Err(config_err(format!(
                    "budget table needs exactly one entry for ({}, {}), found {}",
                    regime,
                    source.as_str(),
                    n
                )));
            }
        }

        let a = &self.allocator;
        if let Some(w) = a.trend_filter_window {
            if w == 0 {
                return Err(config_err("allocator.trend_filter_window must be > 0"));
            }
        }
        if a.min_asset_vol <= 0.0 {
            return Err(config_err("allocator.min_asset_vol must be > 0"));
        }
        if a.erc.max_iterations == 0 || a.erc.tolerance <= 0.0 {
            return Err(config_err(
                "allocator.erc needs max_iterations > 0 and tolerance > 0",
            ));
        }

        let k = &self.risk;
        if k.lookback < 2 {
            return Err(config_err("risk.lookback must be >= 2"));
        }
        if k.periods_per_year <= 0.0 {
            return Err(config_err("risk.periods_per_year must be > 0"));
        }
        if k.vol_floor_ann <= 0.0 || k.vol_cap_ann < k.vol_floor_ann {
            return Err(config_err(
                "risk needs 0 < vol_floor_ann <= vol_cap_ann",
            ));
        }

        let l = &self.leverage;
        if l.target_vol_ann <= 0.0 {
            return Err(config_err("leverage.target_vol_ann must be > 0"));
        }
        if l.floor < 0.0 || l.cap < l.floor {
            return Err(config_err("leverage needs 0 <= floor <= cap"));
        }
        if l.gross_exposure_cap <= 0.0 {
            return Err(config_err("leverage.gross_exposure_cap must be > 0"));
        }
        for rc in &l.regime_caps {
            if rc.cap < 0.0 {
                return Err(config_err(format!(
                    "leverage cap for regime {} must be >= 0",
                    rc.regime
                )));
            }
        }
        for ov in &l.overrides {
            let ctx = format!("override for regime {}", ov.regime);
            let mut total = 0.0;
            for (symbol, w) in &ov.weights {
                check_symbol(&universe, symbol, &ctx)?;
                if !w.is_finite() || *w < 0.0 {
                    return Err(config_err(format!("{}: weights must be >= 0", ctx)));
                }
                total += w;
            }
            if (total - 1.0).abs() > 1e-6 {
                return Err(config_err(format!(
                    "{}: weights sum to {}, expected 1",
                    ctx, total
                )));
            }
        }

        if self.financing.net_return_floor > 0.0 || self.financing.net_return_floor <= -1.0 {
            return Err(config_err("financing.net_return_floor must be in (-1, 0]"));
        }
        if self.rebalance.deadband_abs < 0.0 {
            return Err(config_err("rebalance.deadband_abs must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_document_takes_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.trend.short_window, 90);
        assert_eq!(config.budgets.len(), 5);
        assert_eq!(config.rebalance.frequency, RebalanceFrequency::Monthly);
    }

    #[test]
    fn inverted_tier_is_rejected() {
        let mut config = Config::default();
        config.stress.vix_tiers[0] = HysteresisBand::new(20.0, 22.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_budget_key_is_rejected() {
        let mut config = Config::default();
        config
            .budgets
            .retain(|e| e.source != RegimeSource::MarketCircuit);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("MARKET_CIRCUIT"));
    }
}
