use crate::config::TrendConfig;
use crate::indicator::rolling::RollingStats;
use crate::model::market::MacroLevels;

/// Dual-horizon z-score trend of one macro level series.
#[derive(Debug, Clone)]
pub struct TrendNormalizer {
    short: RollingStats,
    long: RollingStats,
    short_weight: f64,
    long_weight: f64,
    last_level: Option<f64>,
}

impl TrendNormalizer {
    pub fn new(cfg: &TrendConfig) -> Self {
        Self {
            short: RollingStats::new(cfg.short_window),
            long: RollingStats::new(cfg.long_window),
            short_weight: cfg.short_weight,
            long_weight: cfg.long_weight,
            last_level: None,
        }
    }

    /// Push one level and return the blended trend. Cold start yields 0.
    /// Non-finite levels are skipped and the trend is computed against the
    /// last good level.
    pub fn push(&mut self, level: f64) -> f64 {
        if level.is_finite() {
            self.short.push(level);
            self.long.push(level);
            self.last_level = Some(level);
        }
        self.value()
    }

    pub fn value(&self) -> f64 {
        let Some(level) = self.last_level else {
            return 0.0;
        };
        self.short_weight * self.short.z_score(level) + self.long_weight * self.long.z_score(level)
    }

    pub fn last_level(&self) -> Option<f64> {
        self.last_level
    }
}

/// Per-date output of [`SignalNormalizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroTrends {
    pub growth_trend: f64,
    pub inflation_trend: f64,
    /// Raw levels passed through for the override rules.
    pub growth_level: f64,
    pub inflation_core_level: f64,
}

/// Growth trend plus a core/headline blended inflation trend.
#[derive(Debug, Clone)]
pub struct SignalNormalizer {
    growth: TrendNormalizer,
    inflation_core: TrendNormalizer,
    inflation_headline: TrendNormalizer,
    core_weight: f64,
    headline_weight: f64,
}

impl SignalNormalizer {
    pub fn new(cfg: &TrendConfig) -> Self {
        Self {
            growth: TrendNormalizer::new(cfg),
            inflation_core: TrendNormalizer::new(cfg),
            inflation_headline: TrendNormalizer::new(cfg),
            core_weight: cfg.inflation_core_weight,
            headline_weight: cfg.inflation_headline_weight,
        }
    }

    pub fn update(&mut self, levels: &MacroLevels) -> MacroTrends {
        let growth_trend = self.growth.push(levels.growth);
        let core_trend = self.inflation_core.push(levels.inflation_core);
        let inflation_trend = match levels.inflation_headline {
            Some(head) => {
                let head_trend = self.inflation_headline.push(head);
                self.core_weight * core_trend + self.headline_weight * head_trend
            }
            None if self.inflation_headline.last_level().is_some() => {
                self.core_weight * core_trend
                    + self.headline_weight * self.inflation_headline.value()
            }
            None => core_trend,
        };

        MacroTrends {
            growth_trend,
            inflation_trend,
            growth_level: self.growth.last_level().unwrap_or(0.0),
            inflation_core_level: self.inflation_core.last_level().unwrap_or(0.0),
        }
    }
}
