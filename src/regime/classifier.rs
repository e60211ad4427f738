use chrono::NaiveDate;

use crate::config::RegimeConfig;
use crate::indicator::hysteresis::StreakCounter;
use crate::model::regime::{Direction, Regime, RegimeSignal, RegimeSource};
use crate::signal::MacroTrends;

/// Sign of a trend with a deadband; inside the band the previous direction
/// persists.
#[derive(Debug, Clone)]
pub struct DirectionTracker {
    deadband: f64,
    current: Direction,
}

impl DirectionTracker {
    pub fn new(deadband: f64) -> Self {
        Self {
            deadband,
            current: Direction::Up,
        }
    }

    pub fn update(&mut self, trend: f64) -> Direction {
        if trend.is_finite() && trend.abs() > self.deadband {
            self.current = if trend > 0.0 {
                Direction::Up
            } else {
                Direction::Down
            };
        }
        self.current
    }

    pub fn current(&self) -> Direction {
        self.current
    }
}

/// Rule-based regime state machine. Directions start `Up` (optimistic prior).
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    cfg: RegimeConfig,
    growth: DirectionTracker,
    inflation: DirectionTracker,
    alert_streak: StreakCounter,
}

impl RegimeClassifier {
    pub fn new(cfg: &RegimeConfig) -> Self {
        Self {
            cfg: *cfg,
            growth: DirectionTracker::new(cfg.direction_deadband),
            inflation: DirectionTracker::new(cfg.direction_deadband),
            alert_streak: StreakCounter::default(),
        }
    }

    pub fn classify(
        &mut self,
        date: NaiveDate,
        trends: &MacroTrends,
        stress_score: f64,
    ) -> RegimeSignal {
        let raw_growth = self.growth.update(trends.growth_trend);
        let raw_inflation = self.inflation.update(trends.inflation_trend);

        let mut inflation = raw_inflation;
        if raw_inflation == Direction::Down
            && trends.inflation_core_level > self.cfg.sticky_inflation_level
        {
            inflation = Direction::Up;
        }

        let mut growth = raw_growth;
        if raw_growth == Direction::Down && trends.growth_level > self.cfg.robust_growth_level {
            growth = Direction::Up;
        }

        // Veto outranks the robust-growth override.
        let streak = self
            .alert_streak
            .update(stress_score <= self.cfg.alert_threshold);
        if streak >= self.cfg.alert_persistence {
            growth = Direction::Down;
        }

        let (regime, source) = if stress_score <= self.cfg.panic_threshold {
            (Regime::Deflation, RegimeSource::MarketCircuit)
        } else {
            (
                Regime::from_directions(growth, inflation),
                RegimeSource::MacroQuadrant,
            )
        };

        RegimeSignal {
            date,
            regime,
            source,
            growth_direction: growth,
            inflation_direction: inflation,
            stress_score,
            growth_trend: trends.growth_trend,
            inflation_trend: trends.inflation_trend,
        }
    }

    pub fn alert_streak(&self) -> usize {
        self.alert_streak.value()
    }
}
