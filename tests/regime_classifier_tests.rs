use chrono::NaiveDate;
use proptest::prelude::*;

use macro_regime_alloc::config::RegimeConfig;
use macro_regime_alloc::model::regime::{Direction, Regime, RegimeSource};
use macro_regime_alloc::regime::{DirectionTracker, RegimeClassifier};
use macro_regime_alloc::signal::MacroTrends;

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(n))
}

fn trends(growth: f64, inflation: f64) -> MacroTrends {
    MacroTrends {
        growth_trend: growth,
        inflation_trend: inflation,
        growth_level: 1.0,
        inflation_core_level: 2.0,
    }
}

#[test]
/// Verifies the optimistic prior: both directions start up, so a neutral
/// first date maps to regime 2.
fn neutral_start_is_growth_up_inflation_up() {
    let mut c = RegimeClassifier::new(&RegimeConfig::default());
    let s = c.classify(day(0), &trends(0.0, 0.0), 0.0);
    assert_eq!(s.growth_direction, Direction::Up);
    assert_eq!(s.inflation_direction, Direction::Up);
    assert_eq!(s.regime, Regime::Reflation);
    assert_eq!(s.source, RegimeSource::MacroQuadrant);
}

#[test]
/// Verifies the quadrant lookup for all four direction pairs.
fn quadrant_mapping() {
    let cases = [
        (1.0, -1.0, Regime::Goldilocks),
        (1.0, 1.0, Regime::Reflation),
        (-1.0, 1.0, Regime::Stagflation),
        (-1.0, -1.0, Regime::Deflation),
    ];
    for (g, i, expected) in cases {
        let mut c = RegimeClassifier::new(&RegimeConfig::default());
        let s = c.classify(day(0), &trends(g, i), 0.0);
        assert_eq!(s.regime, expected, "g={} i={}", g, i);
        assert_eq!(s.regime.code(), expected.code());
    }
}

#[test]
/// Verifies the deadband: small trends inside the band keep the last direction.
fn deadband_holds_previous_direction() {
    let mut tracker = DirectionTracker::new(0.2);
    assert_eq!(tracker.update(-0.5), Direction::Down);
    assert_eq!(tracker.update(0.15), Direction::Down);
    assert_eq!(tracker.update(-0.19), Direction::Down);
    assert_eq!(tracker.update(0.2), Direction::Down);
    assert_eq!(tracker.update(0.21), Direction::Up);
    assert_eq!(tracker.update(f64::NAN), Direction::Up);
}

#[test]
/// Verifies sticky inflation: a falling trend from a high core level stays up.
fn sticky_inflation_forces_up() {
    let mut c = RegimeClassifier::new(&RegimeConfig::default());
    let mut t = trends(1.0, -1.0);
    t.inflation_core_level = 3.5;
    let s = c.classify(day(0), &t, 0.0);
    assert_eq!(s.inflation_direction, Direction::Up);
    assert_eq!(s.regime, Regime::Reflation);
}

#[test]
/// Verifies robust growth: a falling trend from a strong level stays up.
fn robust_growth_forces_up() {
    let mut c = RegimeClassifier::new(&RegimeConfig::default());
    let mut t = trends(-1.0, -1.0);
    t.growth_level = 2.0;
    let s = c.classify(day(0), &t, 0.0);
    assert_eq!(s.growth_direction, Direction::Up);
    assert_eq!(s.regime, Regime::Goldilocks);
}

#[test]
/// Verifies the veto needs persistence and then beats robust growth.
fn growth_veto_after_alert_persistence() {
    let cfg = RegimeConfig::default();
    let mut c = RegimeClassifier::new(&cfg);
    let mut t = trends(1.0, -1.0);
    t.growth_level = 2.0;
    for n in 0..(cfg.alert_persistence as u32 - 1) {
        let s = c.classify(day(n), &t, -1.0);
        assert_eq!(s.growth_direction, Direction::Up, "day {}", n);
    }
    let s = c.classify(day(10), &t, -1.0);
    assert_eq!(s.growth_direction, Direction::Down);
    assert_eq!(s.regime, Regime::Deflation);
    assert_eq!(s.source, RegimeSource::MacroQuadrant);

    // One calm day resets the streak.
    let s = c.classify(day(11), &t, 0.0);
    assert_eq!(s.growth_direction, Direction::Up);
    assert_eq!(c.alert_streak(), 0);
}

#[test]
/// Verifies the circuit breaker fires on the first panic-level date.
fn panic_sets_market_circuit() {
    let mut c = RegimeClassifier::new(&RegimeConfig::default());
    let s = c.classify(day(0), &trends(2.0, -2.0), -2.0);
    assert_eq!(s.regime, Regime::Deflation);
    assert_eq!(s.source, RegimeSource::MarketCircuit);
    let s = c.classify(day(1), &trends(2.0, -2.0), -1.5);
    assert_eq!(s.source, RegimeSource::MacroQuadrant);
}

proptest! {
    /// Panic dominates: whatever the trends, levels and history, a score at
    /// or below the panic threshold gives regime 4 from the market circuit,
    /// and the source is MARKET_CIRCUIT only in that case.
    #[test]
    fn panic_dominates(
        history in prop::collection::vec((-3.0f64..3.0, -3.0f64..3.0, -5.0f64..0.0), 0..30),
        growth in -5.0f64..5.0,
        inflation in -5.0f64..5.0,
        growth_level in -2.0f64..6.0,
        core_level in 0.0f64..8.0,
        score in -5.0f64..0.0,
    ) {
        let cfg = RegimeConfig::default();
        let mut c = RegimeClassifier::new(&cfg);
        for (n, (g, i, s)) in history.iter().enumerate() {
            c.classify(day(n as u32), &trends(*g, *i), *s);
        }
        let t = MacroTrends {
            growth_trend: growth,
            inflation_trend: inflation,
            growth_level,
            inflation_core_level: core_level,
        };
        let s = c.classify(day(100), &t, score);
        if score <= cfg.panic_threshold {
            prop_assert_eq!(s.regime, Regime::Deflation);
            prop_assert_eq!(s.source, RegimeSource::MarketCircuit);
        } else {
            prop_assert_eq!(s.source, RegimeSource::MacroQuadrant);
        }
    }
}
