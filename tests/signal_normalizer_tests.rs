use macro_regime_alloc::config::TrendConfig;
use macro_regime_alloc::model::market::MacroLevels;
use macro_regime_alloc::signal::{SignalNormalizer, TrendNormalizer};

fn short_cfg() -> TrendConfig {
    TrendConfig {
        short_window: 3,
        long_window: 5,
        short_weight: 0.4,
        long_weight: 0.6,
        inflation_core_weight: 0.7,
        inflation_headline_weight: 0.3,
    }
}

fn naive_z(window: &[f64], value: f64) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (value - mean) / var.sqrt()
}

#[test]
/// Verifies the neutral cold start: until both windows fill, the trend is 0.
fn cold_start_is_neutral() {
    let mut trend = TrendNormalizer::new(&short_cfg());
    assert_eq!(trend.push(1.0), 0.0);
    assert_eq!(trend.push(2.0), 0.0);
    // Short window ready, long window not: only the short leg contributes.
    let v = trend.push(4.0);
    let expected = 0.4 * naive_z(&[1.0, 2.0, 4.0], 4.0);
    assert!((v - expected).abs() < 1e-12);
}

#[test]
/// Verifies the blend formula once both windows are full.
fn blended_z_scores_match_naive_windows() {
    let series = [1.0, 3.0, 2.0, 5.0, 4.0, 7.0, 6.0];
    let mut trend = TrendNormalizer::new(&short_cfg());
    let mut last = 0.0;
    for v in series {
        last = trend.push(v);
    }
    let n = series.len();
    let expected = 0.4 * naive_z(&series[n - 3..], 6.0) + 0.6 * naive_z(&series[n - 5..], 6.0);
    assert!((last - expected).abs() < 1e-10);
}

#[test]
/// Verifies the zero-dispersion edge case: a flat window gives z = 0, not NaN.
fn flat_series_has_zero_trend() {
    let mut trend = TrendNormalizer::new(&short_cfg());
    for _ in 0..10 {
        assert_eq!(trend.push(2.5), 0.0);
    }
}

#[test]
/// Verifies non-finite levels are skipped instead of poisoning the windows.
fn nan_level_is_skipped() {
    let mut trend = TrendNormalizer::new(&short_cfg());
    for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
        trend.push(v);
    }
    let before = trend.value();
    let after = trend.push(f64::NAN);
    assert!(after.is_finite());
    assert!((before - after).abs() < 1e-15);
    assert_eq!(trend.last_level(), Some(5.0));
}

#[test]
/// Verifies the core/headline blend and the raw level pass-through.
fn inflation_blend_uses_core_and_headline() {
    let cfg = short_cfg();
    let mut normalizer = SignalNormalizer::new(&cfg);
    let mut core_only = TrendNormalizer::new(&cfg);
    let mut headline_only = TrendNormalizer::new(&cfg);
    let mut out = None;
    for i in 0..8 {
        let core = 2.0 + 0.1 * i as f64 + if i % 2 == 0 { 0.05 } else { 0.0 };
        let headline = 3.0 - 0.2 * i as f64;
        let c = core_only.push(core);
        let h = headline_only.push(headline);
        out = Some((
            normalizer.update(&MacroLevels {
                growth: 1.0 + i as f64,
                inflation_core: core,
                inflation_headline: Some(headline),
            }),
            c,
            h,
            core,
        ));
    }
    let (trends, c, h, core) = out.unwrap();
    assert!((trends.inflation_trend - (0.7 * c + 0.3 * h)).abs() < 1e-12);
    assert!((trends.inflation_core_level - core).abs() < 1e-15);
    assert!((trends.growth_level - 8.0).abs() < 1e-15);
    assert!(trends.growth_trend > 0.0);
}

#[test]
/// Verifies a run without any headline series falls back to core alone.
fn missing_headline_uses_core_only() {
    let cfg = short_cfg();
    let mut normalizer = SignalNormalizer::new(&cfg);
    let mut core_only = TrendNormalizer::new(&cfg);
    let mut last = (0.0, 0.0);
    for i in 0..7 {
        let core = (i as f64 * 0.7).sin() + 2.0;
        let c = core_only.push(core);
        let t = normalizer.update(&MacroLevels {
            growth: 1.0,
            inflation_core: core,
            inflation_headline: None,
        });
        last = (t.inflation_trend, c);
    }
    assert!((last.0 - last.1).abs() < 1e-15);
}
