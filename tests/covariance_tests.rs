use macro_regime_alloc::error::PipelineError;
use macro_regime_alloc::risk::{
    check_active_variances, check_covariance, sub_covariance, RollingCovariance,
};

fn naive_cov(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows[0].len();
    let t = rows.len() as f64;
    let mean: Vec<f64> = (0..n)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / t)
        .collect();
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    rows.iter()
                        .map(|r| (r[i] - mean[i]) * (r[j] - mean[j]))
                        .sum::<f64>()
                        / (t - 1.0)
                })
                .collect()
        })
        .collect()
}

fn synthetic_returns(len: usize) -> Vec<Vec<f64>> {
    (0..len)
        .map(|k| {
            let t = k as f64;
            vec![
                0.01 * (t * 0.37).sin(),
                0.02 * (t * 0.11).cos() + 0.005 * (t * 0.37).sin(),
                -0.015 * (t * 0.53).sin() + 0.001,
            ]
        })
        .collect()
}

#[test]
/// Verifies the warm-up contract: no estimate until the window is full.
fn unavailable_during_warm_up() {
    let mut cov = RollingCovariance::new(3, 5);
    let rows = synthetic_returns(4);
    for r in &rows {
        cov.push(r).unwrap();
        assert!(cov.covariance().is_none());
    }
    assert!(matches!(
        cov.try_covariance(),
        Err(PipelineError::CovarianceUnavailable(_))
    ));
    cov.push(&[0.0, 0.0, 0.0]).unwrap();
    assert!(cov.is_ready());
    assert!(cov.covariance().is_some());
}

#[test]
/// Verifies the sliding update matches a from-scratch estimate on every
/// window, well past several ring wraps.
fn sliding_window_matches_naive() {
    let lookback = 7;
    let rows = synthetic_returns(60);
    let mut cov = RollingCovariance::new(3, lookback);
    for (k, r) in rows.iter().enumerate() {
        cov.push(r).unwrap();
        if k + 1 < lookback {
            continue;
        }
        let est = cov.covariance().unwrap();
        let expected = naive_cov(&rows[k + 1 - lookback..=k]);
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (est[(i, j)] - expected[i][j]).abs() < 1e-12,
                    "k={} ({},{}) {} vs {}",
                    k,
                    i,
                    j,
                    est[(i, j)],
                    expected[i][j]
                );
            }
        }
    }
}

#[test]
/// Verifies the periodic exact refresh keeps long runs accurate.
fn long_run_stays_accurate() {
    let lookback = 4;
    let rows = synthetic_returns(1_000);
    let mut cov = RollingCovariance::new(3, lookback);
    for r in &rows {
        cov.push(r).unwrap();
    }
    let est = cov.covariance().unwrap();
    let expected = naive_cov(&rows[rows.len() - lookback..]);
    for i in 0..3 {
        for j in 0..3 {
            assert!((est[(i, j)] - expected[i][j]).abs() < 1e-12);
        }
    }
}

#[test]
/// Verifies causality: the estimate after date t ignores later observations.
fn estimate_is_causal() {
    let rows = synthetic_returns(30);
    let mut full = RollingCovariance::new(3, 10);
    let mut truncated = RollingCovariance::new(3, 10);
    for r in &rows[..20] {
        full.push(r).unwrap();
        truncated.push(r).unwrap();
    }
    let at_t = full.covariance().unwrap();
    for r in &rows[20..] {
        full.push(r).unwrap();
    }
    assert_eq!(at_t, truncated.covariance().unwrap());
}

#[test]
fn wrong_width_is_rejected() {
    let mut cov = RollingCovariance::new(3, 5);
    assert!(matches!(
        cov.push(&[0.1, 0.2]),
        Err(PipelineError::Dimension {
            expected: 3,
            actual: 2
        })
    ));
    assert!(cov.is_empty());
}

#[test]
fn non_finite_returns_are_zeroed() {
    let mut cov = RollingCovariance::new(2, 2);
    cov.push(&[f64::NAN, 0.01]).unwrap();
    cov.push(&[0.02, f64::INFINITY]).unwrap();
    let est = cov.covariance().unwrap();
    assert!(est.iter().all(|v| v.is_finite()));
    assert!((est[(0, 0)] - 0.0002).abs() < 1e-15);
    assert!((est[(1, 1)] - 0.00005).abs() < 1e-15);
}

#[test]
fn helpers_check_and_slice() {
    let rows = synthetic_returns(10);
    let mut cov = RollingCovariance::new(3, 10);
    for r in &rows {
        cov.push(r).unwrap();
    }
    let m = cov.covariance().unwrap();
    check_covariance(&m, 3).unwrap();
    assert!(check_covariance(&m, 2).is_err());
    let sub = sub_covariance(&m, &[2, 0]);
    assert_eq!(sub[(0, 0)], m[(2, 2)]);
    assert_eq!(sub[(0, 1)], m[(2, 0)]);
    assert_eq!(sub[(1, 1)], m[(0, 0)]);
}

#[test]
/// Verifies a series that stops moving shows up as degenerate once its
/// moves leave the window, even with round-off from the sliding update.
fn stale_series_is_degenerate() {
    let mut cov = RollingCovariance::new(2, 5);
    for k in 0..12 {
        let t = k as f64;
        let moving = 0.01 * (t * 0.7).sin();
        let stale = if k < 4 { 0.02 * (t * 1.3).cos() } else { 0.0 };
        cov.push(&[moving, stale]).unwrap();
    }
    let m = cov.covariance().unwrap();
    check_covariance(&m, 2).unwrap();
    check_active_variances(&m, &[0]).unwrap();
    assert!(matches!(
        check_active_variances(&m, &[0, 1]),
        Err(PipelineError::CovarianceUnavailable(_))
    ));
}
