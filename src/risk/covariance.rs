use nalgebra::{DMatrix, DVector};

use crate::error::{PipelineError, Result};

/// Pushes between exact recomputations from the stored window, which bounds
/// floating-point drift of the incremental update.
const REFRESH_EVERY_WINDOWS: usize = 16;

/// Sliding-window sample covariance of asset returns.
///
/// Observations live in one preallocated `lookback * n_assets` arena indexed
/// by ring offset; mean and co-moment are maintained incrementally with the
/// add/remove form of Welford's update. Only observations pushed so far are
/// ever read, so an estimate taken at date t never sees data after t.
#[derive(Debug, Clone)]
pub struct RollingCovariance {
    n_assets: usize,
    lookback: usize,
    arena: Vec<f64>,
    head: usize,
    count: usize,
    mean: DVector<f64>,
    comoment: DMatrix<f64>,
    pushes_since_refresh: usize,
}

impl RollingCovariance {
    pub fn new(n_assets: usize, lookback: usize) -> Self {
        assert!(n_assets > 0, "covariance needs at least one asset");
        assert!(lookback >= 2, "covariance lookback must be >= 2");
        Self {
            n_assets,
            lookback,
            arena: vec![0.0; n_assets * lookback],
            head: 0,
            count: 0,
            mean: DVector::zeros(n_assets),
            comoment: DMatrix::zeros(n_assets, n_assets),
            pushes_since_refresh: 0,
        }
    }

    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_ready(&self) -> bool {
        self.count >= self.lookback
    }

    fn slot(&self, idx: usize) -> &[f64] {
        &self.arena[idx * self.n_assets..(idx + 1) * self.n_assets]
    }

    /// Push one period of returns. Non-finite entries are stored as 0.
    pub fn push(&mut self, returns: &[f64]) -> Result<()> {
        if returns.len() != self.n_assets {
            return Err(PipelineError::Dimension {
                expected: self.n_assets,
                actual: returns.len(),
            });
        }
        let x = DVector::from_iterator(
            self.n_assets,
            returns.iter().map(|r| if r.is_finite() { *r } else { 0.0 }),
        );

        if self.count >= self.lookback {
            let old = DVector::from_column_slice(self.slot(self.head));
            self.remove(&old);
        }
        let start = self.head * self.n_assets;
        self.arena[start..start + self.n_assets].copy_from_slice(x.as_slice());
        self.head = (self.head + 1) % self.lookback;
        self.add(&x);

        self.pushes_since_refresh += 1;
        if self.pushes_since_refresh >= REFRESH_EVERY_WINDOWS * self.lookback {
            self.refresh();
        }
        Ok(())
    }

    fn add(&mut self, x: &DVector<f64>) {
        self.count += 1;
        let n = self.count as f64;
        let d = x - &self.mean;
        self.mean += &d / n;
        let factor = (n - 1.0) / n;
        self.comoment.ger(factor, &d, &d, 1.0);
    }

    fn remove(&mut self, y: &DVector<f64>) {
        if self.count <= 1 {
            self.count = 0;
            self.mean.fill(0.0);
            self.comoment.fill(0.0);
            return;
        }
        self.count -= 1;
        let n = self.count as f64;
        let d = y - &self.mean;
        self.mean -= &d / n;
        let factor = (n + 1.0) / n;
        self.comoment.ger(-factor, &d, &d, 1.0);
    }

    /// Recompute mean and co-moment exactly from the stored window.
    fn refresh(&mut self) {
        self.pushes_since_refresh = 0;
        let stored = self.count.min(self.lookback);
        if stored == 0 {
            return;
        }
        let mut mean = DVector::zeros(self.n_assets);
        for i in 0..stored {
            mean += DVector::from_column_slice(self.slot(i));
        }
        mean /= stored as f64;
        let mut comoment = DMatrix::zeros(self.n_assets, self.n_assets);
        for i in 0..stored {
            let d = DVector::from_column_slice(self.slot(i)) - &mean;
            comoment.ger(1.0, &d, &d, 1.0);
        }
        self.mean = mean;
        self.comoment = comoment;
    }

    /// Sample covariance (n - 1 denominator) once the window is full.
    pub fn covariance(&self) -> Option<DMatrix<f64>> {
        if !self.is_ready() {
            return None;
        }
        let mut cov = &self.comoment / (self.count as f64 - 1.0);
        // Round-off from the sliding update can leave a stale series at -1e-20.
        for i in 0..self.n_assets {
            if cov[(i, i)] < 0.0 {
                cov[(i, i)] = 0.0;
            }
        }
        cov.iter().all(|v| v.is_finite()).then_some(cov)
    }

    /// Like [`covariance`](Self::covariance) but explains why no estimate exists.
    pub fn try_covariance(&self) -> Result<DMatrix<f64>> {
        if !self.is_ready() {
            return Err(PipelineError::CovarianceUnavailable(format!(
                "warm-up: {}/{} observations",
                self.count, self.lookback
            )));
        }
        self.covariance().ok_or_else(|| {
            PipelineError::CovarianceUnavailable("non-finite covariance entries".to_string())
        })
    }
}

/// Reject matrices that cannot feed an optimizer: wrong shape, non-finite
/// entries, or negative variances.
pub fn check_covariance(cov: &DMatrix<f64>, n_assets: usize) -> Result<()> {
    if cov.nrows() != n_assets || cov.ncols() != n_assets {
        return Err(PipelineError::Dimension {
            expected: n_assets,
            actual: cov.nrows().max(cov.ncols()),
        });
    }
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::CovarianceUnavailable(
            "non-finite covariance entries".to_string(),
        ));
    }
    if cov.diagonal().iter().any(|v| *v < 0.0) {
        return Err(PipelineError::CovarianceUnavailable(
            "negative variance on the diagonal".to_string(),
        ));
    }
    Ok(())
}

/// Variances at or below this fraction of the largest active variance count
/// as zero.
const DEGENERATE_VARIANCE_REL: f64 = 1e-12;

/// Reject a covariance in which an asset of `active` has no variance, as a
/// stale forward-filled price produces. Inverse-risk weighting is undefined
/// for such an asset.
pub fn check_active_variances(cov: &DMatrix<f64>, active: &[usize]) -> Result<()> {
    let variances: Vec<f64> = active
        .iter()
        .map(|&i| cov.get((i, i)).copied().unwrap_or(f64::NAN))
        .collect();
    let largest = variances.iter().copied().fold(0.0, f64::max);
    for (&i, v) in active.iter().zip(&variances) {
        if !(v.is_finite() && *v > DEGENERATE_VARIANCE_REL * largest && *v > 0.0) {
            return Err(PipelineError::CovarianceUnavailable(format!(
                "asset {} has degenerate variance {:e}",
                i, v
            )));
        }
    }
    Ok(())
}

/// Principal sub-matrix over `idx`.
pub fn sub_covariance(cov: &DMatrix<f64>, idx: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(idx.len(), idx.len(), |i, j| cov[(idx[i], idx[j])])
}
