/// Fixed-length window over the most recent observations, backed by a ring
/// buffer so each push is O(1).
#[derive(Debug, Clone)]
struct Ring {
    buffer: Vec<f64>,
    head: usize,
    count: usize,
}

impl Ring {
    fn new(period: usize) -> Self {
        Self {
            buffer: vec![0.0; period],
            head: 0,
            count: 0,
        }
    }

    /// Insert `value`; return the evicted value once the window is full.
    fn push(&mut self, value: f64) -> Option<f64> {
        let period = self.buffer.len();
        let evicted = (self.count >= period).then(|| self.buffer[self.head]);
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % period;
        if self.count < period {
            self.count += 1;
        }
        evicted
    }

    fn is_full(&self) -> bool {
        self.count >= self.buffer.len()
    }
}

/// Simple moving average over the last `period` values.
#[derive(Debug, Clone)]
pub struct RollingMean {
    period: usize,
    ring: Ring,
    sum: f64,
}

impl RollingMean {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "rolling mean period must be > 0");
        Self {
            period,
            ring: Ring::new(period),
            sum: 0.0,
        }
    }

    /// Push a new value, return the current mean if the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if let Some(old) = self.ring.push(value) {
            self.sum -= old;
        }
        self.sum += value;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        self.ring
            .is_full()
            .then(|| self.sum / self.period as f64)
    }

    pub fn is_ready(&self) -> bool {
        self.ring.is_full()
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Rolling mean and sample standard deviation (n - 1 denominator), updated
/// with the add/remove form of Welford's recurrence.
#[derive(Debug, Clone)]
pub struct RollingStats {
    period: usize,
    ring: Ring,
    n: usize,
    mean: f64,
    m2: f64,
}

impl RollingStats {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "rolling stats period must be >= 2");
        Self {
            period,
            ring: Ring::new(period),
            n: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if let Some(old) = self.ring.push(value) {
            self.remove(old);
        }
        self.add(value);
    }

    fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if self.n <= 1 {
            self.n = 0;
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        self.n -= 1;
        let delta = x - self.mean;
        self.mean -= delta / self.n as f64;
        self.m2 -= delta * (x - self.mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ring.is_full()
    }

    pub fn mean(&self) -> Option<f64> {
        self.is_ready().then_some(self.mean)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.is_ready()
            .then(|| (self.m2 / (self.n as f64 - 1.0)).max(0.0).sqrt())
    }

    /// z-score of `value` against the current window. Returns 0 during warm-up
    /// and when the window has no dispersion.
    pub fn z_score(&self, value: f64) -> f64 {
        match (self.mean(), self.std_dev()) {
            (Some(mean), Some(std)) if std > f64::EPSILON * mean.abs().max(1.0) => {
                let z = (value - mean) / std;
                if z.is_finite() {
                    z
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
