use serde::{Deserialize, Serialize};

/// Enter/exit band for a single stress tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisBand {
    pub enter: f64,
    pub exit: f64,
}

impl HysteresisBand {
    pub const fn new(enter: f64, exit: f64) -> Self {
        Self { enter, exit }
    }

    pub fn is_valid(&self) -> bool {
        self.enter.is_finite() && self.exit.is_finite() && self.exit < self.enter
    }
}

/// Binary flag that turns on above `enter`, turns off below `exit`, and
/// otherwise keeps its previous state. Starts off.
#[derive(Debug, Clone)]
pub struct HysteresisFlag {
    band: HysteresisBand,
    active: bool,
}

impl HysteresisFlag {
    pub fn new(band: HysteresisBand) -> Self {
        assert!(band.is_valid(), "hysteresis exit must be below enter");
        Self {
            band,
            active: false,
        }
    }

    /// Feed one observation. `None` holds the current state.
    pub fn update(&mut self, value: Option<f64>) -> bool {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            if v > self.band.enter {
                self.active = true;
            } else if v < self.band.exit {
                self.active = false;
            }
        }
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn band(&self) -> HysteresisBand {
        self.band
    }
}

/// Flag for a "below threshold" condition that must hold for `persistence`
/// consecutive observations before arming. Once armed it stays on until the
/// value rises above `exit_above`.
#[derive(Debug, Clone)]
pub struct PersistenceFlag {
    threshold: f64,
    exit_above: f64,
    persistence: usize,
    streak: usize,
    active: bool,
}

impl PersistenceFlag {
    pub fn new(threshold: f64, exit_above: f64, persistence: usize) -> Self {
        assert!(persistence > 0, "persistence must be > 0");
        assert!(
            exit_above >= threshold,
            "persistence flag exit must not be below its threshold"
        );
        Self {
            threshold,
            exit_above,
            persistence,
            streak: 0,
            active: false,
        }
    }

    pub fn update(&mut self, value: Option<f64>) -> bool {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return self.active;
        };
        if v < self.threshold {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
        if self.streak >= self.persistence {
            self.active = true;
        } else if v > self.exit_above {
            self.active = false;
        }
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn streak(&self) -> usize {
        self.streak
    }
}

/// Counts consecutive `true` observations.
#[derive(Debug, Clone, Default)]
pub struct StreakCounter {
    streak: usize,
}

impl StreakCounter {
    pub fn update(&mut self, hit: bool) -> usize {
        self.streak = if hit { self.streak.saturating_add(1) } else { 0 };
        self.streak
    }

    pub fn value(&self) -> usize {
        self.streak
    }
}
