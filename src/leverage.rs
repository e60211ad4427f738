use serde::Serialize;

use crate::config::LeverageConfig;
use crate::error::{PipelineError, Result};
use crate::model::regime::{Regime, RegimeSource};
use crate::model::universe::AssetUniverse;
use crate::model::weights::gross_exposure;

#[derive(Debug, Clone)]
struct HardOverride {
    regime: Regime,
    source: Option<RegimeSource>,
    weights: Vec<f64>,
}

/// Result of sizing one base weight vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverageDecision {
    pub weights: Vec<f64>,
    /// Effective multiplier on the base weights after the gross clip.
    pub leverage: f64,
    /// Ex-ante vol the multiplier was computed from; `None` when bypassed.
    pub portfolio_vol: Option<f64>,
    pub overridden: bool,
    pub gross_clipped: bool,
}

/// Target-vol leverage multiplier with global and per-regime caps, a gross
/// exposure ceiling and hard weight overrides.
#[derive(Debug, Clone)]
pub struct LeverageScaler {
    enabled: bool,
    target_vol: f64,
    floor: f64,
    cap: f64,
    gross_cap: f64,
    regime_caps: [Option<f64>; 4],
    overrides: Vec<HardOverride>,
}

impl LeverageScaler {
    pub fn new(cfg: &LeverageConfig, universe: &AssetUniverse) -> Result<Self> {
        let mut regime_caps = [None; 4];
        for rc in &cfg.regime_caps {
            let slot = &mut regime_caps[usize::from(rc.regime.code() - 1)];
            *slot = Some(slot.map_or(rc.cap, |c: f64| c.min(rc.cap)));
        }
        let mut overrides = Vec::with_capacity(cfg.overrides.len());
        for ov in &cfg.overrides {
            let mut weights = vec![0.0; universe.len()];
            for (symbol, w) in &ov.weights {
                let idx = universe.index_of(symbol).ok_or_else(|| {
                    PipelineError::Config(format!(
                        "override for regime {}: unknown symbol '{}'",
                        ov.regime, symbol
                    ))
                })?;
                weights[idx] += w;
            }
            overrides.push(HardOverride {
                regime: ov.regime,
                source: ov.source,
                weights,
            });
        }
        Ok(Self {
            enabled: cfg.enabled,
            target_vol: cfg.target_vol_ann,
            floor: cfg.floor,
            cap: cfg.cap,
            gross_cap: cfg.gross_exposure_cap,
            regime_caps,
            overrides,
        })
    }

    /// Cap in force for a regime: the global cap tightened by any regime cap.
    pub fn effective_cap(&self, regime: Regime) -> f64 {
        match self.regime_caps[usize::from(regime.code() - 1)] {
            Some(c) => self.cap.min(c),
            None => self.cap,
        }
    }

    /// `clip(target_vol / portfolio_vol, floor, cap)`; exactly 1 when leverage
    /// is switched off. The cap wins if a regime cap sits below the floor.
    pub fn multiplier(&self, regime: Regime, portfolio_vol: f64) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        let cap = self.effective_cap(regime);
        let raw = self.target_vol / portfolio_vol;
        if raw.is_nan() {
            return self.floor.min(cap);
        }
        raw.max(self.floor).min(cap)
    }

    /// Fixed weights replacing the computed vector for this key. A
    /// source-specific entry beats a source-agnostic one.
    pub fn override_for(&self, regime: Regime, source: RegimeSource) -> Option<&[f64]> {
        self.overrides
            .iter()
            .find(|o| o.regime == regime && o.source == Some(source))
            .or_else(|| {
                self.overrides
                    .iter()
                    .find(|o| o.regime == regime && o.source.is_none())
            })
            .map(|o| o.weights.as_slice())
    }

    /// Scale by `multiplier` without renormalizing, then clip gross exposure
    /// proportionally if it breaches the ceiling.
    pub fn apply(&self, base: &[f64], multiplier: f64, portfolio_vol: f64) -> LeverageDecision {
        let mut weights: Vec<f64> = base.iter().map(|w| w * multiplier).collect();
        let mut leverage = multiplier;
        let gross = gross_exposure(&weights);
        let gross_clipped = gross > self.gross_cap;
        if gross_clipped {
            let scale = self.gross_cap / gross;
            tracing::warn!(
                gross,
                cap = self.gross_cap,
                scale,
                "Gross exposure above cap; scaling down"
            );
            for w in &mut weights {
                *w *= scale;
            }
            leverage *= scale;
        }
        LeverageDecision {
            weights,
            leverage,
            portfolio_vol: Some(portfolio_vol),
            overridden: false,
            gross_clipped,
        }
    }

    /// Override path: the fixed vector is used as is, bypassing the scaler.
    pub fn apply_override(&self, weights: &[f64]) -> LeverageDecision {
        LeverageDecision {
            weights: weights.to_vec(),
            leverage: 1.0,
            portfolio_vol: None,
            overridden: true,
            gross_clipped: false,
        }
    }
}
