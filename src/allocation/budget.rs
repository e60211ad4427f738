use crate::config::BudgetEntryConfig;
use crate::error::{PipelineError, Result};
use crate::model::regime::{Regime, RegimeSource, REACHABLE_KEYS};
use crate::model::universe::AssetUniverse;

/// Risk budgets for one (regime, source) key, in universe order.
/// The cash slot always carries budget 0; cash takes `cash_floor` as a
/// fixed capital weight instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBudget {
    pub cash_floor: f64,
    pub budgets: Vec<f64>,
}

impl RiskBudget {
    pub fn all_cash(n_assets: usize) -> Self {
        Self {
            cash_floor: 1.0,
            budgets: vec![0.0; n_assets],
        }
    }

    /// Indices with a strictly positive budget.
    pub fn active_indices(&self) -> Vec<usize> {
        self.budgets
            .iter()
            .enumerate()
            .filter(|(_, b)| **b > 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_all_cash(&self) -> bool {
        self.cash_floor >= 1.0 || self.budgets.iter().all(|b| *b <= 0.0)
    }

    /// Capital share left for risky assets.
    pub fn risky_share(&self) -> f64 {
        (1.0 - self.cash_floor).clamp(0.0, 1.0)
    }
}

const SLOTS: usize = 8;

fn slot(regime: Regime, source: RegimeSource) -> usize {
    let r = usize::from(regime.code() - 1);
    match source {
        RegimeSource::MacroQuadrant => r * 2,
        RegimeSource::MarketCircuit => r * 2 + 1,
    }
}

/// Typed (regime, source) -> budget table.
#[derive(Debug, Clone)]
pub struct RiskBudgetTable {
    slots: [Option<RiskBudget>; SLOTS],
    n_assets: usize,
}

impl RiskBudgetTable {
    /// Build from config entries. Every key the classifier can emit must be
    /// present, so lookups never miss for classifier output.
    pub fn from_config(entries: &[BudgetEntryConfig], universe: &AssetUniverse) -> Result<Self> {
        let mut slots: [Option<RiskBudget>; SLOTS] = Default::default();
        for entry in entries {
            let mut budgets = vec![0.0; universe.len()];
            for (symbol, b) in &entry.risk {
                let idx = universe.index_of(symbol).ok_or_else(|| {
                    PipelineError::Config(format!(
                        "budget ({}, {}): unknown symbol '{}'",
                        entry.regime,
                        entry.source.as_str(),
                        symbol
                    ))
                })?;
                if idx == universe.cash_index() {
                    continue;
                }
                budgets[idx] = *b;
            }
            let s = slot(entry.regime, entry.source);
            if slots[s].is_some() {
                return Err(PipelineError::Config(format!(
                    "duplicate budget entry for ({}, {})",
                    entry.regime,
                    entry.source.as_str()
                )));
            }
            slots[s] = Some(RiskBudget {
                cash_floor: entry.cash_floor,
                budgets,
            });
        }
        let table = Self {
            slots,
            n_assets: universe.len(),
        };
        table.check_complete()?;
        Ok(table)
    }

    pub fn check_complete(&self) -> Result<()> {
        for (regime, source) in REACHABLE_KEYS {
            if self.get(regime, source).is_none() {
                return Err(PipelineError::Config(format!(
                    "no budget entry for ({}, {})",
                    regime,
                    source.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, regime: Regime, source: RegimeSource) -> Option<&RiskBudget> {
        self.slots[slot(regime, source)].as_ref()
    }

    /// Lookup with the all-cash fallback. A miss means the table and the
    /// classifier disagree, so it is logged at error level.
    pub fn resolve(&self, regime: Regime, source: RegimeSource) -> RiskBudget {
        match self.get(regime, source) {
            Some(budget) => budget.clone(),
            None => {
                tracing::error!(
                    regime = regime.code(),
                    source = source.as_str(),
                    "Unmapped budget key; falling back to all cash"
                );
                RiskBudget::all_cash(self.n_assets)
            }
        }
    }
}
