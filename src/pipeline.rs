use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::allocation::{
    strategy_for, AllocationInput, RiskBudgetTable, TrendFilter, WeightingStrategy,
};
use crate::config::{Config, RebalanceFrequency};
use crate::error::{PipelineError, Result};
use crate::financing::{borrow_ratio, FinancingModel};
use crate::leverage::{LeverageDecision, LeverageScaler};
use crate::model::market::{simple_returns, MarketState};
use crate::model::regime::RegimeSignal;
use crate::model::universe::AssetUniverse;
use crate::model::weights::{gross_exposure, max_abs_deviation, PortfolioWeights};
use crate::regime::RegimeClassifier;
use crate::risk::{ExAnteRisk, RollingCovariance};
use crate::signal::{SignalNormalizer, StressBreakdown, StressScorer};

/// What happened to the target on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// Not a rebalance date; the last target is carried forward.
    Held,
    /// New target computed and traded.
    Rebalanced,
    /// Hard override vector traded.
    Override,
    /// New target within the deadband of current holdings; no trade.
    DeadbandHold,
    /// Covariance not available; prior target (or all cash) kept.
    WarmUp,
    /// Weighting failed; prior target kept.
    Fallback,
}

/// Cross-date mutable state, written only on rebalance dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocatorState {
    /// Last traded target (levered), published on every date until replaced.
    pub target_weights: Option<Vec<f64>>,
    /// Actual holdings: the last target drifted by realized returns.
    pub held_weights: Option<Vec<f64>>,
    /// Last successful unlevered solution, the warm start for the next solve.
    pub optimizer_solution: Option<Vec<f64>>,
    pub target_leverage: f64,
    pub target_vol: Option<f64>,
}

/// Output for one processed date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub signal: RegimeSignal,
    pub stress: StressBreakdown,
    pub weights: PortfolioWeights,
    pub gross_exposure: f64,
    pub borrow_ratio: f64,
    pub financing_cost: f64,
    pub leverage: f64,
    pub portfolio_vol: Option<f64>,
    pub rebalanced: bool,
    pub outcome: AllocationOutcome,
}

fn period_key(date: NaiveDate, freq: RebalanceFrequency) -> (i32, u32) {
    match freq {
        RebalanceFrequency::Daily => (date.year(), date.ordinal()),
        RebalanceFrequency::Weekly => {
            let week = date.iso_week();
            (week.year(), week.week())
        }
        RebalanceFrequency::Monthly => (date.year(), date.month()),
        RebalanceFrequency::Quarterly => (date.year(), (date.month() - 1) / 3),
    }
}

/// Drift weights by one period of asset returns. Returns `None` when the
/// book is wiped out and the update is undefined.
pub fn drift_weights(weights: &[f64], returns: &[f64]) -> Option<Vec<f64>> {
    let port: f64 = weights.iter().zip(returns).map(|(w, r)| w * r).sum();
    let denom = 1.0 + port;
    if !(denom.is_finite() && denom > 0.0) {
        return None;
    }
    Some(
        weights
            .iter()
            .zip(returns)
            .map(|(w, r)| w * (1.0 + r) / denom)
            .collect(),
    )
}

/// Sequential per-date driver. Owns every stateful component; dates must be
/// fed strictly in order and none may be skipped.
#[derive(Debug)]
pub struct Pipeline {
    universe: AssetUniverse,
    normalizer: SignalNormalizer,
    scorer: StressScorer,
    classifier: RegimeClassifier,
    covariance: RollingCovariance,
    ex_ante: ExAnteRisk,
    budgets: RiskBudgetTable,
    strategy: Box<dyn WeightingStrategy>,
    trend_filter: Option<TrendFilter>,
    leverage: LeverageScaler,
    financing: FinancingModel,
    frequency: RebalanceFrequency,
    deadband: f64,
    periods_per_year: f64,
    state: AllocatorState,
    last_date: Option<NaiveDate>,
    last_prices: Option<Vec<f64>>,
    last_period: Option<(i32, u32)>,
}

impl Pipeline {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let universe = cfg.asset_universe()?;
        let n = universe.len();
        let budgets = RiskBudgetTable::from_config(&cfg.budgets, &universe)?;
        let leverage = LeverageScaler::new(&cfg.leverage, &universe)?;
        let trend_filter = cfg
            .allocator
            .trend_filter_window
            .map(|w| TrendFilter::new(n, w, universe.cash_index()));
        Ok(Self {
            normalizer: SignalNormalizer::new(&cfg.trend),
            scorer: StressScorer::new(&cfg.stress),
            classifier: RegimeClassifier::new(&cfg.regime),
            covariance: RollingCovariance::new(n, cfg.risk.lookback),
            ex_ante: ExAnteRisk::new(&cfg.risk),
            budgets,
            strategy: strategy_for(&cfg.allocator),
            trend_filter,
            leverage,
            financing: FinancingModel::new(&cfg.financing, cfg.risk.periods_per_year),
            frequency: cfg.rebalance.frequency,
            deadband: cfg.rebalance.deadband_abs,
            periods_per_year: cfg.risk.periods_per_year,
            state: AllocatorState {
                target_leverage: 1.0,
                ..AllocatorState::default()
            },
            last_date: None,
            last_prices: None,
            last_period: None,
            universe,
        })
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn state(&self) -> &AllocatorState {
        &self.state
    }

    pub fn financing(&self) -> &FinancingModel {
        &self.financing
    }

    pub fn run(&mut self, states: &[MarketState]) -> Result<Vec<DailyRecord>> {
        states.iter().map(|s| self.step(s)).collect()
    }

    pub fn step(&mut self, ms: &MarketState) -> Result<DailyRecord> {
        if let Some(prev) = self.last_date {
            if ms.date <= prev {
                return Err(PipelineError::OutOfOrder(format!(
                    "{} does not follow {}",
                    ms.date, prev
                )));
            }
        }
        if ms.prices.len() != self.universe.len() {
            return Err(PipelineError::Dimension {
                expected: self.universe.len(),
                actual: ms.prices.len(),
            });
        }

        if let Some(prev_prices) = &self.last_prices {
            let returns = simple_returns(&ms.prices, prev_prices);
            self.covariance.push(&returns)?;
            let drifted = self
                .state
                .held_weights
                .as_deref()
                .map(|held| drift_weights(held, &returns));
            match drifted {
                Some(Some(w)) => self.state.held_weights = Some(w),
                Some(None) => tracing::warn!(date = %ms.date, "Holdings wiped out; drift skipped"),
                None => {}
            }
        }
        if let Some(filter) = &mut self.trend_filter {
            filter.update(&ms.prices);
        }
        self.last_date = Some(ms.date);
        self.last_prices = Some(ms.prices.clone());

        let trends = self.normalizer.update(&ms.macro_levels);
        let stress = self.scorer.update(&ms.indicators);
        let signal = self.classifier.classify(ms.date, &trends, stress.score());

        let period = period_key(ms.date, self.frequency);
        let is_rebalance_date = self.last_period != Some(period);
        self.last_period = Some(period);

        let (outcome, rebalanced) = if is_rebalance_date {
            self.rebalance(&signal)
        } else {
            (AllocationOutcome::Held, false)
        };

        let weights = self
            .state
            .target_weights
            .clone()
            .unwrap_or_else(|| self.universe.all_cash());
        let gross = gross_exposure(&weights);
        let financing_cost = self.financing.cost(&weights, ms.financing_rate_ann);
        Ok(DailyRecord {
            borrow_ratio: borrow_ratio(&weights),
            weights: PortfolioWeights::new(ms.date, weights),
            gross_exposure: gross,
            financing_cost,
            leverage: self.state.target_leverage,
            portfolio_vol: self.state.target_vol,
            rebalanced,
            outcome,
            stress,
            signal,
        })
    }

    /// Compute a candidate target for a rebalance date and trade it unless
    /// it sits inside the deadband of current holdings.
    fn rebalance(&mut self, signal: &RegimeSignal) -> (AllocationOutcome, bool) {
        let (regime, source) = signal.key();
        let date = signal.date;

        if let Some(fixed) = self.leverage.override_for(regime, source) {
            let decision = self.leverage.apply_override(fixed);
            return self.commit(date, decision, AllocationOutcome::Override);
        }

        let budget = self.budgets.resolve(regime, source);
        if budget.is_all_cash() {
            let decision = LeverageDecision {
                weights: self.universe.all_cash(),
                leverage: 1.0,
                portfolio_vol: None,
                overridden: false,
                gross_clipped: false,
            };
            return self.commit(date, decision, AllocationOutcome::Rebalanced);
        }

        let cov = match self.covariance.try_covariance() {
            Ok(cov) => cov,
            Err(e) => {
                tracing::debug!(date = %date, error = %e, "Covariance unavailable; keeping prior target");
                return self.keep_prior(AllocationOutcome::WarmUp);
            }
        };

        let input = AllocationInput {
            budget: &budget,
            covariance: &cov,
            cash_index: self.universe.cash_index(),
            periods_per_year: self.periods_per_year,
            warm_start: self.state.optimizer_solution.as_deref(),
        };
        let base = match self.strategy.weights(&input) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(
                    date = %date,
                    method = self.strategy.name(),
                    error = %e,
                    "Weighting failed; falling back to prior weights"
                );
                return self.keep_prior(AllocationOutcome::Fallback);
            }
        };
        self.state.optimizer_solution = Some(base.clone());

        let mut filtered = base;
        if let Some(filter) = &self.trend_filter {
            let dropped = filter.apply(&mut filtered);
            if !dropped.is_empty() {
                tracing::debug!(date = %date, assets = ?dropped, "Trend filter moved weight to cash");
            }
        }

        let vol = match self.ex_ante.portfolio_vol(&filtered, &cov) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(date = %date, error = %e, "Ex-ante vol failed; keeping prior target");
                return self.keep_prior(AllocationOutcome::Fallback);
            }
        };
        let multiplier = self.leverage.multiplier(regime, vol);
        let decision = self.leverage.apply(&filtered, multiplier, vol);
        self.commit(date, decision, AllocationOutcome::Rebalanced)
    }

    /// No new target: carry the prior one, or go to cash if none exists yet.
    fn keep_prior(&mut self, outcome: AllocationOutcome) -> (AllocationOutcome, bool) {
        if self.state.target_weights.is_some() {
            return (outcome, false);
        }
        let cash = self.universe.all_cash();
        self.state.target_weights = Some(cash.clone());
        self.state.held_weights = Some(cash);
        self.state.target_leverage = 1.0;
        self.state.target_vol = None;
        (outcome, true)
    }

    fn commit(
        &mut self,
        date: NaiveDate,
        decision: LeverageDecision,
        outcome: AllocationOutcome,
    ) -> (AllocationOutcome, bool) {
        if let Some(held) = &self.state.held_weights {
            let deviation = max_abs_deviation(&decision.weights, held);
            if deviation <= self.deadband {
                tracing::debug!(date = %date, deviation, "Within deadband; no trade");
                return (AllocationOutcome::DeadbandHold, false);
            }
        }
        tracing::info!(
            date = %date,
            leverage = decision.leverage,
            gross = gross_exposure(&decision.weights),
            overridden = decision.overridden,
            "Rebalanced"
        );
        self.state.target_leverage = decision.leverage;
        self.state.target_vol = decision.portfolio_vol;
        self.state.held_weights = Some(decision.weights.clone());
        self.state.target_weights = Some(decision.weights);
        (outcome, true)
    }
}
