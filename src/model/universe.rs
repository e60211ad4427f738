use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Risky,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub symbol: String,
    pub class: AssetClass,
}

/// Ordered asset universe. Every weight vector in the crate is indexed by the
/// position of the asset in this list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUniverse {
    assets: Vec<AssetSpec>,
    cash_index: usize,
}

impl AssetUniverse {
    /// Build a universe from risky symbols plus exactly one cash symbol.
    /// The cash asset is appended last.
    pub fn new(risky: &[&str], cash: &str) -> Result<Self> {
        let mut assets: Vec<AssetSpec> = risky
            .iter()
            .map(|s| AssetSpec {
                symbol: s.trim().to_ascii_uppercase(),
                class: AssetClass::Risky,
            })
            .collect();
        assets.push(AssetSpec {
            symbol: cash.trim().to_ascii_uppercase(),
            class: AssetClass::Cash,
        });
        Self::from_specs(assets)
    }

    pub fn from_specs(assets: Vec<AssetSpec>) -> Result<Self> {
        if assets.is_empty() {
            return Err(PipelineError::Config("asset universe is empty".to_string()));
        }
        let mut cash_index = None;
        for (i, spec) in assets.iter().enumerate() {
            if spec.symbol.is_empty() {
                return Err(PipelineError::Config(format!(
                    "asset at position {} has an empty symbol",
                    i
                )));
            }
            if assets[..i].iter().any(|a| a.symbol == spec.symbol) {
                return Err(PipelineError::Config(format!(
                    "duplicate asset symbol '{}'",
                    spec.symbol
                )));
            }
            if spec.class == AssetClass::Cash {
                if cash_index.is_some() {
                    return Err(PipelineError::Config(
                        "universe must contain exactly one cash asset".to_string(),
                    ));
                }
                cash_index = Some(i);
            }
        }
        let cash_index = cash_index.ok_or_else(|| {
            PipelineError::Config("universe must contain exactly one cash asset".to_string())
        })?;
        if assets.len() < 2 {
            return Err(PipelineError::Config(
                "universe needs at least one risky asset".to_string(),
            ));
        }
        Ok(Self { assets, cash_index })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[AssetSpec] {
        &self.assets
    }

    pub fn cash_index(&self) -> usize {
        self.cash_index
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        let key = symbol.trim().to_ascii_uppercase();
        self.assets.iter().position(|a| a.symbol == key)
    }

    /// All-cash weight vector.
    pub fn all_cash(&self) -> Vec<f64> {
        let mut w = vec![0.0; self.assets.len()];
        w[self.cash_index] = 1.0;
        w
    }
}
