pub mod normalizer;
pub mod stress;

pub use normalizer::{MacroTrends, SignalNormalizer, TrendNormalizer};
pub use stress::{StressBreakdown, StressScorer};
