pub mod allocation;
pub mod config;
pub mod error;
pub mod financing;
pub mod indicator {
    pub mod hysteresis;
    pub mod rolling;
}
pub mod leverage;
pub mod model {
    pub mod market;
    pub mod regime;
    pub mod universe;
    pub mod weights;
}
pub mod pipeline;
pub mod regime;
pub mod replay;
pub mod risk;
pub mod signal;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::{AllocationOutcome, AllocatorState, DailyRecord, Pipeline};
