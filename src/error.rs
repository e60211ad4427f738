use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("covariance unavailable: {0}")]
    CovarianceUnavailable(String),

    #[error("optimizer did not converge after {iterations} iterations (objective {objective:.3e})")]
    NotConverged { iterations: usize, objective: f64 },

    #[error("out-of-order market state: {0}")]
    OutOfOrder(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
