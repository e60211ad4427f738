pub mod covariance;
pub mod ex_ante;

pub use covariance::{check_active_variances, check_covariance, sub_covariance, RollingCovariance};
pub use ex_ante::ExAnteRisk;
