//! Error taxonomy of the filter bank.
//!
//! [`ConfigError`] is raised while building models and filters and is fatal for the
//! value being built. [`NumericalError`] is returned by a single `propagate`/`update`
//! call, which then leaves its filter untouched.

use thiserror::Error;

/// A caller precondition was violated while building a model or a filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} contains non-finite entries")]
    NonFinite { name: &'static str },

    #[error("{name} is not symmetric (largest asymmetry {asymmetry:e})")]
    NotSymmetric { name: &'static str, asymmetry: f64 },

    #[error("{name} is not positive semi-definite (smallest eigenvalue {min_eigenvalue:e})")]
    NotPositiveSemiDefinite {
        name: &'static str,
        min_eigenvalue: f64,
    },

    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("invalid unscented parameter: {0}")]
    InvalidUnscented(&'static str),

    #[error("invalid scenario: {0}")]
    InvalidScenario(&'static str),
}

/// A numerical condition that prevented one filter step from being committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    #[error("innovation covariance not invertible")]
    InnovationNotInvertible,

    #[error("factorization encountered non-positive pivot")]
    NonPositivePivot,

    #[error("mean iteration did not converge after {iterations} iterations (residual {residual:e})")]
    MeanNotConverged { iterations: usize, residual: f64 },

    #[error("updated covariance is not positive semi-definite")]
    CovarianceNotPsd,
}
