//! The filter bank.
//!
//! Every filter implements [`KalmanFilter`]: `propagate` with a motion model,
//! `update` with any number of measurement models, and read back `state` and
//! `covariance`. A failing call returns the error and leaves the filter exactly
//! as it was before the call.

pub mod ekf;
pub mod iekf;
pub mod sekf;
pub mod ukfm;

use std::fmt;

use kalmanifolds_macros::KalmanFilter;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

pub use ekf::Ekf;
pub use iekf::Iekf;
pub use sekf::Sekf;
pub use ukfm::{UnscentedConfig, Ukfm};

use crate::{
    covariance::Covariance,
    error::{ConfigError, NumericalError},
    lie::{LieGroup, Tangent},
    model::{MeasurementModel, MotionModel},
};

pub trait KalmanFilter<G: LieGroup<N>, const N: usize> {
    /// Advances the estimate by one control step.
    fn propagate<F>(
        &mut self,
        model: &F,
        control: &Tangent<G::Element, N>,
    ) -> Result<(), NumericalError>
    where
        F: MotionModel<G, N>;

    /// Corrects the estimate with one measurement.
    fn update<H, const M: usize>(
        &mut self,
        model: &H,
        measurement: &SVector<G::Element, M>,
    ) -> Result<(), NumericalError>
    where
        H: MeasurementModel<G, N, M>;

    fn state(&self) -> &G;

    /// Covariance of the right perturbation `X = X̂·Exp(δ)`.
    fn covariance(&self) -> Covariance<G::Element, N>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Ekf,
    Sekf,
    Iekf,
    Ukfm,
}

impl FilterKind {
    pub const ALL: [Self; 4] = [Self::Ekf, Self::Sekf, Self::Iekf, Self::Ukfm];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ekf => "EKF",
            Self::Sekf => "SEKF",
            Self::Iekf => "IEKF",
            Self::Ukfm => "UKFM",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any of the four filters, dispatching [`KalmanFilter`] to the wrapped one.
#[derive(Debug, Clone, KalmanFilter)]
#[kalman_filter(group = G, dof = N)]
pub enum Filter<G: LieGroup<N>, const N: usize> {
    Ekf(Ekf<G, N>),
    Sekf(Sekf<G, N>),
    Iekf(Iekf<G, N>),
    Ukfm(Ukfm<G, N>),
}

impl<G: LieGroup<N>, const N: usize> Filter<G, N> {
    /// Initializes a filter of the given kind, with the default unscented
    /// parameters for [`FilterKind::Ukfm`].
    pub fn new(
        kind: FilterKind,
        state: G,
        cov: Covariance<G::Element, N>,
    ) -> Result<Self, ConfigError> {
        Ok(match kind {
            FilterKind::Ekf => Self::Ekf(Ekf::new(state, cov)?),
            FilterKind::Sekf => Self::Sekf(Sekf::new(state, cov)?),
            FilterKind::Iekf => Self::Iekf(Iekf::new(state, cov)?),
            FilterKind::Ukfm => Self::Ukfm(Ukfm::new(state, cov)?),
        })
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Ekf(_) => FilterKind::Ekf,
            Self::Sekf(_) => FilterKind::Sekf,
            Self::Iekf(_) => FilterKind::Iekf,
            Self::Ukfm(_) => FilterKind::Ukfm,
        }
    }
}
