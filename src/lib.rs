#![deny(clippy::unwrap_used)]
#![deny(clippy::undocumented_unsafe_blocks)]
#![deny(unused_must_use)]
//! Kalman filtering on Lie groups.
//!
//! Four estimators share the [`KalmanFilter`] contract over a state living on a
//! [`LieGroup`]: an extended filter ([`Ekf`]), its square-root form ([`Sekf`]),
//! a right-invariant filter ([`Iekf`]) and an unscented filter on manifolds
//! ([`Ukfm`]).

extern crate self as kalmanifolds;

pub mod covariance;
pub mod error;
pub mod filter;
pub mod lie;
pub mod model;
pub mod simulation;
pub mod uncertain;
mod utils;

pub use nalgebra;

pub use covariance::{BlockVariances, Covariance, Noise};
pub use error::{ConfigError, NumericalError};
pub use filter::{Ekf, Filter, FilterKind, Iekf, KalmanFilter, Sekf, Ukfm, UnscentedConfig};
pub use lie::{LieGroup, SE3};
pub use model::{GpsPosition, Landmark3D, LieSystemModel, MeasurementModel, MotionModel};
