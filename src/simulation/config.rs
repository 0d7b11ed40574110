use nalgebra::{Matrix3, Matrix6, Point3, Vector6};
use serde::{Deserialize, Serialize};

use crate::{
    covariance::{BlockVariances, Covariance},
    error::ConfigError,
    filter::{FilterKind, UnscentedConfig},
    model::{GpsPosition, Landmark3D, LieSystemModel},
};

/// Standard deviations of the simulated sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Linear velocity noise (m/s/√Hz).
    pub odometry: f64,
    /// Angular velocity noise (rad/s/√Hz).
    pub gyro: f64,
    /// Per axis, in meters.
    pub landmark: f64,
    /// Per axis, in meters.
    pub gps: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            odometry: 3e-3,
            gyro: 1e-2,
            landmark: 0.01,
            gps: 6e-3_f64.sqrt(),
        }
    }
}

impl NoiseConfig {
    /// All sensors perfect.
    pub const fn noise_free() -> Self {
        Self {
            odometry: 0.0,
            gyro: 0.0,
            landmark: 0.0,
            gps: 0.0,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            odometry,
            gyro,
            landmark,
            gps,
        } = *self;
        if [odometry, gyro, landmark, gps]
            .iter()
            .all(|sigma| sigma.is_finite() && *sigma >= 0.0)
        {
            Ok(())
        } else {
            Err(ConfigError::InvalidScenario(
                "noise standard deviations must be finite and non-negative",
            ))
        }
    }
}

/// A robot driving a helix among known beacons, observing them and a
/// position fix at fixed periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Seconds per step.
    pub dt: f64,
    pub steps: usize,
    pub seed: u64,
    /// Steps left out of the error statistics.
    pub warmup: usize,
    /// Nominal body twist `[v; ω]`, integrated over `dt` at every step.
    pub velocity: [f64; 6],
    /// World-frame beacon positions.
    pub landmarks: Vec<[f64; 3]>,
    /// Beacons are observed every `landmark_period` steps.
    pub landmark_period: usize,
    pub gps_period: usize,
    /// Draw the initial estimate from the initial covariance instead of
    /// starting at the true pose.
    pub sample_initial_state: bool,
    /// Which filters to run.
    pub filters: Vec<FilterKind>,
    pub noise: NoiseConfig,
    pub initial_covariance: BlockVariances<f64>,
    pub unscented: UnscentedConfig<f64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            steps: 35_000,
            seed: 42,
            warmup: 1_000,
            velocity: [0.1, 0.0, 0.05, 0.0, 0.0, 0.05],
            landmarks: vec![
                [2.0, 0.0, 0.0],
                [3.0, -1.0, -1.0],
                [2.0, -1.0, 1.0],
                [2.0, 1.0, 1.0],
                [2.0, 1.0, -1.0],
            ],
            landmark_period: 2,
            gps_period: 10,
            sample_initial_state: false,
            filters: FilterKind::ALL.to_vec(),
            noise: NoiseConfig::default(),
            initial_covariance: BlockVariances::default(),
            unscented: UnscentedConfig::default(),
        }
    }
}

/// The models a filter needs to follow a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Models {
    pub motion: LieSystemModel<f64, 6>,
    pub landmarks: Vec<Landmark3D<f64>>,
    pub gps: GpsPosition<f64>,
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if self.landmark_period == 0 || self.gps_period == 0 {
            return Err(ConfigError::InvalidScenario("periods must be at least 1"));
        }
        if !self
            .velocity
            .iter()
            .chain(self.landmarks.iter().flatten())
            .all(|x| x.is_finite())
        {
            return Err(ConfigError::InvalidScenario(
                "velocity and landmarks must be finite",
            ));
        }
        self.noise.validate()
    }

    /// The nominal control increment of one step.
    pub fn control(&self) -> Vector6<f64> {
        Vector6::from(self.velocity) * self.dt
    }

    /// Rate density of the control noise, so that one step accumulates
    /// `dt·σ²`.
    pub fn process_noise(&self) -> Matrix6<f64> {
        let NoiseConfig { odometry, gyro, .. } = self.noise;
        let mut q = Matrix6::zeros();
        q.fixed_view_mut::<3, 3>(0, 0)
            .fill_diagonal(odometry * odometry / self.dt);
        q.fixed_view_mut::<3, 3>(3, 3)
            .fill_diagonal(gyro * gyro / self.dt);
        q
    }

    pub fn initial_covariance(&self) -> Covariance<f64, 6> {
        self.initial_covariance.into()
    }

    pub fn landmark_points(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.landmarks.iter().map(|&[x, y, z]| Point3::new(x, y, z))
    }

    /// Models matching the simulated sensors.
    pub fn models(&self) -> Result<Models, ConfigError> {
        self.validate()?;
        let landmark_var = self.noise.landmark * self.noise.landmark;
        let gps_var = self.noise.gps * self.noise.gps;
        Ok(Models {
            motion: LieSystemModel::new(self.dt, self.process_noise())?,
            landmarks: self
                .landmark_points()
                .map(|point| Landmark3D::new(point, Matrix3::identity() * landmark_var))
                .collect::<Result<_, _>>()?,
            gps: GpsPosition::new(Matrix3::identity() * gps_var)?,
        })
    }
}
