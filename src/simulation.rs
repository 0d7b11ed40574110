//! Synthetic ground truth and sensor data for exercising the filters.

pub mod config;
pub mod metrics;
pub mod runner;

use nalgebra::{Point3, Vector3, Vector6};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use tracing::debug;

pub use config::{Models, NoiseConfig, ScenarioConfig};
pub use metrics::{ErrorStats, Summary};
pub use runner::Runner;

use crate::{
    error::ConfigError,
    lie::{LieGroup, SE3, Tangent},
    model::MotionModel,
};

/// Runs a whole scenario and returns one summary per filter, then the
/// dead-reckoning baseline.
pub fn run(config: ScenarioConfig) -> Result<Vec<Summary>, ConfigError> {
    let mut simulator = Simulator::new(config)?;
    let initial = simulator.initial_estimate();
    let mut runner = Runner::new(simulator.config(), initial)?;
    for tick in simulator {
        runner.step(&tick);
    }
    Ok(runner.summaries())
}

/// What the sensors report during one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub time: f64,
    /// The pose after this step's motion.
    pub truth: SE3<f64>,
    /// The noisy control increment, as the filters see it.
    pub control: Vector6<f64>,
    /// One measurement per configured landmark, or none on steps without
    /// landmark observations.
    pub landmarks: Vec<Vector3<f64>>,
    pub gps: Option<Vector3<f64>>,
}

/// Deterministic (seeded) generator of [`Tick`]s.
///
/// The true pose moves with the nominal control; the filters get the nominal
/// control plus white noise, and noisy measurements of the true pose.
pub struct Simulator {
    config: ScenarioConfig,
    rng: StdRng,
    truth: SE3<f64>,
    landmarks: Vec<Point3<f64>>,
    step: usize,
}

impl Simulator {
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            "[Simulator] {} steps of {} s, {} landmarks, seed {}",
            config.steps,
            config.dt,
            config.landmarks.len(),
            config.seed
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            truth: SE3::identity(),
            landmarks: config.landmark_points().collect(),
            step: 0,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    #[inline]
    pub fn truth(&self) -> &SE3<f64> {
        &self.truth
    }

    /// Where the filters start: the true pose, or a draw from the initial
    /// covariance around it.
    pub fn initial_estimate(&mut self) -> SE3<f64> {
        if !self.config.sample_initial_state {
            return self.truth.clone();
        }
        let std_devs = self.config.initial_covariance().diagonal().map(f64::sqrt);
        let offset = self.gaussian(&std_devs);
        self.truth.plus(&offset)
    }

    fn gaussian<const D: usize>(&mut self, std_devs: &Tangent<f64, D>) -> Tangent<f64, D> {
        std_devs.map(|sigma| {
            if sigma == 0.0 {
                return 0.0;
            }
            let n: f64 = self.rng.sample(StandardNormal);
            n * sigma
        })
    }
}

impl Iterator for Simulator {
    type Item = Tick;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step >= self.config.steps {
            return None;
        }
        let step = self.step;
        self.step += 1;

        let dt = self.config.dt;
        let NoiseConfig {
            odometry,
            gyro,
            landmark,
            gps,
        } = self.config.noise;

        // velocity noise of density σ, sampled at 1/dt
        let sqrt_dt = dt.sqrt();
        let velocity_std = Vector6::new(odometry, odometry, odometry, gyro, gyro, gyro) / sqrt_dt;
        let velocity = Vector6::from(self.config.velocity);
        let control = (velocity + self.gaussian(&velocity_std)) * dt;

        self.truth = self.truth.plus(&(velocity * dt));

        let landmarks = if step % self.config.landmark_period == 0 {
            let std_devs = Vector3::repeat(landmark);
            (0..self.landmarks.len())
                .map(|i| {
                    self.truth.inverse_act(&self.landmarks[i]).coords + self.gaussian(&std_devs)
                })
                .collect()
        } else {
            Vec::new()
        };
        let gps = (step % self.config.gps_period == 0)
            .then(|| *self.truth.translation() + self.gaussian(&Vector3::repeat(gps)));

        Some(Tick {
            step,
            time: step as f64 * dt,
            truth: self.truth.clone(),
            control,
            landmarks,
            gps,
        })
    }
}

/// Integrates the noisy controls without any correction.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadReckoning<G> {
    state: G,
}

impl<G: Clone> DeadReckoning<G> {
    pub const fn new(state: G) -> Self {
        Self { state }
    }

    pub fn propagate<F, const N: usize>(&mut self, model: &F, control: &Tangent<G::Element, N>)
    where
        G: LieGroup<N>,
        F: MotionModel<G, N>,
    {
        self.state = model.predict(&self.state, control);
    }

    #[inline]
    pub fn state(&self) -> &G {
        &self.state
    }
}
