//! Unscented Kalman filter on manifolds.
//!
//! Sigma points are drawn in the tangent space at the estimate and retracted
//! onto the group, `Xᵢ = X̂ ⊕ δᵢ`. After propagation their mean is found on the
//! group by a fixed-point iteration, and the covariance is rebuilt from the
//! displacements `Xᵢ ⊖ X̄`.

use itertools::izip;
use nalgebra::{Cholesky, Const, RealField, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use simba::scalar::SupersetOf;
use tracing::{trace, warn};

use crate::{
    covariance::Covariance,
    error::{ConfigError, NumericalError},
    lie::{Jacobian, LieGroup, Tangent},
    model::{MeasurementModel, MotionModel},
    uncertain::Uncertained,
    utils::{solve_right_spd, symmetrize, to_f64},
};

use super::KalmanFilter;

/// Parameters of the scaled unscented transform and of the mean iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + SupersetOf<f64>"))]
pub struct UnscentedConfig<T> {
    /// Spread of the sigma points.
    pub alpha: T,
    /// Prior knowledge of the distribution, 2 is optimal for a Gaussian.
    pub beta: T,
    pub kappa: T,
    /// The mean iteration stops once its step is shorter than this.
    pub mean_tolerance: T,
    pub max_mean_iterations: usize,
}

impl<T: SupersetOf<f64>> Default for UnscentedConfig<T> {
    fn default() -> Self {
        Self {
            alpha: nalgebra::convert(1.0),
            beta: nalgebra::convert(2.0),
            kappa: nalgebra::convert(0.0),
            mean_tolerance: nalgebra::convert(1e-10),
            max_mean_iterations: 20,
        }
    }
}

/// Weights of the `2n+1` sigma points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Weights<T> {
    /// `√(n+λ)`
    gamma: T,
    mean_center: T,
    cov_center: T,
    /// Mean and covariance weight of every other point.
    other: T,
}

impl<T: RealField + Copy> Weights<T> {
    fn new(config: &UnscentedConfig<T>, n: usize) -> Result<Self, ConfigError> {
        let UnscentedConfig {
            alpha,
            beta,
            kappa,
            mean_tolerance,
            max_mean_iterations,
        } = *config;
        if !(alpha.is_finite() && alpha > T::zero()) {
            return Err(ConfigError::InvalidUnscented("alpha must be positive"));
        }
        if !(beta.is_finite() && kappa.is_finite()) {
            return Err(ConfigError::InvalidUnscented("beta and kappa must be finite"));
        }
        if !(mean_tolerance.is_finite() && mean_tolerance > T::zero()) {
            return Err(ConfigError::InvalidUnscented("mean tolerance must be positive"));
        }
        if max_mean_iterations == 0 {
            return Err(ConfigError::InvalidUnscented(
                "at least one mean iteration is required",
            ));
        }

        let n: T = nalgebra::convert(n as f64);
        if n + kappa <= T::zero() {
            return Err(ConfigError::InvalidUnscented("n + kappa must be positive"));
        }
        let alpha_sq = alpha * alpha;
        let lambda = alpha_sq * (n + kappa) - n;
        let mean_center = lambda / (n + lambda);
        Ok(Self {
            gamma: (n + lambda).sqrt(),
            mean_center,
            cov_center: mean_center + T::one() - alpha_sq + beta,
            other: T::one() / (nalgebra::convert::<_, T>(2.0) * (n + lambda)),
        })
    }

    /// Mean weights, center point first.
    fn mean(&self, len: usize) -> impl Iterator<Item = T> + '_ {
        std::iter::once(self.mean_center).chain(std::iter::repeat_n(self.other, len - 1))
    }

    /// Covariance weights, center point first.
    fn cov(&self, len: usize) -> impl Iterator<Item = T> + '_ {
        std::iter::once(self.cov_center).chain(std::iter::repeat_n(self.other, len - 1))
    }
}

#[derive(Debug, Clone)]
pub struct Ukfm<G: LieGroup<N>, const N: usize> {
    estimate: Uncertained<G, N>,
    config: UnscentedConfig<G::Element>,
    weights: Weights<G::Element>,
}

impl<G: LieGroup<N>, const N: usize> Ukfm<G, N> {
    pub fn new(state: G, cov: Covariance<G::Element, N>) -> Result<Self, ConfigError> {
        Self::with_config(state, cov, UnscentedConfig::default())
    }

    pub fn with_config(
        state: G,
        cov: Covariance<G::Element, N>,
        config: UnscentedConfig<G::Element>,
    ) -> Result<Self, ConfigError> {
        let cov = Covariance::new(cov.0, "initial covariance")?;
        let weights = Weights::new(&config, N)?;
        Ok(Self {
            estimate: Uncertained::new(state, cov),
            config,
            weights,
        })
    }

    #[inline]
    pub fn config(&self) -> &UnscentedConfig<G::Element> {
        &self.config
    }

    fn cholesky(&self) -> Result<Cholesky<G::Element, Const<N>>, NumericalError> {
        Cholesky::new(*self.estimate.cov).ok_or(NumericalError::NonPositivePivot)
    }

    /// `±γ·Lᵢ` for every column of the Cholesky factor `L` of the covariance.

    fn spread(&self, factor: &Jacobian<G::Element, N>) -> Vec<Tangent<G::Element, N>> {
        factor
            .column_iter()
            .flat_map(|column| {
                let delta = column * self.weights.gamma;
                [delta, -delta]
            })
            .collect()
    }

    /// Weighted mean of `points` on the group, starting from `reference`.
    fn manifold_mean(&self, reference: &G, points: &[G]) -> Result<G, NumericalError> {
        let mut mean = reference.clone();
        let mut residual: G::Element = nalgebra::zero();
        for iteration in 1..=self.config.max_mean_iterations {
            let step = izip!(points, self.weights.mean(points.len())).fold(
                Tangent::<G::Element, N>::zeros(),
                |acc, (point, weight)| acc + point.minus(&mean) * weight,
            );
            mean = mean.plus(&step);
            residual = step.norm();
            if residual < self.config.mean_tolerance {
                trace!("[UKFM] mean converged in {} iterations", iteration);
                return Ok(mean);
            }
        }
        Err(NumericalError::MeanNotConverged {
            iterations: self.config.max_mean_iterations,
            residual: to_f64(residual),
        })
    }
}

impl<G: LieGroup<N>, const N: usize> KalmanFilter<G, N> for Ukfm<G, N> {
    fn propagate<F>(
        &mut self,
        model: &F,
        control: &Tangent<G::Element, N>,
    ) -> Result<(), NumericalError>
    where
        F: MotionModel<G, N>,
    {
        let x = &self.estimate.state;
        let deltas = self
            .cholesky()
            .map(|cholesky| self.spread(&cholesky.l()))
            .inspect_err(|e| warn!("[UKFM] propagate rejected: {}", e))?;

        let points: Vec<G> = std::iter::once(model.predict(x, control))
            .chain(deltas.iter().map(|delta| model.predict(&x.plus(delta), control)))
            .collect();
        let mean = self
            .manifold_mean(&points[0], &points)
            .inspect_err(|e| warn!("[UKFM] propagate rejected: {}", e))?;

        let mut cov = Jacobian::<G::Element, N>::zeros();
        for (point, weight) in izip!(&points, self.weights.cov(points.len())) {
            let displacement = point.minus(&mean);
            cov += displacement * displacement.transpose() * weight;
        }

        // Process noise enters through its own sigma points, `u + G·(±γ·Qˡᵢ)`.
        let g = model.jacobian_noise(x, control);
        for noise in self.spread(model.noise().factor()) {
            let displacement = model.predict(x, &(control + g * noise)).minus(&mean);
            cov += displacement * displacement.transpose() * self.weights.other;
        }

        self.estimate
            .commit(mean, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[UKFM] propagate rejected: {}", e))
    }

    fn update<H, const M: usize>(
        &mut self,
        model: &H,
        measurement: &SVector<G::Element, M>,
    ) -> Result<(), NumericalError>
    where
        H: MeasurementModel<G, N, M>,
    {
        let x = &self.estimate.state;
        let cholesky = self
            .cholesky()
            .inspect_err(|e| warn!("[UKFM] update rejected: {}", e))?;
        let deltas = self.spread(&cholesky.l());

        let predicted: Vec<SVector<G::Element, M>> = std::iter::once(model.predict(x))
            .chain(deltas.iter().map(|delta| model.predict(&x.plus(delta))))
            .collect();
        let expected = izip!(&predicted, self.weights.mean(predicted.len()))
            .fold(SVector::<G::Element, M>::zeros(), |acc, (y, weight)| {
                acc + y * weight
            });

        let r = **model.noise().covariance();
        let mut s = r;
        let mut cross = SMatrix::<G::Element, N, M>::zeros();
        for (y, weight) in izip!(&predicted, self.weights.cov(predicted.len())) {
            let residual = y - expected;
            s += residual * residual.transpose() * weight;
        }
        // the center point has no displacement
        for (delta, y) in izip!(&deltas, &predicted[1..]) {
            cross += delta * (y - expected).transpose() * self.weights.other;
        }

        let gain = solve_right_spd(&cross, s)
            .inspect_err(|e| warn!("[UKFM] update rejected: {}", e))?;
        let state = x.plus(&(gain * (measurement - expected)));

        // Joseph form with the statistically linearized `H̃ = Cᵗ·P⁻¹`
        let h = cholesky.solve(&cross).transpose();
        let i_kh = Jacobian::<G::Element, N>::identity() - gain * h;
        let cov = i_kh * *self.estimate.cov * i_kh.transpose() + gain * r * gain.transpose();

        self.estimate
            .commit(state, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[UKFM] update rejected: {}", e))
    }

    #[inline]
    fn state(&self) -> &G {
        &self.estimate.state
    }

    #[inline]
    fn covariance(&self) -> Covariance<G::Element, N> {
        self.estimate.cov.clone()
    }
}
