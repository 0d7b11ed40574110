//! Extended Kalman filter on a Lie group.
//!
//! The error is the right perturbation `δ = X̂⁻¹·X`, so the covariance lives in
//! the tangent space at the current estimate.

use nalgebra::SVector;
use tracing::warn;

use crate::{
    covariance::Covariance,
    error::{ConfigError, NumericalError},
    lie::{Jacobian, LieGroup, Tangent},
    model::{MeasurementModel, MotionModel},
    uncertain::Uncertained,
    utils::{solve_right_spd, symmetrize},
};

use super::KalmanFilter;

#[derive(Debug, Clone)]
pub struct Ekf<G: LieGroup<N>, const N: usize> {
    estimate: Uncertained<G, N>,
}

impl<G: LieGroup<N>, const N: usize> Ekf<G, N> {
    pub fn new(state: G, cov: Covariance<G::Element, N>) -> Result<Self, ConfigError> {
        let cov = Covariance::new(cov.0, "initial covariance")?;
        Ok(Self {
            estimate: Uncertained::new(state, cov),
        })
    }
}

impl<G: LieGroup<N>, const N: usize> KalmanFilter<G, N> for Ekf<G, N> {
    fn propagate<F>(
        &mut self,
        model: &F,
        control: &Tangent<G::Element, N>,
    ) -> Result<(), NumericalError>
    where
        F: MotionModel<G, N>,
    {
        let x = &self.estimate.state;
        let f = model.jacobian_state(x, control);
        let g = model.jacobian_noise(x, control);
        let q = model.noise().covariance();

        let state = model.predict(x, control);
        let cov = f * *self.estimate.cov * f.transpose() + g * **q * g.transpose();

        self.estimate
            .commit(state, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[EKF] propagate rejected: {}", e))
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
        let p = *self.estimate.cov;
        let r = **model.noise().covariance();

        let innovation = measurement - model.predict(x);
        let h = model.jacobian_state(x);
        let pht = p * h.transpose();
        let s = h * pht + r;
        let gain = solve_right_spd(&pht, s)
            .inspect_err(|e| warn!("[EKF] update rejected: {}", e))?;

        let state = x.plus(&(gain * innovation));
        // Joseph form
        let i_kh = Jacobian::<G::Element, N>::identity() - gain * h;
        let cov = i_kh * p * i_kh.transpose() + gain * r * gain.transpose();

        self.estimate
            .commit(state, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[EKF] update rejected: {}", e))
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
