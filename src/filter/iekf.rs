//! Right-invariant extended Kalman filter.
//!
//! The error is `η = X·X̂⁻¹ = Exp(ξ)`, i.e. the true state is `X = Exp(ξ)·X̂`.
//! A right perturbation `δ` of the same state is `δ = Ad(X̂)⁻¹·ξ`, which is how
//! the Jacobians of the models are carried into this chart:
//!
//! ```text
//! F = Ad(X̂⁺)·F_right·Ad(X̂)⁻¹      G = Ad(X̂⁺)·G_right      H = H_right·Ad(X̂)⁻¹
//! ```
//!
//! For a motion `X⁺ = X·Exp(u)` the propagation Jacobian collapses to the
//! identity, whatever the estimate.

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
pub struct Iekf<G: LieGroup<N>, const N: usize> {
    /// State with the covariance of `ξ`.
    estimate: Uncertained<G, N>,
}

impl<G: LieGroup<N>, const N: usize> Iekf<G, N> {
    /// `cov` is the covariance of a right perturbation of `state`, like for the
    /// other filters.
    pub fn new(state: G, cov: Covariance<G::Element, N>) -> Result<Self, ConfigError> {
        let cov = Covariance::new(cov.0, "initial covariance")?;
        let adjoint = state.adjoint();
        let cov = Covariance(symmetrize(&(adjoint * *cov * adjoint.transpose())));
        Ok(Self {
            estimate: Uncertained::new(state, cov),
        })
    }

    /// Covariance of the invariant error `ξ`.
    #[inline]
    pub fn invariant_covariance(&self) -> &Covariance<G::Element, N> {
        &self.estimate.cov
    }

    /// `Ad(X̂⁺)·F_right·Ad(X̂)⁻¹`, the propagation Jacobian of `ξ`.
    pub fn propagation_jacobian<F>(
        model: &F,
        state: &G,
        control: &Tangent<G::Element, N>,
    ) -> Jacobian<G::Element, N>
    where
        F: MotionModel<G, N>,
    {
        let next = model.predict(state, control);
        next.adjoint() * model.jacobian_state(state, control) * state.adjoint_inverse()
    }
}

impl<G: LieGroup<N>, const N: usize> KalmanFilter<G, N> for Iekf<G, N> {
    fn propagate<F>(
        &mut self,
        model: &F,
        control: &Tangent<G::Element, N>,
    ) -> Result<(), NumericalError>
    where
        F: MotionModel<G, N>,
    {
        let x = &self.estimate.state;
        let state = model.predict(x, control);
        let f = Self::propagation_jacobian(model, x, control);
        let g = state.adjoint() * model.jacobian_noise(x, control);
        let q = model.noise().covariance();

        let cov = f * *self.estimate.cov * f.transpose() + g * **q * g.transpose();

        self.estimate
            .commit(state, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[IEKF] propagate rejected: {}", e))
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
        let h = model.jacobian_state(x) * x.adjoint_inverse();
        let pht = p * h.transpose();
        let s = h * pht + r;
        let gain = solve_right_spd(&pht, s)
            .inspect_err(|e| warn!("[IEKF] update rejected: {}", e))?;

        let state = x.left_plus(&(gain * innovation));
        let i_kh = Jacobian::<G::Element, N>::identity() - gain * h;
        let cov = i_kh * p * i_kh.transpose() + gain * r * gain.transpose();

        self.estimate
            .commit(state, Covariance(symmetrize(&cov)))
            .inspect_err(|e| warn!("[IEKF] update rejected: {}", e))
    }

    #[inline]
    fn state(&self) -> &G {
        &self.estimate.state
    }

    /// `Ad(X̂)⁻¹·P·Ad(X̂)⁻ᵗ`, the invariant covariance seen as the covariance of
    /// a right perturbation.
    fn covariance(&self) -> Covariance<G::Element, N> {
        let adjoint_inv = self.estimate.state.adjoint_inverse();
        Covariance(symmetrize(
            &(adjoint_inv * *self.estimate.cov * adjoint_inv.transpose()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lie::SE3,
        model::{Landmark3D, LieSystemModel},
    };
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Matrix6, Point3, Vector3, Vector6};

    fn sample_pose() -> SE3<f64> {
        SE3::from_parts(Vector3::new(1.0, 2.0, -0.5), Vector3::new(0.4, -0.2, 1.1))
    }

    #[test]
    fn test_covariance_round_trips_through_invariant_chart() {
        let mut p0 = Matrix6::identity() * 0.3;
        p0[(1, 4)] = 0.1;
        p0[(4, 1)] = 0.1;
        let iekf = Iekf::new(sample_pose(), Covariance(p0)).unwrap();
        assert_relative_eq!(*iekf.covariance(), p0, epsilon = 1e-12);
        assert!((**iekf.invariant_covariance() - p0).amax() > 1e-3);
    }

    #[test]
    fn test_propagation_jacobian_is_identity() {
        let motion = LieSystemModel::new(0.01, Matrix6::identity()).unwrap();
        let u = Vector6::new(0.1, 0.0, 0.05, 0.0, 0.0, 0.05);
        let jacobian = Iekf::<SE3<f64>, 6>::propagation_jacobian(&motion, &sample_pose(), &u);
        assert_relative_eq!(jacobian, Matrix6::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_update_corrects_on_the_left() {
        let truth = SE3::from_parts(Vector3::new(0.1, -0.05, 0.0), Vector3::new(0.0, 0.0, 0.02));
        let mut iekf = Iekf::new(SE3::identity(), Covariance(Matrix6::identity() * 0.1)).unwrap();

        let noise = Matrix3::identity() * 1e-6;
        let landmarks = [
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(-1.0, 1.0, 1.0),
        ]
        .map(|b| Landmark3D::new(b, noise).unwrap());

        for _ in 0..3 {
            for landmark in &landmarks {
                iekf.update(landmark, &landmark.predict(&truth)).unwrap();
            }
        }
        assert_relative_eq!(iekf.state().minus(&truth), Vector6::zeros(), epsilon = 1e-4);
    }
}
