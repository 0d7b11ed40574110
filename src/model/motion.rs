use nalgebra::{RealField, SMatrix};

use crate::{
    covariance::Noise,
    error::ConfigError,
    lie::{Jacobian, LieGroup, Tangent},
    utils::to_f64,
};

use super::MotionModel;

/// `X' = X·Exp(u + dt·w)`, with the control `u` already integrated over one
/// step and a white noise `w` of rate density `Q`.
#[derive(Debug, Clone, PartialEq)]
pub struct LieSystemModel<T: RealField + Copy, const N: usize> {
    dt: T,
    noise: Noise<T, N>,
}

impl<T: RealField + Copy, const N: usize> LieSystemModel<T, N> {
    pub fn new(dt: T, process_noise: SMatrix<T, N, N>) -> Result<Self, ConfigError> {
        if !dt.is_finite() || dt <= T::zero() {
            return Err(ConfigError::InvalidTimeStep(to_f64(dt)));
        }
        Ok(Self {
            dt,
            noise: Noise::new(process_noise, "process noise")?,
        })
    }

    #[inline]
    pub fn dt(&self) -> T {
        self.dt
    }
}

impl<G, const N: usize> MotionModel<G, N> for LieSystemModel<G::Element, N>
where
    G: LieGroup<N>,
{
    #[inline]
    fn predict(&self, state: &G, control: &Tangent<G::Element, N>) -> G {
        state.plus(control)
    }

    /// `Ad(Exp(u))⁻¹`, independent of the state.
    fn jacobian_state(&self, _: &G, control: &Tangent<G::Element, N>) -> Jacobian<G::Element, N> {
        G::exp(&-control).adjoint()
    }

    fn jacobian_noise(&self, _: &G, _: &Tangent<G::Element, N>) -> Jacobian<G::Element, N> {
        Jacobian::identity() * self.dt
    }

    #[inline]
    fn noise(&self) -> &Noise<G::Element, N> {
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lie::SE3, model::testing::numerical_jacobian};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix6, Vector3, Vector6};

    fn model() -> LieSystemModel<f64, 6> {
        LieSystemModel::new(0.01, Matrix6::identity() * 1e-3).unwrap()
    }

    #[test]
    fn test_rejects_bad_time_step() {
        assert_eq!(
            LieSystemModel::new(0.0, Matrix6::<f64>::identity()),
            Err(ConfigError::InvalidTimeStep(0.0))
        );
        assert!(LieSystemModel::new(f64::NAN, Matrix6::<f64>::identity()).is_err());
    }

    #[test]
    fn test_rejects_bad_noise() {
        let mut q = Matrix6::<f64>::identity();
        q[(0, 0)] = -1.0;
        assert!(matches!(
            LieSystemModel::new(0.01, q),
            Err(ConfigError::NotPositiveSemiDefinite { .. })
        ));
    }

    #[test]
    fn test_predict_composes_control() {
        let state = SE3::from_parts(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.5));
        let u = Vector6::new(0.1, 0.0, 0.0, 0.0, 0.0, 0.0);
        let next = MotionModel::<SE3<f64>, 6>::predict(&model(), &state, &u);
        let expected = state.rotation() * Vector3::new(0.1, 0.0, 0.0) + state.translation();
        assert_relative_eq!(*next.translation(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_state_numerically() {
        let model = model();
        let state = SE3::from_parts(Vector3::new(0.5, -1.0, 2.0), Vector3::new(0.2, 0.1, -0.4));
        let u = Vector6::new(0.3, -0.1, 0.05, 0.1, 0.2, -0.3);
        let next = model.predict(&state, &u);

        let numerical = numerical_jacobian::<SE3<f64>, 6, 6>(&state, |x| {
            model.predict(x, &u).minus(&next)
        });
        assert_relative_eq!(model.jacobian_state(&state, &u), numerical, epsilon = 1e-6);
    }

    #[test]
    fn test_jacobian_noise() {
        let model = model();
        let jacobian = MotionModel::<SE3<f64>, 6>::jacobian_noise(
            &model,
            &SE3::identity(),
            &Vector6::zeros(),
        );
        assert_eq!(jacobian, Matrix6::identity() * 0.01);
    }
}
