use nalgebra::{Matrix3, RealField, SMatrix, Vector3};

use crate::{covariance::Noise, error::ConfigError, lie::SE3};

use super::MeasurementModel;

/// A position fix: the translation of the pose, in the world frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPosition<T: RealField + Copy> {
    noise: Noise<T, 3>,
}

impl<T: RealField + Copy> GpsPosition<T> {
    pub fn new(noise: Matrix3<T>) -> Result<Self, ConfigError> {
        Ok(Self {
            noise: Noise::new(noise, "gps noise")?,
        })
    }
}

impl<T: RealField + Copy> MeasurementModel<SE3<T>, 6, 3> for GpsPosition<T> {
    #[inline]
    fn predict(&self, state: &SE3<T>) -> Vector3<T> {
        *state.translation()
    }

    /// `[R | 0]`
    fn jacobian_state(&self, state: &SE3<T>) -> SMatrix<T, 3, 6> {
        let mut jacobian = SMatrix::<T, 3, 6>::zeros();
        jacobian
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(state.rotation().matrix());
        jacobian
    }

    #[inline]
    fn noise(&self) -> &Noise<T, 3> {
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::numerical_jacobian;
    use approx::assert_relative_eq;

    #[test]
    fn test_jacobian_numerically() {
        let model = GpsPosition::new(Matrix3::identity() * 6e-3).unwrap();
        let state = SE3::from_parts(Vector3::new(2.0, -0.3, 1.0), Vector3::new(0.7, 0.2, -0.1));
        let numerical = numerical_jacobian::<SE3<f64>, 6, 3>(&state, |x| model.predict(x));
        assert_relative_eq!(model.jacobian_state(&state), numerical, epsilon = 1e-7);
        assert_eq!(model.predict(&state), Vector3::new(2.0, -0.3, 1.0));
    }
}
