use nalgebra::{Matrix3, Point3, RealField, SMatrix, Vector3};

use crate::{covariance::Noise, error::ConfigError, lie::SE3, lie::so3};

use super::MeasurementModel;

/// Cartesian observation of a known world-frame landmark `b`, expressed in the
/// body frame: `y = X⁻¹·b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmark3D<T: RealField + Copy> {
    landmark: Point3<T>,
    noise: Noise<T, 3>,
}

impl<T: RealField + Copy> Landmark3D<T> {
    pub fn new(landmark: Point3<T>, noise: Matrix3<T>) -> Result<Self, ConfigError> {
        Ok(Self {
            landmark,
            noise: Noise::new(noise, "landmark noise")?,
        })
    }

    #[inline]
    pub fn landmark(&self) -> &Point3<T> {
        &self.landmark
    }
}

impl<T: RealField + Copy> MeasurementModel<SE3<T>, 6, 3> for Landmark3D<T> {
    #[inline]
    fn predict(&self, state: &SE3<T>) -> Vector3<T> {
        state.inverse_act(&self.landmark).coords
    }

    /// `[-I | [y]×]`
    fn jacobian_state(&self, state: &SE3<T>) -> SMatrix<T, 3, 6> {
        let y = self.predict(state);
        let mut jacobian = SMatrix::<T, 3, 6>::zeros();
        jacobian.fixed_view_mut::<3, 3>(0, 0).fill_diagonal(-T::one());
        jacobian.fixed_view_mut::<3, 3>(0, 3).copy_from(&so3::skew(&y));
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
    use crate::{lie::LieGroup, model::testing::numerical_jacobian};
    use approx::assert_relative_eq;

    fn model() -> Landmark3D<f64> {
        Landmark3D::new(Point3::new(3.0, -1.0, -1.0), Matrix3::identity() * 1e-4).unwrap()
    }

    #[test]
    fn test_predict_in_body_frame() {
        let model = model();
        assert_eq!(
            model.predict(&SE3::identity()),
            Vector3::new(3.0, -1.0, -1.0)
        );

        let state = SE3::from_parts(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        // body x axis points along world y
        assert_relative_eq!(
            model.predict(&state),
            Vector3::new(-1.0, -2.0, -1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_jacobian_numerically() {
        let model = model();
        let state = SE3::from_parts(Vector3::new(0.4, 0.3, -0.2), Vector3::new(0.1, -0.6, 0.3));
        let numerical = numerical_jacobian::<SE3<f64>, 6, 3>(&state, |x| model.predict(x));
        assert_relative_eq!(model.jacobian_state(&state), numerical, epsilon = 1e-7);
    }

    #[test]
    fn test_rejects_asymmetric_noise() {
        let mut noise = Matrix3::identity();
        noise[(0, 1)] = 0.5;
        assert!(Landmark3D::new(Point3::origin(), noise).is_err());
    }
}
