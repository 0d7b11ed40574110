//! SE(3), rigid transformations of 3D space.
//!
//! Tangent vectors are laid out as `[ρ; θ]`: translational part first, rotational
//! part second.
//!
//! ```text
//!     X = | R  t |        Exp([ρ; θ]) = | Exp(θ)  Jl(θ)·ρ |
//!         | 0  1 |                      |   0        1    |
//! ```

use nalgebra::{
    IsometryMatrix3, Matrix3, Point3, RealField, Rotation3, Translation3, Vector3, Vector6,
};

use super::{Jacobian, LieGroup, Tangent, so3};

/// A rigid transformation, stored as a rotation matrix and a translation.
///
/// The rotation is re-orthonormalized after every composition, so repeated
/// propagation never drifts away from SO(3).
#[derive(Debug, Clone, PartialEq)]
pub struct SE3<T: RealField>(IsometryMatrix3<T>);

impl<T: RealField + Copy> SE3<T> {
    pub fn new(rotation: Rotation3<T>, translation: Vector3<T>) -> Self {
        let rotation = so3::renormalize(rotation.matrix());
        Self(IsometryMatrix3::from_parts(
            Translation3::from(translation),
            rotation,
        ))
    }

    /// Builds a pose from a translation and a rotation vector.
    pub fn from_parts(translation: Vector3<T>, rotation_vector: Vector3<T>) -> Self {
        Self::new(so3::exp(&rotation_vector), translation)
    }

    #[inline]
    pub fn rotation(&self) -> &Rotation3<T> {
        &self.0.rotation
    }

    #[inline]
    pub fn translation(&self) -> &Vector3<T> {
        &self.0.translation.vector
    }

    #[inline]
    pub fn isometry(&self) -> &IsometryMatrix3<T> {
        &self.0
    }

    /// `X·p`, a body-frame point expressed in the world frame.
    #[inline]
    pub fn act(&self, point: &Point3<T>) -> Point3<T> {
        self.0.transform_point(point)
    }

    /// `X⁻¹·p`, a world-frame point expressed in the body frame.
    #[inline]
    pub fn inverse_act(&self, point: &Point3<T>) -> Point3<T> {
        self.0.inverse_transform_point(point)
    }
}

impl<T: RealField + Copy> Default for SE3<T> {
    fn default() -> Self {
        <Self as LieGroup<6>>::identity()
    }
}

impl<T: RealField + Copy> LieGroup<6> for SE3<T> {
    type Element = T;

    #[inline]
    fn identity() -> Self {
        Self(IsometryMatrix3::identity())
    }

    fn compose(&self, rhs: &Self) -> Self {
        let mut isometry = &self.0 * &rhs.0;
        isometry.rotation = so3::renormalize(isometry.rotation.matrix());
        Self(isometry)
    }

    #[inline]
    fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    fn exp(tau: &Tangent<T, 6>) -> Self {
        let rho: Vector3<T> = tau.fixed_rows::<3>(0).into_owned();
        let theta: Vector3<T> = tau.fixed_rows::<3>(3).into_owned();
        let translation = so3::left_jacobian(&theta) * rho;
        Self(IsometryMatrix3::from_parts(
            Translation3::from(translation),
            so3::exp(&theta),
        ))
    }

    fn log(&self) -> Tangent<T, 6> {
        let theta = so3::log(self.rotation());
        let rho = so3::left_jacobian_inv(&theta) * self.translation();
        Vector6::new(rho.x, rho.y, rho.z, theta.x, theta.y, theta.z)
    }

    /// ```text
    /// Ad(X) = | R  [t]×R |
    ///         | 0    R   |
    /// ```
    fn adjoint(&self) -> Jacobian<T, 6> {
        let rotation: &Matrix3<T> = self.rotation().matrix();
        let mut adjoint = Jacobian::<T, 6>::zeros();
        adjoint.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        adjoint.fixed_view_mut::<3, 3>(3, 3).copy_from(rotation);
        adjoint
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(so3::skew(self.translation()) * rotation));
        adjoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix4;

    type SE3 = super::SE3<f64>;

    fn sample_pose() -> SE3 {
        SE3::from_parts(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.3, 0.2, -0.9))
    }

    #[test]
    fn test_log_exp_round_trip() {
        for tau in [
            Vector6::new(0.1, 0.2, -0.3, 0.4, -0.5, 0.6),
            Vector6::new(1.0, 0.0, 0.0, 0.0, 0.0, 1e-10),
            Vector6::new(0.001, 0.0, 0.0005, 0.0, 0.0, 0.0005),
            Vector6::zeros(),
        ] {
            assert_relative_eq!(SE3::exp(&tau).log(), tau, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exp_log_round_trip() {
        let pose = sample_pose();
        let recovered = SE3::exp(&pose.log());
        assert_relative_eq!(
            recovered.isometry().to_homogeneous(),
            pose.isometry().to_homogeneous(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_exp_matches_matrix_exponential() {
        // a screw motion is a one-parameter subgroup: Exp(τ) = Exp(τ/N)^N
        let tau = Vector6::new(0.4, 0.0, 0.1, 0.0, 0.0, 0.8);
        let steps = 20_000;
        let small = SE3::exp(&(tau / steps as f64));
        let integrated = (0..steps).fold(SE3::identity(), |acc, _| acc.compose(&small));
        let closed: Matrix4<f64> = SE3::exp(&tau).isometry().to_homogeneous();
        assert_relative_eq!(integrated.isometry().to_homogeneous(), closed, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_and_compose() {
        let pose = sample_pose();
        let identity = pose.compose(&pose.inverse());
        assert_relative_eq!(identity.log(), Vector6::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_plus_minus() {
        let pose = sample_pose();
        let tau = Vector6::new(0.05, -0.02, 0.01, 0.03, 0.0, -0.04);
        assert_relative_eq!(pose.plus(&tau).minus(&pose), tau, epsilon = 1e-12);
    }

    #[test]
    fn test_adjoint_moves_perturbation_sides() {
        // X·Exp(τ) = Exp(Ad(X)·τ)·X
        let pose = sample_pose();
        let tau = Vector6::new(0.2, 0.1, -0.3, 0.05, 0.1, 0.02);
        let right = pose.plus(&tau);
        let left = pose.left_plus(&(pose.adjoint() * tau));
        assert_relative_eq!(right.minus(&left), Vector6::zeros(), epsilon = 1e-12);
        assert_relative_eq!(
            pose.adjoint_inverse() * pose.adjoint(),
            Jacobian::<f64, 6>::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_act() {
        let pose = sample_pose();
        let point = Point3::new(2.0, 0.0, -1.0);
        assert_relative_eq!(pose.inverse_act(&pose.act(&point)), point, epsilon = 1e-12);
        assert_relative_eq!(
            pose.act(&point),
            pose.rotation() * point + pose.translation(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rotation_stays_orthonormal() {
        let step = SE3::exp(&Vector6::new(0.001, 0.0, 0.0005, 0.013, -0.007, 0.0105));
        let pose = (0..100_000).fold(SE3::identity(), |acc, _| acc.compose(&step));
        let rotation = pose.rotation().matrix();
        assert_relative_eq!(
            rotation.transpose() * rotation,
            Matrix3::identity(),
            epsilon = 1e-13
        );
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-13);
    }
}
