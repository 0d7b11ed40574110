//! SO(3) helpers backing the SE(3) maps.
//!
//! Jacobians follow the usual convention `Exp(φ + δφ) ≈ Exp(φ)·Exp(Jr(φ)·δφ)`
//! and `Exp(φ + δφ) ≈ Exp(Jl(φ)·δφ)·Exp(φ)`, with `Jr(φ) = Jl(-φ)`.

use nalgebra::{Matrix3, RealField, Rotation3, UnitQuaternion, Vector3};

/// Below this angle the Jacobians switch to their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-3;

/// The skew-symmetric matrix `[v]×` with `[v]×·u = v × u`.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
pub fn skew<T: RealField + Copy>(v: &Vector3<T>) -> Matrix3<T> {
    let zero = T::zero();
    Matrix3::new(
        zero, -v.z, v.y, //
        v.z, zero, -v.x, //
        -v.y, v.x, zero,
    )
}

#[inline]
pub fn exp<T: RealField + Copy>(phi: &Vector3<T>) -> Rotation3<T> {
    Rotation3::new(*phi)
}

/// Rotation vector of `rotation`, with angle in `[0, π]`.
///
/// Goes through the unit quaternion so that the angle keeps full precision both
/// close to the identity and close to π.
pub fn log<T: RealField + Copy>(rotation: &Rotation3<T>) -> Vector3<T> {
    let quaternion = UnitQuaternion::from_rotation_matrix(rotation);
    let (w, imag) = if quaternion.scalar() < T::zero() {
        (-quaternion.scalar(), -quaternion.imag())
    } else {
        (quaternion.scalar(), quaternion.imag())
    };
    let two: T = nalgebra::convert(2.0);
    let sin_half = imag.norm();
    if sin_half <= T::default_epsilon() {
        imag * (two / w)
    } else {
        imag * (two * sin_half.atan2(w) / sin_half)
    }
}

/// `Jl(φ) = I + (1 - cos θ)/θ² [φ]× + (θ - sin θ)/θ³ [φ]×²`
pub fn left_jacobian<T: RealField + Copy>(phi: &Vector3<T>) -> Matrix3<T> {
    let theta_sq = phi.norm_squared();
    let hat = skew(phi);
    let hat_sq = hat * hat;

    let (a, b) = if theta_sq < nalgebra::convert(SMALL_ANGLE * SMALL_ANGLE) {
        (
            nalgebra::convert::<_, T>(0.5) - theta_sq / nalgebra::convert(24.0),
            nalgebra::convert::<_, T>(1.0 / 6.0) - theta_sq / nalgebra::convert(120.0),
        )
    } else {
        let theta = theta_sq.sqrt();
        (
            (T::one() - theta.cos()) / theta_sq,
            (theta - theta.sin()) / (theta_sq * theta),
        )
    };

    Matrix3::identity() + hat * a + hat_sq * b
}

/// `Jl⁻¹(φ) = I - ½[φ]× + (1/θ² - (1 + cos θ)/(2θ sin θ)) [φ]×²`
pub fn left_jacobian_inv<T: RealField + Copy>(phi: &Vector3<T>) -> Matrix3<T> {
    let theta_sq = phi.norm_squared();
    let hat = skew(phi);
    let hat_sq = hat * hat;
    let half: T = nalgebra::convert(0.5);

    let c = if theta_sq < nalgebra::convert(SMALL_ANGLE * SMALL_ANGLE) {
        nalgebra::convert::<_, T>(1.0 / 12.0) + theta_sq / nalgebra::convert(720.0)
    } else {
        let theta = theta_sq.sqrt();
        T::one() / theta_sq - (T::one() + theta.cos()) / (theta * theta.sin() * nalgebra::convert(2.0))
    };

    Matrix3::identity() - hat * half + hat_sq * c
}

#[inline]
pub fn right_jacobian<T: RealField + Copy>(phi: &Vector3<T>) -> Matrix3<T> {
    left_jacobian(&-phi)
}

#[inline]
pub fn right_jacobian_inv<T: RealField + Copy>(phi: &Vector3<T>) -> Matrix3<T> {
    left_jacobian_inv(&-phi)
}

/// Projects an almost-orthonormal matrix back onto SO(3) by Gram–Schmidt.
///
/// The first column keeps its direction, the third one is rebuilt as a cross
/// product so the result always has determinant +1.
pub fn renormalize<T: RealField + Copy>(matrix: &Matrix3<T>) -> Rotation3<T> {
    let x = matrix.column(0).normalize();
    let y = (matrix.column(1) - x * x.dot(&matrix.column(1))).normalize();
    let z = x.cross(&y);
    Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]))
}
