//! Matrix Lie groups used as filter states.
//!
//! Every filter moves its estimate with the right retraction `X ⊕ τ = X·Exp(τ)`
//! (the invariant filter additionally uses the left one, `τ ⊕ X = Exp(τ)·X`), and
//! expresses one state relative to another with `A ⊖ B = Log(B⁻¹·A)`.

pub mod se3;
pub mod so3;

use std::fmt::Debug;

use nalgebra::{RealField, SMatrix, SVector};

pub use se3::SE3;

/// A vector of the tangent space (Lie algebra in vector form).
pub type Tangent<T, const DOF: usize> = SVector<T, DOF>;

/// A square matrix acting on tangent vectors, e.g. an adjoint or a Jacobian.
pub type Jacobian<T, const DOF: usize> = SMatrix<T, DOF, DOF>;

pub trait LieGroup<const DOF: usize>: Clone + Debug {
    type Element: RealField + Copy;

    fn identity() -> Self;

    /// `self · rhs`
    fn compose(&self, rhs: &Self) -> Self;

    fn inverse(&self) -> Self;

    fn exp(tau: &Tangent<Self::Element, DOF>) -> Self;

    /// Inverse of [`LieGroup::exp`] inside the injectivity radius.
    ///
    /// Close to the cut locus (rotations of angle π) the result loses precision
    /// but stays a valid tangent vector.
    fn log(&self) -> Tangent<Self::Element, DOF>;

    /// The adjoint matrix `Ad(X)`, with `X·Exp(τ) = Exp(Ad(X)·τ)·X`.
    fn adjoint(&self) -> Jacobian<Self::Element, DOF>;

    /// Right retraction `X ⊕ τ = X·Exp(τ)`.
    #[inline]
    fn plus(&self, tau: &Tangent<Self::Element, DOF>) -> Self {
        self.compose(&Self::exp(tau))
    }

    /// Left retraction `τ ⊕ X = Exp(τ)·X`.
    #[inline]
    fn left_plus(&self, tau: &Tangent<Self::Element, DOF>) -> Self {
        Self::exp(tau).compose(self)
    }

    /// Right minus `self ⊖ other = Log(other⁻¹·self)`.
    #[inline]
    fn minus(&self, other: &Self) -> Tangent<Self::Element, DOF> {
        other.inverse().compose(self).log()
    }

    /// `Ad(X)⁻¹`, which equals `Ad(X⁻¹)`.
    #[inline]
    fn adjoint_inverse(&self) -> Jacobian<Self::Element, DOF> {
        self.inverse().adjoint()
    }
}

/// Norm of the tangent difference `a ⊖ b`, scaled per component by `weights`.
pub fn weighted_distance<G, const DOF: usize>(
    a: &G,
    b: &G,
    weights: &Tangent<G::Element, DOF>,
) -> G::Element
where
    G: LieGroup<DOF>,
{
    a.minus(b).component_mul(weights).norm()
}
