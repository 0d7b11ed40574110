//! Motion and measurement models consumed by the filters.
//!
//! Jacobians are taken with respect to a right perturbation of the state,
//! `X ⊕ δ = X·Exp(δ)`.

pub mod gps;
pub mod landmark;
pub mod motion;

use nalgebra::{SMatrix, SVector};

pub use gps::GpsPosition;
pub use landmark::Landmark3D;
pub use motion::LieSystemModel;

use crate::{
    covariance::Noise,
    lie::{Jacobian, LieGroup, Tangent},
};

pub trait MotionModel<G: LieGroup<N>, const N: usize> {
    /// `f(X, u)`, the state after applying the control increment `u`.
    fn predict(&self, state: &G, control: &Tangent<G::Element, N>) -> G;

    /// `∂f/∂X`
    fn jacobian_state(&self, state: &G, control: &Tangent<G::Element, N>)
    -> Jacobian<G::Element, N>;

    /// `∂f/∂w`, for a noise `w` drawn from [`MotionModel::noise`].
    fn jacobian_noise(&self, state: &G, control: &Tangent<G::Element, N>)
    -> Jacobian<G::Element, N>;

    fn noise(&self) -> &Noise<G::Element, N>;
}

pub trait MeasurementModel<G: LieGroup<N>, const N: usize, const M: usize> {
    /// `h(X)`, the expected measurement.
    fn predict(&self, state: &G) -> SVector<G::Element, M>;

    /// `∂h/∂X`
    fn jacobian_state(&self, state: &G) -> SMatrix<G::Element, M, N>;

    fn noise(&self) -> &Noise<G::Element, M>;
}

#[cfg(test)]
pub(crate) mod testing {
    use nalgebra::{SMatrix, SVector};

    use crate::lie::{LieGroup, Tangent};

    /// Central differences of `f` along right perturbations of `state`.
    pub fn numerical_jacobian<G, const N: usize, const M: usize>(
        state: &G,
        f: impl Fn(&G) -> SVector<f64, M>,
    ) -> SMatrix<f64, M, N>
    where
        G: LieGroup<N, Element = f64>,
    {
        let step = 1e-6;
        let mut jacobian = SMatrix::<f64, M, N>::zeros();
        for i in 0..N {
            let mut delta = Tangent::<f64, N>::zeros();
            delta[i] = step;
            let forward = f(&state.plus(&delta));
            let backward = f(&state.plus(&-delta));
            jacobian.set_column(i, &((forward - backward) / (2.0 * step)));
        }
        jacobian
    }
}
