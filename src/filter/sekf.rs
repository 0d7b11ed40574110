//! Square-root extended Kalman filter.
//!
//! Keeps a lower-triangular factor `L` with `P = L·Lᵗ` and never forms `P`
//! while filtering. Both steps re-triangularize a stacked array of factors with
//! an orthogonal (QR) transform:
//!
//! ```text
//! propagate:  [ F·L | G·Qˡ ]  ──QR──▶  [ L⁺ | 0 ]
//!
//! update:     | Rˡ  H·L |  ──QR──▶  | Sˡ  0  |      K = K̄·Sˡ⁻¹
//!             | 0    L  |           | K̄   L⁺ |
//! ```

use nalgebra::{DMatrix, RealField, SMatrix, SVector};
use tracing::warn;

use crate::{
    covariance::Covariance,
    error::{ConfigError, NumericalError},
    lie::{Jacobian, LieGroup, Tangent},
    model::{MeasurementModel, MotionModel},
    utils::{symmetrize, to_dynamic, to_static, triangularize},
};

use super::KalmanFilter;

#[derive(Debug, Clone)]
pub struct Sekf<G: LieGroup<N>, const N: usize> {
    state: G,
    factor: Jacobian<G::Element, N>,
}

impl<G: LieGroup<N>, const N: usize> Sekf<G, N> {
    pub fn new(state: G, cov: Covariance<G::Element, N>) -> Result<Self, ConfigError> {
        let cov = Covariance::new(cov.0, "initial covariance")?;
        let factor = to_static(&triangularize(to_dynamic(&cov.factor())));
        Ok(Self { state, factor })
    }

    /// The lower-triangular factor `L` of the covariance.
    #[inline]
    pub fn factor(&self) -> &Jacobian<G::Element, N> {
        &self.factor
    }

    fn commit(&mut self, state: G, factor: Jacobian<G::Element, N>) -> Result<(), NumericalError> {
        if !factor.iter().all(|x| nalgebra::ComplexField::is_finite(x)) {
            return Err(NumericalError::CovarianceNotPsd);
        }
        self.state = state;
        self.factor = factor;
        Ok(())
    }
}

/// Whether `pivot` is too small to divide by, relative to the `scale` of the
/// factor it was taken from.
fn is_degenerate_pivot<T: RealField + Copy>(pivot: T, scale: T, size: usize) -> bool {
    pivot <= T::default_epsilon() * scale * nalgebra::convert(size as f64)
}

impl<G: LieGroup<N>, const N: usize> KalmanFilter<G, N> for Sekf<G, N> {
    fn propagate<F>(
        &mut self,
        model: &F,
        control: &Tangent<G::Element, N>,
    ) -> Result<(), NumericalError>
    where
        F: MotionModel<G, N>,
    {
        let x = &self.state;
        let f = model.jacobian_state(x, control);
        let g = model.jacobian_noise(x, control);

        let mut array = DMatrix::<G::Element>::zeros(N, 2 * N);
        array
            .fixed_view_mut::<N, N>(0, 0)
            .copy_from(&(f * self.factor));
        array
            .fixed_view_mut::<N, N>(0, N)
            .copy_from(&(g * model.noise().factor()));
        let factor = to_static(&triangularize(array));

        let state = model.predict(x, control);
        self.commit(state, factor)
            .inspect_err(|e| warn!("[SEKF] propagate rejected: {}", e))
    }

    fn update<H, const M: usize>(
        &mut self,
        model: &H,
        measurement: &SVector<G::Element, M>,
    ) -> Result<(), NumericalError>
    where
        H: MeasurementModel<G, N, M>,
    {
        let x = &self.state;
        let innovation = measurement - model.predict(x);
        let h = model.jacobian_state(x);

        let mut pre_array = DMatrix::<G::Element>::zeros(M + N, M + N);
        pre_array
            .fixed_view_mut::<M, M>(0, 0)
            .copy_from(model.noise().factor());
        pre_array
            .fixed_view_mut::<M, N>(0, M)
            .copy_from(&(h * self.factor));
        pre_array
            .fixed_view_mut::<N, N>(M, M)
            .copy_from(&self.factor);
        let post_array = triangularize(pre_array);

        let innovation_factor: SMatrix<G::Element, M, M> =
            post_array.fixed_view::<M, M>(0, 0).into_owned();
        let scale = innovation_factor.amax();
        if innovation_factor
            .diagonal()
            .iter()
            .any(|&pivot| is_degenerate_pivot(pivot, scale, M + N))
        {
            warn!("[SEKF] update rejected: {}", NumericalError::NonPositivePivot);
            return Err(NumericalError::NonPositivePivot);
        }

        // K·Sˡ = K̄  <=>  Sˡᵗ·Kᵗ = K̄ᵗ
        let scaled_gain: SMatrix<G::Element, N, M> =
            post_array.fixed_view::<N, M>(M, 0).into_owned();
        let gain = innovation_factor
            .transpose()
            .solve_upper_triangular(&scaled_gain.transpose())
            .ok_or(NumericalError::NonPositivePivot)?
            .transpose();

        let state = x.plus(&(gain * innovation));
        let factor = post_array.fixed_view::<N, N>(M, M).into_owned();
        self.commit(state, factor)
            .inspect_err(|e| warn!("[SEKF] update rejected: {}", e))
    }

    #[inline]
    fn state(&self) -> &G {
        &self.state
    }

    fn covariance(&self) -> Covariance<G::Element, N> {
        Covariance(symmetrize(&(self.factor * self.factor.transpose())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filter::Ekf,
        lie::SE3,
        model::{GpsPosition, Landmark3D, LieSystemModel},
    };
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Matrix6, Point3, Vector3, Vector6};

    fn initial_covariance() -> Covariance<f64, 6> {
        let mut p0 = Matrix6::identity() * 0.2;
        p0[(0, 5)] = 0.05;
        p0[(5, 0)] = 0.05;
        Covariance(p0)
    }

    #[test]
    fn test_factor_is_lower_triangular() {
        let sekf = Sekf::new(SE3::<f64>::identity(), initial_covariance()).unwrap();
        let factor = sekf.factor();
        assert_relative_eq!(factor.upper_triangle(), Matrix6::from_diagonal(&factor.diagonal()));
        assert_relative_eq!(*sekf.covariance(), *initial_covariance(), epsilon = 1e-14);
    }

    #[test]
    fn test_matches_ekf_step_by_step() {
        let p0 = initial_covariance();
        let mut sekf = Sekf::new(SE3::identity(), p0.clone()).unwrap();
        let mut ekf = Ekf::new(SE3::identity(), p0).unwrap();

        let motion = LieSystemModel::new(0.01, Matrix6::identity() * 1e-3).unwrap();
        let landmark = Landmark3D::new(Point3::new(2.0, 1.0, -1.0), Matrix3::identity() * 1e-4)
            .unwrap();
        let gps = GpsPosition::new(Matrix3::identity() * 6e-3).unwrap();
        let u = Vector6::new(0.01, 0.0, 0.005, 0.0, 0.0, 0.005);

        for step in 0..50 {
            sekf.propagate(&motion, &u).unwrap();
            ekf.propagate(&motion, &u).unwrap();
            let y = Vector3::new(2.0, 1.0, -1.0);
            sekf.update(&landmark, &y).unwrap();
            ekf.update(&landmark, &y).unwrap();
            if step % 10 == 0 {
                let fix = Vector3::new(0.01 * step as f64, 0.0, 0.0);
                sekf.update(&gps, &fix).unwrap();
                ekf.update(&gps, &fix).unwrap();
            }
        }

        assert_relative_eq!(
            *sekf.covariance(),
            *ekf.covariance(),
            max_relative = 1e-9,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            sekf.state().minus(ekf.state()),
            Vector6::zeros(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_zero_innovation_factor_is_rejected() {
        let mut sekf = Sekf::new(SE3::identity(), Covariance(Matrix6::zeros())).unwrap();
        let gps = GpsPosition::new(Matrix3::zeros()).unwrap();
        let before = sekf.clone();

        assert_eq!(
            sekf.update(&gps, &Vector3::new(1.0, 0.0, 0.0)),
            Err(NumericalError::NonPositivePivot)
        );
        assert_eq!(sekf.factor(), before.factor());
        assert_eq!(sekf.state(), before.state());
    }
}
