use std::ops::Deref;

use crate::{covariance::Covariance, error::NumericalError, lie::LieGroup};

/// A state estimate together with the covariance of its error.
#[derive(Debug, Clone, PartialEq)]
pub struct Uncertained<G: LieGroup<N>, const N: usize> {
    pub state: G,
    /// The covariance matrix of the state.
    pub cov: Covariance<G::Element, N>,
}

impl<G: LieGroup<N>, const N: usize> Deref for Uncertained<G, N> {
    type Target = G;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<G: LieGroup<N>, const N: usize> Uncertained<G, N> {
    pub const fn new(state: G, cov: Covariance<G::Element, N>) -> Self {
        Self { state, cov }
    }

    /// Replaces state and covariance together, or leaves both untouched when
    /// `cov` is not a usable covariance.
    pub fn commit(
        &mut self,
        state: G,
        cov: Covariance<G::Element, N>,
    ) -> Result<(), NumericalError> {
        if !cov.is_positive_semi_definite() {
            return Err(NumericalError::CovarianceNotPsd);
        }
        self.state = state;
        self.cov = cov;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lie::SE3;
    use nalgebra::{Matrix6, Vector3};

    #[test]
    fn test_commit_is_atomic() {
        let mut estimate = Uncertained::new(SE3::identity(), Covariance(Matrix6::identity()));

        let mut bad = Matrix6::identity();
        bad[(2, 2)] = f64::NAN;
        let moved = SE3::from_parts(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros());
        assert_eq!(
            estimate.commit(moved.clone(), Covariance(bad)),
            Err(NumericalError::CovarianceNotPsd)
        );
        assert_eq!(estimate.state, SE3::identity());
        assert_eq!(*estimate.cov, Matrix6::identity());

        estimate
            .commit(moved.clone(), Covariance(Matrix6::identity() * 2.0))
            .unwrap();
        assert_eq!(estimate.state, moved);
    }

    #[test]
    fn test_commit_rejects_indefinite() {
        let mut estimate = Uncertained::new(SE3::identity(), Covariance(Matrix6::identity()));

        // positive diagonal, but eigenvalues 6 and -4
        let mut indefinite = Matrix6::identity();
        indefinite[(0, 1)] = 5.0;
        indefinite[(1, 0)] = 5.0;
        let moved = SE3::from_parts(Vector3::new(0.0, 1.0, 0.0), Vector3::zeros());
        assert_eq!(
            estimate.commit(moved, Covariance(indefinite)),
            Err(NumericalError::CovarianceNotPsd)
        );
        assert_eq!(estimate.state, SE3::identity());
        assert_eq!(*estimate.cov, Matrix6::identity());
    }

    #[test]
    fn test_commit_accepts_singular() {
        let mut estimate = Uncertained::new(SE3::identity(), Covariance(Matrix6::identity()));
        assert_eq!(estimate.commit(SE3::identity(), Covariance(Matrix6::zeros())), Ok(()));

        let mut rank_one = Matrix6::zeros();
        rank_one[(3, 3)] = 1e-6;
        // round-off below the largest entry is tolerated
        rank_one[(4, 4)] = -1e-20;
        assert_eq!(estimate.commit(SE3::identity(), Covariance(rank_one)), Ok(()));
    }
}
