use std::ops::{Deref, DerefMut};

use nalgebra::{Cholesky, MatrixView, RealField, SMatrix, SVector, Scalar, U1, U3, U6};
use serde::{Deserialize, Serialize};
use simba::scalar::SupersetOf;

use crate::{
    error::ConfigError,
    utils::{symmetrize, to_dynamic, to_f64},
};

/// Relative tolerance used when validating user supplied covariances.
const VALIDATION_TOLERANCE: f64 = 1e-9;

type BlockView<'a, T> = MatrixView<'a, T, U3, U3, U1, U6>;

/// A covariance matrix over a `D` dimensional tangent space.
///
/// # Overview
/// For SE(3) the blocks follow the tangent layout `[ρ; θ]`:
/// ```text
///     ├─── ρ ───┤├─── θ ───┤
/// ┬  ╭─────────────────────╮
/// ρ  │   ρρ     │   ρθ     │
/// ┴  │──────────┼──────────│
/// θ  │   θρ     │   θθ     │
/// ┴  ╰─────────────────────╯
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const D: usize>(pub SMatrix<T, D, D>);

impl<T: Scalar, const D: usize> Deref for Covariance<T, D> {
    type Target = SMatrix<T, D, D>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Scalar, const D: usize> DerefMut for Covariance<T, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: RealField + Copy, const D: usize> Covariance<T, D> {
    /// Validates that `matrix` is a finite, symmetric, positive semi-definite matrix.
    ///
    /// `name` identifies the matrix in the returned error.
    pub fn new(matrix: SMatrix<T, D, D>, name: &'static str) -> Result<Self, ConfigError> {
        if !matrix.iter().all(|x| x.is_finite()) {
            return Err(ConfigError::NonFinite { name });
        }

        let scale = matrix.amax().max(T::one());
        let tolerance = scale * nalgebra::convert(VALIDATION_TOLERANCE);

        let asymmetry = (matrix - matrix.transpose()).amax();
        if asymmetry > tolerance {
            return Err(ConfigError::NotSymmetric {
                name,
                asymmetry: to_f64(asymmetry),
            });
        }

        let min_eigenvalue = to_dynamic(&symmetrize(&matrix))
            .symmetric_eigenvalues()
            .iter()
            .copied()
            .fold(T::max_value().unwrap_or_else(T::one), |acc, x| acc.min(x));
        if min_eigenvalue < -tolerance {
            return Err(ConfigError::NotPositiveSemiDefinite {
                name,
                min_eigenvalue: to_f64(min_eigenvalue),
            });
        }

        Ok(Self(symmetrize(&matrix)))
    }

    pub fn from_diagonal(diagonal: &SVector<T, D>, name: &'static str) -> Result<Self, ConfigError> {
        Self::new(SMatrix::from_diagonal(diagonal), name)
    }

    /// A factor `L` with `L·Lᵗ = self`.
    ///
    /// Uses Cholesky when the matrix is definite and falls back to the
    /// eigen decomposition `V·√Λ` for singular (but valid) covariances, e.g. a
    /// noise-free axis.
    pub fn factor(&self) -> SMatrix<T, D, D> {
        if let Some(cholesky) = Cholesky::new(self.0) {
            return cholesky.l();
        }
        let eigen = to_dynamic(&self.0).symmetric_eigen();
        let sqrt_values = eigen.eigenvalues.map(|x| x.max(T::zero()).sqrt());
        let factor = eigen.eigenvectors * nalgebra::DMatrix::from_diagonal(&sqrt_values);
        SMatrix::from_column_slice(factor.as_slice())
    }

    /// Whether a freshly computed covariance is finite, symmetric and positive
    /// semi-definite, up to a round-off margin `ε` relative to its largest entry.
    ///
    /// `P + ε·I` must admit a Cholesky factor, i.e. `λ_min(P) > -ε`.
    pub fn is_positive_semi_definite(&self) -> bool {
        if !self.iter().all(|x| x.is_finite()) {
            return false;
        }
        let floor = T::default_epsilon() * T::default_epsilon();
        let margin = (self.amax() * nalgebra::convert(VALIDATION_TOLERANCE)).max(floor);
        if (self.0 - self.transpose()).amax() > margin {
            return false;
        }
        Cholesky::new(self.0 + SMatrix::<T, D, D>::identity() * margin).is_some()
    }
}

impl<T: RealField + Copy> Covariance<T, 6> {
    /// The translational block `ρρ`.
    #[inline]
    pub fn translation_block(&self) -> BlockView<'_, T> {
        self.fixed_view::<3, 3>(0, 0)
    }

    /// The rotational block `θθ`.
    #[inline]
    pub fn rotation_block(&self) -> BlockView<'_, T> {
        self.fixed_view::<3, 3>(3, 3)
    }
}

/// Per-block variances of an SE(3) covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + SupersetOf<f64>"))]
pub struct BlockVariances<T> {
    pub translation: T,
    pub rotation: T,
}

impl<T: SupersetOf<f64>> Default for BlockVariances<T> {
    fn default() -> Self {
        Self {
            translation: nalgebra::convert(1.0),
            rotation: nalgebra::convert(std::f64::consts::FRAC_PI_4),
        }
    }
}

impl<T: RealField + Copy> From<BlockVariances<T>> for Covariance<T, 6> {
    fn from(value: BlockVariances<T>) -> Self {
        let mut cov = Covariance::<T, 6>(SMatrix::zeros());
        cov.fixed_view_mut::<3, 3>(0, 0)
            .fill_diagonal(value.translation);
        cov.fixed_view_mut::<3, 3>(3, 3).fill_diagonal(value.rotation);
        cov
    }
}

/// A validated noise covariance together with its square-root factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Noise<T: Scalar, const D: usize> {
    covariance: Covariance<T, D>,
    factor: SMatrix<T, D, D>,
}

impl<T: RealField + Copy, const D: usize> Noise<T, D> {
    pub fn new(covariance: SMatrix<T, D, D>, name: &'static str) -> Result<Self, ConfigError> {
        let covariance = Covariance::new(covariance, name)?;
        let factor = covariance.factor();
        Ok(Self { covariance, factor })
    }

    #[inline]
    pub fn covariance(&self) -> &Covariance<T, D> {
        &self.covariance
    }

    /// `L` with `L·Lᵗ` equal to [`Noise::covariance`].
    #[inline]
    pub fn factor(&self) -> &SMatrix<T, D, D> {
        &self.factor
    }
}
