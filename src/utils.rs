use nalgebra::{Cholesky, DMatrix, RealField, SMatrix, Scalar};

use simba::scalar::SupersetOf;

use crate::error::NumericalError;

/// Lossy conversion for error reports and logs.
#[inline]
pub(crate) fn to_f64<T: RealField>(value: T) -> f64 {
    SupersetOf::<f64>::to_subset(&value).unwrap_or(f64::NAN)
}

/// Copies a statically sized matrix into a heap allocated one, for the
/// decompositions that need dimension arithmetic (QR, eigen).
#[inline]
pub(crate) fn to_dynamic<T: Scalar, const R: usize, const C: usize>(
    matrix: &SMatrix<T, R, C>,
) -> DMatrix<T> {
    DMatrix::from_column_slice(R, C, matrix.as_slice())
}

/// Copies a heap allocated matrix back into a statically sized one.
///
/// The dimensions of `matrix` must be exactly `R×C`.
#[inline]
pub(crate) fn to_static<T: Scalar, const R: usize, const C: usize>(
    matrix: &DMatrix<T>,
) -> SMatrix<T, R, C> {
    debug_assert_eq!(matrix.shape(), (R, C));
    matrix.fixed_view::<R, C>(0, 0).into_owned()
}

#[inline]
pub(crate) fn symmetrize<T: RealField + Copy, const D: usize>(
    matrix: &SMatrix<T, D, D>,
) -> SMatrix<T, D, D> {
    (matrix + matrix.transpose()) * nalgebra::convert::<_, T>(0.5)
}

/// Lower-triangular `L` with `L·Lᵗ = A·Aᵗ`, for an `A` with at least as many
/// columns as rows.
///
/// Computed from the QR decomposition of `Aᵗ`: `A·Aᵗ = Rᵗ·Qᵗ·Q·R = Rᵗ·R`.
/// Columns are sign-flipped so that the diagonal is non-negative.
pub(crate) fn triangularize<T: RealField + Copy>(array: DMatrix<T>) -> DMatrix<T> {
    let rows = array.nrows();
    debug_assert!(array.ncols() >= rows);

    let mut lower = array.transpose().qr().r().transpose();
    for j in 0..rows {
        if lower[(j, j)] < T::zero() {
            lower.column_mut(j).neg_mut();
        }
    }
    lower
}

/// Solves `X·S = B` for `X` with `S` symmetric positive definite.
pub(crate) fn solve_right_spd<T, const R: usize, const M: usize>(
    lhs: &SMatrix<T, R, M>,
    spd: SMatrix<T, M, M>,
) -> Result<SMatrix<T, R, M>, NumericalError>
where
    T: RealField + Copy,
{
    let cholesky = Cholesky::new(spd).ok_or(NumericalError::InnovationNotInvertible)?;
    // X·S = B  <=>  S·Xᵗ = Bᵗ
    let solution = cholesky.solve(&lhs.transpose()).transpose();
    if solution.iter().all(|x| x.is_finite()) {
        Ok(solution)
    } else {
        Err(NumericalError::InnovationNotInvertible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Matrix2x3, Matrix3, matrix};

    #[test]
    fn test_triangularize() {
        let array = matrix![
            1.0, 2.0, 0.5, -1.0;
            0.0, 3.0, 1.0,  2.0;
            4.0, -1.0, 0.0, 1.0
        ];
        let lower = triangularize(to_dynamic(&array));

        assert_relative_eq!(
            &lower * lower.transpose(),
            to_dynamic(&(array * array.transpose())),
            epsilon = 1e-12
        );
        for i in 0..3 {
            assert!(lower[(i, i)] >= 0.0);
            for j in (i + 1)..3 {
                assert_relative_eq!(lower[(i, j)], 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_solve_right_spd() {
        let spd = matrix![
            4.0, 1.0;
            1.0, 3.0
        ];
        let rhs = Matrix2x3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0).transpose();
        let solution = solve_right_spd(&rhs, spd).unwrap();
        assert_relative_eq!(solution * spd, rhs, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_right_spd_singular() {
        let singular = Matrix2::new(1.0, 1.0, 1.0, 1.0);
        let rhs = Matrix3::<f64>::identity().fixed_view::<3, 2>(0, 0).into_owned();
        assert_eq!(
            solve_right_spd(&rhs, singular),
            Err(NumericalError::InnovationNotInvertible)
        );
    }

    #[test]
    fn test_symmetrize() {
        let m = matrix![
            1.0, 2.0;
            4.0, 3.0
        ];
        assert_eq!(symmetrize(&m), matrix![1.0, 3.0; 3.0, 3.0]);
    }
}
