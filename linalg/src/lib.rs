//! Dense kernels for the small projected matrices (subspace and mixing history).

use matrix::Matrix;
use nalgebra::{ComplexField, DMatrix, DVector};
use std::fmt;
use types::Scalar;

pub trait LinalgScalar: Scalar + ComplexField<RealField = f64> {}

impl<T: Scalar + ComplexField<RealField = f64>> LinalgScalar for T {}

const EIGEN_MAX_SWEEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum LinalgError {
    NotSquare { nrow: usize, ncol: usize },
    NotPositiveDefinite,
    NoConvergence,
    Singular,
}

impl fmt::Display for LinalgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinalgError::NotSquare { nrow, ncol } => {
                write!(f, "matrix is not square: {} x {}", nrow, ncol)
            }
            LinalgError::NotPositiveDefinite => write!(f, "matrix is not positive definite"),
            LinalgError::NoConvergence => write!(f, "eigenvalue iteration did not converge"),
            LinalgError::Singular => write!(f, "matrix is singular"),
        }
    }
}

impl std::error::Error for LinalgError {}

pub fn to_dmatrix<T: LinalgScalar>(mat: &Matrix<T>) -> DMatrix<T> {
    DMatrix::<T>::from_column_slice(mat.nrow(), mat.ncol(), mat.as_slice())
}

pub fn from_dmatrix<T: LinalgScalar>(mat: &DMatrix<T>) -> Matrix<T> {
    Matrix::<T>::from_col_slice(mat.nrows(), mat.ncols(), mat.as_slice())
}

fn check_square<T: Scalar>(mat: &Matrix<T>) -> Result<(), LinalgError> {
    if mat.nrow() != mat.ncol() {
        return Err(LinalgError::NotSquare {
            nrow: mat.nrow(),
            ncol: mat.ncol(),
        });
    }

    Ok(())
}

/// Eigenpairs of the Hermitian part of `mat`, eigenvalues ascending.
pub fn eigh<T: LinalgScalar>(mat: &Matrix<T>) -> Result<(Vec<f64>, Matrix<T>), LinalgError> {
    check_square(mat)?;

    let mut herm = mat.clone();
    herm.hermitize();

    let eig = to_dmatrix(&herm)
        .try_symmetric_eigen(f64::EPSILON, EIGEN_MAX_SWEEPS)
        .ok_or(LinalgError::NoConvergence)?;

    let n = mat.nrow();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    let mut eigval = Vec::with_capacity(n);
    let mut eigvec = Matrix::<T>::new(n, n);

    for (jnew, &jold) in order.iter().enumerate() {
        eigval.push(eig.eigenvalues[jold]);

        for i in 0..n {
            eigvec[[i, jnew]] = eig.eigenvectors[(i, jold)];
        }
    }

    Ok((eigval, eigvec))
}

/// Lower Cholesky factor, S = L L^H.
pub fn cholesky<T: LinalgScalar>(mat: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
    check_square(mat)?;

    let chol = to_dmatrix(mat)
        .cholesky()
        .ok_or(LinalgError::NotPositiveDefinite)?;

    Ok(from_dmatrix(&chol.l()))
}

/// L^{-H} for a lower-triangular L.
pub fn inverse_adjoint_lower<T: LinalgScalar>(l: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
    check_square(l)?;

    let n = l.nrow();

    let rhs = DMatrix::<T>::identity(n, n);

    let r = to_dmatrix(l)
        .ad_solve_lower_triangular(&rhs)
        .ok_or(LinalgError::Singular)?;

    Ok(from_dmatrix(&r))
}

/// Generalized Hermitian problem H x = e S x with S positive definite.
///
/// Eigenvectors come back S-orthonormal, eigenvalues ascending.
pub fn eigh_generalized<T: LinalgScalar>(
    h: &Matrix<T>,
    s: &Matrix<T>,
) -> Result<(Vec<f64>, Matrix<T>), LinalgError> {
    check_square(h)?;
    check_square(s)?;

    let l = to_dmatrix(&cholesky(s)?);

    // C = L^{-1} H L^{-H}
    let a = l
        .solve_lower_triangular(&to_dmatrix(h))
        .ok_or(LinalgError::Singular)?;
    let c = l
        .solve_lower_triangular(&a.adjoint())
        .ok_or(LinalgError::Singular)?;

    let (eigval, y) = eigh(&from_dmatrix(&c))?;

    let x = l
        .ad_solve_lower_triangular(&to_dmatrix(&y))
        .ok_or(LinalgError::Singular)?;

    Ok((eigval, from_dmatrix(&x)))
}

/// Solves A x = b by LU factorization.
pub fn solve<T: LinalgScalar>(a: &Matrix<T>, b: &[T]) -> Result<Vec<T>, LinalgError> {
    check_square(a)?;

    let x = to_dmatrix(a)
        .lu()
        .solve(&DVector::<T>::from_column_slice(b))
        .ok_or(LinalgError::Singular)?;

    Ok(x.as_slice().to_vec())
}

/// Ratio of the largest to the smallest eigenvalue magnitude of a Hermitian matrix.
pub fn condition_number_hermitian<T: LinalgScalar>(a: &Matrix<T>) -> Result<f64, LinalgError> {
    let (eigval, _) = eigh(a)?;

    let max = eigval.iter().fold(0.0f64, |m, e| m.max(e.abs()));
    let min = eigval.iter().fold(f64::INFINITY, |m, e| m.min(e.abs()));

    if min == 0.0 || !min.is_finite() {
        return Ok(f64::INFINITY);
    }

    Ok(max / min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use matrix::Dot;
    use types::c64;

    #[test]
    fn test_eigh_real() {
        let m = Matrix::<f64>::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);

        let (e, v) = eigh(&m).unwrap();

        assert_abs_diff_eq!(e[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(e[1], 3.0, epsilon = 1e-12);

        let mv = m.dot(&v.get_col(1).to_vec());

        for (a, b) in mv.iter().zip(v.get_col(1).iter()) {
            assert_abs_diff_eq!(*a, 3.0 * b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_eigh_complex() {
        let cm = Matrix::<c64>::from_row_slice(
            2,
            2,
            &[
                c64::new(1.0, 0.0),
                c64::new(0.0, 0.5),
                c64::new(0.0, -0.5),
                c64::new(1.0, 0.0),
            ],
        );

        let (e, v) = eigh(&cm).unwrap();

        assert_abs_diff_eq!(e[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(e[1], 1.5, epsilon = 1e-12);

        let vhv = v.adjoint().dot(&v);

        assert_abs_diff_eq!(vhv[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vhv[[0, 1]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_inverse_adjoint() {
        let s = Matrix::<f64>::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);

        let l = cholesky(&s).unwrap();
        let r = inverse_adjoint_lower(&l).unwrap();

        // R^H S R = I
        let p = r.adjoint().dot(&s).dot(&r);

        assert_abs_diff_eq!(p[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[[1, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let s = Matrix::<f64>::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);

        assert_eq!(cholesky(&s), Err(LinalgError::NotPositiveDefinite));
    }

    #[test]
    fn test_eigh_generalized() {
        let h = Matrix::<f64>::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 8.0]);
        let s = Matrix::<f64>::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]);

        let (e, _) = eigh_generalized(&h, &s).unwrap();

        assert_abs_diff_eq!(e[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(e[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_and_condition() {
        let a = Matrix::<f64>::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 1.0]);

        let x = solve(&a, &[8.0, 3.0]).unwrap();

        assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-14);
        assert_abs_diff_eq!(condition_number_hermitian(&a).unwrap(), 4.0, epsilon = 1e-12);

        let singular = Matrix::<f64>::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);

        assert_eq!(condition_number_hermitian(&singular).unwrap() > 1e12, true);
    }

    #[test]
    fn test_not_square() {
        let m = Matrix::<f64>::new(2, 3);

        assert_eq!(
            eigh(&m).map(|_| ()),
            Err(LinalgError::NotSquare { nrow: 2, ncol: 3 })
        );
    }
}
