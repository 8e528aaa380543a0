use crate::EigenSolverError;
use feconsts::*;
use hamiltonian::Operator;
use linalg::LinalgScalar;
use log::warn;
use matrix::{Dot, Matrix};
use types::Scalar;

/// Column block size for the mixed-precision overlap.
pub const MIXED_PRECISION_BLOCK: usize = 8;

/// S = X^H X over the owned rows, reduced over the domain group.
///
/// With `mixed_precision` the blocks off the block diagonal are accumulated
/// in single precision.
pub fn overlap<T: Scalar>(op: &dyn Operator<T>, x: &Matrix<T>, mixed_precision: bool) -> Matrix<T> {
    let r = op.partition().owned_range();
    let ncol = x.ncol();

    let mut s = Matrix::<T>::new(ncol, ncol);

    for j in 0..ncol {
        let v = &x.get_col(j)[r.clone()];

        for i in 0..=j {
            let u = &x.get_col(i)[r.clone()];

            let sij = if mixed_precision && i / MIXED_PRECISION_BLOCK != j / MIXED_PRECISION_BLOCK {
                T::dot_single(u, v)
            } else {
                utility::dot_product(u, v)
            };

            s[[i, j]] = sij;
            s[[j, i]] = sij.conj();
        }
    }

    fecomm::all_reduce_slice_sum(op.comm(), s.as_mut_slice());

    s
}

/// Cholesky orthonormalization X <- X L^{-H} with S = L L^H.
///
/// An indefinite overlap is retried once with a small diagonal shift.
pub fn orthonormalize<T: LinalgScalar>(
    op: &dyn Operator<T>,
    x: &mut Matrix<T>,
    mixed_precision: bool,
) -> Result<(), EigenSolverError> {
    let s = overlap(op, x, mixed_precision);

    let l = match linalg::cholesky(&s) {
        Ok(l) => l,
        Err(_) => {
            let max_diag = (0..s.nrow()).fold(0.0f64, |m, i| m.max(s[[i, i]].re()));
            let shift = (EPS10 * max_diag).max(EPS14);

            warn!(
                "subspace overlap is not positive definite, retrying with shift {:.3E}",
                shift
            );

            let mut shifted = s.clone();
            for i in 0..shifted.nrow() {
                shifted[[i, i]] += T::from_re(shift);
            }

            linalg::cholesky(&shifted).map_err(|_| EigenSolverError::OrthonormalizationBreakdown)?
        }
    };

    let linv_h = linalg::inverse_adjoint_lower(&l)?;

    let q = x.dot(&linv_h);
    x.assign(&q);

    Ok(())
}
