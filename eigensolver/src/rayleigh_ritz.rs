use crate::{overlap, EigenSolverError};
use hamiltonian::Operator;
use linalg::LinalgScalar;
use matrix::Matrix;
use types::Scalar;

/// Ritz values (ascending) and coefficient vectors of `op` on span(X).
///
/// The generalized form solves X^H H X q = e X^H X q with a full-precision
/// overlap and tolerates a basis that is only approximately orthonormal.
pub fn rayleigh_ritz<T: LinalgScalar>(
    op: &dyn Operator<T>,
    x: &Matrix<T>,
    generalized: bool,
) -> Result<(Vec<f64>, Matrix<T>), EigenSolverError> {
    let hp = op.xthx(x);

    let eig = if generalized {
        let s = overlap(op, x, false);
        linalg::eigh_generalized(&hp, &s)?
    } else {
        linalg::eigh(&hp)?
    };

    Ok(eig)
}

/// ||H y_j - e_j y_j|| over the owned rows, one reduction for all columns.
pub fn residual_norms<T: Scalar>(op: &dyn Operator<T>, y: &Matrix<T>, evals: &[f64]) -> Vec<f64> {
    assert_eq!(y.ncol(), evals.len());

    let mut hy = Matrix::<T>::new(y.nrow(), y.ncol());
    op.hx(y, &mut hy);

    let r = op.partition().owned_range();

    let mut norms: Vec<f64> = evals
        .iter()
        .enumerate()
        .map(|(j, e)| {
            hy.get_col(j)[r.clone()]
                .iter()
                .zip(y.get_col(j)[r.clone()].iter())
                .map(|(h, v)| (*h - *v * *e).abs2())
                .sum()
        })
        .collect();

    op.comm().all_reduce_sum(&mut norms);

    norms.iter().map(|x| x.sqrt()).collect()
}
