use crate::SpectralBounds;
use hamiltonian::Operator;
use matrix::Matrix;
use types::Scalar;

/// Applies the scaled Chebyshev polynomial of `degree` in H to the columns
/// of `x` in place, damping [b_low, b] and amplifying towards a0.
///
/// Degree 0 is the identity. Returns the number of operator applications.
pub fn chebyshev_filter<T: Scalar>(
    op: &dyn Operator<T>,
    x: &mut Matrix<T>,
    degree: usize,
    bounds: &SpectralBounds,
) -> usize {
    if degree == 0 || x.ncol() == 0 {
        return 0;
    }

    let e = 0.5 * (bounds.b - bounds.b_low);
    let c = 0.5 * (bounds.b + bounds.b_low);

    let mut sigma = e / (bounds.a0 - c);
    let sigma1 = sigma;
    let gamma = 2.0 / sigma1;

    let mut hy = Matrix::<T>::new(x.nrow(), x.ncol());

    // Y = (H - c) X sigma1 / e
    op.hx(x, &mut hy);

    let mut y = hy.clone();
    y.axpy(T::from_re(-c), x);
    y.scale(sigma1 / e);

    for _ in 1..degree {
        let sigma2 = 1.0 / (gamma - sigma);

        // Y_new = 2 sigma2 / e (H - c) Y - sigma sigma2 X
        op.hx(&y, &mut hy);
        hy.axpy(T::from_re(-c), &y);
        hy.scale(2.0 * sigma2 / e);
        hy.axpy(T::from_re(-sigma * sigma2), x);

        std::mem::swap(x, &mut y);
        std::mem::swap(&mut y, &mut hy);

        sigma = sigma2;
    }

    std::mem::swap(x, &mut y);

    degree * x.ncol()
}
