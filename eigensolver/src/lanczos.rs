use crate::{owned_dot, owned_norm, EigenSolverError, SpectralBounds};
use feconsts::*;
use hamiltonian::Operator;
use linalg::LinalgScalar;
use log::debug;
use matrix::Matrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Spectral bounds from `n_steps` Lanczos steps on a seeded random vector.
///
/// b = theta_max + |beta_k| bounds the spectrum from above; b_low is the
/// n_wanted-th Ritz value, or the midpoint of [a0, b] for short runs.
/// Returns the bounds and the number of operator applications.
pub fn lanczos_bounds<T: LinalgScalar>(
    op: &dyn Operator<T>,
    n_steps: usize,
    n_wanted: usize,
    seed: u64,
) -> Result<(SpectralBounds, usize), EigenSolverError> {
    let n = op.n_local_dofs();

    let mut rng = StdRng::seed_from_u64(seed);

    let mut v = Matrix::<T>::new(n, 1);
    utility::fill_rand_vector(&mut rng, v.get_mut_col(0));
    op.constraints().zero_slaves(v.get_mut_col(0));

    let nrm = owned_norm(op, v.get_col(0));

    if !(nrm > 0.0) {
        return Err(EigenSolverError::OrthonormalizationBreakdown);
    }

    v.scale(1.0 / nrm);

    let mut v_prev = Matrix::<T>::new(n, 1);
    let mut w = Matrix::<T>::new(n, 1);

    let mut alpha = Vec::with_capacity(n_steps);
    let mut beta = Vec::with_capacity(n_steps);
    let mut beta_last = 0.0;

    let mut n_hx = 0;

    for k in 0..n_steps.max(1) {
        op.hx(&v, &mut w);
        n_hx += 1;

        if k > 0 {
            w.axpy(T::from_re(-beta_last), &v_prev);
        }

        let a = owned_dot(op, v.get_col(0), w.get_col(0)).re();
        w.axpy(T::from_re(-a), &v);

        alpha.push(a);

        beta_last = owned_norm(op, w.get_col(0));

        // invariant subspace found
        if k + 1 == n_steps || beta_last < EPS12 * a.abs().max(1.0) {
            break;
        }

        beta.push(beta_last);

        v_prev.assign(&v);
        v.assign(&w);
        v.scale(1.0 / beta_last);
    }

    let m = alpha.len();

    let mut t = Matrix::<f64>::new(m, m);

    for i in 0..m {
        t[[i, i]] = alpha[i];

        if i + 1 < m {
            t[[i + 1, i]] = beta[i];
            t[[i, i + 1]] = beta[i];
        }
    }

    let (theta, _) = linalg::eigh(&t)?;

    let a0 = theta[0];
    let b = theta[m - 1] + beta_last.abs();

    let b_low = if n_wanted >= 1 && m >= n_wanted {
        theta[n_wanted - 1]
    } else {
        0.5 * (a0 + b)
    };

    debug!(
        "lanczos: {} steps, a0 = {:.6E}, b_low = {:.6E}, b = {:.6E}",
        m, a0, b_low, b
    );

    Ok((SpectralBounds { a0, b_low, b }, n_hx))
}
