use crate::ElectrostaticsError;
use feconsts::*;

/// Thomas algorithm; `sub[0]` and `sup[n - 1]` are ignored.
pub fn solve_tridiagonal(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, ElectrostaticsError> {
    let n = diag.len();

    if n == 0 {
        return Ok(Vec::new());
    }

    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    let mut denom = diag[0];

    for i in 0..n {
        if i > 0 {
            denom = diag[i] - sub[i] * c[i - 1];
        }

        if denom.abs() < EPS30 {
            return Err(ElectrostaticsError::Singular);
        }

        c[i] = if i + 1 < n { sup[i] / denom } else { 0.0 };

        d[i] = if i > 0 {
            (rhs[i] - sub[i] * d[i - 1]) / denom
        } else {
            rhs[0] / denom
        };
    }

    for i in (0..n - 1).rev() {
        d[i] -= c[i] * d[i + 1];
    }

    Ok(d)
}

/// Tridiagonal system with the corner entries A[n-1][0] = `alpha` and
/// A[0][n-1] = `beta`, by the Sherman-Morrison correction.
pub fn solve_cyclic_tridiagonal(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    alpha: f64,
    beta: f64,
    rhs: &[f64],
) -> Result<Vec<f64>, ElectrostaticsError> {
    let n = diag.len();

    if n < 3 {
        return solve_small_cyclic(sub, diag, sup, alpha, beta, rhs);
    }

    let gamma = -diag[0];

    let mut bb = diag.to_vec();
    bb[0] = diag[0] - gamma;
    bb[n - 1] = diag[n - 1] - alpha * beta / gamma;

    let x = solve_tridiagonal(sub, &bb, sup, rhs)?;

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = alpha;

    let z = solve_tridiagonal(sub, &bb, sup, &u)?;

    let denom = 1.0 + z[0] + beta * z[n - 1] / gamma;

    if denom.abs() < EPS30 {
        return Err(ElectrostaticsError::Singular);
    }

    let fact = (x[0] + beta * x[n - 1] / gamma) / denom;

    Ok(x.iter().zip(z.iter()).map(|(xi, zi)| xi - fact * zi).collect())
}

fn solve_small_cyclic(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    alpha: f64,
    beta: f64,
    rhs: &[f64],
) -> Result<Vec<f64>, ElectrostaticsError> {
    match diag.len() {
        0 => Ok(Vec::new()),
        1 => {
            let a = diag[0] + alpha + beta;

            if a.abs() < EPS30 {
                return Err(ElectrostaticsError::Singular);
            }

            Ok(vec![rhs[0] / a])
        }
        _ => {
            let a00 = diag[0];
            let a01 = sup[0] + beta;
            let a10 = sub[1] + alpha;
            let a11 = diag[1];

            let det = a00 * a11 - a01 * a10;

            if det.abs() < EPS30 {
                return Err(ElectrostaticsError::Singular);
            }

            Ok(vec![
                (rhs[0] * a11 - a01 * rhs[1]) / det,
                (a00 * rhs[1] - a10 * rhs[0]) / det,
            ])
        }
    }
}
