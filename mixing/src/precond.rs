use crate::MixingError;
use dfttypes::NodalField;
use electrostatics::Electrostatics;
use itertools::multizip;

/// Linear map applied to a flattened residual before it enters the update.
pub trait Preconditioner {
    fn apply(&self, res: &[f64]) -> Result<Vec<f64>, MixingError>;

    fn is_identity(&self) -> bool {
        false
    }
}

pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, res: &[f64]) -> Result<Vec<f64>, MixingError> {
        Ok(res.to_vec())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Kerker screening of a nodal residual, P R = R - (-lap + k0^2)^-1 k0^2 R.
///
/// Spin residuals are laid out up then down; only the total charge is
/// screened, the magnetization passes through.
pub struct KerkerPreconditioner<'a> {
    electrostatics: &'a dyn Electrostatics,
    k0: f64,
    n_spin: usize,
}

impl<'a> KerkerPreconditioner<'a> {
    pub fn new(electrostatics: &'a dyn Electrostatics, k0: f64, n_spin: usize) -> Self {
        KerkerPreconditioner {
            electrostatics,
            k0,
            n_spin,
        }
    }

    fn screen(&self, r: Vec<f64>) -> Result<Vec<f64>, MixingError> {
        let smooth = self
            .electrostatics
            .solve_screened(&NodalField::new(r.clone()), self.k0)?;

        Ok(multizip((r.iter(), smooth.as_slice().iter()))
            .map(|(a, b)| a - b)
            .collect())
    }
}

impl<'a> Preconditioner for KerkerPreconditioner<'a> {
    fn apply(&self, res: &[f64]) -> Result<Vec<f64>, MixingError> {
        if self.n_spin == 1 {
            return self.screen(res.to_vec());
        }

        let n = res.len() / 2;
        let (up, dn) = res.split_at(n);

        let total: Vec<f64> = multizip((up.iter(), dn.iter())).map(|(u, d)| u + d).collect();
        let ptotal = self.screen(total)?;

        let mut p = vec![0.0; res.len()];
        let (pup, pdn) = p.split_at_mut(n);

        for (pu, pd, t, u, d) in multizip((
            pup.iter_mut(),
            pdn.iter_mut(),
            ptotal.iter(),
            up.iter(),
            dn.iter(),
        )) {
            let m = u - d;
            *pu = 0.5 * (t + m);
            *pd = 0.5 * (t - m);
        }

        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use electrostatics::Line1DElectrostatics;
    use femesh::{Boundary, Discretization, Line1D};

    #[test]
    fn test_kerker_removes_uniform_residual() {
        let mesh = Line1D::new(5.0, 20, Boundary::Periodic).unwrap();
        let es = Line1DElectrostatics::new(&mesh);

        let p = KerkerPreconditioner::new(&es, 0.7, 1);
        let pr = p.apply(&vec![0.3; mesh.n_dofs()]).unwrap();

        for v in pr.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_kerker_keeps_magnetization() {
        let mesh = Line1D::new(5.0, 20, Boundary::Periodic).unwrap();
        let es = Line1DElectrostatics::new(&mesh);
        let n = mesh.n_dofs();

        // uniform total residual, nonuniform magnetization
        let mut res = vec![0.0; 2 * n];
        for i in 0..n {
            let m = (i as f64 * 0.4).sin();
            res[i] = 0.5 * (0.2 + m);
            res[n + i] = 0.5 * (0.2 - m);
        }

        let pr = KerkerPreconditioner::new(&es, 0.7, 2).apply(&res).unwrap();

        for i in 0..n {
            assert_abs_diff_eq!(pr[i] + pr[n + i], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(pr[i] - pr[n + i], res[i] - res[n + i], epsilon = 1e-12);
        }
    }
}
