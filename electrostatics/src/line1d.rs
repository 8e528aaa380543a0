use crate::*;
use feconsts::*;
use femesh::{Boundary, Discretization, Line1D};
use log::debug;

/// Linear finite elements on a [`Line1D`] mesh; stiffness and lumped mass
/// make every system tridiagonal, cyclic for periodic boundaries.
#[derive(Debug, Clone)]
pub struct Line1DElectrostatics {
    boundary: Boundary,
    n_dofs: usize,
    h: f64,
    mass: Vec<f64>,
}

impl Line1DElectrostatics {
    pub fn new(mesh: &Line1D) -> Self {
        Line1DElectrostatics {
            boundary: mesh.boundary(),
            n_dofs: mesh.n_dofs(),
            h: mesh.cell_size(),
            mass: femesh::lumped_mass(mesh),
        }
    }

    fn check_layout(&self, f: &NodalField) -> Result<(), ElectrostaticsError> {
        if f.len() != self.n_dofs {
            return Err(ElectrostaticsError::LayoutMismatch {
                expected: self.n_dofs,
                found: f.len(),
            });
        }

        Ok(())
    }

    // Solves (K + shift M) x = b on the unconstrained nodes and fills the
    // constrained ones; b is given at every node.
    fn solve_system(&self, b: &[f64], shift: f64) -> Result<Vec<f64>, ElectrostaticsError> {
        let n = self.n_dofs;
        let k = 1.0 / self.h;

        let mut x = vec![0.0; n];

        match self.boundary {
            Boundary::Dirichlet => {
                let m = n - 2;

                let sub = vec![-k; m];
                let sup = vec![-k; m];
                let diag: Vec<f64> = (1..n - 1).map(|i| 2.0 * k + shift * self.mass[i]).collect();

                let xi = solve_tridiagonal(&sub, &diag, &sup, &b[1..n - 1])?;

                x[1..n - 1].copy_from_slice(&xi);
            }
            Boundary::Periodic => {
                let m = n - 1;

                let sub = vec![-k; m];
                let sup = vec![-k; m];
                let diag: Vec<f64> = (0..m).map(|i| 2.0 * k + shift * self.mass[i]).collect();

                let xi = solve_cyclic_tridiagonal(&sub, &diag, &sup, -k, -k, &b[..m])?;

                x[..m].copy_from_slice(&xi);
                x[m] = x[0];
            }
        }

        Ok(x)
    }

    fn mean(&self, v: &[f64]) -> f64 {
        let total_mass: f64 = self.mass.iter().sum();

        v.iter().zip(self.mass.iter()).map(|(x, m)| x * m).sum::<f64>() / total_mass
    }
}

impl Electrostatics for Line1DElectrostatics {
    fn solve_poisson(&self, rho: &NodalField) -> Result<NodalField, ElectrostaticsError> {
        self.check_layout(rho)?;

        let mut b: Vec<f64> = rho
            .as_slice()
            .iter()
            .zip(self.mass.iter())
            .map(|(r, m)| FOURPI * r * m)
            .collect();

        let phi = match self.boundary {
            Boundary::Dirichlet => self.solve_system(&b, 0.0)?,
            Boundary::Periodic => {
                let n = self.n_dofs;

                // neutralizing background
                let rho_mean = self.mean(rho.as_slice());
                for (bi, m) in b.iter_mut().zip(self.mass.iter()) {
                    *bi -= FOURPI * rho_mean * m;
                }

                // pin node 0, solve the rest as a Dirichlet chain closed on node 0
                let k = 1.0 / self.h;
                let m = n - 2;

                let sub = vec![-k; m];
                let sup = vec![-k; m];
                let diag = vec![2.0 * k; m];

                let xi = solve_tridiagonal(&sub, &diag, &sup, &b[1..n - 1])?;

                let mut phi = vec![0.0; n];
                phi[1..n - 1].copy_from_slice(&xi);

                let shift = self.mean(&phi);
                phi.iter_mut().for_each(|p| *p -= shift);
                phi[n - 1] = phi[0];

                phi
            }
        };

        debug!(
            "poisson solve on {} nodes, boundary {:?}",
            self.n_dofs, self.boundary
        );

        Ok(NodalField::new(phi))
    }

    fn solve_screened(&self, rhs: &NodalField, k0: f64) -> Result<NodalField, ElectrostaticsError> {
        self.check_layout(rhs)?;

        if !(k0 > 0.0) || !k0.is_finite() {
            return Err(ElectrostaticsError::InvalidScreening(k0));
        }

        let k02 = k0 * k0;

        let b: Vec<f64> = rhs
            .as_slice()
            .iter()
            .zip(self.mass.iter())
            .map(|(r, m)| k02 * r * m)
            .collect();

        Ok(NodalField::new(self.solve_system(&b, k02)?))
    }
}
