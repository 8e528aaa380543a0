use crate::{NodalField, QuadratureField};
use enum_as_inner::EnumAsInner;
use femesh::Discretization;

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum DensityField {
    NonSpin(QuadratureField),
    Spin(QuadratureField, QuadratureField),
}

impl DensityField {
    pub fn n_spin(&self) -> usize {
        match self {
            DensityField::NonSpin(_) => 1,
            DensityField::Spin(_, _) => 2,
        }
    }

    /// Spin channel `ispin`; 0 is up, 1 is down.
    pub fn channel(&self, ispin: usize) -> &QuadratureField {
        match self {
            DensityField::NonSpin(rho) => rho,
            DensityField::Spin(up, dn) => {
                if ispin == 0 {
                    up
                } else {
                    dn
                }
            }
        }
    }

    /// Total charge density, up + down for spin fields.
    pub fn total(&self) -> QuadratureField {
        match self {
            DensityField::NonSpin(rho) => rho.clone(),
            DensityField::Spin(up, dn) => {
                let mut rho = up.clone();
                rho.add_scaled(dn, 1.0);
                rho
            }
        }
    }

    pub fn total_charge(&self, disc: &dyn Discretization) -> f64 {
        match self {
            DensityField::NonSpin(rho) => rho.integrate(disc),
            DensityField::Spin(up, dn) => up.integrate(disc) + dn.integrate(disc),
        }
    }

    pub fn total_magnetization(&self, disc: &dyn Discretization) -> f64 {
        match self {
            DensityField::NonSpin(_) => 0.0,
            DensityField::Spin(up, dn) => up.integrate(disc) - dn.integrate(disc),
        }
    }

    pub fn scale(&mut self, f: f64) {
        match self {
            DensityField::NonSpin(rho) => rho.scale(f),
            DensityField::Spin(up, dn) => {
                up.scale(f);
                dn.scale(f);
            }
        }
    }

    pub fn same_layout(&self, other: &DensityField) -> bool {
        match (self, other) {
            (DensityField::NonSpin(a), DensityField::NonSpin(b)) => a.same_layout(b),
            (DensityField::Spin(a1, a2), DensityField::Spin(b1, b2)) => {
                a1.same_layout(b1) && a2.same_layout(b2)
            }
            _ => false,
        }
    }

    pub fn matches(&self, disc: &dyn Discretization) -> bool {
        match self {
            DensityField::NonSpin(rho) => rho.matches(disc),
            DensityField::Spin(up, dn) => up.matches(disc) && dn.matches(disc),
        }
    }

    /// Spin channels concatenated up then down.
    pub fn flatten(&self) -> Vec<f64> {
        match self {
            DensityField::NonSpin(rho) => rho.flatten(),
            DensityField::Spin(up, dn) => {
                let mut v = up.flatten();
                v.extend(dn.flatten());
                v
            }
        }
    }

    pub fn assign_flat(&mut self, flat: &[f64]) {
        match self {
            DensityField::NonSpin(rho) => {
                rho.assign_flat(flat);
            }
            DensityField::Spin(up, dn) => {
                let n = up.assign_flat(flat);
                dn.assign_flat(&flat[n..]);
            }
        }
    }

    /// JxW weights aligned with `flatten`.
    pub fn weights(&self, disc: &dyn Discretization) -> Vec<f64> {
        match self {
            DensityField::NonSpin(rho) => rho.weights(disc),
            DensityField::Spin(up, dn) => {
                let mut w = up.weights(disc);
                w.extend(dn.weights(disc));
                w
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DensityField::NonSpin(rho) => rho.n_points(),
            DensityField::Spin(up, dn) => up.n_points() + dn.n_points(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum NodalDensity {
    NonSpin(NodalField),
    Spin(NodalField, NodalField),
}

impl NodalDensity {
    pub fn n_spin(&self) -> usize {
        match self {
            NodalDensity::NonSpin(_) => 1,
            NodalDensity::Spin(_, _) => 2,
        }
    }

    pub fn flatten(&self) -> Vec<f64> {
        match self {
            NodalDensity::NonSpin(rho) => rho.as_slice().to_vec(),
            NodalDensity::Spin(up, dn) => {
                let mut v = up.as_slice().to_vec();
                v.extend_from_slice(dn.as_slice());
                v
            }
        }
    }

    pub fn assign_flat(&mut self, flat: &[f64]) {
        match self {
            NodalDensity::NonSpin(rho) => {
                let n = rho.len();
                rho.as_mut_slice().copy_from_slice(&flat[..n]);
            }
            NodalDensity::Spin(up, dn) => {
                let n = up.len();
                let m = dn.len();
                up.as_mut_slice().copy_from_slice(&flat[..n]);
                dn.as_mut_slice().copy_from_slice(&flat[n..n + m]);
            }
        }
    }

    pub fn same_layout(&self, other: &NodalDensity) -> bool {
        match (self, other) {
            (NodalDensity::NonSpin(a), NodalDensity::NonSpin(b)) => a.len() == b.len(),
            (NodalDensity::Spin(a1, a2), NodalDensity::Spin(b1, b2)) => {
                a1.len() == b1.len() && a2.len() == b2.len()
            }
            _ => false,
        }
    }

    pub fn len_per_spin(&self) -> usize {
        match self {
            NodalDensity::NonSpin(rho) => rho.len(),
            NodalDensity::Spin(up, _) => up.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_spin_density_moments() {
        let mesh = Line1D::new(1.0, 4, Boundary::Dirichlet).unwrap();

        let rho = DensityField::Spin(
            QuadratureField::constant(&mesh, 3.0),
            QuadratureField::constant(&mesh, 1.0),
        );

        assert_abs_diff_eq!(rho.total_charge(&mesh), 4.0, epsilon = 1e-14);
        assert_abs_diff_eq!(rho.total_magnetization(&mesh), 2.0, epsilon = 1e-14);
        assert_eq!(rho.len(), 16);
        assert!(rho.as_spin().is_some());

        let mut other = DensityField::Spin(
            QuadratureField::zeros(&mesh),
            QuadratureField::zeros(&mesh),
        );
        other.assign_flat(&rho.flatten());

        assert_eq!(other, rho);
        assert!(!rho.same_layout(&DensityField::NonSpin(QuadratureField::zeros(&mesh))));
    }
}
