use crate::*;

pub struct DensitySpin {}

impl DensitySpin {
    pub fn new() -> DensitySpin {
        DensitySpin {}
    }
}

impl<T: Scalar> Density<T> for DensitySpin {
    fn compute_charge_density(
        &self,
        disc: &dyn Discretization,
        channels: &[ChannelContribution<T>],
        groups: &ProcessGroups,
    ) -> Result<DensityField, DensityError> {
        let mut rho_up = QuadratureField::zeros(disc);
        let mut rho_dn = QuadratureField::zeros(disc);

        let spin_factor = SpinScheme::Spin.spin_factor();

        for ch in channels.iter() {
            let rho = if ch.spin == 0 { &mut rho_up } else { &mut rho_dn };

            accumulate_channel(disc, ch, spin_factor, groups.band(), rho)?;
        }

        let mut rho = DensityField::Spin(rho_up, rho_dn);

        reduce_over_groups(&mut rho, groups);

        Ok(rho)
    }

    fn from_atomic_super_position(
        &self,
        disc: &dyn Discretization,
        atoms: &[AtomicDensity],
        nelec: f64,
        domain: &dyn Communicator,
    ) -> Result<DensityField, DensityError> {
        let spin_part = |sign: f64| {
            QuadratureField::from_fn(disc, |x| {
                atoms
                    .iter()
                    .map(|a| 0.5 * (1.0 + sign * a.polarization.clamp(-1.0, 1.0)) * a.value_at(&x))
                    .sum::<f64>()
            })
        };

        let mut rho = DensityField::Spin(spin_part(1.0), spin_part(-1.0));

        normalize(&mut rho, disc, nelec, domain)?;

        Ok(rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fecomm::SerialComm;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_polarized_superposition() {
        let mesh = Line1D::new(10.0, 40, Boundary::Dirichlet).unwrap();

        let gauss = |r: f64| (-2.0 * r * r).exp();
        let atoms = vec![AtomicDensity {
            position: [5.0, 0.0, 0.0],
            radial: &gauss,
            polarization: 0.5,
        }];

        let density = new::<f64>(SpinScheme::Spin);
        let rho = density
            .from_atomic_super_position(&mesh, &atoms, 2.0, &SerialComm)
            .unwrap();

        assert_abs_diff_eq!(total_charge(&rho, &mesh, &SerialComm), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            total_magnetization(&rho, &mesh, &SerialComm),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_spectrum_split_weights_match_full_rotation() {
        let mesh = Line1D::new(3.0, 6, Boundary::Periodic).unwrap();
        let n = mesh.n_dofs();

        let mass = femesh::lumped_mass(&mesh);
        let inv_sqrt: Vec<f64> = mass
            .iter()
            .map(|m| if *m > 0.0 { 1.0 / m.sqrt() } else { 0.0 })
            .collect();

        // two orthonormal columns on the first dofs, rotated by 45 degrees
        let mut basis = Matrix::<f64>::new(n, 2);
        basis[[1, 0]] = 1.0;
        basis[[2, 1]] = 1.0;

        let c = 0.5f64.sqrt();
        let mut ritz = Matrix::<f64>::new(n, 2);
        ritz[[1, 0]] = c;
        ritz[[2, 0]] = c;
        ritz[[1, 1]] = -c;
        ritz[[2, 1]] = c;

        let occ = vec![1.0, 0.25];

        let full = Wavefunctions::new(ritz.clone());

        let mut split = Wavefunctions::new(basis);
        split.set_tracked(Some(ritz.columns(1..2)));

        let density = new::<f64>(SpinScheme::Spin);

        let compute = |wfc: &Wavefunctions<f64>| {
            let channels = vec![ChannelContribution {
                spin: 1,
                k_weight: 1.0,
                wavefunctions: wfc,
                occupations: &occ,
                inv_sqrt_mass: &inv_sqrt,
            }];

            density
                .compute_charge_density(&mesh, &channels, &ProcessGroups::serial())
                .unwrap()
        };

        let a = compute(&full);
        let b = compute(&split);

        let (up_a, dn_a) = a.as_spin().unwrap();
        let (_, dn_b) = b.as_spin().unwrap();

        assert_eq!(up_a.integrate(&mesh), 0.0);

        for ((_, x), (_, y)) in dn_a.iter().zip(dn_b.iter()) {
            for (u, v) in x.iter().zip(y.iter()) {
                assert_abs_diff_eq!(*u, *v, epsilon = 1e-14);
            }
        }

        assert!(dn_b.min_value() >= 0.0);
    }
}
