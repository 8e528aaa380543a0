use crate::{compute_v_hartree, ScfError};
use dfttypes::*;
use electrostatics::Electrostatics;
use femesh::Discretization;
use xc::XC;

/// Local effective potential of every spin channel at the quadrature points.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePotential {
    channels: Vec<QuadratureField>,
}

impl EffectivePotential {
    pub fn new(channels: Vec<QuadratureField>) -> Self {
        EffectivePotential { channels }
    }

    pub fn n_spin(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, ispin: usize) -> &QuadratureField {
        &self.channels[ispin]
    }
}

/// Builds the effective potential seen by the Kohn-Sham states from an input
/// density.
pub trait PotentialBuilder: Send + Sync {
    fn effective_potential(&self, rho: &DensityField) -> Result<EffectivePotential, ScfError>;
}

/// v_loc + v_hartree + v_xc.
pub struct KohnShamPotential<'a> {
    disc: &'a dyn Discretization,
    electrostatics: &'a dyn Electrostatics,
    v_loc: QuadratureField,
    xc: Box<dyn XC>,
    mass: Vec<f64>,
}

impl<'a> KohnShamPotential<'a> {
    /// `v_loc` is the ionic local potential on the quadrature points.
    pub fn new(
        disc: &'a dyn Discretization,
        electrostatics: &'a dyn Electrostatics,
        v_loc: QuadratureField,
        xc: Box<dyn XC>,
    ) -> Result<Self, ScfError> {
        if !v_loc.matches(disc) {
            return Err(ScfError::Operator(hamiltonian::OperatorError::PotentialLayout));
        }

        Ok(KohnShamPotential {
            disc,
            electrostatics,
            v_loc,
            xc,
            mass: femesh::lumped_mass(disc),
        })
    }

    pub fn from_control(
        control: &control::Control,
        disc: &'a dyn Discretization,
        electrostatics: &'a dyn Electrostatics,
        v_loc: QuadratureField,
    ) -> Result<Self, ScfError> {
        let xc = xc::new(control.get_xc_scheme(), control.get_spin_scheme());

        KohnShamPotential::new(disc, electrostatics, v_loc, xc)
    }

    pub fn v_loc(&self) -> &QuadratureField {
        &self.v_loc
    }

    pub fn hartree(&self, rho: &DensityField) -> Result<QuadratureField, ScfError> {
        compute_v_hartree(self.disc, self.electrostatics, &self.mass, &rho.total())
    }
}

impl<'a> PotentialBuilder for KohnShamPotential<'a> {
    fn effective_potential(&self, rho: &DensityField) -> Result<EffectivePotential, ScfError> {
        if !rho.matches(self.disc) {
            return Err(ScfError::Density(density::DensityError::LayoutMismatch));
        }

        let vh = self.hartree(rho)?;

        let mut vxc = rho.clone();
        let mut exc = QuadratureField::zeros(self.disc);

        self.xc.potential_and_energy(rho, &mut vxc, &mut exc)?;

        let channels = (0..rho.n_spin())
            .map(|ispin| {
                let mut v = self.v_loc.clone();
                v.add_scaled(&vh, 1.0);
                v.add_scaled(vxc.channel(ispin), 1.0);
                v
            })
            .collect();

        Ok(EffectivePotential::new(channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use control::SpinScheme;
    use electrostatics::Line1DElectrostatics;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_components_add_up() {
        let mesh = Line1D::new(6.0, 48, Boundary::Dirichlet).unwrap();
        let es = Line1DElectrostatics::new(&mesh);

        let v_loc = QuadratureField::from_fn(&mesh, |x| -1.0 / (1.0 + (x[0] - 3.0).powi(2)).sqrt());

        let pot = KohnShamPotential::new(
            &mesh,
            &es,
            v_loc.clone(),
            xc::new(control::XcScheme::LdaPz, SpinScheme::NonSpin),
        )
        .unwrap();

        let rho = DensityField::NonSpin(QuadratureField::from_fn(&mesh, |x| {
            (-(x[0] - 3.0).powi(2)).exp()
        }));

        let veff = pot.effective_potential(&rho).unwrap();
        let vh = pot.hartree(&rho).unwrap();

        let mut vxc = rho.clone();
        let mut exc = QuadratureField::zeros(&mesh);
        xc::new(control::XcScheme::LdaPz, SpinScheme::NonSpin)
            .potential_and_energy(&rho, &mut vxc, &mut exc)
            .unwrap();

        assert_eq!(veff.n_spin(), 1);

        let total = veff.channel(0).flatten();
        let parts = multizip3(&v_loc.flatten(), &vh.flatten(), &vxc.channel(0).flatten());

        for (v, p) in total.iter().zip(parts.iter()) {
            assert_abs_diff_eq!(*v, *p, epsilon = 1e-12);
        }

        // repulsive Hartree on a positive charge with grounded ends
        assert!(vh.min_value() > 0.0);
    }

    #[test]
    fn test_spin_channels_differ_for_polarized_density() {
        let mesh = Line1D::new(6.0, 24, Boundary::Periodic).unwrap();
        let es = Line1DElectrostatics::new(&mesh);

        let pot = KohnShamPotential::new(
            &mesh,
            &es,
            QuadratureField::zeros(&mesh),
            xc::new(control::XcScheme::LdaPz, SpinScheme::Spin),
        )
        .unwrap();

        let rho = DensityField::Spin(
            QuadratureField::constant(&mesh, 0.3),
            QuadratureField::constant(&mesh, 0.1),
        );

        let veff = pot.effective_potential(&rho).unwrap();

        assert_eq!(veff.n_spin(), 2);
        assert!(veff.channel(0).min_value() < veff.channel(1).min_value());
    }

    #[test]
    fn test_rejects_foreign_layout() {
        let mesh = Line1D::new(2.0, 8, Boundary::Dirichlet).unwrap();
        let other = Line1D::new(2.0, 4, Boundary::Dirichlet).unwrap();
        let es = Line1DElectrostatics::new(&mesh);

        assert!(KohnShamPotential::new(
            &mesh,
            &es,
            QuadratureField::zeros(&other),
            xc::new(control::XcScheme::LdaPz, SpinScheme::NonSpin),
        )
        .is_err());
    }

    fn multizip3(a: &[f64], b: &[f64], c: &[f64]) -> Vec<f64> {
        itertools::multizip((a.iter(), b.iter(), c.iter()))
            .map(|(x, y, z)| x + y + z)
            .collect()
    }
}
