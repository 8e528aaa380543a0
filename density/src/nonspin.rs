use crate::*;

pub struct DensityNonspin {}

impl DensityNonspin {
    pub fn new() -> DensityNonspin {
        DensityNonspin {}
    }
}

impl<T: Scalar> Density<T> for DensityNonspin {
    fn compute_charge_density(
        &self,
        disc: &dyn Discretization,
        channels: &[ChannelContribution<T>],
        groups: &ProcessGroups,
    ) -> Result<DensityField, DensityError> {
        let mut rho = QuadratureField::zeros(disc);

        let spin_factor = SpinScheme::NonSpin.spin_factor();

        for ch in channels.iter() {
            accumulate_channel(disc, ch, spin_factor, groups.band(), &mut rho)?;
        }

        let mut rho = DensityField::NonSpin(rho);

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
        let rho = QuadratureField::from_fn(disc, |x| {
            atoms.iter().map(|a| a.value_at(&x)).sum::<f64>()
        });

        let mut rho = DensityField::NonSpin(rho);

        normalize(&mut rho, disc, nelec, domain)?;

        Ok(rho)
    }
}
