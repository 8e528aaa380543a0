use crate::*;
use control::MixingField;
use dfttypes::{DensityField, NodalDensity};
use electrostatics::Electrostatics;
use femesh::Discretization;
use log::debug;

/// Mixing of whole density fields in the representation chosen by
/// `scf_rho_mix_field`.
///
/// Quadrature mixing works on the JxW-weighted point values. Nodal mixing
/// projects both densities onto the nodes, mixes with the lumped-mass metric
/// and Kerker preconditioning, and interpolates the result back.
pub struct MixingEngine<'a> {
    field: MixingField,
    kernel: Box<dyn Mixing>,
    disc: &'a dyn Discretization,
    comm: &'a dyn Communicator,
    electrostatics: &'a dyn Electrostatics,
    mass: Vec<f64>,
    k0: f64,
}

impl<'a> MixingEngine<'a> {
    pub fn new(
        control: &Control,
        disc: &'a dyn Discretization,
        comm: &'a dyn Communicator,
        electrostatics: &'a dyn Electrostatics,
    ) -> Result<MixingEngine<'a>, MixingError> {
        Ok(MixingEngine {
            field: control.get_scf_rho_mix_field(),
            kernel: crate::new(control)?,
            disc,
            comm,
            electrostatics,
            mass: femesh::lumped_mass(disc),
            k0: control.get_scf_rho_mix_kerker_k0(),
        })
    }

    pub fn field(&self) -> MixingField {
        self.field
    }

    pub fn history_len(&self) -> usize {
        self.kernel.history_len()
    }

    /// Drops the history, e.g. after the discretization changed.
    pub fn reset(&mut self) {
        self.kernel.reset();
    }

    /// Replaces `rho_in` with the next input density.
    pub fn mix(
        &mut self,
        rho_in: &mut DensityField,
        rho_out: &DensityField,
    ) -> Result<MixingStep, MixingError> {
        match self.field {
            MixingField::Quadrature => self.mix_quadrature(rho_in, rho_out),
            MixingField::Nodal => {
                let mut nodal_in = density::project_density_to_nodal(rho_in, self.disc, &self.mass)?;
                let nodal_out = density::project_density_to_nodal(rho_out, self.disc, &self.mass)?;

                let step = self.mix_nodal(&mut nodal_in, &nodal_out)?;

                *rho_in = density::interpolate_density(&nodal_in, self.disc)?;

                Ok(step)
            }
        }
    }

    pub fn mix_quadrature(
        &mut self,
        rho_in: &mut DensityField,
        rho_out: &DensityField,
    ) -> Result<MixingStep, MixingError> {
        if !rho_in.same_layout(rho_out) || !rho_in.matches(self.disc) {
            return Err(MixingError::LayoutMismatch {
                expected: rho_in.len(),
                found: rho_out.len(),
            });
        }

        let weights = rho_in.weights(self.disc);
        let metric = MixingMetric::new(&weights, self.comm);

        let mut inp = rho_in.flatten();
        let out = rho_out.flatten();

        let step = self
            .kernel
            .compute_next_density(&metric, &IdentityPreconditioner, &mut inp, &out)?;

        rho_in.assign_flat(&inp);

        debug!(
            "quadrature mixing: residual {:.6E}, history {}",
            step.residual_norm, step.history_len
        );

        Ok(step)
    }

    pub fn mix_nodal(
        &mut self,
        rho_in: &mut NodalDensity,
        rho_out: &NodalDensity,
    ) -> Result<MixingStep, MixingError> {
        let n = self.mass.len();

        if !rho_in.same_layout(rho_out) || rho_in.len_per_spin() != n {
            return Err(MixingError::LayoutMismatch {
                expected: n,
                found: rho_out.len_per_spin(),
            });
        }

        let n_spin = rho_in.n_spin();

        let weights: Vec<f64> = self.mass.iter().cycle().take(n * n_spin).copied().collect();
        let metric = MixingMetric::new(&weights, self.comm);

        let precond = KerkerPreconditioner::new(self.electrostatics, self.k0, n_spin);

        let mut inp = rho_in.flatten();
        let out = rho_out.flatten();

        let step = self
            .kernel
            .compute_next_density(&metric, &precond, &mut inp, &out)?;

        rho_in.assign_flat(&inp);

        debug!(
            "nodal mixing: residual {:.6E}, history {}",
            step.residual_norm, step.history_len
        );

        Ok(step)
    }
}
