use crate::utils;
use crate::*;
use dfttypes::Checkpoint;
use feconsts::*;
use linalg::LinalgScalar;
use log::info;
use std::time::Instant;

/// Runs the outer fixed-point loop on an `ScfContext`.
///
/// Each iteration eigensolves every channel, occupies the states, builds and
/// normalizes the output density, mixes it into the input density, rebuilds
/// the operators from the mixed density and checks both residuals.
#[derive(Default)]
pub struct ScfDriver<'c> {
    checkpoint: Option<(&'c dyn Checkpoint, String)>,
}

impl<'c> ScfDriver<'c> {
    pub fn new() -> Self {
        ScfDriver { checkpoint: None }
    }

    /// Stores the final input density under `run_id` when the run ends.
    pub fn with_checkpoint(checkpoint: &'c dyn Checkpoint, run_id: &str) -> Self {
        ScfDriver {
            checkpoint: Some((checkpoint, run_id.to_string())),
        }
    }

    pub fn run<T: LinalgScalar>(&self, ctx: &mut ScfContext<T>) -> Result<ScfReport, ScfError> {
        let policy = ConvergencePolicy::from_control(ctx.control());
        let first_passes = ctx.control().get_first_scf_filter_passes();

        let is_root = ctx.system().groups.domain().is_root();

        ctx.set_state(ScfState::IteratingUnconverged);

        if is_root {
            utils::display_header();
        }

        let mut records = Vec::new();
        let mut iteration = 1;

        loop {
            let timer = Instant::now();

            let passes = if iteration == 1 { first_passes } else { 1 };

            let n_hx = ctx.solve_channels(passes)?;

            let fermi_energy = ctx.occupy()?;

            let mut rho_out = ctx.output_density()?;

            let total_charge = ctx.total_charge(&rho_out);

            let step = ctx.mix(&mut rho_out)?;

            let magnetization = ctx.total_magnetization(&rho_out);

            ctx.update_potential()?;

            let max_residual_norm = ctx.max_residual_norm();

            let record = IterationRecord {
                iteration,
                max_residual_norm,
                mixing_residual_norm: step.residual_norm,
                fermi_energy,
                total_charge,
                magnetization,
                mixing_fell_back: step.fell_back,
                n_hx,
                wall_time: timer.elapsed(),
            };

            if is_root {
                utils::display_iteration(&record);
            }

            records.push(record);

            if policy
                .check(iteration, max_residual_norm, step.residual_norm)
                .is_converged()
            {
                ctx.set_state(ScfState::Converged);
                break;
            }

            if policy.is_last(iteration) {
                ctx.set_state(ScfState::DivergedMaxIterations);
                break;
            }

            iteration += 1;
        }

        if is_root {
            info!("");
            info!("     {:<width1$}", ctx.state(), width1 = OUT_WIDTH1);

            utils::display_eigen_values(ctx.channels(), ctx.occupations());
        }

        if let Some((checkpoint, run_id)) = self.checkpoint.as_ref() {
            ctx.save_checkpoint(*checkpoint, run_id)?;
        }

        Ok(ScfReport {
            state: ctx.state(),
            iterations: records,
            fermi_energy: ctx.fermi_energy(),
            eigenvalues: ctx.eigenvalues(),
            occupations: ctx.occupations().to_vec(),
        })
    }
}
