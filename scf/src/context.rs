use crate::{EffectivePotential, PotentialBuilder, ScfError, ScfState};
use control::{Control, ControlError, SpinScheme};
use density::Density;
use dfttypes::*;
use eigensolver::{EigenSolver, EigenSolverError, EigenSolverOutcome};
use electrostatics::Electrostatics;
use fecomm::ProcessGroups;
use femesh::Discretization;
use fermilevel::{ChannelLevels, FermiLevel};
use hamiltonian::{KohnShamOperator, NonlocalProjectors, Operator};
use linalg::LinalgScalar;
use log::{debug, info};
use mixing::{MixingEngine, MixingStep};
use rayon::prelude::*;

/// Collaborators and problem data fixed for the whole run.
pub struct ScfSystem<'a> {
    pub disc: &'a dyn Discretization,
    pub groups: &'a ProcessGroups,
    pub electrostatics: &'a dyn Electrostatics,
    pub potential: &'a dyn PotentialBuilder,
    /// k-points handled by this pool.
    pub kpoints: Vec<KPoint>,
    pub projectors: NonlocalProjectors,
    pub nelec: f64,
}

/// Number of states that must be (at least partly) occupied in every channel.
pub fn n_occupied_states(
    nelec: f64,
    spin_scheme: SpinScheme,
    constrained_magnetization: Option<f64>,
) -> usize {
    let n = match spin_scheme {
        SpinScheme::NonSpin => nelec / 2.0,
        SpinScheme::Spin => {
            let m = constrained_magnetization.unwrap_or(0.0).abs();
            (nelec + m) / 2.0
        }
    };

    (n - feconsts::EPS8).ceil().max(1.0) as usize
}

/// One (spin, k-point) channel: its operator, subspace and warm-started solver.
pub struct ChannelState<'a, T> {
    spin: usize,
    kpoint: KPoint,
    operator: KohnShamOperator<'a, T>,
    wavefunctions: Wavefunctions<T>,
    solver: Box<dyn EigenSolver<T>>,
    outcome: Option<EigenSolverOutcome>,
}

impl<'a, T: LinalgScalar> ChannelState<'a, T> {
    pub fn spin(&self) -> usize {
        self.spin
    }

    pub fn kpoint(&self) -> &KPoint {
        &self.kpoint
    }

    pub fn operator(&self) -> &KohnShamOperator<'a, T> {
        &self.operator
    }

    pub fn wavefunctions(&self) -> &Wavefunctions<T> {
        &self.wavefunctions
    }

    pub fn eigenvalues(&self) -> &[f64] {
        self.outcome
            .as_ref()
            .map(|o| o.eigenvalues.as_slice())
            .unwrap_or(&[])
    }

    pub fn outcome(&self) -> Option<&EigenSolverOutcome> {
        self.outcome.as_ref()
    }

    /// Up to `passes` filtered updates, stopping once every tracked residual
    /// is below `epsilon`. Returns the number of HX applications.
    fn solve(&mut self, passes: usize, epsilon: f64) -> Result<usize, EigenSolverError> {
        let mut n_hx = 0;

        for _ in 0..passes.max(1) {
            let outcome = self.solver.compute(&self.operator, &mut self.wavefunctions)?;

            n_hx += outcome.n_hx;

            let worst = outcome.residual_norms.iter().fold(0.0, |m: f64, r| m.max(*r));

            self.outcome = Some(outcome);

            if worst < epsilon {
                break;
            }
        }

        Ok(n_hx)
    }
}

/// Everything one SCF run carries from iteration to iteration.
pub struct ScfContext<'a, T> {
    control: &'a Control,
    system: ScfSystem<'a>,
    n_occupied: usize,
    rho_in: DensityField,
    channels: Vec<ChannelState<'a, T>>,
    mixing: MixingEngine<'a>,
    fermi: Box<dyn FermiLevel>,
    density: Box<dyn Density<T>>,
    state: ScfState,
    fermi_energy: f64,
    occupations: Vec<Vec<f64>>,
}

impl<'a, T: LinalgScalar> ScfContext<'a, T> {
    /// Validates the configuration, normalizes `rho_init` and sets up one
    /// operator, subspace and eigensolver per (spin, k-point) channel.
    pub fn new(
        control: &'a Control,
        system: ScfSystem<'a>,
        rho_init: DensityField,
    ) -> Result<Self, ScfError> {
        control.validate()?;

        let nelec = system.nelec;

        if !(nelec > 0.0) || !nelec.is_finite() {
            return Err(ScfError::InvalidElectronCount(nelec));
        }

        if let Some(m) = control.get_constrained_magnetization() {
            if m.abs() > nelec {
                return Err(ScfError::Control(ControlError::InvalidParameter {
                    name: "constrained_magnetization",
                    reason: format!("|{}| exceeds the {} electrons of the system", m, nelec),
                }));
            }
        }

        if system.kpoints.is_empty() {
            return Err(ScfError::Control(ControlError::InvalidParameter {
                name: "kpoints",
                reason: "no k-point assigned to this pool".to_string(),
            }));
        }

        let spin_scheme = control.get_spin_scheme();
        let n_spin = spin_scheme.n_spin();

        if rho_init.n_spin() != n_spin {
            return Err(ScfError::InitialDensity(format!(
                "{} spin channels given for spin scheme '{}'",
                rho_init.n_spin(),
                spin_scheme
            )));
        }

        if !rho_init.matches(system.disc) {
            return Err(ScfError::InitialDensity(
                "density is not laid out on the discretization".to_string(),
            ));
        }

        let n_occupied =
            n_occupied_states(nelec, spin_scheme, control.get_constrained_magnetization());

        let n_channels = n_spin * system.kpoints.len();

        let mut solvers = Vec::with_capacity(n_channels);
        for _ in 0..n_channels {
            solvers.push(eigensolver::new::<T>(control, n_occupied)?);
        }

        let mut rho_in = rho_init;
        density::normalize(&mut rho_in, system.disc, nelec, system.groups.domain())?;

        let veff = system.potential.effective_potential(&rho_in)?;

        let mut channels = Vec::with_capacity(n_channels);

        for (ich, solver) in solvers.into_iter().enumerate() {
            let spin = ich / system.kpoints.len();
            let kpoint = system.kpoints[ich % system.kpoints.len()];

            let operator = KohnShamOperator::new(
                system.disc,
                system.groups.domain(),
                kpoint,
                veff.channel(spin),
                system.projectors.clone(),
            )?;

            let wavefunctions = Wavefunctions::random(
                operator.n_local_dofs(),
                solver.n_subspace(),
                operator.constraints(),
                control.get_seed().wrapping_add(ich as u64),
            );

            channels.push(ChannelState {
                spin,
                kpoint,
                operator,
                wavefunctions,
                solver,
                outcome: None,
            });
        }

        let mixing = MixingEngine::new(
            control,
            system.disc,
            system.groups.domain(),
            system.electrostatics,
        )?;

        let fermi = fermilevel::new(
            spin_scheme,
            control.get_constrained_magnetization(),
            smearing::new(control.get_smearing_scheme()),
            control.get_temperature(),
        );

        info!(
            "scf context: {} channel(s), {} occupied of {} subspace states, {} electrons",
            n_channels,
            n_occupied,
            channels.first().map(|c| c.wavefunctions.n_states()).unwrap_or(0),
            nelec
        );

        Ok(ScfContext {
            control,
            system,
            n_occupied,
            rho_in,
            channels,
            mixing,
            fermi,
            density: density::new::<T>(spin_scheme),
            state: ScfState::Initializing,
            fermi_energy: 0.0,
            occupations: Vec::new(),
        })
    }

    /// Restarts from the density stored under `run_id`.
    pub fn from_checkpoint(
        control: &'a Control,
        system: ScfSystem<'a>,
        checkpoint: &dyn Checkpoint,
        run_id: &str,
    ) -> Result<Self, ScfError> {
        let rho = checkpoint.load(run_id, system.disc.layout())?;

        info!("restarting from checkpoint '{}'", run_id);

        ScfContext::new(control, system, rho)
    }

    pub fn save_checkpoint(&self, checkpoint: &dyn Checkpoint, run_id: &str) -> Result<(), ScfError> {
        checkpoint.save(run_id, &self.rho_in, self.system.disc.layout())?;

        Ok(())
    }

    pub fn control(&self) -> &Control {
        self.control
    }

    pub fn system(&self) -> &ScfSystem<'a> {
        &self.system
    }

    pub fn state(&self) -> ScfState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ScfState) {
        debug!("scf state {} -> {}", self.state, state);
        self.state = state;
    }

    pub fn n_occupied(&self) -> usize {
        self.n_occupied
    }

    /// Current input density, the converged one after a successful run.
    pub fn density(&self) -> &DensityField {
        &self.rho_in
    }

    pub fn channels(&self) -> &[ChannelState<'a, T>] {
        &self.channels
    }

    pub fn fermi_energy(&self) -> f64 {
        self.fermi_energy
    }

    pub fn occupations(&self) -> &[Vec<f64>] {
        &self.occupations
    }

    pub fn eigenvalues(&self) -> VKEigenValue {
        VKEigenValue::from_channels(
            self.rho_in.n_spin(),
            self.channels.iter().map(|c| c.eigenvalues().to_vec()).collect(),
        )
    }

    pub fn mixing_history_len(&self) -> usize {
        self.mixing.history_len()
    }

    /// Eigensolves all channels concurrently; returns the total HX count.
    pub(crate) fn solve_channels(&mut self, passes: usize) -> Result<usize, ScfError> {
        let epsilon = self.control.get_eigval_residual_epsilon();

        let n_hx = self
            .channels
            .par_iter_mut()
            .map(|ch| ch.solve(passes, epsilon))
            .collect::<Result<Vec<usize>, EigenSolverError>>()?;

        Ok(n_hx.iter().sum())
    }

    /// Fermi level and occupations from the current eigenvalues.
    pub(crate) fn occupy(&mut self) -> Result<f64, ScfError> {
        let levels: Vec<ChannelLevels> = self
            .channels
            .iter()
            .map(|ch| ChannelLevels {
                spin: ch.spin,
                k_weight: ch.kpoint.weight,
                eigenvalues: ch.eigenvalues(),
            })
            .collect();

        let solution =
            self.fermi
                .get_fermi_level(&levels, self.system.nelec, self.system.groups.kpool())?;

        self.fermi_energy = solution.fermi_level;
        self.occupations = solution.occupations;

        Ok(self.fermi_energy)
    }

    /// Occupation-weighted density of the current states, not yet normalized.
    pub(crate) fn output_density(&self) -> Result<DensityField, ScfError> {
        let contributions: Vec<density::ChannelContribution<T>> = self
            .channels
            .iter()
            .zip(self.occupations.iter())
            .map(|(ch, occ)| density::ChannelContribution {
                spin: ch.spin,
                k_weight: ch.kpoint.weight,
                wavefunctions: &ch.wavefunctions,
                occupations: occ,
                inv_sqrt_mass: ch.operator.inv_sqrt_mass(),
            })
            .collect();

        Ok(self
            .density
            .compute_charge_density(self.system.disc, &contributions, self.system.groups)?)
    }

    /// Largest residual among occupied tracked states, over the k-point pool.
    pub(crate) fn max_residual_norm(&self) -> f64 {
        let local = self
            .channels
            .iter()
            .zip(self.occupations.iter())
            .filter_map(|(ch, occ)| {
                ch.outcome.as_ref().map(|o| {
                    crate::max_occupied_residual(&o.residual_norms, occ, o.n_core)
                })
            })
            .fold(0.0, f64::max);

        fecomm::all_reduce_scalar_max(self.system.groups.kpool(), local)
    }

    /// Normalizes `rho_out` and replaces the input density with the mixed one.
    pub(crate) fn mix(&mut self, rho_out: &mut DensityField) -> Result<MixingStep, ScfError> {
        let disc = self.system.disc;
        let domain = self.system.groups.domain();
        let nelec = self.system.nelec;

        density::normalize(rho_out, disc, nelec, domain)?;

        let step = self.mixing.mix(&mut self.rho_in, rho_out)?;

        density::normalize(&mut self.rho_in, disc, nelec, domain)?;

        Ok(step)
    }

    /// Rebuilds every channel operator from the current input density.
    pub(crate) fn update_potential(&mut self) -> Result<EffectivePotential, ScfError> {
        let veff = self.system.potential.effective_potential(&self.rho_in)?;

        for ch in self.channels.iter_mut() {
            ch.operator.reinit(veff.channel(ch.spin))?;
        }

        Ok(veff)
    }

    pub(crate) fn total_charge(&self, rho: &DensityField) -> f64 {
        density::total_charge(rho, self.system.disc, self.system.groups.domain())
    }

    pub(crate) fn total_magnetization(&self, rho: &DensityField) -> f64 {
        density::total_magnetization(rho, self.system.disc, self.system.groups.domain())
    }
}
