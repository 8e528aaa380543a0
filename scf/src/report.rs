use dfttypes::VKEigenValue;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScfState {
    Initializing,
    IteratingUnconverged,
    Converged,
    DivergedMaxIterations,
}

impl ScfState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScfState::Converged | ScfState::DivergedMaxIterations)
    }
}

impl fmt::Display for ScfState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ScfState::Initializing => "initializing",
            ScfState::IteratingUnconverged => "iterating",
            ScfState::Converged => "scf_convergence_success",
            ScfState::DivergedMaxIterations => "scf_convergence_failure",
        };

        f.pad(s)
    }
}

/// Diagnostics of one outer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub max_residual_norm: f64,
    pub mixing_residual_norm: f64,
    pub fermi_energy: f64,
    /// Charge of the output density before normalization.
    pub total_charge: f64,
    pub magnetization: f64,
    pub mixing_fell_back: bool,
    pub n_hx: usize,
    pub wall_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScfReport {
    pub state: ScfState,
    pub iterations: Vec<IterationRecord>,
    pub fermi_energy: f64,
    pub eigenvalues: VKEigenValue,
    /// Per channel, spin-major like `eigenvalues`.
    pub occupations: Vec<Vec<f64>>,
}

impl ScfReport {
    pub fn is_converged(&self) -> bool {
        self.state == ScfState::Converged
    }

    pub fn n_iterations(&self) -> usize {
        self.iterations.len()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }

    pub fn total_wall_time(&self) -> Duration {
        self.iterations.iter().map(|r| r.wall_time).sum()
    }
}
