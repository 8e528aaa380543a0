mod simple;
pub use simple::*;

mod anderson;
pub use anderson::*;

mod broyden;
pub use broyden::*;

mod precond;
pub use precond::*;

mod engine;
pub use engine::*;

use control::{Control, MixingScheme};
use density::DensityError;
use electrostatics::ElectrostaticsError;
use fecomm::Communicator;
use itertools::multizip;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MixingError {
    /// History window unusable for the requested scheme.
    InvalidHistory(String),
    LayoutMismatch { expected: usize, found: usize },
    Electrostatics(ElectrostaticsError),
    Density(DensityError),
}

impl fmt::Display for MixingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MixingError::InvalidHistory(s) => write!(f, "invalid mixing history: {}", s),
            MixingError::LayoutMismatch { expected, found } => write!(
                f,
                "mixing expected {} values, got {}",
                expected, found
            ),
            MixingError::Electrostatics(e) => write!(f, "kerker preconditioner: {}", e),
            MixingError::Density(e) => write!(f, "nodal mixing: {}", e),
        }
    }
}

impl std::error::Error for MixingError {}

impl From<ElectrostaticsError> for MixingError {
    fn from(e: ElectrostaticsError) -> Self {
        MixingError::Electrostatics(e)
    }
}

impl From<DensityError> for MixingError {
    fn from(e: DensityError) -> Self {
        MixingError::Density(e)
    }
}

/// Integration weights of a flattened field plus the group over which
/// partial sums are completed.
pub struct MixingMetric<'a> {
    pub weights: &'a [f64],
    pub comm: &'a dyn Communicator,
}

impl<'a> MixingMetric<'a> {
    pub fn new(weights: &'a [f64], comm: &'a dyn Communicator) -> Self {
        MixingMetric { weights, comm }
    }

    pub fn dot(&self, u: &[f64], v: &[f64]) -> f64 {
        fecomm::all_reduce_scalar_sum(self.comm, utility::ddot_product_metric(u, v, self.weights))
    }

    pub fn norm(&self, v: &[f64]) -> f64 {
        self.dot(v, v).sqrt()
    }

    /// sqrt(sum w (out - in)^2)
    pub fn distance(&self, inp: &[f64], out: &[f64]) -> f64 {
        let d = utility::weighted_distance(out, inp, self.weights);

        fecomm::all_reduce_scalar_sum(self.comm, d * d).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixingStep {
    /// sqrt(sum w (out - in)^2) of the pair that was mixed.
    pub residual_norm: f64,
    /// The extrapolation was rejected and simple mixing used instead.
    pub fell_back: bool,
    pub history_len: usize,
}

pub trait Mixing: Send {
    /// Overwrites `inp` with the next input density.
    fn compute_next_density(
        &mut self,
        metric: &MixingMetric,
        precond: &dyn Preconditioner,
        inp: &mut [f64],
        out: &[f64],
    ) -> Result<MixingStep, MixingError>;

    /// Forgets all stored iterates.
    fn reset(&mut self);

    fn history_len(&self) -> usize;
}

pub fn new(control: &Control) -> Result<Box<dyn Mixing>, MixingError> {
    let beta = control.get_scf_rho_mix_beta();
    let nhistory = control.get_scf_rho_mix_history_steps();
    let threshold = control.get_scf_rho_mix_condition_threshold();

    let mixing: Box<dyn Mixing> = match control.get_scf_rho_mix_scheme() {
        MixingScheme::Simple => Box::new(MixingSimple::new(beta)),
        MixingScheme::Anderson => Box::new(MixingAnderson::new(beta, nhistory, threshold)?),
        MixingScheme::Broyden => Box::new(MixingBroyden::new(
            beta,
            nhistory,
            threshold,
            BroydenWeights {
                w0: control.get_scf_rho_mix_broyden_w0(),
                factor: control.get_scf_rho_mix_broyden_weight_factor(),
                min: control.get_scf_rho_mix_broyden_weight_min(),
                max: control.get_scf_rho_mix_broyden_weight_max(),
            },
        )?),
    };

    Ok(mixing)
}

fn check_lengths(metric: &MixingMetric, inp: &[f64], out: &[f64]) -> Result<(), MixingError> {
    for n in [inp.len(), out.len()] {
        if n != metric.weights.len() {
            return Err(MixingError::LayoutMismatch {
                expected: metric.weights.len(),
                found: n,
            });
        }
    }

    Ok(())
}

/// in <- in + beta P(out - in); without preconditioning the exact
/// (1 - beta) in + beta out form is used.
fn simple_step(
    beta: f64,
    precond: &dyn Preconditioner,
    inp: &mut [f64],
    out: &[f64],
) -> Result<(), MixingError> {
    if precond.is_identity() {
        for (x, y) in multizip((inp.iter_mut(), out.iter())) {
            *x = (1.0 - beta) * *x + beta * y;
        }

        return Ok(());
    }

    let pres = precond.apply(&residual(inp, out))?;

    for (x, p) in multizip((inp.iter_mut(), pres.iter())) {
        *x += beta * p;
    }

    Ok(())
}

fn residual(inp: &[f64], out: &[f64]) -> Vec<f64> {
    multizip((out.iter(), inp.iter())).map(|(o, i)| o - i).collect()
}
