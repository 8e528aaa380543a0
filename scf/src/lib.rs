//! Self-consistent field loop: eigensolve every (spin, k-point) channel,
//! occupy, rebuild the density, mix, repeat until both the eigen-residual and
//! the mixing residual drop below their thresholds.

mod hartree;
pub use hartree::*;

mod potential;
pub use potential::*;

mod convergence;
pub use convergence::*;

mod report;
pub use report::*;

mod context;
pub use context::*;

mod driver;
pub use driver::*;

mod groundstate;
pub use groundstate::*;

mod utils;

use control::ControlError;
use density::DensityError;
use dfttypes::CheckpointError;
use eigensolver::EigenSolverError;
use electrostatics::ElectrostaticsError;
use fermilevel::FermiLevelError;
use hamiltonian::OperatorError;
use mixing::MixingError;
use std::fmt;
use xc::XCError;

#[derive(Debug)]
pub enum ScfError {
    Control(ControlError),
    Operator(OperatorError),
    EigenSolver(EigenSolverError),
    FermiLevel(FermiLevelError),
    Density(DensityError),
    Mixing(MixingError),
    Electrostatics(ElectrostaticsError),
    XC(XCError),
    Checkpoint(CheckpointError),
    InitialDensity(String),
    InvalidElectronCount(f64),
}

impl fmt::Display for ScfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScfError::Control(e) => write!(f, "control: {}", e),
            ScfError::Operator(e) => write!(f, "operator: {}", e),
            ScfError::EigenSolver(e) => write!(f, "eigensolver: {}", e),
            ScfError::FermiLevel(e) => write!(f, "fermi level: {}", e),
            ScfError::Density(e) => write!(f, "density: {}", e),
            ScfError::Mixing(e) => write!(f, "mixing: {}", e),
            ScfError::Electrostatics(e) => write!(f, "electrostatics: {}", e),
            ScfError::XC(e) => write!(f, "xc: {}", e),
            ScfError::Checkpoint(e) => write!(f, "checkpoint: {}", e),
            ScfError::InitialDensity(s) => write!(f, "initial density: {}", s),
            ScfError::InvalidElectronCount(n) => write!(f, "invalid electron count {}", n),
        }
    }
}

impl std::error::Error for ScfError {}

macro_rules! impl_from_error {
    ($( $e:ty => $v:path ),+ ) => {
        $(
            impl From<$e> for ScfError {
                fn from(e: $e) -> Self {
                    $v(e)
                }
            }
        )+
    };
}

impl_from_error!(
    ControlError => ScfError::Control,
    OperatorError => ScfError::Operator,
    EigenSolverError => ScfError::EigenSolver,
    FermiLevelError => ScfError::FermiLevel,
    DensityError => ScfError::Density,
    MixingError => ScfError::Mixing,
    ElectrostaticsError => ScfError::Electrostatics,
    XCError => ScfError::XC,
    CheckpointError => ScfError::Checkpoint
);

impl ScfError {
    /// Errors that can only be fixed by changing the run parameters.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ScfError::Control(_) => true,
            ScfError::EigenSolver(e) => matches!(
                e,
                EigenSolverError::SubspaceTooSmall { .. } | EigenSolverError::InvalidSpectrumSplit { .. }
            ),
            ScfError::Operator(e) => matches!(
                e,
                OperatorError::InconsistentPartition(_)
                    | OperatorError::ComplexPhaseInRealArithmetic { .. }
            ),
            ScfError::Mixing(MixingError::InvalidHistory(_)) => true,
            _ => false,
        }
    }
}
