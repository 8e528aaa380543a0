//! Chebyshev-filtered subspace iteration for the lowest eigenpairs of an
//! [`Operator`] in its mass-scaled basis.

mod chfsi;
pub use chfsi::*;

mod lanczos;
pub use lanczos::*;

mod filter;
pub use filter::*;

mod orthonormalize;
pub use orthonormalize::*;

mod rayleigh_ritz;
pub use rayleigh_ritz::*;

use control::{Control, EigenSolverScheme};
use dfttypes::Wavefunctions;
use hamiltonian::Operator;
use linalg::{LinalgError, LinalgScalar};
use std::fmt;
use types::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub enum EigenSolverError {
    SubspaceTooSmall {
        n_subspace: usize,
        n_occupied: usize,
    },
    InvalidSpectrumSplit {
        n_tracked: usize,
        n_subspace: usize,
        n_occupied: usize,
    },
    SubspaceMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    OrthonormalizationBreakdown,
    Linalg(LinalgError),
}

impl fmt::Display for EigenSolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EigenSolverError::SubspaceTooSmall {
                n_subspace,
                n_occupied,
            } => write!(
                f,
                "subspace of {} vectors cannot hold {} occupied states",
                n_subspace, n_occupied
            ),
            EigenSolverError::InvalidSpectrumSplit {
                n_tracked,
                n_subspace,
                n_occupied,
            } => write!(
                f,
                "{} tracked of {} states: the untracked core must stay below the {} occupied states",
                n_tracked, n_subspace, n_occupied
            ),
            EigenSolverError::SubspaceMismatch { expected, found } => write!(
                f,
                "wavefunctions are {} x {}, operator expects {} x {}",
                found.0, found.1, expected.0, expected.1
            ),
            EigenSolverError::OrthonormalizationBreakdown => {
                write!(f, "subspace overlap stays indefinite after a shifted retry")
            }
            EigenSolverError::Linalg(e) => write!(f, "dense linear algebra: {}", e),
        }
    }
}

impl std::error::Error for EigenSolverError {}

impl From<LinalgError> for EigenSolverError {
    fn from(e: LinalgError) -> Self {
        EigenSolverError::Linalg(e)
    }
}

/// Filter interval: components in [b_low, b] are damped, those towards a0
/// amplified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralBounds {
    pub a0: f64,
    pub b_low: f64,
    pub b: f64,
}

impl SpectralBounds {
    /// Moves b_low to the midpoint of [a0, b] when the damped interval is empty.
    pub fn sanitized(&self) -> SpectralBounds {
        let mut bounds = *self;

        if !(bounds.a0 < bounds.b_low && bounds.b_low < bounds.b) {
            bounds.b_low = 0.5 * (bounds.a0 + bounds.b);
        }

        bounds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EigenSolverOutcome {
    /// All Ritz values of the subspace, ascending.
    pub eigenvalues: Vec<f64>,
    /// ||H y - e y|| of the tracked states, i.e. eigenvalues[n_core..].
    pub residual_norms: Vec<f64>,
    pub n_core: usize,
    pub n_hx: usize,
}

pub trait EigenSolver<T: Scalar>: Send + Sync {
    /// One filtered subspace update of `wfc` under `op`.
    fn compute(
        &mut self,
        op: &dyn Operator<T>,
        wfc: &mut Wavefunctions<T>,
    ) -> Result<EigenSolverOutcome, EigenSolverError>;

    /// Bounds carried into the next call.
    fn bounds(&self) -> Option<SpectralBounds>;

    /// Forgets the warm start.
    fn reset(&mut self);

    fn n_subspace(&self) -> usize;
}

pub fn new<T: LinalgScalar>(
    control: &Control,
    n_occupied: usize,
) -> Result<Box<dyn EigenSolver<T>>, EigenSolverError> {
    match control.get_eigen_solver() {
        EigenSolverScheme::Chfsi => Ok(Box::new(ChebyshevFilteredSubspaceIteration::new(
            ChfsiParams::from_control(control, n_occupied),
        )?)),
    }
}

/// u^H v over the owned rows, summed over the domain group.
pub fn owned_dot<T: Scalar>(op: &dyn Operator<T>, u: &[T], v: &[T]) -> T {
    let r = op.partition().owned_range();

    let mut s = [utility::dot_product(&u[r.clone()], &v[r])];

    fecomm::all_reduce_slice_sum(op.comm(), &mut s);

    s[0]
}

pub fn owned_norm<T: Scalar>(op: &dyn Operator<T>, v: &[T]) -> f64 {
    let r = op.partition().owned_range();

    fecomm::all_reduce_scalar_sum(op.comm(), utility::l2_norm_sqr(&v[r])).sqrt()
}
