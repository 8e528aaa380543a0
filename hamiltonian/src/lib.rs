//! Discretized Kohn-Sham Hamiltonian behind the operator contract used by
//! the eigensolver.
//!
//! Vectors live in the mass-scaled basis x = M^{1/2} psi with the lumped
//! mass M, so the eigensolver works with the Euclidean inner product and
//! never sees the discretization.

mod nonlocal;
pub use nonlocal::*;

mod kohnsham;
pub use kohnsham::*;

use fecomm::Communicator;
use femesh::{ConstraintMap, DofPartition, MeshError};
use matrix::Matrix;
use std::fmt;
use types::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorError {
    InconsistentPartition(MeshError),
    ComplexPhaseInRealArithmetic { kpoint: [f64; 3] },
    PotentialLayout,
    InvalidProjector { atom: usize, reason: String },
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OperatorError::InconsistentPartition(e) => write!(f, "{}", e),
            OperatorError::ComplexPhaseInRealArithmetic { kpoint } => write!(
                f,
                "k-point {:?} carries a Bloch phase but the operator uses real arithmetic",
                kpoint
            ),
            OperatorError::PotentialLayout => write!(
                f,
                "effective potential is not laid out on the quadrature points of the discretization"
            ),
            OperatorError::InvalidProjector { atom, reason } => {
                write!(f, "nonlocal projector of atom {}: {}", atom, reason)
            }
        }
    }
}

impl std::error::Error for OperatorError {}

pub trait Operator<T: Scalar>: Send + Sync {
    /// Lumped mass at the locally relevant dofs, constraints condensed.
    fn compute_mass_vector(&self) -> Vec<f64>;

    /// Y = H X column by column; constrained rows of Y are zero.
    fn hx(&self, x: &Matrix<T>, y: &mut Matrix<T>);

    /// X^H H X, local rows reduced over the domain group.
    fn xthx(&self, x: &Matrix<T>) -> Matrix<T> {
        let mut hx = Matrix::<T>::new(x.nrow(), x.ncol());
        self.hx(x, &mut hx);

        let mut m = x.adjoint_dot_rows(&hx, self.partition().owned_range());

        fecomm::all_reduce_slice_sum(self.comm(), m.as_mut_slice());

        m
    }

    fn n_local_dofs(&self) -> usize;

    fn partition(&self) -> &DofPartition;

    fn constraints(&self) -> &ConstraintMap;

    fn comm(&self) -> &dyn Communicator;

    /// M^{-1/2}, zero where the condensed mass vanishes.
    fn inv_sqrt_mass(&self) -> &[f64];
}

/// 1/sqrt(m), mapping a vanishing mass to zero.
pub fn inv_sqrt(mass: &[f64]) -> Vec<f64> {
    mass.iter()
        .map(|m| if *m > 0.0 { 1.0 / m.sqrt() } else { 0.0 })
        .collect()
}
