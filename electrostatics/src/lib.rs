//! Linear-solve service for the Hartree potential and the Kerker
//! preconditioner.

mod tridiagonal;
pub use tridiagonal::*;

mod line1d;
pub use line1d::*;

use dfttypes::NodalField;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ElectrostaticsError {
    LayoutMismatch { expected: usize, found: usize },
    InvalidScreening(f64),
    Singular,
}

impl fmt::Display for ElectrostaticsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElectrostaticsError::LayoutMismatch { expected, found } => write!(
                f,
                "nodal field has {} values, discretization has {} dofs",
                found, expected
            ),
            ElectrostaticsError::InvalidScreening(k0) => {
                write!(f, "screening wave vector {} is not positive", k0)
            }
            ElectrostaticsError::Singular => write!(f, "linear system is singular"),
        }
    }
}

impl std::error::Error for ElectrostaticsError {}

pub trait Electrostatics: Send + Sync {
    /// -lap(phi) = 4 pi rho. Periodic solutions have zero mean and the
    /// average charge is neutralized by a uniform background.
    fn solve_poisson(&self, rho: &NodalField) -> Result<NodalField, ElectrostaticsError>;

    /// (-lap + k0^2) x = k0^2 rhs
    fn solve_screened(&self, rhs: &NodalField, k0: f64) -> Result<NodalField, ElectrostaticsError>;
}
