//! Finite-element discretization interfaces: cells, dof ownership,
//! constraints, and per-cell quadrature data.

mod constraints;
pub use constraints::*;

mod partition;
pub use partition::*;

mod line1d;
pub use line1d::*;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    InconsistentPartition(String),
    InvalidMesh(String),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeshError::InconsistentPartition(s) => write!(f, "inconsistent dof partition: {}", s),
            MeshError::InvalidMesh(s) => write!(f, "invalid mesh: {}", s),
        }
    }
}

impl std::error::Error for MeshError {}

/// Layout summary used to check that stored fields match a discretization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscretizationLayout {
    pub n_cells: usize,
    pub n_q_points: usize,
    pub n_dofs: usize,
}

/// Locally relevant view of a finite-element discretization.
///
/// Shape data are stored per quadrature point: `shape_values(c)[q * dofs_per_cell + i]`.
pub trait Discretization: Send + Sync {
    fn n_dofs(&self) -> usize;

    fn partition(&self) -> &DofPartition;

    fn constraints(&self) -> &ConstraintMap;

    fn cells(&self) -> &[CellId];

    fn dofs_per_cell(&self) -> usize;

    fn n_q_points(&self) -> usize;

    fn dof_indices(&self, cell: CellId) -> &[usize];

    fn jxw(&self, cell: CellId) -> &[f64];

    fn shape_values(&self, cell: CellId) -> &[f64];

    fn shape_gradients(&self, cell: CellId) -> &[[f64; 3]];

    fn quadrature_points(&self, cell: CellId) -> &[[f64; 3]];

    /// True when the Bloch-periodic form of the operator applies.
    fn is_periodic(&self) -> bool;

    fn volume(&self) -> f64 {
        self.cells()
            .iter()
            .map(|c| self.jxw(*c).iter().sum::<f64>())
            .sum()
    }

    fn layout(&self) -> DiscretizationLayout {
        DiscretizationLayout {
            n_cells: self.cells().len(),
            n_q_points: self.n_q_points(),
            n_dofs: self.n_dofs(),
        }
    }
}

/// Row sums of the consistent mass matrix, condensed onto the master dofs.
pub fn lumped_mass(disc: &dyn Discretization) -> Vec<f64> {
    let dpc = disc.dofs_per_cell();

    let mut mass = vec![0.0; disc.n_dofs()];

    for c in disc.cells().iter() {
        let jxw = disc.jxw(*c);
        let phi = disc.shape_values(*c);

        for (i, d) in disc.dof_indices(*c).iter().enumerate() {
            for (q, w) in jxw.iter().enumerate() {
                mass[*d] += w * phi[q * dpc + i];
            }
        }
    }

    disc.constraints().condense(&mut mass);

    mass
}
