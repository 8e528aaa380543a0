use crate::{CellId, ConstraintMap, Discretization, DofPartition, MeshError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Both end nodes pinned to zero.
    Dirichlet,
    /// The last node is a copy of the first.
    Periodic,
}

const DOFS_PER_CELL: usize = 2;
const N_Q_POINTS: usize = 2;

/// Uniform linear elements on [0, length] with two-point Gauss quadrature,
/// lifted into 3D coordinates along x.
#[derive(Debug, Clone)]
pub struct Line1D {
    length: f64,
    boundary: Boundary,
    cells: Vec<CellId>,
    partition: DofPartition,
    constraints: ConstraintMap,
    dof_indices: Vec<usize>,
    jxw: Vec<f64>,
    shape_values: Vec<f64>,
    shape_gradients: Vec<[f64; 3]>,
    qpoints: Vec<[f64; 3]>,
}

impl Line1D {
    pub fn new(length: f64, n_cells: usize, boundary: Boundary) -> Result<Line1D, MeshError> {
        if !(length > 0.0) {
            return Err(MeshError::InvalidMesh(format!("length {} is not positive", length)));
        }

        if n_cells < 2 {
            return Err(MeshError::InvalidMesh(format!(
                "at least 2 cells are required, got {}",
                n_cells
            )));
        }

        let h = length / n_cells as f64;
        let n_nodes = n_cells + 1;

        let gauss = [-1.0 / 3f64.sqrt(), 1.0 / 3f64.sqrt()];

        let mut dof_indices = Vec::with_capacity(n_cells * DOFS_PER_CELL);
        let mut jxw = Vec::with_capacity(n_cells * N_Q_POINTS);
        let mut shape_values = Vec::with_capacity(n_cells * N_Q_POINTS * DOFS_PER_CELL);
        let mut shape_gradients = Vec::with_capacity(n_cells * N_Q_POINTS * DOFS_PER_CELL);
        let mut qpoints = Vec::with_capacity(n_cells * N_Q_POINTS);

        for c in 0..n_cells {
            let x0 = c as f64 * h;

            dof_indices.push(c);
            dof_indices.push(c + 1);

            for xi in gauss.iter() {
                let t = 0.5 * (1.0 + xi);

                jxw.push(0.5 * h);
                qpoints.push([x0 + t * h, 0.0, 0.0]);

                shape_values.push(1.0 - t);
                shape_values.push(t);

                shape_gradients.push([-1.0 / h, 0.0, 0.0]);
                shape_gradients.push([1.0 / h, 0.0, 0.0]);
            }
        }

        let mut constraints = ConstraintMap::new();

        match boundary {
            Boundary::Dirichlet => {
                constraints.add_zero(0);
                constraints.add_zero(n_nodes - 1);
            }
            Boundary::Periodic => {
                constraints.add_line(n_nodes - 1, vec![(0, 1.0)]);
            }
        }

        Ok(Line1D {
            length,
            boundary,
            cells: (0..n_cells).map(CellId).collect(),
            partition: DofPartition::serial(n_nodes),
            constraints,
            dof_indices,
            jxw,
            shape_values,
            shape_gradients,
            qpoints,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size(&self) -> f64 {
        self.length / self.cells.len() as f64
    }

    pub fn node_coordinate(&self, node: usize) -> f64 {
        node as f64 * self.cell_size()
    }
}

impl Discretization for Line1D {
    fn n_dofs(&self) -> usize {
        self.cells.len() + 1
    }

    fn partition(&self) -> &DofPartition {
        &self.partition
    }

    fn constraints(&self) -> &ConstraintMap {
        &self.constraints
    }

    fn cells(&self) -> &[CellId] {
        &self.cells
    }

    fn dofs_per_cell(&self) -> usize {
        DOFS_PER_CELL
    }

    fn n_q_points(&self) -> usize {
        N_Q_POINTS
    }

    fn dof_indices(&self, cell: CellId) -> &[usize] {
        let n1 = cell.0 * DOFS_PER_CELL;
        &self.dof_indices[n1..n1 + DOFS_PER_CELL]
    }

    fn jxw(&self, cell: CellId) -> &[f64] {
        let n1 = cell.0 * N_Q_POINTS;
        &self.jxw[n1..n1 + N_Q_POINTS]
    }

    fn shape_values(&self, cell: CellId) -> &[f64] {
        let n1 = cell.0 * N_Q_POINTS * DOFS_PER_CELL;
        &self.shape_values[n1..n1 + N_Q_POINTS * DOFS_PER_CELL]
    }

    fn shape_gradients(&self, cell: CellId) -> &[[f64; 3]] {
        let n1 = cell.0 * N_Q_POINTS * DOFS_PER_CELL;
        &self.shape_gradients[n1..n1 + N_Q_POINTS * DOFS_PER_CELL]
    }

    fn quadrature_points(&self, cell: CellId) -> &[[f64; 3]] {
        let n1 = cell.0 * N_Q_POINTS;
        &self.qpoints[n1..n1 + N_Q_POINTS]
    }

    fn is_periodic(&self) -> bool {
        self.boundary == Boundary::Periodic
    }
}
