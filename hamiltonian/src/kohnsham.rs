use crate::{inv_sqrt, NonlocalProjectors, Operator, OperatorError};
use dfttypes::{KPoint, QuadratureField};
use fecomm::Communicator;
use femesh::{CellId, ConstraintMap, Discretization, DofPartition};
use itertools::multizip;
use log::debug;
use matrix::Matrix;
use rayon::prelude::*;
use types::Scalar;

const PARALLEL_MIN_COLS: usize = 4;

/// Kinetic + local effective potential + nonlocal projectors at one k-point.
pub struct KohnShamOperator<'a, T> {
    disc: &'a dyn Discretization,
    comm: &'a dyn Communicator,
    kpoint: KPoint,
    projectors: NonlocalProjectors,
    mass: Vec<f64>,
    inv_sqrt_mass: Vec<f64>,

    // dofs_per_cell^2 entries per cell, column-major, in the order of disc.cells()
    cell_matrices: Vec<Vec<T>>,
}

impl<'a, T: Scalar> KohnShamOperator<'a, T> {
    pub fn new(
        disc: &'a dyn Discretization,
        comm: &'a dyn Communicator,
        kpoint: KPoint,
        veff: &QuadratureField,
        projectors: NonlocalProjectors,
    ) -> Result<Self, OperatorError> {
        disc.partition()
            .validate(disc.n_dofs(), comm.size())
            .map_err(OperatorError::InconsistentPartition)?;

        if !T::IS_COMPLEX && !kpoint.is_gamma() {
            return Err(OperatorError::ComplexPhaseInRealArithmetic { kpoint: kpoint.xyz });
        }

        projectors.validate(disc.n_dofs())?;

        let mass = femesh::lumped_mass(disc);
        let inv_sqrt_mass = inv_sqrt(&mass);

        let mut op = KohnShamOperator {
            disc,
            comm,
            kpoint,
            projectors,
            mass,
            inv_sqrt_mass,
            cell_matrices: Vec::new(),
        };

        op.reinit(veff)?;

        Ok(op)
    }

    /// Reassembles the cell matrices for a new effective potential.
    pub fn reinit(&mut self, veff: &QuadratureField) -> Result<(), OperatorError> {
        if !veff.matches(self.disc) {
            return Err(OperatorError::PotentialLayout);
        }

        let mut cell_matrices = Vec::with_capacity(self.disc.cells().len());

        for c in self.disc.cells().iter() {
            let v = veff.get(*c).ok_or(OperatorError::PotentialLayout)?;
            cell_matrices.push(self.assemble_cell(*c, v)?);
        }

        self.cell_matrices = cell_matrices;

        debug!(
            "operator reinit at k = {:?}: {} cells, {} nonlocal projectors",
            self.kpoint.xyz,
            self.cell_matrices.len(),
            self.projectors.n_projectors()
        );

        Ok(())
    }

    pub fn kpoint(&self) -> &KPoint {
        &self.kpoint
    }

    pub fn projectors(&self) -> &NonlocalProjectors {
        &self.projectors
    }

    // A_ij = 1/2 grad phi_i . grad phi_j + v phi_i phi_j
    //        - i phi_i (k . grad phi_j) + 1/2 |k|^2 phi_i phi_j
    fn assemble_cell(&self, cell: CellId, v: &[f64]) -> Result<Vec<T>, OperatorError> {
        let dpc = self.disc.dofs_per_cell();
        let nq = self.disc.n_q_points();

        let jxw = self.disc.jxw(cell);
        let phi = self.disc.shape_values(cell);
        let dphi = self.disc.shape_gradients(cell);

        let k = self.kpoint.xyz;
        let k2 = self.kpoint.norm2();
        let bloch = !self.kpoint.is_gamma();

        let mut a = Vec::with_capacity(dpc * dpc);

        for j in 0..dpc {
            for i in 0..dpc {
                let mut re = 0.0;
                let mut im = 0.0;

                for q in 0..nq {
                    let pi = phi[q * dpc + i];
                    let pj = phi[q * dpc + j];

                    re += jxw[q] * (0.5 * dot3(&dphi[q * dpc + i], &dphi[q * dpc + j]) + v[q] * pi * pj);

                    if bloch {
                        re += jxw[q] * 0.5 * k2 * pi * pj;
                        im -= jxw[q] * pi * dot3(&k, &dphi[q * dpc + j]);
                    }
                }

                let aij = T::from_re_im(re, im)
                    .ok_or(OperatorError::ComplexPhaseInRealArithmetic { kpoint: k })?;

                a.push(aij);
            }
        }

        Ok(a)
    }

    fn apply_cells(&self, x: &[T], y: &mut [T]) {
        let dpc = self.disc.dofs_per_cell();

        let mut xl = vec![T::zero(); dpc];

        for (c, a) in multizip((self.disc.cells().iter(), self.cell_matrices.iter())) {
            let dofs = self.disc.dof_indices(*c);

            for (l, d) in dofs.iter().enumerate() {
                xl[l] = x[*d];
            }

            for (i, d) in dofs.iter().enumerate() {
                let mut s = T::zero();

                for (j, xj) in xl.iter().enumerate() {
                    s += a[i + j * dpc] * *xj;
                }

                y[*d] += s;
            }
        }
    }
}

impl<'a, T: Scalar> Operator<T> for KohnShamOperator<'a, T> {
    fn compute_mass_vector(&self) -> Vec<f64> {
        self.mass.clone()
    }

    fn hx(&self, x: &Matrix<T>, y: &mut Matrix<T>) {
        let n = self.n_local_dofs();

        assert_eq!(x.nrow(), n);
        assert_eq!(y.nrow(), n);
        assert_eq!(x.ncol(), y.ncol());

        y.set_zeros();

        if n == 0 || x.ncol() == 0 {
            return;
        }

        let constraints = self.disc.constraints();

        // physical coefficients psi = M^{-1/2} x with the constrained dofs filled in
        let mut xp = x.clone();
        xp.scale_rows(&self.inv_sqrt_mass);

        for j in 0..xp.ncol() {
            constraints.distribute(xp.get_mut_col(j));
        }

        let coeffs = self
            .projectors
            .project(&xp, self.disc.partition(), self.comm);

        let apply = |(j, ycol): (usize, &mut [T])| {
            self.apply_cells(xp.get_col(j), ycol);

            if coeffs.nrow() > 0 {
                self.projectors.add_projected(coeffs.get_col(j), ycol);
            }

            constraints.condense(ycol);

            for (yi, s) in multizip((ycol.iter_mut(), self.inv_sqrt_mass.iter())) {
                *yi *= *s;
            }
        };

        if x.ncol() >= PARALLEL_MIN_COLS && rayon::current_num_threads() > 1 {
            y.as_mut_slice()
                .par_chunks_mut(n)
                .enumerate()
                .for_each(apply);
        } else {
            y.as_mut_slice().chunks_mut(n).enumerate().for_each(apply);
        }
    }

    fn n_local_dofs(&self) -> usize {
        self.disc.n_dofs()
    }

    fn partition(&self) -> &DofPartition {
        self.disc.partition()
    }

    fn constraints(&self) -> &ConstraintMap {
        self.disc.constraints()
    }

    fn comm(&self) -> &dyn Communicator {
        self.comm
    }

    fn inv_sqrt_mass(&self) -> &[f64] {
        &self.inv_sqrt_mass
    }
}

fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AtomProjectors;
    use approx::assert_abs_diff_eq;
    use fecomm::SerialComm;
    use femesh::{Boundary, Line1D, MeshError};
    use types::c64;

    #[test]
    fn test_laplacian_eigenvalues() {
        let n_cells = 20;
        let mesh = Line1D::new(10.0, n_cells, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::zeros(&mesh);

        let op = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let h = op.xthx(&Matrix::identity(mesh.n_dofs()));
        let (evals, _) = linalg::eigh(&h).unwrap();

        let dx = mesh.cell_size();

        // the two pinned end nodes contribute exact zeros
        assert_abs_diff_eq!(evals[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(evals[1], 0.0, epsilon = 1e-12);

        for n in 1..n_cells {
            let exact = (1.0 - (n as f64 * std::f64::consts::PI / n_cells as f64).cos()) / (dx * dx);
            assert_abs_diff_eq!(evals[n + 1], exact, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_mass_vector() {
        let mesh = Line1D::new(3.0, 6, Boundary::Periodic).unwrap();
        let veff = QuadratureField::zeros(&mesh);

        let op = KohnShamOperator::<c64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let mass = op.compute_mass_vector();

        assert_abs_diff_eq!(mass.iter().sum::<f64>(), 3.0, epsilon = 1e-14);
        assert_abs_diff_eq!(mass[0], 0.5, epsilon = 1e-14);
        assert_eq!(mass[6], 0.0);
        assert_eq!(op.inv_sqrt_mass()[6], 0.0);
    }

    #[test]
    fn test_bloch_operator_is_hermitian() {
        let length = 2.0 * std::f64::consts::PI;
        let mesh = Line1D::new(length, 24, Boundary::Periodic).unwrap();
        let veff = QuadratureField::from_fn(&mesh, |x| 0.3 * x[0].cos());

        let mut nl = NonlocalProjectors::new();
        nl.insert(0, AtomProjectors::new(vec![3, 4, 5], vec![vec![0.5, 1.0, 0.5]], vec![0.7]));

        let op = KohnShamOperator::<c64>::new(
            &mesh,
            &SerialComm,
            KPoint::new([0.3, 0.0, 0.0], 1.0),
            &veff,
            nl,
        )
        .unwrap();

        let h = op.xthx(&Matrix::identity(mesh.n_dofs()));

        for j in 0..h.ncol() {
            for i in 0..h.nrow() {
                assert_abs_diff_eq!(h[[i, j]].re, h[[j, i]].re, epsilon = 1e-12);
                assert_abs_diff_eq!(h[[i, j]].im, -h[[j, i]].im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_constant_bloch_state() {
        let length = 2.0 * std::f64::consts::PI;
        let mesh = Line1D::new(length, 32, Boundary::Periodic).unwrap();
        let veff = QuadratureField::zeros(&mesh);

        let k = 0.3;

        let op = KohnShamOperator::<c64>::new(
            &mesh,
            &SerialComm,
            KPoint::new([k, 0.0, 0.0], 1.0),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let h = op.xthx(&Matrix::identity(mesh.n_dofs()));
        let (evals, _) = linalg::eigh(&h).unwrap();

        // evals[0] belongs to the slaved node
        assert_abs_diff_eq!(evals[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(evals[1], 0.5 * k * k, epsilon = 1e-10);
    }

    #[test]
    fn test_nonlocal_term() {
        let mesh = Line1D::new(4.0, 8, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::constant(&mesh, -0.2);

        let local = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let mut nl = NonlocalProjectors::new();
        nl.insert(3, AtomProjectors::new(vec![4], vec![vec![1.0]], vec![2.5]));

        let full =
            KohnShamOperator::<f64>::new(&mesh, &SerialComm, KPoint::gamma(), &veff, nl).unwrap();

        let id = Matrix::identity(mesh.n_dofs());
        let h0 = local.xthx(&id);
        let h1 = full.xthx(&id);

        let m4 = local.compute_mass_vector()[4];

        for j in 0..h0.ncol() {
            for i in 0..h0.nrow() {
                let expected = if i == 4 && j == 4 { 2.5 / m4 } else { 0.0 };
                assert_abs_diff_eq!(h1[[i, j]] - h0[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_real_arithmetic_rejects_bloch_phase() {
        let mesh = Line1D::new(1.0, 4, Boundary::Periodic).unwrap();
        let veff = QuadratureField::zeros(&mesh);

        let res = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::new([0.1, 0.0, 0.0], 1.0),
            &veff,
            NonlocalProjectors::new(),
        );

        assert!(matches!(
            res.err(),
            Some(OperatorError::ComplexPhaseInRealArithmetic { .. })
        ));
    }

    #[test]
    fn test_potential_layout_is_checked() {
        let mesh = Line1D::new(1.0, 4, Boundary::Dirichlet).unwrap();
        let other = Line1D::new(1.0, 5, Boundary::Dirichlet).unwrap();

        let res = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &QuadratureField::zeros(&other),
            NonlocalProjectors::new(),
        );

        assert!(matches!(res.err(), Some(OperatorError::PotentialLayout)));
    }

    struct Misnumbered {
        mesh: Line1D,
        partition: DofPartition,
    }

    impl Discretization for Misnumbered {
        fn n_dofs(&self) -> usize {
            self.mesh.n_dofs()
        }

        fn partition(&self) -> &DofPartition {
            &self.partition
        }

        fn constraints(&self) -> &ConstraintMap {
            self.mesh.constraints()
        }

        fn cells(&self) -> &[CellId] {
            self.mesh.cells()
        }

        fn dofs_per_cell(&self) -> usize {
            self.mesh.dofs_per_cell()
        }

        fn n_q_points(&self) -> usize {
            self.mesh.n_q_points()
        }

        fn dof_indices(&self, cell: CellId) -> &[usize] {
            self.mesh.dof_indices(cell)
        }

        fn jxw(&self, cell: CellId) -> &[f64] {
            self.mesh.jxw(cell)
        }

        fn shape_values(&self, cell: CellId) -> &[f64] {
            self.mesh.shape_values(cell)
        }

        fn shape_gradients(&self, cell: CellId) -> &[[f64; 3]] {
            self.mesh.shape_gradients(cell)
        }

        fn quadrature_points(&self, cell: CellId) -> &[[f64; 3]] {
            self.mesh.quadrature_points(cell)
        }

        fn is_periodic(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_inconsistent_partition_fails_fast() {
        let mesh = Line1D::new(1.0, 4, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::zeros(&mesh);

        let disc = Misnumbered {
            mesh,
            partition: DofPartition::new(0, 4, vec![9]),
        };

        let res = KohnShamOperator::<f64>::new(
            &disc,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        );

        assert!(matches!(
            res.err(),
            Some(OperatorError::InconsistentPartition(MeshError::InconsistentPartition(_)))
        ));
    }
}
