use crate::*;
use log::debug;
use matrix::Dot;

#[derive(Debug, Clone, PartialEq)]
pub struct ChfsiParams {
    pub n_subspace: usize,
    pub n_occupied: usize,
    pub chebyshev_degree: usize,
    pub lanczos_steps: usize,
    /// Number of top states rotated and tracked; None rotates all.
    pub spectrum_split: Option<usize>,
    pub mixed_precision: bool,
    pub rr_generalized: bool,
    pub seed: u64,
}

impl ChfsiParams {
    pub fn from_control(control: &Control, n_occupied: usize) -> Self {
        ChfsiParams {
            n_subspace: control.get_n_subspace(n_occupied),
            n_occupied,
            chebyshev_degree: control.get_chebyshev_degree(),
            lanczos_steps: control.get_lanczos_steps(),
            spectrum_split: control.get_spectrum_split(),
            mixed_precision: control.get_mixed_precision(),
            rr_generalized: control.get_rr_generalized(),
            seed: control.get_seed(),
        }
    }
}

pub struct ChebyshevFilteredSubspaceIteration {
    params: ChfsiParams,
    bounds: Option<SpectralBounds>,
    n_calls: usize,
}

impl ChebyshevFilteredSubspaceIteration {
    pub fn new(params: ChfsiParams) -> Result<Self, EigenSolverError> {
        if params.n_subspace == 0 || params.n_subspace < params.n_occupied {
            return Err(EigenSolverError::SubspaceTooSmall {
                n_subspace: params.n_subspace,
                n_occupied: params.n_occupied,
            });
        }

        if let Some(n_tracked) = params.spectrum_split {
            if n_tracked == 0
                || n_tracked > params.n_subspace
                || params.n_subspace - n_tracked >= params.n_occupied
            {
                return Err(EigenSolverError::InvalidSpectrumSplit {
                    n_tracked,
                    n_subspace: params.n_subspace,
                    n_occupied: params.n_occupied,
                });
            }
        }

        Ok(ChebyshevFilteredSubspaceIteration {
            params,
            bounds: None,
            n_calls: 0,
        })
    }

    pub fn params(&self) -> &ChfsiParams {
        &self.params
    }

    // untracked states of this call; the first call always rotates everything
    fn n_core(&self) -> usize {
        match self.params.spectrum_split {
            Some(n_tracked) if self.n_calls > 0 => self.params.n_subspace - n_tracked,
            _ => 0,
        }
    }
}

impl<T: LinalgScalar> EigenSolver<T> for ChebyshevFilteredSubspaceIteration {
    fn compute(
        &mut self,
        op: &dyn Operator<T>,
        wfc: &mut Wavefunctions<T>,
    ) -> Result<EigenSolverOutcome, EigenSolverError> {
        let n_subspace = self.params.n_subspace;

        if wfc.n_dofs() != op.n_local_dofs() || wfc.n_states() != n_subspace {
            return Err(EigenSolverError::SubspaceMismatch {
                expected: (op.n_local_dofs(), n_subspace),
                found: (wfc.n_dofs(), wfc.n_states()),
            });
        }

        let mut n_hx = 0;

        // the upper end moves with the potential, so b is re-estimated on every call
        let (fresh, n) =
            lanczos_bounds(op, self.params.lanczos_steps, n_subspace, self.params.seed)?;
        n_hx += n;

        let bounds = match self.bounds {
            Some(warm) => SpectralBounds {
                a0: warm.a0,
                b_low: warm.b_low,
                b: fresh.b,
            },
            None => fresh,
        }
        .sanitized();

        n_hx += chebyshev_filter(op, wfc.basis_mut(), self.params.chebyshev_degree, &bounds);

        orthonormalize(op, wfc.basis_mut(), self.params.mixed_precision)?;

        let (eigenvalues, q) = rayleigh_ritz(op, wfc.basis(), self.params.rr_generalized)?;
        n_hx += n_subspace;

        let n_core = self.n_core();

        if n_core == 0 {
            let rotated = wfc.basis().dot(&q);
            wfc.basis_mut().assign(&rotated);
            wfc.set_tracked(None);
        } else {
            let tracked = wfc.basis().dot(&q.columns(n_core..n_subspace));
            wfc.set_tracked(Some(tracked));
        }

        let residual_norms = residual_norms(op, wfc.ritz_vectors(), &eigenvalues[n_core..]);
        n_hx += n_subspace - n_core;

        self.bounds = Some(SpectralBounds {
            a0: eigenvalues[0],
            b_low: eigenvalues[n_subspace - 1],
            b: bounds.b,
        });

        self.n_calls += 1;

        debug!(
            "chfsi: e_min = {:.8E}, e_max = {:.8E}, max residual = {:.3E}, n_core = {}, n_hx = {}",
            eigenvalues[0],
            eigenvalues[n_subspace - 1],
            residual_norms.iter().fold(0.0f64, |m, r| m.max(*r)),
            n_core,
            n_hx
        );

        Ok(EigenSolverOutcome {
            eigenvalues,
            residual_norms,
            n_core,
            n_hx,
        })
    }

    fn bounds(&self) -> Option<SpectralBounds> {
        self.bounds
    }

    fn reset(&mut self) {
        self.bounds = None;
        self.n_calls = 0;
    }

    fn n_subspace(&self) -> usize {
        self.params.n_subspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use dfttypes::{KPoint, QuadratureField};
    use fecomm::SerialComm;
    use femesh::{Boundary, Discretization, Line1D};
    use hamiltonian::{KohnShamOperator, NonlocalProjectors};
    use types::c64;

    fn params(n_subspace: usize, n_occupied: usize) -> ChfsiParams {
        ChfsiParams {
            n_subspace,
            n_occupied,
            chebyshev_degree: 20,
            lanczos_steps: 20,
            spectrum_split: None,
            mixed_precision: false,
            rr_generalized: false,
            seed: 3,
        }
    }

    fn laplacian_eigenvalue(n: usize, n_cells: usize, h: f64) -> f64 {
        (1.0 - (n as f64 * std::f64::consts::PI / n_cells as f64).cos()) / (h * h)
    }

    #[test]
    fn test_subspace_smaller_than_occupied_fails() {
        assert!(matches!(
            ChebyshevFilteredSubspaceIteration::new(params(3, 5)),
            Err(EigenSolverError::SubspaceTooSmall {
                n_subspace: 3,
                n_occupied: 5
            })
        ));

        let mut control = Control::default();
        control.set_nband(3);

        assert!(matches!(
            crate::new::<f64>(&control, 5).err(),
            Some(EigenSolverError::SubspaceTooSmall { .. })
        ));
    }

    #[test]
    fn test_spectrum_split_must_track_partially_occupied_states() {
        let mut p = params(8, 4);

        p.spectrum_split = Some(4);
        assert!(matches!(
            ChebyshevFilteredSubspaceIteration::new(p.clone()),
            Err(EigenSolverError::InvalidSpectrumSplit { .. })
        ));

        p.spectrum_split = Some(5);
        assert!(ChebyshevFilteredSubspaceIteration::new(p.clone()).is_ok());

        p.spectrum_split = Some(9);
        assert!(ChebyshevFilteredSubspaceIteration::new(p).is_err());
    }

    #[test]
    fn test_degree_zero_filter_is_identity() {
        let mesh = Line1D::new(5.0, 10, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::zeros(&mesh);
        let op = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let wfc = Wavefunctions::<f64>::random(mesh.n_dofs(), 4, mesh.constraints(), 5);
        let mut x = wfc.basis().clone();

        let bounds = SpectralBounds {
            a0: 0.0,
            b_low: 1.0,
            b: 10.0,
        };

        assert_eq!(chebyshev_filter(&op, &mut x, 0, &bounds), 0);
        assert_eq!(&x, wfc.basis());
    }

    #[test]
    fn test_lanczos_bounds_enclose_spectrum() {
        let n_cells = 30;
        let mesh = Line1D::new(6.0, n_cells, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::zeros(&mesh);
        let op = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let h = mesh.cell_size();

        let (bounds, n_hx) = lanczos_bounds(&op, 20, 5, 9).unwrap();

        assert_eq!(n_hx, 20);
        assert!(bounds.b >= laplacian_eigenvalue(n_cells - 1, n_cells, h) - 1e-10);
        assert!(bounds.a0 >= laplacian_eigenvalue(1, n_cells, h) - 1e-10);
        assert!(bounds.a0 < bounds.b_low && bounds.b_low < bounds.b);
    }

    #[test]
    fn test_mixed_precision_orthonormalization() {
        let mesh = Line1D::new(10.0, 200, Boundary::Dirichlet).unwrap();
        let veff = QuadratureField::zeros(&mesh);
        let op = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &veff,
            NonlocalProjectors::new(),
        )
        .unwrap();

        let mut wfc = Wavefunctions::<f64>::random(mesh.n_dofs(), 20, mesh.constraints(), 2);

        orthonormalize(&op, wfc.basis_mut(), true).unwrap();

        let s = overlap(&op, wfc.basis(), false);

        for j in 0..20 {
            for i in 0..20 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(s[[i, j]], expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_converges_to_laplacian_eigenpairs() {
        let n_cells = 40;
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

        let mut solver = ChebyshevFilteredSubspaceIteration::new(params(6, 4)).unwrap();
        let mut wfc = Wavefunctions::<f64>::random(mesh.n_dofs(), 6, mesh.constraints(), 1);

        let mut outcome = solver.compute(&op, &mut wfc).unwrap();

        for _ in 0..7 {
            outcome = solver.compute(&op, &mut wfc).unwrap();
        }

        let h = mesh.cell_size();

        for n in 0..4 {
            assert_abs_diff_eq!(
                outcome.eigenvalues[n],
                laplacian_eigenvalue(n + 1, n_cells, h),
                epsilon = 1e-9
            );
            assert!(outcome.residual_norms[n] < 1e-8);
        }

        assert_eq!(outcome.n_core, 0);
        assert!(EigenSolver::<f64>::bounds(&solver).is_some());

        let s = overlap(&op, wfc.basis(), false);
        for i in 0..6 {
            assert_abs_diff_eq!(s[[i, i]], 1.0, epsilon = 1e-12);
            assert_eq!(wfc.basis()[[0, i]], 0.0);
        }
    }

    #[test]
    fn test_upper_bound_follows_potential_shift() {
        let n_cells = 40;
        let mesh = Line1D::new(10.0, n_cells, Boundary::Dirichlet).unwrap();
        let mut op = KohnShamOperator::<f64>::new(
            &mesh,
            &SerialComm,
            KPoint::gamma(),
            &QuadratureField::zeros(&mesh),
            NonlocalProjectors::new(),
        )
        .unwrap();

        let mut solver = ChebyshevFilteredSubspaceIteration::new(params(6, 4)).unwrap();
        let mut wfc = Wavefunctions::<f64>::random(mesh.n_dofs(), 6, mesh.constraints(), 1);

        for _ in 0..3 {
            solver.compute(&op, &mut wfc).unwrap();
        }

        let stale = EigenSolver::<f64>::bounds(&solver).unwrap().b;

        // lift the whole spectrum past the old upper bound
        op.reinit(&QuadratureField::constant(&mesh, 2.0 * stale)).unwrap();

        let mut outcome = solver.compute(&op, &mut wfc).unwrap();
        assert!(EigenSolver::<f64>::bounds(&solver).unwrap().b > stale);

        for _ in 0..12 {
            outcome = solver.compute(&op, &mut wfc).unwrap();
        }

        let mut cold = ChebyshevFilteredSubspaceIteration::new(params(6, 4)).unwrap();
        let mut wfc_cold = Wavefunctions::<f64>::random(mesh.n_dofs(), 6, mesh.constraints(), 1);

        let mut reference = cold.compute(&op, &mut wfc_cold).unwrap();
        for _ in 0..12 {
            reference = cold.compute(&op, &mut wfc_cold).unwrap();
        }

        let b = EigenSolver::<f64>::bounds(&solver).unwrap().b;

        for n in 0..4 {
            assert!(outcome.residual_norms[n] < 1e-7, "residual {}", outcome.residual_norms[n]);
            assert_abs_diff_eq!(outcome.eigenvalues[n], reference.eigenvalues[n], epsilon = 1e-8);
            assert!(outcome.eigenvalues[n] < b);
        }
    }

    #[test]
    fn test_spectrum_split_tracks_top_states() {
        let n_cells = 40;
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

        let mut p = params(6, 4);
        p.spectrum_split = Some(3);

        let mut solver = ChebyshevFilteredSubspaceIteration::new(p).unwrap();
        let mut wfc = Wavefunctions::<f64>::random(mesh.n_dofs(), 6, mesh.constraints(), 1);

        let first = solver.compute(&op, &mut wfc).unwrap();

        assert_eq!(first.n_core, 0);
        assert_eq!(first.residual_norms.len(), 6);

        let mut outcome = first;
        for _ in 0..7 {
            outcome = solver.compute(&op, &mut wfc).unwrap();
        }

        assert_eq!(outcome.n_core, 3);
        assert_eq!(outcome.eigenvalues.len(), 6);
        assert_eq!(outcome.residual_norms.len(), 3);
        assert_eq!(wfc.n_core(), 3);

        let h = mesh.cell_size();

        for n in 0..4 {
            assert_abs_diff_eq!(
                outcome.eigenvalues[n],
                laplacian_eigenvalue(n + 1, n_cells, h),
                epsilon = 1e-9
            );
        }

        // the tracked state 4 is the highest occupied one
        assert!(outcome.residual_norms[0] < 1e-8);
    }

    #[test]
    fn test_bloch_ground_state() {
        let mesh = Line1D::new(2.0 * std::f64::consts::PI, 32, Boundary::Periodic).unwrap();
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

        let mut p = params(5, 3);
        p.rr_generalized = true;

        let mut solver = ChebyshevFilteredSubspaceIteration::new(p).unwrap();
        let mut wfc = Wavefunctions::<c64>::random(mesh.n_dofs(), 5, mesh.constraints(), 4);

        let mut outcome = solver.compute(&op, &mut wfc).unwrap();
        for _ in 0..9 {
            outcome = solver.compute(&op, &mut wfc).unwrap();
        }

        assert_abs_diff_eq!(outcome.eigenvalues[0], 0.5 * k * k, epsilon = 1e-9);
        assert!(outcome.residual_norms[0] < 1e-8);
    }
}
