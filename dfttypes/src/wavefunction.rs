use enum_as_inner::EnumAsInner;
use femesh::ConstraintMap;
use matrix::Matrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use types::Scalar;

/// Bloch vector in Cartesian coordinates with its integration weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KPoint {
    pub xyz: [f64; 3],
    pub weight: f64,
}

impl KPoint {
    pub fn new(xyz: [f64; 3], weight: f64) -> Self {
        KPoint { xyz, weight }
    }

    pub fn gamma() -> Self {
        KPoint {
            xyz: [0.0; 3],
            weight: 1.0,
        }
    }

    pub fn is_gamma(&self) -> bool {
        self.xyz.iter().all(|x| *x == 0.0)
    }

    pub fn norm2(&self) -> f64 {
        self.xyz.iter().map(|x| x * x).sum()
    }
}

/// Subspace of one (spin, k-point) channel in the mass-scaled basis.
///
/// `basis` always holds N orthonormal columns. With spectrum splitting,
/// `tracked` holds the rotated Ritz vectors of the top states and the
/// lowest `n_core()` states are represented only through `basis`.
#[derive(Debug, Clone)]
pub struct Wavefunctions<T> {
    basis: Matrix<T>,
    tracked: Option<Matrix<T>>,
}

impl<T: Scalar> Wavefunctions<T> {
    pub fn new(basis: Matrix<T>) -> Self {
        Wavefunctions {
            basis,
            tracked: None,
        }
    }

    /// Seeded random columns, zero on constrained dofs.
    pub fn random(n_dofs: usize, n_states: usize, constraints: &ConstraintMap, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut basis = Matrix::<T>::new(n_dofs, n_states);

        for j in 0..n_states {
            let col = basis.get_mut_col(j);
            utility::fill_rand_vector(&mut rng, col);
            constraints.zero_slaves(col);
        }

        Wavefunctions {
            basis,
            tracked: None,
        }
    }

    pub fn n_states(&self) -> usize {
        self.basis.ncol()
    }

    pub fn n_dofs(&self) -> usize {
        self.basis.nrow()
    }

    /// States represented only through the unrotated basis.
    pub fn n_core(&self) -> usize {
        match &self.tracked {
            Some(t) => self.basis.ncol() - t.ncol(),
            None => 0,
        }
    }

    pub fn basis(&self) -> &Matrix<T> {
        &self.basis
    }

    pub fn basis_mut(&mut self) -> &mut Matrix<T> {
        &mut self.basis
    }

    pub fn tracked(&self) -> Option<&Matrix<T>> {
        self.tracked.as_ref()
    }

    pub fn set_tracked(&mut self, tracked: Option<Matrix<T>>) {
        self.tracked = tracked;
    }

    /// Ritz vectors of the states that carry eigenvector information.
    pub fn ritz_vectors(&self) -> &Matrix<T> {
        self.tracked.as_ref().unwrap_or(&self.basis)
    }
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum VKEigenValue {
    NonSpin(Vec<Vec<f64>>),
    Spin(Vec<Vec<f64>>, Vec<Vec<f64>>),
}

impl VKEigenValue {
    /// Groups per-channel values, channels ordered spin-major.
    pub fn from_channels(n_spin: usize, per_channel: Vec<Vec<f64>>) -> Self {
        if n_spin == 1 {
            VKEigenValue::NonSpin(per_channel)
        } else {
            let nk = per_channel.len() / 2;
            let mut up = per_channel;
            let dn = up.split_off(nk);
            VKEigenValue::Spin(up, dn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::c64;

    #[test]
    fn test_random_wavefunctions_respect_constraints() {
        let mut c = ConstraintMap::new();
        c.add_zero(0);
        c.add_line(5, vec![(1, 1.0)]);

        let wfc = Wavefunctions::<c64>::random(6, 3, &c, 11);
        let again = Wavefunctions::<c64>::random(6, 3, &c, 11);

        assert_eq!(wfc.basis(), again.basis());

        for j in 0..3 {
            assert_eq!(wfc.basis()[[0, j]], c64::new(0.0, 0.0));
            assert_eq!(wfc.basis()[[5, j]], c64::new(0.0, 0.0));
        }

        assert_eq!(wfc.n_core(), 0);
    }

    #[test]
    fn test_tracked_states() {
        let mut wfc = Wavefunctions::<f64>::new(Matrix::identity(4));
        wfc.set_tracked(Some(Matrix::new(4, 1)));

        assert_eq!(wfc.n_core(), 3);
        assert_eq!(wfc.ritz_vectors().ncol(), 1);
    }

    #[test]
    fn test_eigenvalues_by_spin() {
        let ev = VKEigenValue::from_channels(2, vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);

        let (up, dn) = ev.as_spin().unwrap();

        assert_eq!(up, &vec![vec![1.0], vec![2.0]]);
        assert_eq!(dn, &vec![vec![3.0], vec![4.0]]);
    }
}
