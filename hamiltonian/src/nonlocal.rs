use crate::OperatorError;
use fecomm::Communicator;
use femesh::DofPartition;
use matrix::Matrix;
use std::collections::BTreeMap;
use types::Scalar;

/// Projectors of one atom sampled on the dofs of its support.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomProjectors {
    pub dofs: Vec<usize>,
    /// projectors[p][i] is the value of projector p at dofs[i]
    pub projectors: Vec<Vec<f64>>,
    pub couplings: Vec<f64>,
}

impl AtomProjectors {
    pub fn new(dofs: Vec<usize>, projectors: Vec<Vec<f64>>, couplings: Vec<f64>) -> Self {
        AtomProjectors {
            dofs,
            projectors,
            couplings,
        }
    }

    pub fn n_projectors(&self) -> usize {
        self.projectors.len()
    }
}

/// Sum over atoms of |beta_p> D_p <beta_p|, keyed by atom id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonlocalProjectors {
    atoms: BTreeMap<usize, AtomProjectors>,
}

impl NonlocalProjectors {
    pub fn new() -> Self {
        NonlocalProjectors {
            atoms: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, atom: usize, proj: AtomProjectors) {
        self.atoms.insert(atom, proj);
    }

    pub fn get(&self, atom: usize) -> Option<&AtomProjectors> {
        self.atoms.get(&atom)
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn n_projectors(&self) -> usize {
        self.atoms.values().map(|a| a.n_projectors()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_projectors() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &AtomProjectors)> {
        self.atoms.iter()
    }

    pub fn validate(&self, n_dofs: usize) -> Result<(), OperatorError> {
        for (atom, proj) in self.atoms.iter() {
            let invalid = |reason: String| OperatorError::InvalidProjector {
                atom: *atom,
                reason,
            };

            if proj.couplings.len() != proj.projectors.len() {
                return Err(invalid(format!(
                    "{} couplings for {} projectors",
                    proj.couplings.len(),
                    proj.projectors.len()
                )));
            }

            if let Some(d) = proj.dofs.iter().find(|d| **d >= n_dofs) {
                return Err(invalid(format!("dof {} out of range {}", d, n_dofs)));
            }

            if let Some(p) = proj.projectors.iter().find(|p| p.len() != proj.dofs.len()) {
                return Err(invalid(format!(
                    "{} values on {} support dofs",
                    p.len(),
                    proj.dofs.len()
                )));
            }
        }

        Ok(())
    }

    /// D_p <beta_p|x_j> for every projector p and column j.
    ///
    /// Only owned dofs contribute locally; the whole block is reduced over
    /// the domain group in one call.
    pub fn project<T: Scalar>(
        &self,
        x: &Matrix<T>,
        partition: &DofPartition,
        comm: &dyn Communicator,
    ) -> Matrix<T> {
        let mut coeffs = Matrix::<T>::new(self.n_projectors(), x.ncol());

        if coeffs.nrow() == 0 {
            return coeffs;
        }

        for j in 0..x.ncol() {
            let xcol = x.get_col(j);
            let ccol = coeffs.get_mut_col(j);

            let mut ip = 0;

            for proj in self.atoms.values() {
                for beta in proj.projectors.iter() {
                    let mut s = T::zero();

                    for (d, b) in proj.dofs.iter().zip(beta.iter()) {
                        if partition.is_owned(*d) {
                            s += xcol[*d] * *b;
                        }
                    }

                    ccol[ip] = s;
                    ip += 1;
                }
            }
        }

        fecomm::all_reduce_slice_sum(comm, coeffs.as_mut_slice());

        let couplings: Vec<f64> = self
            .atoms
            .values()
            .flat_map(|a| a.couplings.iter().copied())
            .collect();

        coeffs.scale_rows(&couplings);

        coeffs
    }

    /// y += sum_p beta_p c_p
    pub fn add_projected<T: Scalar>(&self, coeffs: &[T], y: &mut [T]) {
        let mut ip = 0;

        for proj in self.atoms.values() {
            for beta in proj.projectors.iter() {
                let c = coeffs[ip];

                for (d, b) in proj.dofs.iter().zip(beta.iter()) {
                    y[*d] += c * *b;
                }

                ip += 1;
            }
        }
    }
}
