use crate::MeshError;
use std::collections::BTreeSet;
use std::ops::Range;

/// Split of the locally relevant dofs into a contiguous owned block and ghosts.
///
/// Local index `i < n_owned` maps to global `offset + i`; the ghosts follow
/// in the order of `ghosts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofPartition {
    offset: usize,
    n_owned: usize,
    ghosts: Vec<usize>,
}

impl DofPartition {
    pub fn new(offset: usize, n_owned: usize, ghosts: Vec<usize>) -> Self {
        DofPartition {
            offset,
            n_owned,
            ghosts,
        }
    }

    /// Everything owned by the single rank.
    pub fn serial(n_dofs: usize) -> Self {
        DofPartition::new(0, n_dofs, Vec::new())
    }

    pub fn n_owned(&self) -> usize {
        self.n_owned
    }

    pub fn n_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    pub fn n_locally_relevant(&self) -> usize {
        self.n_owned + self.ghosts.len()
    }

    /// Local indices of the owned dofs.
    pub fn owned_range(&self) -> Range<usize> {
        0..self.n_owned
    }

    pub fn global_index(&self, local: usize) -> usize {
        if local < self.n_owned {
            self.offset + local
        } else {
            self.ghosts[local - self.n_owned]
        }
    }

    pub fn is_owned(&self, local: usize) -> bool {
        local < self.n_owned
    }

    pub fn validate(&self, n_local_dofs: usize, comm_size: usize) -> Result<(), MeshError> {
        if self.n_locally_relevant() != n_local_dofs {
            return Err(MeshError::InconsistentPartition(format!(
                "partition covers {} dofs, discretization has {}",
                self.n_locally_relevant(),
                n_local_dofs
            )));
        }

        if comm_size == 1 && (!self.ghosts.is_empty() || self.offset != 0) {
            return Err(MeshError::InconsistentPartition(
                "a single-rank domain has neither ghosts nor an owned offset".to_string(),
            ));
        }

        let owned = self.offset..self.offset + self.n_owned;
        let mut seen = BTreeSet::new();

        for g in self.ghosts.iter() {
            if owned.contains(g) {
                return Err(MeshError::InconsistentPartition(format!(
                    "ghost dof {} lies in the owned range {:?}",
                    g, owned
                )));
            }

            if !seen.insert(*g) {
                return Err(MeshError::InconsistentPartition(format!(
                    "ghost dof {} listed twice",
                    g
                )));
            }
        }

        Ok(())
    }
}

#[test]
fn test_partition_index_map() {
    let p = DofPartition::new(10, 3, vec![2, 20]);

    assert_eq!(p.n_ghosts(), 2);
    assert_eq!(p.n_locally_relevant(), 5);
    assert_eq!(p.global_index(1), 11);
    assert_eq!(p.global_index(4), 20);
    assert!(p.validate(5, 2).is_ok());
}

#[test]
fn test_partition_rejects_overlap() {
    let p = DofPartition::new(10, 3, vec![11]);

    assert!(matches!(
        p.validate(4, 2),
        Err(MeshError::InconsistentPartition(_))
    ));
}

#[test]
fn test_partition_serial_rules() {
    assert!(DofPartition::serial(4).validate(4, 1).is_ok());
    assert!(DofPartition::serial(4).validate(5, 1).is_err());
    assert!(DofPartition::new(0, 3, vec![7]).validate(4, 1).is_err());
}
