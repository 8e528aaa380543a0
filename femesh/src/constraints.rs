use std::collections::BTreeMap;
use types::Scalar;

/// Homogeneous linear constraints `x[slave] = sum_k w_k x[master_k]`.
///
/// A slave with no masters is pinned to zero (Dirichlet). Masters are
/// never themselves constrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintMap {
    lines: BTreeMap<usize, Vec<(usize, f64)>>,
}

impl ConstraintMap {
    pub fn new() -> Self {
        ConstraintMap {
            lines: BTreeMap::new(),
        }
    }

    pub fn add_zero(&mut self, slave: usize) {
        self.lines.insert(slave, Vec::new());
    }

    pub fn add_line(&mut self, slave: usize, masters: Vec<(usize, f64)>) {
        self.lines.insert(slave, masters);
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.lines.contains_key(&dof)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn constrained_dofs(&self) -> Vec<usize> {
        self.lines.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &Vec<(usize, f64)>)> {
        self.lines.iter()
    }

    /// Fills the slave entries from their masters.
    pub fn distribute<T: Scalar>(&self, v: &mut [T]) {
        for (slave, masters) in self.lines.iter() {
            let mut s = T::zero();

            for (m, w) in masters.iter() {
                s += v[*m] * *w;
            }

            v[*slave] = s;
        }
    }

    /// Folds the slave entries onto their masters and zeroes the slaves;
    /// the transpose of `distribute`.
    pub fn condense<T: Scalar>(&self, v: &mut [T]) {
        for (slave, masters) in self.lines.iter() {
            let s = v[*slave];

            for (m, w) in masters.iter() {
                v[*m] += s * *w;
            }

            v[*slave] = T::zero();
        }
    }

    pub fn zero_slaves<T: Scalar>(&self, v: &mut [T]) {
        for slave in self.lines.keys() {
            v[*slave] = T::zero();
        }
    }
}

#[test]
fn test_distribute_and_condense() {
    let mut c = ConstraintMap::new();
    c.add_zero(0);
    c.add_line(4, vec![(1, 1.0)]);

    let mut v = vec![9.0, 2.0, 3.0, 4.0, 0.0];
    c.distribute(&mut v);
    assert_eq!(v, vec![0.0, 2.0, 3.0, 4.0, 2.0]);

    let mut r = vec![1.0, 1.0, 1.0, 1.0, 5.0];
    c.condense(&mut r);
    assert_eq!(r, vec![0.0, 6.0, 1.0, 1.0, 0.0]);

    assert!(c.is_constrained(4));
    assert_eq!(c.constrained_dofs(), vec![0, 4]);
}
