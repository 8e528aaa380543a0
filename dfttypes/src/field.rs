use femesh::{CellId, Discretization};
use itertools::multizip;
use std::collections::BTreeMap;

/// Scalar values at the quadrature points of every locally owned cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuadratureField {
    values: BTreeMap<CellId, Vec<f64>>,
}

impl QuadratureField {
    pub fn new() -> Self {
        QuadratureField {
            values: BTreeMap::new(),
        }
    }

    pub fn zeros(disc: &dyn Discretization) -> Self {
        QuadratureField::constant(disc, 0.0)
    }

    pub fn constant(disc: &dyn Discretization, v: f64) -> Self {
        let nq = disc.n_q_points();

        QuadratureField {
            values: disc.cells().iter().map(|c| (*c, vec![v; nq])).collect(),
        }
    }

    /// Samples `f` at the quadrature points.
    pub fn from_fn<F: Fn([f64; 3]) -> f64>(disc: &dyn Discretization, f: F) -> Self {
        QuadratureField {
            values: disc
                .cells()
                .iter()
                .map(|c| (*c, disc.quadrature_points(*c).iter().map(|x| f(*x)).collect()))
                .collect(),
        }
    }

    pub fn insert(&mut self, cell: CellId, v: Vec<f64>) {
        self.values.insert(cell, v);
    }

    pub fn get(&self, cell: CellId) -> Option<&[f64]> {
        self.values.get(&cell).map(|v| v.as_slice())
    }

    pub fn get_mut(&mut self, cell: CellId) -> Option<&mut [f64]> {
        self.values.get_mut(&cell).map(|v| v.as_mut_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &Vec<f64>)> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&CellId, &mut Vec<f64>)> {
        self.values.iter_mut()
    }

    pub fn n_cells(&self) -> usize {
        self.values.len()
    }

    pub fn n_points(&self) -> usize {
        self.values.values().map(|v| v.len()).sum()
    }

    /// Same cells with the same number of points each.
    pub fn same_layout(&self, other: &QuadratureField) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|((c1, v1), (c2, v2))| c1 == c2 && v1.len() == v2.len())
    }

    /// True when the field is defined on exactly the cells and points of `disc`.
    pub fn matches(&self, disc: &dyn Discretization) -> bool {
        let nq = disc.n_q_points();

        self.values.len() == disc.cells().len()
            && disc
                .cells()
                .iter()
                .all(|c| self.values.get(c).map(|v| v.len() == nq).unwrap_or(false))
    }

    /// Values concatenated in cell order.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.n_points());

        for v in self.values.values() {
            flat.extend_from_slice(v);
        }

        flat
    }

    /// Inverse of `flatten`; returns the number of values consumed.
    pub fn assign_flat(&mut self, flat: &[f64]) -> usize {
        let mut n = 0;

        for v in self.values.values_mut() {
            let m = v.len();
            v.copy_from_slice(&flat[n..n + m]);
            n += m;
        }

        n
    }

    /// JxW weights aligned with `flatten`.
    pub fn weights(&self, disc: &dyn Discretization) -> Vec<f64> {
        let mut w = Vec::with_capacity(self.n_points());

        for c in self.values.keys() {
            w.extend_from_slice(disc.jxw(*c));
        }

        w
    }

    pub fn integrate(&self, disc: &dyn Discretization) -> f64 {
        self.values
            .iter()
            .map(|(c, v)| {
                multizip((v.iter(), disc.jxw(*c).iter()))
                    .map(|(f, w)| f * w)
                    .sum::<f64>()
            })
            .sum()
    }

    pub fn scale(&mut self, f: f64) {
        for v in self.values.values_mut() {
            v.iter_mut().for_each(|x| *x *= f);
        }
    }

    /// self += f * other
    pub fn add_scaled(&mut self, other: &QuadratureField, f: f64) {
        for (c, v) in self.values.iter_mut() {
            if let Some(o) = other.values.get(c) {
                for (x, y) in multizip((v.iter_mut(), o.iter())) {
                    *x += f * y;
                }
            }
        }
    }

    pub fn min_value(&self) -> f64 {
        self.values
            .values()
            .flat_map(|v| v.iter())
            .fold(f64::INFINITY, |m, x| m.min(*x))
    }
}

/// Values at the locally relevant nodes (dofs) of the discretization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodalField {
    values: Vec<f64>,
}

impl NodalField {
    pub fn new(values: Vec<f64>) -> Self {
        NodalField { values }
    }

    pub fn zeros(n: usize) -> Self {
        NodalField {
            values: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Integral with the lumped mass `mass`.
    pub fn integrate(&self, mass: &[f64]) -> f64 {
        utility::ddot_product(&self.values, mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_flatten_roundtrip_and_integral() {
        let mesh = Line1D::new(2.0, 4, Boundary::Dirichlet).unwrap();

        let f = QuadratureField::from_fn(&mesh, |x| x[0]);

        assert_abs_diff_eq!(f.integrate(&mesh), 2.0, epsilon = 1e-14);
        assert_eq!(f.n_points(), 8);
        assert!(f.matches(&mesh));

        let flat = f.flatten();
        let mut g = QuadratureField::zeros(&mesh);
        assert_eq!(g.assign_flat(&flat), 8);
        assert_eq!(f, g);

        let w = f.weights(&mesh);
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_layout_checks() {
        let mesh = Line1D::new(1.0, 3, Boundary::Periodic).unwrap();
        let other = Line1D::new(1.0, 4, Boundary::Periodic).unwrap();

        let a = QuadratureField::constant(&mesh, 1.0);
        let b = QuadratureField::constant(&other, 1.0);

        assert!(!a.same_layout(&b));
        assert!(!b.matches(&mesh));
    }
}
