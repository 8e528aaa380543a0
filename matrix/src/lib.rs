// column-major memory layout
// [i,j] : i + j * nrow
//   0,0 0,1 0,2        0 2 4
//   1,0 1,1 1,2        1 3 5

use itertools::multizip;
use std::fmt;
use std::ops::Range;
use types::Scalar;

pub trait Dot<RHS = Self> {
    type Output;

    fn dot(&self, other: &RHS) -> Self::Output;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix<T> {
    nrow: usize,
    ncol: usize,
    data: Vec<T>,
}

impl<T: Scalar> Dot<Matrix<T>> for Matrix<T> {
    type Output = Self;

    fn dot(&self, rhs: &Matrix<T>) -> Self::Output {
        assert_eq!(self.ncol, rhs.nrow);

        let mut mdot = Matrix::<T>::new(self.nrow, rhs.ncol);

        for j in 0..rhs.ncol {
            let dst = mdot.get_mut_col(j);

            for k in 0..self.ncol {
                let fact = rhs[[k, j]];

                if fact == T::zero() {
                    continue;
                }

                for (d, a) in multizip((dst.iter_mut(), self.get_col(k).iter())) {
                    *d += *a * fact;
                }
            }
        }

        mdot
    }
}

impl<T: Scalar> Dot<Vec<T>> for Matrix<T> {
    type Output = Vec<T>;

    fn dot(&self, rhs: &Vec<T>) -> Self::Output {
        assert_eq!(self.ncol, rhs.len());

        let mut v = vec![T::zero(); self.nrow];

        for (i, fact) in rhs.iter().enumerate() {
            for (d, a) in multizip((v.iter_mut(), self.get_col(i).iter())) {
                *d += *a * *fact;
            }
        }

        v
    }
}

impl<T: Scalar> Matrix<T> {
    pub fn new(nrow: usize, ncol: usize) -> Matrix<T> {
        Matrix {
            nrow,
            ncol,
            data: vec![T::zero(); nrow * ncol],
        }
    }

    pub fn identity(n: usize) -> Matrix<T> {
        let mut mat = Matrix::<T>::new(n, n);

        for i in 0..n {
            mat[[i, i]] = T::one();
        }

        mat
    }

    pub fn from_row_slice(nrow: usize, ncol: usize, s: &[T]) -> Matrix<T> {
        assert_eq!(s.len(), nrow * ncol);

        let mut data = vec![T::zero(); nrow * ncol];
        let mut n = 0;

        for i in 0..nrow {
            for j in 0..ncol {
                data[i + j * nrow] = s[n];
                n += 1;
            }
        }

        Matrix { nrow, ncol, data }
    }

    pub fn from_col_slice(nrow: usize, ncol: usize, s: &[T]) -> Matrix<T> {
        assert_eq!(s.len(), nrow * ncol);

        Matrix {
            nrow,
            ncol,
            data: s.to_vec(),
        }
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn set_zeros(&mut self) {
        self.data.iter_mut().for_each(|x| *x = T::zero());
    }

    pub fn assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!(self.nrow, rhs.nrow);
        assert_eq!(self.ncol, rhs.ncol);

        self.data.copy_from_slice(&rhs.data);
    }

    pub fn get_col(&self, icol: usize) -> &[T] {
        let n1 = icol * self.nrow;
        let n2 = n1 + self.nrow;

        &self.data[n1..n2]
    }

    pub fn get_mut_col(&mut self, icol: usize) -> &mut [T] {
        let n1 = icol * self.nrow;
        let n2 = n1 + self.nrow;

        &mut self.data[n1..n2]
    }

    /// Copy of the columns in `cols`.
    pub fn columns(&self, cols: Range<usize>) -> Matrix<T> {
        assert!(cols.end <= self.ncol);

        let n1 = cols.start * self.nrow;
        let n2 = cols.end * self.nrow;

        Matrix {
            nrow: self.nrow,
            ncol: cols.len(),
            data: self.data[n1..n2].to_vec(),
        }
    }

    pub fn adjoint(&self) -> Matrix<T> {
        let mut data = Vec::with_capacity(self.nrow * self.ncol);

        for i in 0..self.nrow {
            for j in 0..self.ncol {
                data.push(self[[i, j]].conj());
            }
        }

        Matrix {
            nrow: self.ncol,
            ncol: self.nrow,
            data,
        }
    }

    /// self[rows, :]^H * rhs[rows, :]
    pub fn adjoint_dot_rows(&self, rhs: &Matrix<T>, rows: Range<usize>) -> Matrix<T> {
        assert_eq!(self.nrow, rhs.nrow);
        assert!(rows.end <= self.nrow);

        let mut m = Matrix::<T>::new(self.ncol, rhs.ncol);

        for j in 0..rhs.ncol {
            let b = &rhs.get_col(j)[rows.clone()];

            for i in 0..self.ncol {
                let a = &self.get_col(i)[rows.clone()];

                m[[i, j]] = multizip((a.iter(), b.iter()))
                    .map(|(x, y)| x.conj() * *y)
                    .sum();
            }
        }

        m
    }

    /// self += alpha * x
    pub fn axpy(&mut self, alpha: T, x: &Matrix<T>) {
        assert_eq!(self.data.len(), x.data.len());

        for (d, s) in multizip((self.data.iter_mut(), x.data.iter())) {
            *d += *s * alpha;
        }
    }

    pub fn scale(&mut self, alpha: f64) {
        self.data.iter_mut().for_each(|x| *x *= alpha);
    }

    /// Multiplies row i by d[i].
    pub fn scale_rows(&mut self, d: &[f64]) {
        assert_eq!(d.len(), self.nrow);

        for j in 0..self.ncol {
            for (x, s) in multizip((self.get_mut_col(j).iter_mut(), d.iter())) {
                *x *= *s;
            }
        }
    }

    /// Hermitian part, (A + A^H) / 2.
    pub fn hermitize(&mut self) {
        assert_eq!(self.nrow, self.ncol);

        for j in 0..self.ncol {
            for i in j..self.nrow {
                let a = self[[i, j]];
                let b = self[[j, i]].conj();
                let h = (a + b) * 0.5;

                self[[i, j]] = h;
                self[[j, i]] = h.conj();
            }
        }
    }
}

impl<T> std::ops::Index<[usize; 2]> for Matrix<T> {
    type Output = T;

    fn index(&self, idx: [usize; 2]) -> &T {
        &self.data[idx[0] + idx[1] * self.nrow]
    }
}

impl<T> std::ops::IndexMut<[usize; 2]> for Matrix<T> {
    fn index_mut(&mut self, idx: [usize; 2]) -> &mut Self::Output {
        &mut self.data[idx[0] + idx[1] * self.nrow]
    }
}

impl<T: Scalar> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.nrow {
            write!(f, " | ")?;
            for j in 0..self.ncol {
                write!(f, "{:+8.3} ", self[[i, j]])?;
            }
            writeln!(f, "|")?;
        }
        write!(f, "")
    }
}

#[test]
fn test_matrix_layout() {
    let m = Matrix::<f64>::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    assert_eq!(m[[1, 2]], 6.0);
    assert_eq!(m.get_col(1), &[2.0, 5.0]);

    let cols = m.columns(1..3);

    assert_eq!(cols.ncol(), 2);
    assert_eq!(cols[[0, 1]], 3.0);
}

#[test]
fn test_matrix_dot() {
    let a = Matrix::<f64>::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let b = Matrix::<f64>::identity(2);

    assert_eq!(a.dot(&b), a);
    assert_eq!(a.dot(&vec![1.0, 1.0]), vec![3.0, 7.0]);
}

#[test]
fn test_adjoint_dot_rows() {
    use types::c64;

    let x = Matrix::<c64>::from_row_slice(
        3,
        1,
        &[c64::new(1.0, 1.0), c64::new(0.0, 2.0), c64::new(5.0, 0.0)],
    );

    let full = x.adjoint_dot_rows(&x, 0..3);
    let owned = x.adjoint_dot_rows(&x, 0..2);

    assert_eq!(full[[0, 0]], c64::new(31.0, 0.0));
    assert_eq!(owned[[0, 0]], c64::new(6.0, 0.0));
    assert_eq!(x.adjoint()[[0, 1]], c64::new(0.0, -2.0));
}

#[test]
fn test_hermitize() {
    let mut m = Matrix::<f64>::from_row_slice(2, 2, &[1.0, 2.0, 4.0, 3.0]);

    m.hermitize();

    assert_eq!(m[[0, 1]], 3.0);
    assert_eq!(m[[1, 0]], 3.0);
}
