use num_complex::Complex;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

#[allow(non_camel_case_types)]
pub type c32 = Complex<f32>;

/// Field element of the finite-element vectors.
///
/// Real arithmetic is used for Gamma-only non-periodic problems; complex
/// arithmetic carries the Bloch phase of a nonzero k-point.
pub trait Scalar:
    Copy
    + Debug
    + Display
    + Default
    + PartialEq
    + Zero
    + One
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + MulAssign<f64>
    + DivAssign<f64>
    + Sum
{
    const IS_COMPLEX: bool;

    /// Number of f64 words one value occupies on the wire.
    const N_REALS: usize;

    fn conj(self) -> Self;

    fn re(self) -> f64;

    fn im(self) -> f64;

    /// |x|^2
    fn abs2(self) -> f64;

    fn from_re(re: f64) -> Self;

    /// None when the imaginary part cannot be represented.
    fn from_re_im(re: f64, im: f64) -> Option<Self>;

    /// conj(u) . v accumulated in single precision.
    fn dot_single(u: &[Self], v: &[Self]) -> Self;

    fn write_reals(values: &[Self], reals: &mut Vec<f64>);

    fn read_reals(reals: &[f64], values: &mut [Self]);
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;
    const N_REALS: usize = 1;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn re(self) -> f64 {
        self
    }

    #[inline]
    fn im(self) -> f64 {
        0.0
    }

    #[inline]
    fn abs2(self) -> f64 {
        self * self
    }

    #[inline]
    fn from_re(re: f64) -> Self {
        re
    }

    fn from_re_im(re: f64, im: f64) -> Option<Self> {
        if im == 0.0 {
            Some(re)
        } else {
            None
        }
    }

    fn dot_single(u: &[Self], v: &[Self]) -> Self {
        let mut s = 0.0f32;

        for (a, b) in u.iter().zip(v.iter()) {
            s += (*a as f32) * (*b as f32);
        }

        s as f64
    }

    fn write_reals(values: &[Self], reals: &mut Vec<f64>) {
        reals.extend_from_slice(values);
    }

    fn read_reals(reals: &[f64], values: &mut [Self]) {
        values.copy_from_slice(&reals[..values.len()]);
    }
}

impl Scalar for c64 {
    const IS_COMPLEX: bool = true;
    const N_REALS: usize = 2;

    #[inline]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }

    #[inline]
    fn re(self) -> f64 {
        self.re
    }

    #[inline]
    fn im(self) -> f64 {
        self.im
    }

    #[inline]
    fn abs2(self) -> f64 {
        self.norm_sqr()
    }

    #[inline]
    fn from_re(re: f64) -> Self {
        c64 { re, im: 0.0 }
    }

    fn from_re_im(re: f64, im: f64) -> Option<Self> {
        Some(c64 { re, im })
    }

    fn dot_single(u: &[Self], v: &[Self]) -> Self {
        let mut s = c32::zero();

        for (a, b) in u.iter().zip(v.iter()) {
            let a = c32::new(a.re as f32, a.im as f32);
            let b = c32::new(b.re as f32, b.im as f32);
            s += a.conj() * b;
        }

        c64::new(s.re as f64, s.im as f64)
    }

    fn write_reals(values: &[Self], reals: &mut Vec<f64>) {
        reals.reserve(2 * values.len());

        for v in values.iter() {
            reals.push(v.re);
            reals.push(v.im);
        }
    }

    fn read_reals(reals: &[f64], values: &mut [Self]) {
        for (i, v) in values.iter_mut().enumerate() {
            v.re = reals[2 * i];
            v.im = reals[2 * i + 1];
        }
    }
}

/// Arithmetic selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arithmetic {
    Real,
    Complex,
}

impl Arithmetic {
    pub fn for_boundary(periodic: bool) -> Arithmetic {
        if periodic {
            Arithmetic::Complex
        } else {
            Arithmetic::Real
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Arithmetic::Complex)
    }
}

#[test]
fn test_real_scalar() {
    assert_eq!(3.0f64.conj(), 3.0);
    assert_eq!((-2.0f64).abs2(), 4.0);
    assert_eq!(<f64 as Scalar>::from_re_im(1.5, 0.0), Some(1.5));
    assert_eq!(<f64 as Scalar>::from_re_im(1.5, 0.1), None);
}

#[test]
fn test_complex_scalar() {
    let z = c64::new(1.0, -2.0);

    assert_eq!(Scalar::conj(z), c64::new(1.0, 2.0));
    assert_eq!(z.abs2(), 5.0);
    assert_eq!(<c64 as Scalar>::from_re_im(0.0, 1.0), Some(c64::new(0.0, 1.0)));

    let mut reals = Vec::new();
    c64::write_reals(&[z, c64::new(3.0, 4.0)], &mut reals);
    assert_eq!(reals, vec![1.0, -2.0, 3.0, 4.0]);

    let mut back = vec![c64::zero(); 2];
    c64::read_reals(&reals, &mut back);
    assert_eq!(back[1], c64::new(3.0, 4.0));
}

#[test]
fn test_single_precision_dot() {
    let u = vec![c64::new(1.0, 1.0), c64::new(0.5, 0.0)];
    let v = vec![c64::new(1.0, 0.0), c64::new(2.0, 0.0)];

    let d = c64::dot_single(&u, &v);

    assert!((d.re - 2.0).abs() < 1e-6);
    assert!((d.im + 1.0).abs() < 1e-6);
    assert_eq!(f64::dot_single(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
}

#[test]
fn test_arithmetic_for_boundary() {
    assert_eq!(Arithmetic::for_boundary(true), Arithmetic::Complex);
    assert!(!Arithmetic::for_boundary(false).is_complex());
}
