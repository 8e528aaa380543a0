use std::f64;
use types::c64;

// units : length

pub const BOHR_TO_ANG: f64 = 0.529177249;
pub const ANG_TO_BOHR: f64 = 1.0 / BOHR_TO_ANG;

// units : energy

pub const RY_TO_EV: f64 = 13.605698066;
pub const HA_TO_EV: f64 = 2.0 * RY_TO_EV;
pub const HA_TO_RY: f64 = 2.0;
pub const EV_TO_HA: f64 = 1.0 / HA_TO_EV;

// Boltzmann constant

pub const BOLTZMANN_CONSTANT: f64 = 8.617333262145E-5 * EV_TO_HA; // Hartree K^-1

//

pub const ONE_C64: c64 = c64 { re: 1.0, im: 0.0 };
pub const I_C64: c64 = c64 { re: 0.0, im: 1.0 };

// pi

pub const PI: f64 = f64::consts::PI;
pub const TWOPI: f64 = 2.0 * f64::consts::PI;
pub const FOURPI: f64 = 4.0 * f64::consts::PI;

// output layout

pub const OUT_WIDTH1: usize = 36;
pub const OUT_WIDTH2: usize = 20;

// density below this is treated as vacuum by the exchange-correlation kernels

pub const RHO_CUTOFF: f64 = 1E-14;

// numerical convergence

pub const EPS2: f64 = 1E-2;
pub const EPS4: f64 = 1E-4;
pub const EPS6: f64 = 1E-6;
pub const EPS8: f64 = 1E-8;
pub const EPS10: f64 = 1E-10;
pub const EPS12: f64 = 1E-12;
pub const EPS14: f64 = 1E-14;
pub const EPS16: f64 = 1E-16;
pub const EPS20: f64 = 1E-20;
pub const EPS30: f64 = 1E-30;
