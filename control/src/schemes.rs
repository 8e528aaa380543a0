use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinScheme {
    NonSpin,
    Spin,
}

impl SpinScheme {
    pub fn n_spin(&self) -> usize {
        match self {
            SpinScheme::NonSpin => 1,
            SpinScheme::Spin => 2,
        }
    }

    /// Electrons per fully occupied state.
    pub fn spin_factor(&self) -> f64 {
        match self {
            SpinScheme::NonSpin => 2.0,
            SpinScheme::Spin => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmearingScheme {
    #[serde(rename = "fd")]
    FermiDirac,
    #[serde(rename = "gs")]
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixingScheme {
    Simple,
    Anderson,
    Broyden,
}

impl MixingScheme {
    pub fn uses_history(&self) -> bool {
        !matches!(self, MixingScheme::Simple)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixingField {
    Quadrature,
    Nodal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EigenSolverScheme {
    Chfsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum XcScheme {
    LdaPz,
}

macro_rules! impl_scheme_display {
    ($t:ty, $( $v:path => $s:expr ),+ ) => {
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let s = match self {
                    $( $v => $s, )+
                };
                // honour width/alignment flags in the parameter table
                f.pad(s)
            }
        }
    };
}

impl_scheme_display!(SpinScheme, SpinScheme::NonSpin => "nonspin", SpinScheme::Spin => "spin");
impl_scheme_display!(SmearingScheme, SmearingScheme::FermiDirac => "fd", SmearingScheme::Gaussian => "gs");
impl_scheme_display!(MixingScheme, MixingScheme::Simple => "simple", MixingScheme::Anderson => "anderson", MixingScheme::Broyden => "broyden");
impl_scheme_display!(MixingField, MixingField::Quadrature => "quadrature", MixingField::Nodal => "nodal");
impl_scheme_display!(EigenSolverScheme, EigenSolverScheme::Chfsi => "chfsi");
impl_scheme_display!(XcScheme, XcScheme::LdaPz => "lda-pz");
