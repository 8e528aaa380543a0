mod fd;
use fd::*;
mod gs;
use gs::*;

use control::SmearingScheme;

/// Occupation in [0, 1] of a state at `electron_energy`.
pub trait Smearing: Send + Sync {
    fn get_occupation_number(
        &self,
        fermi_level: f64,
        temperature: f64,
        electron_energy: f64,
    ) -> f64;
}

pub fn new(smearing_scheme: SmearingScheme) -> Box<dyn Smearing> {
    match smearing_scheme {
        SmearingScheme::FermiDirac => Box::new(SmearingFD {}),
        SmearingScheme::Gaussian => Box::new(SmearingGS {}),
    }
}
