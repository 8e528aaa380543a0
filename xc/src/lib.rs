mod error;
pub use error::*;

mod slater;
mod pz;

mod ldapz;
use ldapz::*;

mod lsdapz;
use lsdapz::*;

use control::{SpinScheme, XcScheme};
use dfttypes::*;

pub trait XC: Send + Sync {
    /// Fills `vxc` with the potential of each spin channel and `exc` with the
    /// energy per electron, point by point on the quadrature grid.
    fn potential_and_energy(
        &self,
        rho: &DensityField,
        vxc: &mut DensityField,
        exc: &mut QuadratureField,
    ) -> Result<(), XCError>;
}

pub fn new(xc_scheme: XcScheme, spin_scheme: SpinScheme) -> Box<dyn XC> {
    match (xc_scheme, spin_scheme) {
        (XcScheme::LdaPz, SpinScheme::NonSpin) => Box::new(XCLDAPZ::new()),
        (XcScheme::LdaPz, SpinScheme::Spin) => Box::new(XCLSDAPZ::new()),
    }
}

fn check_layout(
    rho: &QuadratureField,
    other: &QuadratureField,
    what: &str,
) -> Result<(), XCError> {
    if !rho.same_layout(other) {
        return Err(XCError::LayoutMismatch(what.to_string()));
    }

    Ok(())
}
