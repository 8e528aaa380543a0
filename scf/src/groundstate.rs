use crate::*;
use control::Control;
use dfttypes::DensityField;
use log::info;
use types::{c64, Arithmetic};

/// SCF context in the arithmetic picked once from the boundary conditions:
/// real for isolated systems, complex with Bloch phases for periodic ones.
pub enum GroundState<'a> {
    Real(ScfContext<'a, f64>),
    Complex(ScfContext<'a, c64>),
}

impl<'a> GroundState<'a> {
    pub fn new(
        control: &'a Control,
        system: ScfSystem<'a>,
        rho_init: DensityField,
    ) -> Result<GroundState<'a>, ScfError> {
        let arithmetic = control.get_arithmetic();

        info!("ground state in {:?} arithmetic", arithmetic);

        match arithmetic {
            Arithmetic::Real => Ok(GroundState::Real(ScfContext::new(control, system, rho_init)?)),
            Arithmetic::Complex => Ok(GroundState::Complex(ScfContext::new(
                control, system, rho_init,
            )?)),
        }
    }

    pub fn arithmetic(&self) -> Arithmetic {
        match self {
            GroundState::Real(_) => Arithmetic::Real,
            GroundState::Complex(_) => Arithmetic::Complex,
        }
    }

    pub fn run(&mut self, driver: &ScfDriver) -> Result<ScfReport, ScfError> {
        match self {
            GroundState::Real(ctx) => driver.run(ctx),
            GroundState::Complex(ctx) => driver.run(ctx),
        }
    }

    pub fn state(&self) -> ScfState {
        match self {
            GroundState::Real(ctx) => ctx.state(),
            GroundState::Complex(ctx) => ctx.state(),
        }
    }

    pub fn density(&self) -> &DensityField {
        match self {
            GroundState::Real(ctx) => ctx.density(),
            GroundState::Complex(ctx) => ctx.density(),
        }
    }

    pub fn fermi_energy(&self) -> f64 {
        match self {
            GroundState::Real(ctx) => ctx.fermi_energy(),
            GroundState::Complex(ctx) => ctx.fermi_energy(),
        }
    }
}
