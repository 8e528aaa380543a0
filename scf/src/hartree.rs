use crate::ScfError;
use dfttypes::QuadratureField;
use electrostatics::Electrostatics;
use femesh::Discretization;

/// Hartree potential of the total charge `rho` at the quadrature points.
///
/// The charge is projected onto the nodes with the lumped mass `mass`, the
/// Poisson problem -lap(v) = 4 pi rho is handed to `electrostatics`, and the
/// nodal potential is interpolated back.
pub fn compute_v_hartree(
    disc: &dyn Discretization,
    electrostatics: &dyn Electrostatics,
    mass: &[f64],
    rho: &QuadratureField,
) -> Result<QuadratureField, ScfError> {
    let rho_nodal = density::project_to_nodal(rho, disc, mass)?;

    let vh_nodal = electrostatics.solve_poisson(&rho_nodal)?;

    Ok(density::interpolate_to_quadrature(&vh_nodal, disc)?)
}
