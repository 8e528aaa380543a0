use crate::DensityError;
use dfttypes::{DensityField, NodalDensity, NodalField, QuadratureField};
use femesh::Discretization;

/// Lumped L2 projection of a quadrature field onto the nodal basis.
///
/// u_i = (sum_q JxW phi_i f) / m_i on the master dofs, then the constrained
/// dofs are filled from their masters.
pub fn project_to_nodal(
    field: &QuadratureField,
    disc: &dyn Discretization,
    mass: &[f64],
) -> Result<NodalField, DensityError> {
    if !field.matches(disc) || mass.len() != disc.n_dofs() {
        return Err(DensityError::LayoutMismatch);
    }

    let dpc = disc.dofs_per_cell();

    let mut u = vec![0.0; disc.n_dofs()];

    for (c, values) in field.iter() {
        let jxw = disc.jxw(*c);
        let phi = disc.shape_values(*c);

        for (i, d) in disc.dof_indices(*c).iter().enumerate() {
            for (q, (w, f)) in jxw.iter().zip(values.iter()).enumerate() {
                u[*d] += w * phi[q * dpc + i] * f;
            }
        }
    }

    let constraints = disc.constraints();

    constraints.condense(&mut u);

    for (x, m) in u.iter_mut().zip(mass.iter()) {
        *x = if *m > 0.0 { *x / m } else { 0.0 };
    }

    constraints.distribute(&mut u);

    Ok(NodalField::new(u))
}

/// Finite-element interpolation of nodal values at the quadrature points.
pub fn interpolate_to_quadrature(
    nodal: &NodalField,
    disc: &dyn Discretization,
) -> Result<QuadratureField, DensityError> {
    if nodal.len() != disc.n_dofs() {
        return Err(DensityError::LayoutMismatch);
    }

    let dpc = disc.dofs_per_cell();
    let nq = disc.n_q_points();
    let u = nodal.as_slice();

    let mut field = QuadratureField::zeros(disc);

    for (c, values) in field.iter_mut() {
        let dofs = disc.dof_indices(*c);
        let phi = disc.shape_values(*c);

        for (q, v) in values.iter_mut().enumerate().take(nq) {
            *v = dofs
                .iter()
                .enumerate()
                .map(|(i, d)| u[*d] * phi[q * dpc + i])
                .sum();
        }
    }

    Ok(field)
}

pub fn project_density_to_nodal(
    rho: &DensityField,
    disc: &dyn Discretization,
    mass: &[f64],
) -> Result<NodalDensity, DensityError> {
    match rho {
        DensityField::NonSpin(r) => Ok(NodalDensity::NonSpin(project_to_nodal(r, disc, mass)?)),
        DensityField::Spin(up, dn) => Ok(NodalDensity::Spin(
            project_to_nodal(up, disc, mass)?,
            project_to_nodal(dn, disc, mass)?,
        )),
    }
}

pub fn interpolate_density(
    nodal: &NodalDensity,
    disc: &dyn Discretization,
) -> Result<DensityField, DensityError> {
    match nodal {
        NodalDensity::NonSpin(r) => Ok(DensityField::NonSpin(interpolate_to_quadrature(r, disc)?)),
        NodalDensity::Spin(up, dn) => Ok(DensityField::Spin(
            interpolate_to_quadrature(up, disc)?,
            interpolate_to_quadrature(dn, disc)?,
        )),
    }
}
