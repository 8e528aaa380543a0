mod nonspin;
use nonspin::*;

mod spin;
use spin::*;

mod nodal;
pub use nodal::*;

use control::SpinScheme;
use dfttypes::*;
use fecomm::{Communicator, ProcessGroups};
use feconsts::*;
use femesh::Discretization;
use log::debug;
use matrix::Matrix;
use std::fmt;
use types::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub enum DensityError {
    ZeroCharge,
    InvalidElectronCount(f64),
    OccupationMismatch { expected: usize, found: usize },
    LayoutMismatch,
}

impl fmt::Display for DensityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DensityError::ZeroCharge => write!(f, "density integrates to zero and cannot be normalized"),
            DensityError::InvalidElectronCount(n) => write!(f, "invalid electron count {}", n),
            DensityError::OccupationMismatch { expected, found } => write!(
                f,
                "{} occupation numbers given for {} states",
                found, expected
            ),
            DensityError::LayoutMismatch => {
                write!(f, "density is not laid out on the discretization")
            }
        }
    }
}

impl std::error::Error for DensityError {}

/// States of one (spin, k-point) channel with their occupations.
pub struct ChannelContribution<'a, T> {
    pub spin: usize,
    pub k_weight: f64,
    pub wavefunctions: &'a Wavefunctions<T>,
    /// Occupation in [0, 1] of every subspace state, ascending energy.
    pub occupations: &'a [f64],
    /// M^{-1/2} taking the mass-scaled coefficients back to nodal values.
    pub inv_sqrt_mass: &'a [f64],
}

impl<'a, T: Scalar> ChannelContribution<'a, T> {
    /// (vectors, column, weight) of every column entering the density.
    ///
    /// Without spectrum splitting each Ritz vector carries f. With splitting
    /// the orthonormal basis carries 1 and the tracked states f - 1, which
    /// gives the same density when the core states are fully occupied.
    fn weighted_columns(
        &self,
        spin_factor: f64,
    ) -> Result<Vec<(&'a Matrix<T>, usize, f64)>, DensityError> {
        let wfc = self.wavefunctions;
        let n_states = wfc.n_states();

        if self.occupations.len() != n_states {
            return Err(DensityError::OccupationMismatch {
                expected: n_states,
                found: self.occupations.len(),
            });
        }

        let w = spin_factor * self.k_weight;

        let mut cols = Vec::with_capacity(n_states);

        match wfc.tracked() {
            None => {
                for (j, f) in self.occupations.iter().enumerate() {
                    if *f > EPS16 {
                        cols.push((wfc.basis(), j, w * f));
                    }
                }
            }
            Some(tracked) => {
                let n_core = wfc.n_core();

                for j in 0..n_states {
                    cols.push((wfc.basis(), j, w));
                }

                for (j, f) in self.occupations[n_core..].iter().enumerate() {
                    cols.push((tracked, j, w * (f - 1.0)));
                }
            }
        }

        Ok(cols)
    }
}

pub trait Density<T: Scalar>: Send + Sync {
    /// Occupation-weighted sum of |psi|^2 at the quadrature points, summed
    /// over the band group and the k-point pool.
    fn compute_charge_density(
        &self,
        disc: &dyn Discretization,
        channels: &[ChannelContribution<T>],
        groups: &ProcessGroups,
    ) -> Result<DensityField, DensityError>;

    /// Superposition of spherical atomic densities normalized to `nelec`.
    fn from_atomic_super_position(
        &self,
        disc: &dyn Discretization,
        atoms: &[AtomicDensity],
        nelec: f64,
        domain: &dyn Communicator,
    ) -> Result<DensityField, DensityError>;
}

pub fn new<T: Scalar>(spin_scheme: SpinScheme) -> Box<dyn Density<T>> {
    match spin_scheme {
        SpinScheme::NonSpin => Box::new(DensityNonspin::new()),
        SpinScheme::Spin => Box::new(DensitySpin::new()),
    }
}

/// Radial density of one atom centered at `position`.
pub struct AtomicDensity<'a> {
    pub position: [f64; 3],
    pub radial: &'a (dyn Fn(f64) -> f64 + Send + Sync),
    /// Spin polarization (up - down) / (up + down) of the atomic charge.
    pub polarization: f64,
}

impl<'a> AtomicDensity<'a> {
    pub fn value_at(&self, x: &[f64; 3]) -> f64 {
        let r = ((x[0] - self.position[0]).powi(2)
            + (x[1] - self.position[1]).powi(2)
            + (x[2] - self.position[2]).powi(2))
        .sqrt();

        (self.radial)(r)
    }
}

/// Adds the contribution of `ch` to `rho` for the band-group share of its columns.
pub fn accumulate_channel<T: Scalar>(
    disc: &dyn Discretization,
    ch: &ChannelContribution<T>,
    spin_factor: f64,
    band: &dyn Communicator,
    rho: &mut QuadratureField,
) -> Result<(), DensityError> {
    if !rho.matches(disc) {
        return Err(DensityError::LayoutMismatch);
    }

    let cols = ch.weighted_columns(spin_factor)?;

    let mine = utility::block_range(cols.len(), band.size(), band.rank());

    let dpc = disc.dofs_per_cell();
    let nq = disc.n_q_points();
    let constraints = disc.constraints();

    let mut psi = vec![T::zero(); disc.n_dofs()];

    for (x, j, w) in cols[mine].iter() {
        for (p, v, s) in itertools::multizip((psi.iter_mut(), x.get_col(*j).iter(), ch.inv_sqrt_mass.iter())) {
            *p = *v * *s;
        }

        constraints.distribute(&mut psi);

        for (c, values) in rho.iter_mut() {
            let dofs = disc.dof_indices(*c);
            let phi = disc.shape_values(*c);

            for q in 0..nq {
                let mut psi_q = T::zero();

                for (i, d) in dofs.iter().enumerate() {
                    psi_q += psi[*d] * phi[q * dpc + i];
                }

                values[q] += w * psi_q.abs2();
            }
        }
    }

    Ok(())
}

/// Sums partial densities over the band group, then over the k-point pool.
pub fn reduce_over_groups(rho: &mut DensityField, groups: &ProcessGroups) {
    if groups.band().size() == 1 && groups.kpool().size() == 1 {
        return;
    }

    let mut flat = rho.flatten();

    groups.band().all_reduce_sum(&mut flat);
    groups.kpool().all_reduce_sum(&mut flat);

    rho.assign_flat(&flat);
}

pub fn total_charge(rho: &DensityField, disc: &dyn Discretization, domain: &dyn Communicator) -> f64 {
    fecomm::all_reduce_scalar_sum(domain, rho.total_charge(disc))
}

pub fn total_magnetization(
    rho: &DensityField,
    disc: &dyn Discretization,
    domain: &dyn Communicator,
) -> f64 {
    fecomm::all_reduce_scalar_sum(domain, rho.total_magnetization(disc))
}

/// Rescales `rho` so that it integrates to `nelec`.
///
/// A field already within rounding of `nelec` is left untouched, so a
/// second call changes nothing.
pub fn normalize(
    rho: &mut DensityField,
    disc: &dyn Discretization,
    nelec: f64,
    domain: &dyn Communicator,
) -> Result<(), DensityError> {
    if !(nelec > 0.0) || !nelec.is_finite() {
        return Err(DensityError::InvalidElectronCount(nelec));
    }

    let total = total_charge(rho, disc, domain);

    if !(total.abs() > EPS20) || !total.is_finite() {
        return Err(DensityError::ZeroCharge);
    }

    if (total - nelec).abs() > EPS14 * nelec {
        debug!("density integrates to {:.12E}, rescaled to {}", total, nelec);
        rho.scale(nelec / total);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fecomm::SerialComm;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_normalize_is_idempotent() {
        let mesh = Line1D::new(4.0, 16, Boundary::Dirichlet).unwrap();

        let mut rho = DensityField::Spin(
            QuadratureField::from_fn(&mesh, |x| (-(x[0] - 2.0).powi(2)).exp()),
            QuadratureField::from_fn(&mesh, |x| 0.3 * (-(x[0] - 1.5).powi(2)).exp()),
        );

        normalize(&mut rho, &mesh, 3.0, &SerialComm).unwrap();

        assert_abs_diff_eq!(total_charge(&rho, &mesh, &SerialComm), 3.0, epsilon = 1e-13);

        let once = rho.clone();
        normalize(&mut rho, &mesh, 3.0, &SerialComm).unwrap();

        assert_eq!(rho, once);
    }

    #[test]
    fn test_normalize_rejects_empty_density() {
        let mesh = Line1D::new(1.0, 4, Boundary::Periodic).unwrap();
        let mut rho = DensityField::NonSpin(QuadratureField::zeros(&mesh));

        assert_eq!(
            normalize(&mut rho, &mesh, 2.0, &SerialComm),
            Err(DensityError::ZeroCharge)
        );
        assert_eq!(
            normalize(&mut rho, &mesh, -1.0, &SerialComm),
            Err(DensityError::InvalidElectronCount(-1.0))
        );
    }
}
