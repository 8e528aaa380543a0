use crate::pz::pz_unpolarized;
use crate::slater::slater_unpolarized;
use crate::{check_layout, XCError, XC};
use dfttypes::*;
use feconsts::RHO_CUTOFF;
use itertools::multizip;

pub struct XCLDAPZ {}

impl XCLDAPZ {
    pub fn new() -> XCLDAPZ {
        XCLDAPZ {}
    }
}

impl Default for XCLDAPZ {
    fn default() -> Self {
        Self::new()
    }
}

impl XC for XCLDAPZ {
    fn potential_and_energy(
        &self,
        rho: &DensityField,
        vxc: &mut DensityField,
        exc: &mut QuadratureField,
    ) -> Result<(), XCError> {
        let rho = rho.as_non_spin().ok_or(XCError::UnsupportedSpin)?;
        let vxc = vxc.as_non_spin_mut().ok_or(XCError::UnsupportedSpin)?;

        check_layout(rho, vxc, "vxc")?;
        check_layout(rho, exc, "exc")?;

        for ((_, r), (_, v), (_, e)) in multizip((rho.iter(), vxc.iter_mut(), exc.iter_mut())) {
            for (r, v, e) in multizip((r.iter(), v.iter_mut(), e.iter_mut())) {
                if *r < RHO_CUTOFF {
                    *v = 0.0;
                    *e = 0.0;
                    continue;
                }

                let (vx, ex) = slater_unpolarized(*r);
                let (vc, ec) = pz_unpolarized(*r);

                *v = vx + vc;
                *e = ex + ec;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_lda_potential_is_energy_derivative() {
        let mesh = Line1D::new(1.0, 3, Boundary::Periodic).unwrap();

        let xc = XCLDAPZ::new();

        let eval = |r: f64| {
            let rho = DensityField::NonSpin(QuadratureField::constant(&mesh, r));
            let mut vxc = DensityField::NonSpin(QuadratureField::zeros(&mesh));
            let mut exc = QuadratureField::zeros(&mesh);

            xc.potential_and_energy(&rho, &mut vxc, &mut exc).unwrap();

            let v = vxc.channel(0).flatten()[0];
            let e = exc.flatten()[0];

            (v, e)
        };

        for r in [1.5, 0.02] {
            let h = r * 1e-5;

            let (v, _) = eval(r);
            let (_, ep) = eval(r + h);
            let (_, em) = eval(r - h);

            let fd = ((r + h) * ep - (r - h) * em) / (2.0 * h);

            assert_relative_eq!(v, fd, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_lda_vanishes_below_cutoff() {
        let mesh = Line1D::new(1.0, 2, Boundary::Dirichlet).unwrap();

        let rho = DensityField::NonSpin(QuadratureField::constant(&mesh, -1e-3));
        let mut vxc = DensityField::NonSpin(QuadratureField::constant(&mesh, 7.0));
        let mut exc = QuadratureField::constant(&mesh, 7.0);

        XCLDAPZ::new()
            .potential_and_energy(&rho, &mut vxc, &mut exc)
            .unwrap();

        assert!(vxc.flatten().iter().all(|v| *v == 0.0));
        assert!(exc.flatten().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_lda_rejects_spin_density() {
        let mesh = Line1D::new(1.0, 2, Boundary::Dirichlet).unwrap();

        let rho = DensityField::Spin(QuadratureField::zeros(&mesh), QuadratureField::zeros(&mesh));
        let mut vxc = rho.clone();
        let mut exc = QuadratureField::zeros(&mesh);

        assert_eq!(
            XCLDAPZ::new().potential_and_energy(&rho, &mut vxc, &mut exc),
            Err(XCError::UnsupportedSpin)
        );
    }
}
