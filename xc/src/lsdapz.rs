use crate::pz::pz_polarized;
use crate::slater::slater_polarized;
use crate::{check_layout, XCError, XC};
use dfttypes::*;
use feconsts::RHO_CUTOFF;
use itertools::multizip;

pub struct XCLSDAPZ {}

impl XCLSDAPZ {
    pub fn new() -> XCLSDAPZ {
        XCLSDAPZ {}
    }
}

impl Default for XCLSDAPZ {
    fn default() -> Self {
        Self::new()
    }
}

impl XC for XCLSDAPZ {
    fn potential_and_energy(
        &self,
        rho: &DensityField,
        vxc: &mut DensityField,
        exc: &mut QuadratureField,
    ) -> Result<(), XCError> {
        let (rho_up, rho_dn) = rho.as_spin().ok_or(XCError::UnsupportedSpin)?;
        let (vxc_up, vxc_dn) = vxc.as_spin_mut().ok_or(XCError::UnsupportedSpin)?;

        check_layout(rho_up, rho_dn, "down density")?;
        check_layout(rho_up, vxc_up, "vxc up")?;
        check_layout(rho_up, vxc_dn, "vxc down")?;
        check_layout(rho_up, exc, "exc")?;

        for ((_, ru), (_, rd), (_, vu), (_, vd), (_, e)) in multizip((
            rho_up.iter(),
            rho_dn.iter(),
            vxc_up.iter_mut(),
            vxc_dn.iter_mut(),
            exc.iter_mut(),
        )) {
            for (ru, rd, vu, vd, e) in multizip((
                ru.iter(),
                rd.iter(),
                vu.iter_mut(),
                vd.iter_mut(),
                e.iter_mut(),
            )) {
                let up = ru.max(0.0);
                let dn = rd.max(0.0);

                let rho = up + dn;

                if rho < RHO_CUTOFF {
                    *vu = 0.0;
                    *vd = 0.0;
                    *e = 0.0;
                    continue;
                }

                let zeta = ((up - dn) / rho).clamp(-1.0, 1.0);

                let (vx_up, vx_dn, ex) = slater_polarized(rho, zeta);
                let (vc_up, vc_dn, ec) = pz_polarized(rho, zeta);

                *vu = vx_up + vc_up;
                *vd = vx_dn + vc_dn;
                *e = ex + ec;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XCLDAPZ;
    use approx::assert_relative_eq;
    use femesh::{Boundary, Line1D};

    #[test]
    fn test_lsda_unpolarized_matches_lda() {
        let mesh = Line1D::new(2.0, 4, Boundary::Dirichlet).unwrap();

        let half = QuadratureField::from_fn(&mesh, |x| 0.05 + 0.3 * x[0]);
        let mut total = half.clone();
        total.scale(2.0);

        let rho_spin = DensityField::Spin(half.clone(), half.clone());
        let mut vxc_spin = DensityField::Spin(QuadratureField::zeros(&mesh), QuadratureField::zeros(&mesh));
        let mut exc_spin = QuadratureField::zeros(&mesh);

        XCLSDAPZ::new()
            .potential_and_energy(&rho_spin, &mut vxc_spin, &mut exc_spin)
            .unwrap();

        let rho = DensityField::NonSpin(total);
        let mut vxc = DensityField::NonSpin(QuadratureField::zeros(&mesh));
        let mut exc = QuadratureField::zeros(&mesh);

        XCLDAPZ::new()
            .potential_and_energy(&rho, &mut vxc, &mut exc)
            .unwrap();

        let v = vxc.flatten();

        for (a, b) in vxc_spin.channel(0).flatten().iter().zip(v.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
        for (a, b) in vxc_spin.channel(1).flatten().iter().zip(v.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
        for (a, b) in exc_spin.flatten().iter().zip(exc.flatten().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_lsda_majority_spin_is_more_bound() {
        let mesh = Line1D::new(1.0, 2, Boundary::Periodic).unwrap();

        let rho = DensityField::Spin(
            QuadratureField::constant(&mesh, 0.2),
            QuadratureField::constant(&mesh, 0.05),
        );
        let mut vxc = rho.clone();
        let mut exc = QuadratureField::zeros(&mesh);

        XCLSDAPZ::new()
            .potential_and_energy(&rho, &mut vxc, &mut exc)
            .unwrap();

        let (up, dn) = vxc.as_spin().unwrap();

        assert!(up.flatten()[0] < dn.flatten()[0]);
        assert!(exc.flatten()[0] < 0.0);
    }
}
