use crate::Smearing;
use feconsts::*;

pub struct SmearingGS {}

impl Smearing for SmearingGS {
    fn get_occupation_number(
        &self,
        fermi_level: f64,
        temperature: f64,
        electron_energy: f64,
    ) -> f64 {
        let kbt = (BOLTZMANN_CONSTANT * temperature).max(EPS30);

        let x = (electron_energy - fermi_level) / kbt;

        0.5 * libm::erfc(x)
    }
}

#[test]
fn test_gs_occupation() {
    let gs = SmearingGS {};

    assert!((gs.get_occupation_number(0.2, 500.0, 0.2) - 0.5).abs() < 1e-15);
    assert!(gs.get_occupation_number(0.0, 500.0, 1.0) < 1e-12);
    assert!((gs.get_occupation_number(0.0, 500.0, -1.0) - 1.0).abs() < 1e-12);

    // symmetric about the Fermi level
    let a = gs.get_occupation_number(0.0, 500.0, 1e-3);
    let b = gs.get_occupation_number(0.0, 500.0, -1e-3);

    assert!((a + b - 1.0).abs() < 1e-14);
}
