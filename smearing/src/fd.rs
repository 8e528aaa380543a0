use crate::Smearing;
use feconsts::*;

pub struct SmearingFD {}

impl Smearing for SmearingFD {
    fn get_occupation_number(
        &self,
        fermi_level: f64,
        temperature: f64,
        electron_energy: f64,
    ) -> f64 {
        let kbt = (BOLTZMANN_CONSTANT * temperature).max(EPS30);

        let x = (electron_energy - fermi_level) / kbt;

        // exp(x) overflows far above the Fermi level
        if x > 0.0 {
            let e = (-x).exp();
            e / (1.0 + e)
        } else {
            1.0 / (x.exp() + 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fd_occupation() {
        let fd = SmearingFD {};

        assert_abs_diff_eq!(fd.get_occupation_number(0.1, 300.0, 0.1), 0.5, epsilon = 1e-15);
        assert_eq!(fd.get_occupation_number(0.0, 300.0, 10.0), 0.0);
        assert_eq!(fd.get_occupation_number(0.0, 300.0, -10.0), 1.0);

        let kbt = BOLTZMANN_CONSTANT * 1000.0;
        let f = fd.get_occupation_number(0.0, 1000.0, kbt);

        assert_abs_diff_eq!(f, 1.0 / (1.0 + 1f64.exp()), epsilon = 1e-14);
    }

    #[test]
    fn test_fd_zero_temperature_is_a_step() {
        let fd = SmearingFD {};

        assert_eq!(fd.get_occupation_number(0.0, 0.0, -1e-6), 1.0);
        assert_eq!(fd.get_occupation_number(0.0, 0.0, 1e-6), 0.0);
    }
}
