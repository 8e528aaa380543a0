mod schemes;
pub use schemes::*;

use feconsts::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use types::Arithmetic;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    InvalidParameter { name: &'static str, reason: String },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ControlError {}

fn invalid(name: &'static str, reason: String) -> Result<(), ControlError> {
    Err(ControlError::InvalidParameter { name, reason })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Control {
    spin_scheme: SpinScheme,
    constrained_magnetization: Option<f64>,
    periodic: bool,

    eigen_solver: EigenSolverScheme,
    nband: usize, // 0: derived from the number of occupied states
    chebyshev_degree: usize,
    lanczos_steps: usize,
    spectrum_split: usize, // 0: off
    mixed_precision: bool,
    rr_generalized: bool,
    first_scf_filter_passes: usize,

    smearing_scheme: SmearingScheme,
    temperature: f64, // K

    xc_scheme: XcScheme,

    scf_rho_mix_scheme: MixingScheme,
    scf_rho_mix_field: MixingField,
    scf_rho_mix_beta: f64, // (1-beta)*in + beta*out
    scf_rho_mix_history_steps: usize,
    scf_rho_mix_kerker_k0: f64,
    scf_rho_mix_condition_threshold: f64,
    scf_rho_mix_broyden_w0: f64,
    scf_rho_mix_broyden_weight_factor: f64,
    scf_rho_mix_broyden_weight_min: f64,
    scf_rho_mix_broyden_weight_max: f64,

    scf_max_iter: usize,
    scf_min_iter: usize,
    eigval_residual_epsilon: f64,
    rho_epsilon: f64,

    seed: u64,
}

impl Default for Control {
    fn default() -> Self {
        Control {
            spin_scheme: SpinScheme::NonSpin,
            constrained_magnetization: None,
            periodic: false,

            eigen_solver: EigenSolverScheme::Chfsi,
            nband: 0,
            chebyshev_degree: 20,
            lanczos_steps: 20,
            spectrum_split: 0,
            mixed_precision: false,
            rr_generalized: false,
            first_scf_filter_passes: 3,

            smearing_scheme: SmearingScheme::FermiDirac,
            temperature: 500.0,

            xc_scheme: XcScheme::LdaPz,

            scf_rho_mix_scheme: MixingScheme::Anderson,
            scf_rho_mix_field: MixingField::Quadrature,
            scf_rho_mix_beta: 0.2,
            scf_rho_mix_history_steps: 10,
            scf_rho_mix_kerker_k0: 0.5,
            scf_rho_mix_condition_threshold: 1.0E12,
            scf_rho_mix_broyden_w0: 0.01,
            scf_rho_mix_broyden_weight_factor: 0.01,
            scf_rho_mix_broyden_weight_min: 1.0,
            scf_rho_mix_broyden_weight_max: 1.0E5,

            scf_max_iter: 100,
            scf_min_iter: 1,
            eigval_residual_epsilon: EPS6,
            rho_epsilon: EPS6,

            seed: 1,
        }
    }
}

impl Control {
    pub fn new() -> Control {
        Control::default()
    }

    pub fn get_spin_scheme(&self) -> SpinScheme {
        self.spin_scheme
    }

    pub fn is_spin(&self) -> bool {
        self.spin_scheme == SpinScheme::Spin
    }

    pub fn get_constrained_magnetization(&self) -> Option<f64> {
        self.constrained_magnetization
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn get_arithmetic(&self) -> Arithmetic {
        Arithmetic::for_boundary(self.periodic)
    }

    pub fn get_eigen_solver(&self) -> EigenSolverScheme {
        self.eigen_solver
    }

    pub fn get_nband(&self) -> usize {
        self.nband
    }

    /// Subspace size for `n_occupied` occupied states.
    pub fn get_n_subspace(&self, n_occupied: usize) -> usize {
        if self.nband > 0 {
            self.nband
        } else {
            n_occupied + (n_occupied / 5).max(4)
        }
    }

    pub fn get_chebyshev_degree(&self) -> usize {
        self.chebyshev_degree
    }

    pub fn get_lanczos_steps(&self) -> usize {
        self.lanczos_steps
    }

    /// Number of tracked states when the spectrum is split.
    pub fn get_spectrum_split(&self) -> Option<usize> {
        if self.spectrum_split > 0 {
            Some(self.spectrum_split)
        } else {
            None
        }
    }

    pub fn get_mixed_precision(&self) -> bool {
        self.mixed_precision
    }

    pub fn get_rr_generalized(&self) -> bool {
        self.rr_generalized
    }

    pub fn get_first_scf_filter_passes(&self) -> usize {
        self.first_scf_filter_passes
    }

    pub fn get_smearing_scheme(&self) -> SmearingScheme {
        self.smearing_scheme
    }

    pub fn get_temperature(&self) -> f64 {
        self.temperature
    }

    pub fn get_xc_scheme(&self) -> XcScheme {
        self.xc_scheme
    }

    pub fn get_scf_rho_mix_scheme(&self) -> MixingScheme {
        self.scf_rho_mix_scheme
    }

    pub fn get_scf_rho_mix_field(&self) -> MixingField {
        self.scf_rho_mix_field
    }

    pub fn get_scf_rho_mix_beta(&self) -> f64 {
        self.scf_rho_mix_beta
    }

    pub fn get_scf_rho_mix_history_steps(&self) -> usize {
        self.scf_rho_mix_history_steps
    }

    pub fn get_scf_rho_mix_kerker_k0(&self) -> f64 {
        self.scf_rho_mix_kerker_k0
    }

    pub fn get_scf_rho_mix_condition_threshold(&self) -> f64 {
        self.scf_rho_mix_condition_threshold
    }

    pub fn get_scf_rho_mix_broyden_w0(&self) -> f64 {
        self.scf_rho_mix_broyden_w0
    }

    pub fn get_scf_rho_mix_broyden_weight_factor(&self) -> f64 {
        self.scf_rho_mix_broyden_weight_factor
    }

    pub fn get_scf_rho_mix_broyden_weight_min(&self) -> f64 {
        self.scf_rho_mix_broyden_weight_min
    }

    pub fn get_scf_rho_mix_broyden_weight_max(&self) -> f64 {
        self.scf_rho_mix_broyden_weight_max
    }

    pub fn get_scf_max_iter(&self) -> usize {
        self.scf_max_iter
    }

    pub fn get_scf_min_iter(&self) -> usize {
        self.scf_min_iter
    }

    pub fn get_eigval_residual_epsilon(&self) -> f64 {
        self.eigval_residual_epsilon
    }

    pub fn get_rho_epsilon(&self) -> f64 {
        self.rho_epsilon
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn set_spin_scheme(&mut self, v: SpinScheme) -> &mut Self {
        self.spin_scheme = v;
        self
    }

    pub fn set_constrained_magnetization(&mut self, v: Option<f64>) -> &mut Self {
        self.constrained_magnetization = v;
        self
    }

    pub fn set_periodic(&mut self, v: bool) -> &mut Self {
        self.periodic = v;
        self
    }

    pub fn set_nband(&mut self, v: usize) -> &mut Self {
        self.nband = v;
        self
    }

    pub fn set_chebyshev_degree(&mut self, v: usize) -> &mut Self {
        self.chebyshev_degree = v;
        self
    }

    pub fn set_lanczos_steps(&mut self, v: usize) -> &mut Self {
        self.lanczos_steps = v;
        self
    }

    pub fn set_spectrum_split(&mut self, v: usize) -> &mut Self {
        self.spectrum_split = v;
        self
    }

    pub fn set_mixed_precision(&mut self, v: bool) -> &mut Self {
        self.mixed_precision = v;
        self
    }

    pub fn set_rr_generalized(&mut self, v: bool) -> &mut Self {
        self.rr_generalized = v;
        self
    }

    pub fn set_first_scf_filter_passes(&mut self, v: usize) -> &mut Self {
        self.first_scf_filter_passes = v;
        self
    }

    pub fn set_smearing_scheme(&mut self, v: SmearingScheme) -> &mut Self {
        self.smearing_scheme = v;
        self
    }

    pub fn set_temperature(&mut self, v: f64) -> &mut Self {
        self.temperature = v;
        self
    }

    pub fn set_scf_rho_mix_scheme(&mut self, v: MixingScheme) -> &mut Self {
        self.scf_rho_mix_scheme = v;
        self
    }

    pub fn set_scf_rho_mix_field(&mut self, v: MixingField) -> &mut Self {
        self.scf_rho_mix_field = v;
        self
    }

    pub fn set_scf_rho_mix_beta(&mut self, v: f64) -> &mut Self {
        self.scf_rho_mix_beta = v;
        self
    }

    pub fn set_scf_rho_mix_history_steps(&mut self, v: usize) -> &mut Self {
        self.scf_rho_mix_history_steps = v;
        self
    }

    pub fn set_scf_rho_mix_kerker_k0(&mut self, v: f64) -> &mut Self {
        self.scf_rho_mix_kerker_k0 = v;
        self
    }

    pub fn set_scf_rho_mix_condition_threshold(&mut self, v: f64) -> &mut Self {
        self.scf_rho_mix_condition_threshold = v;
        self
    }

    pub fn set_scf_max_iter(&mut self, v: usize) -> &mut Self {
        self.scf_max_iter = v;
        self
    }

    pub fn set_scf_min_iter(&mut self, v: usize) -> &mut Self {
        self.scf_min_iter = v;
        self
    }

    pub fn set_eigval_residual_epsilon(&mut self, v: f64) -> &mut Self {
        self.eigval_residual_epsilon = v;
        self
    }

    pub fn set_rho_epsilon(&mut self, v: f64) -> &mut Self {
        self.rho_epsilon = v;
        self
    }

    pub fn set_seed(&mut self, v: u64) -> &mut Self {
        self.seed = v;
        self
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if self.constrained_magnetization.is_some() && self.spin_scheme == SpinScheme::NonSpin {
            return invalid(
                "constrained_magnetization",
                "requires spin_scheme = spin".to_string(),
            );
        }

        if self.nband > 0 && self.spectrum_split > self.nband {
            return invalid(
                "spectrum_split",
                format!("{} tracked states exceed nband = {}", self.spectrum_split, self.nband),
            );
        }

        if self.lanczos_steps == 0 {
            return invalid("lanczos_steps", "at least one step is required".to_string());
        }

        if self.first_scf_filter_passes == 0 {
            return invalid("first_scf_filter_passes", "must be at least 1".to_string());
        }

        if !(self.temperature >= 0.0) {
            return invalid("temperature", format!("{} K is negative", self.temperature));
        }

        if !(0.0..=1.0).contains(&self.scf_rho_mix_beta) {
            return invalid(
                "scf_rho_mix_beta",
                format!("{} is outside [0, 1]", self.scf_rho_mix_beta),
            );
        }

        if self.scf_rho_mix_scheme.uses_history() && self.scf_rho_mix_history_steps == 0 {
            return invalid(
                "scf_rho_mix_history_steps",
                format!("{} mixing needs a history depth of at least 1", self.scf_rho_mix_scheme),
            );
        }

        if self.scf_rho_mix_field == MixingField::Nodal && !(self.scf_rho_mix_kerker_k0 > 0.0) {
            return invalid(
                "scf_rho_mix_kerker_k0",
                format!("{} is not positive", self.scf_rho_mix_kerker_k0),
            );
        }

        if !(self.scf_rho_mix_condition_threshold > 1.0) {
            return invalid(
                "scf_rho_mix_condition_threshold",
                format!("{} must exceed 1", self.scf_rho_mix_condition_threshold),
            );
        }

        if self.scf_rho_mix_broyden_weight_min > self.scf_rho_mix_broyden_weight_max {
            return invalid(
                "scf_rho_mix_broyden_weight_min",
                "exceeds scf_rho_mix_broyden_weight_max".to_string(),
            );
        }

        if self.scf_min_iter == 0 || self.scf_min_iter > self.scf_max_iter {
            return invalid(
                "scf_max_iter",
                format!(
                    "need 0 < scf_min_iter <= scf_max_iter, got {} and {}",
                    self.scf_min_iter, self.scf_max_iter
                ),
            );
        }

        if !(self.eigval_residual_epsilon > 0.0) || !(self.rho_epsilon > 0.0) {
            return invalid(
                "eigval_residual_epsilon",
                "convergence tolerances must be positive".to_string(),
            );
        }

        Ok(())
    }

    pub fn display(&self) {
        let w1 = OUT_WIDTH1;
        let w2 = OUT_WIDTH2;

        info!("   {:-^80}", " control parameters ");

        info!("   {:<w1$} = {:>w2$}", "spin_scheme", self.spin_scheme);
        if let Some(m) = self.constrained_magnetization {
            info!("   {:<w1$} = {:>w2$.4}", "constrained_magnetization", m);
        }
        info!("   {:<w1$} = {:>w2$}", "periodic", self.periodic);
        info!("   {:<w1$} = {:>w2$}", "eigen_solver", self.eigen_solver);
        info!("   {:<w1$} = {:>w2$}", "nband", self.nband);
        info!("   {:<w1$} = {:>w2$}", "chebyshev_degree", self.chebyshev_degree);
        info!("   {:<w1$} = {:>w2$}", "lanczos_steps", self.lanczos_steps);
        info!("   {:<w1$} = {:>w2$}", "spectrum_split", self.spectrum_split);
        info!("   {:<w1$} = {:>w2$}", "mixed_precision", self.mixed_precision);
        info!("   {:<w1$} = {:>w2$}", "rr_generalized", self.rr_generalized);
        info!("   {:<w1$} = {:>w2$}", "first_scf_filter_passes", self.first_scf_filter_passes);
        info!("   {:<w1$} = {:>w2$}", "smearing_scheme", self.smearing_scheme);
        info!("   {:<w1$} = {:>w2$} K", "temperature", self.temperature);
        info!("   {:<w1$} = {:>w2$}", "xc_scheme", self.xc_scheme);
        info!("   {:<w1$} = {:>w2$}", "scf_rho_mix_scheme", self.scf_rho_mix_scheme);
        info!("   {:<w1$} = {:>w2$}", "scf_rho_mix_field", self.scf_rho_mix_field);
        info!("   {:<w1$} = {:>w2$}", "scf_rho_mix_beta", self.scf_rho_mix_beta);
        info!("   {:<w1$} = {:>w2$}", "scf_rho_mix_history_steps", self.scf_rho_mix_history_steps);
        info!("   {:<w1$} = {:>w2$}", "scf_rho_mix_kerker_k0", self.scf_rho_mix_kerker_k0);
        info!("   {:<w1$} = {:>w2$}", "scf_max_iter", self.scf_max_iter);
        info!("   {:<w1$} = {:>w2$}", "scf_min_iter", self.scf_min_iter);
        info!("   {:<w1$} = {:>w2$.3E}", "eigval_residual_epsilon", self.eigval_residual_epsilon);
        info!("   {:<w1$} = {:>w2$.3E}", "rho_epsilon", self.rho_epsilon);
        info!("   {:<w1$} = {:>w2$}", "seed", self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let control = Control::default();

        assert!(control.validate().is_ok());
        assert_eq!(control.get_arithmetic(), Arithmetic::Real);
        assert_eq!(control.get_n_subspace(10), 14);
        assert_eq!(control.get_spectrum_split(), None);
    }

    #[test]
    fn test_history_required_for_anderson() {
        let mut control = Control::new();
        control
            .set_scf_rho_mix_scheme(MixingScheme::Anderson)
            .set_scf_rho_mix_history_steps(0);

        assert!(matches!(
            control.validate(),
            Err(ControlError::InvalidParameter {
                name: "scf_rho_mix_history_steps",
                ..
            })
        ));

        control.set_scf_rho_mix_scheme(MixingScheme::Simple);
        assert!(control.validate().is_ok());
    }

    #[test]
    fn test_magnetization_needs_spin() {
        let mut control = Control::new();
        control.set_constrained_magnetization(Some(1.0));

        assert!(control.validate().is_err());

        control.set_spin_scheme(SpinScheme::Spin);
        assert!(control.validate().is_ok());
    }

    #[test]
    fn test_iteration_bounds() {
        let mut control = Control::new();
        control.set_scf_min_iter(0);

        assert!(matches!(
            control.validate(),
            Err(ControlError::InvalidParameter {
                name: "scf_max_iter",
                ..
            })
        ));

        control.set_scf_min_iter(5).set_scf_max_iter(4);
        assert!(control.validate().is_err());

        control.set_scf_max_iter(0);
        assert!(control.validate().is_err());

        control.set_scf_min_iter(4).set_scf_max_iter(4);
        assert!(control.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let control: Control = serde_json::from_str(
            r#"{ "spin_scheme": "spin", "smearing_scheme": "gs", "scf_rho_mix_scheme": "broyden", "periodic": true }"#,
        )
        .unwrap();

        assert!(control.is_spin());
        assert_eq!(control.get_smearing_scheme(), SmearingScheme::Gaussian);
        assert_eq!(control.get_scf_rho_mix_scheme(), MixingScheme::Broyden);
        assert_eq!(control.get_arithmetic(), Arithmetic::Complex);
        assert_eq!(control.get_scf_max_iter(), 100);
    }
}
