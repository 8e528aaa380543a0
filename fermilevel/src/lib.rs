mod nonspin;
use nonspin::*;

mod spin;
use spin::*;

use control::SpinScheme;
use fecomm::Communicator;
use feconsts::*;
use log::debug;
use smearing::Smearing;
use std::fmt;

const MAX_BRACKET_STEPS: usize = 200;
const MAX_BISECTION_STEPS: usize = 500;

/// Smearing widths below the lowest level at which every occupation underflows to 0.
const EMPTY_LEVEL_WIDTHS: f64 = 800.0;

/// Eigenvalues of one (spin, k-point) channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelLevels<'a> {
    pub spin: usize,
    pub k_weight: f64,
    pub eigenvalues: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FermiSolution {
    pub fermi_level: f64,
    /// Separate levels when the magnetization is constrained.
    pub fermi_level_up: f64,
    pub fermi_level_dn: f64,
    /// Occupation in [0, 1] of every state, per channel.
    pub occupations: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FermiLevelError {
    InvalidElectronCount(f64),
    InsufficientStates { capacity: f64, nelec: f64 },
    NoBracket { nelec: f64 },
    InvalidMagnetization { magnetization: f64, nelec: f64 },
}

impl fmt::Display for FermiLevelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FermiLevelError::InvalidElectronCount(n) => {
                write!(f, "invalid electron count {}", n)
            }
            FermiLevelError::InsufficientStates { capacity, nelec } => write!(
                f,
                "computed states hold at most {} electrons, {} requested",
                capacity, nelec
            ),
            FermiLevelError::NoBracket { nelec } => {
                write!(f, "could not bracket the Fermi level for {} electrons", nelec)
            }
            FermiLevelError::InvalidMagnetization {
                magnetization,
                nelec,
            } => write!(
                f,
                "magnetization {} is not reachable with {} electrons",
                magnetization, nelec
            ),
        }
    }
}

impl std::error::Error for FermiLevelError {}

pub trait FermiLevel: Send + Sync {
    fn get_fermi_level(
        &self,
        channels: &[ChannelLevels],
        nelec: f64,
        kpool: &dyn Communicator,
    ) -> Result<FermiSolution, FermiLevelError>;
}

pub fn new(
    spin_scheme: SpinScheme,
    constrained_magnetization: Option<f64>,
    smearing: Box<dyn Smearing>,
    temperature: f64,
) -> Box<dyn FermiLevel> {
    match (spin_scheme, constrained_magnetization) {
        (SpinScheme::NonSpin, _) => Box::new(FermiLevelNonspin::new(smearing, temperature)),
        (SpinScheme::Spin, None) => Box::new(FermiLevelSpin::new(smearing, temperature)),
        (SpinScheme::Spin, Some(m)) => {
            Box::new(FermiLevelSpinConstrained::new(smearing, temperature, m))
        }
    }
}

/// Occupations of `channels` at `fermi`.
pub fn compute_occupations(
    smearing: &dyn Smearing,
    temperature: f64,
    channels: &[ChannelLevels],
    fermi: f64,
) -> Vec<Vec<f64>> {
    channels
        .iter()
        .map(|ch| {
            ch.eigenvalues
                .iter()
                .map(|e| smearing.get_occupation_number(fermi, temperature, *e))
                .collect()
        })
        .collect()
}

/// Electrons held by `channels` at `fermi`, summed over the k-point pool.
pub fn get_total_electrons(
    smearing: &dyn Smearing,
    temperature: f64,
    spin_factor: f64,
    channels: &[ChannelLevels],
    fermi: f64,
    kpool: &dyn Communicator,
) -> f64 {
    let mut ntot_local = 0.0;

    for ch in channels.iter() {
        let occ: f64 = ch
            .eigenvalues
            .iter()
            .map(|e| smearing.get_occupation_number(fermi, temperature, *e))
            .sum();

        ntot_local += occ * ch.k_weight * spin_factor;
    }

    fecomm::all_reduce_scalar_sum(kpool, ntot_local)
}

/// Midpoint between the highest filled and the lowest empty level at zero temperature.
fn get_initial_fermi_level(
    channels: &[ChannelLevels],
    spin_factor: f64,
    nelec: f64,
    kpool: &dyn Communicator,
) -> f64 {
    let mut levels: Vec<(f64, f64)> = channels
        .iter()
        .flat_map(|ch| {
            ch.eigenvalues
                .iter()
                .map(move |e| (*e, ch.k_weight * spin_factor))
        })
        .collect();

    levels.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut homo_local = f64::NEG_INFINITY;
    let mut lumo_local = f64::INFINITY;
    let mut count = 0.0;

    for (e, w) in levels.iter() {
        if count < nelec - EPS12 {
            homo_local = *e;
            count += w;
        } else {
            lumo_local = *e;
            break;
        }
    }

    let homo = fecomm::all_reduce_scalar_max(kpool, homo_local);
    let lumo = fecomm::all_reduce_scalar_min(kpool, lumo_local);

    match (homo.is_finite(), lumo.is_finite()) {
        (true, true) => 0.5 * (homo + lumo),
        (true, false) => homo,
        (false, true) => lumo,
        (false, false) => 0.0,
    }
}

/// Solves count(fermi) = target by bracket expansion and bisection.
fn bisect_fermi_level<F: FnMut(f64) -> f64>(
    mut count: F,
    target: f64,
    guess: f64,
) -> Result<f64, FermiLevelError> {
    let mut upper = guess;
    let mut lower = guess;

    let mut step = EPS2 * EV_TO_HA;
    let mut n = 0;

    while count(upper) < target {
        upper += step;
        step *= 2.0;
        n += 1;

        if n > MAX_BRACKET_STEPS {
            return Err(FermiLevelError::NoBracket { nelec: target });
        }
    }

    let mut step = EPS2 * EV_TO_HA;
    let mut n = 0;

    while count(lower) > target {
        lower -= step;
        step *= 2.0;
        n += 1;

        if n > MAX_BRACKET_STEPS {
            return Err(FermiLevelError::NoBracket { nelec: target });
        }
    }

    let mut fermi_level = 0.5 * (upper + lower);

    for _ in 0..MAX_BISECTION_STEPS {
        fermi_level = 0.5 * (upper + lower);

        // interval exhausted at machine precision: a step in count(fermi)
        if fermi_level <= lower || fermi_level >= upper {
            break;
        }

        let ntot = count(fermi_level);

        if (ntot - target).abs() < EPS12 {
            break;
        }

        if ntot > target {
            upper = fermi_level;
        } else {
            lower = fermi_level;
        }
    }

    debug!(
        "fermi level {:.12E} Ha, bracket width {:.3E}",
        fermi_level,
        upper - lower
    );

    Ok(fermi_level)
}

fn check_capacity(
    channels: &[ChannelLevels],
    spin_factor: f64,
    nelec: f64,
    kpool: &dyn Communicator,
) -> Result<(), FermiLevelError> {
    if !(nelec > 0.0) || !nelec.is_finite() {
        return Err(FermiLevelError::InvalidElectronCount(nelec));
    }

    let capacity_local: f64 = channels
        .iter()
        .map(|ch| ch.eigenvalues.len() as f64 * ch.k_weight * spin_factor)
        .sum();

    let capacity = fecomm::all_reduce_scalar_sum(kpool, capacity_local);

    if capacity < nelec - EPS8 {
        return Err(FermiLevelError::InsufficientStates { capacity, nelec });
    }

    Ok(())
}

/// A level below every eigenvalue of `channels`, so all occupations vanish.
fn get_empty_fermi_level(
    channels: &[ChannelLevels],
    temperature: f64,
    kpool: &dyn Communicator,
) -> f64 {
    let lowest_local = channels
        .iter()
        .flat_map(|ch| ch.eigenvalues.iter())
        .fold(f64::INFINITY, |acc, e| acc.min(*e));

    let lowest = fecomm::all_reduce_scalar_min(kpool, lowest_local);

    if !lowest.is_finite() {
        return 0.0;
    }

    lowest - 1.0 - EMPTY_LEVEL_WIDTHS * BOLTZMANN_CONSTANT * temperature
}

/// Shared Fermi level over all channels.
pub fn compute_fermi_energy(
    smearing: &dyn Smearing,
    temperature: f64,
    spin_factor: f64,
    channels: &[ChannelLevels],
    nelec: f64,
    kpool: &dyn Communicator,
) -> Result<f64, FermiLevelError> {
    check_capacity(channels, spin_factor, nelec, kpool)?;

    let guess = get_initial_fermi_level(channels, spin_factor, nelec, kpool);

    bisect_fermi_level(
        |fermi| get_total_electrons(smearing, temperature, spin_factor, channels, fermi, kpool),
        nelec,
        guess,
    )
}

/// Separate up and down levels holding (N + m)/2 and (N - m)/2 electrons.
pub fn compute_fermi_energy_constrained(
    smearing: &dyn Smearing,
    temperature: f64,
    channels: &[ChannelLevels],
    nelec: f64,
    magnetization: f64,
    kpool: &dyn Communicator,
) -> Result<(f64, f64), FermiLevelError> {
    let up: Vec<ChannelLevels> = channels.iter().filter(|c| c.spin == 0).copied().collect();
    let dn: Vec<ChannelLevels> = channels.iter().filter(|c| c.spin == 1).copied().collect();

    if !magnetization.is_finite() || magnetization.abs() > nelec + EPS12 {
        return Err(FermiLevelError::InvalidMagnetization {
            magnetization,
            nelec,
        });
    }

    let nelec_up = 0.5 * (nelec + magnetization);
    let nelec_dn = 0.5 * (nelec - magnetization);

    // a fully polarized run leaves one channel empty
    let solve = |levels: &[ChannelLevels], n: f64| {
        if n < EPS12 {
            Ok(get_empty_fermi_level(levels, temperature, kpool))
        } else {
            compute_fermi_energy(smearing, temperature, 1.0, levels, n, kpool)
        }
    };

    let fermi_up = solve(up.as_slice(), nelec_up)?;
    let fermi_dn = solve(dn.as_slice(), nelec_dn)?;

    Ok((fermi_up, fermi_dn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use control::SmearingScheme;
    use fecomm::SerialComm;

    fn fd() -> Box<dyn Smearing> {
        smearing::new(SmearingScheme::FermiDirac)
    }

    #[test]
    fn test_nonspin_gap_places_level_in_gap() {
        let evals = vec![-0.5, -0.2, 0.3, 0.6];
        let channels = [ChannelLevels {
            spin: 0,
            k_weight: 1.0,
            eigenvalues: &evals,
        }];

        let driver = new(SpinScheme::NonSpin, None, fd(), 300.0);
        let sol = driver.get_fermi_level(&channels, 4.0, &SerialComm).unwrap();

        assert!(sol.fermi_level > -0.2 && sol.fermi_level < 0.3);
        assert_abs_diff_eq!(sol.occupations[0][0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sol.occupations[0][2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_electron_count_matches_at_finite_temperature() {
        let e1 = vec![-0.3, -0.01, 0.0, 0.02];
        let e2 = vec![-0.28, -0.02, 0.01, 0.03];

        let channels = [
            ChannelLevels {
                spin: 0,
                k_weight: 0.25,
                eigenvalues: &e1,
            },
            ChannelLevels {
                spin: 0,
                k_weight: 0.75,
                eigenvalues: &e2,
            },
        ];

        let smearing = fd();
        let fermi =
            compute_fermi_energy(smearing.as_ref(), 3000.0, 2.0, &channels, 3.0, &SerialComm)
                .unwrap();

        let n = get_total_electrons(smearing.as_ref(), 3000.0, 2.0, &channels, fermi, &SerialComm);

        assert_abs_diff_eq!(n, 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_constrained_magnetization() {
        let up = vec![-0.4, -0.1, 0.2];
        let dn = vec![-0.35, -0.05, 0.25];

        let channels = [
            ChannelLevels {
                spin: 0,
                k_weight: 1.0,
                eigenvalues: &up,
            },
            ChannelLevels {
                spin: 1,
                k_weight: 1.0,
                eigenvalues: &dn,
            },
        ];

        let driver = new(SpinScheme::Spin, Some(1.0), fd(), 100.0);
        let sol = driver.get_fermi_level(&channels, 3.0, &SerialComm).unwrap();

        let n_up: f64 = sol.occupations[0].iter().sum();
        let n_dn: f64 = sol.occupations[1].iter().sum();

        assert_abs_diff_eq!(n_up, 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(n_dn, 1.0, epsilon = 1e-10);
        assert!(sol.fermi_level_up > sol.fermi_level_dn);
    }

    #[test]
    fn test_fully_polarized_leaves_minority_empty() {
        let up = vec![-0.5, 0.1, 0.4];
        let dn = vec![-0.45, 0.15, 0.45];

        let channels = [
            ChannelLevels {
                spin: 0,
                k_weight: 1.0,
                eigenvalues: &up,
            },
            ChannelLevels {
                spin: 1,
                k_weight: 1.0,
                eigenvalues: &dn,
            },
        ];

        for scheme in [SmearingScheme::FermiDirac, SmearingScheme::Gaussian] {
            let driver = new(SpinScheme::Spin, Some(1.0), smearing::new(scheme), 300.0);
            let sol = driver.get_fermi_level(&channels, 1.0, &SerialComm).unwrap();

            let n_up: f64 = sol.occupations[0].iter().sum();

            assert_abs_diff_eq!(n_up, 1.0, epsilon = 1e-10);
            assert!(sol.occupations[1].iter().all(|f| *f == 0.0));
            assert!(sol.fermi_level_dn < -0.45);
            assert!(sol.fermi_level.is_finite());
        }

        let driver = new(SpinScheme::Spin, Some(-1.0), fd(), 300.0);
        let sol = driver.get_fermi_level(&channels, 1.0, &SerialComm).unwrap();

        assert!(sol.occupations[0].iter().all(|f| *f == 0.0));
        assert_abs_diff_eq!(sol.occupations[1].iter().sum::<f64>(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_magnetization_beyond_electron_count() {
        let up = vec![-0.5, 0.1];
        let dn = vec![-0.45, 0.15];

        let channels = [
            ChannelLevels {
                spin: 0,
                k_weight: 1.0,
                eigenvalues: &up,
            },
            ChannelLevels {
                spin: 1,
                k_weight: 1.0,
                eigenvalues: &dn,
            },
        ];

        let driver = new(SpinScheme::Spin, Some(3.0), fd(), 300.0);

        assert!(matches!(
            driver.get_fermi_level(&channels, 2.0, &SerialComm),
            Err(FermiLevelError::InvalidMagnetization { .. })
        ));
    }

    #[test]
    fn test_too_few_states() {
        let evals = vec![0.0];
        let channels = [ChannelLevels {
            spin: 0,
            k_weight: 1.0,
            eigenvalues: &evals,
        }];

        let driver = new(SpinScheme::NonSpin, None, fd(), 300.0);

        assert!(matches!(
            driver.get_fermi_level(&channels, 4.0, &SerialComm),
            Err(FermiLevelError::InsufficientStates { .. })
        ));
    }
}
