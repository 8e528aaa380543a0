use crate::*;

/// One Fermi level shared by both spin channels.
pub struct FermiLevelSpin {
    smearing: Box<dyn Smearing>,
    temperature: f64,
}

impl FermiLevelSpin {
    pub fn new(smearing: Box<dyn Smearing>, temperature: f64) -> FermiLevelSpin {
        FermiLevelSpin {
            smearing,
            temperature,
        }
    }
}

impl FermiLevel for FermiLevelSpin {
    fn get_fermi_level(
        &self,
        channels: &[ChannelLevels],
        nelec: f64,
        kpool: &dyn Communicator,
    ) -> Result<FermiSolution, FermiLevelError> {
        let fermi_level = compute_fermi_energy(
            self.smearing.as_ref(),
            self.temperature,
            SpinScheme::Spin.spin_factor(),
            channels,
            nelec,
            kpool,
        )?;

        let occupations =
            compute_occupations(self.smearing.as_ref(), self.temperature, channels, fermi_level);

        Ok(FermiSolution {
            fermi_level,
            fermi_level_up: fermi_level,
            fermi_level_dn: fermi_level,
            occupations,
        })
    }
}

/// Fixed total magnetization; each spin channel gets its own level.
pub struct FermiLevelSpinConstrained {
    smearing: Box<dyn Smearing>,
    temperature: f64,
    magnetization: f64,
}

impl FermiLevelSpinConstrained {
    pub fn new(
        smearing: Box<dyn Smearing>,
        temperature: f64,
        magnetization: f64,
    ) -> FermiLevelSpinConstrained {
        FermiLevelSpinConstrained {
            smearing,
            temperature,
            magnetization,
        }
    }
}

impl FermiLevel for FermiLevelSpinConstrained {
    fn get_fermi_level(
        &self,
        channels: &[ChannelLevels],
        nelec: f64,
        kpool: &dyn Communicator,
    ) -> Result<FermiSolution, FermiLevelError> {
        let (fermi_up, fermi_dn) = compute_fermi_energy_constrained(
            self.smearing.as_ref(),
            self.temperature,
            channels,
            nelec,
            self.magnetization,
            kpool,
        )?;

        let occupations = channels
            .iter()
            .map(|ch| {
                let fermi = if ch.spin == 0 { fermi_up } else { fermi_dn };

                ch.eigenvalues
                    .iter()
                    .map(|e| {
                        self.smearing
                            .get_occupation_number(fermi, self.temperature, *e)
                    })
                    .collect()
            })
            .collect();

        Ok(FermiSolution {
            fermi_level: 0.5 * (fermi_up + fermi_dn),
            fermi_level_up: fermi_up,
            fermi_level_dn: fermi_dn,
            occupations,
        })
    }
}
