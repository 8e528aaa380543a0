use crate::*;

pub struct FermiLevelNonspin {
    smearing: Box<dyn Smearing>,
    temperature: f64,
}

impl FermiLevelNonspin {
    pub fn new(smearing: Box<dyn Smearing>, temperature: f64) -> FermiLevelNonspin {
        FermiLevelNonspin {
            smearing,
            temperature,
        }
    }
}

impl FermiLevel for FermiLevelNonspin {
    fn get_fermi_level(
        &self,
        channels: &[ChannelLevels],
        nelec: f64,
        kpool: &dyn Communicator,
    ) -> Result<FermiSolution, FermiLevelError> {
        let fermi_level = compute_fermi_energy(
            self.smearing.as_ref(),
            self.temperature,
            SpinScheme::NonSpin.spin_factor(),
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
