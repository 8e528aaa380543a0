use crate::*;

pub struct MixingSimple {
    beta: f64,
}

impl MixingSimple {
    pub fn new(beta: f64) -> MixingSimple {
        MixingSimple { beta }
    }
}

impl Mixing for MixingSimple {
    fn compute_next_density(
        &mut self,
        metric: &MixingMetric,
        precond: &dyn Preconditioner,
        inp: &mut [f64],
        out: &[f64],
    ) -> Result<MixingStep, MixingError> {
        check_lengths(metric, inp, out)?;

        let residual_norm = metric.distance(inp, out);

        simple_step(self.beta, precond, inp, out)?;

        Ok(MixingStep {
            residual_norm,
            fell_back: false,
            history_len: 0,
        })
    }

    fn reset(&mut self) {}

    fn history_len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fecomm::SerialComm;

    #[test]
    fn test_simple_mixing_limits() {
        let w = vec![0.3, 0.7, 1.1];
        let comm = SerialComm;
        let metric = MixingMetric::new(&w, &comm);

        let inp0 = vec![1.0 / 3.0, 2.5, -0.1];
        let out = vec![0.7, 1.0 / 7.0, 0.2];

        let mut inp = inp0.clone();
        MixingSimple::new(1.0)
            .compute_next_density(&metric, &IdentityPreconditioner, &mut inp, &out)
            .unwrap();
        assert_eq!(inp, out);

        let mut inp = inp0.clone();
        MixingSimple::new(0.0)
            .compute_next_density(&metric, &IdentityPreconditioner, &mut inp, &out)
            .unwrap();
        assert_eq!(inp, inp0);
    }

    #[test]
    fn test_identical_output_has_zero_residual() {
        let w = vec![0.5; 4];
        let comm = SerialComm;
        let metric = MixingMetric::new(&w, &comm);

        let mut inp = vec![0.1, 0.2, 0.3, 0.4];
        let out = inp.clone();

        let step = MixingSimple::new(0.5)
            .compute_next_density(&metric, &IdentityPreconditioner, &mut inp, &out)
            .unwrap();

        assert_eq!(step.residual_norm, 0.0);
        assert_eq!(inp, out);
    }

    #[test]
    fn test_simple_mixing_rejects_short_output() {
        let w = vec![1.0; 3];
        let comm = SerialComm;
        let metric = MixingMetric::new(&w, &comm);

        let mut inp = vec![0.0; 3];

        assert_eq!(
            MixingSimple::new(0.5).compute_next_density(
                &metric,
                &IdentityPreconditioner,
                &mut inp,
                &[0.0; 2]
            ),
            Err(MixingError::LayoutMismatch {
                expected: 3,
                found: 2
            })
        );
    }
}
