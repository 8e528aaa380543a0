use crate::*;
use fifo::FIFO;
use log::{debug, warn};
use matrix::Matrix;

/// Anderson extrapolation over the last `nhistory` (input, residual) pairs.
///
/// With F_m the newest residual, the coefficients minimize
/// |F_m + sum_i c_i (F_i - F_m)| in the integration metric; the
/// extrapolated pair is then damped like simple mixing.
pub struct MixingAnderson {
    beta: f64,
    condition_threshold: f64,

    vin: FIFO<Vec<f64>>,
    vres: FIFO<Vec<f64>>,
}

impl MixingAnderson {
    pub fn new(
        beta: f64,
        nhistory: usize,
        condition_threshold: f64,
    ) -> Result<MixingAnderson, MixingError> {
        if nhistory == 0 {
            return Err(MixingError::InvalidHistory(
                "anderson mixing needs a history depth of at least 1".to_string(),
            ));
        }

        Ok(MixingAnderson {
            beta,
            condition_threshold,
            vin: FIFO::new(nhistory),
            vres: FIFO::new(nhistory),
        })
    }

    fn coefficients(&self, metric: &MixingMetric) -> Option<Vec<f64>> {
        let m = self.vres.len() - 1;
        let fm = &self.vres[m];

        let diffs: Vec<Vec<f64>> = (0..m)
            .map(|i| residual(&self.vres[i], fm))
            .collect();

        let mut a = Matrix::<f64>::new(m, m);
        let mut c = vec![0.0; m];

        for i in 0..m {
            for j in i..m {
                let aij = metric.dot(&diffs[i], &diffs[j]);
                a[[i, j]] = aij;
                a[[j, i]] = aij;
            }
            c[i] = metric.dot(&diffs[i], fm);
        }

        let cond = linalg::condition_number_hermitian(&a).ok()?;

        if !(cond < self.condition_threshold) {
            warn!(
                "anderson: history matrix condition number {:.3E} exceeds {:.3E}",
                cond, self.condition_threshold
            );
            return None;
        }

        let theta = linalg::solve(&a, &c).ok()?;

        if theta.iter().any(|t| !t.is_finite()) {
            return None;
        }

        Some(theta)
    }
}

impl Mixing for MixingAnderson {
    fn compute_next_density(
        &mut self,
        metric: &MixingMetric,
        precond: &dyn Preconditioner,
        inp: &mut [f64],
        out: &[f64],
    ) -> Result<MixingStep, MixingError> {
        check_lengths(metric, inp, out)?;

        let residual_norm = metric.distance(inp, out);

        self.vin.push(inp.to_vec());
        self.vres.push(residual(inp, out));

        let history_len = self.vin.len();

        if history_len < 2 {
            simple_step(self.beta, precond, inp, out)?;

            return Ok(MixingStep {
                residual_norm,
                fell_back: false,
                history_len,
            });
        }

        let theta = match self.coefficients(metric) {
            Some(theta) => theta,
            None => {
                warn!("anderson: falling back to simple mixing for this iteration");

                simple_step(self.beta, precond, inp, out)?;

                return Ok(MixingStep {
                    residual_norm,
                    fell_back: true,
                    history_len,
                });
            }
        };

        debug!("anderson coefficients: {:?}", theta);

        let m = history_len - 1;

        let mut in_bar = self.vin[m].clone();
        let mut res_bar = self.vres[m].clone();

        for (i, t) in theta.iter().enumerate() {
            let (vin_i, vin_m) = (&self.vin[i], &self.vin[m]);
            let (vres_i, vres_m) = (&self.vres[i], &self.vres[m]);

            for (x, a, b) in multizip((in_bar.iter_mut(), vin_i.iter(), vin_m.iter())) {
                *x += t * (a - b);
            }

            for (x, a, b) in multizip((res_bar.iter_mut(), vres_i.iter(), vres_m.iter())) {
                *x += t * (a - b);
            }
        }

        let pres = precond.apply(&res_bar)?;

        for (x, b, p) in multizip((inp.iter_mut(), in_bar.iter(), pres.iter())) {
            *x = b + self.beta * p;
        }

        Ok(MixingStep {
            residual_norm,
            fell_back: false,
            history_len,
        })
    }

    fn reset(&mut self) {
        self.vin.clear();
        self.vres.clear();
    }

    fn history_len(&self) -> usize {
        self.vin.len()
    }
}
