// D. D. Johnson, Phys. Rev. B 38, 12807 (1988)

use crate::*;
use feconsts::EPS20;
use fifo::FIFO;
use log::{debug, warn};
use matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroydenWeights {
    /// Regularization of the inverse Jacobian update.
    pub w0: f64,
    /// Iteration weight is factor / |F|, clamped to [min, max].
    pub factor: f64,
    pub min: f64,
    pub max: f64,
}

impl BroydenWeights {
    fn weight(&self, res_norm: f64) -> f64 {
        let w = if res_norm > self.factor / self.max {
            self.factor / res_norm
        } else {
            self.max
        };

        w.max(self.min)
    }
}

struct SecantPair {
    df: Vec<f64>,
    u: Vec<f64>,
    weight: f64,
}

/// Modified Broyden mixing; the inverse Jacobian is kept implicitly through
/// the last `nhistory` normalized secant pairs.
pub struct MixingBroyden {
    beta: f64,
    condition_threshold: f64,
    weights: BroydenWeights,

    pairs: FIFO<SecantPair>,
    last: Option<(Vec<f64>, Vec<f64>)>,
}

impl MixingBroyden {
    pub fn new(
        beta: f64,
        nhistory: usize,
        condition_threshold: f64,
        weights: BroydenWeights,
    ) -> Result<MixingBroyden, MixingError> {
        if nhistory == 0 {
            return Err(MixingError::InvalidHistory(
                "broyden mixing needs a history depth of at least 1".to_string(),
            ));
        }

        if !(weights.min <= weights.max) || !(weights.factor > 0.0) {
            return Err(MixingError::InvalidHistory(format!(
                "broyden weights need 0 < factor and min <= max, got {:?}",
                weights
            )));
        }

        Ok(MixingBroyden {
            beta,
            condition_threshold,
            weights,
            pairs: FIFO::new(nhistory),
            last: None,
        })
    }

    // Appends the secant pair between the previous and the current iterate;
    // false when the residual did not change.
    fn push_pair(
        &mut self,
        metric: &MixingMetric,
        precond: &dyn Preconditioner,
        inp: &[f64],
        res: &[f64],
        res_norm: f64,
    ) -> Result<bool, MixingError> {
        let (in_last, res_last) = match &self.last {
            Some(last) => last,
            None => return Ok(true),
        };

        let mut df = residual(res_last, res);
        let norm = metric.norm(&df);

        if !(norm > EPS20) || !norm.is_finite() {
            return Ok(false);
        }

        df.iter_mut().for_each(|x| *x /= norm);

        let pdf = precond.apply(&df)?;

        let u: Vec<f64> = multizip((pdf.iter(), inp.iter(), in_last.iter()))
            .map(|(p, a, b)| self.beta * p + (a - b) / norm)
            .collect();

        self.pairs.push(SecantPair {
            df,
            u,
            weight: self.weights.weight(res_norm),
        });

        Ok(true)
    }

    // gamma_j w_j of the update in - sum_j w_j gamma_j u_j
    fn coefficients(&self, metric: &MixingMetric, res: &[f64]) -> Option<Vec<f64>> {
        let k = self.pairs.len();
        let w0 = self.weights.w0;

        let mut a = Matrix::<f64>::new(k, k);
        let mut c = vec![0.0; k];

        for i in 0..k {
            let pi = &self.pairs[i];

            for j in i..k {
                let pj = &self.pairs[j];
                let aij = pi.weight * pj.weight * metric.dot(&pi.df, &pj.df);
                a[[i, j]] = aij;
                a[[j, i]] = aij;
            }

            a[[i, i]] += w0 * w0;
            c[i] = pi.weight * metric.dot(&pi.df, res);
        }

        let cond = linalg::condition_number_hermitian(&a).ok()?;

        if !(cond < self.condition_threshold) {
            warn!(
                "broyden: secant matrix condition number {:.3E} exceeds {:.3E}",
                cond, self.condition_threshold
            );
            return None;
        }

        // a is symmetric, so c^T a^-1 = (a^-1 c)^T
        let gamma = linalg::solve(&a, &c).ok()?;

        if gamma.iter().any(|g| !g.is_finite()) {
            return None;
        }

        Some(
            gamma
                .iter()
                .enumerate()
                .map(|(j, g)| g * self.pairs[j].weight)
                .collect(),
        )
    }
}

impl Mixing for MixingBroyden {
    fn compute_next_density(
        &mut self,
        metric: &MixingMetric,
        precond: &dyn Preconditioner,
        inp: &mut [f64],
        out: &[f64],
    ) -> Result<MixingStep, MixingError> {
        check_lengths(metric, inp, out)?;

        let res = residual(inp, out);
        let residual_norm = metric.norm(&res);

        let secant_ok = self.push_pair(metric, precond, inp, &res, residual_norm)?;

        self.last = Some((inp.to_vec(), res.clone()));

        let history_len = self.pairs.len();

        if history_len == 0 && secant_ok {
            simple_step(self.beta, precond, inp, out)?;

            return Ok(MixingStep {
                residual_norm,
                fell_back: false,
                history_len,
            });
        }

        let coef = if secant_ok {
            self.coefficients(metric, &res)
        } else {
            warn!("broyden: residual did not change, secant pair skipped");
            None
        };

        let coef = match coef {
            Some(coef) => coef,
            None => {
                warn!("broyden: falling back to simple mixing for this iteration");

                simple_step(self.beta, precond, inp, out)?;

                return Ok(MixingStep {
                    residual_norm,
                    fell_back: true,
                    history_len,
                });
            }
        };

        debug!("broyden coefficients: {:?}", coef);

        simple_step(self.beta, precond, inp, out)?;

        for (j, g) in coef.iter().enumerate() {
            for (x, u) in multizip((inp.iter_mut(), self.pairs[j].u.iter())) {
                *x -= g * u;
            }
        }

        Ok(MixingStep {
            residual_norm,
            fell_back: false,
            history_len,
        })
    }

    fn reset(&mut self) {
        self.pairs.clear();
        self.last = None;
    }

    fn history_len(&self) -> usize {
        self.pairs.len()
    }
}
