//! Logistic regression by Newton–Raphson (IRLS), used for propensity scores.

use nalgebra::{DMatrix, DVector};
use ks_core::{Error, Result};
use ks_prob::math::{bernoulli_logit_nll, sigmoid};

use crate::regression::{Design, check_full_rank};

const MAX_ITER: usize = 100;
/// Convergence tolerance on the change of the linear predictor.
const STEP_TOL: f64 = 1e-9;
const MAX_HALVINGS: usize = 30;
/// Linear predictors beyond this magnitude put a fitted probability within
/// ~1e-13 of 0 or 1: (quasi-)complete separation.
const ETA_BOUND: f64 = 30.0;

/// Fitted logistic model.
#[derive(Debug, Clone)]
pub struct LogisticFit {
    /// Coefficients aligned with the design columns.
    pub coefficients: Vec<f64>,
    /// Fitted probabilities, one per observation.
    pub fitted: Vec<f64>,
    /// Newton iterations used.
    pub iterations: usize,
}

fn total_nll(x: &DMatrix<f64>, y: &[f64], beta: &DVector<f64>) -> f64 {
    let eta = x * beta;
    eta.iter().zip(y).map(|(&e, &yi)| bernoulli_logit_nll(e, yi)).sum()
}

/// Maximum-likelihood logistic regression of binary `y` on `design`.
///
/// Fails with [`Error::Computation`] on a rank-deficient design, perfect
/// separation, or non-convergence.
pub fn logistic_fit(design: &Design, y: &[f64]) -> Result<LogisticFit> {
    let n = design.n_obs();
    if y.len() != n {
        return Err(Error::Validation(format!("y has {} rows, design has {}", y.len(), n)));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(Error::Validation("logistic response must contain only 0/1 values".into()));
    }
    let x = design.to_matrix();
    check_full_rank(&x, "logistic")?;
    let k = x.ncols();

    let mut beta = DVector::zeros(k);
    let mut nll = total_nll(&x, y, &beta);

    for iter in 1..=MAX_ITER {
        let eta = &x * &beta;
        let mu: Vec<f64> = eta.iter().map(|&e| sigmoid(e)).collect();

        // gradient X^T (mu - y), Hessian X^T W X with W = mu (1 - mu)
        let mut grad = DVector::zeros(k);
        let mut hess = DMatrix::zeros(k, k);
        for i in 0..n {
            let r = mu[i] - y[i];
            let w = mu[i] * (1.0 - mu[i]);
            for a in 0..k {
                let xa = x[(i, a)];
                grad[a] += r * xa;
                for b in 0..=a {
                    hess[(a, b)] += w * xa * x[(i, b)];
                }
            }
        }
        for a in 0..k {
            for b in 0..a {
                hess[(b, a)] = hess[(a, b)];
            }
        }

        let step = hess.cholesky().map(|c| c.solve(&grad)).ok_or_else(|| {
            Error::Computation("logistic Hessian is not positive definite (separation?)".into())
        })?;

        // Step halving keeps the NLL monotone.
        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_HALVINGS {
            let cand = &beta - &step * t;
            let cand_nll = total_nll(&x, y, &cand);
            if cand_nll.is_finite() && cand_nll <= nll + 1e-12 {
                accepted = Some((cand, cand_nll));
                break;
            }
            t *= 0.5;
        }
        let Some((next, next_nll)) = accepted else {
            return Err(Error::Computation("logistic line search failed".into()));
        };

        // Stopping and separation are judged on X beta, not beta: covariate units cancel.
        let delta = (&x * (&next - &beta)).amax();
        beta = next;
        nll = next_nll;

        if (&x * &beta).amax() > ETA_BOUND {
            return Err(Error::Computation(
                "logistic coefficients diverge: treatment is (quasi-)perfectly separated by the covariates"
                    .into(),
            ));
        }
        if delta < STEP_TOL {
            let fitted = (&x * &beta).iter().map(|&e| sigmoid(e)).collect();
            return Ok(LogisticFit { coefficients: beta.iter().copied().collect(), fitted, iterations: iter });
        }
    }

    Err(Error::Computation(format!("logistic regression did not converge in {MAX_ITER} iterations")))
}
