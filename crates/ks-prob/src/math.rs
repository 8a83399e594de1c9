//! Small numerically-stable math utilities for logistic models.

/// Stable `log(1 + exp(x))`.
///
/// `log(1+exp(x)) = max(x,0) + log(1+exp(-|x|))`, so `exp` never overflows.
#[inline]
pub fn log1pexp(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    if x >= 0.0 { 1.0 / (1.0 + e) } else { e / (1.0 + e) }
}

/// Bernoulli negative log-likelihood of outcome `y ∈ {0,1}` at linear predictor `eta`.
///
/// `log(1 + exp(eta)) - y * eta`
#[inline]
pub fn bernoulli_logit_nll(eta: f64, y: f64) -> f64 {
    log1pexp(eta) - y * eta
}
