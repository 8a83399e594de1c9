//! Ordinary least squares on dense designs.
//!
//! Every estimator that adjusts by regression goes through [`ols_fit`]. The
//! design is checked for rank deficiency before solving: collinear regressors
//! are a [`Error::Computation`], never silently dropped.

use nalgebra::{DMatrix, DVector};
use ks_core::{Error, Result};

/// Relative singular-value cutoff below which a design is treated as rank-deficient.
const RANK_TOL: f64 = 1e-10;

/// Dense design matrix built column by column.
#[derive(Debug, Clone)]
pub struct Design {
    n: usize,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Design {
    /// Empty design for `n` observations.
    pub fn new(n: usize) -> Self {
        Self { n, names: Vec::new(), columns: Vec::new() }
    }

    /// Design for `n` observations starting with an intercept column.
    pub fn with_intercept(n: usize) -> Self {
        let mut d = Self::new(n);
        d.names.push("intercept".to_string());
        d.columns.push(vec![1.0; n]);
        d
    }

    /// Append a named regressor. Its length must match the design.
    pub fn push(&mut self, name: impl Into<String>, values: &[f64]) -> Result<&mut Self> {
        let name = name.into();
        if values.len() != self.n {
            return Err(Error::Validation(format!(
                "regressor '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.n
            )));
        }
        self.names.push(name);
        self.columns.push(values.to_vec());
        Ok(self)
    }

    /// Append the elementwise product of two equal-length columns.
    pub fn push_interaction(&mut self, name: impl Into<String>, a: &[f64], b: &[f64]) -> Result<&mut Self> {
        if a.len() != b.len() {
            return Err(Error::Validation("interaction operands differ in length".into()));
        }
        let prod: Vec<f64> = a.iter().zip(b).map(|(x, y)| x * y).collect();
        self.push(name, &prod)
    }

    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.n
    }

    /// Number of regressors (including the intercept, if any).
    pub fn n_regressors(&self) -> usize {
        self.columns.len()
    }

    /// Regressor names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column `j`.
    pub fn column(&self, j: usize) -> &[f64] {
        &self.columns[j]
    }

    /// Materialize as an `n × k` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n, self.columns.len(), |i, j| self.columns[j][i])
    }
}

/// Result of a least-squares fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Regressor names, aligned with `coefficients`.
    pub names: Vec<String>,
    /// Coefficient estimates.
    pub coefficients: Vec<f64>,
    /// Homoskedastic standard errors.
    pub se: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual degrees of freedom `n - k`.
    pub dof: usize,
    /// Number of observations.
    pub n_obs: usize,
}

impl OlsFit {
    /// Index of a regressor by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Fail with [`Error::Computation`] if `x` has (numerically) dependent columns.
pub(crate) fn check_full_rank(x: &DMatrix<f64>, what: &str) -> Result<()> {
    let (n, k) = x.shape();
    if k == 0 {
        return Err(Error::Validation(format!("{what}: design has no columns")));
    }
    if n <= k {
        return Err(Error::Computation(format!(
            "{what}: {n} observations cannot identify {k} coefficients"
        )));
    }
    let sv = x.clone().svd(false, false).singular_values;
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    if !(max > 0.0) || min <= max * RANK_TOL {
        return Err(Error::Computation(format!(
            "{what}: design matrix is rank-deficient (collinear regressors; \
             singular values min={min:.3e}, max={max:.3e})"
        )));
    }
    Ok(())
}

/// Closed-form OLS.
///
/// Solves the normal equations `(X^T X) beta = X^T y` and reports
/// `se_j = sqrt(sigma^2 [(X^T X)^{-1}]_jj)` with `sigma^2 = RSS / (n - k)`.
pub fn ols_fit(design: &Design, y: &[f64]) -> Result<OlsFit> {
    let n = design.n_obs();
    if y.len() != n {
        return Err(Error::Validation(format!("y has {} rows, design has {}", y.len(), n)));
    }
    let x = design.to_matrix();
    check_full_rank(&x, "OLS")?;
    let k = x.ncols();

    let y_vec = DVector::from_column_slice(y);
    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &y_vec;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| Error::Computation("OLS solve failed (singular XtX)".to_string()))?;
    let beta = &xtx_inv * &xty;

    let resid = &y_vec - &x * &beta;
    let rss: f64 = resid.iter().map(|r| r * r).sum();
    let dof = n - k;
    let sigma2 = rss / dof as f64;
    let se: Vec<f64> = (0..k).map(|j| (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt()).collect();

    Ok(OlsFit {
        names: design.names().to_vec(),
        coefficients: beta.iter().copied().collect(),
        se,
        rss,
        dof,
        n_obs: n,
    })
}

/// Partial F-statistic for `q` restrictions from restricted and unrestricted RSS.
pub fn partial_f(rss_restricted: f64, rss_unrestricted: f64, q: usize, dof_unrestricted: usize) -> Result<f64> {
    if q == 0 || dof_unrestricted == 0 {
        return Err(Error::Validation("partial F needs q > 0 and positive residual dof".into()));
    }
    if !(rss_unrestricted > 0.0) {
        return Err(Error::Computation(
            "partial F undefined: unrestricted model fits the data exactly".into(),
        ));
    }
    Ok(((rss_restricted - rss_unrestricted) / q as f64) / (rss_unrestricted / dof_unrestricted as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_exact_line() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.5 + 2.0 * v).collect();
        let mut d = Design::with_intercept(20);
        d.push("x", &x).unwrap();
        let fit = ols_fit(&d, &y).unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 1e-9);
        assert_eq!(fit.dof, 18);
        assert_eq!(fit.index_of("x"), Some(1));
    }

    #[test]
    fn test_se_matches_closed_form_simple_regression() {
        // se(slope) = sqrt(sigma^2 / Sxx)
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [1.1, 1.9, 3.2, 3.8, 5.3, 5.9];
        let mut d = Design::with_intercept(6);
        d.push("x", &x).unwrap();
        let fit = ols_fit(&d, &y).unwrap();
        let xm = x.iter().sum::<f64>() / 6.0;
        let sxx: f64 = x.iter().map(|v| (v - xm).powi(2)).sum();
        let sigma2 = fit.rss / 4.0;
        assert_abs_diff_eq!(fit.se[1], (sigma2 / sxx).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_design_is_computation_error() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let x2: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        let y: Vec<f64> = x.iter().map(|v| v + 1.0).collect();
        let mut d = Design::with_intercept(10);
        d.push("x", &x).unwrap().push("x2", &x2).unwrap();
        assert!(matches!(ols_fit(&d, &y), Err(Error::Computation(_))));
    }

    #[test]
    fn test_too_few_rows_and_length_mismatch() {
        let mut d = Design::with_intercept(2);
        d.push("x", &[1.0, 2.0]).unwrap();
        assert!(matches!(ols_fit(&d, &[1.0, 2.0]), Err(Error::Computation(_))));
        assert!(d.push("bad", &[1.0]).is_err());
        assert!(ols_fit(&d, &[1.0]).is_err());
    }

    #[test]
    fn test_interaction_column() {
        let mut d = Design::new(3);
        d.push_interaction("ab", &[1.0, 0.0, 1.0], &[1.0, 1.0, 0.0]).unwrap();
        assert_eq!(d.column(0), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_partial_f() {
        assert_abs_diff_eq!(partial_f(20.0, 10.0, 1, 50).unwrap(), 50.0, epsilon = 1e-12);
        assert!(partial_f(1.0, 0.0, 1, 10).is_err());
    }
}
