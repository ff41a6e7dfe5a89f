//! Poisson generalized linear model with log link, fitted by IRLS.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;
use tracing::{debug, info};

use crate::analysis::{
    error::AnalysisError,
    formula::{DesignMatrix, INTERCEPT},
};

/// Share of a column's weighted sum of squares that must remain after
/// projecting out the earlier columns. Below this the column is treated
/// as a linear combination of the others.
const COLLINEARITY_TOLERANCE: f64 = 1e-10;

/// One estimated coefficient with its Wald statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Result of a converged Poisson fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlmFit {
    pub response_name: String,
    pub coefficients: Vec<Coefficient>,
    /// Expected response per row, `exp(X * beta)`.
    #[serde(skip)]
    pub fitted_values: Vec<f64>,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub deviance: f64,
    pub pearson_chi2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub iterations: usize,
}

impl GlmFit {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    pub fn params(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.coefficients.len(),
            self.coefficients.iter().map(|c| c.estimate),
        )
    }

    /// Expected counts for new rows laid out like the training design.
    pub fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        (x * self.params()).map(f64::exp)
    }
}

/// Poisson family, canonical log link.
#[derive(Debug, Clone)]
pub struct PoissonGlm {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for PoissonGlm {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

impl PoissonGlm {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    /// Maximum-likelihood fit via iteratively reweighted least squares.
    ///
    /// Converges when the absolute change in deviance between iterations
    /// drops to `tolerance`.
    pub fn fit(&self, design: &DesignMatrix) -> Result<GlmFit, AnalysisError> {
        let x = &design.x;
        let y = &design.y;
        let n = design.nrows();
        let k = design.ncols();

        if n == 0 {
            return Err(AnalysisError::no_data("cannot fit a model without rows"));
        }
        if let Some(i) = y.iter().position(|v| *v < 0.0) {
            return Err(AnalysisError::invalid_formula(format!(
                "Poisson response {} is negative in row {}",
                design.response_name, i
            )));
        }

        let mean_y = y.mean();
        let mut mu = y.map(|v| (v + mean_y) / 2.0);
        let mut eta = mu.map(f64::ln);
        let mut deviance = poisson_deviance(y, &mu);
        let mut delta = f64::INFINITY;
        let mut iterations = 0;
        let mut beta = DVector::zeros(k);

        while iterations < self.max_iterations {
            iterations += 1;

            let z = DVector::from_fn(n, |i, _| eta[i] + (y[i] - mu[i]) / mu[i]);
            let (xtwx, xw) = weighted_cross_product(x, &mu);
            let cholesky = factorize(xtwx, &design.column_names)?;
            beta = cholesky.solve(&(xw.transpose() * &z));

            eta = x * &beta;
            mu = eta.map(f64::exp);
            if mu.iter().any(|m| !m.is_finite() || *m <= 0.0) {
                return Err(AnalysisError::non_finite(format!(
                    "fitted mean overflowed at iteration {}",
                    iterations
                )));
            }

            let next = poisson_deviance(y, &mu);
            delta = (next - deviance).abs();
            deviance = next;
            debug!(iteration = iterations, deviance, delta, "IRLS step");

            if delta <= self.tolerance {
                break;
            }
        }

        if delta.is_nan() || delta > self.tolerance {
            return Err(AnalysisError::NotConverged { iterations, delta });
        }

        let (xtwx, _) = weighted_cross_product(x, &mu);
        let covariance = factorize(xtwx, &design.column_names)?.inverse();

        let coefficients = wald_table(&design.column_names, &beta, &covariance)?;

        let log_likelihood: f64 = y
            .iter()
            .zip(mu.iter())
            .map(|(yi, mi)| yi * mi.ln() - mi - ln_gamma(yi + 1.0))
            .sum();
        let pearson_chi2: f64 = y
            .iter()
            .zip(mu.iter())
            .map(|(yi, mi)| (yi - mi).powi(2) / mi)
            .sum();
        let has_intercept = design.column_names.iter().any(|c| c == INTERCEPT);

        info!(iterations, deviance, "Poisson GLM converged");

        Ok(GlmFit {
            response_name: design.response_name.clone(),
            coefficients,
            fitted_values: mu.iter().copied().collect(),
            nobs: n,
            df_model: k - usize::from(has_intercept),
            df_resid: n.saturating_sub(k),
            deviance,
            pearson_chi2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * k as f64,
            iterations,
        })
    }
}

/// `XᵀWX` together with `WX`, where `W = diag(weights)`.
fn weighted_cross_product(x: &DMatrix<f64>, weights: &DVector<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    let mut xw = x.clone();
    for (i, mut row) in xw.row_iter_mut().enumerate() {
        row *= weights[i];
    }
    (x.transpose() * &xw, xw)
}

/// Cholesky factor of `XᵀWX`, rejecting rank-deficient designs.
fn factorize(xtwx: DMatrix<f64>, names: &[String]) -> Result<Cholesky<f64, Dyn>, AnalysisError> {
    let diagonal = xtwx.diagonal();
    if let Some(j) = diagonal.iter().position(|d| d.is_nan() || *d <= 0.0) {
        return Err(AnalysisError::singular(format!(
            "column {} carries no information",
            names.get(j).map(String::as_str).unwrap_or("?")
        )));
    }

    let cholesky = xtwx
        .cholesky()
        .ok_or_else(|| AnalysisError::singular("XᵀWX is not positive definite"))?;

    // pivot² / diag is the part of column j not explained by columns < j
    let pivots = cholesky.l_dirty().diagonal();
    for (j, (pivot, total)) in pivots.iter().zip(diagonal.iter()).enumerate() {
        let remaining = pivot * pivot / total;
        if remaining.is_nan() || remaining <= COLLINEARITY_TOLERANCE {
            return Err(AnalysisError::singular(format!(
                "column {} is collinear with earlier columns (residual share {:e})",
                names.get(j).map(String::as_str).unwrap_or("?"),
                remaining
            )));
        }
    }

    Ok(cholesky)
}

fn wald_table(
    names: &[String],
    beta: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<Vec<Coefficient>, AnalysisError> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| AnalysisError::non_finite(e.to_string()))?;
    let critical = normal.inverse_cdf(0.975);

    names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let std_error = covariance[(j, j)].sqrt();
            if !estimate.is_finite() || !std_error.is_finite() {
                return Err(AnalysisError::non_finite(format!("coefficient {}", name)));
            }
            let z = estimate / std_error;
            Ok(Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                z,
                p_value: 2.0 * (1.0 - normal.cdf(z.abs())),
                ci_lower: estimate - critical * std_error,
                ci_upper: estimate + critical * std_error,
            })
        })
        .collect()
}

/// `2 * Σ [y ln(y/μ) - (y - μ)]`, with `0 ln 0 = 0`.
pub fn poisson_deviance(y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    2.0 * y
        .iter()
        .zip(mu.iter())
        .map(|(yi, mi)| {
            let log_term = if *yi > 0.0 { yi * (yi / mi).ln() } else { 0.0 };
            log_term - (yi - mi)
        })
        .sum::<f64>()
}
