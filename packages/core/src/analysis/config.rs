//! Configuration for the confirmation-time model

use serde::{Deserialize, Serialize};

use crate::analysis::formula::DEFAULT_FORMULA;

/// Configuration for the analysis engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Additive model formula, e.g. `confirmTime ~ hashpower_accepting + highgas2`.
    pub formula: String,
    pub fit: FitConfig,
}

/// IRLS stopping rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub max_iterations: usize,
    /// Absolute change in deviance that counts as converged.
    pub tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            formula: DEFAULT_FORMULA.to_string(),
            fit: FitConfig::default(),
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}
