use std::error::Error;
use std::fmt;

use crate::analysis::{AnalysisError, SourceError};

/// Unified application error.
///
/// Every failure is fatal: the run reports it and exits non-zero.
#[derive(Debug)]
pub enum AppError {
    Config(String),
    DataUnavailable(String),
    SchemaMismatch(String),
    NumericalFailure(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::DataUnavailable(msg) => write!(f, "Data unavailable: {}", msg),
            AppError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            AppError::NumericalFailure(msg) => write!(f, "Numerical failure: {}", msg),
        }
    }
}

impl Error for AppError {}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable { .. } => AppError::DataUnavailable(err.to_string()),
            SourceError::SchemaMismatch { .. } | SourceError::InvalidValue { .. } => {
                AppError::SchemaMismatch(err.to_string())
            }
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Source(source) => source.into(),
            AnalysisError::UnknownColumn { .. } | AnalysisError::InvalidFormula { .. } => {
                AppError::Config(err.to_string())
            }
            AnalysisError::NoData { .. } | AnalysisError::MissingValue { .. } => {
                AppError::DataUnavailable(err.to_string())
            }
            AnalysisError::SingularMatrix { .. }
            | AnalysisError::NotConverged { .. }
            | AnalysisError::NonFinite { .. } => AppError::NumericalFailure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            AppError::from(AnalysisError::no_data("empty")),
            AppError::DataUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::singular("rank 2 < 3")),
            AppError::NumericalFailure(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::NotConverged { iterations: 100, delta: 1.0 }),
            AppError::NumericalFailure(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::from(SourceError::schema_mismatch("tx_atabove"))),
            AppError::SchemaMismatch(msg) if msg.contains("tx_atabove")
        ));
        assert!(matches!(
            AppError::from(AnalysisError::from(SourceError::unavailable("refused"))),
            AppError::DataUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(AnalysisError::unknown_column("gas_limit")),
            AppError::Config(_)
        ));
    }
}
