//! Error types for the confirmation-time analysis

use thiserror::Error;

/// Errors that can occur while building features or fitting the model
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No usable observations: {reason}")]
    NoData { reason: String },

    #[error("Unknown column in model formula: {name}")]
    UnknownColumn { name: String },

    #[error("Invalid model formula: {message}")]
    InvalidFormula { message: String },

    #[error("Missing value for {column} in row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Singular design matrix: {message}")]
    SingularMatrix { message: String },

    #[error("IRLS did not converge after {iterations} iterations (last deviance change {delta:e})")]
    NotConverged { iterations: usize, delta: f64 },

    #[error("Non-finite value encountered: {operation}")]
    NonFinite { operation: String },

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors from observation sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Data source unavailable: {message}")]
    Unavailable { message: String },

    #[error("Expected column is missing from source table: {column}")]
    SchemaMismatch { column: String },

    #[error("Invalid value in column {column}: {message}")]
    InvalidValue { column: String, message: String },
}

impl AnalysisError {
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::NoData { reason: reason.into() }
    }

    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::UnknownColumn { name: name.into() }
    }

    pub fn invalid_formula(message: impl Into<String>) -> Self {
        Self::InvalidFormula { message: message.into() }
    }

    pub fn singular(message: impl Into<String>) -> Self {
        Self::SingularMatrix { message: message.into() }
    }

    pub fn non_finite(operation: impl Into<String>) -> Self {
        Self::NonFinite { operation: operation.into() }
    }

    /// `true` for failures of the numerical fit itself.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix { .. } | Self::NotConverged { .. } | Self::NonFinite { .. }
        )
    }
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn schema_mismatch(column: impl Into<String>) -> Self {
        Self::SchemaMismatch { column: column.into() }
    }
}
