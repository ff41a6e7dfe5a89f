//! Observation Source Interface
//!
//! Abstracts the upstream table of mined transactions so the analysis
//! does not depend on a particular database.

use async_trait::async_trait;

use crate::analysis::{error::SourceError, types::TransactionObservation};

/// Read-only access to the mined-transaction table.
#[async_trait]
pub trait ObservationSource {
    /// Fetch every row of the table.
    async fn fetch_observations(&self) -> Result<Vec<TransactionObservation>, SourceError>;

    /// Name of this source for logging/debugging
    fn source_name(&self) -> &str;
}

/// Source backed by rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<TransactionObservation>,
}

impl InMemorySource {
    pub fn new(rows: Vec<TransactionObservation>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ObservationSource for InMemorySource {
    async fn fetch_observations(&self) -> Result<Vec<TransactionObservation>, SourceError> {
        Ok(self.rows.clone())
    }

    fn source_name(&self) -> &str {
        "in-memory"
    }
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;
