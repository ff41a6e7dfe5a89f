//! One end-to-end run: read the snapshot, fit, build the report.

use tracing::info;

use crate::analysis::{GasModelEngine, ObservationSource};
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::report::Report;
use crate::repository::SqlObservationSource;

/// Run the whole pipeline against the configured database.
///
/// The formula is validated before connecting, and the connection is
/// closed as soon as the table has been read.
pub async fn run(config: &Config) -> Result<Report, AppError> {
    let engine = GasModelEngine::new(&config.model)?;

    let url = config.database.connection_url().map_err(AppError::Config)?;
    let pool = db::create_pool(&url)
        .await
        .map_err(|err| AppError::DataUnavailable(err.to_string()))?;

    let source = SqlObservationSource::new(pool, config.table.clone());
    let loaded = GasModelEngine::load(&source).await;
    source.close().await;
    let observations = loaded?;

    info!(table = %config.table, "Source connection closed");

    let run = engine.analyze(&observations)?;
    Ok(Report::new(source.source_name(), run, config.preview_rows))
}
