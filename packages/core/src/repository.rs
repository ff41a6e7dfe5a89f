//! Read-only access to the mined-transaction table.
//!
//! [`SqlObservationSource`] issues a single `SELECT` naming every column
//! the analysis reads. Integer columns are cast to `BIGINT` and numeric
//! ones to `DOUBLE PRECISION` so Postgres `DECIMAL`/`INTEGER` columns and
//! SQLite's loose typing all decode the same way through the `Any` driver.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx_core::any::AnyTypeInfoKind;
use sqlx::{AnyPool, Row, ValueRef};

use crate::analysis::{
    error::SourceError,
    provider::{ObservationSource, SourceResult},
    types::TransactionObservation,
};

#[derive(Debug, Clone, Copy)]
enum SqlKind {
    Integer,
    Real,
}

impl SqlKind {
    fn sql_type(self) -> &'static str {
        match self {
            SqlKind::Integer => "BIGINT",
            SqlKind::Real => "DOUBLE PRECISION",
        }
    }
}

/// Columns read from the source table.
const COLUMNS: [(&str, SqlKind); 10] = [
    ("block_posted", SqlKind::Integer),
    ("block_mined", SqlKind::Integer),
    ("gas_offered", SqlKind::Integer),
    ("gas_price", SqlKind::Integer),
    ("hashpower_accepting", SqlKind::Real),
    ("tx_atabove", SqlKind::Integer),
    ("tx_unchained", SqlKind::Integer),
    ("highgas2", SqlKind::Integer),
    ("chained", SqlKind::Integer),
    ("round_gp_10gwei", SqlKind::Real),
];

/// Observation source over any sqlx-supported database.
pub struct SqlObservationSource {
    pool: AnyPool,
    table: String,
}

impl SqlObservationSource {
    /// `table` must already be validated as a plain identifier.
    pub fn new(pool: AnyPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Release the connection once the table has been read.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn select_sql(&self) -> String {
        let list: Vec<String> = COLUMNS
            .iter()
            .map(|(name, kind)| format!("CAST({name} AS {}) AS {name}", kind.sql_type()))
            .collect();

        format!(
            "SELECT {} FROM {} ORDER BY block_posted, block_mined",
            list.join(", "),
            self.table
        )
    }
}

#[async_trait]
impl ObservationSource for SqlObservationSource {
    async fn fetch_observations(&self) -> SourceResult<Vec<TransactionObservation>> {
        let sql = self.select_sql();
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify_query_error)?;

        rows.iter().map(decode_row).collect()
    }

    fn source_name(&self) -> &str {
        &self.table
    }
}

fn decode_row(row: &AnyRow) -> SourceResult<TransactionObservation> {
    Ok(TransactionObservation {
        block_posted: integer(row, "block_posted")?,
        block_mined: integer(row, "block_mined")?,
        gas_offered: integer(row, "gas_offered")?,
        gas_price: integer(row, "gas_price")?,
        hashpower_accepting: real(row, "hashpower_accepting")?,
        tx_atabove: integer(row, "tx_atabove")?,
        tx_unchained: integer(row, "tx_unchained")?,
        highgas2: integer(row, "highgas2")?,
        chained: integer(row, "chained")?,
        round_gp_10gwei: real(row, "round_gp_10gwei")?,
    })
}

fn integer(row: &AnyRow, column: &str) -> SourceResult<Option<i64>> {
    if is_null(row, column)? {
        return Ok(None);
    }
    row.try_get::<i64, _>(column)
        .map(Some)
        .map_err(|err| decode_error(column, err))
}

fn real(row: &AnyRow, column: &str) -> SourceResult<Option<f64>> {
    if is_null(row, column)? {
        return Ok(None);
    }
    row.try_get::<f64, _>(column)
        .map(Some)
        .map_err(|err| decode_error(column, err))
}

/// The `Any` driver reports NULL cells through their type rather than
/// `ValueRef::is_null`, so `Option<T>` cannot be decoded directly.
fn is_null(row: &AnyRow, column: &str) -> SourceResult<bool> {
    let value = row
        .try_get_raw(column)
        .map_err(|err| decode_error(column, err))?;
    Ok(value.is_null() || matches!(value.type_info().kind(), AnyTypeInfoKind::Null))
}

fn decode_error(column: &str, err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::ColumnNotFound(name) => SourceError::schema_mismatch(name),
        other => SourceError::InvalidValue {
            column: column.to_string(),
            message: other.to_string(),
        },
    }
}

/// Separate "the table lacks a column" from "the database is unreachable".
fn classify_query_error(err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::ColumnNotFound(name) => SourceError::schema_mismatch(name),
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match missing_column(&message) {
                Some(column) => SourceError::schema_mismatch(column),
                None => SourceError::unavailable(message),
            }
        }
        other => SourceError::unavailable(other.to_string()),
    }
}

/// Column name from Postgres (`column "x" does not exist`) or SQLite
/// (`no such column: x`) error messages.
fn missing_column(message: &str) -> Option<String> {
    if let Some(rest) = message.strip_prefix("no such column: ") {
        return Some(rest.trim().to_string());
    }

    let rest = message.strip_prefix("column \"")?;
    let (column, tail) = rest.split_once('"')?;
    tail.contains("does not exist").then(|| {
        // Postgres may qualify the name, e.g. `minedtx2.tx_atabove`
        column.rsplit('.').next().unwrap_or(column).to_string()
    })
}
