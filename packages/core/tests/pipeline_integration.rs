//! Integration tests for the full read → clean → fit → report pipeline.
//!
//! Each test seeds a SQLite `minedtx2` table shaped like the production
//! Postgres one (including columns the analysis never reads) and drives
//! the pipeline through the same `Any` driver used in production.
//! No live database is needed.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use sqlx::AnyPool;

use eth_gas_model::{
    analysis::{GasModelEngine, ModelConfig, ObservationSource, SourceError},
    config::{Config, DatabaseConfig},
    db,
    error::AppError,
    pipeline,
    repository::SqlObservationSource,
};

// ---- Helpers ----------------------------------------------------------------

const CREATE_MINEDTX2: &str = "CREATE TABLE minedtx2 (
    id INTEGER PRIMARY KEY,
    \"index\" VARCHAR(75),
    block_mined INTEGER,
    block_posted INTEGER,
    expectedTime DECIMAL(10, 4),
    highgas2 INTEGER,
    from_address VARCHAR(60),
    gas_offered INTEGER,
    gas_price BIGINT,
    hashpower_accepting INTEGER,
    round_gp_10gwei INTEGER,
    tx_atabove INTEGER,
    tx_unchained INTEGER,
    chained INTEGER
)";

/// One seeded row; `None` becomes SQL `NULL`.
#[derive(Clone)]
struct SeedRow {
    block_posted: Option<i64>,
    block_mined: Option<i64>,
    gas_offered: Option<i64>,
    gas_price: Option<i64>,
    hashpower_accepting: Option<i64>,
    tx_atabove: Option<i64>,
    tx_unchained: Option<i64>,
    highgas2: Option<i64>,
    chained: Option<i64>,
}

fn sql_value(value: Option<i64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

/// Rows whose delay grows with hashpower; every 13th row is chained and a
/// handful have zero or negative delays.
fn simulated_rows(count: usize, seed: u64) -> Vec<SeedRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let hpa: i64 = rng.gen_range(0..=100);
            let lambda = (0.3 + 0.012 * hpa as f64).exp();
            let delay = Poisson::new(lambda).unwrap().sample(&mut rng) as i64;
            let posted = 4_500_000 + i as i64;
            let delay = if i % 41 == 0 { -1 } else { delay };
            SeedRow {
                block_posted: Some(posted),
                block_mined: Some(posted + delay),
                gas_offered: Some(rng.gen_range(21_000..300_000)),
                gas_price: Some(rng.gen_range(1_000_000_000..40_000_000_000)),
                hashpower_accepting: Some(hpa),
                tx_atabove: Some(rng.gen_range(0..400)),
                tx_unchained: Some(rng.gen_range(0..8)),
                highgas2: Some(rng.gen_range(0..2)),
                chained: Some(i64::from(i % 13 == 0)),
            }
        })
        .collect()
}

async fn seed(pool: &AnyPool, create: &str, rows: &[SeedRow]) {
    sqlx::query(create).execute(pool).await.unwrap();

    for (i, row) in rows.iter().enumerate() {
        let sql = format!(
            "INSERT INTO minedtx2 (id, \"index\", block_posted, block_mined, expectedTime, gas_offered,
                gas_price, hashpower_accepting, tx_atabove, tx_unchained, highgas2, chained, from_address)
             VALUES ({}, '0x{:064x}', {}, {}, 1.5, {}, {}, {}, {}, {}, {}, {}, '0xabc')",
            i + 1,
            i,
            sql_value(row.block_posted),
            sql_value(row.block_mined),
            sql_value(row.gas_offered),
            sql_value(row.gas_price),
            sql_value(row.hashpower_accepting),
            sql_value(row.tx_atabove),
            sql_value(row.tx_unchained),
            sql_value(row.highgas2),
            sql_value(row.chained),
        );
        sqlx::query(&sql).execute(pool).await.unwrap();
    }
}

/// Fresh SQLite file under the temp dir; removed on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "eth_gas_model_{}_{}.db",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        Self { path }
    }

    fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.display())
    }

    fn config(&self) -> Config {
        Config {
            database: DatabaseConfig::Url(self.url()),
            table: "minedtx2".to_string(),
            model: ModelConfig::default(),
            preview_rows: 3,
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn seeded_db(name: &str, create: &str, rows: &[SeedRow]) -> TempDb {
    let db_file = TempDb::new(name);
    let pool = db::create_pool(&db_file.url()).await.unwrap();
    seed(&pool, create, rows).await;
    pool.close().await;
    db_file
}

// ---- Tests ------------------------------------------------------------------

#[tokio::test]
async fn pipeline_fits_model_over_sqlite_snapshot() {
    let rows = simulated_rows(1_200, 17);
    let db_file = seeded_db("fit", CREATE_MINEDTX2, &rows).await;

    let report = pipeline::run(&db_file.config()).await.unwrap();

    let d = &report.diagnostics;
    assert_eq!(d.total_rows, 1_200);
    assert_eq!(d.pre_chained, 1_200);
    assert_eq!(d.post_chained, 1_200 - rows.iter().filter(|r| r.chained == Some(1)).count());
    // every 41st row was posted after it was mined
    assert_eq!(d.negative_confirm_time, 30);
    assert_eq!(report.results.len(), d.cleaned_rows);
    assert_eq!(d.category_counts.iter().sum::<usize>(), d.cleaned_rows);

    for result in &report.results {
        assert!(result.confirm_time > 0);
        assert!(result.predict > 0.0);
        assert!(result.tx_atabove.unwrap() > 0);
        // backfilled from gas_price since the column is NULL upstream
        assert!(result.round_gp_10gwei.is_some());
    }

    let hpa = report.model.coefficient("hashpower_accepting").unwrap();
    assert!(hpa.estimate > 0.0);
    assert!(hpa.p_value < 0.001);
    assert_eq!(report.model.coefficients.len(), 4);

    let text = report.to_string();
    assert!(text.contains("Generalized Linear Model Regression Results"));
    assert!(text.contains(&format!("[{} rows x 7 columns]", d.cleaned_rows)));
}

#[tokio::test]
async fn missing_column_is_a_schema_mismatch() {
    let create = CREATE_MINEDTX2.replace("    tx_atabove INTEGER,\n", "");
    let db_file = TempDb::new("schema");
    let pool = db::create_pool(&db_file.url()).await.unwrap();
    sqlx::query(&create).execute(&pool).await.unwrap();
    pool.close().await;

    let err = pipeline::run(&db_file.config()).await.unwrap_err();
    assert!(
        matches!(err, AppError::SchemaMismatch(ref msg) if msg.contains("tx_atabove")),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn missing_table_is_data_unavailable() {
    let db_file = TempDb::new("no_table");
    let pool = db::create_pool(&db_file.url()).await.unwrap();
    sqlx::query("CREATE TABLE unrelated (id INTEGER)").execute(&pool).await.unwrap();
    pool.close().await;

    let err = pipeline::run(&db_file.config()).await.unwrap_err();
    assert!(matches!(err, AppError::DataUnavailable(_)), "{:?}", err);
}

#[tokio::test]
async fn empty_table_is_data_unavailable() {
    let db_file = seeded_db("empty", CREATE_MINEDTX2, &[]).await;

    let err = pipeline::run(&db_file.config()).await.unwrap_err();
    assert!(matches!(err, AppError::DataUnavailable(_)), "{:?}", err);
}

#[tokio::test]
async fn invalid_formula_fails_before_connecting() {
    let mut config = TempDb::new("never_created").config();
    config.database = DatabaseConfig::Url("postgres://nobody@127.0.0.1:1/none".to_string());
    config.model.formula = "confirmTime ~ gas_limit".to_string();

    let err = pipeline::run(&config).await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "{:?}", err);
}

#[tokio::test]
async fn source_decodes_nulls_and_casts_numerics() {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    let rows = vec![
        SeedRow {
            block_posted: Some(100),
            block_mined: Some(105),
            gas_offered: Some(21_000),
            gas_price: Some(20_000_000_000),
            hashpower_accepting: Some(40),
            tx_atabove: Some(3),
            tx_unchained: None,
            highgas2: Some(0),
            chained: Some(0),
        },
        SeedRow {
            block_posted: Some(100),
            block_mined: None,
            gas_offered: None,
            gas_price: None,
            hashpower_accepting: None,
            tx_atabove: None,
            tx_unchained: None,
            highgas2: None,
            chained: None,
        },
    ];
    seed(&pool, CREATE_MINEDTX2, &rows).await;

    let source = SqlObservationSource::new(pool, "minedtx2");
    let observations = source.fetch_observations().await.unwrap();

    assert_eq!(observations.len(), 2);
    let first = &observations[0];
    assert_eq!(first.block_posted, Some(100));
    assert_eq!(first.block_mined, Some(105));
    assert_eq!(first.hashpower_accepting, Some(40.0));
    assert_eq!(first.tx_unchained, None);
    assert_eq!(first.round_gp_10gwei, None);

    let second = &observations[1];
    assert_eq!(second.block_mined, None);
    assert_eq!(second.hashpower_accepting, None);
    assert_eq!(second.raw_confirm_time(), None);

    // only the first row survives cleaning, and one row cannot identify
    // four coefficients
    let err = GasModelEngine::new(&ModelConfig::default())
        .unwrap()
        .analyze(&observations)
        .unwrap_err();
    assert!(err.is_numerical(), "{:?}", err);

    source.close().await;
}

#[tokio::test]
async fn source_reports_missing_table_as_unavailable() {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    let source = SqlObservationSource::new(pool, "minedtx2");

    let err = source.fetch_observations().await.unwrap_err();
    assert!(matches!(err, SourceError::Unavailable { .. }), "{:?}", err);
}
