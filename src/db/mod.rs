// Database module - SQLite connection and sales record store

pub mod models;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::SalesError;
pub use models::{SaleKind, SaleRecord, TradeIn};

/// Maximum number of records committed in one write batch
pub const BATCH_SIZE: usize = 499;

/// How long a batch writer waits for a competing writer's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SALE_COLUMNS: &str = "id, product_type, model, invoice_number, client, seller, branch, \
     sale_date, gross_sale_usd, gross_cost_usd, net_cost_usd, exchange_rate, \
     total_incentives_usd, incentives, trade_in_was_traded, trade_in_model, trade_in_value_usd";

/// Get the default database path (~/.salesboard/sales.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let data_dir = PathBuf::from(home).join(".salesboard");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir).context("Failed to create .salesboard directory")?;

    Ok(data_dir.join("sales.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set busy timeout")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Creates the database file when missing; safe to run on every start.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    debug!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;

    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;

    Ok(())
}

fn storage_failure(action: &str, err: impl std::fmt::Display) -> anyhow::Error {
    SalesError::StorageFailure(format!("{}: {}", action, err)).into()
}

/// Insert one sale, returns its id
pub fn insert_sale(conn: &Connection, sale: &SaleRecord) -> Result<i64> {
    let incentives = serde_json::to_string(&sale.incentives)
        .map_err(|e| storage_failure("failed to encode incentives", e))?;

    conn.execute(
        "INSERT INTO sales (
            product_type, model, invoice_number, client, seller, branch,
            sale_date, gross_sale_usd, gross_cost_usd, net_cost_usd, exchange_rate,
            total_incentives_usd, incentives, trade_in_was_traded, trade_in_model,
            trade_in_value_usd
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            sale.product_type,
            sale.model,
            sale.invoice_number,
            sale.client,
            sale.seller,
            sale.branch,
            sale.sale_date,
            sale.gross_sale_usd.to_string(),
            sale.gross_cost_usd.to_string(),
            sale.net_cost_usd.map(|d| d.to_string()),
            sale.exchange_rate.to_string(),
            sale.total_incentives_usd.to_string(),
            incentives,
            sale.trade_in.was_traded,
            sale.trade_in.model,
            sale.trade_in.trade_in_value_usd.to_string(),
        ],
    )
    .map_err(|e| storage_failure("failed to write sale", e))?;

    Ok(conn.last_insert_rowid())
}

fn sale_from_row(row: &rusqlite::Row) -> Result<SaleRecord, rusqlite::Error> {
    let incentives_json: String = row.get(13)?;
    let incentives: BTreeMap<String, Decimal> = serde_json::from_str(&incentives_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e)))?;

    let record = SaleRecord {
        id: Some(row.get(0)?),
        product_type: row.get(1)?,
        model: row.get(2)?,
        invoice_number: row.get(3)?,
        client: row.get(4)?,
        seller: row.get(5)?,
        branch: row.get(6)?,
        sale_date: row.get(7)?,
        gross_sale_usd: get_decimal_value(row, 8)?,
        gross_cost_usd: get_decimal_value(row, 9)?,
        net_cost_usd: get_optional_decimal_value(row, 10)?,
        exchange_rate: get_decimal_value(row, 11)?,
        total_incentives_usd: get_decimal_value(row, 12)?,
        incentives,
        trade_in: TradeIn {
            was_traded: row.get(14)?,
            model: row.get(15)?,
            trade_in_value_usd: get_decimal_value(row, 16)?,
        },
        kind: SaleKind::Unpriced,
    };
    Ok(record.classify())
}

/// Load the whole collection, newest sale first
pub fn load_sales(conn: &Connection) -> Result<Vec<SaleRecord>> {
    let sql = format!(
        "SELECT {} FROM sales ORDER BY sale_date DESC, id DESC",
        SALE_COLUMNS
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| storage_failure("failed to read sales", e))?;

    let sales = stmt
        .query_map([], sale_from_row)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| storage_failure("failed to read sales", e))?;

    debug!("Loaded {} sales", sales.len());
    Ok(sales)
}

pub fn count_sales(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
        .map_err(|e| storage_failure("failed to count sales", e))?;
    Ok(count as usize)
}

/// Delete every stored sale, returns the number removed
pub fn delete_all_sales(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM sales", [])
        .map_err(|e| storage_failure("failed to clear sales", e))
}

/// Sizes of the write batches for `total` records
pub fn plan_batches(total: usize) -> Vec<usize> {
    (0..total)
        .step_by(BATCH_SIZE)
        .map(|start| BATCH_SIZE.min(total - start))
        .collect()
}

/// Outcome of a bulk replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    pub deleted: usize,
    /// Committed batch sizes, in input order
    pub batch_sizes: Vec<usize>,
}

impl ReplaceReport {
    pub fn written(&self) -> usize {
        self.batch_sizes.iter().sum()
    }
}

/// Write one batch on its own connection, inside one transaction
fn write_batch(db_path: &Path, batch: &[SaleRecord]) -> Result<usize> {
    let mut conn = open_db(Some(db_path.to_path_buf()))?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| storage_failure("failed to start batch", e))?;
    for sale in batch {
        insert_sale(&tx, sale)?;
    }
    tx.commit()
        .map_err(|e| storage_failure("failed to commit batch", e))?;
    Ok(batch.len())
}

/// Replace the stored collection with `records`.
///
/// Deletes everything first, then commits `BATCH_SIZE` chunks concurrently and
/// waits for all of them. Not atomic: a failure after the delete leaves the
/// store empty or partial.
pub async fn replace_all_sales(db_path: &Path, records: Vec<SaleRecord>) -> Result<ReplaceReport> {
    let deleted = {
        let conn = open_db(Some(db_path.to_path_buf()))?;
        delete_all_sales(&conn)?
    };
    info!("Cleared {} stored sales", deleted);

    let planned = plan_batches(records.len());
    let mut tasks = JoinSet::new();
    for (index, chunk) in records.chunks(BATCH_SIZE).enumerate() {
        let path = db_path.to_path_buf();
        let batch = chunk.to_vec();
        tasks.spawn_blocking(move || (index, write_batch(&path, &batch)));
    }

    let mut committed = vec![0usize; planned.len()];
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(written))) => {
                debug!("Batch {} committed {} sales", index + 1, written);
                committed[index] = written;
            }
            Ok((index, Err(e))) => {
                warn!("Batch {} failed: {:#}", index + 1, e);
                failures.push(format!("batch {}: {:#}", index + 1, e));
            }
            Err(e) => failures.push(format!("batch task aborted: {}", e)),
        }
    }

    if !failures.is_empty() {
        let done = committed.iter().filter(|n| **n > 0).count();
        return Err(SalesError::StorageFailure(format!(
            "import degraded: {} of {} batches committed after the store was cleared; \
             the store may be empty or partial, retry the whole import ({})",
            done,
            planned.len(),
            failures.join("; ")
        ))
        .into());
    }

    info!(
        "Stored {} sales in {} batches",
        records.len(),
        planned.len()
    );
    Ok(ReplaceReport {
        deleted,
        batch_sizes: committed,
    })
}

/// Incentive names registered at runtime, sorted
pub fn list_incentive_programs(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM incentive_programs ORDER BY name")
        .map_err(|e| storage_failure("failed to read incentive programs", e))?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
        .map_err(|e| storage_failure("failed to read incentive programs", e))?;
    Ok(names)
}

/// Returns true when the name was not stored yet
pub fn add_incentive_program(conn: &Connection, name: &str) -> Result<bool> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO incentive_programs (name) VALUES (?1)",
            params![name],
        )
        .map_err(|e| storage_failure("failed to store incentive program", e))?;
    Ok(changed > 0)
}

/// Helper to read Decimal from SQLite (handles both INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Decimal::from_str(s).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => {
            Decimal::try_from(f).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

/// Helper to read optional Decimal from SQLite
fn get_optional_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        _ => get_decimal_value(row, idx).map(Some),
    }
}
