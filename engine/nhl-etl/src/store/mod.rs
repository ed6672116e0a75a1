//! Destination store abstraction: table replacement and transactional bulk loads.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::Result;
use crate::schema::TableSchema;
use chrono::NaiveDate;
use tracing::{error, info};

/// A single bindable column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i32>),
    Real(Option<f32>),
    Text(Option<String>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Int(v) => v.is_none(),
            SqlValue::Real(v) => v.is_none(),
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::Date(v) => v.is_none(),
        }
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<i32>> for SqlValue {
    fn from(v: Option<i32>) -> Self {
        SqlValue::Int(v)
    }
}

// REAL columns are single precision.
impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(Some(v as f32))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(Some(v))
    }
}

/// A normalized record that maps onto one row of a fixed table
pub trait Record {
    const SCHEMA: TableSchema;

    /// Column values in `SCHEMA` order
    fn values(&self) -> Vec<SqlValue>;
}

/// Abstract destination for the ETL pipelines
#[async_trait::async_trait]
pub trait TableStore: Send {
    /// Drop `table` if present and recreate it with `schema`
    async fn replace_table(&mut self, schema: &TableSchema, table: &str) -> Result<()>;

    /// Insert all rows in one transaction; nothing lands if any row fails
    async fn bulk_insert(
        &mut self,
        schema: &TableSchema,
        table: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64>;

    /// Distinct, ascending `player_id` values stored in `table`
    async fn distinct_player_ids(&mut self, table: &str) -> Result<Vec<i32>>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<()>;
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows_fetched: usize,
    pub rows_inserted: u64,
}

/// Drop and recreate `table` for `R`. Failures are logged, not propagated.
pub async fn prepare_table<S, R>(store: &mut S, table: &str) -> bool
where
    S: TableStore + ?Sized,
    R: Record,
{
    match store.replace_table(&R::SCHEMA, table).await {
        Ok(()) => true,
        Err(e) => {
            error!("Unable to create {} table: {}", table, e);
            false
        }
    }
}

/// Bulk insert `records` into `table`, reporting zero rows if the batch failed
pub async fn load<S, R>(store: &mut S, table: &str, records: &[R]) -> u64
where
    S: TableStore + ?Sized,
    R: Record,
{
    let rows: Vec<Vec<SqlValue>> = records.iter().map(Record::values).collect();

    match store.bulk_insert(&R::SCHEMA, table, &rows).await {
        Ok(count) => {
            info!("{} rows inserted to {}", count, table);
            count
        }
        Err(e) => {
            error!("Error inserting into {}: {}", table, e);
            0
        }
    }
}

/// Replace `table` and load `records` into it
pub async fn replace_and_load<S, R>(store: &mut S, table: &str, records: &[R]) -> LoadReport
where
    S: TableStore + ?Sized,
    R: Record,
{
    let rows_inserted = if prepare_table::<S, R>(store, table).await {
        load(store, table, records).await
    } else {
        0
    };

    LoadReport { table: table.to_string(), rows_fetched: records.len(), rows_inserted }
}
