use super::{SqlValue, TableStore};
use crate::error::{EtlError, Result};
use crate::schema::{validate_identifier, TableSchema};
use std::collections::{BTreeSet, HashMap};

/// In-process store used by `--dry-run` and tests
///
/// Tables survive `close`/`reconnect`, like a database outliving its
/// connections. Column count and primary-key uniqueness are enforced so
/// failing batches behave as they would in PostgreSQL.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
    closed: bool,
}

#[derive(Debug)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<Vec<SqlValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh "connection" to the same tables
    pub fn reconnect(&mut self) {
        self.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn rows(&self, table: &str) -> Option<&[Vec<SqlValue>]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(EtlError::store("connection is closed"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryStore {
    async fn replace_table(&mut self, schema: &TableSchema, table: &str) -> Result<()> {
        self.ensure_open()?;
        validate_identifier(table)?;

        self.tables.insert(table.to_string(), MemoryTable { schema: *schema, rows: Vec::new() });
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        schema: &TableSchema,
        table: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        self.ensure_open()?;
        validate_identifier(table)?;

        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| EtlError::store(format!("relation \"{table}\" does not exist")))?;

        if target.schema != *schema {
            return Err(EtlError::store(format!("column list does not match table \"{table}\"")));
        }

        // Validate the whole batch before touching the table
        let mut keys: Vec<SqlValue> = match schema.primary_key() {
            Some(pk) => target.rows.iter().map(|row| row[pk].clone()).collect(),
            None => Vec::new(),
        };

        for row in rows {
            if row.len() != schema.len() {
                return Err(EtlError::store(format!(
                    "expected {} values per row, got {}",
                    schema.len(),
                    row.len()
                )));
            }

            if let Some(pk) = schema.primary_key() {
                let key = &row[pk];
                if key.is_null() {
                    return Err(EtlError::store(format!(
                        "null value in column \"{}\" violates not-null constraint",
                        schema.columns[pk].name
                    )));
                }
                if keys.contains(key) {
                    return Err(EtlError::store(format!(
                        "duplicate key value violates unique constraint \"{table}_pkey\""
                    )));
                }
                keys.push(key.clone());
            }
        }

        target.rows.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn distinct_player_ids(&mut self, table: &str) -> Result<Vec<i32>> {
        self.ensure_open()?;
        validate_identifier(table)?;

        let target = self
            .tables
            .get(table)
            .ok_or_else(|| EtlError::store(format!("relation \"{table}\" does not exist")))?;
        let column = target
            .schema
            .position("player_id")
            .ok_or_else(|| {
                EtlError::store(format!("column \"player_id\" not found in \"{table}\""))
            })?;

        let ids: BTreeSet<i32> = target
            .rows
            .iter()
            .filter_map(|row| match row[column] {
                SqlValue::Int(id) => id,
                _ => None,
            })
            .collect();

        Ok(ids.into_iter().collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
