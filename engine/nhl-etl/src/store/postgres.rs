use super::{SqlValue, TableStore};
use crate::config::DatabaseConfig;
use crate::error::{EtlError, Result};
use crate::schema::{create_table_sql, drop_table_sql, validate_identifier, TableSchema};
use sqlx::query_builder::Separated;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, warn};

/// PostgreSQL store over a single dedicated connection
pub struct PgStore {
    conn: Option<PgConnection>,
}

impl PgStore {
    /// Open a fresh connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = config.connect_options()?;
        let conn = PgConnection::connect_with(&options).await.map_err(EtlError::Connect)?;

        debug!("Connected to database {}", config.name);
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(|| EtlError::store("connection is closed"))
    }
}

fn push_value(row: &mut Separated<'_, '_, Postgres, &'static str>, value: &SqlValue) {
    match value {
        SqlValue::Int(v) => row.push_bind(*v),
        SqlValue::Real(v) => row.push_bind(*v),
        SqlValue::Text(v) => row.push_bind(v.clone()),
        SqlValue::Bool(v) => row.push_bind(*v),
        SqlValue::Date(v) => row.push_bind(*v),
    };
}

async fn insert_chunks(
    conn: &mut PgConnection,
    schema: &TableSchema,
    table: &str,
    rows: &[Vec<SqlValue>],
) -> Result<u64> {
    let prefix = format!("INSERT INTO {} ({}) ", table, schema.column_list());
    let mut inserted = 0;

    for chunk in rows.chunks(schema.rows_per_statement()) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
        builder.push_values(chunk, |mut b, row| {
            for value in row {
                push_value(&mut b, value);
            }
        });

        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

#[async_trait::async_trait]
impl TableStore for PgStore {
    async fn replace_table(&mut self, schema: &TableSchema, table: &str) -> Result<()> {
        let drop_sql = drop_table_sql(table)?;
        let create_sql = create_table_sql(schema, table)?;

        let mut tx = self.conn()?.begin().await?;
        sqlx::query(&drop_sql).execute(&mut *tx).await?;
        sqlx::query(&create_sql).execute(&mut *tx).await?;
        tx.commit().await?;

        debug!("Recreated table {}", table);
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        schema: &TableSchema,
        table: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        validate_identifier(table)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.conn()?.begin().await?;
        match insert_chunks(&mut tx, schema, table, rows).await {
            Ok(inserted) => {
                tx.commit().await?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of {} failed: {}", table, rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn distinct_player_ids(&mut self, table: &str) -> Result<Vec<i32>> {
        validate_identifier(table)?;

        let sql = format!("SELECT DISTINCT player_id FROM {table} ORDER BY player_id");
        let ids: Vec<i32> = sqlx::query_scalar(&sql).fetch_all(self.conn()?).await?;
        Ok(ids)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("Closed database connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::schema::TEAM_SCHEMA;

    /// Needs a disposable PostgreSQL database:
    /// `NHL_ETL_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_round_trip_against_postgres() {
        let Ok(url) = std::env::var("NHL_ETL_TEST_DATABASE_URL") else {
            return;
        };
        let config = DatabaseConfig { url: Some(url), ..DatabaseConfig::default() };
        let mut store = PgStore::connect(&config).await.unwrap();

        let row = |id: i32| {
            let mut row = vec![SqlValue::from(id), SqlValue::from("Team")];
            row.extend((2..TEAM_SCHEMA.len()).map(|_| SqlValue::Text(None)));
            row[TEAM_SCHEMA.len() - 1] = SqlValue::from(true);
            row
        };

        store.replace_table(&TEAM_SCHEMA, "etl_test_team").await.unwrap();
        let inserted =
            store.bulk_insert(&TEAM_SCHEMA, "etl_test_team", &[row(1), row(2)]).await.unwrap();
        assert_eq!(inserted, 2);

        // Duplicate key: the whole batch is rolled back
        assert!(store.bulk_insert(&TEAM_SCHEMA, "etl_test_team", &[row(3), row(1)]).await.is_err());
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM etl_test_team")
            .fetch_one(store.conn().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 2);

        sqlx::query("DROP TABLE etl_test_team").execute(store.conn().unwrap()).await.unwrap();
        store.close().await.unwrap();
        assert!(store.conn().is_err());
    }
}
