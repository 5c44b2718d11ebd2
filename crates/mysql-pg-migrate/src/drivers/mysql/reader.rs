//! MySQL/MariaDB source reader implementation.
//!
//! Implements the `SourceReader` trait for reading schema metadata and
//! streaming row data from MySQL/MariaDB databases. Uses SQLx for
//! connection pooling and async query execution.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Row, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::schema::{Column, DefaultValue, ForeignKey, Index, Table};
use crate::core::traits::{Dialect, ReadOptions, SourceReader, TxnKind};
use crate::core::value::{Batch, SqlNullType, SqlValue};
use crate::error::{MigrateError, Result};
use crate::typemap::LogicalType;

use super::dialect::MysqlDialect;

/// Base delay for connect retries; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Channel depth between producer and consumer. Small on purpose: the
/// producer must block when the writer falls behind.
const READ_CHANNEL_DEPTH: usize = 2;

/// MySQL/MariaDB source reader.
pub struct MysqlReader {
    pool: MySqlPool,
    dialect: MysqlDialect,
    database: String,
}

impl MysqlReader {
    /// Create a new MySQL reader from configuration.
    ///
    /// Transient connection failures are retried up to `max_retries` times
    /// with exponential backoff. The session charset is verified to be
    /// Unicode; a latin1-class session would silently mangle text columns,
    /// so it is a fatal error here.
    pub async fn connect(
        config: &SourceConfig,
        max_conns: usize,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password)
            .charset("utf8mb4")
            .ssl_mode(MySqlSslMode::Preferred);

        let mut attempt = 0u32;
        let pool = loop {
            let pool_options = MySqlPoolOptions::new()
                .max_connections(max_conns as u32)
                .acquire_timeout(connect_timeout);
            match pool_options.connect_with(options.clone()).await {
                Ok(pool) => break pool,
                Err(e) if attempt < max_retries && is_transient(&e) => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        "MySQL connect attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(MigrateError::pool(e, "creating MySQL source pool")),
            }
        };

        // Round-trip test
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL source connection"))?;

        // The pipeline assumes Unicode text end to end.
        let row: MySqlRow = sqlx::query("SELECT @@session.character_set_connection AS cs")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "reading MySQL session charset"))?;
        let charset: String = row.get("cs");
        if !charset.to_lowercase().starts_with("utf8") {
            return Err(MigrateError::Config(format!(
                "MySQL session charset is '{}'; a Unicode (utf8/utf8mb4) session is required",
                charset
            )));
        }

        info!(
            "Connected to MySQL source: {}:{}/{} (charset {})",
            config.host, config.port, config.database, charset
        );

        Ok(Self {
            pool,
            dialect: MysqlDialect::new(),
            database: config.database.clone(),
        })
    }

    /// The source database (schema) name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Load columns for a table.
    async fn load_columns(&self, table: &mut Table) -> Result<()> {
        // CAST string columns to CHAR to handle collation differences where
        // information_schema may return VARBINARY instead of VARCHAR.
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(COLUMN_TYPE AS CHAR(1024)) AS COLUMN_TYPE,
                CAST(CASE
                    WHEN CHARACTER_MAXIMUM_LENGTH IS NULL THEN 0
                    WHEN CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1
                    ELSE CHARACTER_MAXIMUM_LENGTH
                END AS SIGNED) AS max_length,
                CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
                CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
                IF(IS_NULLABLE = 'YES', 1, 0) AS is_nullable,
                IF(EXTRA LIKE '%auto_increment%', 1, 0) AS is_identity,
                IF(EXTRA LIKE '%DEFAULT_GENERATED%', 1, 0) AS default_generated,
                CAST(COLUMN_DEFAULT AS CHAR(1024)) AS COLUMN_DEFAULT,
                CAST(COLUMN_COMMENT AS CHAR(1024)) AS COLUMN_COMMENT
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL columns"))?;

        for (ordinal, row) in rows.iter().enumerate() {
            let default_expr: Option<String> = row.get("COLUMN_DEFAULT");
            let default_generated: i32 = row.get("default_generated");

            let default = default_expr.map(|expr| {
                let lower = expr.to_lowercase();
                let is_function = default_generated == 1
                    || lower.starts_with("current_timestamp")
                    || lower.starts_with("now(");
                DefaultValue { expr, is_function }
            });

            table.columns.push(Column {
                name: row.get::<String, _>("COLUMN_NAME"),
                data_type: row.get::<String, _>("DATA_TYPE"),
                column_type: row.get::<String, _>("COLUMN_TYPE"),
                max_length: row.get::<i32, _>("max_length"),
                precision: row.get::<i32, _>("num_precision"),
                scale: row.get::<i32, _>("num_scale"),
                is_nullable: row.get::<i32, _>("is_nullable") == 1,
                is_identity: row.get::<i32, _>("is_identity") == 1,
                ordinal,
                default,
                comment: row.get::<String, _>("COLUMN_COMMENT"),
            });
        }

        Ok(())
    }

    /// Load primary key column names for a table.
    async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL primary key"))?;

        for row in rows {
            table.primary_key.push(row.get::<String, _>("COLUMN_NAME"));
        }

        Ok(())
    }

    async fn exec_raw(
        conn: &mut sqlx::pool::PoolConnection<sqlx::MySql>,
        sql: &str,
    ) -> Result<()> {
        sqlx::raw_sql(sqlx::AssertSqlSafe(sql))
            .execute(&mut **conn)
            .await?;
        Ok(())
    }

    async fn stream_rows(
        conn: &mut sqlx::pool::PoolConnection<sqlx::MySql>,
        sql: &str,
        opts: &ReadOptions,
        tx: &mpsc::Sender<Result<Batch>>,
    ) -> (u64, Option<MigrateError>) {
        let mut rows_read: u64 = 0;
        let mut stream_error: Option<MigrateError> = None;
        let mut stream = sqlx::query(sqlx::AssertSqlSafe(sql)).fetch(&mut **conn);
        let mut buffer: Vec<Vec<SqlValue<'static>>> = Vec::with_capacity(opts.batch_size);

        loop {
            match stream.try_next().await {
                Ok(Some(row)) => {
                    buffer.push(decode_row(&row, &opts.kinds));
                    rows_read += 1;

                    if buffer.len() >= opts.batch_size {
                        let batch = Batch::new(std::mem::replace(
                            &mut buffer,
                            Vec::with_capacity(opts.batch_size),
                        ));
                        if tx.send(Ok(batch)).await.is_err() {
                            // Consumer hung up (writer failed or
                            // cancellation); stop reading.
                            break;
                        }
                    }
                }
                Ok(None) => {
                    let batch = Batch::new(buffer).mark_final();
                    let _ = tx.send(Ok(batch)).await;
                    break;
                }
                Err(e) => {
                    stream_error = Some(e.into());
                    break;
                }
            }
        }

        (rows_read, stream_error)
    }

    async fn read_table_impl(
        pool: MySqlPool,
        dialect: MysqlDialect,
        opts: ReadOptions,
        tx: mpsc::Sender<Result<Batch>>,
    ) -> Result<()> {
        let col_list = opts
            .columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let table_ref = dialect.qualify(&opts.schema, &opts.table);

        let mut sql = format!("SELECT {} FROM {}", col_list, table_ref);
        if let Some(where_clause) = opts.where_clause.as_deref() {
            if !where_clause.is_empty() {
                sql.push_str(&format!(" WHERE ({})", where_clause));
            }
        }

        // One connection per scan: the snapshot must not hop connections.
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| MigrateError::pool(e, "acquiring MySQL scan connection"))?;

        if let Some(iso) = dialect.isolation_sql(TxnKind::SourceScan) {
            Self::exec_raw(&mut conn, iso).await?;
        }
        Self::exec_raw(&mut conn, dialect.begin_sql(TxnKind::SourceScan)).await?;

        let (rows_read, stream_error) =
            Self::stream_rows(&mut conn, &sql, &opts, &tx).await;

        // Read-only snapshot; close it before the connection returns to
        // the pool.
        Self::exec_raw(&mut conn, dialect.commit_sql()).await.ok();

        if let Some(e) = stream_error {
            return Err(e);
        }

        debug!(
            "{}.{}: streamed {} rows",
            opts.schema, opts.table, rows_read
        );
        Ok(())
    }
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL connection"))?;
        Ok(())
    }

    async fn extract_schema(&self, schema: &str) -> Result<Vec<Table>> {
        let query = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(COALESCE(TABLE_ROWS, 0) AS SIGNED) AS row_count,
                CAST(COALESCE(DATA_LENGTH, 0) AS SIGNED) AS data_length
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "extracting MySQL schema"))?;

        let mut tables = Vec::new();

        for row in rows {
            let mut table = Table {
                schema: schema.to_string(),
                name: row.get::<String, _>("TABLE_NAME"),
                columns: Vec::new(),
                primary_key: Vec::new(),
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
                row_count: row.get::<i64, _>("row_count"),
                data_length: row.get::<i64, _>("data_length"),
            };

            self.load_columns(&mut table).await?;
            self.load_primary_key(&mut table).await?;

            if table.columns.is_empty() {
                return Err(MigrateError::SchemaExtraction(format!(
                    "table {}.{} has no columns",
                    schema, table.name
                )));
            }

            tables.push(table);
        }

        info!(
            "Extracted {} tables from MySQL schema '{}'",
            tables.len(),
            schema
        );
        Ok(tables)
    }

    async fn load_indexes(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
                GROUP_CONCAT(CAST(COLUMN_NAME AS CHAR(255)) ORDER BY SEQ_IN_INDEX SEPARATOR ',') AS columns,
                IF(NON_UNIQUE = 0, 1, 0) AS is_unique
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            GROUP BY INDEX_NAME, NON_UNIQUE
            ORDER BY INDEX_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL indexes"))?;

        let mut indexes = Vec::new();
        for row in rows {
            let name: String = row.get("INDEX_NAME");
            // Functional index parts have NULL column names; such indexes
            // cannot be carried over.
            let Some(columns_str) = row.get::<Option<String>, _>("columns") else {
                warn!(
                    "skipping index {} on {}.{}: expression-based keys are not portable",
                    name, table.schema, table.name
                );
                continue;
            };
            let is_unique: i32 = row.get("is_unique");
            let is_primary = name == "PRIMARY";

            indexes.push(Index {
                name,
                columns: columns_str.split(',').map(|s| s.to_string()).collect(),
                is_unique: is_unique == 1,
                is_primary,
            });
        }

        // Primary key first, then name order.
        indexes.sort_by_key(|idx| (!idx.is_primary, idx.name.clone()));
        table.indexes = indexes;

        debug!(
            "Loaded {} indexes for {}.{}",
            table.indexes.len(),
            table.schema,
            table.name
        );
        Ok(())
    }

    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(rc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR(64)) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR(64)) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND rc.TABLE_NAME = kcu.TABLE_NAME
            WHERE rc.CONSTRAINT_SCHEMA = ? AND rc.TABLE_NAME = ?
            ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL foreign keys"))?;

        // Rows arrive ordered by (constraint, ordinal); fold into FKs while
        // preserving column order.
        let mut foreign_keys: Vec<ForeignKey> = Vec::new();
        for row in rows {
            let name: String = row.get("CONSTRAINT_NAME");
            let column: String = row.get("COLUMN_NAME");
            let ref_column: String = row.get("REFERENCED_COLUMN_NAME");

            match foreign_keys.last_mut() {
                Some(fk) if fk.name == name => {
                    fk.columns.push(column);
                    fk.ref_columns.push(ref_column);
                }
                _ => foreign_keys.push(ForeignKey {
                    name,
                    columns: vec![column],
                    ref_table: row.get("REFERENCED_TABLE_NAME"),
                    ref_columns: vec![ref_column],
                    on_delete: row.get("DELETE_RULE"),
                    on_update: row.get("UPDATE_RULE"),
                }),
            }
        }

        table.foreign_keys = foreign_keys;

        debug!(
            "Loaded {} foreign keys for {}.{}",
            table.foreign_keys.len(),
            table.schema,
            table.name
        );
        Ok(())
    }

    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(READ_CHANNEL_DEPTH);
        let pool = self.pool.clone();
        let dialect = self.dialect.clone();

        tokio::spawn(async move {
            let fut: std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>> =
                Box::pin(Self::read_table_impl(pool, dialect, opts, tx.clone()));
            let result = fut.await;
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }

    async fn get_row_count(
        &self,
        schema: &str,
        table: &str,
        where_clause: Option<&str>,
    ) -> Result<i64> {
        let mut query = format!(
            "SELECT COUNT(*) AS cnt FROM {}",
            self.dialect.qualify(schema, table)
        );
        if let Some(clause) = where_clause {
            if !clause.is_empty() {
                query.push_str(&format!(" WHERE ({})", clause));
            }
        }

        let row: MySqlRow = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "getting row count"))?;

        Ok(row.get::<i64, _>("cnt"))
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Whether a connection error is worth retrying.
fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
    )
}

/// Decode one driver row into `SqlValue`s using the plan's logical types.
///
/// The logical kind, not the raw driver type, decides the variant: that is
/// what keeps target parameter binding type-correct (uuid columns receive
/// Uuid values, jsonb columns receive Json values).
fn decode_row(row: &MySqlRow, kinds: &[LogicalType]) -> Vec<SqlValue<'static>> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_value(row, i, kind))
        .collect()
}

fn decode_value(row: &MySqlRow, i: usize, kind: &LogicalType) -> SqlValue<'static> {
    let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null(null_type_for(kind));
    }

    match kind {
        LogicalType::Bool => row
            .try_get::<bool, _>(i)
            .map(SqlValue::Bool)
            .or_else(|_| row.try_get::<i8, _>(i).map(|v| SqlValue::Bool(v != 0)))
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),

        LogicalType::Int8 => row
            .try_get::<i8, _>(i)
            .map(|v| SqlValue::I16(v as i16))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),

        LogicalType::Int16 => row
            .try_get::<i16, _>(i)
            .map(SqlValue::I16)
            .or_else(|_| row.try_get::<u8, _>(i).map(|v| SqlValue::I16(v as i16)))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),

        LogicalType::Int32 => row
            .try_get::<i32, _>(i)
            .map(SqlValue::I32)
            .or_else(|_| row.try_get::<u16, _>(i).map(|v| SqlValue::I32(v as i32)))
            .or_else(|_| row.try_get::<i16, _>(i).map(|v| SqlValue::I32(v as i32)))
            .unwrap_or(SqlValue::Null(SqlNullType::I32)),

        LogicalType::Int64 => row
            .try_get::<i64, _>(i)
            .map(SqlValue::I64)
            .or_else(|_| row.try_get::<u32, _>(i).map(|v| SqlValue::I64(v as i64)))
            .or_else(|_| row.try_get::<i32, _>(i).map(|v| SqlValue::I64(v as i64)))
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),

        LogicalType::Decimal { .. } => row
            .try_get::<rust_decimal::Decimal, _>(i)
            .map(SqlValue::Decimal)
            .or_else(|_| {
                // unsigned bigint surfaces as u64
                row.try_get::<u64, _>(i)
                    .map(|v| SqlValue::Decimal(rust_decimal::Decimal::from(v)))
            })
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),

        LogicalType::Float32 => row
            .try_get::<f32, _>(i)
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null(SqlNullType::F32)),

        LogicalType::Float64 => row
            .try_get::<f64, _>(i)
            .map(SqlValue::F64)
            .or_else(|_| row.try_get::<f32, _>(i).map(|v| SqlValue::F64(v as f64)))
            .unwrap_or(SqlValue::Null(SqlNullType::F64)),

        LogicalType::Char(_) | LogicalType::Varchar(_) | LogicalType::Text | LogicalType::Enum(_) => {
            row.try_get::<String, _>(i)
                .map(|s| SqlValue::Text(Cow::Owned(s)))
                .unwrap_or(SqlValue::Null(SqlNullType::String))
        }

        LogicalType::Bytes => row
            .try_get::<Vec<u8>, _>(i)
            .map(|b| SqlValue::Bytes(Cow::Owned(b)))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),

        LogicalType::Date => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),

        LogicalType::Time => row
            .try_get::<chrono::NaiveTime, _>(i)
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),

        LogicalType::DateTime => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),

        LogicalType::TimestampTz => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
            .map(|v| SqlValue::TimestampTz(v.fixed_offset()))
            .or_else(|_| {
                row.try_get::<chrono::NaiveDateTime, _>(i)
                    .map(|v| SqlValue::TimestampTz(v.and_utc().fixed_offset()))
            })
            .unwrap_or(SqlValue::Null(SqlNullType::TimestampTz)),

        LogicalType::Json => row
            .try_get::<serde_json::Value, _>(i)
            .map(SqlValue::Json)
            .or_else(|_| {
                row.try_get::<String, _>(i).map(|s| {
                    serde_json::from_str(&s)
                        .map(SqlValue::Json)
                        .unwrap_or(SqlValue::Text(Cow::Owned(s)))
                })
            })
            .unwrap_or(SqlValue::Null(SqlNullType::Json)),

        LogicalType::Uuid => row
            .try_get::<uuid::Uuid, _>(i)
            .map(SqlValue::Uuid)
            .or_else(|_| {
                row.try_get::<String, _>(i).map(|s| {
                    uuid::Uuid::parse_str(s.trim())
                        .map(SqlValue::Uuid)
                        .unwrap_or(SqlValue::Null(SqlNullType::Uuid))
                })
            })
            .or_else(|_| {
                row.try_get::<Vec<u8>, _>(i).map(|b| {
                    uuid::Uuid::from_slice(&b)
                        .map(SqlValue::Uuid)
                        .unwrap_or(SqlValue::Null(SqlNullType::Uuid))
                })
            })
            .unwrap_or(SqlValue::Null(SqlNullType::Uuid)),

        // Overridden unknowns transfer as text.
        LogicalType::Unknown(_) => row
            .try_get::<String, _>(i)
            .map(|s| SqlValue::Text(Cow::Owned(s)))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
    }
}

/// The typed NULL hint for a logical kind.
fn null_type_for(kind: &LogicalType) -> SqlNullType {
    match kind {
        LogicalType::Bool => SqlNullType::Bool,
        LogicalType::Int8 | LogicalType::Int16 => SqlNullType::I16,
        LogicalType::Int32 => SqlNullType::I32,
        LogicalType::Int64 => SqlNullType::I64,
        LogicalType::Decimal { .. } => SqlNullType::Decimal,
        LogicalType::Float32 => SqlNullType::F32,
        LogicalType::Float64 => SqlNullType::F64,
        LogicalType::Bytes => SqlNullType::Bytes,
        LogicalType::Date => SqlNullType::Date,
        LogicalType::Time => SqlNullType::Time,
        LogicalType::DateTime => SqlNullType::DateTime,
        LogicalType::TimestampTz => SqlNullType::TimestampTz,
        LogicalType::Json => SqlNullType::Json,
        LogicalType::Uuid => SqlNullType::Uuid,
        _ => SqlNullType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_type_for() {
        assert_eq!(null_type_for(&LogicalType::Int32), SqlNullType::I32);
        assert_eq!(null_type_for(&LogicalType::Int8), SqlNullType::I16);
        assert_eq!(null_type_for(&LogicalType::Varchar(10)), SqlNullType::String);
        assert_eq!(null_type_for(&LogicalType::Bytes), SqlNullType::Bytes);
        assert_eq!(null_type_for(&LogicalType::Json), SqlNullType::Json);
        assert_eq!(
            null_type_for(&LogicalType::TimestampTz),
            SqlNullType::TimestampTz
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
