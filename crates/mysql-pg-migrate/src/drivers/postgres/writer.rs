//! PostgreSQL target writer implementation.
//!
//! Implements the `TargetWriter` trait for running DDL against PostgreSQL
//! and provides the per-table write session used by the row pipeline. Uses
//! deadpool-postgres for connection pooling; row data travels through
//! parameterized multi-row INSERT statements inside explicit transactions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::schema::Table;
use crate::core::traits::{Dialect, TargetWriter, TxnKind};
use crate::core::value::{Batch, SqlValue};
use crate::error::{MigrateError, Result};

use super::dialect::PostgresDialect;

/// Base delay for connect retries; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Ceiling on bind parameters per statement. The wire protocol caps at
/// 65535; stay under it and re-chunk oversized batches.
const MAX_PARAMS_PER_STATEMENT: usize = 65_000;

/// PostgreSQL target writer.
pub struct PostgresWriter {
    pool: Pool,
    dialect: PostgresDialect,
    schema: String,
}

impl PostgresWriter {
    /// Create a new PostgreSQL writer from configuration.
    ///
    /// Transient connection failures are retried up to `max_retries` times
    /// with exponential backoff.
    pub async fn connect(
        config: &TargetConfig,
        max_conns: usize,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.username);
        pg_config.password(&config.password);
        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(connect_timeout);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let ssl_mode = config.ssl_mode.to_lowercase();
        let pool = match ssl_mode.as_str() {
            "disable" => {
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
            _ => {
                let tls_config = build_tls_config(&ssl_mode)?;
                let tls_connector = MakeRustlsConnect::new(tls_config);
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
        };

        // Round-trip test, with retry for transient failures.
        let mut attempt = 0u32;
        loop {
            match pool.get().await {
                Ok(client) => {
                    client.simple_query("SELECT 1").await?;
                    break;
                }
                Err(e) if attempt < max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        "PostgreSQL connect attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(MigrateError::pool(
                        e,
                        "testing PostgreSQL target connection",
                    ))
                }
            }
        }

        info!(
            "Connected to PostgreSQL target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            dialect: PostgresDialect::new(),
            schema: config.schema.clone(),
        })
    }

    /// The configured target schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    async fn client(&self, context: &'static str) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, context))
    }

    /// Open a write session for one table. The session owns a pooled
    /// connection for its whole lifetime so explicit transaction verbs
    /// stay on one backend.
    pub async fn begin_table_write(
        &self,
        schema: &str,
        table: &str,
        columns: Vec<String>,
    ) -> Result<TableWriteSession> {
        let client = self.client("opening table write session").await?;
        Ok(TableWriteSession {
            client,
            dialect: self.dialect.clone(),
            qualified: self.dialect.qualify(schema, table),
            columns,
            in_txn: false,
        })
    }
}

#[async_trait]
impl TargetWriter for PostgresWriter {
    async fn test_connection(&self) -> Result<()> {
        let client = self.client("testing PostgreSQL connection").await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn create_schema(&self, schema: &str) -> Result<()> {
        let client = self.client("getting PostgreSQL connection").await?;
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.dialect.quote_ident(schema)
        );
        client.batch_execute(&sql).await?;
        debug!("Ensured schema '{}'", schema);
        Ok(())
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        let client = self.client("getting PostgreSQL connection").await?;
        client.batch_execute(sql).await?;
        Ok(())
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let client = self.client("getting PostgreSQL connection").await?;
        let sql = r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
        "#;
        let row = client.query_one(sql, &[&schema, &table]).await?;
        Ok(row.get::<_, bool>(0))
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
        let client = self.client("getting PostgreSQL connection").await?;
        let sql = format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            self.dialect.qualify(schema, table)
        );
        client.batch_execute(&sql).await?;
        debug!("Dropped table {}.{}", schema, table);
        Ok(())
    }

    async fn reset_sequence(&self, schema: &str, table: &Table) -> Result<()> {
        let Some(identity) = table.identity_column() else {
            return Ok(());
        };

        let Some(sql) = self
            .dialect
            .sequence_resync_sql(schema, &table.name, &identity.name)
        else {
            return Ok(());
        };

        let client = self.client("getting PostgreSQL connection").await?;
        client.batch_execute(&sql).await?;
        debug!(
            "Resynced sequence for {}.{}.{}",
            schema, table.name, identity.name
        );
        Ok(())
    }

    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64> {
        let client = self.client("getting PostgreSQL connection").await?;
        let sql = format!(
            "SELECT COUNT(*)::int8 FROM {}",
            self.dialect.qualify(schema, table)
        );
        let row = client.query_one(&sql, &[]).await?;
        Ok(row.get::<_, i64>(0))
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// A per-table write session: one pooled connection, explicit transaction
/// verbs, parameterized multi-row inserts.
pub struct TableWriteSession {
    client: Object,
    dialect: PostgresDialect,
    qualified: String,
    columns: Vec<String>,
    in_txn: bool,
}

impl TableWriteSession {
    /// Open a transaction.
    pub async fn begin(&mut self) -> Result<()> {
        self.client
            .batch_execute(self.dialect.begin_sql(TxnKind::TargetWrite))
            .await?;
        self.in_txn = true;
        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> Result<()> {
        self.client.batch_execute(self.dialect.commit_sql()).await?;
        self.in_txn = false;
        Ok(())
    }

    /// Roll back the open transaction. Errors are swallowed: rollback runs
    /// on paths that already hold a more interesting error.
    pub async fn rollback(&mut self) {
        if self.in_txn {
            let _ = self
                .client
                .batch_execute(self.dialect.rollback_sql())
                .await;
            self.in_txn = false;
        }
    }

    /// Whether a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.in_txn
    }

    /// Insert one batch with parameterized multi-row statements.
    ///
    /// Oversized batches are split so no statement exceeds the protocol's
    /// bind-parameter limit. Full-size batches reuse one cached prepared
    /// statement.
    pub async fn write_batch(&mut self, batch: &Batch) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let width = self.columns.len().max(1);
        let rows_per_stmt = (MAX_PARAMS_PER_STATEMENT / width).max(1);

        let mut written = 0u64;
        for chunk in batch.rows.chunks(rows_per_stmt) {
            let sql = self
                .dialect
                .bulk_insert_sql(&self.qualified, &self.columns, chunk.len());
            let stmt = self.client.prepare_cached(&sql).await?;

            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flat_map(|row| row.iter().map(|v| v as &(dyn ToSql + Sync)))
                .collect();

            written += self.client.execute(&stmt, &params).await?;
        }

        Ok(written)
    }

    /// Rows per statement for a given column count (split arithmetic,
    /// exposed for tests).
    pub fn rows_per_statement(width: usize) -> usize {
        (MAX_PARAMS_PER_STATEMENT / width.max(1)).max(1)
    }
}

impl ToSql for SqlValue<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null(_) => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::I16(v) => v.to_sql(ty, out),
            SqlValue::I32(v) => v.to_sql(ty, out),
            SqlValue::I64(v) => v.to_sql(ty, out),
            SqlValue::F32(v) => v.to_sql(ty, out),
            SqlValue::F64(v) => v.to_sql(ty, out),
            SqlValue::Text(v) => v.as_ref().to_sql(ty, out),
            SqlValue::Bytes(v) => v.as_ref().to_sql(ty, out),
            SqlValue::Uuid(v) => v.to_sql(ty, out),
            SqlValue::Decimal(v) => v.to_sql(ty, out),
            SqlValue::DateTime(v) => v.to_sql(ty, out),
            SqlValue::TimestampTz(v) => v.to_sql(ty, out),
            SqlValue::Date(v) => v.to_sql(ty, out),
            SqlValue::Time(v) => v.to_sql(ty, out),
            SqlValue::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Values are produced by logical column kind, so the variant always
        // matches the target column type.
        true
    }

    to_sql_checked!();
}

/// Build the rustls client configuration for a TLS-enabled target.
fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = match ssl_mode {
        "require" => {
            warn!("ssl_mode=require: TLS enabled but server certificate is not verified.");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        }
        "verify-ca" | "verify-full" => {
            info!("ssl_mode={}: certificate verification enabled", ssl_mode);
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        other => {
            return Err(MigrateError::Config(format!(
                "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                other
            )));
        }
    };

    Ok(config)
}

/// Certificate verifier for ssl_mode=require (encrypt without verifying).
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_statement() {
        // 10-column table: 6500 rows fit per statement
        assert_eq!(TableWriteSession::rows_per_statement(10), 6_500);
        // Very wide table still progresses one row at a time
        assert_eq!(TableWriteSession::rows_per_statement(100_000), 1);
        // Degenerate zero-width guard
        assert_eq!(
            TableWriteSession::rows_per_statement(0),
            MAX_PARAMS_PER_STATEMENT
        );
    }

    #[test]
    fn test_build_tls_config_rejects_unknown_mode() {
        assert!(build_tls_config("maybe").is_err());
        assert!(build_tls_config("require").is_ok());
        assert!(build_tls_config("verify-full").is_ok());
    }
}
