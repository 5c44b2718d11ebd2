//! Per-table row pipeline: stream, batch, bulk insert.
//!
//! Three logical stages run per table: a producer streaming rows from the
//! source under one snapshot, a batcher grouping rows into `batch_size`
//! chunks (done inside the reader), and a writer issuing one parameterized
//! multi-row INSERT per batch inside an explicit transaction, committing
//! every `commit_every` batches.
//!
//! The pipeline is synchronous within a table - the producer blocks on the
//! bounded channel when the writer falls behind. Parallelism is across
//! tables, owned by the orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MigrationOptions;
use crate::core::traits::{ReadOptions, SourceReader};
use crate::drivers::mysql::MysqlReader;
use crate::drivers::postgres::PostgresWriter;
use crate::error::{MigrateError, Result};
use crate::orchestrator::progress::{ProgressEvent, ProgressSink};
use crate::typemap::LogicalType;

/// Everything needed to move one table's rows.
#[derive(Debug, Clone)]
pub struct TableJob {
    /// Source table descriptor.
    pub table: crate::core::schema::Table,

    /// Per-column logical types, ordinal order.
    pub kinds: Vec<LogicalType>,

    /// Target schema name.
    pub target_schema: String,

    /// Optional user WHERE fragment.
    pub where_clause: Option<String>,
}

/// Statistics from one table transfer.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Rows written and committed.
    pub rows: u64,

    /// Batches written.
    pub batches: u64,

    /// Total elapsed time.
    pub duration: Duration,
}

/// Per-table transfer pipeline.
pub struct RowPipeline {
    reader: Arc<MysqlReader>,
    writer: Arc<PostgresWriter>,
    batch_size: usize,
    commit_every: usize,
    progress_rows: u64,
    statement_timeout: Option<Duration>,
}

impl RowPipeline {
    pub fn new(
        reader: Arc<MysqlReader>,
        writer: Arc<PostgresWriter>,
        options: &MigrationOptions,
    ) -> Self {
        let statement_timeout = (options.statement_timeout_secs > 0)
            .then(|| Duration::from_secs(options.statement_timeout_secs));
        Self {
            reader,
            writer,
            batch_size: options.batch_size,
            commit_every: options.commit_every,
            progress_rows: options.progress_rows.max(1),
            statement_timeout,
        }
    }

    /// Run the pipeline for one table. Rows are inserted in source-read
    /// order; the cancellation token is observed between batches.
    pub async fn run(
        &self,
        job: &TableJob,
        cancel: &CancellationToken,
        progress: &ProgressSink,
    ) -> Result<PipelineStats> {
        let table_name = job.table.full_name();
        let start = Instant::now();

        let columns = job.table.column_names();
        let rows_total = (job.where_clause.is_none() && job.table.row_count >= 0)
            .then_some(job.table.row_count as u64);

        let mut rx = self.reader.read_table(ReadOptions {
            schema: job.table.schema.clone(),
            table: job.table.name.clone(),
            columns: columns.clone(),
            kinds: job.kinds.clone(),
            where_clause: job.where_clause.clone(),
            batch_size: self.batch_size,
        });

        let mut session = self
            .writer
            .begin_table_write(&job.target_schema, &job.table.name, columns)
            .await?;
        session.begin().await?;

        let mut rows: u64 = 0;
        let mut batches: u64 = 0;
        let mut batches_since_commit: usize = 0;
        let mut rows_since_progress: u64 = 0;

        loop {
            let received = match self.statement_timeout {
                Some(limit) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        session.rollback().await;
                        return Err(MigrateError::Cancelled);
                    }
                    timed = tokio::time::timeout(limit, rx.recv()) => match timed {
                        Ok(received) => received,
                        Err(_) => {
                            session.rollback().await;
                            return Err(MigrateError::Timeout {
                                operation: format!("row fetch from {}", table_name),
                                seconds: limit.as_secs(),
                            });
                        }
                    },
                },
                None => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        session.rollback().await;
                        return Err(MigrateError::Cancelled);
                    }
                    received = rx.recv() => received,
                },
            };

            let batch = match received {
                Some(Ok(batch)) => batch,
                Some(Err(e)) => {
                    session.rollback().await;
                    return Err(e);
                }
                None => break,
            };

            if !batch.is_empty() {
                let write = session.write_batch(&batch);
                let written = match self.statement_timeout {
                    Some(limit) => match tokio::time::timeout(limit, write).await {
                        Ok(result) => result,
                        Err(_) => {
                            session.rollback().await;
                            return Err(MigrateError::Timeout {
                                operation: format!("batch insert into {}", table_name),
                                seconds: limit.as_secs(),
                            });
                        }
                    },
                    None => write.await,
                };

                match written {
                    Ok(n) => {
                        rows += n;
                        rows_since_progress += n;
                    }
                    Err(e) => {
                        session.rollback().await;
                        return Err(MigrateError::transfer(
                            &table_name,
                            format!("batch {} (at row offset {}): {}", batches, rows, e),
                        ));
                    }
                }

                batches += 1;
                batches_since_commit += 1;

                if batches_since_commit >= self.commit_every {
                    session.commit().await?;
                    batches_since_commit = 0;
                    if !batch.is_last {
                        session.begin().await?;
                    }
                }

                if rows_since_progress >= self.progress_rows {
                    rows_since_progress = 0;
                    progress.emit(ProgressEvent::data(
                        &table_name,
                        rows,
                        rows_total,
                        format!("{}: {} rows copied", table_name, rows),
                    ));
                }
            }

            if batch.is_last {
                break;
            }
        }

        if session.in_transaction() {
            session.commit().await?;
        }

        let duration = start.elapsed();
        progress.emit(ProgressEvent::data(
            &table_name,
            rows,
            rows_total,
            format!("{}: {} rows copied", table_name, rows),
        ));

        let rows_per_sec = if duration.as_secs_f64() > 0.0 {
            (rows as f64 / duration.as_secs_f64()) as u64
        } else {
            0
        };
        info!(
            "{}: transferred {} rows in {} batches ({:?}, {} rows/sec)",
            table_name, rows, batches, duration, rows_per_sec
        );
        debug!("{}: batch_size={}, commit_every={}", table_name, self.batch_size, self.commit_every);

        Ok(PipelineStats {
            rows,
            batches,
            duration,
        })
    }
}

/// Expected batch count for a row count and batch size (final batch may be
/// smaller).
pub fn batch_count(rows: u64, batch_size: usize) -> u64 {
    if batch_size == 0 {
        return 0;
    }
    rows.div_ceil(batch_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_count() {
        // 10 rows at batch_size=3 -> 4 batches (3+3+3+1)
        assert_eq!(batch_count(10, 3), 4);
        assert_eq!(batch_count(9, 3), 3);
        assert_eq!(batch_count(0, 3), 0);
        assert_eq!(batch_count(1, 1000), 1);
        assert_eq!(batch_count(1000, 1000), 1);
        assert_eq!(batch_count(1001, 1000), 2);
        assert_eq!(batch_count(5, 0), 0);
    }
}
