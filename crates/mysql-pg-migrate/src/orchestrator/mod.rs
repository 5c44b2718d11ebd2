//! Migration orchestrator - main workflow coordinator.
//!
//! Resolves the table set, computes FK dependency order, runs schema
//! translation as a pre-flight pass, drives per-table pipelines through a
//! bounded worker pool whose queue respects the topology, then applies the
//! post-steps: deferred foreign keys, sequence resync, and (by default)
//! secondary indexes.

pub mod progress;
pub mod selection;
pub mod topology;

pub use progress::{Phase, ProgressEvent, ProgressSink};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, MigrationOptions, SourceConfig, TargetConfig};
use crate::core::schema::{MigrationPlan, Table};
use crate::core::traits::{SourceReader, TargetWriter};
use crate::drivers::mysql::MysqlReader;
use crate::drivers::postgres::PostgresWriter;
use crate::drivers::DialectImpl;
use crate::error::{MigrateError, Result};
use crate::pipeline::{RowPipeline, TableJob};
use crate::translator::{SchemaTranslator, TableDdl};
use crate::typemap::TypeOverrides;

/// Connectivity test outcome for both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub source: bool,
    pub target: bool,
}

/// Terminal status of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    /// Schema and data migrated.
    Success,
    /// DDL or data transfer failed.
    Failed,
    /// Never started (stop_on_error or cancellation upstream).
    Skipped,
    /// Cancelled mid-transfer; committed batches remain.
    Cancelled,
}

/// Per-table outcome.
#[derive(Debug, Clone)]
pub struct TableResult {
    pub table: String,
    pub status: TableStatus,
    pub rows_copied: u64,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Result of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Per-table outcomes, in plan order.
    pub tables: Vec<TableResult>,

    /// Total rows copied across successful tables.
    pub rows_copied: u64,

    /// Wall-clock duration of the whole run.
    pub duration: Duration,

    /// Post-step failures (deferred FK installs, sequence resync, late
    /// indexes). Data remains in place when these occur.
    pub post_step_errors: Vec<String>,

    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl MigrationResult {
    pub fn tables_total(&self) -> usize {
        self.tables.len()
    }

    pub fn tables_success(&self) -> usize {
        self.count(TableStatus::Success)
    }

    pub fn tables_failed(&self) -> usize {
        self.count(TableStatus::Failed)
    }

    pub fn tables_skipped(&self) -> usize {
        self.count(TableStatus::Skipped)
    }

    pub fn tables_cancelled(&self) -> usize {
        self.count(TableStatus::Cancelled)
    }

    fn count(&self, status: TableStatus) -> usize {
        self.tables.iter().filter(|t| t.status == status).count()
    }

    /// Process exit code for CLI wrappers: 0 success, 3 partial,
    /// 4 cancelled.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            4
        } else if self.tables_failed() > 0
            || self.tables_skipped() > 0
            || !self.post_step_errors.is_empty()
        {
            3
        } else {
            0
        }
    }
}

/// Create a migrator from source and target connection settings with
/// default options.
pub fn new_migrator(source: SourceConfig, target: TargetConfig) -> Migrator {
    Migrator::from_config(Config {
        source,
        target,
        options: MigrationOptions::default(),
        type_mappings: Default::default(),
        logging: Default::default(),
    })
}

/// The migration engine's programmatic surface.
///
/// Configuration edits (`set_selection`, `set_options`, ...) apply to the
/// next `migrate()` call; a running migration works from the snapshot taken
/// at entry.
pub struct Migrator {
    config: Config,
    progress: ProgressSink,
    cancel: CancellationToken,
}

impl Migrator {
    /// Create a migrator from a full configuration document.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            progress: ProgressSink::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace include/exclude selection patterns.
    pub fn set_selection(&mut self, include: Vec<String>, exclude: Vec<String>) {
        self.config.options.tables = include;
        self.config.options.exclude_tables = exclude;
    }

    /// Replace the migration options.
    pub fn set_options(&mut self, options: MigrationOptions) {
        self.config.options = options;
    }

    /// Current options (next-run view).
    pub fn options(&self) -> &MigrationOptions {
        &self.config.options
    }

    /// Replace the type mapping overrides.
    pub fn set_type_mappings(
        &mut self,
        mappings: std::collections::BTreeMap<String, String>,
    ) {
        self.config.type_mappings = mappings;
    }

    /// Install the progress callback. Events arrive serialized; the
    /// callback runs on the emitting worker and must not block.
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.progress.set_callback(callback);
    }

    /// Token that cancels a running migration. Workers observe it between
    /// batches and at table boundaries.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Probe both ends. Never fails; reports per-side reachability.
    pub async fn test_connections(&self) -> ConnectionStatus {
        let timeout = Duration::from_secs(self.config.options.connect_timeout_secs);

        let source = match MysqlReader::connect(&self.config.source, 1, timeout, 0).await {
            Ok(reader) => {
                let ok = reader.test_connection().await.is_ok();
                reader.close().await;
                ok
            }
            Err(_) => false,
        };

        let target = match PostgresWriter::connect(&self.config.target, 1, timeout, 0).await {
            Ok(writer) => {
                let ok = writer.test_connection().await.is_ok();
                writer.close().await;
                ok
            }
            Err(_) => false,
        };

        ConnectionStatus { source, target }
    }

    /// Introspect the source and return full table descriptors.
    pub async fn list_tables(&self) -> Result<Vec<Table>> {
        let timeout = Duration::from_secs(self.config.options.connect_timeout_secs);
        let reader = MysqlReader::connect(
            &self.config.source,
            2,
            timeout,
            self.config.options.max_retries,
        )
        .await?;

        let result = async {
            let mut tables = reader.extract_schema(&self.config.source.database).await?;
            for table in &mut tables {
                reader.load_indexes(table).await?;
                reader.load_foreign_keys(table).await?;
            }
            Ok(tables)
        }
        .await;

        reader.close().await;
        result
    }

    /// Run the migration. Per-table failures are reported through the
    /// result; only configuration errors, initial connection failures, and
    /// pre-flight mapping errors return `Err`.
    pub async fn migrate(&self) -> Result<MigrationResult> {
        let started = Instant::now();
        self.config.validate()?;

        // Immutable snapshot for this run.
        let options = self.config.options.clone();
        let connect_timeout = Duration::from_secs(options.connect_timeout_secs);
        let pool_size = options.workers + 2;

        self.progress.emit(ProgressEvent::phase(
            Phase::Connect,
            format!(
                "connecting {} -> {}",
                self.config.source.database, self.config.target.database
            ),
        ));

        let reader = Arc::new(
            MysqlReader::connect(
                &self.config.source,
                pool_size,
                connect_timeout,
                options.max_retries,
            )
            .await?,
        );

        let writer = match PostgresWriter::connect(
            &self.config.target,
            pool_size,
            connect_timeout,
            options.max_retries,
        )
        .await
        {
            Ok(writer) => Arc::new(writer),
            Err(e) => {
                reader.close().await;
                return Err(e);
            }
        };

        let result = self
            .run_migration(reader.clone(), writer.clone(), options, started)
            .await;

        reader.close().await;
        writer.close().await;

        match &result {
            Ok(outcome) => {
                self.progress.emit(ProgressEvent::phase(
                    Phase::Done,
                    format!(
                        "migrated {}/{} tables, {} rows in {:.1}s",
                        outcome.tables_success(),
                        outcome.tables_total(),
                        outcome.rows_copied,
                        outcome.duration.as_secs_f64()
                    ),
                ));
            }
            Err(e) => {
                self.progress
                    .emit(ProgressEvent::phase(Phase::Error, e.to_string()));
            }
        }

        result
    }

    async fn run_migration(
        &self,
        reader: Arc<MysqlReader>,
        writer: Arc<PostgresWriter>,
        options: MigrationOptions,
        started: Instant,
    ) -> Result<MigrationResult> {
        let target_schema = self.config.target.schema.clone();

        // ===== Plan =====
        self.progress.emit(ProgressEvent::phase(
            Phase::Plan,
            "introspecting source schema",
        ));

        let all_tables = reader.extract_schema(&self.config.source.database).await?;
        let all_names: Vec<String> = all_tables.iter().map(|t| t.name.clone()).collect();

        let selection =
            selection::resolve(&all_names, &options.tables, &options.exclude_tables);
        for warning in &selection.warnings {
            warn!("{}", warning);
            self.progress
                .emit(ProgressEvent::phase(Phase::Plan, warning.clone()));
        }

        let selected: HashSet<&String> = selection.selected.iter().collect();
        let mut tables: Vec<Table> = all_tables
            .into_iter()
            .filter(|t| selected.contains(&t.name))
            .collect();

        for table in &mut tables {
            reader.load_indexes(table).await?;
            reader.load_foreign_keys(table).await?;
        }

        let plan_order = topology::sort_tables(&tables);
        if !plan_order.cyclic.is_empty() {
            warn!(
                "foreign-key cycle among {:?}; constraints for these tables install after data load",
                plan_order.cyclic
            );
        }
        let position: HashMap<&str, usize> = plan_order
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        tables.sort_by_key(|t| position[t.name.as_str()]);

        // ===== Pre-flight translation: all mapping errors in one batch =====
        let overrides = TypeOverrides::new(&self.config.type_mappings);
        let target_dialect = DialectImpl::from_db_type(&self.config.target.r#type)?;
        let mut translator = SchemaTranslator::new(
            target_schema.clone(),
            target_dialect,
            overrides,
            options.clone(),
        );
        let mut ddls: HashMap<String, TableDdl> = HashMap::new();
        let mut unmapped = Vec::new();

        for table in &tables {
            match translator.translate(table) {
                Ok(ddl) => {
                    ddls.insert(table.name.clone(), ddl);
                }
                Err(MigrateError::Mapping { columns }) => unmapped.extend(columns),
                Err(e) => return Err(e),
            }
        }
        if !unmapped.is_empty() {
            return Err(MigrateError::Mapping { columns: unmapped });
        }

        writer.create_schema(&target_schema).await?;

        let deps = topology::effective_deps(&tables, &plan_order.order);
        let plan = Arc::new(MigrationPlan {
            tables,
            cyclic: plan_order.cyclic,
            options: options.clone(),
        });

        info!(
            "plan ready: {} tables, ~{} rows",
            plan.tables.len(),
            plan.estimated_rows()
        );
        self.progress.emit(ProgressEvent::phase(
            Phase::Plan,
            format!(
                "plan ready: {} tables, ~{} rows",
                plan.tables.len(),
                plan.estimated_rows()
            ),
        ));

        // ===== Data: bounded worker pool over a topology-aware queue =====
        let table_count = plan.tables.len();
        let ddls = Arc::new(ddls);
        let pipeline = Arc::new(RowPipeline::new(reader.clone(), writer.clone(), &options));
        let results: Arc<Mutex<Vec<Option<TableResult>>>> =
            Arc::new(Mutex::new(vec![None; table_count]));
        let state = Arc::new(Mutex::new(SchedState {
            remaining: (0..table_count).collect(),
            names: plan.tables.iter().map(|t| t.name.clone()).collect(),
            finished: HashSet::new(),
            deps,
            stopped: false,
        }));
        let notify = Arc::new(Notify::new());

        let worker_count = options.workers.min(table_count.max(1));
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let ctx = WorkerCtx {
                plan: plan.clone(),
                ddls: ddls.clone(),
                writer: writer.clone(),
                pipeline: pipeline.clone(),
                options: options.clone(),
                target_schema: target_schema.clone(),
                state: state.clone(),
                results: results.clone(),
                notify: notify.clone(),
                cancel: self.cancel.clone(),
                progress: self.progress.clone(),
            };
            handles.push(tokio::spawn(ctx.run(worker_id)));
        }

        for handle in handles {
            handle.await.map_err(|e| {
                MigrateError::transfer("worker pool", format!("worker task panicked: {}", e))
            })?;
        }

        let cancelled = self.cancel.is_cancelled();

        let mut table_results: Vec<TableResult> = {
            let mut slots = results.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .iter_mut()
                .enumerate()
                .map(|(idx, slot)| {
                    slot.take().unwrap_or_else(|| TableResult {
                        table: plan.tables[idx].name.clone(),
                        status: TableStatus::Skipped,
                        rows_copied: 0,
                        duration: Duration::ZERO,
                        error: None,
                    })
                })
                .collect()
        };

        // ===== Post-steps: deferred FKs, sequence resync, late indexes =====
        let mut post_step_errors = Vec::new();
        if !cancelled {
            self.progress.emit(ProgressEvent::phase(
                Phase::Post,
                "installing deferred constraints",
            ));

            let status_of: HashMap<String, TableStatus> = table_results
                .iter()
                .map(|r| (r.table.clone(), r.status))
                .collect();
            let succeeded =
                |name: &str| status_of.get(name) == Some(&TableStatus::Success);

            if options.migrate_foreign_keys {
                for table in &plan.tables {
                    if !succeeded(&table.name) {
                        continue;
                    }
                    let ddl = &ddls[&table.name];
                    for (fk, sql) in table.foreign_keys.iter().zip(&ddl.foreign_keys) {
                        let ref_ok = fk.ref_table == table.name || succeeded(&fk.ref_table);
                        if !ref_ok {
                            warn!(
                                "skipping FK {} on {}: referenced table {} was not migrated",
                                fk.name, table.name, fk.ref_table
                            );
                            continue;
                        }
                        if let Err(e) = writer.execute_ddl(sql).await {
                            let err =
                                MigrateError::integrity(&table.name, format!("{}: {}", fk.name, e));
                            warn!("{}", err);
                            post_step_errors.push(err.to_string());
                        }
                    }
                }
            }

            for table in &plan.tables {
                if !succeeded(&table.name) {
                    continue;
                }
                if let Err(e) = writer.reset_sequence(&target_schema, table).await {
                    let err = format!("sequence resync for {}: {}", table.name, e);
                    warn!("{}", err);
                    post_step_errors.push(err);
                }
            }

            if options.migrate_indexes && options.indexes_after_data {
                for table in &plan.tables {
                    if !succeeded(&table.name) {
                        continue;
                    }
                    for sql in &ddls[&table.name].indexes {
                        if let Err(e) = writer.execute_ddl(sql).await {
                            let err = format!("index creation on {}: {}", table.name, e);
                            warn!("{}", err);
                            post_step_errors.push(err);
                        }
                    }
                }
            }
        }

        // Cancellation accounting: tables that never ran are skipped, not
        // cancelled; only in-flight tables report cancelled.
        if cancelled {
            for result in &mut table_results {
                if result.status == TableStatus::Skipped {
                    result.error.get_or_insert_with(|| "not started".to_string());
                }
            }
        }

        let rows_copied = table_results
            .iter()
            .filter(|r| r.status == TableStatus::Success)
            .map(|r| r.rows_copied)
            .sum();

        Ok(MigrationResult {
            tables: table_results,
            rows_copied,
            duration: started.elapsed(),
            post_step_errors,
            cancelled,
        })
    }
}

/// Shared scheduler state: the work queue with FK-topology gating.
struct SchedState {
    /// Plan indices not yet claimed, in plan order.
    remaining: Vec<usize>,
    /// Table name per plan index.
    names: Vec<String>,
    /// Tables that reached a terminal state.
    finished: HashSet<String>,
    /// Per-table dependencies that must finish first.
    deps: HashMap<String, Vec<String>>,
    /// Set on stop_on_error; drains the queue.
    stopped: bool,
}

impl SchedState {
    /// Claim the first remaining table whose dependencies have all
    /// finished. Returns `None` when nothing is currently eligible.
    fn claim_next(&mut self) -> Option<usize> {
        let pos = self.remaining.iter().position(|&idx| {
            self.deps[&self.names[idx]]
                .iter()
                .all(|dep| self.finished.contains(dep))
        })?;
        Some(self.remaining.remove(pos))
    }
}

/// Everything one worker needs; cheap to clone, all shared state is Arc'd.
#[derive(Clone)]
struct WorkerCtx {
    plan: Arc<MigrationPlan>,
    ddls: Arc<HashMap<String, TableDdl>>,
    writer: Arc<PostgresWriter>,
    pipeline: Arc<RowPipeline>,
    options: MigrationOptions,
    target_schema: String,
    state: Arc<Mutex<SchedState>>,
    results: Arc<Mutex<Vec<Option<TableResult>>>>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    progress: ProgressSink,
}

impl WorkerCtx {
    async fn run(self, worker_id: usize) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let claimed = {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if state.stopped || state.remaining.is_empty() {
                    break;
                }
                state.claim_next()
            };

            match claimed {
                Some(idx) => {
                    let result = self.process_table(idx, worker_id).await;
                    let failed = result.status == TableStatus::Failed;
                    {
                        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                        state.finished.insert(result.table.clone());
                        if failed && self.options.stop_on_error {
                            state.stopped = true;
                        }
                    }
                    {
                        let mut results =
                            self.results.lock().unwrap_or_else(|e| e.into_inner());
                        results[idx] = Some(result);
                    }
                    self.notify.notify_waiters();
                }
                None => {
                    // Everything left is blocked on an in-flight table.
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                        _ = self.cancel.cancelled() => break,
                    }
                }
            }
        }
    }

    async fn process_table(&self, idx: usize, worker_id: usize) -> TableResult {
        let table = &self.plan.tables[idx];
        let name = table.name.clone();
        let full_name = table.full_name();
        let started = Instant::now();
        let ddl = &self.ddls[&name];

        info!("worker {}: starting table {}", worker_id, full_name);
        self.progress.emit(ProgressEvent::table(
            Phase::Ddl,
            &full_name,
            format!("creating table {}", name),
        ));

        if let Err(e) = self.apply_create_ddl(&name, ddl).await {
            return TableResult {
                table: name,
                status: TableStatus::Failed,
                rows_copied: 0,
                duration: started.elapsed(),
                error: Some(e.to_string()),
            };
        }

        self.progress.emit(ProgressEvent::table(
            Phase::Data,
            &full_name,
            format!("copying rows into {}", name),
        ));

        let job = TableJob {
            table: table.clone(),
            kinds: ddl.kinds.clone(),
            target_schema: self.target_schema.clone(),
            where_clause: self
                .options
                .where_clause_for(&name)
                .map(|s| s.to_string()),
        };

        match self.pipeline.run(&job, &self.cancel, &self.progress).await {
            Ok(stats) => TableResult {
                table: name,
                status: TableStatus::Success,
                rows_copied: stats.rows,
                duration: started.elapsed(),
                error: None,
            },
            Err(MigrateError::Cancelled) => TableResult {
                table: name,
                status: TableStatus::Cancelled,
                rows_copied: 0,
                duration: started.elapsed(),
                error: Some("cancelled mid-transfer".to_string()),
            },
            Err(e) => {
                if self.options.drop_on_failure {
                    let _ = self.writer.drop_table(&self.target_schema, &name).await;
                }
                TableResult {
                    table: name,
                    status: TableStatus::Failed,
                    rows_copied: 0,
                    duration: started.elapsed(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn apply_create_ddl(&self, table: &str, ddl: &TableDdl) -> Result<()> {
        if let Some(drop) = &ddl.drop {
            self.writer
                .execute_ddl(drop)
                .await
                .map_err(|e| MigrateError::ddl(table, e.to_string()))?;
        }
        for sql in &ddl.enum_types {
            self.writer
                .execute_ddl(sql)
                .await
                .map_err(|e| MigrateError::ddl(table, e.to_string()))?;
        }
        self.writer
            .execute_ddl(&ddl.create)
            .await
            .map_err(|e| MigrateError::ddl(table, e.to_string()))?;

        if !self.options.indexes_after_data {
            for sql in &ddl.indexes {
                self.writer
                    .execute_ddl(sql)
                    .await
                    .map_err(|e| MigrateError::ddl(table, e.to_string()))?;
            }
        }

        Ok(())
    }
}
