//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::dialect::DuckDbDialect;
use crate::error::{Result, SalesDashError};
use crate::executor::{json_to_duck_value, ColumnMeta, QueryResult};

use super::BackendConnection;

/// DuckDB connection implementing the unified backend trait.
///
/// Every execution opens its own connection on a blocking task and drops it
/// before returning, on success and on error alike.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), max_concurrency = 16, "creating DuckDB connection");
        Self {
            database_path: path,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(16)),
        }
    }

    /// Configure maximum concurrent executions; callers can tune based on hardware.
    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        tracing::debug!(max_concurrency = max_in_flight, "configuring DuckDB concurrency");
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        let available = self.limiter.available_permits();
        if available == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| SalesDashError::Execution(format!("limiter closed: {e}")))
    }
}

fn open(path: &Path) -> Result<duckdb::Connection> {
    tracing::debug!(path = %path.display(), "opening DuckDB connection");
    duckdb::Connection::open(path)
        .map_err(|e| SalesDashError::Execution(format!("open duckdb: {e}")))
}

fn run_query(conn: &duckdb::Connection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let bound: Vec<duckdb::types::Value> = params.iter().map(json_to_duck_value).collect();
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query(duckdb::params_from_iter(bound.iter()))?;
    let stmt_ref = rows_iter
        .as_ref()
        .ok_or_else(|| SalesDashError::Execution("statement missing".to_string()))?;
    let mut column_names = Vec::new();
    for idx in 0..stmt_ref.column_count() {
        let name = stmt_ref
            .column_name(idx)
            .map_err(|e| SalesDashError::Execution(e.to_string()))?;
        column_names.push(name.to_string());
    }
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut map = serde_json::Map::new();
        for (idx, name) in column_names.iter().enumerate() {
            let value = crate::executor::duck_value_to_json(row.get_ref(idx)?.to_owned());
            map.insert(name.clone(), value);
        }
        rows.push(map);
    }

    let columns = column_names
        .into_iter()
        .map(|name| ColumnMeta { name })
        .collect();
    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let sql = sql.to_string();
        let params = params.to_vec();
        let path = self.database_path.clone();
        let _permit = self.acquire_slot().await?;
        tokio::task::spawn_blocking(move || -> Result<QueryResult> {
            let start = Instant::now();
            let conn = open(&path)?;
            let result = run_query(&conn, &sql, &params);
            drop(conn);
            let elapsed = start.elapsed();
            match &result {
                Ok(r) => tracing::debug!(
                    rows = r.rows.len(),
                    columns = r.columns.len(),
                    ms = elapsed.as_millis(),
                    "duckdb execute_sql"
                ),
                Err(e) => tracing::debug!(
                    error = %e,
                    ms = elapsed.as_millis(),
                    "duckdb execute_sql failed"
                ),
            }
            result
        })
        .await
        .map_err(|e| SalesDashError::Execution(format!("task join error: {e}")))?
    }
}
