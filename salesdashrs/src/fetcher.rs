//! Query execution with a result cache in front of the backend.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::backends::BackendConnection;
use crate::cache::QueryCache;
use crate::config::CacheConfig;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::QueryResult;
use crate::sql_ast::RenderedQuery;

/// Counters describing how queries were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub hits: u64,
    pub misses: u64,
    /// Queries sent to the backend (successful or not).
    pub executions: u64,
    pub failures: u64,
}

#[derive(Debug)]
struct FetchState {
    cache: QueryCache,
    stats: FetchStats,
}

pub struct DataFetcher {
    connection: Arc<dyn BackendConnection>,
    cache_enabled: bool,
    state: Mutex<FetchState>,
}

impl DataFetcher {
    pub fn new(connection: Arc<dyn BackendConnection>) -> Self {
        Self::with_config(connection, &CacheConfig::default())
    }

    pub fn with_config(connection: Arc<dyn BackendConnection>, config: &CacheConfig) -> Self {
        Self {
            connection,
            cache_enabled: config.enabled,
            state: Mutex::new(FetchState {
                cache: QueryCache::with_config(config),
                stats: FetchStats::default(),
            }),
        }
    }

    pub fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        self.connection.dialect()
    }

    /// Serve `query` from cache, or execute and cache it.
    ///
    /// Failed executions are returned as errors and never cached.
    pub async fn try_fetch(&self, query: &RenderedQuery) -> Result<QueryResult> {
        if self.cache_enabled {
            let mut state = self.state.lock().await;
            if let Some(result) = state.cache.get(query).cloned() {
                state.stats.hits += 1;
                tracing::trace!(sql = %query.sql, rows = result.rows.len(), "query cache hit");
                return Ok(result);
            }
            state.stats.misses += 1;
        }

        let start = Instant::now();
        let outcome = self
            .connection
            .execute_sql(&query.sql, &query.params)
            .await;

        let mut state = self.state.lock().await;
        state.stats.executions += 1;
        match outcome {
            Ok(result) => {
                tracing::debug!(
                    sql = %query.sql,
                    params = query.params.len(),
                    rows = result.rows.len(),
                    ms = start.elapsed().as_millis(),
                    "fetched query"
                );
                if self.cache_enabled {
                    state.cache.insert(query, result.clone());
                }
                Ok(result)
            }
            Err(e) => {
                state.stats.failures += 1;
                Err(e)
            }
        }
    }

    /// Like [`DataFetcher::try_fetch`], but a failed execution is logged and
    /// degraded to an empty table so the render cycle can continue.
    pub async fn fetch(&self, query: &RenderedQuery) -> QueryResult {
        match self.try_fetch(query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, sql = %query.sql, "failed to load data");
                QueryResult::empty()
            }
        }
    }

    /// Drop one cached result so the next fetch re-executes it.
    pub async fn invalidate(&self, query: &RenderedQuery) -> bool {
        self.state.lock().await.cache.invalidate(query)
    }

    /// Drop every cached result, e.g. after a known data refresh.
    pub async fn invalidate_all(&self) {
        let mut state = self.state.lock().await;
        tracing::debug!(entries = state.cache.len(), "clearing query cache");
        state.cache.clear();
    }

    pub async fn stats(&self) -> FetchStats {
        self.state.lock().await.stats
    }
}
