//! Database backend implementations.
//!
//! Each backend is implemented in its own file and gated behind a feature flag.

use async_trait::async_trait;
use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::QueryResult;

/// Unified interface for all database backends.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);

    /// Execute a read-only query and materialize every row.
    ///
    /// `params` are bound positionally to the dialect's placeholders.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;
}

// Feature-gated backend implementations
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;
