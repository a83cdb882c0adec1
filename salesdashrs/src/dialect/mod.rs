//! SQL dialect abstractions for different database backends.
//!
//! Each dialect is implemented in its own file and gated behind a feature flag.

use crate::escape::quote_literal;

/// Dialects render identifiers, placeholders and literal values.
/// Expression tree walking lives in the SQL renderer; the dialect
/// only maps primitive pieces to SQL fragments.
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;
    fn qualify_table(&self, table: &str) -> String {
        self.quote_ident(table).to_string()
    }
    /// Placeholder for the `idx`-th bound parameter (1-based).
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    fn render_literal(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => quote_literal(s),
            // Arrays and objects render as quoted JSON text.
            other => quote_literal(&other.to_string()),
        }
    }
}

// Feature-gated dialect implementations
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbDialect;
