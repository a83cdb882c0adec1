//! Single-quote escaping for text embedded in SQL string literals.
//!
//! This is a syntactic safety net for inline rendering only. Queries sent to a
//! backend bind their values as parameters; the escaper guards the inline form
//! used for display, logging, and backends without binding.

/// Double every single quote so the value cannot close its enclosing literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Reverse of [`escape_literal`]: halve every doubled single quote.
pub fn unescape_literal(value: &str) -> String {
    value.replace("''", "'")
}

/// Escape and wrap in single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}
