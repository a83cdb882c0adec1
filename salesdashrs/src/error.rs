use thiserror::Error;

pub type Result<T> = std::result::Result<T, SalesDashError>;

#[derive(Debug, Error)]
pub enum SalesDashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error("execution error: {0}")]
    Execution(String),
    /// A numeric aggregate met a value that is not a number. Indicates an
    /// upstream schema mismatch and is never recovered.
    #[error("aggregation error: {0}")]
    Aggregation(String),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
