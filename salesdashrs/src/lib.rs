pub mod analytics;
pub mod backends;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod dialect;
pub mod dropdowns;
pub mod error;
pub mod escape;
pub mod executor;
pub mod fetcher;
pub mod models;
pub mod query_builder;
pub mod sql_ast;
pub mod telemetry;

pub use analytics::{analyze, transform, Aggregates, Analytics, DerivedTable};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardView};
pub use error::SalesDashError;
pub use executor::QueryResult;
pub use fetcher::DataFetcher;
pub use models::{DateRange, FilterSet};
pub use query_builder::{build_predicates, OrderQueryBuilder, Predicate};
pub use sql_ast::RenderedQuery;
