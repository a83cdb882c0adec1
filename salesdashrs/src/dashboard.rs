//! One render cycle: options, predicates, query, fetch, analytics.

use std::sync::Arc;

use serde::Serialize;

use crate::analytics::{analyze, Analytics};
use crate::backends::BackendConnection;
use crate::config::DashboardConfig;
use crate::dropdowns::FilterOptions;
use crate::error::Result;
use crate::executor::QueryResult;
use crate::fetcher::DataFetcher;
use crate::models::FilterSet;
use crate::query_builder::{build_predicates, render_predicates, OrderQueryBuilder, Predicate};
use crate::sql_ast::RenderedQuery;

/// Everything the presentation layer needs for one filter selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub options: FilterOptions,
    /// Active filter conditions as inline SQL, for display.
    pub conditions: Vec<String>,
    /// The orders query as inline SQL, for display.
    pub sql: String,
    pub table: QueryResult,
    /// `None` when the filters matched nothing or the fetch failed.
    pub analytics: Option<Analytics>,
    /// Operator-facing message when the orders query failed.
    pub error: Option<String>,
}

impl DashboardView {
    pub fn has_data(&self) -> bool {
        self.analytics.is_some()
    }
}

pub struct Dashboard {
    fetcher: DataFetcher,
    builder: OrderQueryBuilder,
    all_stores: String,
}

impl Dashboard {
    pub fn new(connection: Arc<dyn BackendConnection>, config: &DashboardConfig) -> Self {
        Self {
            fetcher: DataFetcher::with_config(connection, &config.cache),
            builder: OrderQueryBuilder::new(config.database.view.clone()),
            all_stores: config.filters.all_stores.clone(),
        }
    }

    /// Dashboard over the DuckDB database named in `config`.
    #[cfg(feature = "duckdb")]
    pub fn duckdb(config: &DashboardConfig) -> Self {
        let connection = crate::backends::DuckDbConnection::new(&config.database.path)
            .with_max_concurrency(config.database.max_concurrency);
        Self::new(Arc::new(connection), config)
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    pub fn all_stores(&self) -> &str {
        &self.all_stores
    }

    pub async fn filter_options(&self) -> FilterOptions {
        FilterOptions::populate(&self.fetcher, &self.builder).await
    }

    pub fn predicates(&self, filters: &FilterSet) -> Vec<Predicate> {
        build_predicates(filters, &self.all_stores)
    }

    pub fn query(&self, predicates: &[Predicate]) -> RenderedQuery {
        self.builder.assemble(predicates, self.fetcher.dialect())
    }

    /// Run one render cycle for `filters`.
    ///
    /// A fetch failure yields an empty table with [`DashboardView::error`]
    /// set; only an aggregation contract violation is returned as an error.
    pub async fn render(&self, filters: &FilterSet) -> Result<DashboardView> {
        let options = self.filter_options().await;
        let predicates = self.predicates(filters);
        let dialect = self.fetcher.dialect();
        let conditions = render_predicates(&predicates, dialect);
        let sql = self.builder.assemble_inline(&predicates, dialect);
        let query = self.query(&predicates);
        tracing::debug!(conditions = ?conditions, sql = %sql, "rendering dashboard");

        let (table, error) = match self.fetcher.try_fetch(&query).await {
            Ok(table) => (table, None),
            Err(e) => {
                tracing::error!(error = %e, sql = %query.sql, "failed to load data");
                (QueryResult::empty(), Some(format!("failed to load data: {e}")))
            }
        };
        let analytics = analyze(&table)?;
        if analytics.is_none() && error.is_none() {
            tracing::info!("no data for the selected filters");
        }

        Ok(DashboardView {
            options,
            conditions,
            sql,
            table,
            analytics,
            error,
        })
    }
}
