use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use salesdash::backends::BackendConnection;
use salesdash::dialect::{Dialect, DuckDbDialect};
use salesdash::error::Result;
use salesdash::executor::ColumnMeta;
use salesdash::fetcher::FetchStats;
use salesdash::{Dashboard, DashboardConfig, FilterSet, QueryResult, SalesDashError};
use serde_json::{json, Map, Value};

const ORDER_COLUMNS: [&str; 8] = [
    "order_id",
    "order_date",
    "customer_name",
    "store_name",
    "product_name",
    "category_name",
    "total_price",
    "discount",
];

fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult {
        columns: columns
            .iter()
            .map(|name| ColumnMeta {
                name: name.to_string(),
            })
            .collect(),
        rows: rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .map(|c| c.to_string())
                    .zip(values)
                    .collect::<Map<String, Value>>()
            })
            .collect(),
    }
}

/// In-memory stand-in for the warehouse; answers by inspecting the query.
#[derive(Default)]
struct FakeWarehouse {
    executions: AtomicUsize,
}

impl FakeWarehouse {
    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendConnection for FakeWarehouse {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &DuckDbDialect
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        if sql.starts_with("SELECT DISTINCT") {
            let (column, values) = if sql.contains("\"store_name\"") {
                ("store_name", vec!["Downtown", "Uptown"])
            } else if sql.contains("\"product_name\"") {
                ("product_name", vec!["P1", "P2"])
            } else {
                ("category_name", vec!["Road"])
            };
            return Ok(table(
                &[column],
                values.into_iter().map(|v| vec![json!(v)]).collect(),
            ));
        }

        if params.contains(&json!("%boom%")) {
            return Err(SalesDashError::Execution("connection reset".to_string()));
        }
        if params.contains(&json!("Nowhere")) {
            return Ok(QueryResult::empty());
        }
        let price = if params.contains(&json!("%broken%")) {
            json!("n/a")
        } else {
            json!(100.0)
        };
        Ok(table(
            &ORDER_COLUMNS,
            vec![
                vec![json!(1), json!("2016-01-02"), json!("Ann"), json!("Downtown"), json!("P1"), json!("Road"), price, json!(0.1)],
                vec![json!(1), json!("2016-01-02"), json!("Ann"), json!("Downtown"), json!("P2"), json!("Road"), json!(50.0), json!(0.2)],
                vec![json!(2), json!("2016-01-01"), json!("Bob"), json!("Uptown"), json!("P1"), json!("Road"), json!(30.0), json!(0.0)],
            ],
        ))
    }
}

fn dashboard() -> (Arc<FakeWarehouse>, Dashboard) {
    let backend = Arc::new(FakeWarehouse::default());
    let dashboard = Dashboard::new(backend.clone(), &DashboardConfig::default());
    (backend, dashboard)
}

#[tokio::test]
async fn unfiltered_render_produces_analytics() {
    let (_, dashboard) = dashboard();
    let view = dashboard.render(&FilterSet::default()).await.unwrap();

    assert!(view.conditions.is_empty());
    assert!(view.error.is_none());
    assert!(!view.sql.contains("WHERE"));
    assert_eq!(view.options.stores, vec!["Downtown", "Uptown"]);
    assert_eq!(
        view.options.store_choices(dashboard.all_stores()),
        vec!["all", "Downtown", "Uptown"]
    );
    assert_eq!(view.table.len(), 3);
    assert!(view.has_data());

    let analytics = view.analytics.unwrap();
    assert_eq!(
        analytics.aggregates.product_ranks.rows,
        table(
            &["product_name", "product_sales_rank"],
            vec![vec![json!("P1"), json!(1.0)], vec![json!("P2"), json!(2.0)]],
        )
        .rows
    );
    assert_eq!(
        analytics.aggregates.sales_by_store.rows,
        table(
            &["store_name", "total_price"],
            vec![
                vec![json!("Downtown"), json!(150.0)],
                vec![json!("Uptown"), json!(30.0)],
            ],
        )
        .rows
    );
}

#[tokio::test]
async fn no_match_reports_no_data() {
    let (_, dashboard) = dashboard();
    let view = dashboard
        .render(&FilterSet::new().store("Nowhere"))
        .await
        .unwrap();
    assert_eq!(view.conditions, vec!["(\"store_name\" = 'Nowhere')"]);
    assert!(view.table.is_empty());
    assert!(!view.has_data());
    assert!(view.error.is_none());
    assert_eq!(view.options.products, vec!["P1", "P2"]);
}

#[tokio::test]
async fn repeated_selection_is_served_from_cache() {
    let (backend, dashboard) = dashboard();
    let a = FilterSet::new().store("Downtown");
    let b = FilterSet::new().store("Uptown");

    let first = dashboard.render(&a).await.unwrap();
    dashboard.render(&b).await.unwrap();
    let again = dashboard.render(&a).await.unwrap();

    // Three dropdown queries plus one per distinct selection.
    assert_eq!(backend.executions(), 5);
    assert_eq!(first.table, again.table);
    assert_eq!(
        dashboard.fetcher().stats().await,
        FetchStats {
            hits: 7,
            misses: 5,
            executions: 5,
            failures: 0,
        }
    );

    dashboard.fetcher().invalidate_all().await;
    dashboard.render(&a).await.unwrap();
    assert_eq!(backend.executions(), 9);
}

#[tokio::test]
async fn backend_failure_degrades_to_empty_view() {
    let (backend, dashboard) = dashboard();
    let filters = FilterSet::new().customer("boom");

    let view = dashboard.render(&filters).await.unwrap();
    assert!(view.table.is_empty());
    assert!(!view.has_data());
    let message = view.error.expect("failure reported to the analyst");
    assert!(message.contains("connection reset"), "{message}");
    assert_eq!(view.options.categories, vec!["Road"]);

    // Failures are not cached, so the retry reaches the backend again.
    dashboard.render(&filters).await.unwrap();
    assert_eq!(backend.executions(), 5);
    assert_eq!(dashboard.fetcher().stats().await.failures, 2);
}

#[tokio::test]
async fn non_numeric_price_fails_the_render() {
    let (_, dashboard) = dashboard();
    let err = dashboard
        .render(&FilterSet::new().customer("broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, SalesDashError::Aggregation(_)), "{err}");
}
