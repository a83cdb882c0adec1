//! Derived columns and chart aggregates over a fetched order table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SalesDashError};
use crate::executor::{ColumnMeta, QueryResult};
use crate::models::columns;

pub mod frame;

use frame::{
    compare_keys, dense_rank_desc, group_indices, group_mean, group_nunique, group_sum,
    grouped_rolling_mean, numeric_column, Groups, Row,
};

/// Rows per moving-average window.
pub const MOVING_AVERAGE_WINDOW: usize = 3;

/// Names of the columns added by [`transform`].
pub mod derived {
    pub const PRODUCT_SALES_RANK: &str = "product_sales_rank";
    pub const STORE_SALES_RANK: &str = "store_sales_rank";
    pub const MOVING_AVG_SALES: &str = "moving_avg_sales";
    pub const AVG_DISCOUNT: &str = "avg_discount";

    pub const ALL: [&str; 4] = [
        PRODUCT_SALES_RANK,
        MOVING_AVG_SALES,
        STORE_SALES_RANK,
        AVG_DISCOUNT,
    ];
}

/// A fetched table plus the derived columns. Only non-empty tables carry them.
pub type DerivedTable = QueryResult;

fn require_columns(table: &QueryResult, names: &[&str]) -> Result<()> {
    for name in names {
        if !table.has_column(name) {
            return Err(SalesDashError::Aggregation(format!(
                "missing required column {name}"
            )));
        }
    }
    Ok(())
}

fn to_json(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn set_column(table: &mut QueryResult, name: &str, values: Vec<Value>) {
    for (row, value) in table.rows.iter_mut().zip(values) {
        row.insert(name.to_string(), value);
    }
    if !table.has_column(name) {
        table.columns.push(ColumnMeta {
            name: name.to_string(),
        });
    }
}

/// Dense sales rank of each row's group, ranked on summed `total_price`.
fn sales_rank(rows: &[Row], key: &str, total_price: &[Option<f64>]) -> Vec<Value> {
    let groups = group_indices(rows, key);
    let per_row_sum = groups.broadcast(&group_sum(&groups, total_price));
    dense_rank_desc(&per_row_sum)
        .into_iter()
        .map(|rank| to_json(rank.map(|r| r as f64)))
        .collect()
}

/// Add the derived columns to a copy of `table`.
///
/// An empty table is returned unchanged, without derived columns. A
/// non-numeric `total_price` or `discount` is an error.
pub fn transform(table: &QueryResult) -> Result<DerivedTable> {
    if table.is_empty() {
        return Ok(table.clone());
    }
    require_columns(
        table,
        &[
            columns::ORDER_DATE,
            columns::STORE_NAME,
            columns::PRODUCT_NAME,
            columns::TOTAL_PRICE,
            columns::DISCOUNT,
        ],
    )?;

    let rows = &table.rows;
    let total_price = numeric_column(rows, columns::TOTAL_PRICE)?;
    let discount = numeric_column(rows, columns::DISCOUNT)?;

    let product_rank = sales_rank(rows, columns::PRODUCT_NAME, &total_price);
    let store_rank = sales_rank(rows, columns::STORE_NAME, &total_price);

    let by_date = group_indices(rows, columns::ORDER_DATE);
    let moving_avg: Vec<Value> =
        grouped_rolling_mean(&by_date, &total_price, MOVING_AVERAGE_WINDOW)
            .into_iter()
            .map(to_json)
            .collect();

    let by_product = group_indices(rows, columns::PRODUCT_NAME);
    let avg_discount: Vec<Value> = by_product
        .broadcast(&group_mean(&by_product, &discount))
        .into_iter()
        .map(|v| to_json(v.flatten()))
        .collect();

    let mut out = table.clone();
    set_column(&mut out, derived::PRODUCT_SALES_RANK, product_rank);
    set_column(&mut out, derived::MOVING_AVG_SALES, moving_avg);
    set_column(&mut out, derived::STORE_SALES_RANK, store_rank);
    set_column(&mut out, derived::AVG_DISCOUNT, avg_discount);

    tracing::debug!(rows = out.rows.len(), "computed derived columns");
    Ok(out)
}

/// Whether `table` carries every derived column.
pub fn has_derived_columns(table: &DerivedTable) -> bool {
    derived::ALL.iter().all(|name| table.has_column(name))
}

/// Two-column table `(key, value_column)`, one row per group, sorted by key.
fn group_table(key: &str, value_column: &str, groups: &Groups, values: Vec<Value>) -> QueryResult {
    let mut pairs: Vec<(Value, Value)> = groups.keys().iter().cloned().zip(values).collect();
    pairs.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    QueryResult {
        columns: vec![
            ColumnMeta {
                name: key.to_string(),
            },
            ColumnMeta {
                name: value_column.to_string(),
            },
        ],
        rows: pairs
            .into_iter()
            .map(|(k, v)| {
                let mut row = Map::new();
                row.insert(key.to_string(), k);
                row.insert(value_column.to_string(), v);
                row
            })
            .collect(),
    }
}

fn sum_by(table: &DerivedTable, key: &str) -> Result<QueryResult> {
    let total_price = numeric_column(&table.rows, columns::TOTAL_PRICE)?;
    let groups = group_indices(&table.rows, key);
    let sums = group_sum(&groups, &total_price)
        .into_iter()
        .map(Value::from)
        .collect();
    Ok(group_table(key, columns::TOTAL_PRICE, &groups, sums))
}

/// Distinct `(key, rank)` pairs ordered by rank, first appearance breaking ties.
fn rank_table(table: &DerivedTable, key: &str, rank_column: &str) -> QueryResult {
    let mut seen = std::collections::HashSet::new();
    let mut pairs: Vec<(Value, Value)> = Vec::new();
    for row in &table.rows {
        let k = row.get(key).cloned().unwrap_or(Value::Null);
        let r = row.get(rank_column).cloned().unwrap_or(Value::Null);
        if seen.insert(format!("{k}\u{1f}{r}")) {
            pairs.push((k, r));
        }
    }
    // Missing ranks sort last.
    pairs.sort_by(|(_, a), (_, b)| match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    QueryResult {
        columns: vec![
            ColumnMeta {
                name: key.to_string(),
            },
            ColumnMeta {
                name: rank_column.to_string(),
            },
        ],
        rows: pairs
            .into_iter()
            .map(|(k, r)| {
                let mut row = Map::new();
                row.insert(key.to_string(), k);
                row.insert(rank_column.to_string(), r);
                row
            })
            .collect(),
    }
}

/// Per-dimension tables for charts and rank listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    /// Sum of `total_price` by product.
    pub sales_by_product: QueryResult,
    /// Sum of `total_price` by customer.
    pub sales_by_customer: QueryResult,
    /// Distinct `order_id` count by `order_date`.
    pub orders_over_time: QueryResult,
    /// Mean of `avg_discount` by product.
    pub discount_by_product: QueryResult,
    /// Sum of `total_price` by store.
    pub sales_by_store: QueryResult,
    /// Sum of `total_price` by category.
    pub sales_by_category: QueryResult,
    pub product_ranks: QueryResult,
    pub store_ranks: QueryResult,
}

/// Build every aggregate table from a derived table.
pub fn aggregates(table: &DerivedTable) -> Result<Aggregates> {
    require_columns(
        table,
        &[
            columns::ORDER_ID,
            columns::CUSTOMER_NAME,
            columns::CATEGORY_NAME,
        ],
    )?;
    require_columns(table, &derived::ALL)?;

    let by_date = group_indices(&table.rows, columns::ORDER_DATE);
    let order_counts = group_nunique(&by_date, &table.rows, columns::ORDER_ID)
        .into_iter()
        .map(Value::from)
        .collect();

    let avg_discount = numeric_column(&table.rows, derived::AVG_DISCOUNT)?;
    let by_product = group_indices(&table.rows, columns::PRODUCT_NAME);
    let discounts = group_mean(&by_product, &avg_discount)
        .into_iter()
        .map(to_json)
        .collect();

    Ok(Aggregates {
        sales_by_product: sum_by(table, columns::PRODUCT_NAME)?,
        sales_by_customer: sum_by(table, columns::CUSTOMER_NAME)?,
        orders_over_time: group_table(columns::ORDER_DATE, columns::ORDER_ID, &by_date, order_counts),
        discount_by_product: group_table(
            columns::PRODUCT_NAME,
            derived::AVG_DISCOUNT,
            &by_product,
            discounts,
        ),
        sales_by_store: sum_by(table, columns::STORE_NAME)?,
        sales_by_category: sum_by(table, columns::CATEGORY_NAME)?,
        product_ranks: rank_table(table, columns::PRODUCT_NAME, derived::PRODUCT_SALES_RANK),
        store_ranks: rank_table(table, columns::STORE_NAME, derived::STORE_SALES_RANK),
    })
}

/// Derived table and aggregates for one non-empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub derived: DerivedTable,
    pub aggregates: Aggregates,
}

/// Full analytics pass; `None` for an empty table ("no data").
pub fn analyze(table: &QueryResult) -> Result<Option<Analytics>> {
    if table.is_empty() {
        return Ok(None);
    }
    let derived = transform(table)?;
    let aggregates = aggregates(&derived)?;
    Ok(Some(Analytics {
        derived,
        aggregates,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: [&str; 9] = [
        "order_id",
        "order_date",
        "customer_name",
        "store_name",
        "product_name",
        "category_name",
        "total_price",
        "discount",
        "quantity",
    ];

    /// (order_id, date, customer, store, product, category, total_price, discount)
    type Line<'a> = (i64, &'a str, &'a str, &'a str, &'a str, &'a str, Value, Value);

    fn table(lines: Vec<Line<'_>>) -> QueryResult {
        let rows = lines
            .into_iter()
            .map(|(id, date, customer, store, product, category, price, discount)| {
                let values = [
                    json!(id),
                    json!(date),
                    json!(customer),
                    json!(store),
                    json!(product),
                    json!(category),
                    price,
                    discount,
                    json!(1),
                ];
                COLUMNS
                    .iter()
                    .map(|c| c.to_string())
                    .zip(values)
                    .collect::<Map<String, Value>>()
            })
            .collect();
        QueryResult {
            columns: COLUMNS
                .iter()
                .map(|c| ColumnMeta {
                    name: c.to_string(),
                })
                .collect(),
            rows,
        }
    }

    fn column(table: &QueryResult, name: &str) -> Vec<Value> {
        table.column_values(name).cloned().collect()
    }

    fn scenario() -> QueryResult {
        table(vec![
            (1, "2024-01-01", "Ann", "Downtown", "P1", "Road", json!(100), json!(0.1)),
            (2, "2024-01-01", "Bob", "Uptown", "P1", "Road", json!(200), json!(0.2)),
            (3, "2024-01-01", "Ann", "Downtown", "P2", "Kids", json!(50), json!(0.05)),
        ])
    }

    #[test]
    fn empty_table_is_returned_unchanged() {
        let empty = QueryResult {
            columns: COLUMNS
                .iter()
                .map(|c| ColumnMeta {
                    name: c.to_string(),
                })
                .collect(),
            rows: vec![],
        };
        let derived = transform(&empty).unwrap();
        assert_eq!(derived, empty);
        assert!(!has_derived_columns(&derived));
        assert!(analyze(&empty).unwrap().is_none());
        assert!(analyze(&QueryResult::empty()).unwrap().is_none());
    }

    #[test]
    fn product_rank_scenario() {
        let derived = transform(&scenario()).unwrap();
        assert!(has_derived_columns(&derived));
        assert_eq!(
            column(&derived, "product_sales_rank"),
            vec![json!(1.0), json!(1.0), json!(2.0)]
        );
        // Downtown 150, Uptown 200.
        assert_eq!(
            column(&derived, "store_sales_rank"),
            vec![json!(2.0), json!(1.0), json!(2.0)]
        );
    }

    #[test]
    fn moving_average_within_date_group() {
        let derived = transform(&scenario()).unwrap();
        let avg = column(&derived, "moving_avg_sales");
        assert_eq!(avg[0], Value::Null);
        assert_eq!(avg[1], Value::Null);
        let third = avg[2].as_f64().unwrap();
        assert!((third - 350.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn short_date_groups_have_no_average() {
        let t = table(vec![
            (1, "2024-01-02", "A", "S", "P", "C", json!(10), json!(0)),
            (2, "2024-01-01", "A", "S", "P", "C", json!(20), json!(0)),
            (3, "2024-01-01", "A", "S", "P", "C", json!(30), json!(0)),
        ]);
        let derived = transform(&t).unwrap();
        assert!(column(&derived, "moving_avg_sales")
            .iter()
            .all(Value::is_null));
    }

    #[test]
    fn avg_discount_broadcast_per_product() {
        let derived = transform(&scenario()).unwrap();
        let discounts: Vec<f64> = column(&derived, "avg_discount")
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert!((discounts[0] - 0.15).abs() < 1e-9);
        assert!((discounts[1] - 0.15).abs() < 1e-9);
        assert!((discounts[2] - 0.05).abs() < 1e-9);
    }

    #[test]
    fn decimal_text_is_numeric() {
        let t = table(vec![
            (1, "2024-01-01", "A", "S", "P1", "C", json!("10.50"), json!("0.10")),
            (2, "2024-01-01", "A", "S", "P2", "C", json!("99.99"), json!("0.00")),
        ]);
        let derived = transform(&t).unwrap();
        assert_eq!(
            column(&derived, "product_sales_rank"),
            vec![json!(2.0), json!(1.0)]
        );
    }

    #[test]
    fn non_numeric_price_is_fatal() {
        let t = table(vec![(
            1,
            "2024-01-01",
            "A",
            "S",
            "P",
            "C",
            json!("n/a"),
            json!(0),
        )]);
        assert!(matches!(
            transform(&t),
            Err(SalesDashError::Aggregation(_))
        ));
    }

    #[test]
    fn missing_column_is_fatal() {
        let mut t = scenario();
        t.columns.retain(|c| c.name != "discount");
        assert!(matches!(
            transform(&t),
            Err(SalesDashError::Aggregation(_))
        ));
    }

    #[test]
    fn aggregate_tables() {
        let mut t = scenario();
        t.rows.push(
            table(vec![(
                3,
                "2023-12-31",
                "Cy",
                "Uptown",
                "P2",
                "Kids",
                json!(25),
                json!(0.05),
            )])
            .rows
            .remove(0),
        );
        let analytics = analyze(&t).unwrap().unwrap();
        let agg = &analytics.aggregates;

        assert_eq!(
            agg.sales_by_product.rows,
            vec![
                Map::from_iter([
                    ("product_name".to_string(), json!("P1")),
                    ("total_price".to_string(), json!(300.0)),
                ]),
                Map::from_iter([
                    ("product_name".to_string(), json!("P2")),
                    ("total_price".to_string(), json!(75.0)),
                ]),
            ]
        );
        assert_eq!(
            column(&agg.sales_by_customer, "customer_name"),
            vec![json!("Ann"), json!("Bob"), json!("Cy")]
        );
        assert_eq!(
            column(&agg.orders_over_time, "order_date"),
            vec![json!("2023-12-31"), json!("2024-01-01")]
        );
        assert_eq!(
            column(&agg.orders_over_time, "order_id"),
            vec![json!(1), json!(3)]
        );
        assert_eq!(
            column(&agg.sales_by_category, "total_price"),
            vec![json!(75.0), json!(300.0)]
        );
        assert_eq!(
            column(&agg.sales_by_store, "store_name"),
            vec![json!("Downtown"), json!("Uptown")]
        );
        let discount = column(&agg.discount_by_product, "avg_discount");
        assert!((discount[0].as_f64().unwrap() - 0.15).abs() < 1e-9);
        assert!((discount[1].as_f64().unwrap() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn rank_tables_are_distinct_and_sorted() {
        let analytics = analyze(&scenario()).unwrap().unwrap();
        let ranks = &analytics.aggregates.product_ranks;
        assert_eq!(column(ranks, "product_name"), vec![json!("P1"), json!("P2")]);
        assert_eq!(
            column(ranks, "product_sales_rank"),
            vec![json!(1.0), json!(2.0)]
        );
        let stores = &analytics.aggregates.store_ranks;
        assert_eq!(
            column(stores, "store_name"),
            vec![json!("Uptown"), json!("Downtown")]
        );
    }
}
