use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::models::{columns, DateRange, FilterSet};
use crate::sql_ast::{SqlBinaryOperator, SqlExpr, SqlRenderer};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One independent filter condition contributed by a single filter input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// `order_date BETWEEN start AND end`, both ends inclusive.
    DateBetween { start: NaiveDate, end: NaiveDate },
    DateEquals { date: NaiveDate },
    /// Case-insensitive substring match on the customer name.
    CustomerContains { text: String },
    StoreEquals { store: String },
    ProductIn { products: Vec<String> },
    CategoryIn { categories: Vec<String> },
}

impl Predicate {
    pub fn to_sql_expr(&self) -> SqlExpr {
        match self {
            Predicate::DateBetween { start, end } => SqlExpr::Between {
                expr: Box::new(SqlExpr::column(columns::ORDER_DATE)),
                low: Box::new(date_literal(start)),
                high: Box::new(date_literal(end)),
            },
            Predicate::DateEquals { date } => {
                binary(SqlBinaryOperator::Eq, columns::ORDER_DATE, date_literal(date))
            }
            Predicate::CustomerContains { text } => binary(
                SqlBinaryOperator::ILike,
                columns::CUSTOMER_NAME,
                SqlExpr::text(format!("%{text}%")),
            ),
            Predicate::StoreEquals { store } => binary(
                SqlBinaryOperator::Eq,
                columns::STORE_NAME,
                SqlExpr::text(store.as_str()),
            ),
            Predicate::ProductIn { products } => membership(columns::PRODUCT_NAME, products),
            Predicate::CategoryIn { categories } => {
                membership(columns::CATEGORY_NAME, categories)
            }
        }
    }

    /// The condition as inline SQL with escaped literals, for display.
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        SqlRenderer::new(dialect).render_expr(&self.to_sql_expr(), &mut Vec::new())
    }
}

/// Dates travel as `YYYY-MM-DD` text with an explicit cast, so a bound
/// parameter compares as a date rather than as a string.
fn date_literal(date: &NaiveDate) -> SqlExpr {
    SqlExpr::Cast {
        expr: Box::new(SqlExpr::text(date.format(DATE_FORMAT).to_string())),
        data_type: "DATE".to_string(),
    }
}

fn binary(op: SqlBinaryOperator, column: &str, right: SqlExpr) -> SqlExpr {
    SqlExpr::BinaryOp {
        op,
        left: Box::new(SqlExpr::column(column)),
        right: Box::new(right),
    }
}

fn membership(column: &str, values: &[String]) -> SqlExpr {
    SqlExpr::InList {
        expr: Box::new(SqlExpr::column(column)),
        list: values.iter().map(|v| SqlExpr::text(v.as_str())).collect(),
    }
}

/// Translate a filter selection into its predicates.
///
/// Absent, empty and sentinel inputs contribute nothing. Output order is fixed:
/// date, customer, store, products, categories.
pub fn build_predicates(filters: &FilterSet, all_stores: &str) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    match filters.date_range {
        DateRange::Between(start, end) => predicates.push(Predicate::DateBetween { start, end }),
        DateRange::Single(date) => predicates.push(Predicate::DateEquals { date }),
        DateRange::Empty => {}
    }

    if let Some(text) = filters.customer.as_deref().filter(|t| !t.is_empty()) {
        predicates.push(Predicate::CustomerContains {
            text: text.to_string(),
        });
    }

    if let Some(store) = filters
        .store
        .as_deref()
        .filter(|s| !s.is_empty() && *s != all_stores)
    {
        predicates.push(Predicate::StoreEquals {
            store: store.to_string(),
        });
    }

    if !filters.products.is_empty() {
        predicates.push(Predicate::ProductIn {
            products: filters.products.clone(),
        });
    }

    if !filters.categories.is_empty() {
        predicates.push(Predicate::CategoryIn {
            categories: filters.categories.clone(),
        });
    }

    tracing::trace!(count = predicates.len(), "built filter predicates");
    predicates
}

/// Inline rendering of every predicate, in order.
pub fn render_predicates(predicates: &[Predicate], dialect: &dyn Dialect) -> Vec<String> {
    predicates.iter().map(|p| p.render(dialect)).collect()
}
