//! Query assembly over the denormalized order-details view.

use crate::dialect::Dialect;
use crate::models::columns;
use crate::sql_ast::{
    LiteralMode, OrderItem, RenderedQuery, SelectQuery, SortDirection, SqlExpr, SqlRenderer,
};

mod filters;

pub use filters::{build_predicates, render_predicates, Predicate};

/// Default view joining order items with store, product, category and customer.
pub const ORDER_DETAILS_VIEW: &str = "order_details";

pub struct OrderQueryBuilder {
    view: String,
}

impl Default for OrderQueryBuilder {
    fn default() -> Self {
        Self::new(ORDER_DETAILS_VIEW)
    }
}

impl OrderQueryBuilder {
    pub fn new(view: impl Into<String>) -> Self {
        Self { view: view.into() }
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Every column of the view, predicates ANDed, newest orders first.
    pub fn orders_query(&self, predicates: &[Predicate]) -> SelectQuery {
        SelectQuery {
            select: vec![SqlExpr::Wildcard],
            from: self.view.clone(),
            filters: predicates.iter().map(Predicate::to_sql_expr).collect(),
            order_by: vec![OrderItem {
                expr: SqlExpr::column(columns::ORDER_DATE),
                direction: SortDirection::Desc,
            }],
            ..Default::default()
        }
    }

    /// Orders query with values bound as parameters, ready for execution.
    pub fn assemble(&self, predicates: &[Predicate], dialect: &dyn Dialect) -> RenderedQuery {
        SqlRenderer::new(dialect)
            .with_mode(LiteralMode::Bound)
            .render_select(&self.orders_query(predicates))
    }

    /// Orders query with escaped inline literals.
    pub fn assemble_inline(&self, predicates: &[Predicate], dialect: &dyn Dialect) -> String {
        SqlRenderer::new(dialect)
            .render_select(&self.orders_query(predicates))
            .sql
    }

    /// `SELECT DISTINCT <column>` over the view, used for filter option lists.
    pub fn distinct_values(&self, column: &str, dialect: &dyn Dialect) -> RenderedQuery {
        let query = SelectQuery {
            distinct: true,
            select: vec![SqlExpr::column(column)],
            from: self.view.clone(),
            ..Default::default()
        };
        SqlRenderer::new(dialect).render_select(&query)
    }
}
