use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// `*`
    Wildcard,
    Column(String),
    Literal(Value),
    Cast {
        expr: Box<SqlExpr>,
        data_type: String,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn column(name: impl Into<String>) -> Self {
        SqlExpr::Column(name.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        SqlExpr::Literal(Value::String(value.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Eq,
    /// Case-insensitive `LIKE`.
    ILike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub distinct: bool,
    pub select: Vec<SqlExpr>,
    /// Table or view name, optionally `schema.name`.
    pub from: String,
    pub filters: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
}

/// SQL text together with the values bound to its placeholders.
///
/// Two renders of the same query compare equal, which is what makes the
/// rendered form usable as a result-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedQuery {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RenderedQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Normalized cache key: SQL text plus the JSON encoding of the parameters.
    pub fn cache_key(&self) -> String {
        if self.params.is_empty() {
            return self.sql.clone();
        }
        let params = Value::Array(self.params.clone());
        format!("{}\u{1f}{}", self.sql, params)
    }
}

impl From<String> for RenderedQuery {
    fn from(sql: String) -> Self {
        RenderedQuery::new(sql)
    }
}

impl From<&str> for RenderedQuery {
    fn from(sql: &str) -> Self {
        RenderedQuery::new(sql)
    }
}

/// How literal values reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralMode {
    /// Escaped literals written into the text.
    Inline,
    /// Placeholders in the text, values returned alongside.
    Bound,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
    mode: LiteralMode,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            mode: LiteralMode::Inline,
        }
    }

    pub fn with_mode(mut self, mode: LiteralMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn render_select(&self, query: &SelectQuery) -> RenderedQuery {
        let mut params = Vec::new();
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|expr| self.render_expr(expr, &mut params))
            .collect();

        let distinct_kw = if query.distinct { "DISTINCT " } else { "" };
        let mut sql = format!(
            "SELECT {distinct_kw}{} FROM {}",
            select_items.join(", "),
            self.dialect.qualify_table(&query.from)
        );

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|f| self.render_expr(f, &mut params))
                .collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.render_expr(&o.expr, &mut params);
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{expr} {dir}")
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        RenderedQuery { sql, params }
    }

    /// Render a standalone expression. Bound values are appended to `params`.
    pub fn render_expr(&self, expr: &SqlExpr, params: &mut Vec<Value>) -> String {
        match expr {
            SqlExpr::Wildcard => "*".to_string(),
            SqlExpr::Column(name) => self.dialect.quote_ident(name),
            SqlExpr::Literal(v) => match self.mode {
                LiteralMode::Inline => self.dialect.render_literal(v),
                LiteralMode::Bound => {
                    params.push(v.clone());
                    self.dialect.placeholder(params.len())
                }
            },
            SqlExpr::Cast { expr, data_type } => {
                format!("CAST({} AS {data_type})", self.render_expr(expr, params))
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::ILike => "ILIKE",
                };
                let left = self.render_expr(left, params);
                let right = self.render_expr(right, params);
                format!("({left} {op_sql} {right})")
            }
            SqlExpr::Between { expr, low, high } => {
                let expr = self.render_expr(expr, params);
                let low = self.render_expr(low, params);
                let high = self.render_expr(high, params);
                format!("({expr} BETWEEN {low} AND {high})")
            }
            SqlExpr::InList { expr, list } => {
                let expr = self.render_expr(expr, params);
                let rendered_values: Vec<String> =
                    list.iter().map(|v| self.render_expr(v, params)).collect();
                format!("{expr} IN ({})", rendered_values.join(", "))
            }
        }
    }
}
