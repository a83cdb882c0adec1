//! Filter option lists drawn from the distinct values in the view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetcher::DataFetcher;
use crate::models::columns;
use crate::query_builder::OrderQueryBuilder;

/// Filterable dimension with a finite option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Store,
    Product,
    Category,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Store, Dimension::Product, Dimension::Category];

    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Store => columns::STORE_NAME,
            Dimension::Product => columns::PRODUCT_NAME,
            Dimension::Category => columns::CATEGORY_NAME,
        }
    }
}

/// Distinct non-null values of `dimension`, in the order the engine returns them.
pub async fn distinct_values(
    fetcher: &DataFetcher,
    builder: &OrderQueryBuilder,
    dimension: Dimension,
) -> Vec<String> {
    let column = dimension.column();
    let query = builder.distinct_values(column, fetcher.dialect());
    let result = fetcher.fetch(&query).await;
    let values: Vec<String> = result
        .column_values(column)
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    tracing::debug!(dimension = column, options = values.len(), "populated filter options");
    values
}

/// Option lists for every dropdown filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub stores: Vec<String>,
    pub products: Vec<String>,
    pub categories: Vec<String>,
}

impl FilterOptions {
    pub async fn populate(fetcher: &DataFetcher, builder: &OrderQueryBuilder) -> Self {
        Self {
            stores: distinct_values(fetcher, builder, Dimension::Store).await,
            products: distinct_values(fetcher, builder, Dimension::Product).await,
            categories: distinct_values(fetcher, builder, Dimension::Category).await,
        }
    }

    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Store => &self.stores,
            Dimension::Product => &self.products,
            Dimension::Category => &self.categories,
        }
    }

    /// Store choices for a single-select input: the sentinel first, then stores.
    pub fn store_choices(&self, all_stores: &str) -> Vec<String> {
        std::iter::once(all_stores.to_string())
            .chain(self.stores.iter().cloned())
            .collect()
    }
}
