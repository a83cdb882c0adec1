use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store selection meaning "do not filter by store".
pub const ALL_STORES: &str = "all";

/// Columns of the order-details view referenced by filters and analytics.
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const ORDER_DATE: &str = "order_date";
    pub const CUSTOMER_NAME: &str = "customer_name";
    pub const STORE_NAME: &str = "store_name";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const CATEGORY_NAME: &str = "category_name";
    pub const TOTAL_PRICE: &str = "total_price";
    pub const DISCOUNT: &str = "discount";
}

/// Order-date selection: nothing, one day, or an inclusive range.
///
/// Serialized as an array of zero, one or two `YYYY-MM-DD` dates, the shape a
/// date-range picker hands over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub enum DateRange {
    #[default]
    Empty,
    Single(NaiveDate),
    Between(NaiveDate, NaiveDate),
}

impl DateRange {
    /// Inclusive range; endpoints given in either order.
    pub fn between(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            DateRange::Between(a, b)
        } else {
            DateRange::Between(b, a)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DateRange::Empty)
    }
}

impl TryFrom<Vec<NaiveDate>> for DateRange {
    type Error = String;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self, Self::Error> {
        match dates.as_slice() {
            [] => Ok(DateRange::Empty),
            [day] => Ok(DateRange::Single(*day)),
            [start, end] => Ok(DateRange::between(*start, *end)),
            more => Err(format!(
                "date range takes at most two dates, got {}",
                more.len()
            )),
        }
    }
}

impl From<DateRange> for Vec<NaiveDate> {
    fn from(range: DateRange) -> Self {
        match range {
            DateRange::Empty => Vec::new(),
            DateRange::Single(day) => vec![day],
            DateRange::Between(start, end) => vec![start, end],
        }
    }
}

/// The analyst's current selection. Every field is independently optional;
/// the default value filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub date_range: DateRange,
    /// Case-insensitive substring of the customer name.
    pub customer: Option<String>,
    /// Single store, or the "all" sentinel.
    pub store: Option<String>,
    pub products: Vec<String>,
    pub categories: Vec<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, day: NaiveDate) -> Self {
        self.date_range = DateRange::Single(day);
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = DateRange::between(start, end);
        self
    }

    pub fn customer(mut self, text: impl Into<String>) -> Self {
        self.customer = Some(text.into());
        self
    }

    pub fn store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = products.into_iter().map(Into::into).collect();
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}
