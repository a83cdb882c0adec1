#[cfg(feature = "duckdb")]
use duckdb::types::Value as DuckValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
}

/// Materialized result of one query: named columns and rows as JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of one column in row order; rows missing the field yield `null`.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(name).unwrap_or(&Value::Null))
    }
}

/// JSON form of one fetched cell.
///
/// Numbers (decimals included) become JSON numbers, temporal values become
/// ISO-8601 text, so date keys group and sort chronologically.
#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(i) => Value::from(i),
            Err(_) => Value::from(i as f64),
        },
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => decimal_to_json(&d.to_string()),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::String(hex::encode(bytes)),
        DuckValue::Date32(d) => date32_to_json(d),
        DuckValue::Timestamp(unit, t) => timestamp_to_json(to_micros(unit, t)),
        DuckValue::Time64(unit, t) => time_to_json(to_micros(unit, t)),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(feature = "duckdb")]
fn to_micros(unit: duckdb::types::TimeUnit, value: i64) -> i64 {
    use duckdb::types::TimeUnit;
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Decimal text as a JSON number; out-of-range text is kept as-is.
#[cfg(feature = "duckdb")]
fn decimal_to_json(text: &str) -> Value {
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(text.to_string()),
    }
}

/// Days since the Unix epoch rendered as `YYYY-MM-DD`.
#[cfg(feature = "duckdb")]
fn date32_to_json(days: i32) -> Value {
    // 0001-01-01 is day 1 of the common era; the epoch is day 719_163.
    match chrono::NaiveDate::from_num_days_from_ce_opt(days.saturating_add(719_163)) {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => Value::from(days),
    }
}

/// Microseconds since the Unix epoch rendered as `YYYY-MM-DDTHH:MM:SS[.ffffff]`.
#[cfg(feature = "duckdb")]
fn timestamp_to_json(micros: i64) -> Value {
    match chrono::DateTime::<chrono::Utc>::from_timestamp_micros(micros) {
        Some(ts) => Value::String(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        None => Value::from(micros),
    }
}

/// Microseconds since midnight rendered as `HH:MM:SS[.ffffff]`.
#[cfg(feature = "duckdb")]
fn time_to_json(micros: i64) -> Value {
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    match secs.and_then(|s| chrono::NaiveTime::from_num_seconds_from_midnight_opt(s, nanos)) {
        Some(time) => Value::String(time.format("%H:%M:%S%.f").to_string()),
        None => Value::from(micros),
    }
}

/// Bound parameter for a JSON literal.
#[cfg(feature = "duckdb")]
pub(crate) fn json_to_duck_value(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => DuckValue::BigInt(i),
            None => DuckValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => DuckValue::Text(s.clone()),
        other => DuckValue::Text(other.to_string()),
    }
}
