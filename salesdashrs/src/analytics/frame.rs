//! Table-transform primitives: grouping, numeric extraction, reducers,
//! dense ranking and rolling windows.
//!
//! Each primitive works on plain row slices and per-row value vectors, so the
//! derived columns in the parent module are compositions of these pieces.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::error::{Result, SalesDashError};

pub type Row = Map<String, Value>;

/// Rows partitioned by exact equality of one column's value.
///
/// Groups are numbered in order of first appearance, and each group keeps
/// its member rows in table order. Rows whose key is null or absent belong
/// to no group.
#[derive(Debug, Clone, Default)]
pub struct Groups {
    keys: Vec<Value>,
    members: Vec<Vec<usize>>,
    row_group: Vec<Option<usize>>,
}

impl Groups {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// Row indices of group `idx`, in table order.
    pub fn members(&self, idx: usize) -> &[usize] {
        &self.members[idx]
    }

    /// Group of row `row`, if its key is non-null.
    pub fn group_of(&self, row: usize) -> Option<usize> {
        self.row_group.get(row).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &[usize])> {
        self.keys
            .iter()
            .zip(self.members.iter().map(Vec::as_slice))
    }

    /// Per-group values spread back onto every row; ungrouped rows get `None`.
    pub fn broadcast<T: Clone>(&self, per_group: &[T]) -> Vec<Option<T>> {
        self.row_group
            .iter()
            .map(|g| g.map(|idx| per_group[idx].clone()))
            .collect()
    }
}

/// Exact-equality key: the JSON encoding distinguishes `"1"` from `1`.
fn key_of(value: &Value) -> String {
    value.to_string()
}

pub fn group_indices(rows: &[Row], column: &str) -> Groups {
    let mut lookup: HashMap<String, usize> = HashMap::new();
    let mut groups = Groups {
        row_group: Vec::with_capacity(rows.len()),
        ..Groups::default()
    };
    for (row_idx, row) in rows.iter().enumerate() {
        let value = row.get(column).unwrap_or(&Value::Null);
        if value.is_null() {
            groups.row_group.push(None);
            continue;
        }
        let idx = *lookup.entry(key_of(value)).or_insert_with(|| {
            groups.keys.push(value.clone());
            groups.members.push(Vec::new());
            groups.keys.len() - 1
        });
        groups.members[idx].push(row_idx);
        groups.row_group.push(Some(idx));
    }
    groups
}

/// Numeric content of a cell. `null` is missing; numbers and numeric strings
/// (DuckDB decimals arrive as text) are values; anything else is a contract
/// violation.
pub fn numeric(value: &Value, column: &str) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| {
            SalesDashError::Aggregation(format!("column {column}: unrepresentable number {n}"))
        }),
        Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            SalesDashError::Aggregation(format!("column {column}: non-numeric value {s:?}"))
        }),
        other => Err(SalesDashError::Aggregation(format!(
            "column {column}: non-numeric value {other}"
        ))),
    }
}

pub fn numeric_column(rows: &[Row], column: &str) -> Result<Vec<Option<f64>>> {
    rows.iter()
        .map(|row| numeric(row.get(column).unwrap_or(&Value::Null), column))
        .collect()
}

/// Sum per group, skipping missing values. A group of only missing values sums to 0.
pub fn group_sum(groups: &Groups, values: &[Option<f64>]) -> Vec<f64> {
    groups
        .iter()
        .map(|(_, members)| members.iter().filter_map(|&i| values[i]).sum())
        .collect()
}

/// Mean per group, skipping missing values; `None` when nothing remains.
pub fn group_mean(groups: &Groups, values: &[Option<f64>]) -> Vec<Option<f64>> {
    groups
        .iter()
        .map(|(_, members)| {
            let present: Vec<f64> = members.iter().filter_map(|&i| values[i]).collect();
            mean(&present)
        })
        .collect()
}

/// Count of distinct non-null values of `column` per group.
pub fn group_nunique(groups: &Groups, rows: &[Row], column: &str) -> Vec<usize> {
    groups
        .iter()
        .map(|(_, members)| {
            members
                .iter()
                .filter_map(|&i| rows[i].get(column))
                .filter(|v| !v.is_null())
                .map(key_of)
                .collect::<HashSet<_>>()
                .len()
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Dense rank, largest value first: ties share a rank and the next distinct
/// value takes the next integer. Missing and NaN values stay missing.
pub fn dense_rank_desc(values: &[Option<f64>]) -> Vec<Option<usize>> {
    // Adding 0.0 folds -0.0 into 0.0 so the two compare as one value.
    let normalize = |v: f64| v + 0.0;
    let mut distinct: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .map(normalize)
        .collect();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    values
        .iter()
        .map(|value| {
            let v = normalize((*value)?);
            if v.is_nan() {
                return None;
            }
            distinct
                .binary_search_by(|probe| v.total_cmp(probe))
                .ok()
                .map(|pos| pos + 1)
        })
        .collect()
}

/// Trailing mean over `window` consecutive values. Positions before the first
/// full window, and windows containing a missing value, are missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let present: Option<Vec<f64>> = slice.iter().copied().collect();
            present.and_then(|p| mean(&p))
        })
        .collect()
}

/// [`rolling_mean`] applied inside each group, in the group's row order.
pub fn grouped_rolling_mean(
    groups: &Groups,
    values: &[Option<f64>],
    window: usize,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for (_, members) in groups.iter() {
        let group_values: Vec<Option<f64>> = members.iter().map(|&i| values[i]).collect();
        for (&row, avg) in members.iter().zip(rolling_mean(&group_values, window)) {
            out[row] = avg;
        }
    }
    out
}

/// Ordering for group keys: numbers numerically, strings lexically, and
/// across types null < bool < number < string < other.
pub fn compare_keys(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}
