//! Joining two aggregation results and computing a per-row metric from them.

use crate::aggregate::GroupAggregateResult;
use crate::error::{PivotError, PivotResult};
use booking_columnar::{Value, ValueKey};
use log::warn;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use thiserror::Error;

/// Why a single derived value could not be computed. Never aborts the whole table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeriveError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("missing or non-numeric input")]
    MissingValue,
}

pub type DeriveResult = Result<f64, DeriveError>;

/// `numerator / denominator`.
pub fn ratio(numerator: f64, denominator: f64) -> DeriveResult {
    if denominator == 0.0 {
        return Err(DeriveError::DivisionByZero);
    }
    Ok(numerator / denominator)
}

/// `numerator / denominator * 100`.
pub fn percentage(numerator: f64, denominator: f64) -> DeriveResult {
    ratio(numerator, denominator).map(|r| r * 100.0)
}

/// `100 - percentage(numerator, denominator)`.
pub fn complement_percentage(numerator: f64, denominator: f64) -> DeriveResult {
    percentage(numerator, denominator).map(|p| 100.0 - p)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn serialize_outcome<S: Serializer>(value: &DeriveResult, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Ok(v) => serializer.serialize_f64(*v),
        Err(e) => serializer.collect_str(e),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedRow {
    pub key: Vec<Value>,
    pub left: Value,
    pub right: Value,
    #[serde(serialize_with = "serialize_outcome")]
    pub derived: DeriveResult,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedTable {
    key_columns: Vec<String>,
    left_measure: String,
    right_measure: String,
    derived_name: String,
    rows: Vec<DerivedRow>,
}

impl DerivedTable {
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn left_measure(&self) -> &str {
        &self.left_measure
    }

    pub fn right_measure(&self) -> &str {
        &self.right_measure
    }

    pub fn derived_name(&self) -> &str {
        &self.derived_name
    }

    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose key equals `key`.
    pub fn get(&self, key: &[Value]) -> Option<&DerivedRow> {
        self.rows.iter().find(|row| {
            row.key.len() == key.len() && row.key.iter().zip(key).all(|(a, b)| a.key() == b.key())
        })
    }

    /// Copy with every successful derived value rounded half away from zero.
    pub fn rounded(&self, decimals: u32) -> Self {
        let mut out = self.clone();
        for row in &mut out.rows {
            row.derived = row.derived.map(|v| round_to(v, decimals));
        }
        out
    }
}

fn key_positions(result: &GroupAggregateResult, on: &[&str]) -> PivotResult<Vec<usize>> {
    on.iter()
        .map(|c| {
            result
                .key_index(c)
                .ok_or_else(|| PivotError::unknown_column(*c))
        })
        .collect()
}

fn project(key: &[Value], positions: &[usize]) -> Vec<ValueKey> {
    positions.iter().map(|&i| key[i].key()).collect()
}

/// Inner-join `left` and `right` on the key columns `on` and derive one value per match.
///
/// Left row order is kept; a left row matching several right rows yields one output row
/// per match, in right order. Keys missing from either side are dropped. A failed
/// derivation is stored in its row and the remaining rows are computed normally.
pub fn join_and_derive<F>(
    left: &GroupAggregateResult,
    left_measure: &str,
    right: &GroupAggregateResult,
    right_measure: &str,
    on: &[&str],
    derived_name: &str,
    derive: F,
) -> PivotResult<DerivedTable>
where
    F: Fn(f64, f64) -> DeriveResult,
{
    let left_keys = key_positions(left, on)?;
    let right_keys = key_positions(right, on)?;
    let left_idx = left
        .measure_index(left_measure)
        .ok_or_else(|| PivotError::unknown_column(left_measure))?;
    let right_idx = right
        .measure_index(right_measure)
        .ok_or_else(|| PivotError::unknown_column(right_measure))?;

    let mut right_lookup: HashMap<Vec<ValueKey>, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        right_lookup
            .entry(project(&row.key, &right_keys))
            .or_default()
            .push(i);
    }

    let mut rows = Vec::new();
    let mut failed = 0usize;
    for row in left.rows() {
        let Some(matches) = right_lookup.get(&project(&row.key, &left_keys)) else {
            continue;
        };
        let l = &row.values[left_idx];
        for &m in matches {
            let r = &right.rows()[m].values[right_idx];
            let derived = match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => derive(a, b),
                _ => Err(DeriveError::MissingValue),
            };
            if derived.is_err() {
                failed += 1;
            }
            rows.push(DerivedRow {
                key: left_keys.iter().map(|&i| row.key[i].clone()).collect(),
                left: l.clone(),
                right: r.clone(),
                derived,
            });
        }
    }
    if failed > 0 {
        warn!("{derived_name}: {failed} of {} joined rows could not be derived", rows.len());
    }

    Ok(DerivedTable {
        key_columns: on.iter().map(|c| (*c).to_owned()).collect(),
        left_measure: left_measure.to_owned(),
        right_measure: right_measure.to_owned(),
        derived_name: derived_name.to_owned(),
        rows,
    })
}
