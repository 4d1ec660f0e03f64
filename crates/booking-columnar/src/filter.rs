#![forbid(unsafe_code)]

use crate::mask::RowMask;
use crate::query::QueryError;
use crate::table::{ColumnData, ColumnarTable};
use std::sync::Arc;

/// A literal compared against column values.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Boolean(bool),
    String(Arc<str>),
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(Arc::from(value))
    }
}

/// Row filter evaluated into a [`RowMask`].
///
/// Null cells never match. A literal whose type differs from the column type matches no
/// rows.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    Eq { col: usize, value: FilterValue },
    /// Matches rows equal to any of `values`; an empty list matches nothing.
    In { col: usize, values: Vec<FilterValue> },
}

/// NaN equals NaN, and `-0.0` equals `0.0`.
fn eq_number(lhs: f64, rhs: f64) -> bool {
    if lhs.is_nan() || rhs.is_nan() {
        return lhs.is_nan() && rhs.is_nan();
    }
    lhs == rhs
}

/// Select rows where `validity` is set and `pred(row)` holds.
fn mask_where(validity: &RowMask, mut pred: impl FnMut(usize) -> bool) -> RowMask {
    let mut out = RowMask::none(validity.len());
    for row in validity.iter_ones() {
        if pred(row) {
            out.set(row, true);
        }
    }
    out
}

/// Evaluate `pred` once per dictionary entry, then map rows through their indices.
fn mask_dict(
    indices: &[u32],
    validity: &RowMask,
    dictionary: &[Arc<str>],
    pred: impl Fn(&str) -> bool,
) -> RowMask {
    let hits: Vec<bool> = dictionary.iter().map(|s| pred(s.as_ref())).collect();
    mask_where(validity, |row| hits[indices[row] as usize])
}

impl ColumnarTable {
    /// Evaluate `expr` over every row of the table.
    pub fn filter_mask(&self, expr: &FilterExpr) -> Result<RowMask, QueryError> {
        match expr {
            FilterExpr::Eq { col, value } => self.eq_mask(*col, value),
            FilterExpr::In { col, values } => {
                // Resolve the column even for an empty list so bad indices still surface.
                self.column(*col)?;
                let mut out = RowMask::none(self.row_count());
                for value in values {
                    out.or_inplace(&self.eq_mask(*col, value)?);
                }
                Ok(out)
            }
        }
    }

    fn eq_mask(&self, col: usize, value: &FilterValue) -> Result<RowMask, QueryError> {
        let column = self.column(col)?;
        let mask = match (&column.data, value) {
            (ColumnData::Number { values, validity }, FilterValue::Number(rhs)) => {
                mask_where(validity, |row| eq_number(values[row], *rhs))
            }
            (ColumnData::Boolean { values, validity }, FilterValue::Boolean(rhs)) => {
                mask_where(validity, |row| values.get(row) == *rhs)
            }
            (
                ColumnData::Dict {
                    indices,
                    validity,
                    dictionary,
                },
                FilterValue::String(rhs),
            ) => mask_dict(indices, validity, dictionary, |s| s == rhs.as_ref()),
            _ => RowMask::none(self.row_count()),
        };
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equality_is_canonical() {
        assert!(eq_number(f64::NAN, f64::NAN));
        assert!(!eq_number(1.0, f64::NAN));
        assert!(eq_number(-0.0, 0.0));
        assert!(!eq_number(1.0, 2.0));
    }
}
