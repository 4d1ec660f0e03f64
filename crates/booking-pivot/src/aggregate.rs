use crate::cache::{AggregationCache, CacheStats};
use crate::error::{PivotError, PivotResult};
use crate::subset::Subset;
use booking_columnar::{AggOp, AggSpec, Value};
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    /// Non-null values of the source column.
    Count,
    CountRows,
    /// Arithmetic mean, ignoring nulls.
    Mean,
    Sum,
    Min,
    Max,
    DistinctCount,
}

impl AggFunc {
    fn op(self) -> AggOp {
        match self {
            AggFunc::Count => AggOp::CountNonNull,
            AggFunc::CountRows => AggOp::CountRows,
            AggFunc::Mean => AggOp::Avg,
            AggFunc::Sum => AggOp::Sum,
            AggFunc::Min => AggOp::Min,
            AggFunc::Max => AggOp::Max,
            AggFunc::DistinctCount => AggOp::DistinctCount,
        }
    }
}

/// A named aggregate over an optional source column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Aggregation {
    pub name: String,
    pub column: Option<String>,
    pub func: AggFunc,
}

impl Aggregation {
    pub fn new(name: impl Into<String>, column: impl Into<String>, func: AggFunc) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
            func,
        }
    }

    pub fn count(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::Count)
    }

    pub fn count_rows(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            func: AggFunc::CountRows,
        }
    }

    pub fn mean(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::Mean)
    }

    pub fn sum(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::Sum)
    }

    pub fn min(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::Min)
    }

    pub fn max(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::Max)
    }

    pub fn distinct_count(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, column, AggFunc::DistinctCount)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: Vec<Value>,
    pub values: Vec<Value>,
}

/// Rows of (group key, aggregate values), in first-seen key order unless re-sorted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupAggregateResult {
    key_columns: Vec<String>,
    measures: Vec<String>,
    rows: Vec<GroupRow>,
}

fn cmp_nulls_last(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.key().cmp(&b.key());
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
    }
}

impl GroupAggregateResult {
    pub fn new(key_columns: Vec<String>, measures: Vec<String>, rows: Vec<GroupRow>) -> Self {
        Self {
            key_columns,
            measures,
            rows,
        }
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    pub fn rows(&self) -> &[GroupRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn measure_index(&self, name: &str) -> Option<usize> {
        self.measures.iter().position(|m| m == name)
    }

    pub fn key_index(&self, name: &str) -> Option<usize> {
        self.key_columns.iter().position(|k| k == name)
    }

    /// The row whose key equals `key`.
    pub fn get(&self, key: &[Value]) -> Option<&GroupRow> {
        self.rows.iter().find(|row| {
            row.key.len() == key.len() && row.key.iter().zip(key).all(|(a, b)| a.key() == b.key())
        })
    }

    /// Measure `name` of the group with key `key`.
    pub fn value(&self, key: &[Value], name: &str) -> Option<&Value> {
        let idx = self.measure_index(name)?;
        self.get(key).and_then(|row| row.values.get(idx))
    }

    /// All values of measure `name`, in row order.
    pub fn measure_values(&self, name: &str) -> PivotResult<Vec<Value>> {
        let idx = self
            .measure_index(name)
            .ok_or_else(|| PivotError::unknown_column(name))?;
        Ok(self.rows.iter().map(|r| r.values[idx].clone()).collect())
    }

    /// Stable sort by a measure. Nulls go last in both directions.
    pub fn sorted_by_measure(&self, name: &str, order: SortOrder) -> PivotResult<Self> {
        let idx = self
            .measure_index(name)
            .ok_or_else(|| PivotError::unknown_column(name))?;
        let mut out = self.clone();
        out.rows
            .sort_by(|a, b| cmp_nulls_last(&a.values[idx], &b.values[idx], order));
        Ok(out)
    }

    /// Stable sort by one key column. Nulls go last in both directions.
    pub fn sorted_by_key(&self, column: &str, order: SortOrder) -> PivotResult<Self> {
        let idx = self
            .key_index(column)
            .ok_or_else(|| PivotError::unknown_column(column))?;
        let mut out = self.clone();
        out.rows
            .sort_by(|a, b| cmp_nulls_last(&a.key[idx], &b.key[idx], order));
        Ok(out)
    }

    /// Copy without the groups that have a null in any key column.
    pub fn without_null_keys(&self) -> Self {
        let mut out = self.clone();
        out.rows.retain(|row| !row.key.iter().any(Value::is_null));
        out
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let mut out = self.clone();
        out.rows.truncate(n);
        out
    }
}

/// Group-by over subsets, memoized through an [`AggregationCache`].
#[derive(Debug, Default)]
pub struct AggregationEngine {
    cache: AggregationCache,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: AggregationCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Group `subset` by `group_by` and compute `aggregations` per group.
    ///
    /// Groups appear in the order their key first occurs in the dataset. An empty subset
    /// yields an empty result. Unknown columns fail before the cache is consulted.
    pub fn group_aggregate(
        &self,
        subset: &Subset,
        group_by: &[&str],
        aggregations: &[Aggregation],
    ) -> PivotResult<Arc<GroupAggregateResult>> {
        let dataset = subset.dataset();
        let resolve = |name: &str| {
            dataset
                .column_index(name)
                .ok_or_else(|| PivotError::unknown_column(name))
        };

        let keys = group_by
            .iter()
            .map(|name| resolve(*name))
            .collect::<PivotResult<Vec<usize>>>()?;
        let specs = aggregations
            .iter()
            .map(|agg| -> PivotResult<AggSpec> {
                let column = agg.column.as_deref().map(resolve).transpose()?;
                Ok(AggSpec {
                    op: agg.func.op(),
                    column,
                    name: Some(agg.name.clone()),
                })
            })
            .collect::<PivotResult<Vec<_>>>()?;

        let key = self.cache.key(subset, group_by, aggregations);
        self.cache.get_or_try_compute(key, || {
            debug!(
                "group_aggregate: {} rows by {:?}, {} aggregates",
                subset.len(),
                group_by,
                specs.len()
            );
            let grouped = dataset
                .table()
                .group_by_mask(&keys, &specs, subset.mask())?;
            Ok(to_rows(group_by, aggregations, grouped.row_count(), grouped.into_columns()))
        })
    }
}

fn to_rows(
    group_by: &[&str],
    aggregations: &[Aggregation],
    row_count: usize,
    columns: Vec<Vec<Value>>,
) -> GroupAggregateResult {
    let split = group_by.len();
    let mut rows: Vec<GroupRow> = (0..row_count)
        .map(|_| GroupRow {
            key: Vec::with_capacity(split),
            values: Vec::with_capacity(aggregations.len()),
        })
        .collect();
    for (col_idx, column) in columns.into_iter().enumerate() {
        for (row, value) in rows.iter_mut().zip(column) {
            if col_idx < split {
                row.key.push(value);
            } else {
                row.values.push(value);
            }
        }
    }
    GroupAggregateResult {
        key_columns: group_by.iter().map(|c| (*c).to_owned()).collect(),
        measures: aggregations.iter().map(|a| a.name.clone()).collect(),
        rows,
    }
}

