#![forbid(unsafe_code)]

use crate::mask::RowMask;
use crate::table::{ColumnData, ColumnSchema, ColumnarTable};
use crate::types::{ColumnType, Value, ValueKey};
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("column index {col} out of range (table has {column_count} columns)")]
    ColumnOutOfRange { col: usize, column_count: usize },

    #[error("row mask has {actual} rows, table has {expected}")]
    MaskLengthMismatch { expected: usize, actual: usize },

    #[error("{op:?} needs a source column")]
    MissingAggregationColumn { op: AggOp },

    #[error("{op:?} is not supported for {column_type} column {column}")]
    UnsupportedAggregation {
        op: AggOp,
        column: String,
        column_type: ColumnType,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggOp {
    /// Number of rows in the group.
    CountRows,
    /// Number of non-null values of the source column.
    CountNonNull,
    Sum,
    Avg,
    Min,
    Max,
    /// Number of distinct non-null values of the source column.
    DistinctCount,
}

impl AggOp {
    fn label(self) -> &'static str {
        match self {
            AggOp::CountRows => "count_rows",
            AggOp::CountNonNull => "count",
            AggOp::Sum => "sum",
            AggOp::Avg => "avg",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::DistinctCount => "distinct_count",
        }
    }

    fn numeric_only(self) -> bool {
        matches!(self, AggOp::Sum | AggOp::Avg)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggSpec {
    pub op: AggOp,
    pub column: Option<usize>,
    pub name: Option<String>,
}

impl AggSpec {
    fn on(op: AggOp, column: usize) -> Self {
        Self {
            op,
            column: Some(column),
            name: None,
        }
    }

    pub fn count_rows() -> Self {
        Self {
            op: AggOp::CountRows,
            column: None,
            name: None,
        }
    }

    pub fn count_non_null(column: usize) -> Self {
        Self::on(AggOp::CountNonNull, column)
    }

    pub fn sum_f64(column: usize) -> Self {
        Self::on(AggOp::Sum, column)
    }

    pub fn avg_f64(column: usize) -> Self {
        Self::on(AggOp::Avg, column)
    }

    pub fn min(column: usize) -> Self {
        Self::on(AggOp::Min, column)
    }

    pub fn max(column: usize) -> Self {
        Self::on(AggOp::Max, column)
    }

    pub fn distinct_count(column: usize) -> Self {
        Self::on(AggOp::DistinctCount, column)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Column-major output of a group-by: key columns first, then one column per aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupByResult {
    schema: Vec<ColumnSchema>,
    columns: Vec<Vec<Value>>,
    rows: usize,
}

impl GroupByResult {
    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, col: usize) -> Option<&[Value]> {
        self.columns.get(col).map(Vec::as_slice)
    }

    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.columns.clone()
    }

    pub fn into_columns(self) -> Vec<Vec<Value>> {
        self.columns
    }
}

/// Cheap per-row key part. Text columns group by dictionary index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Number(OrderedFloat<f64>),
    Boolean(bool),
    Dict(u32),
}

fn key_part(data: &ColumnData, row: usize) -> KeyPart {
    if !data.validity().get(row) {
        return KeyPart::Null;
    }
    match data {
        ColumnData::Number { values, .. } => KeyPart::Number(OrderedFloat(values[row])),
        ColumnData::Boolean { values, .. } => KeyPart::Boolean(values.get(row)),
        ColumnData::Dict { indices, .. } => KeyPart::Dict(indices[row]),
    }
}

enum Accumulator {
    CountRows(u64),
    CountNonNull(u64),
    Sum(Option<f64>),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    Distinct(HashSet<ValueKey>),
}

impl Accumulator {
    fn new(op: AggOp) -> Self {
        match op {
            AggOp::CountRows => Accumulator::CountRows(0),
            AggOp::CountNonNull => Accumulator::CountNonNull(0),
            AggOp::Sum => Accumulator::Sum(None),
            AggOp::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
            AggOp::Min => Accumulator::Min(None),
            AggOp::Max => Accumulator::Max(None),
            AggOp::DistinctCount => Accumulator::Distinct(HashSet::new()),
        }
    }

    fn update(&mut self, value: Value) {
        if let Accumulator::CountRows(n) = self {
            *n += 1;
            return;
        }
        if value.is_null() {
            return;
        }
        match self {
            Accumulator::CountRows(_) => {}
            Accumulator::CountNonNull(n) => *n += 1,
            Accumulator::Sum(sum) => {
                if let Some(v) = value.as_f64() {
                    *sum = Some(sum.unwrap_or(0.0) + v);
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(v) = value.as_f64() {
                    *sum += v;
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if current.as_ref().map_or(true, |c| value.key() < c.key()) {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if current.as_ref().map_or(true, |c| value.key() > c.key()) {
                    *current = Some(value);
                }
            }
            Accumulator::Distinct(seen) => {
                seen.insert(value.key());
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::CountRows(n) | Accumulator::CountNonNull(n) => Value::Number(n as f64),
            Accumulator::Sum(sum) => sum.map_or(Value::Null, Value::Number),
            Accumulator::Avg { count: 0, .. } => Value::Null,
            Accumulator::Avg { sum, count } => Value::Number(sum / count as f64),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
            Accumulator::Distinct(seen) => Value::Number(seen.len() as f64),
        }
    }
}

struct Group {
    first_row: usize,
    accumulators: Vec<Accumulator>,
}

impl ColumnarTable {
    /// Group every row of the table.
    pub fn group_by(&self, keys: &[usize], aggs: &[AggSpec]) -> Result<GroupByResult, QueryError> {
        self.group_by_mask(keys, aggs, &RowMask::all(self.row_count()))
    }

    /// Group only the rows listed in `rows`.
    pub fn group_by_rows(
        &self,
        keys: &[usize],
        aggs: &[AggSpec],
        rows: &[usize],
    ) -> Result<GroupByResult, QueryError> {
        let mask = RowMask::from_rows(self.row_count(), rows.iter().copied());
        self.group_by_mask(keys, aggs, &mask)
    }

    /// Group the rows selected by `mask`.
    ///
    /// Groups are emitted in the order their key is first encountered while scanning rows in
    /// table order. Null key values form their own group.
    pub fn group_by_mask(
        &self,
        keys: &[usize],
        aggs: &[AggSpec],
        mask: &RowMask,
    ) -> Result<GroupByResult, QueryError> {
        self.check_mask(mask)?;
        let schema = self.group_by_schema(keys, aggs)?;

        let key_columns: Vec<&ColumnData> = keys
            .iter()
            .map(|&k| self.column(k).map(|c| &c.data))
            .collect::<Result<_, _>>()?;

        let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        let mut key_buf: Vec<KeyPart> = Vec::with_capacity(keys.len());

        for row in mask.iter_ones() {
            key_buf.clear();
            key_buf.extend(key_columns.iter().map(|data| key_part(data, row)));

            let group_idx = match index.get(&key_buf) {
                Some(idx) => *idx,
                None => {
                    let idx = groups.len();
                    groups.push(Group {
                        first_row: row,
                        accumulators: aggs.iter().map(|a| Accumulator::new(a.op)).collect(),
                    });
                    index.insert(key_buf.clone(), idx);
                    idx
                }
            };

            let group = &mut groups[group_idx];
            for (acc, spec) in group.accumulators.iter_mut().zip(aggs) {
                let value = match spec.column {
                    Some(col) => self.get_cell(row, col),
                    None => Value::Null,
                };
                acc.update(value);
            }
        }

        let rows = groups.len();
        let mut columns: Vec<Vec<Value>> = (0..keys.len() + aggs.len())
            .map(|_| Vec::with_capacity(rows))
            .collect();
        for group in groups {
            for (out, &key) in columns.iter_mut().zip(keys) {
                out.push(self.get_cell(group.first_row, key));
            }
            for (out, acc) in columns[keys.len()..].iter_mut().zip(group.accumulators) {
                out.push(acc.finish());
            }
        }

        Ok(GroupByResult {
            schema,
            columns,
            rows,
        })
    }

    fn group_by_schema(
        &self,
        keys: &[usize],
        aggs: &[AggSpec],
    ) -> Result<Vec<ColumnSchema>, QueryError> {
        let mut schema = Vec::with_capacity(keys.len() + aggs.len());
        for &key in keys {
            schema.push(self.column(key)?.schema.clone());
        }

        for spec in aggs {
            let source = match (spec.op, spec.column) {
                (AggOp::CountRows, _) => None,
                (op, None) => return Err(QueryError::MissingAggregationColumn { op }),
                (_, Some(col)) => Some(&self.column(col)?.schema),
            };

            let (name, column_type) = match source {
                None => ("count_rows".to_owned(), ColumnType::Number),
                Some(src) => {
                    if spec.op.numeric_only() && src.column_type == ColumnType::String {
                        return Err(QueryError::UnsupportedAggregation {
                            op: spec.op,
                            column: src.name.clone(),
                            column_type: src.column_type,
                        });
                    }
                    let column_type = match spec.op {
                        AggOp::Min | AggOp::Max => src.column_type,
                        _ => ColumnType::Number,
                    };
                    (format!("{}_{}", spec.op.label(), src.name), column_type)
                }
            };

            schema.push(ColumnSchema {
                name: spec.name.clone().unwrap_or(name),
                column_type,
            });
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnarTableBuilder;

    #[test]
    fn default_aggregate_names_include_source_column() {
        let schema = vec![
            ColumnSchema::new("k", ColumnType::String),
            ColumnSchema::new("v", ColumnType::Number),
        ];
        let mut builder = ColumnarTableBuilder::new(schema);
        builder.append_row(&[Value::from("a"), Value::Number(1.0)]);
        let table = builder.finalize();

        let result = table
            .group_by(&[0], &[AggSpec::count_rows(), AggSpec::avg_f64(1)])
            .unwrap();
        let names: Vec<&str> = result.schema().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["k", "count_rows", "avg_v"]);
    }

    #[test]
    fn avg_of_text_column_is_rejected() {
        let schema = vec![ColumnSchema::new("k", ColumnType::String)];
        let table = ColumnarTableBuilder::new(schema).finalize();
        let err = table.group_by(&[0], &[AggSpec::avg_f64(0)]).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedAggregation { .. }));
    }
}
