#![forbid(unsafe_code)]

use crate::mask::RowMask;
use crate::query::QueryError;
use crate::types::{ColumnType, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Number {
        values: Vec<f64>,
        validity: RowMask,
    },
    Boolean {
        values: RowMask,
        validity: RowMask,
    },
    /// Text stored as indices into a per-column dictionary of distinct strings.
    Dict {
        indices: Vec<u32>,
        validity: RowMask,
        dictionary: Arc<Vec<Arc<str>>>,
    },
}

impl ColumnData {
    pub(crate) fn validity(&self) -> &RowMask {
        match self {
            ColumnData::Number { validity, .. }
            | ColumnData::Boolean { validity, .. }
            | ColumnData::Dict { validity, .. } => validity,
        }
    }

    fn get(&self, row: usize) -> Value {
        if row >= self.validity().len() || !self.validity().get(row) {
            return Value::Null;
        }
        match self {
            ColumnData::Number { values, .. } => Value::Number(values[row]),
            ColumnData::Boolean { values, .. } => Value::Boolean(values.get(row)),
            ColumnData::Dict {
                indices,
                dictionary,
                ..
            } => Value::String(dictionary[indices[row] as usize].clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Column {
    pub(crate) schema: ColumnSchema,
    pub(crate) data: ColumnData,
}

/// An immutable, column-oriented table.
#[derive(Clone, Debug)]
pub struct ColumnarTable {
    schema: Vec<ColumnSchema>,
    columns: Vec<Column>,
    column_index: HashMap<String, usize>,
    rows: usize,
}

impl ColumnarTable {
    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Resolve a column by name. Names are matched exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.schema.get(col).map(|s| s.column_type)
    }

    /// Return the dictionary backing a text column.
    pub fn dictionary(&self, col: usize) -> Option<Arc<Vec<Arc<str>>>> {
        match &self.columns.get(col)?.data {
            ColumnData::Dict { dictionary, .. } => Some(dictionary.clone()),
            _ => None,
        }
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Value {
        match self.columns.get(col) {
            Some(column) if row < self.rows => column.data.get(row),
            _ => Value::Null,
        }
    }

    /// Materialize one row in schema order.
    pub fn row(&self, row: usize) -> Option<Vec<Value>> {
        if row >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.data.get(row)).collect())
    }

    pub(crate) fn column(&self, col: usize) -> Result<&Column, QueryError> {
        self.columns.get(col).ok_or(QueryError::ColumnOutOfRange {
            col,
            column_count: self.columns.len(),
        })
    }

    pub(crate) fn check_mask(&self, mask: &RowMask) -> Result<(), QueryError> {
        if mask.len() != self.rows {
            return Err(QueryError::MaskLengthMismatch {
                expected: self.rows,
                actual: mask.len(),
            });
        }
        Ok(())
    }

    /// Copy the rows selected by `mask` into a new table with the same schema.
    ///
    /// Row order is preserved. Text dictionaries are rebuilt so the new table only
    /// references strings it actually contains.
    pub fn filter_table(&self, mask: &RowMask) -> Result<ColumnarTable, QueryError> {
        self.check_mask(mask)?;
        let mut builder = ColumnarTableBuilder::new(self.schema.clone());
        for row in mask.iter_ones() {
            let values: Vec<Value> = self.columns.iter().map(|c| c.data.get(row)).collect();
            builder.append_row(&values);
        }
        Ok(builder.finalize())
    }
}

enum ColumnBuilder {
    Number {
        values: Vec<f64>,
        validity: RowMask,
    },
    Boolean {
        values: RowMask,
        validity: RowMask,
    },
    Dict {
        indices: Vec<u32>,
        validity: RowMask,
        dictionary: Vec<Arc<str>>,
        lookup: HashMap<Arc<str>, u32>,
    },
}

impl ColumnBuilder {
    fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Number => ColumnBuilder::Number {
                values: Vec::new(),
                validity: RowMask::new(),
            },
            ColumnType::Boolean => ColumnBuilder::Boolean {
                values: RowMask::new(),
                validity: RowMask::new(),
            },
            ColumnType::String => ColumnBuilder::Dict {
                indices: Vec::new(),
                validity: RowMask::new(),
                dictionary: Vec::new(),
                lookup: HashMap::new(),
            },
        }
    }

    /// Values whose type does not match the column are stored as nulls.
    fn push(&mut self, value: &Value) {
        match self {
            ColumnBuilder::Number { values, validity } => match value {
                Value::Number(n) => {
                    values.push(*n);
                    validity.push(true);
                }
                _ => {
                    values.push(0.0);
                    validity.push(false);
                }
            },
            ColumnBuilder::Boolean { values, validity } => match value {
                Value::Boolean(b) => {
                    values.push(*b);
                    validity.push(true);
                }
                _ => {
                    values.push(false);
                    validity.push(false);
                }
            },
            ColumnBuilder::Dict {
                indices,
                validity,
                dictionary,
                lookup,
            } => match value {
                Value::String(s) => {
                    let idx = match lookup.get(s.as_ref()) {
                        Some(idx) => *idx,
                        None => {
                            let idx = dictionary.len() as u32;
                            dictionary.push(s.clone());
                            lookup.insert(s.clone(), idx);
                            idx
                        }
                    };
                    indices.push(idx);
                    validity.push(true);
                }
                _ => {
                    indices.push(0);
                    validity.push(false);
                }
            },
        }
    }

    fn finish(self) -> ColumnData {
        match self {
            ColumnBuilder::Number { values, validity } => ColumnData::Number { values, validity },
            ColumnBuilder::Boolean { values, validity } => ColumnData::Boolean { values, validity },
            ColumnBuilder::Dict {
                indices,
                validity,
                dictionary,
                ..
            } => ColumnData::Dict {
                indices,
                validity,
                dictionary: Arc::new(dictionary),
            },
        }
    }
}

/// Row-at-a-time builder for [`ColumnarTable`].
pub struct ColumnarTableBuilder {
    schema: Vec<ColumnSchema>,
    builders: Vec<ColumnBuilder>,
    rows: usize,
}

impl ColumnarTableBuilder {
    pub fn new(schema: Vec<ColumnSchema>) -> Self {
        let builders = schema
            .iter()
            .map(|col| ColumnBuilder::new(col.column_type))
            .collect();
        Self {
            schema,
            builders,
            rows: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn append_row(&mut self, row: &[Value]) {
        assert_eq!(
            row.len(),
            self.builders.len(),
            "row length must match schema"
        );
        for (builder, value) in self.builders.iter_mut().zip(row.iter()) {
            builder.push(value);
        }
        self.rows += 1;
    }

    pub fn finalize(self) -> ColumnarTable {
        let column_index = self
            .schema
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.name.clone(), idx))
            .collect();
        let columns = self
            .schema
            .iter()
            .cloned()
            .zip(self.builders)
            .map(|(schema, builder)| Column {
                schema,
                data: builder.finish(),
            })
            .collect();

        ColumnarTable {
            schema: self.schema,
            columns,
            column_index,
            rows: self.rows,
        }
    }
}
