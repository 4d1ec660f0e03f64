//! Columnar storage for the booking analytics workspace.
//!
//! This crate focuses on:
//! - Column representation (dictionary-encoded text, validity-tracked numbers and booleans).
//! - Row masks ([`RowMask`]) produced by declarative [`FilterExpr`] trees.
//! - Mask-driven group-by ([`ColumnarTable::group_by_mask`]) that reports groups in the order
//!   their keys are first seen.

#![forbid(unsafe_code)]

mod filter;
mod mask;
mod query;
mod table;
mod types;

pub use crate::filter::{FilterExpr, FilterValue};
pub use crate::mask::RowMask;
pub use crate::query::{AggOp, AggSpec, GroupByResult, QueryError};
pub use crate::table::{ColumnSchema, ColumnarTable, ColumnarTableBuilder};
pub use crate::types::{ColumnType, Value, ValueKey};
