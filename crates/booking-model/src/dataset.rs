use crate::error::ModelError;
use ahash::RandomState;
use booking_columnar::{ColumnSchema, ColumnarTable, RowMask, Value};
use rand::Rng;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

// Fixed seeds make the fingerprint a pure function of table content.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// An immutable booking table plus a content fingerprint.
///
/// Cloning is cheap: the underlying table is shared.
#[derive(Clone, Debug)]
pub struct Dataset {
    table: Arc<ColumnarTable>,
    fingerprint: u64,
}

fn fingerprint(table: &ColumnarTable) -> u64 {
    let (k0, k1, k2, k3) = FINGERPRINT_SEEDS;
    let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    table.schema().hash(&mut hasher);
    table.row_count().hash(&mut hasher);
    for row in 0..table.row_count() {
        for col in 0..table.column_count() {
            table.get_cell(row, col).key().hash(&mut hasher);
        }
    }
    hasher.finish()
}

impl Dataset {
    pub fn new(table: ColumnarTable) -> Self {
        let fingerprint = fingerprint(&table);
        Self {
            table: Arc::new(table),
            fingerprint,
        }
    }

    pub fn table(&self) -> &ColumnarTable {
        &self.table
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        self.table.schema()
    }

    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the schema and every cell. Equal content yields equal fingerprints.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.table.column_index(name)
    }

    pub fn row(&self, row: usize) -> Option<Vec<Value>> {
        self.table.row(row)
    }

    /// Rows in natural order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.len()).filter_map(|row| self.table.row(row))
    }

    /// Copy the rows selected by `mask` into a new dataset.
    pub fn select(&self, mask: &RowMask) -> Result<Dataset, ModelError> {
        Ok(Dataset::new(self.table.filter_table(mask)?))
    }

    /// Uniformly sample exactly `n` distinct rows, keeping their natural order.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Dataset, ModelError> {
        if n < 1 || n > self.len() {
            return Err(ModelError::InvalidArgument(format!(
                "sample size must be between 1 and {}, got {n}",
                self.len()
            )));
        }
        let picked = rand::seq::index::sample(rng, self.len(), n);
        let mask = RowMask::from_rows(self.len(), picked.iter());
        self.select(&mask)
    }
}
