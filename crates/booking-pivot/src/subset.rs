use crate::error::{PivotError, PivotResult};
use booking_columnar::{RowMask, Value};
use booking_model::Dataset;
use std::sync::Arc;

/// A row selection over a shared [`Dataset`].
///
/// Two subsets are equal when they select the same rows of content-equal datasets, however
/// they were produced.
#[derive(Clone, Debug)]
pub struct Subset {
    dataset: Dataset,
    mask: Arc<RowMask>,
}

impl Subset {
    /// Every row of `dataset`.
    pub fn all(dataset: Dataset) -> Self {
        let mask = RowMask::all(dataset.len());
        Self {
            dataset,
            mask: Arc::new(mask),
        }
    }

    pub fn with_mask(dataset: Dataset, mask: RowMask) -> PivotResult<Self> {
        if mask.len() != dataset.len() {
            return Err(PivotError::InvalidArgument(format!(
                "row mask covers {} rows, dataset has {}",
                mask.len(),
                dataset.len()
            )));
        }
        Ok(Self {
            dataset,
            mask: Arc::new(mask),
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn mask(&self) -> &RowMask {
        &self.mask
    }

    pub(crate) fn shared_mask(&self) -> Arc<RowMask> {
        Arc::clone(&self.mask)
    }

    /// Number of selected rows.
    pub fn len(&self) -> usize {
        self.mask.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected rows in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        self.mask
            .iter_ones()
            .filter_map(move |row| self.dataset.row(row))
    }

    /// Copy the selected rows into a standalone dataset.
    pub fn materialize(&self) -> PivotResult<Dataset> {
        Ok(self.dataset.select(&self.mask)?)
    }
}

impl PartialEq for Subset {
    fn eq(&self, other: &Self) -> bool {
        self.dataset.fingerprint() == other.dataset.fingerprint() && self.mask == other.mask
    }
}
