//! Ordered predicate lists and their evaluation against a [`Subset`].

use crate::error::{PivotError, PivotResult};
use crate::subset::Subset;
use booking_columnar::{FilterExpr, FilterValue};
use log::debug;

/// A single column restriction.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Keeps every row.
    Identity,
    Equals {
        column: String,
        value: FilterValue,
    },
    InSet {
        column: String,
        values: Vec<FilterValue>,
    },
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Predicate::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn in_set<V: Into<FilterValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::InSet {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Predicate::Identity => None,
            Predicate::Equals { column, .. } | Predicate::InSet { column, .. } => Some(column),
        }
    }

    fn to_expr(&self, subset: &Subset) -> PivotResult<Option<FilterExpr>> {
        let Some(name) = self.column() else {
            return Ok(None);
        };
        let col = subset
            .dataset()
            .column_index(name)
            .ok_or_else(|| PivotError::unknown_column(name))?;
        Ok(Some(match self {
            Predicate::Identity => return Ok(None),
            Predicate::Equals { value, .. } => FilterExpr::Eq {
                col,
                value: value.clone(),
            },
            Predicate::InSet { values, .. } => FilterExpr::In {
                col,
                values: values.clone(),
            },
        }))
    }
}

/// AND `predicates` onto `subset`, left to right.
///
/// The input is never modified. Every predicate column is resolved before any row is
/// filtered, so an unknown column fails the whole call.
pub fn apply(subset: &Subset, predicates: &[Predicate]) -> PivotResult<Subset> {
    let exprs = predicates
        .iter()
        .map(|p| p.to_expr(subset))
        .collect::<PivotResult<Vec<_>>>()?;

    if exprs.iter().all(Option::is_none) {
        return Ok(subset.clone());
    }

    let table = subset.dataset().table();
    let mut mask = subset.mask().clone();
    for expr in exprs.into_iter().flatten() {
        if mask.count_ones() == 0 {
            break;
        }
        let matched = table.filter_mask(&expr)?;
        mask.and_inplace(&matched);
    }
    debug!(
        "filter: {} predicates kept {} of {} rows",
        predicates.len(),
        mask.count_ones(),
        subset.len()
    );
    Subset::with_mask(subset.dataset().clone(), mask)
}

/// A user multi-select over a fixed option list.
///
/// Converting to a [`Predicate`] is the single place where an all-selected or
/// none-selected choice collapses to [`Predicate::Identity`].
#[derive(Clone, Debug, PartialEq)]
pub struct MultiSelect {
    column: String,
    options: Vec<FilterValue>,
    selected: Vec<FilterValue>,
}

impl MultiSelect {
    /// A multi-select over `options` with every option selected.
    pub fn new<V: Into<FilterValue>>(
        column: impl Into<String>,
        options: impl IntoIterator<Item = V>,
    ) -> Self {
        let options: Vec<FilterValue> = options.into_iter().map(Into::into).collect();
        Self {
            column: column.into(),
            selected: options.clone(),
            options,
        }
    }

    /// Replace the selection. Values outside the option list are rejected.
    pub fn select<V: Into<FilterValue>>(
        mut self,
        values: impl IntoIterator<Item = V>,
    ) -> PivotResult<Self> {
        let mut selected: Vec<FilterValue> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            if !self.options.contains(&value) {
                return Err(PivotError::InvalidArgument(format!(
                    "{value:?} is not an option for `{}`",
                    self.column
                )));
            }
            if !selected.contains(&value) {
                selected.push(value);
            }
        }
        // Keep option order so equal selections build equal predicates.
        self.selected = self
            .options
            .iter()
            .filter(|o| selected.contains(o))
            .cloned()
            .collect();
        Ok(self)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn options(&self) -> &[FilterValue] {
        &self.options
    }

    pub fn selected(&self) -> &[FilterValue] {
        &self.selected
    }

    pub fn to_predicate(&self) -> Predicate {
        match self.selected.as_slice() {
            [] => Predicate::Identity,
            s if s.len() == self.options.len() => Predicate::Identity,
            [only] => Predicate::Equals {
                column: self.column.clone(),
                value: only.clone(),
            },
            many => Predicate::InSet {
                column: self.column.clone(),
                values: many.to_vec(),
            },
        }
    }
}
