//! Filtering, memoized aggregation and derived metrics for the hotel booking dashboard.
//!
//! A pass through the dashboard is always the same three steps:
//! 1. [`apply`] an ordered list of [`Predicate`]s to a [`Subset`] of the dataset.
//! 2. [`AggregationEngine::group_aggregate`] the subset; results are cached by subset
//!    content, grouping and aggregation spec.
//! 3. [`join_and_derive`] two aggregation results into a rate or ratio table.
//!
//! [`Dashboard`] wires these steps into the concrete panels.

#![forbid(unsafe_code)]

mod aggregate;
mod cache;
mod correlation;
mod derive;
mod error;
mod filter;
mod options;
mod panels;
mod selection;
mod subset;

pub use crate::aggregate::{
    AggFunc, Aggregation, AggregationEngine, GroupAggregateResult, GroupRow, SortOrder,
};
pub use crate::cache::{
    content_identity, AggregationCache, AggregationKey, CacheStats, SubsetKey,
};
pub use crate::correlation::{pearson, CorrelationMatrix};
pub use crate::derive::{
    complement_percentage, join_and_derive, percentage, ratio, round_to, DeriveError,
    DeriveResult, DerivedRow, DerivedTable,
};
pub use crate::error::{PivotError, PivotResult};
pub use crate::filter::{apply, MultiSelect, Predicate};
pub use crate::options::{CountryOrder, PanelOptions};
pub use crate::panels::{
    Breakdown, Dashboard, DashboardView, MetricCards, MonthlyRate, MonthlyTrend, Preview, Slice,
    BREAKDOWN_COLUMNS,
};
pub use crate::selection::{BookingStatus, DashboardFilters, DEPOSIT_TYPES, HOTEL_TYPES};
pub use crate::subset::Subset;
