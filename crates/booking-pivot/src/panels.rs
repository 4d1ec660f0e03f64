//! The dashboard views, each expressed as filter, aggregate and derive calls.

use crate::aggregate::{Aggregation, AggregationEngine, GroupAggregateResult, SortOrder};
use crate::cache::CacheStats;
use crate::correlation::CorrelationMatrix;
use crate::derive::{join_and_derive, percentage, ratio, round_to, DerivedTable};
use crate::error::{PivotError, PivotResult};
use crate::filter::{apply, Predicate};
use crate::options::{CountryOrder, PanelOptions};
use crate::selection::{BookingStatus, DashboardFilters};
use crate::subset::Subset;
use booking_columnar::Value;
use booking_model::schema::{
    ADR, ADULTS, ARRIVAL_DATE_MONTH, ARRIVAL_MONTH_NUM, ASSIGNED_ROOM_STATUS, COUNTRY,
    CUSTOMER_TYPE, DEPOSIT_TYPE, HOTEL, IS_CANCELED, IS_REPEATED_GUEST, MARKET_SEGMENT, MEAL,
};
use booking_model::Dataset;
use rand::Rng;
use serde::Serialize;

/// Columns shown as share-of-bookings charts, in display order.
pub const BREAKDOWN_COLUMNS: [&str; 7] = [
    ASSIGNED_ROOM_STATUS,
    IS_CANCELED,
    IS_REPEATED_GUEST,
    DEPOSIT_TYPE,
    MEAL,
    MARKET_SEGMENT,
    CUSTOMER_TYPE,
];

const MONTH_KEYS: [&str; 2] = [ARRIVAL_DATE_MONTH, ARRIVAL_MONTH_NUM];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricCards {
    pub average_adr: Option<f64>,
    pub total_orders: u64,
    /// Share of non-cancelled bookings. Absent for an empty selection.
    pub booked_ratio: Option<f64>,
    pub total_countries: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slice {
    pub label: Value,
    pub count: f64,
    pub share: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Breakdown {
    pub column: String,
    pub total: f64,
    pub slices: Vec<Slice>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyRate {
    pub month: Value,
    pub month_num: Value,
    pub avg_adr: Value,
    pub cancellation_rate: Option<f64>,
    pub not_cancellation_rate: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// Per month: `total_customers` and `avg_adr` of cancelled bookings.
    pub cancelled: GroupAggregateResult,
    /// Per month: `total_customers` and `avg_adr` of kept bookings.
    pub not_cancelled: GroupAggregateResult,
    pub rates: Vec<MonthlyRate>,
}

/// How much of the dataset to show in the data preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preview {
    Whole,
    Random(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardView {
    pub rows: usize,
    pub selected_rows: usize,
    pub cards: MetricCards,
    pub breakdowns: Vec<Breakdown>,
    pub country_ranking: GroupAggregateResult,
    pub cancellation_by_country: DerivedTable,
    pub monthly_trend: MonthlyTrend,
    pub rate_correlation: CorrelationMatrix,
    pub cache: CacheStats,
}

/// A loaded dataset plus the shared aggregation engine that serves every panel.
#[derive(Debug)]
pub struct Dashboard {
    dataset: Dataset,
    engine: AggregationEngine,
    options: PanelOptions,
}

fn as_count(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

impl Dashboard {
    pub fn new(dataset: Dataset) -> Self {
        Self::with_options(dataset, PanelOptions::default())
    }

    pub fn with_options(dataset: Dataset, options: PanelOptions) -> Self {
        Self {
            dataset,
            engine: AggregationEngine::new(),
            options,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    fn subset(&self, predicates: &[Predicate]) -> PivotResult<Subset> {
        apply(&Subset::all(self.dataset.clone()), predicates)
    }

    /// Group-by for a chart: groups with a null key are not plotted.
    fn grouped(
        &self,
        subset: &Subset,
        group_by: &[&str],
        aggregations: &[Aggregation],
    ) -> PivotResult<GroupAggregateResult> {
        let result = self.engine.group_aggregate(subset, group_by, aggregations)?;
        Ok(result.without_null_keys())
    }

    /// Rows passing every sidebar selection.
    pub fn filtered(&self, filters: &DashboardFilters) -> PivotResult<Subset> {
        self.subset(&filters.predicates())
    }

    pub fn preview<R: Rng + ?Sized>(&self, mode: Preview, rng: &mut R) -> PivotResult<Dataset> {
        match mode {
            Preview::Whole => Ok(self.dataset.clone()),
            Preview::Random(n) => Ok(self.dataset.sample(n, rng)?),
        }
    }

    pub fn metric_cards(&self, filters: &DashboardFilters) -> PivotResult<MetricCards> {
        let subset = self.filtered(filters)?;
        let totals = self.engine.group_aggregate(
            &subset,
            &[],
            &[
                Aggregation::mean("average_adr", ADR),
                Aggregation::count("total_orders", ADR),
                Aggregation::count_rows("rows"),
                Aggregation::distinct_count("total_countries", COUNTRY),
            ],
        )?;
        let by_status = self.engine.group_aggregate(
            &subset,
            &[IS_CANCELED],
            &[Aggregation::count_rows("rows")],
        )?;

        let decimals = self.options.metric_decimals;
        let measure = |name: &str| totals.value(&[], name);
        let rows = as_count(measure("rows"));
        let kept = as_count(by_status.value(
            &[Value::Number(BookingStatus::NotCancelled.is_canceled())],
            "rows",
        ));

        Ok(MetricCards {
            average_adr: measure("average_adr")
                .and_then(Value::as_f64)
                .map(|v| round_to(v, decimals)),
            total_orders: as_count(measure("total_orders")) as u64,
            booked_ratio: ratio(kept, rows)
                .ok()
                .map(|v| round_to(v, decimals)),
            total_countries: as_count(measure("total_countries")) as u64,
        })
    }

    /// Booking counts per value of `column`, with each value's share of the total.
    pub fn breakdown(&self, subset: &Subset, column: &str) -> PivotResult<Breakdown> {
        let counts = self.grouped(subset, &[column], &[Aggregation::count("count", ADULTS)])?;
        let total: f64 = counts.rows().iter().map(|r| as_count(r.values.first())).sum();
        let slices = counts
            .rows()
            .iter()
            .map(|row| {
                let count = as_count(row.values.first());
                Slice {
                    label: row.key[0].clone(),
                    count,
                    share: percentage(count, total)
                        .ok()
                        .map(|v| round_to(v, self.options.share_decimals)),
                }
            })
            .collect();
        Ok(Breakdown {
            column: column.to_owned(),
            total,
            slices,
        })
    }

    pub fn breakdowns(&self, filters: &DashboardFilters) -> PivotResult<Vec<Breakdown>> {
        let subset = self.filtered(filters)?;
        BREAKDOWN_COLUMNS
            .iter()
            .map(|column| self.breakdown(&subset, column))
            .collect()
    }

    /// Bookings per country, most (`Top`) or fewest (`Bottom`) first, at most `limit` rows.
    pub fn country_ranking(
        &self,
        filters: &DashboardFilters,
        order: CountryOrder,
        limit: usize,
    ) -> PivotResult<GroupAggregateResult> {
        if limit < 1 {
            return Err(PivotError::InvalidArgument(format!(
                "country limit must be at least 1, got {limit}"
            )));
        }
        let subset = self.filtered(filters)?;
        let counts = self.grouped(&subset, &[COUNTRY], &[Aggregation::count("count", HOTEL)])?;
        let sort = match order {
            CountryOrder::Top => SortOrder::Descending,
            CountryOrder::Bottom => SortOrder::Ascending,
        };
        Ok(counts.sorted_by_measure("count", sort)?.head(limit))
    }

    /// Cancellations per country for the selected hotel types, against all bookings of
    /// that country in the whole dataset.
    pub fn cancellation_by_country(&self, filters: &DashboardFilters) -> PivotResult<DerivedTable> {
        let mut predicates = filters.hotel_predicates();
        predicates.push(Predicate::equals(
            IS_CANCELED,
            BookingStatus::Cancelled.is_canceled(),
        ));
        let cancelled = self.subset(&predicates)?;
        let everything = Subset::all(self.dataset.clone());

        let cancellations = self.grouped(
            &cancelled,
            &[COUNTRY],
            &[Aggregation::count("total_cancellations", IS_CANCELED)],
        )?;
        let bookings = self.grouped(
            &everything,
            &[COUNTRY],
            &[Aggregation::count("total_bookings", IS_CANCELED)],
        )?;
        let table = join_and_derive(
            &cancellations,
            "total_cancellations",
            &bookings,
            "total_bookings",
            &[COUNTRY],
            "rate",
            percentage,
        )?;
        Ok(table.rounded(self.options.rate_decimals))
    }

    /// Monthly customers and average rate, split by cancellation, for the selected hotels.
    pub fn monthly_trend(&self, filters: &DashboardFilters) -> PivotResult<MonthlyTrend> {
        let hotels = self.subset(&filters.hotel_predicates())?;
        let per_month = [
            Aggregation::count("total_customers", CUSTOMER_TYPE),
            Aggregation::mean("avg_adr", ADR),
        ];
        let by_status = |status: BookingStatus| -> PivotResult<GroupAggregateResult> {
            let subset = apply(
                &hotels,
                &[Predicate::equals(IS_CANCELED, status.is_canceled())],
            )?;
            self.grouped(&subset, &MONTH_KEYS, &per_month)?
                .sorted_by_key(ARRIVAL_MONTH_NUM, SortOrder::Ascending)
        };
        let cancelled = by_status(BookingStatus::Cancelled)?;
        let not_cancelled = by_status(BookingStatus::NotCancelled)?;

        let totals = self
            .grouped(
                &hotels,
                &MONTH_KEYS,
                &[Aggregation::count("total_booking", CUSTOMER_TYPE)],
            )?
            .sorted_by_key(ARRIVAL_MONTH_NUM, SortOrder::Ascending)?;

        let decimals = self.options.trend_rate_decimals;
        let joined = join_and_derive(
            &cancelled,
            "total_customers",
            &totals,
            "total_booking",
            &MONTH_KEYS,
            "cancellation_rate",
            percentage,
        )?
        .rounded(decimals);

        let rates = joined
            .rows()
            .iter()
            .map(|row| {
                let rate = row.derived.ok();
                MonthlyRate {
                    month: row.key[0].clone(),
                    month_num: row.key[1].clone(),
                    avg_adr: cancelled
                        .value(&row.key, "avg_adr")
                        .cloned()
                        .unwrap_or(Value::Null),
                    cancellation_rate: rate,
                    not_cancellation_rate: rate.map(|r| round_to(100.0 - r, decimals)),
                }
            })
            .collect();

        Ok(MonthlyTrend {
            cancelled,
            not_cancelled,
            rates,
        })
    }

    /// Correlations between the monthly average rate and the two cancellation rates.
    pub fn rate_correlation(&self, trend: &MonthlyTrend) -> CorrelationMatrix {
        let avg_adr = trend.rates.iter().map(|r| r.avg_adr.as_f64()).collect();
        let cancel = trend.rates.iter().map(|r| r.cancellation_rate).collect();
        let keep = trend.rates.iter().map(|r| r.not_cancellation_rate).collect();
        CorrelationMatrix::from_series(&[
            ("avg_adr", avg_adr),
            ("cancellation_rate", cancel),
            ("not_cancellation_rate", keep),
        ])
    }

    /// Every panel for one filter selection.
    pub fn render(&self, filters: &DashboardFilters) -> PivotResult<DashboardView> {
        let selected_rows = self.filtered(filters)?.len();
        let cards = self.metric_cards(filters)?;
        let breakdowns = self.breakdowns(filters)?;
        let country_ranking =
            self.country_ranking(filters, self.options.country_order, self.options.country_limit)?;
        let cancellation_by_country = self.cancellation_by_country(filters)?;
        let monthly_trend = self.monthly_trend(filters)?;
        let rate_correlation = self.rate_correlation(&monthly_trend);
        Ok(DashboardView {
            rows: self.dataset.len(),
            selected_rows,
            cards,
            breakdowns,
            country_ranking,
            cancellation_by_country,
            monthly_trend,
            rate_correlation,
            cache: self.engine.stats(),
        })
    }
}
