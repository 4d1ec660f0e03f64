mod common;

use booking_columnar::Value;
use booking_model::schema::IS_CANCELED;
use booking_model::ModelError;
use booking_pivot::{
    BookingStatus, CountryOrder, Dashboard, DashboardFilters, MetricCards, PanelOptions,
    PivotError, Preview,
};
use common::{dataset, text, Booking};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bookings() -> Vec<Booking> {
    vec![
        Booking {
            adr: Some(100.0),
            ..Booking::default()
        },
        Booking {
            canceled: true,
            adr: Some(120.0),
            ..Booking::default()
        },
        Booking {
            hotel: "City Hotel",
            canceled: true,
            country: Some("GBR"),
            month: ("August", 8),
            adr: Some(80.0),
            deposit: "Non Refund",
            ..Booking::default()
        },
        Booking {
            hotel: "City Hotel",
            month: ("August", 8),
            adr: Some(60.0),
            ..Booking::default()
        },
        Booking {
            country: Some("ESP"),
            month: ("August", 8),
            adr: None,
            repeated: true,
            ..Booking::default()
        },
    ]
}

fn dashboard() -> Dashboard {
    Dashboard::new(dataset(&bookings()))
}

fn countries(rows: &[booking_pivot::GroupRow]) -> Vec<String> {
    rows.iter().map(|r| r.key[0].to_string()).collect()
}

#[test]
fn metric_cards_for_all_rows() {
    let cards = dashboard().metric_cards(&DashboardFilters::default()).unwrap();
    assert_eq!(
        cards,
        MetricCards {
            average_adr: Some(90.0),
            total_orders: 4,
            booked_ratio: Some(0.6),
            total_countries: 3,
        }
    );
}

#[test]
fn metric_cards_follow_the_selection() {
    let board = dashboard();
    let cancelled = DashboardFilters::default()
        .with_statuses([BookingStatus::Cancelled])
        .unwrap();
    let cards = board.metric_cards(&cancelled).unwrap();
    assert_eq!(cards.booked_ratio, Some(0.0));
    assert_eq!(cards.average_adr, Some(100.0));

    let empty = DashboardFilters::default()
        .with_hotels(["City Hotel"])
        .unwrap()
        .with_deposits(["Refundable"])
        .unwrap();
    let cards = board.metric_cards(&empty).unwrap();
    assert_eq!(
        cards,
        MetricCards {
            average_adr: None,
            total_orders: 0,
            booked_ratio: None,
            total_countries: 0,
        }
    );
}

#[test]
fn cancellation_breakdown_shares() {
    let board = dashboard();
    let subset = board.filtered(&DashboardFilters::default()).unwrap();
    let breakdown = board.breakdown(&subset, IS_CANCELED).unwrap();
    assert_eq!(breakdown.total, 5.0);
    let slices: Vec<(Value, f64, Option<f64>)> = breakdown
        .slices
        .iter()
        .map(|s| (s.label.clone(), s.count, s.share))
        .collect();
    assert_eq!(
        slices,
        vec![
            (Value::Number(0.0), 3.0, Some(60.0)),
            (Value::Number(1.0), 2.0, Some(40.0)),
        ]
    );

    let all = board.breakdowns(&DashboardFilters::default()).unwrap();
    assert_eq!(all.len(), booking_pivot::BREAKDOWN_COLUMNS.len());
}

#[test]
fn country_ranking_top_and_bottom() {
    let board = dashboard();
    let filters = DashboardFilters::default();

    let top = board.country_ranking(&filters, CountryOrder::Top, 2).unwrap();
    assert_eq!(countries(top.rows()), vec!["PRT", "GBR"]);
    assert_eq!(top.rows()[0].values, vec![Value::Number(3.0)]);

    let bottom = board
        .country_ranking(&filters, CountryOrder::Bottom, 10)
        .unwrap();
    assert_eq!(countries(bottom.rows()), vec!["GBR", "ESP", "PRT"]);

    assert!(matches!(
        board.country_ranking(&filters, CountryOrder::Top, 0),
        Err(PivotError::InvalidArgument(_))
    ));
}

#[test]
fn bookings_without_a_country_are_left_out_of_country_panels() {
    let board = Dashboard::new(dataset(&[
        Booking::default(),
        Booking {
            canceled: true,
            ..Booking::default()
        },
        Booking {
            canceled: true,
            country: None,
            ..Booking::default()
        },
        Booking {
            country: None,
            ..Booking::default()
        },
        Booking {
            country: None,
            adr: Some(10.0),
            ..Booking::default()
        },
    ]));
    let filters = DashboardFilters::default();

    let ranking = board.country_ranking(&filters, CountryOrder::Top, 10).unwrap();
    assert_eq!(countries(ranking.rows()), vec!["PRT"]);
    assert_eq!(ranking.rows()[0].values, vec![Value::Number(2.0)]);

    let rates = board.cancellation_by_country(&filters).unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates.rows()[0].key, vec![text("PRT")]);
    assert_eq!(rates.rows()[0].derived, Ok(50.0));

    assert_eq!(board.metric_cards(&filters).unwrap().total_countries, 1);
}

#[test]
fn cancellation_rate_uses_whole_dataset_totals() {
    let board = dashboard();
    let table = board
        .cancellation_by_country(&DashboardFilters::default())
        .unwrap();
    let rates: Vec<(String, f64, Result<f64, _>)> = table
        .rows()
        .iter()
        .map(|r| (r.key[0].to_string(), r.right.as_f64().unwrap(), r.derived))
        .collect();
    assert_eq!(
        rates,
        vec![
            ("PRT".to_owned(), 3.0, Ok(33.3)),
            ("GBR".to_owned(), 1.0, Ok(100.0)),
        ]
    );

    // Only the hotel selection applies; the status selection is ignored by this panel.
    let city = DashboardFilters::default()
        .with_hotels(["City Hotel"])
        .unwrap()
        .with_statuses([BookingStatus::NotCancelled])
        .unwrap();
    let table = board.cancellation_by_country(&city).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].key, vec![text("GBR")]);
    assert_eq!(table.rows()[0].derived, Ok(100.0));
}

#[test]
fn monthly_trend_rates_and_correlation() {
    let board = dashboard();
    let trend = board.monthly_trend(&DashboardFilters::default()).unwrap();

    let months: Vec<String> = trend.rates.iter().map(|r| r.month.to_string()).collect();
    assert_eq!(months, vec!["July", "August"]);
    let rates: Vec<(Option<f64>, Option<f64>)> = trend
        .rates
        .iter()
        .map(|r| (r.cancellation_rate, r.not_cancellation_rate))
        .collect();
    assert_eq!(
        rates,
        vec![(Some(50.0), Some(50.0)), (Some(33.33), Some(66.67))]
    );
    assert_eq!(trend.rates[0].avg_adr, Value::Number(120.0));
    assert_eq!(trend.not_cancelled.len(), 2);
    assert_eq!(
        trend
            .not_cancelled
            .value(&[text("August"), Value::Number(8.0)], "total_customers"),
        Some(&Value::Number(2.0))
    );

    let matrix = board.rate_correlation(&trend);
    let close = |v: Option<f64>, want: f64| (v.unwrap() - want).abs() < 1e-9;
    assert!(close(matrix.get("avg_adr", "cancellation_rate"), 1.0));
    assert!(close(matrix.get("avg_adr", "not_cancellation_rate"), -1.0));
    assert!(close(matrix.get("cancellation_rate", "cancellation_rate"), 1.0));
}

#[test]
fn preview_samples_with_injected_rng() {
    let board = dashboard();
    let mut rng = StdRng::seed_from_u64(42);
    assert_eq!(board.preview(Preview::Whole, &mut rng).unwrap().len(), 5);
    assert_eq!(board.preview(Preview::Random(2), &mut rng).unwrap().len(), 2);
    assert!(matches!(
        board.preview(Preview::Random(6), &mut rng),
        Err(PivotError::Model(ModelError::InvalidArgument(_)))
    ));
}

#[test]
fn render_reuses_cached_aggregations() {
    let options = PanelOptions {
        country_limit: 1,
        ..PanelOptions::default()
    };
    let board = Dashboard::with_options(dataset(&bookings()), options);
    let filters = DashboardFilters::default();

    let first = board.render(&filters).unwrap();
    assert_eq!(first.rows, 5);
    assert_eq!(first.selected_rows, 5);
    assert_eq!(first.country_ranking.len(), 1);
    let computed = board.engine().stats().computations;

    let second = board.render(&filters).unwrap();
    assert_eq!(board.engine().stats().computations, computed);
    assert_eq!(second.cards, first.cards);

    let json = serde_json::to_value(&second).unwrap();
    assert_eq!(json["cards"]["total_orders"], serde_json::json!(4));
    assert_eq!(
        json["cancellation_by_country"]["rows"][0]["derived"],
        serde_json::json!(33.3)
    );
}
