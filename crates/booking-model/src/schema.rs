//! Column names of the hotel booking dataset.

use booking_columnar::{ColumnSchema, ColumnType};

pub const HOTEL: &str = "hotel";
pub const IS_CANCELED: &str = "is_canceled";
pub const COUNTRY: &str = "country";
pub const MEAL: &str = "meal";
pub const DEPOSIT_TYPE: &str = "deposit_type";
pub const CUSTOMER_TYPE: &str = "customer_type";
pub const MARKET_SEGMENT: &str = "market_segment";
pub const ASSIGNED_ROOM_STATUS: &str = "assigned_room_status";
pub const ARRIVAL_DATE_MONTH: &str = "arrival_date_month";
pub const ARRIVAL_MONTH_NUM: &str = "arrival_month_num";
pub const IS_REPEATED_GUEST: &str = "is_repeated_guest";
pub const ADR: &str = "adr";
pub const ADULTS: &str = "adults";

/// Columns every booking dataset must provide, with the type they are parsed as.
///
/// Columns outside this list are kept and typed by inference.
pub fn booking_columns() -> Vec<ColumnSchema> {
    [
        (HOTEL, ColumnType::String),
        (IS_CANCELED, ColumnType::Number),
        (COUNTRY, ColumnType::String),
        (MEAL, ColumnType::String),
        (DEPOSIT_TYPE, ColumnType::String),
        (CUSTOMER_TYPE, ColumnType::String),
        (MARKET_SEGMENT, ColumnType::String),
        (ASSIGNED_ROOM_STATUS, ColumnType::Boolean),
        (ARRIVAL_DATE_MONTH, ColumnType::String),
        (ARRIVAL_MONTH_NUM, ColumnType::Number),
        (IS_REPEATED_GUEST, ColumnType::Number),
        (ADR, ColumnType::Number),
        (ADULTS, ColumnType::Number),
    ]
    .into_iter()
    .map(|(name, column_type)| ColumnSchema::new(name, column_type))
    .collect()
}
