#![allow(dead_code)]

use booking_columnar::{ColumnarTableBuilder, Value};
use booking_model::schema::booking_columns;
use booking_model::Dataset;

/// One booking row with dashboard-relevant fields; everything else is fixed.
#[derive(Clone, Debug)]
pub struct Booking {
    pub hotel: &'static str,
    pub canceled: bool,
    pub country: Option<&'static str>,
    pub deposit: &'static str,
    pub assigned: bool,
    pub month: (&'static str, u32),
    pub adr: Option<f64>,
    pub meal: &'static str,
    pub repeated: bool,
}

impl Default for Booking {
    fn default() -> Self {
        Self {
            hotel: "Resort Hotel",
            canceled: false,
            country: Some("PRT"),
            deposit: "No Deposit",
            assigned: true,
            month: ("July", 7),
            adr: Some(100.0),
            meal: "BB",
            repeated: false,
        }
    }
}

impl Booking {
    pub fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.hotel),
            Value::Number(if self.canceled { 1.0 } else { 0.0 }),
            self.country.map(Value::from).unwrap_or(Value::Null),
            Value::from(self.meal),
            Value::from(self.deposit),
            Value::from("Transient"),
            Value::from("Online TA"),
            Value::Boolean(self.assigned),
            Value::from(self.month.0),
            Value::Number(f64::from(self.month.1)),
            Value::Number(if self.repeated { 1.0 } else { 0.0 }),
            self.adr.map(Value::Number).unwrap_or(Value::Null),
            Value::Number(2.0),
        ]
    }
}

pub fn dataset(bookings: &[Booking]) -> Dataset {
    let mut builder = ColumnarTableBuilder::new(booking_columns());
    for booking in bookings {
        builder.append_row(&booking.values());
    }
    Dataset::new(builder.finalize())
}

pub fn text(s: &str) -> Value {
    Value::from(s)
}
