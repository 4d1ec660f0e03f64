use crate::error::PivotResult;
use crate::filter::{MultiSelect, Predicate};
use booking_model::schema::{ASSIGNED_ROOM_STATUS, DEPOSIT_TYPE, HOTEL, IS_CANCELED};
use serde::{Deserialize, Serialize};

pub const HOTEL_TYPES: [&str; 2] = ["Resort Hotel", "City Hotel"];
pub const DEPOSIT_TYPES: [&str; 3] = ["No Deposit", "Non Refund", "Refundable"];

/// Cancellation state of a booking as offered in the sidebar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Cancelled,
    NotCancelled,
}

impl BookingStatus {
    /// Value of the `is_canceled` column for this status.
    pub fn is_canceled(self) -> f64 {
        match self {
            BookingStatus::Cancelled => 1.0,
            BookingStatus::NotCancelled => 0.0,
        }
    }
}

/// The four sidebar selections, passed explicitly into every panel.
///
/// The default selects everything, which filters nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardFilters {
    hotel: MultiSelect,
    status: MultiSelect,
    assigned_room: MultiSelect,
    deposit: MultiSelect,
}

impl Default for DashboardFilters {
    fn default() -> Self {
        Self {
            hotel: MultiSelect::new(HOTEL, HOTEL_TYPES),
            status: MultiSelect::new(
                IS_CANCELED,
                [BookingStatus::Cancelled, BookingStatus::NotCancelled].map(BookingStatus::is_canceled),
            ),
            assigned_room: MultiSelect::new(ASSIGNED_ROOM_STATUS, [true, false]),
            deposit: MultiSelect::new(DEPOSIT_TYPE, DEPOSIT_TYPES),
        }
    }
}

impl DashboardFilters {
    pub fn with_hotels<'a>(mut self, hotels: impl IntoIterator<Item = &'a str>) -> PivotResult<Self> {
        self.hotel = self.hotel.select(hotels)?;
        Ok(self)
    }

    pub fn with_statuses(
        mut self,
        statuses: impl IntoIterator<Item = BookingStatus>,
    ) -> PivotResult<Self> {
        self.status = self
            .status
            .select(statuses.into_iter().map(BookingStatus::is_canceled))?;
        Ok(self)
    }

    pub fn with_assigned_room(
        mut self,
        assigned: impl IntoIterator<Item = bool>,
    ) -> PivotResult<Self> {
        self.assigned_room = self.assigned_room.select(assigned)?;
        Ok(self)
    }

    pub fn with_deposits<'a>(
        mut self,
        deposits: impl IntoIterator<Item = &'a str>,
    ) -> PivotResult<Self> {
        self.deposit = self.deposit.select(deposits)?;
        Ok(self)
    }

    /// All predicates in application order: hotel, cancellation, assigned room, deposit.
    pub fn predicates(&self) -> Vec<Predicate> {
        [&self.hotel, &self.status, &self.assigned_room, &self.deposit]
            .into_iter()
            .map(MultiSelect::to_predicate)
            .collect()
    }

    /// The hotel-type predicate alone, for panels that ignore the other selections.
    pub fn hotel_predicates(&self) -> Vec<Predicate> {
        vec![self.hotel.to_predicate()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_columnar::FilterValue;

    #[test]
    fn default_filters_are_all_identity() {
        let filters = DashboardFilters::default();
        assert!(filters.predicates().iter().all(|p| *p == Predicate::Identity));
    }

    #[test]
    fn predicates_follow_fixed_order() {
        let filters = DashboardFilters::default()
            .with_deposits(["Refundable"])
            .unwrap()
            .with_hotels(["City Hotel"])
            .unwrap()
            .with_statuses([BookingStatus::Cancelled])
            .unwrap();
        assert_eq!(
            filters.predicates(),
            vec![
                Predicate::equals(HOTEL, "City Hotel"),
                Predicate::equals(IS_CANCELED, FilterValue::Number(1.0)),
                Predicate::Identity,
                Predicate::equals(DEPOSIT_TYPE, "Refundable"),
            ]
        );
        assert_eq!(
            filters.hotel_predicates(),
            vec![Predicate::equals(HOTEL, "City Hotel")]
        );
    }
}
