use serde::{Deserialize, Serialize};

/// Which end of the country ranking to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryOrder {
    /// Most bookings first.
    #[default]
    Top,
    /// Fewest bookings first.
    Bottom,
}

/// Presentation settings for the dashboard panels.
///
/// Missing fields in a config file fall back to [`PanelOptions::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelOptions {
    /// Decimals for the cancellation rate by country.
    pub rate_decimals: u32,
    /// Decimals for the monthly cancellation rates.
    pub trend_rate_decimals: u32,
    /// Decimals for breakdown shares.
    pub share_decimals: u32,
    /// Decimals for metric cards.
    pub metric_decimals: u32,
    pub country_order: CountryOrder,
    pub country_limit: usize,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            rate_decimals: 1,
            trend_rate_decimals: 2,
            share_decimals: 1,
            metric_decimals: 2,
            country_order: CountryOrder::Top,
            country_limit: 5,
        }
    }
}
