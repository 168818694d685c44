//! Weather data for Skyview
//!
//! Typed OpenWeatherMap client covering current conditions, forecasts,
//! air quality, history and geocoding.

pub mod geocode;
pub mod history;
pub mod location;
pub mod provider;
pub mod types;

pub use geocode::{place_name, reverse_geocode};
pub use history::{
    monthly_summaries, DateRange, MonthlySummary, StatisticalAggregation, DEFAULT_THRESHOLD_KELVIN,
};
pub use location::{format_coordinates, within_tolerance, Location, LocationQuery};
pub use provider::WeatherProvider;
pub use types::*;
