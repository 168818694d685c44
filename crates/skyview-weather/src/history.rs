//! Accumulated and statistical history helpers.
//!
//! Request validation for the history endpoints happens here, before any
//! network traffic, together with the client-side monthly aggregation of
//! yearly statistics.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use skyview_core::{Units, WeatherError};

use crate::types::DailyStatistic;

/// Longest range the accumulated endpoints accept, in whole days.
pub const MAX_RANGE_DAYS: i64 = 30;

/// Default accumulation threshold in Kelvin (about 11 °C).
pub const DEFAULT_THRESHOLD_KELVIN: f64 = 284.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// First instant with historical coverage.
pub fn history_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Validated `[start, end]` window for accumulated statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// # Errors
    ///
    /// `WeatherError::Validation` when the range starts before 2017, ends
    /// before it starts, or spans more than 30 whole days.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WeatherError> {
        if start < history_start() {
            return Err(WeatherError::validation(
                "Historical data is only available from 2017 onwards",
            ));
        }

        if end < start {
            return Err(WeatherError::validation(
                "End date cannot be before start date",
            ));
        }

        if (end - start).num_days() > MAX_RANGE_DAYS {
            return Err(WeatherError::validation(format!(
                "Date range cannot exceed {} days",
                MAX_RANGE_DAYS
            )));
        }

        Ok(Self { start, end })
    }

    /// The `days` days ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Result<Self, WeatherError> {
        if i64::from(days) > MAX_RANGE_DAYS {
            return Err(WeatherError::validation(format!(
                "Date range cannot exceed {} days",
                MAX_RANGE_DAYS
            )));
        }
        Self::new(now - Duration::days(i64::from(days)), now)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Granularity of the aggregated statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "aggregation", rename_all = "lowercase")]
pub enum StatisticalAggregation {
    /// One entry per day of the year
    Year,
    Month { month: u32 },
    Day { month: u32, day: u32 },
}

impl StatisticalAggregation {
    /// Path segment under `/data/2.5/aggregated/`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month { .. } => "month",
            Self::Day { .. } => "day",
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Year => Vec::new(),
            Self::Month { month } => vec![("month", month.to_string())],
            Self::Day { month, day } => {
                vec![("month", month.to_string()), ("day", day.to_string())]
            }
        }
    }

    /// # Errors
    ///
    /// `WeatherError::Validation` for a month outside 1..=12 or a day that
    /// does not exist in that month (29 February is allowed).
    pub fn validate(&self) -> Result<(), WeatherError> {
        let month = match self {
            Self::Year => return Ok(()),
            Self::Month { month } | Self::Day { month, .. } => *month,
        };

        if !(1..=12).contains(&month) {
            return Err(WeatherError::validation(format!(
                "Month must be between 1 and 12, got: {}",
                month
            )));
        }

        if let Self::Day { day, .. } = self {
            let last = days_in_month(month);
            if !(1..=last).contains(day) {
                return Err(WeatherError::validation(format!(
                    "Day must be between 1 and {} for {}, got: {}",
                    last,
                    month_name(month),
                    day
                )));
            }
        }

        Ok(())
    }
}

fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// English month name for 1..=12, empty otherwise.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Per-month view of yearly daily statistics.
///
/// Temperatures stay in Kelvin; use [`MonthlySummary::temperatures`] to
/// convert for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub month_name: String,
    pub mean_temp: f64,
    pub record_min_temp: f64,
    pub record_max_temp: f64,
    pub mean_precipitation: f64,
    pub max_precipitation: f64,
    pub mean_wind: f64,
    pub max_wind: f64,
    pub mean_humidity: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
}

impl MonthlySummary {
    /// (mean, record low, record high) in the requested units.
    pub fn temperatures(&self, units: Units) -> (f64, f64, f64) {
        (
            units.from_kelvin(self.mean_temp),
            units.from_kelvin(self.record_min_temp),
            units.from_kelvin(self.record_max_temp),
        )
    }
}

/// Group daily statistics by calendar month.
///
/// Only months with at least one day appear, in calendar order.
pub fn monthly_summaries(days: &[DailyStatistic]) -> Vec<MonthlySummary> {
    (1..=12u32)
        .filter_map(|month| {
            let items: Vec<&DailyStatistic> = days.iter().filter(|d| d.month == month).collect();
            if items.is_empty() {
                return None;
            }

            let count = items.len() as f64;
            let mean = |f: fn(&DailyStatistic) -> f64| items.iter().map(|d| f(d)).sum::<f64>() / count;
            let min = |f: fn(&DailyStatistic) -> f64| {
                items.iter().map(|d| f(d)).fold(f64::INFINITY, f64::min)
            };
            let max = |f: fn(&DailyStatistic) -> f64| {
                items.iter().map(|d| f(d)).fold(f64::NEG_INFINITY, f64::max)
            };

            Some(MonthlySummary {
                month,
                month_name: month_name(month).to_string(),
                mean_temp: mean(|d| d.temp.mean),
                record_min_temp: min(|d| d.temp.record_min),
                record_max_temp: max(|d| d.temp.record_max),
                mean_precipitation: mean(|d| d.precipitation.mean),
                max_precipitation: max(|d| d.precipitation.max),
                mean_wind: mean(|d| d.wind.mean),
                max_wind: max(|d| d.wind.max),
                mean_humidity: mean(|d| d.humidity.mean),
                min_humidity: min(|d| d.humidity.min),
                max_humidity: max(|d| d.humidity.max),
            })
        })
        .collect()
}
