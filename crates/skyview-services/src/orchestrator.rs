//! Weather orchestration: one mandatory fetch, then a concurrent fan-out.
//!
//! Current conditions decide whether a snapshot exists at all. Air quality,
//! yesterday's conditions and the One Call forecast are fetched together
//! from the resolved coordinates; each may fail without affecting the others.
//! The history and extended forecast views are loaded on demand for a
//! snapshot's coordinates.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use skyview_core::WeatherError;
use skyview_weather::{
    monthly_summaries, AccumulatedPrecipitation, AccumulatedTemperature, AirPollutionData,
    CurrentWeather, DailyForecastResponse, DailyStatistic, DateRange, HistoricalWeather, Location,
    LocationQuery, MonthlySummary, OneCallResponse, StatisticalAggregation, WeatherProvider,
};
use std::fmt;
use tracing::instrument;

/// Optional part of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPart {
    AirPollution,
    Historical,
    Forecast,
}

impl SnapshotPart {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AirPollution => "air quality",
            Self::Historical => "historical weather",
            Self::Forecast => "forecast",
        }
    }
}

impl fmt::Display for SnapshotPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything known about one location at one moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: CurrentWeather,
    pub forecast: Option<OneCallResponse>,
    pub air_pollution: Option<AirPollutionData>,
    pub historical: Option<HistoricalWeather>,
    /// Instant the historical data refers to
    pub historical_at: DateTime<Utc>,
    /// Optional parts that failed to load, in fetch order
    pub unavailable: Vec<SnapshotPart>,
}

impl WeatherSnapshot {
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }

    /// Informational message naming the missing parts, if any.
    pub fn notice(&self) -> Option<String> {
        if self.unavailable.is_empty() {
            return None;
        }
        let parts = self
            .unavailable
            .iter()
            .map(SnapshotPart::label)
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("Some data is currently unavailable: {}", parts))
    }
}

/// Accumulated temperature and precipitation over one date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulatedData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Kelvin
    pub threshold: f64,
    pub temperature: Vec<AccumulatedTemperature>,
    pub precipitation: Vec<AccumulatedPrecipitation>,
}

/// Long-term statistics for one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsData {
    pub aggregation: StatisticalAggregation,
    pub days: Vec<DailyStatistic>,
    /// Per-month summaries, only for [`StatisticalAggregation::Year`]
    pub monthly: Vec<MonthlySummary>,
}

fn optional<T>(part: SnapshotPart, result: Result<T, WeatherError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", part, e);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherOrchestrator {
    provider: WeatherProvider,
}

impl WeatherOrchestrator {
    pub fn new(provider: WeatherProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &WeatherProvider {
        &self.provider
    }

    /// Build a snapshot for `query`, using 24 hours ago for historical data.
    ///
    /// # Errors
    /// Only a failed current-weather fetch is an error.
    pub async fn resolve(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        self.resolve_at(query, Utc::now()).await
    }

    /// Like [`resolve`](Self::resolve) with an explicit "now".
    #[instrument(skip(self), level = "info")]
    pub async fn resolve_at(
        &self,
        query: &LocationQuery,
        now: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let current = self.provider.current_weather(query).await?;
        let (lat, lon) = (current.coord.lat, current.coord.lon);
        let historical_at = now - Duration::hours(24);

        let (air, historical, forecast) = tokio::join!(
            self.provider.air_pollution(lat, lon),
            self.provider.historical(lat, lon, historical_at),
            self.provider.one_call(lat, lon),
        );

        let mut unavailable = Vec::new();
        let air_pollution = optional(SnapshotPart::AirPollution, air);
        if air_pollution.is_none() {
            unavailable.push(SnapshotPart::AirPollution);
        }
        let historical = optional(SnapshotPart::Historical, historical);
        if historical.is_none() {
            unavailable.push(SnapshotPart::Historical);
        }
        let forecast = optional(SnapshotPart::Forecast, forecast);
        if forecast.is_none() {
            unavailable.push(SnapshotPart::Forecast);
        }

        let snapshot = WeatherSnapshot {
            location: current.location(),
            current,
            forecast,
            air_pollution,
            historical,
            historical_at,
            unavailable,
        };

        tracing::info!(
            "Resolved {} ({} optional parts unavailable)",
            snapshot.location.name,
            snapshot.unavailable.len()
        );
        Ok(snapshot)
    }

    /// Re-fetch historical data for `at` and merge it into `snapshot`.
    ///
    /// # Errors
    /// Returns the fetch error; the snapshot is left untouched.
    #[instrument(skip(self, snapshot), level = "info")]
    pub async fn refresh_historical(
        &self,
        snapshot: &mut WeatherSnapshot,
        at: DateTime<Utc>,
    ) -> Result<(), WeatherError> {
        let (lat, lon) = (snapshot.location.latitude, snapshot.location.longitude);
        let historical = self.provider.historical(lat, lon, at).await?;

        snapshot.historical = Some(historical);
        snapshot.historical_at = at;
        snapshot.unavailable.retain(|p| *p != SnapshotPart::Historical);
        Ok(())
    }

    /// Fetch both accumulated series for `range` concurrently.
    ///
    /// # Errors
    /// Either fetch failing fails the whole load.
    #[instrument(skip(self), level = "info")]
    pub async fn accumulated(
        &self,
        lat: f64,
        lon: f64,
        range: DateRange,
        threshold: f64,
    ) -> Result<AccumulatedData, WeatherError> {
        let (temperature, precipitation) = tokio::join!(
            self.provider
                .accumulated_temperature(lat, lon, &range, Some(threshold)),
            self.provider.accumulated_precipitation(lat, lon, &range),
        );

        Ok(AccumulatedData {
            start: range.start(),
            end: range.end(),
            threshold,
            temperature: temperature?,
            precipitation: precipitation?,
        })
    }

    #[instrument(skip(self), level = "info")]
    pub async fn statistics(
        &self,
        lat: f64,
        lon: f64,
        aggregation: StatisticalAggregation,
    ) -> Result<StatisticsData, WeatherError> {
        let response = self.provider.statistics(lat, lon, aggregation).await?;
        let days = response.result.days().to_vec();
        let monthly = match aggregation {
            StatisticalAggregation::Year => monthly_summaries(&days),
            _ => Vec::new(),
        };

        tracing::debug!("Loaded {} daily statistics", days.len());
        Ok(StatisticsData {
            aggregation,
            days,
            monthly,
        })
    }

    pub async fn daily_forecast(
        &self,
        lat: f64,
        lon: f64,
        days: u8,
    ) -> Result<DailyForecastResponse, WeatherError> {
        self.provider.daily_forecast(lat, lon, days).await
    }
}
