//! OpenWeatherMap REST client.
//!
//! One method per endpoint; every call is a single GET with no retries and
//! no caching. Provider error bodies are decoded into [`WeatherError`].

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skyview_core::{Units, WeatherConfig, WeatherError};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::history::{DateRange, StatisticalAggregation};
use crate::location::LocationQuery;
use crate::types::*;

/// Provider code the accumulated endpoints use for "no data in range".
const NO_DATA_CODE: i64 = 404000;

/// Highest day count accepted by the daily forecast endpoint.
pub const MAX_FORECAST_DAYS: u8 = 16;

/// Most suggestions the direct geocoding endpoint returns.
pub const MAX_GEOCODING_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    name: &'static str,
    path: &'static str,
    fallback: &'static str,
}

const CURRENT: Endpoint = Endpoint {
    name: "current weather",
    path: "/data/2.5/weather",
    fallback: "Failed to fetch current weather",
};
const ONE_CALL: Endpoint = Endpoint {
    name: "one call",
    path: "/data/3.0/onecall",
    fallback: "Failed to fetch forecast data",
};
const AIR_POLLUTION: Endpoint = Endpoint {
    name: "air pollution",
    path: "/data/2.5/air_pollution",
    fallback: "Failed to fetch air pollution data",
};
const TIMEMACHINE: Endpoint = Endpoint {
    name: "historical weather",
    path: "/data/3.0/onecall/timemachine",
    fallback: "Failed to fetch historical weather data",
};
const GEO_DIRECT: Endpoint = Endpoint {
    name: "geocoding",
    path: "/geo/1.0/direct",
    fallback: "Failed to search locations",
};
const GEO_REVERSE: Endpoint = Endpoint {
    name: "reverse geocoding",
    path: "/geo/1.0/reverse",
    fallback: "Failed to look up location name",
};
const DAILY_FORECAST: Endpoint = Endpoint {
    name: "daily forecast",
    path: "/data/2.5/forecast/daily",
    fallback: "Failed to fetch daily forecast data",
};
const ACCUMULATED_TEMPERATURE: Endpoint = Endpoint {
    name: "accumulated temperature",
    path: "/data/2.5/history/accumulated_temperature",
    fallback: "Failed to fetch accumulated temperature data",
};
const ACCUMULATED_PRECIPITATION: Endpoint = Endpoint {
    name: "accumulated precipitation",
    path: "/data/2.5/history/accumulated_precipitation",
    fallback: "Failed to fetch accumulated precipitation data",
};
const STATISTICS: Endpoint = Endpoint {
    name: "statistical weather",
    path: "/data/2.5/aggregated",
    fallback: "Failed to fetch statistical data",
};

/// Error body shape shared by all endpoints. `cod` is a string on some
/// endpoints and a number on others.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    cod: Option<serde_json::Value>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl ProviderErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn message(&self) -> Option<String> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct AccumulatedResponse<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Clone, Copy)]
enum KeyKind {
    Standard,
    OneCall,
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    config: WeatherConfig,
}

impl WeatherProvider {
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    pub fn units(&self) -> Units {
        self.config.units
    }

    /// Current conditions by name or coordinates.
    ///
    /// A 404 from the provider becomes `WeatherError::LocationNotFound`.
    #[instrument(skip(self), level = "info")]
    pub async fn current_weather(&self, query: &LocationQuery) -> Result<CurrentWeather, WeatherError> {
        if let LocationQuery::Name(name) = query {
            if name.trim().is_empty() {
                return Err(WeatherError::validation("Please enter a location"));
            }
        }

        let mut params = query.query_params();
        params.extend(self.display_params());

        let current: CurrentWeather = self
            .get(CURRENT, &self.config.base_url, CURRENT.path, &params, KeyKind::Standard)
            .await
            .map_err(|e| match e {
                WeatherError::Api { status: 404, .. } => {
                    WeatherError::LocationNotFound(query.to_string())
                }
                other => other,
            })?;

        tracing::info!("Fetched current weather for {}", current.name);
        Ok(current)
    }

    /// Current, hourly and daily forecast plus alerts.
    #[instrument(skip(self), level = "info")]
    pub async fn one_call(&self, lat: f64, lon: f64) -> Result<OneCallResponse, WeatherError> {
        let mut params = coordinate_params(lat, lon);
        params.extend(self.display_params());

        let forecast: OneCallResponse = self
            .get(ONE_CALL, &self.config.base_url, ONE_CALL.path, &params, KeyKind::OneCall)
            .await?;

        tracing::info!(
            "Fetched forecast: {} hourly, {} daily, {} alerts",
            forecast.hourly.len(),
            forecast.daily.len(),
            forecast.alerts.len()
        );
        Ok(forecast)
    }

    #[instrument(skip(self), level = "info")]
    pub async fn air_pollution(&self, lat: f64, lon: f64) -> Result<AirPollutionData, WeatherError> {
        let params = coordinate_params(lat, lon);
        self.get(
            AIR_POLLUTION,
            &self.config.base_url,
            AIR_POLLUTION.path,
            &params,
            KeyKind::Standard,
        )
        .await
    }

    /// Conditions at a past instant.
    #[instrument(skip(self), level = "info")]
    pub async fn historical(
        &self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<HistoricalWeather, WeatherError> {
        let mut params = coordinate_params(lat, lon);
        params.push(("dt", at.timestamp().to_string()));
        params.extend(self.display_params());

        self.get(
            TIMEMACHINE,
            &self.config.base_url,
            TIMEMACHINE.path,
            &params,
            KeyKind::OneCall,
        )
        .await
    }

    /// Direct geocoding: up to `limit` places matching `query`.
    #[instrument(skip(self), level = "info")]
    pub async fn geocode(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<GeocodingSuggestion>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::validation("Search text cannot be empty"));
        }

        let limit = limit.clamp(1, MAX_GEOCODING_LIMIT);
        let params = vec![("q", query.to_string()), ("limit", limit.to_string())];

        let suggestions: Vec<GeocodingSuggestion> = self
            .get(
                GEO_DIRECT,
                &self.config.base_url,
                GEO_DIRECT.path,
                &params,
                KeyKind::Standard,
            )
            .await?;

        tracing::debug!("Geocoding '{}' returned {} suggestions", query, suggestions.len());
        Ok(suggestions)
    }

    /// Nearest named place for a point, if any.
    #[instrument(skip(self), level = "info")]
    pub async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<GeocodingSuggestion>, WeatherError> {
        let mut params = coordinate_params(lat, lon);
        params.push(("limit", "1".to_string()));

        let places: Vec<GeocodingSuggestion> = self
            .get(
                GEO_REVERSE,
                &self.config.base_url,
                GEO_REVERSE.path,
                &params,
                KeyKind::Standard,
            )
            .await?;

        Ok(places.into_iter().next())
    }

    /// Daily forecast for 1 to 16 days.
    #[instrument(skip(self), level = "info")]
    pub async fn daily_forecast(
        &self,
        lat: f64,
        lon: f64,
        days: u8,
    ) -> Result<DailyForecastResponse, WeatherError> {
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(WeatherError::validation(format!(
                "Forecast length must be between 1 and {} days",
                MAX_FORECAST_DAYS
            )));
        }

        let mut params = coordinate_params(lat, lon);
        params.push(("cnt", days.to_string()));
        params.extend(self.display_params());

        self.get(
            DAILY_FORECAST,
            &self.config.base_url,
            DAILY_FORECAST.path,
            &params,
            KeyKind::Standard,
        )
        .await
    }

    /// Accumulated temperature above `threshold` Kelvin over `range`.
    ///
    /// A range without data yields an empty list.
    #[instrument(skip(self), level = "info")]
    pub async fn accumulated_temperature(
        &self,
        lat: f64,
        lon: f64,
        range: &DateRange,
        threshold: Option<f64>,
    ) -> Result<Vec<AccumulatedTemperature>, WeatherError> {
        let mut params = range_params(lat, lon, range);
        if let Some(threshold) = threshold {
            params.push(("threshold", threshold.to_string()));
        }

        self.accumulated(ACCUMULATED_TEMPERATURE, &params).await
    }

    /// Accumulated precipitation over `range`.
    ///
    /// A range without data yields an empty list.
    #[instrument(skip(self), level = "info")]
    pub async fn accumulated_precipitation(
        &self,
        lat: f64,
        lon: f64,
        range: &DateRange,
    ) -> Result<Vec<AccumulatedPrecipitation>, WeatherError> {
        let params = range_params(lat, lon, range);
        self.accumulated(ACCUMULATED_PRECIPITATION, &params).await
    }

    /// Long-term statistics for a year, a month or a single day.
    #[instrument(skip(self), level = "info")]
    pub async fn statistics(
        &self,
        lat: f64,
        lon: f64,
        aggregation: StatisticalAggregation,
    ) -> Result<StatisticalResponse, WeatherError> {
        aggregation.validate()?;

        let mut params = coordinate_params(lat, lon);
        params.extend(aggregation.query_params());
        let path = format!("{}/{}", STATISTICS.path, aggregation.path_segment());

        self.get(
            STATISTICS,
            &self.config.history_base_url,
            &path,
            &params,
            KeyKind::Standard,
        )
        .await
    }

    async fn accumulated<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<Vec<T>, WeatherError> {
        let response = self
            .send(endpoint, &self.config.history_base_url, endpoint.path, params, KeyKind::Standard)
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let error = ProviderErrorBody::parse(&body);
        if let Some(code) = error.code {
            if code == NO_DATA_CODE {
                tracing::info!("No {} data for the requested range", endpoint.name);
                return Ok(Vec::new());
            }
            return Err(api_error(status.as_u16(), &error, endpoint));
        }

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &error, endpoint));
        }

        let parsed: AccumulatedResponse<T> = decode(endpoint, &body)?;
        tracing::info!("Fetched {} {} entries", parsed.list.len(), endpoint.name);
        Ok(parsed.list)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        base: &str,
        path: &str,
        params: &[(&'static str, String)],
        key: KeyKind,
    ) -> Result<T, WeatherError> {
        let response = self.send(endpoint, base, path, params, key).await?;
        self.handle_response(endpoint, response).await
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        base: &str,
        path: &str,
        params: &[(&'static str, String)],
        key: KeyKind,
    ) -> Result<reqwest::Response, WeatherError> {
        let key = self.api_key(key)?;
        let url = build_url(base, path, params);
        tracing::debug!("GET {} ({})", url, endpoint.name);

        let response = self
            .client
            .get(format!("{}&appid={}", url, urlencoding::encode(key)))
            .send()
            .await?;

        Ok(response)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            decode(endpoint, &body)
        } else {
            let error = ProviderErrorBody::parse(&body);
            tracing::debug!(
                "{} failed with {} (cod {:?})",
                endpoint.name,
                status,
                error.cod
            );
            Err(classify_failure(status.as_u16(), &error, endpoint))
        }
    }

    fn api_key(&self, kind: KeyKind) -> Result<&str, WeatherError> {
        match kind {
            KeyKind::Standard => self
                .config
                .standard_key()
                .ok_or(WeatherError::MissingApiKey("the standard API")),
            KeyKind::OneCall => self
                .config
                .onecall_key()
                .ok_or(WeatherError::MissingApiKey("the One Call API")),
        }
    }

    fn display_params(&self) -> [(&'static str, String); 2] {
        [
            ("units", self.config.units.as_str().to_string()),
            ("lang", self.config.lang.clone()),
        ]
    }
}

fn coordinate_params(lat: f64, lon: f64) -> Vec<(&'static str, String)> {
    vec![("lat", lat.to_string()), ("lon", lon.to_string())]
}

fn range_params(lat: f64, lon: f64, range: &DateRange) -> Vec<(&'static str, String)> {
    let mut params = coordinate_params(lat, lon);
    params.push(("start", range.start().timestamp().to_string()));
    params.push(("end", range.end().timestamp().to_string()));
    params
}

fn build_url(base: &str, path: &str, params: &[(&'static str, String)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}{}?{}", base.trim_end_matches('/'), path, query)
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T, WeatherError> {
    serde_json::from_str(body).map_err(|e| WeatherError::Decode {
        endpoint: endpoint.name,
        message: e.to_string(),
    })
}

fn classify_failure(status: u16, error: &ProviderErrorBody, endpoint: Endpoint) -> WeatherError {
    if status == 401 {
        WeatherError::Unauthorized(
            error
                .message()
                .unwrap_or_else(|| "Invalid API key".to_string()),
        )
    } else {
        api_error(status, error, endpoint)
    }
}

fn api_error(status: u16, error: &ProviderErrorBody, endpoint: Endpoint) -> WeatherError {
    WeatherError::Api {
        status,
        message: error
            .message()
            .unwrap_or_else(|| endpoint.fallback.to_string()),
    }
}
