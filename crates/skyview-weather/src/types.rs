//! OpenWeatherMap response schemas.
//!
//! Each endpoint gets its own explicit type. Fields the provider omits for
//! some locations are optional or defaulted so that a sparse but valid body
//! still decodes.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::location::Location;

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_condition_id(id: u32) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500 | 501 | 520 | 521 | 531 => Self::Rain,
            502..=504 | 522 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // 800 and unknown ids
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

fn unix_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the provider's `weather` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl Condition {
    pub fn group(&self) -> WeatherCondition {
        WeatherCondition::from_condition_id(self.id)
    }

    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: u8,
    pub sea_level: Option<f64>,
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    #[serde(default)]
    pub all: u8,
}

/// Rain or snow volume in millimetres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "1h")]
    pub last_hour: Option<f64>,
    #[serde(rename = "3h")]
    pub last_three_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Response of `/data/2.5/weather`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    pub rain: Option<Precipitation>,
    pub snow: Option<Precipitation>,
    pub dt: i64,
    #[serde(default)]
    pub sys: Sys,
    /// Shift in seconds from UTC
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl CurrentWeather {
    /// The resolved location this reading belongs to.
    pub fn location(&self) -> Location {
        Location {
            latitude: self.coord.lat,
            longitude: self.coord.lon,
            name: self.name.clone(),
            country: self.sys.country.clone(),
            state: None,
        }
    }

    pub fn condition(&self) -> WeatherCondition {
        self.weather.first().map(Condition::group).unwrap_or_default()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        unix_to_utc(self.dt)
    }
}

/// A single point in time: One Call `current`, `hourly` entries and
/// timemachine `data` entries share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    pub dt: i64,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub temp: f64,
    pub feels_like: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: u8,
    pub dew_point: Option<f64>,
    pub uvi: Option<f64>,
    pub clouds: Option<u8>,
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind_speed: f64,
    pub wind_deg: Option<f64>,
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    /// Probability of precipitation, 0..=1
    pub pop: Option<f64>,
    pub rain: Option<Precipitation>,
    pub snow: Option<Precipitation>,
}

impl WeatherPoint {
    pub fn time(&self) -> DateTime<Utc> {
        unix_to_utc(self.dt)
    }

    pub fn condition(&self) -> WeatherCondition {
        self.weather.first().map(Condition::group).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

/// One Call `daily` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub dt: i64,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub moon_phase: Option<f64>,
    pub summary: Option<String>,
    pub temp: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: u8,
    pub dew_point: Option<f64>,
    #[serde(default)]
    pub wind_speed: f64,
    pub wind_deg: Option<f64>,
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub clouds: Option<u8>,
    pub pop: Option<f64>,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
    pub uvi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    #[serde(default)]
    pub sender_name: String,
    pub event: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Response of `/data/3.0/onecall`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneCallResponse {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i32,
    pub current: Option<WeatherPoint>,
    #[serde(default)]
    pub hourly: Vec<WeatherPoint>,
    #[serde(default)]
    pub daily: Vec<DailyPoint>,
    #[serde(default)]
    pub alerts: Vec<WeatherAlert>,
}

/// Response of `/data/3.0/onecall/timemachine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalWeather {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i32,
    #[serde(default)]
    pub data: Vec<WeatherPoint>,
}

/// European Air Quality Index band reported by the provider (1..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirQualityIndex {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

impl AirQualityIndex {
    pub fn from_aqi(aqi: u8) -> Self {
        match aqi {
            1 => Self::Good,
            2 => Self::Fair,
            3 => Self::Moderate,
            4 => Self::Poor,
            5 => Self::VeryPoor,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Unknown => "Unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Good => {
                "Air quality is satisfactory, and air pollution poses little or no risk."
            }
            Self::Fair => {
                "Air quality is acceptable. However, there may be a risk for some people."
            }
            Self::Moderate => "Members of sensitive groups may experience health effects.",
            Self::Poor => "Everyone may begin to experience health effects.",
            Self::VeryPoor => {
                "Health warnings of emergency conditions. The entire population is likely to be affected."
            }
            Self::Unknown => "Air quality data is not available.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiMain {
    pub aqi: u8,
}

/// Pollutant concentrations in μg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirComponents {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySample {
    pub dt: i64,
    pub main: AqiMain,
    #[serde(default)]
    pub components: AirComponents,
}

impl AirQualitySample {
    pub fn index(&self) -> AirQualityIndex {
        AirQualityIndex::from_aqi(self.main.aqi)
    }
}

/// Response of `/data/2.5/air_pollution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionData {
    pub coord: Coord,
    #[serde(default)]
    pub list: Vec<AirQualitySample>,
}

impl AirPollutionData {
    pub fn latest(&self) -> Option<&AirQualitySample> {
        self.list.first()
    }
}

/// Entry of `/geo/1.0/direct` and `/geo/1.0/reverse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingSuggestion {
    pub name: String,
    #[serde(default)]
    pub local_names: HashMap<String, String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GeocodingSuggestion {
    /// "Name, State, CC" with empty parts left out.
    pub fn display_name(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.state.as_deref())
            .chain(self.country.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_location(&self) -> Location {
        Location {
            latitude: self.lat,
            longitude: self.lon,
            name: self.name.clone(),
            country: self.country.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub coord: Coord,
    #[serde(default)]
    pub country: String,
    pub population: Option<u64>,
    #[serde(default)]
    pub timezone: i32,
}

/// `list` entry of `/data/2.5/forecast/daily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastItem {
    pub dt: i64,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub temp: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    pub gust: Option<f64>,
    #[serde(default)]
    pub clouds: u8,
    #[serde(default)]
    pub pop: f64,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
}

/// Response of `/data/2.5/forecast/daily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastResponse {
    pub city: ForecastCity,
    #[serde(default)]
    pub cnt: u32,
    #[serde(default)]
    pub list: Vec<DailyForecastItem>,
}

/// Running sum of temperature above the threshold, in Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedTemperature {
    pub date: String,
    pub temp: f64,
    pub count: u32,
}

/// Running sum of precipitation, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedPrecipitation {
    pub date: String,
    pub rain: f64,
    pub count: u32,
}

/// Distribution of one measure over the statistical period.
///
/// Temperatures are in Kelvin whatever units were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSummary {
    pub record_min: f64,
    pub record_max: f64,
    pub average_min: f64,
    pub average_max: f64,
    pub median: f64,
    pub mean: f64,
    pub p25: f64,
    pub p75: f64,
    pub st_dev: f64,
    pub num: f64,
    pub min: f64,
    pub max: f64,
}

/// Statistics for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyStatistic {
    pub month: u32,
    pub day: u32,
    pub temp: StatSummary,
    pub pressure: StatSummary,
    pub humidity: StatSummary,
    pub wind: StatSummary,
    pub precipitation: StatSummary,
    pub clouds: StatSummary,
}

/// `result` of the aggregated endpoints: the yearly form returns one entry
/// per day, the monthly and daily forms a single object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatisticalResult {
    Series(Vec<DailyStatistic>),
    Single(DailyStatistic),
}

impl StatisticalResult {
    pub fn days(&self) -> &[DailyStatistic] {
        match self {
            Self::Series(days) => days,
            Self::Single(day) => std::slice::from_ref(day),
        }
    }
}

/// Response of `/data/2.5/aggregated/{year,month,day}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalResponse {
    pub city_id: Option<i64>,
    pub calctime: Option<f64>,
    pub result: StatisticalResult,
}
