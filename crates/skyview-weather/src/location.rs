//! Location model and free-text location parsing.

use serde::{Deserialize, Serialize};
use skyview_core::WeatherError;
use std::fmt;

/// A resolved place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl Location {
    /// Location known only by its coordinates.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: format_coordinates(latitude, longitude),
            country: None,
            state: None,
        }
    }

    /// Name with state or country appended for disambiguation.
    pub fn display_name(&self) -> String {
        let suffix = self
            .state
            .as_deref()
            .filter(|s| !s.is_empty() && *s != self.name)
            .or_else(|| {
                self.country
                    .as_deref()
                    .filter(|c| !c.is_empty() && *c != self.name)
            });

        match suffix {
            Some(s) => format!("{}, {}", self.name, s),
            None => self.name.clone(),
        }
    }
}

/// Micro-degrees per degree. Coordinate differences are compared at this
/// resolution so that 51.501 - 51.5 counts as exactly 0.001.
const MICRODEGREES: f64 = 1e6;

/// True when `a` and `b` differ by strictly less than `tolerance` degrees.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    ((a - b).abs() * MICRODEGREES).round() < (tolerance * MICRODEGREES).round()
}

/// Coordinates rendered as a fallback place name.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.4}, {:.4}", latitude, longitude)
}

/// What the user asked for: a place name or a point.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Free-text name, e.g. "London" or "London,GB"
    Name(String),
    Coordinates { lat: f64, lon: f64 },
}

impl LocationQuery {
    /// Parse user input.
    ///
    /// `"lat,lon"` or `"lat lon"` within valid ranges becomes coordinates;
    /// anything else non-empty is a name.
    pub fn parse(input: &str) -> Result<Self, WeatherError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(WeatherError::validation("Please enter a location"));
        }

        if let Some((lat, lon)) = parse_coordinates(input) {
            return Ok(Self::Coordinates { lat, lon });
        }

        Ok(Self::Name(input.to_string()))
    }

    /// Query parameters selecting this location on the current-weather endpoint.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Name(name) => vec![("q", name.clone())],
            Self::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Coordinates { lat, lon } => write!(f, "{}", format_coordinates(*lat, *lon)),
        }
    }
}

fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let [lat, lon] = parts.as_slice() else {
        return None;
    };

    let lat = lat.parse::<f64>().ok()?;
    let lon = lon.parse::<f64>().ok()?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    Some((lat, lon))
}
