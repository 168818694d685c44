//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses the provider's `/geo/1.0/reverse` endpoint.

use crate::location::format_coordinates;
use crate::provider::WeatherProvider;

/// Reverse geocode coordinates to a place name (e.g. "Seattle, Washington").
/// Returns `None` on failure or when nothing is nearby; the caller can fall
/// back to coordinates.
pub async fn reverse_geocode(provider: &WeatherProvider, lat: f64, lon: f64) -> Option<String> {
    let place = match provider.reverse_geocode(lat, lon).await {
        Ok(Some(place)) => place,
        Ok(None) => {
            tracing::debug!("Reverse geocode found nothing near {}, {}", lat, lon);
            return None;
        }
        Err(e) => {
            tracing::debug!("Reverse geocode request failed: {}", e);
            return None;
        }
    };

    let name = place.to_location().display_name();
    if name.trim().is_empty() {
        return None;
    }

    tracing::info!("Reverse geocoded to: {}", name);
    Some(name)
}

/// Place name for a point, or its formatted coordinates when no name is known.
pub async fn place_name(provider: &WeatherProvider, lat: f64, lon: f64) -> String {
    reverse_geocode(provider, lat, lon)
        .await
        .unwrap_or_else(|| format_coordinates(lat, lon))
}
