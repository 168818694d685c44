//! Error types shared by the Skyview crates.
//!
//! Each failure domain gets its own enum with a `user_message()` for display;
//! `AppError` is the umbrella the binary reports through. Provider messages and
//! decoding failures are kept apart from transport failures.

use thiserror::Error;

/// Umbrella error for the binary and anything that crosses crate boundaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    /// Recovers a typed configuration error from an `anyhow` chain.
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ConfigError>() {
            Ok(config) => AppError::Config(config),
            Err(other) => AppError::Other(other),
        }
    }
}

impl AppError {
    /// Short, non-technical text for the terminal or a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.category_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

/// Failures below HTTP status handling.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Could not reach the weather service: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unreadable response body: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to reach the weather service. Check your internet connection."
            }
            NetworkError::Timeout => "The weather service took too long to answer. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is having problems. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unreadable response. Please try again."
            }
        }
    }
}

/// Saved-location storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    ConnectionFailed(String),

    #[error("Storage query failed: {0}")]
    QueryFailed(String),

    #[error("Stored data is corrupt: {0}")]
    Corruption(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ConnectionFailed(_) => {
                "Saved locations are unavailable. Check the data directory."
            }
            StorageError::QueryFailed(_) => "Could not update saved locations. Please try again.",
            StorageError::Corruption(_) => {
                "The saved locations database is damaged. Remove it to start fresh."
            }
            StorageError::Serialization(_) => "Could not save locations. Please try again.",
        }
    }
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration directory: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot parse config.toml: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Could not locate a configuration directory.",
            ConfigError::Invalid(_) => "Invalid configuration. Check config.toml.",
            ConfigError::ParseError(_) => "config.toml is malformed. Fix or delete it.",
        }
    }
}

/// Weather provider errors.
///
/// `Decode` is raised when a successful response does not match the
/// endpoint schema; `Network` covers everything below HTTP.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Weather API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl WeatherError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message shown to the user for this failure.
    ///
    /// Provider messages and validation messages are passed through verbatim;
    /// everything else gets a generic, actionable text.
    pub fn user_message(&self) -> String {
        match self {
            Self::LocationNotFound(_) => "Location not found".to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            other => other.category_message().to_string(),
        }
    }

    fn category_message(&self) -> &'static str {
        match self {
            Self::LocationNotFound(_) => "Location not found. Check and try again.",
            Self::MissingApiKey(_) => "Weather API key is not configured. Check settings.",
            Self::Unauthorized(_) => "Weather API key is invalid. Check settings.",
            Self::Api { status, .. } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            Self::Api { .. } => "Weather service error. Please try again.",
            Self::Decode { .. } => "Received unexpected weather data. Please try again.",
            Self::Validation(_) => "Invalid request. Check your input.",
            Self::Network(e) => e.user_message(),
        }
    }
}

/// Classifies a transport-level reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() || self.is_body() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(error: reqwest::Error) -> Self {
        WeatherError::Network(error.into_network_error())
    }
}

/// Classifies a SQLite failure for the storage layer.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}
