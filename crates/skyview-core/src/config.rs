use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the standard OpenWeatherMap key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Environment variable holding the One Call 3.0 subscription key.
pub const ONECALL_API_KEY_ENV: &str = "OPENWEATHER_ONECALL_API_KEY";

/// Default public API base.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Default base for the accumulated and aggregated history endpoints.
pub const DEFAULT_HISTORY_BASE_URL: &str = "https://history.openweathermap.org";

/// Coordinate tolerance, in degrees, under which two points are the same place.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.001;

/// Language codes accepted by the provider's `lang` parameter.
const KNOWN_LANGUAGES: &[&str] = &[
    "af", "al", "ar", "az", "bg", "ca", "cz", "da", "de", "el", "en", "eu", "fa", "fi", "fr",
    "gl", "he", "hi", "hr", "hu", "id", "it", "ja", "kr", "la", "lt", "mk", "no", "nl", "pl",
    "pt", "pt_br", "ro", "ru", "sv", "se", "sk", "sl", "sp", "es", "sr", "th", "tr", "ua",
    "uk", "vi", "zh_cn", "zh_tw", "zu",
];

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Saved locations settings
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin, metres per second
    Standard,
    /// Celsius, metres per second
    #[default]
    Metric,
    /// Fahrenheit, miles per hour
    Imperial,
}

impl Units {
    /// Value of the provider's `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    /// Convert a Kelvin temperature into this unit system.
    ///
    /// Statistical history data always arrives in Kelvin regardless of the
    /// `units` parameter.
    pub fn from_kelvin(&self, kelvin: f64) -> f64 {
        match self {
            Units::Standard => kelvin,
            Units::Metric => kelvin - 273.15,
            Units::Imperial => (kelvin - 273.15) * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Standard => "K",
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            _ => "m/s",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Standard API key. Never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// One Call 3.0 key; falls back to `api_key` when absent. Never written to disk.
    #[serde(skip)]
    pub onecall_api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_history_base_url")]
    pub history_base_url: String,

    #[serde(default)]
    pub units: Units,

    #[serde(default = "default_lang")]
    pub lang: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_history_base_url() -> String {
    DEFAULT_HISTORY_BASE_URL.to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            onecall_api_key: None,
            base_url: default_base_url(),
            history_base_url: default_history_base_url(),
            units: Units::default(),
            lang: default_lang(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// Fill in API keys from the runtime environment, falling back to the
    /// values captured when the binary was built.
    pub fn with_env_keys(mut self) -> Self {
        self.api_key = env_key(API_KEY_ENV, option_env!("OPENWEATHER_API_KEY"));
        self.onecall_api_key = env_key(
            ONECALL_API_KEY_ENV,
            option_env!("OPENWEATHER_ONECALL_API_KEY"),
        );
        self
    }

    /// Standard key, if configured and non-blank.
    pub fn standard_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// Key for One Call endpoints: the dedicated key, else the standard one.
    pub fn onecall_key(&self) -> Option<&str> {
        non_blank(self.onecall_api_key.as_deref()).or_else(|| self.standard_key())
    }
}

fn env_key(name: &str, build_time: Option<&'static str>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| build_time.map(str::to_string))
        .filter(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a lookup is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Trimmed queries shorter than this never reach the network
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Maximum geocoding suggestions per lookup
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u32,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_len() -> usize {
    2
}

fn default_suggestion_limit() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// Storage key under which the saved list lives
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Degrees within which a location counts as already saved
    #[serde(default = "default_match_tolerance")]
    pub match_tolerance_deg: f64,

    /// SQLite file, relative to `config_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_storage_key() -> String {
    "savedLocations".to_string()
}

fn default_match_tolerance() -> f64 {
    DEFAULT_MATCH_TOLERANCE
}

fn default_database_file() -> String {
    "skyview.db".to_string()
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            match_tolerance_deg: default_match_tolerance(),
            database_file: default_database_file(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyview")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            search: SearchConfig::default(),
            favorites: FavoritesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating it with defaults
    /// when absent. API keys are always taken from the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            config
        };

        config.weather = config.weather.with_env_keys();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        Self::validate_url(
            &self.weather.history_base_url,
            "weather.history_base_url",
            &mut result,
        );

        if self.weather.standard_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("{API_KEY_ENV} is not set; weather requests will fail"),
            );
        }

        if !KNOWN_LANGUAGES.contains(&self.weather.lang.as_str()) {
            result.add_warning(
                "weather.lang",
                format!("Unknown language code: {}", self.weather.lang),
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning(
                "weather.timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        if self.search.min_query_len == 0 {
            result.add_warning(
                "search.min_query_len",
                "Every keystroke will trigger a lookup",
            );
        }

        if self.search.suggestion_limit == 0 || self.search.suggestion_limit > 5 {
            result.add_error(
                "search.suggestion_limit",
                "Suggestion limit must be between 1 and 5",
            );
        }

        if !(self.favorites.match_tolerance_deg > 0.0) {
            result.add_error(
                "favorites.match_tolerance_deg",
                "Match tolerance must be a positive number of degrees",
            );
        } else if self.favorites.match_tolerance_deg > 1.0 {
            result.add_warning(
                "favorites.match_tolerance_deg",
                "Match tolerance is unusually large (>1°)",
            );
        }

        if self.favorites.storage_key.trim().is_empty() {
            result.add_error("favorites.storage_key", "Storage key cannot be empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Location of the SQLite file backing saved locations
    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join(&self.favorites.database_file)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".into()))?
            .join("skyview");

        Ok(config_dir.join("config.toml"))
    }
}
