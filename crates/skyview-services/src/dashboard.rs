//! Dashboard controller.
//!
//! Wires search, orchestration and saved locations into one view state.
//! Every operation takes `&mut self`, so events are handled one at a time
//! in arrival order; suspension only happens at network calls.

use chrono::{DateTime, Utc};
use skyview_core::{FavoritesConfig, SearchConfig};
use skyview_weather::{
    place_name, DailyForecastResponse, DateRange, GeocodingSuggestion, LocationQuery,
    StatisticalAggregation, WeatherProvider, DEFAULT_THRESHOLD_KELVIN,
};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::favorites::{FavoritesError, FavoritesStore, SavedLocation};
use crate::orchestrator::{AccumulatedData, StatisticsData, WeatherOrchestrator, WeatherSnapshot};
use crate::search::{SearchAction, SearchMachine, SuggestionDebouncer, SuggestionEvent};
use crate::storage::KeyValueStorage;

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub loading: bool,
    pub historical_loading: bool,
    /// User-facing error from the last operation
    pub error: Option<String>,
    /// Informational message, e.g. parts of the snapshot that failed
    pub notice: Option<String>,
    pub snapshot: Option<WeatherSnapshot>,
    /// Set while an accumulated, statistics or daily forecast load runs
    pub details_loading: bool,
    pub accumulated: Option<AccumulatedData>,
    pub statistics: Option<StatisticsData>,
    pub daily_forecast: Option<DailyForecastResponse>,
}

pub struct Dashboard {
    orchestrator: WeatherOrchestrator,
    search: SearchMachine,
    debouncer: SuggestionDebouncer,
    events: mpsc::UnboundedReceiver<SuggestionEvent>,
    favorites: FavoritesStore,
    view: ViewState,
}

impl Dashboard {
    pub fn new(
        provider: WeatherProvider,
        storage: Box<dyn KeyValueStorage>,
        search: &SearchConfig,
        favorites: &FavoritesConfig,
    ) -> Self {
        let (debouncer, events) = SuggestionDebouncer::new(
            provider.clone(),
            Duration::from_millis(search.debounce_ms),
            search.suggestion_limit,
        );

        Self {
            orchestrator: WeatherOrchestrator::new(provider),
            search: SearchMachine::new(search.min_query_len),
            debouncer,
            events,
            favorites: FavoritesStore::load(
                storage,
                favorites.storage_key.clone(),
                favorites.match_tolerance_deg,
            ),
            view: ViewState::default(),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn search_text(&self) -> &str {
        self.search.text()
    }

    pub fn suggestions(&self) -> &[GeocodingSuggestion] {
        self.search.suggestions()
    }

    // Search

    pub fn on_search_input(&mut self, text: &str) {
        match self.search.input(text) {
            SearchAction::Cancel => self.debouncer.cancel(),
            SearchAction::Schedule { generation, query } => {
                self.debouncer.schedule(generation, query)
            }
        }
    }

    /// Wait for the next debounced lookup and apply it.
    ///
    /// Returns whether the suggestion list changed.
    pub async fn next_suggestions(&mut self) -> bool {
        let Some(event) = self.events.recv().await else {
            return false;
        };

        match event.result {
            Ok(list) => self.search.apply_suggestions(event.generation, list),
            Err(e) => {
                tracing::warn!("Location lookup failed: {}", e);
                self.search.lookup_failed(event.generation)
            }
        }
    }

    /// Resolve the suggestion at `index`. Returns false if there is none.
    pub async fn select_suggestion(&mut self, index: usize) -> bool {
        match self.search.select(index) {
            Some(query) => {
                self.debouncer.cancel();
                self.resolve(query).await;
                true
            }
            None => false,
        }
    }

    pub async fn submit_search(&mut self) {
        self.debouncer.cancel();
        if let Some(query) = self.search.submit() {
            self.resolve(query).await;
        }
    }

    // Direct location sources

    pub async fn on_map_click(&mut self, lat: f64, lon: f64) {
        self.resolve(LocationQuery::Coordinates { lat, lon }).await;
    }

    pub async fn on_geolocated(&mut self, lat: f64, lon: f64) {
        tracing::info!("Using device location");
        self.resolve(LocationQuery::Coordinates { lat, lon }).await;
    }

    /// Resolve a saved location. Returns false for an unknown id.
    pub async fn select_saved(&mut self, id: &str) -> bool {
        let Some(saved) = self.favorites.get(id) else {
            return false;
        };
        let query = LocationQuery::Coordinates {
            lat: saved.lat,
            lon: saved.lon,
        };
        self.resolve(query).await;
        true
    }

    /// Replace the snapshot with a fresh one for `query`.
    pub async fn resolve(&mut self, query: LocationQuery) {
        self.view.snapshot = None;
        self.view.error = None;
        self.view.notice = None;
        self.view.accumulated = None;
        self.view.statistics = None;
        self.view.daily_forecast = None;
        self.view.loading = true;

        match self.orchestrator.resolve(&query).await {
            Ok(snapshot) => {
                self.view.notice = snapshot.notice();
                self.view.snapshot = Some(snapshot);
            }
            Err(e) => {
                tracing::error!("Failed to resolve {}: {}", query, e);
                self.view.error = Some(e.user_message());
            }
        }

        self.view.loading = false;
    }

    /// Refresh only the historical part for `at`. The snapshot survives a
    /// failure; the error is reported alongside it.
    pub async fn change_historical_date(&mut self, at: DateTime<Utc>) {
        let Some(snapshot) = self.view.snapshot.as_mut() else {
            return;
        };

        self.view.historical_loading = true;
        let result = self.orchestrator.refresh_historical(snapshot, at).await;
        self.view.historical_loading = false;

        match result {
            Ok(()) => {
                self.view.notice = self.view.snapshot.as_ref().and_then(WeatherSnapshot::notice);
            }
            Err(e) => {
                tracing::warn!("Historical refresh failed: {}", e);
                self.view.error = Some(e.user_message());
            }
        }
    }

    // Detail views for the current snapshot

    fn snapshot_coordinates(&self) -> Option<(f64, f64)> {
        self.view
            .snapshot
            .as_ref()
            .map(|s| (s.location.latitude, s.location.longitude))
    }

    /// Load accumulated temperature and precipitation for `[start, end]`.
    ///
    /// `threshold` is in Kelvin and defaults to
    /// [`DEFAULT_THRESHOLD_KELVIN`]. An invalid range is reported without a
    /// request. On failure the previous data is kept.
    pub async fn load_accumulated(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        threshold: Option<f64>,
    ) {
        let Some((lat, lon)) = self.snapshot_coordinates() else {
            return;
        };
        self.view.error = None;

        let range = match DateRange::new(start, end) {
            Ok(range) => range,
            Err(e) => {
                self.view.error = Some(e.user_message());
                return;
            }
        };
        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD_KELVIN);

        self.view.details_loading = true;
        let result = self.orchestrator.accumulated(lat, lon, range, threshold).await;
        self.view.details_loading = false;

        match result {
            Ok(data) => self.view.accumulated = Some(data),
            Err(e) => {
                tracing::warn!("Accumulated data failed: {}", e);
                self.view.error = Some(e.user_message());
            }
        }
    }

    /// Load long-term statistics. Yearly statistics also carry monthly
    /// summaries.
    pub async fn load_statistics(&mut self, aggregation: StatisticalAggregation) {
        let Some((lat, lon)) = self.snapshot_coordinates() else {
            return;
        };
        self.view.error = None;

        self.view.details_loading = true;
        let result = self.orchestrator.statistics(lat, lon, aggregation).await;
        self.view.details_loading = false;

        match result {
            Ok(data) => self.view.statistics = Some(data),
            Err(e) => {
                tracing::warn!("Statistics failed: {}", e);
                self.view.error = Some(e.user_message());
            }
        }
    }

    pub async fn load_daily_forecast(&mut self, days: u8) {
        let Some((lat, lon)) = self.snapshot_coordinates() else {
            return;
        };
        self.view.error = None;

        self.view.details_loading = true;
        let result = self.orchestrator.daily_forecast(lat, lon, days).await;
        self.view.details_loading = false;

        match result {
            Ok(forecast) => self.view.daily_forecast = Some(forecast),
            Err(e) => {
                tracing::warn!("Daily forecast failed: {}", e);
                self.view.error = Some(e.user_message());
            }
        }
    }

    // Saved locations

    /// Save a point. A blank name is replaced by the reverse-geocoded place
    /// name, or the formatted coordinates when none is found.
    pub async fn save_location(
        &mut self,
        name: &str,
        lat: f64,
        lon: f64,
    ) -> Result<SavedLocation, FavoritesError> {
        let name = if name.trim().is_empty() {
            place_name(self.orchestrator.provider(), lat, lon).await
        } else {
            name.to_string()
        };

        self.favorites.add(&name, lat, lon)
    }

    /// Save the location of the current snapshot, if there is one.
    pub async fn save_current(&mut self) -> Result<Option<SavedLocation>, FavoritesError> {
        let Some(snapshot) = self.view.snapshot.as_ref() else {
            return Ok(None);
        };
        let location = snapshot.location.clone();

        self.save_location(&location.display_name(), location.latitude, location.longitude)
            .await
            .map(Some)
    }

    pub fn delete_saved(&mut self, id: &str) -> Result<bool, FavoritesError> {
        self.favorites.remove(id)
    }

    pub fn is_saved(&self, lat: f64, lon: f64) -> bool {
        self.favorites.is_saved(lat, lon)
    }

    pub fn saved_locations(&self) -> &[SavedLocation] {
        self.favorites.list()
    }
}
