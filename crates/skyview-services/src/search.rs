//! Location search: debounced geocoding suggestions.
//!
//! `SearchMachine` is the pure state of the search box. `SuggestionDebouncer`
//! runs the delayed lookups and reports results over a channel; results are
//! tagged with the generation they were scheduled for so stale ones can be
//! dropped by the machine.

use skyview_core::WeatherError;
use skyview_weather::{GeocodingSuggestion, LocationQuery, WeatherProvider};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Nothing pending, no suggestions shown
    Idle,
    /// A lookup is scheduled or in flight
    Debouncing,
    /// Suggestions are shown
    Suggesting,
    /// A location was chosen
    Selected,
}

/// What the caller must do after an input change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// Drop any pending lookup
    Cancel,
    /// Look up `query` after the debounce interval
    Schedule { generation: u64, query: String },
}

#[derive(Debug, Clone)]
pub struct SearchMachine {
    text: String,
    phase: SearchPhase,
    generation: u64,
    suggestions: Vec<GeocodingSuggestion>,
    min_query_len: usize,
}

impl SearchMachine {
    pub fn new(min_query_len: usize) -> Self {
        Self {
            text: String::new(),
            phase: SearchPhase::Idle,
            generation: 0,
            suggestions: Vec::new(),
            min_query_len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn suggestions(&self) -> &[GeocodingSuggestion] {
        &self.suggestions
    }

    /// Record new search text.
    ///
    /// Every call invalidates earlier lookups. Short input never schedules one.
    pub fn input(&mut self, text: &str) -> SearchAction {
        self.text = text.to_string();
        self.generation += 1;

        let query = text.trim();
        if query.chars().count() < self.min_query_len {
            self.suggestions.clear();
            self.phase = SearchPhase::Idle;
            return SearchAction::Cancel;
        }

        self.phase = SearchPhase::Debouncing;
        SearchAction::Schedule {
            generation: self.generation,
            query: query.to_string(),
        }
    }

    /// Apply lookup results. Returns false (and changes nothing) for stale
    /// generations or when the search is no longer waiting.
    pub fn apply_suggestions(&mut self, generation: u64, suggestions: Vec<GeocodingSuggestion>) -> bool {
        if generation != self.generation || self.phase != SearchPhase::Debouncing {
            tracing::debug!(
                "Ignoring suggestions for generation {} (current {})",
                generation,
                self.generation
            );
            return false;
        }

        self.phase = if suggestions.is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::Suggesting
        };
        self.suggestions = suggestions;
        true
    }

    /// Record a failed lookup. Stale failures are ignored.
    pub fn lookup_failed(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.phase != SearchPhase::Debouncing {
            return false;
        }

        self.suggestions.clear();
        self.phase = SearchPhase::Idle;
        true
    }

    /// Choose a suggestion. Returns the coordinates to resolve, or `None`
    /// for an out-of-range index.
    pub fn select(&mut self, index: usize) -> Option<LocationQuery> {
        let chosen = self.suggestions.get(index)?.clone();

        self.text = chosen.display_name();
        self.suggestions.clear();
        self.generation += 1;
        self.phase = SearchPhase::Selected;

        Some(LocationQuery::Coordinates {
            lat: chosen.lat,
            lon: chosen.lon,
        })
    }

    /// Submit the search box: the top suggestion if any, else the text as a
    /// name. Blank text resolves nothing.
    pub fn submit(&mut self) -> Option<LocationQuery> {
        if !self.suggestions.is_empty() {
            return self.select(0);
        }

        self.generation += 1;
        let name = self.text.trim();
        if name.is_empty() {
            self.phase = SearchPhase::Idle;
            return None;
        }

        let query = LocationQuery::Name(name.to_string());
        self.phase = SearchPhase::Selected;
        Some(query)
    }
}

/// Result of one debounced lookup.
#[derive(Debug)]
pub struct SuggestionEvent {
    pub generation: u64,
    pub result: Result<Vec<GeocodingSuggestion>, WeatherError>,
}

/// Runs at most one delayed geocoding lookup at a time.
pub struct SuggestionDebouncer {
    provider: WeatherProvider,
    delay: Duration,
    limit: u32,
    pending: Option<CancellationToken>,
    tx: mpsc::UnboundedSender<SuggestionEvent>,
}

impl SuggestionDebouncer {
    pub fn new(
        provider: WeatherProvider,
        delay: Duration,
        limit: u32,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                provider,
                delay,
                limit,
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// Replace any pending lookup with one for `query`.
    pub fn schedule(&mut self, generation: u64, query: String) {
        self.cancel();

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let provider = self.provider.clone();
        let delay = self.delay;
        let limit = self.limit;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = provider.geocode(&query, limit) => result,
            };

            if token.is_cancelled() {
                return;
            }

            if tx.send(SuggestionEvent { generation, result }).is_err() {
                tracing::debug!("Suggestion receiver dropped");
            }
        });
    }

    /// Abandon the pending lookup, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for SuggestionDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn suggestion(name: &str, lat: f64, lon: f64) -> GeocodingSuggestion {
        GeocodingSuggestion {
            name: name.to_string(),
            local_names: Default::default(),
            lat,
            lon,
            country: Some("GB".into()),
            state: None,
        }
    }

    fn scheduled_generation(action: SearchAction) -> u64 {
        match action {
            SearchAction::Schedule { generation, .. } => generation,
            SearchAction::Cancel => panic!("expected a scheduled lookup"),
        }
    }

    #[test]
    fn test_short_input_cancels() {
        let mut machine = SearchMachine::new(2);
        assert_eq!(machine.input("L"), SearchAction::Cancel);
        assert_eq!(machine.input("  L "), SearchAction::Cancel);
        assert_eq!(machine.phase(), SearchPhase::Idle);
    }

    #[test]
    fn test_input_schedules_trimmed_query() {
        let mut machine = SearchMachine::new(2);
        let action = machine.input(" Lo ");
        assert_eq!(
            action,
            SearchAction::Schedule {
                generation: 1,
                query: "Lo".into()
            }
        );
        assert_eq!(machine.phase(), SearchPhase::Debouncing);
    }

    #[test]
    fn test_current_suggestions_applied() {
        let mut machine = SearchMachine::new(2);
        let gen = scheduled_generation(machine.input("Lon"));

        assert!(machine.apply_suggestions(gen, vec![suggestion("London", 51.5, -0.12)]));
        assert_eq!(machine.phase(), SearchPhase::Suggesting);
        assert_eq!(machine.suggestions().len(), 1);
    }

    #[test]
    fn test_stale_suggestions_ignored() {
        let mut machine = SearchMachine::new(2);
        let first = scheduled_generation(machine.input("Lon"));
        let second = scheduled_generation(machine.input("Lond"));

        assert!(!machine.apply_suggestions(first, vec![suggestion("Longyearbyen", 78.2, 15.6)]));
        assert!(machine.suggestions().is_empty());

        assert!(machine.apply_suggestions(second, vec![suggestion("London", 51.5, -0.12)]));
        assert_eq!(machine.suggestions()[0].name, "London");
    }

    #[test]
    fn test_results_after_selection_ignored() {
        let mut machine = SearchMachine::new(2);
        let gen = scheduled_generation(machine.input("Lon"));
        machine.apply_suggestions(gen, vec![suggestion("London", 51.5, -0.12)]);

        let again = scheduled_generation(machine.input("Lond"));
        machine.apply_suggestions(again, vec![suggestion("London", 51.5, -0.12)]);
        machine.select(0);

        assert!(!machine.apply_suggestions(again, vec![suggestion("Londrina", -23.3, -51.1)]));
        assert_eq!(machine.phase(), SearchPhase::Selected);
    }

    #[test]
    fn test_lookup_failure() {
        let mut machine = SearchMachine::new(2);
        let first = scheduled_generation(machine.input("Par"));
        let second = scheduled_generation(machine.input("Pari"));

        assert!(!machine.lookup_failed(first));
        assert_eq!(machine.phase(), SearchPhase::Debouncing);

        assert!(machine.lookup_failed(second));
        assert_eq!(machine.phase(), SearchPhase::Idle);
    }

    #[test]
    fn test_select_resolves_coordinates() {
        let mut machine = SearchMachine::new(2);
        let gen = scheduled_generation(machine.input("Spring"));
        machine.apply_suggestions(
            gen,
            vec![suggestion("Springfield", 39.8, -89.6), suggestion("Springfield", 37.2, -93.3)],
        );

        assert!(machine.select(5).is_none());
        assert_eq!(machine.suggestions().len(), 2);

        let query = machine.select(1).unwrap();
        assert_eq!(query, LocationQuery::Coordinates { lat: 37.2, lon: -93.3 });
        assert!(machine.suggestions().is_empty());
        assert_eq!(machine.text(), "Springfield, GB");
    }

    #[test]
    fn test_submit_prefers_top_suggestion() {
        let mut machine = SearchMachine::new(2);
        let gen = scheduled_generation(machine.input("Lon"));
        machine.apply_suggestions(gen, vec![suggestion("London", 51.5, -0.12)]);

        assert_eq!(
            machine.submit(),
            Some(LocationQuery::Coordinates { lat: 51.5, lon: -0.12 })
        );
    }

    #[test]
    fn test_submit_without_suggestions_uses_name() {
        let mut machine = SearchMachine::new(2);
        let gen = scheduled_generation(machine.input(" London,GB "));

        assert_eq!(machine.submit(), Some(LocationQuery::Name("London,GB".into())));
        // The in-flight lookup is now stale.
        assert!(!machine.apply_suggestions(gen, vec![suggestion("London", 51.5, -0.12)]));
    }

    #[test]
    fn test_submit_blank_resolves_nothing() {
        let mut machine = SearchMachine::new(2);
        machine.input("   ");
        assert_eq!(machine.submit(), None);
        assert_eq!(machine.phase(), SearchPhase::Idle);
    }
}
