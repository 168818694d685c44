pub mod dashboard;
pub mod favorites;
pub mod orchestrator;
pub mod search;
pub mod storage;

pub use dashboard::{Dashboard, ViewState};
pub use favorites::{
    location_id, FavoritesError, FavoritesStore, SavedLocation, DEFAULT_MATCH_TOLERANCE,
};
pub use orchestrator::{
    AccumulatedData, SnapshotPart, StatisticsData, WeatherOrchestrator, WeatherSnapshot,
};
pub use search::{
    SearchAction, SearchMachine, SearchPhase, SuggestionDebouncer, SuggestionEvent,
};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageResult};
