//! Saved locations.
//!
//! The whole list lives as one JSON array under a single storage key. It is
//! read once when the store is loaded and written back on every mutation.

use serde::{Deserialize, Serialize};
use skyview_core::StorageError;
use skyview_weather::within_tolerance;
use thiserror::Error;

use crate::storage::KeyValueStorage;

pub use skyview_core::DEFAULT_MATCH_TOLERANCE;

/// A location the user chose to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl SavedLocation {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: location_id(lat, lon),
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// Identifier derived from coordinates.
pub fn location_id(lat: f64, lon: f64) -> String {
    format!("{}-{}", lat, lon)
}

/// Errors that can occur when changing saved locations.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// A saved location already covers these coordinates.
    #[error("Location already saved as {0}")]
    AlreadySaved(String),

    /// Name was empty or whitespace.
    #[error("Location name cannot be empty")]
    InvalidName,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FavoritesError {
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadySaved(name) => format!("This location is already saved as {}", name),
            Self::InvalidName => "Please enter a name for this location".to_string(),
            Self::Storage(e) => e.user_message().to_string(),
        }
    }
}

pub struct FavoritesStore {
    storage: Box<dyn KeyValueStorage>,
    key: String,
    tolerance: f64,
    locations: Vec<SavedLocation>,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("key", &self.key)
            .field("tolerance", &self.tolerance)
            .field("locations", &self.locations)
            .finish()
    }
}

impl FavoritesStore {
    /// Read the saved list from `storage`.
    ///
    /// Missing, unreadable or corrupt data yields an empty list.
    pub fn load(storage: Box<dyn KeyValueStorage>, key: impl Into<String>, tolerance: f64) -> Self {
        let key = key.into();
        let locations = match storage.get(&key) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<SavedLocation>>(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt saved locations under '{}': {}", key, e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read saved locations: {}", e);
                Vec::new()
            }
        };

        tracing::debug!("Loaded {} saved locations", locations.len());
        Self {
            storage,
            key,
            tolerance,
            locations,
        }
    }

    /// Save a new location at the end of the list.
    ///
    /// # Errors
    /// `InvalidName` for a blank name, `AlreadySaved` when the coordinates
    /// match an existing entry, `Storage` if persisting fails (the list is
    /// left unchanged).
    pub fn add(&mut self, name: &str, lat: f64, lon: f64) -> Result<SavedLocation, FavoritesError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FavoritesError::InvalidName);
        }

        if let Some(existing) = self.find(lat, lon) {
            return Err(FavoritesError::AlreadySaved(existing.name.clone()));
        }

        let location = SavedLocation::new(name, lat, lon);
        self.locations.push(location.clone());

        if let Err(e) = self.persist() {
            self.locations.pop();
            return Err(e.into());
        }

        tracing::info!("Saved location {} ({})", location.name, location.id);
        Ok(location)
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    ///
    /// # Errors
    /// `Storage` if persisting fails (the entry is restored).
    pub fn remove(&mut self, id: &str) -> Result<bool, FavoritesError> {
        let Some(index) = self.locations.iter().position(|l| l.id == id) else {
            return Ok(false);
        };

        let removed = self.locations.remove(index);
        if let Err(e) = self.persist() {
            self.locations.insert(index, removed);
            return Err(e.into());
        }

        tracing::info!("Removed saved location {}", removed.name);
        Ok(true)
    }

    /// True iff a saved entry lies strictly within the tolerance on both axes.
    pub fn is_saved(&self, lat: f64, lon: f64) -> bool {
        self.find(lat, lon).is_some()
    }

    pub fn list(&self) -> &[SavedLocation] {
        &self.locations
    }

    pub fn get(&self, id: &str) -> Option<&SavedLocation> {
        self.locations.iter().find(|l| l.id == id)
    }

    fn find(&self, lat: f64, lon: f64) -> Option<&SavedLocation> {
        self.locations.iter().find(|l| {
            within_tolerance(l.lat, lat, self.tolerance)
                && within_tolerance(l.lon, lon, self.tolerance)
        })
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.locations)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set(&self.key, &json)
    }
}
