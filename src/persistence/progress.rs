//! Cached player identity and progress

use serde::{Deserialize, Serialize};

use super::{NAME_KEY, PROGRESS_KEY, Storage, StorageError};
use crate::leaderboard::Progress;

/// The locally cached progress record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProgress {
    pub name: String,
    #[serde(flatten)]
    pub progress: Progress,
}

/// Reads and writes the player name and progress keys
#[derive(Debug)]
pub struct ProgressCache<S> {
    storage: S,
}

impl<S: Storage> ProgressCache<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stored player name, if any
    pub fn player_name(&self) -> Option<String> {
        match self.storage.get(NAME_KEY) {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                log::warn!("Failed to read player name: {e}");
                None
            }
        }
    }

    pub fn set_player_name(&self, name: &str) -> Result<(), StorageError> {
        self.storage.set(NAME_KEY, name)
    }

    /// Cached record for whichever player wrote it last
    pub fn load_any(&self) -> Option<CachedProgress> {
        let json = match self.storage.get(PROGRESS_KEY) {
            Ok(json) => json?,
            Err(e) => {
                log::warn!("Failed to read cached progress: {e}");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(cached) => Some(cached),
            Err(e) => {
                log::warn!("Ignoring malformed cached progress: {e}");
                None
            }
        }
    }

    /// Cached progress for `name`; empty when missing, malformed or
    /// belonging to another player
    pub fn load(&self, name: &str) -> Progress {
        self.load_any()
            .filter(|cached| cached.name == name)
            .map(|cached| cached.progress)
            .unwrap_or_default()
    }

    /// Overwrite the cached record
    pub fn save(&self, name: &str, progress: &Progress) -> Result<(), StorageError> {
        let cached = CachedProgress {
            name: name.to_string(),
            progress: *progress,
        };
        let json =
            serde_json::to_string(&cached).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.storage.set(PROGRESS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    fn progress(score: u32, time: u32, attempts: u32) -> Progress {
        Progress {
            score,
            time,
            attempts,
        }
    }

    #[test]
    fn test_save_and_load() {
        let cache = ProgressCache::new(MemoryStorage::new());
        cache.save("ada", &progress(100, 30, 2)).unwrap();
        assert_eq!(cache.load("ada"), progress(100, 30, 2));

        let json = cache.storage().get(PROGRESS_KEY).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&json).unwrap(),
            serde_json::json!({"name": "ada", "score": 100, "time": 30, "attempts": 2})
        );
    }

    #[test]
    fn test_other_player_reads_empty() {
        let cache = ProgressCache::new(MemoryStorage::new());
        cache.save("ada", &progress(100, 30, 2)).unwrap();
        assert_eq!(cache.load("bob"), Progress::default());
    }

    #[test]
    fn test_malformed_reads_empty() {
        let storage = MemoryStorage::new();
        storage.set(PROGRESS_KEY, "{not json").unwrap();
        let cache = ProgressCache::new(storage);
        assert_eq!(cache.load_any(), None);
        assert_eq!(cache.load("ada"), Progress::default());
    }

    #[test]
    fn test_player_name() {
        let cache = ProgressCache::new(MemoryStorage::new());
        assert_eq!(cache.player_name(), None);
        cache.set_player_name("   ").unwrap();
        assert_eq!(cache.player_name(), None);
        cache.set_player_name("ada").unwrap();
        assert_eq!(cache.player_name(), Some("ada".to_string()));
    }
}
