//! Score synchronization
//!
//! Keeps the player's cumulative progress consistent between the local cache
//! and the remote leaderboard store, tolerating offline play.

pub mod reconcile;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod http;

#[cfg(target_arch = "wasm32")]
pub use http::HttpStore;
pub use reconcile::{MAX_NAME_LEN, ScoreSync, SyncOutcome, SyncStatus, normalize_name};
pub use store::{MemoryStore, RemoteStore, StoreError, SubmitScore};

use std::fmt;

use crate::persistence::StorageError;

/// Sync boundary failure that the caller must act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Empty or overlong player name
    InvalidName,
    Storage(StorageError),
    Store(StoreError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidName => {
                write!(f, "player name must be 1 to {MAX_NAME_LEN} characters")
            }
            SyncError::Storage(e) => write!(f, "{e}"),
            SyncError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::InvalidName => None,
            SyncError::Storage(e) => Some(e),
            SyncError::Store(e) => Some(e),
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        SyncError::Storage(e)
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Store(e)
    }
}
