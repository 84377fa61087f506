//! Remote score store
//!
//! `RemoteStore` is the three-call surface the sync layer talks to. The
//! in-process `MemoryStore` carries the reference semantics, including the
//! JSON request validation a server applies before touching any record.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::leaderboard::{MAX_LEADERBOARD, PlayerRecord, Progress, rank_records};
use crate::platform;

/// Remote store failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request had no usable `name`
    MissingName,
    /// A required field was missing or not a non-negative number
    InvalidField(&'static str),
    /// Store unreachable (offline, network error)
    Unavailable(String),
    /// Non-success HTTP status
    Status(u16),
    /// Response body could not be decoded
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::MissingName => write!(f, "missing player name"),
            StoreError::InvalidField(field) => write!(f, "invalid or missing field `{field}`"),
            StoreError::Unavailable(msg) => write!(f, "score store unavailable: {msg}"),
            StoreError::Status(code) => write!(f, "score store returned status {code}"),
            StoreError::Decode(msg) => write!(f, "bad response from score store: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A score submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitScore {
    pub name: String,
    pub score: u32,
    pub time: u32,
    pub attempts: u32,
    /// Registration: leave an existing record untouched
    #[serde(default)]
    pub new: bool,
}

impl SubmitScore {
    /// Overwrite (or create) the player's record with `progress`
    pub fn update(name: &str, progress: Progress) -> Self {
        Self {
            name: name.to_string(),
            score: progress.score,
            time: progress.time,
            attempts: progress.attempts,
            new: false,
        }
    }

    /// Claim a name without disturbing an existing record
    pub fn register(name: &str) -> Self {
        Self {
            name: name.to_string(),
            score: 0,
            time: 0,
            attempts: 1,
            new: true,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            score: self.score,
            time: self.time,
            attempts: self.attempts,
        }
    }

    /// Parse and validate a JSON request body.
    ///
    /// `name` must be a non-empty string or number, `score` and `time` must be
    /// numbers; `attempts` defaults to 1 and `new` to false.
    pub fn from_json(body: &str) -> Result<Self, StoreError> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;

        let name = match value.get("name") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(StoreError::MissingName),
        };
        if name.trim().is_empty() {
            return Err(StoreError::MissingName);
        }

        let number = |field: &'static str| -> Result<Option<u32>, StoreError> {
            match value.get(field) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(v) => v
                    .as_f64()
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| Some(n.min(u32::MAX as f64) as u32))
                    .ok_or(StoreError::InvalidField(field)),
            }
        };

        let score = number("score")?.ok_or(StoreError::InvalidField("score"))?;
        let time = number("time")?.ok_or(StoreError::InvalidField("time"))?;
        let attempts = number("attempts")?.filter(|&a| a > 0).unwrap_or(1);
        let new = value
            .get("new")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            name,
            score,
            time,
            attempts,
            new,
        })
    }
}

/// Where player records live
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Best `limit` records with a positive score
    async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerRecord>, StoreError>;

    /// The stored progress for `name`, `None` if the player is unknown
    async fn player(&self, name: &str) -> Result<Option<Progress>, StoreError>;

    /// Create or overwrite a record; returns what is stored afterwards
    async fn submit_score(&self, request: &SubmitScore) -> Result<PlayerRecord, StoreError>;
}

/// In-process store with the reference semantics
#[derive(Debug)]
pub struct MemoryStore {
    records: RefCell<HashMap<String, PlayerRecord>>,
    reachable: Cell<bool>,
    submissions: Cell<u32>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
            reachable: Cell::new(true),
            submissions: Cell::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable`
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.set(reachable);
    }

    /// Successful `submit_score` calls so far
    pub fn submissions(&self) -> u32 {
        self.submissions.get()
    }

    pub fn record(&self, name: &str) -> Option<PlayerRecord> {
        self.records.borrow().get(name).cloned()
    }

    /// Seed a record directly
    pub fn insert(&self, record: PlayerRecord) {
        self.records.borrow_mut().insert(record.name.clone(), record);
    }

    /// Handle a raw JSON submission body
    pub fn submit_json(&self, body: &str) -> Result<PlayerRecord, StoreError> {
        let request = SubmitScore::from_json(body)?;
        self.apply(&request)
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.get() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store offline".to_string()))
        }
    }

    fn apply(&self, request: &SubmitScore) -> Result<PlayerRecord, StoreError> {
        self.check_reachable()?;
        if request.name.trim().is_empty() {
            return Err(StoreError::MissingName);
        }

        let mut records = self.records.borrow_mut();
        if request.new
            && let Some(existing) = records.get(&request.name)
        {
            log::debug!("Player {} already registered", request.name);
            return Ok(existing.clone());
        }

        let mut progress = request.progress();
        if progress.attempts == 0 {
            progress.attempts = 1;
        }
        let record = PlayerRecord::new(request.name.clone(), progress, platform::now_ms());
        records.insert(request.name.clone(), record.clone());
        self.submissions.set(self.submissions.get() + 1);
        log::debug!(
            "Stored {}: score {} time {} attempts {}",
            record.name,
            record.score,
            record.time,
            record.attempts
        );
        Ok(record)
    }
}

impl RemoteStore for MemoryStore {
    async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerRecord>, StoreError> {
        self.check_reachable()?;
        let records = self.records.borrow().values().cloned().collect::<Vec<_>>();
        Ok(rank_records(records, limit.min(MAX_LEADERBOARD)))
    }

    async fn player(&self, name: &str) -> Result<Option<Progress>, StoreError> {
        self.check_reachable()?;
        Ok(self.records.borrow().get(name).map(PlayerRecord::progress))
    }

    async fn submit_score(&self, request: &SubmitScore) -> Result<PlayerRecord, StoreError> {
        self.apply(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    #[test]
    fn test_validation() {
        assert_eq!(
            SubmitScore::from_json(r#"{"score": 1, "time": 2}"#),
            Err(StoreError::MissingName)
        );
        assert_eq!(
            SubmitScore::from_json(r#"{"name": "", "score": 1, "time": 2}"#),
            Err(StoreError::MissingName)
        );
        assert_eq!(
            SubmitScore::from_json(r#"{"name": "ada", "score": "1", "time": 2}"#),
            Err(StoreError::InvalidField("score"))
        );
        assert_eq!(
            SubmitScore::from_json(r#"{"name": "ada", "score": 1}"#),
            Err(StoreError::InvalidField("time"))
        );
        assert!(matches!(
            SubmitScore::from_json("not json"),
            Err(StoreError::Decode(_))
        ));

        let request = SubmitScore::from_json(r#"{"name": "ada", "score": 10, "time": 5}"#).unwrap();
        assert_eq!(request.attempts, 1);
        assert!(!request.new);
    }

    #[test]
    fn test_rejected_request_does_not_mutate() {
        let store = MemoryStore::new();
        assert!(store.submit_json(r#"{"name": "ada", "time": 5}"#).is_err());
        assert_eq!(store.record("ada"), None);
        assert_eq!(store.submissions(), 0);
    }

    #[test]
    fn test_new_flag_keeps_existing_record() {
        let store = MemoryStore::new();
        store
            .submit_json(r#"{"name": "ada", "score": 500, "time": 40, "attempts": 3}"#)
            .unwrap();

        let kept = block_on(store.submit_score(&SubmitScore::register("ada"))).unwrap();
        assert_eq!(kept.score, 500);
        assert_eq!(kept.attempts, 3);

        let created = block_on(store.submit_score(&SubmitScore::register("bob"))).unwrap();
        assert_eq!(created.score, 0);
        assert_eq!(created.attempts, 1);
    }

    #[test]
    fn test_overwrite() {
        let store = MemoryStore::new();
        store
            .submit_json(r#"{"name": "ada", "score": 500, "time": 40, "attempts": 3}"#)
            .unwrap();
        store
            .submit_json(r#"{"name": "ada", "score": 100, "time": 10}"#)
            .unwrap();
        let record = store.record("ada").unwrap();
        assert_eq!((record.score, record.time, record.attempts), (100, 10, 1));
        assert_eq!(store.submissions(), 2);
    }

    #[test]
    fn test_leaderboard_and_player() {
        let store = MemoryStore::new();
        for (name, score, time) in [("a", 100, 50), ("b", 300, 60), ("c", 0, 10), ("d", 100, 20)] {
            store
                .submit_json(&format!(
                    r#"{{"name": "{name}", "score": {score}, "time": {time}}}"#
                ))
                .unwrap();
        }

        let board = block_on(store.leaderboard(10)).unwrap();
        let names: Vec<&str> = board.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a"]);

        let progress = block_on(store.player("d")).unwrap();
        assert_eq!(
            progress,
            Some(Progress {
                score: 100,
                time: 20,
                attempts: 1
            })
        );
        assert_eq!(block_on(store.player("zed")).unwrap(), None);
    }

    #[test]
    fn test_unreachable() {
        let store = MemoryStore::new();
        store.set_reachable(false);
        let err = block_on(store.player("ada")).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
