//! Player records and leaderboard ranking
//!
//! Records are ranked by score (high first), then time (low first), then
//! attempts (low first). Only positive scores are listed.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::sim::RunSummary;

/// Maximum number of leaderboard rows
pub const MAX_LEADERBOARD: usize = 10;

/// The `{score, time, attempts}` triple kept per player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub score: u32,
    /// Seconds
    pub time: u32,
    pub attempts: u32,
}

impl Progress {
    /// Field-wise maximum
    pub fn merge_max(&self, other: &Progress) -> Progress {
        Progress {
            score: self.score.max(other.score),
            time: self.time.max(other.time),
            attempts: self.attempts.max(other.attempts),
        }
    }

    /// Whether any field is strictly greater than in `other`
    pub fn exceeds(&self, other: &Progress) -> bool {
        self.score > other.score || self.time > other.time || self.attempts > other.attempts
    }

    /// Add a finished run field-wise
    pub fn accumulate(&mut self, summary: &RunSummary) {
        self.score = self.score.saturating_add(summary.score);
        self.time = self.time.saturating_add(summary.elapsed_time);
        self.attempts = self.attempts.saturating_add(summary.attempts);
    }

    pub fn is_empty(&self) -> bool {
        *self == Progress::default()
    }
}

/// A stored player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub score: u32,
    pub time: u32,
    pub attempts: u32,
    /// Unix timestamp (ms) of the last write
    #[serde(rename = "updatedAt", default)]
    pub updated_at: f64,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, progress: Progress, updated_at: f64) -> Self {
        Self {
            name: name.into(),
            score: progress.score,
            time: progress.time,
            attempts: progress.attempts,
            updated_at,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            score: self.score,
            time: self.time,
            attempts: self.attempts,
        }
    }
}

/// Leaderboard ordering for two progress values
pub fn compare(a: &Progress, b: &Progress) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.time.cmp(&b.time))
        .then(a.attempts.cmp(&b.attempts))
}

/// Top `limit` records with a positive score, best first
pub fn rank_records(records: impl IntoIterator<Item = PlayerRecord>, limit: usize) -> Vec<PlayerRecord> {
    let mut ranked: Vec<PlayerRecord> = records.into_iter().filter(|r| r.score > 0).collect();
    ranked.sort_by(|a, b| compare(&a.progress(), &b.progress()).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// Format seconds as `mm:ss`
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
