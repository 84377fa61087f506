//! Level notifications
//!
//! The simulation pushes [`GameEvent`]s while it ticks; the owning
//! [`Level`](super::Level) drains them after each step and hands them to every
//! subscribed [`LevelObserver`] in order. Observers run synchronously and
//! never reach back into the level.

use serde::{Deserialize, Serialize};

use super::state::GameOverReason;

/// Result of one finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub score: u32,
    /// Seconds played before the terminal state
    #[serde(rename = "time")]
    pub elapsed_time: u32,
    /// Attempts started since the previous summary (at least 1)
    pub attempts: u32,
}

/// Something observable happened inside the level
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ScoreChanged(u32),
    /// Countdown seconds remaining
    TimeChanged(u32),
    LivesChanged(u32),
    OrbCollected { index: usize, remaining: u32 },
    HazardHit { index: usize },
    BoostChanged(bool),
    AutopilotChanged(bool),
    /// Boost and autopilot active together
    OverdriveChanged(bool),
    Paused,
    Resumed,
    /// All orbs collected; the bonus is already in the score
    LevelComplete { time_bonus: u32 },
    GameOver { reason: GameOverReason },
    /// Fired exactly once per terminal transition, after the outcome event
    Terminal(RunSummary),
}

/// Receives level notifications. Every hook has an empty default, so an
/// observer only overrides what it needs.
pub trait LevelObserver {
    /// Called for every event before the typed hook
    fn on_event(&mut self, _event: &GameEvent) {}

    fn on_score_changed(&mut self, _score: u32) {}
    fn on_time_changed(&mut self, _seconds_left: u32) {}
    fn on_lives_changed(&mut self, _lives: u32) {}
    fn on_terminal(&mut self, _summary: &RunSummary) {}
}

/// Dispatch one event to an observer's hooks
pub fn dispatch(observer: &mut dyn LevelObserver, event: &GameEvent) {
    observer.on_event(event);
    match event {
        GameEvent::ScoreChanged(score) => observer.on_score_changed(*score),
        GameEvent::TimeChanged(seconds) => observer.on_time_changed(*seconds),
        GameEvent::LivesChanged(lives) => observer.on_lives_changed(*lives),
        GameEvent::Terminal(summary) => observer.on_terminal(summary),
        _ => {}
    }
}

type Callback<T> = Option<Box<dyn FnMut(T)>>;

/// Closure-based observer for callers that just want a few hooks
#[derive(Default)]
pub struct LevelCallbacks {
    pub on_score_changed: Callback<u32>,
    pub on_time_changed: Callback<u32>,
    pub on_lives_changed: Callback<u32>,
    pub on_terminal: Callback<RunSummary>,
}

impl LevelCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_score_changed = Some(Box::new(f));
        self
    }

    pub fn time(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_time_changed = Some(Box::new(f));
        self
    }

    pub fn lives(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_lives_changed = Some(Box::new(f));
        self
    }

    pub fn terminal(mut self, f: impl FnMut(RunSummary) + 'static) -> Self {
        self.on_terminal = Some(Box::new(f));
        self
    }
}

impl LevelObserver for LevelCallbacks {
    fn on_score_changed(&mut self, score: u32) {
        if let Some(f) = &mut self.on_score_changed {
            f(score);
        }
    }

    fn on_time_changed(&mut self, seconds_left: u32) {
        if let Some(f) = &mut self.on_time_changed {
            f(seconds_left);
        }
    }

    fn on_lives_changed(&mut self, lives: u32) {
        if let Some(f) = &mut self.on_lives_changed {
            f(lives);
        }
    }

    fn on_terminal(&mut self, summary: &RunSummary) {
        if let Some(f) = &mut self.on_terminal {
            f(*summary);
        }
    }
}
