//! Level handle
//!
//! [`create_level`] builds a [`Level`] that owns one [`GameState`], its
//! observers and the frame accumulator. All control calls go through the
//! handle, which checks the lifecycle and phase before touching the state
//! and dispatches queued events once the call is done.

use std::fmt;

use super::autopilot;
use super::events::{GameEvent, LevelObserver, dispatch};
use super::layout::SpawnLayout;
use super::state::{GamePhase, GameState};
use super::tick::{TickInput, refresh_overdrive, stop_modifiers, tick};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::tuning::LevelConfig;

/// Largest frame delta fed to the accumulator (seconds)
const MAX_FRAME_DT: f32 = 0.1;

/// Handle lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, not yet started
    Init,
    Active,
    /// Torn down; every call is rejected
    Disposed,
}

/// Why a control call was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    Disposed,
    NotStarted,
    AlreadyStarted,
    Paused,
    NotPaused,
    /// The run already reached a terminal state
    RunOver,
    AlreadyActive,
    CoolingDown,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ControlError::Disposed => "level has been disposed",
            ControlError::NotStarted => "level has not been started",
            ControlError::AlreadyStarted => "level is already running",
            ControlError::Paused => "level is paused",
            ControlError::NotPaused => "level is not paused",
            ControlError::RunOver => "run is over",
            ControlError::AlreadyActive => "modifier is already active",
            ControlError::CoolingDown => "modifier is cooling down",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ControlError {}

/// Create a level with a layout generated from `seed`
pub fn create_level(config: LevelConfig, seed: u64) -> Level {
    Level::from_state(GameState::new(config, seed))
}

/// One playable level instance
pub struct Level {
    state: GameState,
    lifecycle: Lifecycle,
    observers: Vec<Box<dyn LevelObserver>>,
    accumulator: f32,
}

impl Level {
    /// Create a level from an explicit spawn layout
    pub fn with_layout(config: LevelConfig, seed: u64, layout: SpawnLayout) -> Self {
        Self::from_state(GameState::with_layout(config, seed, layout))
    }

    fn from_state(state: GameState) -> Self {
        Self {
            state,
            lifecycle: Lifecycle::Init,
            observers: Vec::new(),
            accumulator: 0.0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Boost and autopilot both active
    pub fn is_overdrive(&self) -> bool {
        self.state.overdrive
    }

    /// Register an observer; it receives every event from now on
    pub fn subscribe(&mut self, observer: impl LevelObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Enter Running and publish the starting score, time and lives
    pub fn start(&mut self) -> Result<(), ControlError> {
        match self.lifecycle {
            Lifecycle::Init => {}
            Lifecycle::Active => return Err(ControlError::AlreadyStarted),
            Lifecycle::Disposed => return Err(ControlError::Disposed),
        }

        self.lifecycle = Lifecycle::Active;
        self.state.phase = GamePhase::Running;
        self.publish_counters();
        log::info!(
            "Level started: {} orbs, {} hazards, {}s",
            self.state.total_orbs,
            self.state.hazards.len(),
            self.state.time_left
        );
        self.flush();
        Ok(())
    }

    /// Run exactly one fixed simulation tick and dispatch its events
    pub fn step(&mut self, input: &TickInput) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        tick(&mut self.state, input, SIM_DT);
        self.flush();
    }

    /// Feed one rendered frame's delta time. Runs as many fixed ticks as
    /// have accumulated (capped) and returns how many ran.
    pub fn advance_frame(&mut self, frame_dt: f32, input: &TickInput) -> u32 {
        if self.lifecycle != Lifecycle::Active {
            return 0;
        }

        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Drop the backlog instead of spiralling
        self.accumulator = self.accumulator.min(SIM_DT);
        self.flush();
        substeps
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        self.check_running()?;
        self.state.phase = GamePhase::Paused;
        self.state.emit(GameEvent::Paused);
        log::debug!("Level paused");
        self.flush();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ControlError> {
        self.check_active()?;
        if self.state.phase != GamePhase::Paused {
            return Err(ControlError::NotPaused);
        }
        self.state.phase = GamePhase::Running;
        self.accumulator = 0.0;
        self.state.emit(GameEvent::Resumed);
        log::debug!("Level resumed");
        self.flush();
        Ok(())
    }

    /// Pause when running, resume when paused; returns true if now paused
    pub fn toggle_pause(&mut self) -> Result<bool, ControlError> {
        if self.state.phase == GamePhase::Paused {
            self.resume().map(|_| false)
        } else {
            self.pause().map(|_| true)
        }
    }

    pub fn activate_boost(&mut self) -> Result<(), ControlError> {
        self.check_running()?;
        self.state.boost.activate()?;
        self.state.emit(GameEvent::BoostChanged(true));
        refresh_overdrive(&mut self.state);
        self.flush();
        Ok(())
    }

    pub fn activate_autopilot(&mut self) -> Result<(), ControlError> {
        self.check_running()?;
        autopilot::engage(&mut self.state)?;
        refresh_overdrive(&mut self.state);
        self.flush();
        Ok(())
    }

    /// Start a new attempt.
    ///
    /// From a terminal state a fresh layout is generated; mid-run the current
    /// spawn layout is restored. Both paths converge on the same reset.
    pub fn restart(&mut self) -> Result<(), ControlError> {
        match self.lifecycle {
            Lifecycle::Active => {}
            Lifecycle::Init => return Err(ControlError::NotStarted),
            Lifecycle::Disposed => return Err(ControlError::Disposed),
        }

        let fresh_layout = self.state.is_over;
        stop_modifiers(&mut self.state);
        if fresh_layout {
            self.state.regenerate_layout();
        }
        self.state.reset_run();
        self.state.attempt += 1;
        self.state.attempts_unreported += 1;
        self.accumulator = 0.0;

        self.publish_counters();
        log::info!(
            "Level restarted (attempt {}, {})",
            self.state.attempt,
            if fresh_layout { "new layout" } else { "same layout" }
        );
        self.flush();
        Ok(())
    }

    /// Tear the level down. Pending timers and modifiers are discarded and
    /// observers dropped; calling it again is harmless.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            log::warn!("Level already disposed");
            return;
        }
        self.state.boost.reset();
        self.state.autopilot.reset();
        self.state.overdrive = false;
        self.state.game_over_in = None;
        self.state.freeze_in = None;
        self.state.frozen = true;
        self.state.events.clear();
        self.observers.clear();
        self.lifecycle = Lifecycle::Disposed;
        log::info!("Level disposed");
    }

    fn check_active(&self) -> Result<(), ControlError> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Init => Err(ControlError::NotStarted),
            Lifecycle::Disposed => Err(ControlError::Disposed),
        }
    }

    fn check_running(&self) -> Result<(), ControlError> {
        self.check_active()?;
        match self.state.phase {
            GamePhase::Running => Ok(()),
            GamePhase::Paused => Err(ControlError::Paused),
            GamePhase::NotStarted => Err(ControlError::NotStarted),
            GamePhase::LevelComplete | GamePhase::GameOver(_) => Err(ControlError::RunOver),
        }
    }

    fn publish_counters(&mut self) {
        let state = &mut self.state;
        state.emit(GameEvent::ScoreChanged(state.score));
        state.emit(GameEvent::TimeChanged(state.time_left));
        state.emit(GameEvent::LivesChanged(state.lives));
    }

    /// Hand queued events to every observer, in order
    fn flush(&mut self) {
        if self.state.events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.state.events);
        for event in &events {
            for observer in &mut self.observers {
                dispatch(observer.as_mut(), event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::ms_to_ticks;
    use crate::sim::{GameOverReason, LevelCallbacks, RunSummary};
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    const START: Vec2 = Vec2::new(400.0, 400.0);

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<GameEvent>>>,
    }

    impl LevelObserver for Recorder {
        fn on_event(&mut self, event: &GameEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    fn recorded(level: &mut Level) -> Rc<RefCell<Vec<GameEvent>>> {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        level.subscribe(recorder);
        events
    }

    fn terminals(events: &[GameEvent]) -> Vec<RunSummary> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Terminal(summary) => Some(*summary),
                _ => None,
            })
            .collect()
    }

    fn idle(level: &mut Level, ticks: u32) {
        for _ in 0..ticks {
            level.step(&TickInput::default());
        }
    }

    #[test]
    fn test_start_publishes_counters() {
        let mut level = create_level(LevelConfig::default(), 1);
        let events = recorded(&mut level);
        assert_eq!(level.lifecycle(), Lifecycle::Init);

        level.start().unwrap();
        assert_eq!(level.phase(), GamePhase::Running);
        assert_eq!(
            *events.borrow(),
            vec![
                GameEvent::ScoreChanged(0),
                GameEvent::TimeChanged(LEVEL_DURATION_SECS),
                GameEvent::LivesChanged(STARTING_LIVES),
            ]
        );
        assert_eq!(level.start(), Err(ControlError::AlreadyStarted));
    }

    #[test]
    fn test_collect_all_orbs_completes_once() {
        // Orbs in a row to the right of the player
        let layout = (1..=5).fold(SpawnLayout::new(START), |layout, i| {
            layout.with_orb(START + Vec2::new(i as f32 * 40.0, 0.0))
        });
        let mut level = Level::with_layout(LevelConfig::empty(), 3, layout);
        let events = recorded(&mut level);
        level.start().unwrap();

        let right = TickInput {
            right: true,
            ..Default::default()
        };
        for _ in 0..SIM_HZ * 3 {
            level.step(&right);
        }

        let events = events.borrow();
        let completions = events
            .iter()
            .filter(|e| matches!(e, GameEvent::LevelComplete { .. }))
            .count();
        assert_eq!(completions, 1);

        let summaries = terminals(&events);
        assert_eq!(summaries.len(), 1);
        let summary = summaries[0];
        let bonus = (LEVEL_DURATION_SECS - summary.elapsed_time) * TIME_BONUS_PER_SECOND;
        assert_eq!(summary.score, 5 * ORB_POINTS + bonus);
        assert_eq!(summary.attempts, 1);
        assert_eq!(level.phase(), GamePhase::LevelComplete);
    }

    #[test]
    fn test_single_life_game_over_exactly_once() {
        let config = LevelConfig {
            lives: 1,
            ..LevelConfig::empty()
        };
        let layout = SpawnLayout::new(START)
            .with_orb(Vec2::new(1000.0, 1000.0))
            .with_hazard(START, Vec2::ZERO);
        let mut level = Level::with_layout(config, 3, layout);
        let events = recorded(&mut level);
        level.start().unwrap();

        level.step(&TickInput::default());
        assert_eq!(level.state().lives, 0);

        idle(&mut level, ms_to_ticks(GAME_OVER_DELAY_MS) - 1);
        assert_eq!(level.phase(), GamePhase::Running);
        idle(&mut level, 1);
        assert_eq!(
            level.phase(),
            GamePhase::GameOver(GameOverReason::LivesExhausted)
        );

        idle(&mut level, 500);
        let events = events.borrow();
        let game_overs = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
        assert_eq!(terminals(&events).len(), 1);
    }

    #[test]
    fn test_time_expires_after_sixty_seconds() {
        let layout = SpawnLayout::new(START).with_orb(Vec2::new(1000.0, 1000.0));
        let mut level = Level::with_layout(LevelConfig::empty(), 3, layout);
        let events = recorded(&mut level);
        level.start().unwrap();

        idle(&mut level, SIM_HZ * LEVEL_DURATION_SECS - 1);
        assert_eq!(level.phase(), GamePhase::Running);
        idle(&mut level, 1);
        assert_eq!(level.phase(), GamePhase::GameOver(GameOverReason::TimeExpired));

        let summaries = terminals(&events.borrow());
        assert_eq!(
            summaries,
            vec![RunSummary {
                score: 0,
                elapsed_time: 60,
                attempts: 1,
            }]
        );
    }

    #[test]
    fn test_pause_freezes_everything() {
        let layout = SpawnLayout::new(START)
            .with_orb(Vec2::new(1000.0, 1000.0))
            .with_hazard(Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0));
        let mut level = Level::with_layout(LevelConfig::empty(), 3, layout);
        level.start().unwrap();
        level.activate_boost().unwrap();
        idle(&mut level, 10);

        level.pause().unwrap();
        let events = recorded(&mut level);
        let before = level.state().clone();
        let right = TickInput {
            right: true,
            ..Default::default()
        };
        for _ in 0..SIM_HZ * 5 {
            level.step(&right);
        }
        let after = level.state();
        assert_eq!(after.player.pos, before.player.pos);
        assert_eq!(after.hazards[0].pos, before.hazards[0].pos);
        assert_eq!(after.time_left, before.time_left);
        assert_eq!(after.boost, before.boost);
        assert!(events.borrow().is_empty());

        assert_eq!(level.activate_autopilot(), Err(ControlError::Paused));
        assert_eq!(level.toggle_pause(), Ok(false));
        assert_eq!(level.phase(), GamePhase::Running);
        assert_eq!(level.resume(), Err(ControlError::NotPaused));
    }

    #[test]
    fn test_modifier_rejections() {
        let mut level = Level::with_layout(LevelConfig::empty(), 3, SpawnLayout::new(START));
        assert_eq!(level.activate_boost(), Err(ControlError::NotStarted));

        level.start().unwrap();
        level.activate_boost().unwrap();
        assert_eq!(level.activate_boost(), Err(ControlError::AlreadyActive));

        level.activate_autopilot().unwrap();
        assert!(level.is_overdrive());
        assert_eq!(level.activate_autopilot(), Err(ControlError::AlreadyActive));

        idle(&mut level, crate::secs_to_ticks(MODIFIER_ACTIVE_SECS));
        assert!(!level.is_overdrive());
        assert_eq!(level.activate_boost(), Err(ControlError::CoolingDown));

        idle(&mut level, crate::secs_to_ticks(MODIFIER_COOLDOWN_SECS));
        assert!(level.activate_boost().is_ok());
    }

    #[test]
    fn test_mid_run_restart_restores_spawn() {
        let layout = SpawnLayout::new(START)
            .with_orb(START + Vec2::new(15.0, 0.0))
            .with_orb(Vec2::new(1000.0, 1000.0))
            .with_hazard(Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0));
        let mut level = Level::with_layout(LevelConfig::empty(), 3, layout.clone());
        level.start().unwrap();
        level.activate_autopilot().unwrap();
        idle(&mut level, 60);
        assert_eq!(level.state().score, ORB_POINTS);

        level.restart().unwrap();
        let state = level.state();
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(state.spawn, layout);
        assert_eq!(state.score, 0);
        assert_eq!(state.orbs_collected, 0);
        assert!(state.orbs.iter().all(|o| o.enabled));
        assert_eq!(state.hazards[0].pos, Vec2::new(100.0, 100.0));
        assert_eq!(state.player.pos, START);
        assert_eq!(state.time_left, LEVEL_DURATION_SECS);
        assert!(state.autopilot.is_ready());
        assert!(!state.player.invulnerable);
        assert_eq!(state.attempt, 2);
    }

    #[test]
    fn test_restart_after_terminal_regenerates_and_counts_attempts() {
        let config = LevelConfig {
            duration_secs: 1,
            ..LevelConfig::default()
        };
        let mut level = create_level(config, 11);
        let events = recorded(&mut level);
        level.start().unwrap();

        // Restart mid-run, then let the clock expire
        level.restart().unwrap();
        idle(&mut level, SIM_HZ);
        assert!(level.state().is_over);

        let first_layout = level.state().spawn.clone();
        level.restart().unwrap();
        assert_ne!(level.state().spawn, first_layout);
        assert_eq!(level.state().total_orbs, 40);
        idle(&mut level, SIM_HZ);

        let attempts: Vec<u32> = terminals(&events.borrow())
            .iter()
            .map(|s| s.attempts)
            .collect();
        assert_eq!(attempts, vec![2, 1]);
        assert_eq!(level.state().attempt, 3);
    }

    #[test]
    fn test_advance_frame_caps_substeps() {
        let mut level = Level::with_layout(LevelConfig::empty(), 3, SpawnLayout::new(START));
        assert_eq!(level.advance_frame(1.0 / 60.0, &TickInput::default()), 0);

        level.start().unwrap();
        assert_eq!(level.advance_frame(1.0 / 60.0 + 0.0001, &TickInput::default()), 2);
        // Huge hitch: clamped and capped
        assert_eq!(level.advance_frame(5.0, &TickInput::default()), MAX_SUBSTEPS);
        assert!(level.advance_frame(0.0, &TickInput::default()) <= 1);
    }

    #[test]
    fn test_dispose_rejects_calls() {
        let scores = Rc::new(RefCell::new(Vec::new()));
        let log = scores.clone();
        let mut level = Level::with_layout(LevelConfig::empty(), 3, SpawnLayout::new(START));
        level.subscribe(LevelCallbacks::new().score(move |s| log.borrow_mut().push(s)));
        level.start().unwrap();
        level.activate_boost().unwrap();

        level.dispose();
        assert_eq!(level.lifecycle(), Lifecycle::Disposed);
        assert!(level.state().boost.is_ready());
        assert_eq!(level.activate_boost(), Err(ControlError::Disposed));
        assert_eq!(level.restart(), Err(ControlError::Disposed));
        assert_eq!(level.pause(), Err(ControlError::Disposed));
        level.step(&TickInput::default());
        level.dispose();

        assert_eq!(*scores.borrow(), vec![0]);
    }

    #[test]
    fn test_small_custom_world_still_builds() {
        let config = LevelConfig::from_json(r#"{"world_width": 300, "world_height": 300}"#).unwrap();
        let level = create_level(config, 1);
        assert_eq!(level.state().hazards.len(), 38);
    }
}
