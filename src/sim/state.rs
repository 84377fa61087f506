//! Game state and core simulation types
//!
//! Everything one level instance owns lives here: the world bounds, the typed
//! entity collections, scoring/lives bookkeeping, timers and modifiers.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::autopilot::AutopilotState;
use super::collision::bounce_off_bounds;
use super::events::{GameEvent, RunSummary};
use super::layout::{SpawnLayout, generate_layout};
use super::modifiers::Modifier;
use crate::tuning::LevelConfig;
use crate::{ms_to_ticks, secs_to_ticks};
use crate::consts::*;

/// Cosmetic hazard rotation (radians/s)
pub const HAZARD_SPIN_RATE: f32 = 2.5;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Level built, waiting for the first start
    NotStarted,
    /// Active gameplay
    Running,
    /// Clock, physics and timers frozen
    Paused,
    /// Every orb collected before the clock ran out
    LevelComplete,
    /// Lives exhausted or time expired
    GameOver(GameOverReason),
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::LevelComplete | GamePhase::GameOver(_))
    }
}

/// Why a run ended in game over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    LivesExhausted,
    TimeExpired,
}

/// Rectangular bounded plane, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct World {
    pub width: f32,
    pub height: f32,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a circle's center so the whole circle stays inside the world
    pub fn clamp_circle(&self, pos: Vec2, radius: f32) -> Vec2 {
        let min = Vec2::splat(radius);
        let max = Vec2::new(self.width - radius, self.height - radius).max(min);
        pos.clamp(min, max)
    }

    /// Clamp a point to stay `margin` units away from every edge
    pub fn clamp_inset(&self, pos: Vec2, margin: f32) -> Vec2 {
        self.clamp_circle(pos, margin)
    }
}

/// The player's robot
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Sprite mirrored to face left
    pub facing_left: bool,
    pub alive: bool,
    /// Flashing after a hazard collision, can't be hit again
    pub hit: bool,
    /// Immune to hazards (hit recovery or autopilot)
    pub invulnerable: bool,
    /// Ticks left in the hit flash animation
    pub flash_ticks: u32,
    /// Ticks left of post-flash immunity
    pub immunity_ticks: u32,
}

impl Player {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            facing_left: false,
            alive: true,
            hit: false,
            invulnerable: false,
            flash_ticks: 0,
            immunity_ticks: 0,
        }
    }

    /// Set velocity and update facing from its horizontal sign
    pub fn steer(&mut self, vel: Vec2) {
        self.vel = vel;
        if vel.x < 0.0 {
            self.facing_left = true;
        } else if vel.x > 0.0 {
            self.facing_left = false;
        }
    }

    /// Begin the hit flash and immunity sequence
    pub fn start_hit(&mut self) {
        self.hit = true;
        self.invulnerable = true;
        self.flash_ticks = ms_to_ticks(HIT_FLASH_MS);
        self.immunity_ticks = 0;
    }

    /// Whether hit-based immunity is still running (flash or post-flash)
    pub fn hit_immunity_pending(&self) -> bool {
        self.hit || self.immunity_ticks > 0
    }

    /// Advance the flash/immunity timers by one tick.
    ///
    /// `forced` is true while autopilot holds invulnerability on its own.
    pub fn tick_hit_timers(&mut self, forced: bool) {
        if self.flash_ticks > 0 {
            self.flash_ticks -= 1;
            if self.flash_ticks == 0 {
                self.hit = false;
                self.immunity_ticks = ms_to_ticks(HIT_IMMUNITY_MS);
            }
        } else if self.immunity_ticks > 0 {
            self.immunity_ticks -= 1;
            if self.immunity_ticks == 0 && !forced {
                self.invulnerable = false;
            }
        }
    }

    /// Drop every hit timer (restart/teardown)
    pub fn clear_hit_timers(&mut self) {
        self.hit = false;
        self.invulnerable = false;
        self.flash_ticks = 0;
        self.immunity_ticks = 0;
    }
}

/// An energy orb pickup
#[derive(Debug, Clone)]
pub struct Orb {
    pub pos: Vec2,
    pub radius: f32,
    /// Cleared exactly once, on first overlap with the player
    pub enabled: bool,
}

impl Orb {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            enabled: true,
        }
    }
}

/// A moving hazard that bounces off the world bounds
#[derive(Debug, Clone)]
pub struct Hazard {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Cosmetic rotation (radians)
    pub spin: f32,
}

impl Hazard {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel,
            radius,
            spin: 0.0,
        }
    }

    /// Move one step with an elastic bounce at the world edges
    pub fn advance(&mut self, world: &World, dt: f32) {
        self.pos += self.vel * dt;
        bounce_off_bounds(&mut self.pos, &mut self.vel, self.radius, world);
        self.spin = (self.spin + HAZARD_SPIN_RATE * dt) % std::f32::consts::TAU;
    }
}

/// Complete state of one level instance
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: LevelConfig,
    pub world: World,
    /// Layout the current run was built from (restored on a mid-run restart)
    pub spawn: SpawnLayout,
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Set on the first terminal transition; guards every later one
    pub is_over: bool,
    /// Simulation frozen (terminal display finished)
    pub frozen: bool,

    pub score: u32,
    pub lives: u32,
    /// Countdown seconds remaining
    pub time_left: u32,
    /// Ticks into the current countdown second
    pub clock_ticks: u32,
    /// Attempt number within this level instance (1-based)
    pub attempt: u32,
    /// Attempts started since the last terminal summary
    pub attempts_unreported: u32,
    pub orbs_collected: u32,
    pub total_orbs: u32,

    pub player: Player,
    pub orbs: Vec<Orb>,
    pub hazards: Vec<Hazard>,

    pub boost: Modifier,
    pub autopilot: Modifier,
    pub pilot: AutopilotState,
    /// Boost and autopilot both active
    pub overdrive: bool,

    /// Ticks until the delayed game over fires (lives exhausted)
    pub game_over_in: Option<u32>,
    /// Ticks left in the level-complete display window
    pub freeze_in: Option<u32>,

    /// Simulation tick counter
    pub time_ticks: u64,
    /// Cosmetic animation clock (seconds)
    pub anim_time: f32,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a level with a freshly generated layout
    pub fn new(config: LevelConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let spawn = generate_layout(&config, &mut rng);
        Self::build(config, rng, spawn)
    }

    /// Create a level from an explicit layout
    pub fn with_layout(config: LevelConfig, seed: u64, spawn: SpawnLayout) -> Self {
        Self::build(config, Pcg32::seed_from_u64(seed), spawn)
    }

    fn build(config: LevelConfig, rng: Pcg32, spawn: SpawnLayout) -> Self {
        let world = World::new(config.world_width, config.world_height);
        let player = Player::new(spawn.player, config.player_radius);
        let boost = Modifier::new(config.modifier_active_secs, config.modifier_cooldown_secs);
        let autopilot = Modifier::new(config.modifier_active_secs, config.modifier_cooldown_secs);

        let mut state = Self {
            world,
            spawn,
            rng,
            phase: GamePhase::NotStarted,
            is_over: false,
            frozen: false,
            score: 0,
            lives: config.lives,
            time_left: config.duration_secs,
            clock_ticks: 0,
            attempt: 1,
            attempts_unreported: 1,
            orbs_collected: 0,
            total_orbs: 0,
            player,
            orbs: Vec::new(),
            hazards: Vec::new(),
            boost,
            autopilot,
            pilot: AutopilotState::default(),
            overdrive: false,
            game_over_in: None,
            freeze_in: None,
            time_ticks: 0,
            anim_time: 0.0,
            events: Vec::new(),
            config,
        };
        state.spawn_entities();
        state
    }

    /// Rebuild player, orbs and hazards from the spawn layout
    pub fn spawn_entities(&mut self) {
        let config = &self.config;
        self.player = Player::new(self.spawn.player, config.player_radius);
        self.orbs = self
            .spawn
            .orbs
            .iter()
            .map(|&pos| Orb::new(pos, config.orb_radius))
            .collect();
        self.hazards = self
            .spawn
            .hazards
            .iter()
            .map(|h| Hazard::new(h.pos, h.vel, config.hazard_radius))
            .collect();
        self.total_orbs = self.orbs.len() as u32;
        self.orbs_collected = 0;
    }

    /// Reset score, clock, lives and every timer for a new attempt
    pub fn reset_run(&mut self) {
        self.spawn_entities();
        self.score = 0;
        self.lives = self.config.lives;
        self.time_left = self.config.duration_secs;
        self.clock_ticks = 0;
        self.is_over = false;
        self.frozen = false;
        self.game_over_in = None;
        self.freeze_in = None;
        self.boost.reset();
        self.autopilot.reset();
        self.pilot = AutopilotState::default();
        self.overdrive = false;
        self.phase = GamePhase::Running;
    }

    /// Replace the spawn layout with a newly generated one
    pub fn regenerate_layout(&mut self) {
        self.spawn = generate_layout(&self.config, &mut self.rng);
    }

    /// Queue an event for the observers
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Number of orbs still collectable
    pub fn orbs_remaining(&self) -> u32 {
        self.total_orbs - self.orbs_collected
    }

    /// Seconds played in the current attempt
    pub fn elapsed_secs(&self) -> u32 {
        self.config.duration_secs.saturating_sub(self.time_left)
    }

    /// Build the terminal summary and mark its attempts as reported
    pub fn take_summary(&mut self) -> RunSummary {
        let summary = RunSummary {
            score: self.score,
            elapsed_time: self.elapsed_secs(),
            attempts: self.attempts_unreported.max(1),
        };
        self.attempts_unreported = 0;
        summary
    }

    /// Ticks in one countdown second
    pub fn ticks_per_second() -> u32 {
        secs_to_ticks(1)
    }
}
