//! Robo Rush - A scrolling orb-collecting robot arcade game
//!
//! Core modules:
//! - `audio`: Procedural sound effects (Web Audio on wasm32)
//! - `leaderboard`: Player records and ranking
//! - `sim`: Deterministic simulation (movement, collisions, game state)
//! - `sync`: Score reconciliation between the local cache and the remote store
//! - `renderer`: WebGPU rendering pipeline
//! - `platform`: Browser/native platform abstraction
//! - `persistence`: Key-value storage for player progress and settings
//! - `tuning`: Data-driven level balance

pub mod audio;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod sync;
pub mod tuning;

pub use leaderboard::PlayerRecord;
pub use settings::Settings;
pub use tuning::LevelConfig;

/// Game configuration constants
pub mod consts {
    /// Simulation rate (ticks per second)
    pub const SIM_HZ: u32 = 120;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World dimensions
    pub const WORLD_WIDTH: f32 = 1600.0;
    pub const WORLD_HEIGHT: f32 = 1200.0;

    /// Level countdown (seconds)
    pub const LEVEL_DURATION_SECS: u32 = 60;
    pub const STARTING_LIVES: u32 = 3;

    /// Player movement (units/s)
    pub const BASE_SPEED: f32 = 180.0;
    pub const BOOST_SPEED: f32 = 320.0;
    /// Autopilot moves 20% faster than manual steering
    pub const AUTOPILOT_SPEED_FACTOR: f32 = 1.2;

    /// Collision radii
    pub const PLAYER_RADIUS: f32 = 20.0;
    pub const ORB_RADIUS: f32 = 10.0;
    pub const HAZARD_RADIUS: f32 = 14.0;

    /// Scoring
    pub const ORB_POINTS: u32 = 100;
    pub const HAZARD_PENALTY: u32 = 50;
    pub const TIME_BONUS_PER_SECOND: u32 = 10;

    /// Timers (milliseconds)
    pub const HIT_FLASH_MS: u32 = 1200; // six 100ms fade/unfade blinks
    pub const HIT_IMMUNITY_MS: u32 = 1000;
    pub const GAME_OVER_DELAY_MS: u32 = 600;
    pub const LEVEL_COMPLETE_DISPLAY_MS: u32 = 2000;
    pub const RETARGET_MS: u32 = 300;

    /// Modifier windows (seconds)
    pub const MODIFIER_ACTIVE_SECS: u32 = 10;
    pub const MODIFIER_COOLDOWN_SECS: u32 = 15;
}

/// Convert a duration in milliseconds to whole simulation ticks
#[inline]
pub const fn ms_to_ticks(ms: u32) -> u32 {
    ms * consts::SIM_HZ / 1000
}

/// Convert whole seconds to simulation ticks
#[inline]
pub const fn secs_to_ticks(secs: u32) -> u32 {
    secs * consts::SIM_HZ
}

/// Seconds remaining on a tick countdown, rounded up for display
#[inline]
pub fn ticks_to_secs_ceil(ticks: u32) -> u32 {
    ticks.div_ceil(consts::SIM_HZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_conversions() {
        assert_eq!(ms_to_ticks(300), 36);
        assert_eq!(ms_to_ticks(600), 72);
        assert_eq!(secs_to_ticks(10), 1200);
        assert_eq!(ticks_to_secs_ceil(0), 0);
        assert_eq!(ticks_to_secs_ceil(1), 1);
        assert_eq!(ticks_to_secs_ceil(120), 1);
        assert_eq!(ticks_to_secs_ceil(121), 2);
    }
}
