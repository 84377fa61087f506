//! Data-driven level balance
//!
//! Every number the simulation reads comes from a `LevelConfig`. The defaults
//! reproduce the reference layout; tests and custom levels override fields.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Tunable parameters for one level instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Countdown length in seconds
    pub duration_secs: u32,
    pub lives: u32,

    pub base_speed: f32,
    pub boost_speed: f32,
    pub autopilot_speed_factor: f32,

    pub player_radius: f32,
    pub orb_radius: f32,
    pub hazard_radius: f32,

    // === Layout ===
    /// Orbs on the outer ring (radius 350 around world center)
    pub outer_ring_orbs: u32,
    pub outer_ring_radius: f32,
    /// Orbs on the inner ring (radius 200)
    pub inner_ring_orbs: u32,
    pub inner_ring_radius: f32,
    /// Orbs scattered uniformly at random
    pub random_orbs: u32,
    /// Include the 8 hand-placed patrolling hazards
    pub fixed_hazards: bool,
    /// Hazards scattered at random with random velocity
    pub random_hazards: u32,
    /// Largest random hazard velocity component (units/s)
    pub hazard_max_velocity: f32,

    // === Modifiers ===
    pub modifier_active_secs: u32,
    pub modifier_cooldown_secs: u32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            duration_secs: LEVEL_DURATION_SECS,
            lives: STARTING_LIVES,

            base_speed: BASE_SPEED,
            boost_speed: BOOST_SPEED,
            autopilot_speed_factor: AUTOPILOT_SPEED_FACTOR,

            player_radius: PLAYER_RADIUS,
            orb_radius: ORB_RADIUS,
            hazard_radius: HAZARD_RADIUS,

            outer_ring_orbs: 12,
            outer_ring_radius: 350.0,
            inner_ring_orbs: 8,
            inner_ring_radius: 200.0,
            random_orbs: 20,
            fixed_hazards: true,
            random_hazards: 30,
            hazard_max_velocity: 80.0,

            modifier_active_secs: MODIFIER_ACTIVE_SECS,
            modifier_cooldown_secs: MODIFIER_COOLDOWN_SECS,
        }
    }
}

impl LevelConfig {
    /// A level with no orbs or hazards, for building custom layouts
    pub fn empty() -> Self {
        Self {
            outer_ring_orbs: 0,
            inner_ring_orbs: 0,
            random_orbs: 0,
            fixed_hazards: false,
            random_hazards: 0,
            ..Self::default()
        }
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total orbs the layout generator will create
    pub fn total_orbs(&self) -> u32 {
        self.outer_ring_orbs + self.inner_ring_orbs + self.random_orbs
    }

    /// Speed for manual steering with or without boost
    pub fn steering_speed(&self, boosted: bool) -> f32 {
        if boosted {
            self.boost_speed
        } else {
            self.base_speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_forty_orbs() {
        assert_eq!(LevelConfig::default().total_orbs(), 40);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = LevelConfig::from_json(r#"{"lives": 5, "random_hazards": 0}"#).unwrap();
        assert_eq!(config.lives, 5);
        assert_eq!(config.random_hazards, 0);
        assert_eq!(config.duration_secs, LEVEL_DURATION_SECS);
        assert_eq!(config.world_width, WORLD_WIDTH);
    }

    #[test]
    fn test_steering_speed() {
        let config = LevelConfig::default();
        assert_eq!(config.steering_speed(false), BASE_SPEED);
        assert_eq!(config.steering_speed(true), BOOST_SPEED);
    }
}
