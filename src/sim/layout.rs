//! Level layout generation
//!
//! A layout is the spawn snapshot of one attempt: where the player starts,
//! where every orb sits, and where every hazard starts with which velocity.
//! Generation is driven by the level's seeded RNG so a seed reproduces it.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::tuning::LevelConfig;

/// Margin between random orbs and the world edge
pub const ORB_EDGE_MARGIN: f32 = 50.0;
/// Margin between random hazards and the world edge
pub const HAZARD_EDGE_MARGIN: f32 = 100.0;
/// Slowest a random hazard may move (units/s)
pub const HAZARD_MIN_SPEED: f32 = 20.0;
/// Random hazards never spawn this close to the player's start
pub const SPAWN_CLEARANCE: f32 = 120.0;
/// Resamples before a hazard falls back to the farthest allowed corner
const SPAWN_TRIES: u32 = 64;

/// Initial position and velocity of one hazard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardSpawn {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Spawn snapshot for one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnLayout {
    pub player: Vec2,
    pub orbs: Vec<Vec2>,
    pub hazards: Vec<HazardSpawn>,
}

impl SpawnLayout {
    /// Empty layout with the player at `player`
    pub fn new(player: Vec2) -> Self {
        Self {
            player,
            orbs: Vec::new(),
            hazards: Vec::new(),
        }
    }

    pub fn with_orb(mut self, pos: Vec2) -> Self {
        self.orbs.push(pos);
        self
    }

    pub fn with_hazard(mut self, pos: Vec2, vel: Vec2) -> Self {
        self.hazards.push(HazardSpawn { pos, vel });
        self
    }
}

/// Generate a full layout: two orb rings around the center, scattered orbs,
/// the hand-placed patrol hazards and randomly drifting hazards.
pub fn generate_layout<R: Rng + ?Sized>(config: &LevelConfig, rng: &mut R) -> SpawnLayout {
    let center = Vec2::new(config.world_width / 2.0, config.world_height / 2.0);
    let mut layout = SpawnLayout::new(center);

    layout.orbs.extend(ring(center, config.outer_ring_radius, config.outer_ring_orbs));
    layout.orbs.extend(ring(center, config.inner_ring_radius, config.inner_ring_orbs));
    for _ in 0..config.random_orbs {
        layout.orbs.push(random_point(rng, config, ORB_EDGE_MARGIN));
    }

    if config.fixed_hazards {
        layout.hazards.extend(patrol_hazards(center));
    }
    for _ in 0..config.random_hazards {
        let pos = point_away_from(rng, config, center);
        let vel = random_hazard_velocity(rng, config.hazard_max_velocity);
        layout.hazards.push(HazardSpawn { pos, vel });
    }

    log::debug!(
        "Generated layout: {} orbs, {} hazards",
        layout.orbs.len(),
        layout.hazards.len()
    );
    layout
}

/// `count` points evenly spaced on a circle
fn ring(center: Vec2, radius: f32, count: u32) -> impl Iterator<Item = Vec2> {
    (0..count).map(move |i| {
        let angle = i as f32 / count as f32 * TAU;
        center + Vec2::new(angle.cos(), angle.sin()) * radius
    })
}

/// The eight hand-placed hazards: four square patrols and four diagonal drifters
fn patrol_hazards(center: Vec2) -> [HazardSpawn; 8] {
    let spawn = |dx: f32, dy: f32, vx: f32, vy: f32| HazardSpawn {
        pos: center + Vec2::new(dx, dy),
        vel: Vec2::new(vx, vy),
    };
    [
        spawn(-200.0, -200.0, 60.0, 0.0),
        spawn(200.0, -200.0, -60.0, 0.0),
        spawn(-200.0, 200.0, 0.0, 60.0),
        spawn(200.0, 200.0, 0.0, -60.0),
        spawn(0.0, -300.0, 70.0, 70.0),
        spawn(0.0, 300.0, -70.0, -70.0),
        spawn(-300.0, 0.0, -70.0, 70.0),
        spawn(300.0, 0.0, 70.0, -70.0),
    ]
}

/// Uniform point inside the world, `margin` away from every edge
fn random_point<R: Rng + ?Sized>(rng: &mut R, config: &LevelConfig, margin: f32) -> Vec2 {
    let x_max = (config.world_width - margin).max(margin);
    let y_max = (config.world_height - margin).max(margin);
    Vec2::new(
        rng.random_range(margin..=x_max),
        rng.random_range(margin..=y_max),
    )
}

/// Random hazard position at least `SPAWN_CLEARANCE` from `spawn`.
///
/// Worlds too small to allow that get the corner of the hazard box farthest
/// from the spawn instead.
fn point_away_from<R: Rng + ?Sized>(rng: &mut R, config: &LevelConfig, spawn: Vec2) -> Vec2 {
    for _ in 0..SPAWN_TRIES {
        let pos = random_point(rng, config, HAZARD_EDGE_MARGIN);
        if pos.distance(spawn) >= SPAWN_CLEARANCE {
            return pos;
        }
    }
    let lo = HAZARD_EDGE_MARGIN;
    let hi = Vec2::new(
        (config.world_width - lo).max(lo),
        (config.world_height - lo).max(lo),
    );
    let pick = |s: f32, a: f32, b: f32| if (s - a).abs() >= (s - b).abs() { a } else { b };
    Vec2::new(pick(spawn.x, lo, hi.x), pick(spawn.y, lo, hi.y))
}

/// Random velocity with each component in `[-max, max]`, never near-still
fn random_hazard_velocity<R: Rng + ?Sized>(rng: &mut R, max: f32) -> Vec2 {
    if max <= 0.0 {
        return Vec2::ZERO;
    }
    let min_speed = HAZARD_MIN_SPEED.min(max);
    loop {
        let vel = Vec2::new(rng.random_range(-max..=max), rng.random_range(-max..=max));
        if vel.length() >= min_speed {
            return vel;
        }
    }
}
