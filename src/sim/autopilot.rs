//! Autopilot steering
//!
//! While engaged the player seeks the nearest live orb, re-evaluating the
//! target every few ticks. With no orb in reach it wanders toward random
//! points near its position.

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::level::ControlError;
use super::state::{GameState, Orb, World};
use crate::consts::RETARGET_MS;
use crate::ms_to_ticks;

/// Stop steering when this close to the goal
pub const ARRIVE_DISTANCE: f32 = 10.0;
/// How far ahead a wander point is picked
pub const WANDER_DISTANCE: f32 = 200.0;
/// Wander points stay this far inside the world
pub const WANDER_MARGIN: f32 = 50.0;
/// Per-tick chance of picking a new wander point
pub const WANDER_RESELECT_CHANCE: f64 = 0.05;

/// Steering memory between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutopilotState {
    /// Index of the orb being sought
    pub target: Option<usize>,
    /// Ticks until the next forced re-evaluation
    pub retarget_ticks: u32,
    /// Current wander point when no orb is targeted
    pub wander: Option<Vec2>,
}

/// Nearest enabled orb to `from`. Equal distances pick one at random.
pub fn find_nearest_target<R: Rng + ?Sized>(from: Vec2, orbs: &[Orb], rng: &mut R) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    let mut ties = 0u32;

    for (i, orb) in orbs.iter().enumerate() {
        if !orb.enabled {
            continue;
        }
        let d = from.distance_squared(orb.pos);
        match best {
            Some((_, best_d)) if d > best_d => {}
            Some((_, best_d)) if d == best_d => {
                // Reservoir pick keeps every tied orb equally likely
                ties += 1;
                if rng.random_range(0..ties) == 0 {
                    best = Some((i, d));
                }
            }
            _ => {
                best = Some((i, d));
                ties = 1;
            }
        }
    }

    best.map(|(i, _)| i)
}

/// Pick a fresh wander point 200 units away in a random direction
pub fn wander_point<R: Rng + ?Sized>(from: Vec2, world: &World, rng: &mut R) -> Vec2 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    let point = from + Vec2::new(angle.cos(), angle.sin()) * WANDER_DISTANCE;
    world.clamp_inset(point, WANDER_MARGIN)
}

/// Re-evaluate the target now and restart the retarget timer
pub fn retarget(state: &mut GameState) {
    state.pilot.target = find_nearest_target(state.player.pos, &state.orbs, &mut state.rng);
    state.pilot.retarget_ticks = ms_to_ticks(RETARGET_MS);
    if state.pilot.target.is_some() {
        state.pilot.wander = None;
    }
}

/// Velocity for this tick while the autopilot is engaged
pub fn steer(state: &mut GameState, speed: f32) -> Vec2 {
    let target_lost = state
        .pilot
        .target
        .is_some_and(|i| state.orbs.get(i).is_none_or(|orb| !orb.enabled));

    state.pilot.retarget_ticks = state.pilot.retarget_ticks.saturating_sub(1);
    if target_lost || state.pilot.retarget_ticks == 0 {
        retarget(state);
    }

    let pos = state.player.pos;
    let goal = match state.pilot.target.and_then(|i| state.orbs.get(i)) {
        Some(orb) => orb.pos,
        None => {
            let reselect = state.rng.random_bool(WANDER_RESELECT_CHANCE);
            match state.pilot.wander {
                Some(point) if !reselect => point,
                _ => {
                    let point = wander_point(pos, &state.world, &mut state.rng);
                    state.pilot.wander = Some(point);
                    point
                }
            }
        }
    };

    let to_goal = goal - pos;
    let dist = to_goal.length();
    if dist > ARRIVE_DISTANCE {
        to_goal / dist * speed
    } else {
        Vec2::ZERO
    }
}

/// Engage the autopilot: invulnerable and seeking immediately
pub fn engage(state: &mut GameState) -> Result<(), ControlError> {
    state.autopilot.activate()?;
    state.player.invulnerable = true;
    state.pilot = AutopilotState::default();
    retarget(state);
    state.emit(GameEvent::AutopilotChanged(true));
    log::debug!("Autopilot engaged, target {:?}", state.pilot.target);
    Ok(())
}

/// Release control back to the player.
///
/// Invulnerability survives only while hit immunity is still running.
pub fn disengage(state: &mut GameState) {
    state.player.invulnerable = state.player.hit_immunity_pending();
    state.pilot = AutopilotState::default();
    state.emit(GameEvent::AutopilotChanged(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::layout::SpawnLayout;
    use crate::tuning::LevelConfig;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn orbs(points: &[(f32, f32)]) -> Vec<Orb> {
        points
            .iter()
            .map(|&(x, y)| Orb::new(Vec2::new(x, y), 10.0))
            .collect()
    }

    #[test]
    fn test_nearest_target() {
        let mut rng = Pcg32::seed_from_u64(0);
        let orbs = orbs(&[(10.0, 0.0), (100.0, 100.0)]);
        assert_eq!(find_nearest_target(Vec2::ZERO, &orbs, &mut rng), Some(0));
    }

    #[test]
    fn test_nearest_target_skips_disabled() {
        let mut rng = Pcg32::seed_from_u64(0);
        let mut orbs = orbs(&[(10.0, 0.0), (100.0, 100.0)]);
        orbs[0].enabled = false;
        assert_eq!(find_nearest_target(Vec2::ZERO, &orbs, &mut rng), Some(1));
        orbs[1].enabled = false;
        assert_eq!(find_nearest_target(Vec2::ZERO, &orbs, &mut rng), None);
    }

    #[test]
    fn test_ties_pick_either() {
        let orbs = orbs(&[(10.0, 0.0), (-10.0, 0.0)]);
        let mut seen = [false; 2];
        for seed in 0..64 {
            let mut rng = Pcg32::seed_from_u64(seed);
            if let Some(i) = find_nearest_target(Vec2::ZERO, &orbs, &mut rng) {
                seen[i] = true;
            }
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_wander_point_stays_inside() {
        let world = World::new(400.0, 300.0);
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..100 {
            let p = wander_point(Vec2::new(60.0, 60.0), &world, &mut rng);
            assert!(p.x >= 50.0 && p.x <= 350.0);
            assert!(p.y >= 50.0 && p.y <= 250.0);
        }
    }

    #[test]
    fn test_steer_heads_for_orb() {
        let layout = SpawnLayout::new(Vec2::new(100.0, 100.0)).with_orb(Vec2::new(300.0, 100.0));
        let mut state = GameState::with_layout(LevelConfig::empty(), 1, layout);
        let vel = steer(&mut state, 216.0);
        assert_eq!(state.pilot.target, Some(0));
        assert!((vel - Vec2::new(216.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_steer_stops_on_arrival() {
        let layout = SpawnLayout::new(Vec2::new(100.0, 100.0)).with_orb(Vec2::new(105.0, 100.0));
        let mut state = GameState::with_layout(LevelConfig::empty(), 1, layout);
        assert_eq!(steer(&mut state, 216.0), Vec2::ZERO);
    }

    #[test]
    fn test_steer_wanders_without_orbs() {
        let layout = SpawnLayout::new(Vec2::new(800.0, 600.0));
        let mut state = GameState::with_layout(LevelConfig::empty(), 1, layout);
        let vel = steer(&mut state, 216.0);
        assert!(state.pilot.wander.is_some());
        assert!((vel.length() - 216.0).abs() < 0.01);
    }

    #[test]
    fn test_engage_and_disengage() {
        let layout = SpawnLayout::new(Vec2::new(100.0, 100.0)).with_orb(Vec2::new(300.0, 100.0));
        let mut state = GameState::with_layout(LevelConfig::empty(), 1, layout);
        engage(&mut state).unwrap();
        assert!(state.player.invulnerable);
        assert_eq!(state.pilot.target, Some(0));
        assert_eq!(engage(&mut state), Err(ControlError::AlreadyActive));

        disengage(&mut state);
        assert!(!state.player.invulnerable);
        assert_eq!(
            state.events,
            vec![GameEvent::AutopilotChanged(true), GameEvent::AutopilotChanged(false)]
        );
    }

    #[test]
    fn test_disengage_keeps_pending_hit_immunity() {
        use crate::consts::{HIT_FLASH_MS, HIT_IMMUNITY_MS};

        let layout = SpawnLayout::new(Vec2::ZERO);
        let mut state = GameState::with_layout(LevelConfig::empty(), 1, layout);
        state.player.start_hit();
        engage(&mut state).unwrap();
        disengage(&mut state);
        assert!(state.player.invulnerable);

        let total = ms_to_ticks(HIT_FLASH_MS) + ms_to_ticks(HIT_IMMUNITY_MS);
        for _ in 0..total - 1 {
            state.player.tick_hit_timers(false);
            assert!(state.player.invulnerable);
        }
        state.player.tick_hit_timers(false);
        assert!(!state.player.invulnerable);
    }
}
