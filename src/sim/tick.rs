//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. One tick runs,
//! in order: pending game over, input/autopilot steering, movement, orb
//! pickups, hazard contacts, then timers and the countdown clock.

use glam::Vec2;

use super::autopilot;
use super::collision::circles_overlap;
use super::events::GameEvent;
use super::modifiers::ModifierTransition;
use super::state::{GameOverReason, GamePhase, GameState};
use crate::consts::*;
use crate::ms_to_ticks;

/// Joystick deflection below this is ignored and the keyboard is used
pub const JOYSTICK_DEAD_ZONE: f32 = 0.1;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Virtual joystick deflection (any magnitude, only direction is used)
    pub joystick: Vec2,
}

impl TickInput {
    /// Unit steering direction. The joystick wins over the keyboard when it
    /// is deflected past the dead zone.
    pub fn direction(&self) -> Vec2 {
        if self.joystick.length() > JOYSTICK_DEAD_ZONE {
            return self.joystick.normalize();
        }

        let mut dir = Vec2::ZERO;
        if self.left {
            dir.x -= 1.0;
        } else if self.right {
            dir.x += 1.0;
        }
        if self.up {
            dir.y -= 1.0;
        } else if self.down {
            dir.y += 1.0;
        }
        dir.normalize_or_zero()
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    match state.phase {
        GamePhase::Running => {}
        GamePhase::LevelComplete if !state.frozen => {
            run_display_window(state, dt);
            return;
        }
        _ => return,
    }

    state.time_ticks += 1;

    if resolve_pending_game_over(state) {
        return;
    }

    update_player_velocity(state, input);
    advance(state, dt);
    collect_orbs(state);
    check_hazard_contacts(state);

    if !state.is_over {
        update_timers(state);
    }
}

/// Move the player and hazards by `dt`. No-op once the level is frozen.
pub fn advance(state: &mut GameState, dt: f32) {
    if state.frozen {
        return;
    }

    let player = &mut state.player;
    player.pos = state
        .world
        .clamp_circle(player.pos + player.vel * dt, player.radius);

    advance_hazards(state, dt);
}

fn advance_hazards(state: &mut GameState, dt: f32) {
    let world = state.world;
    for hazard in &mut state.hazards {
        hazard.advance(&world, dt);
    }
    state.anim_time += dt;
}

/// Hazards and cosmetics keep animating after a level completes, then freeze
fn run_display_window(state: &mut GameState, dt: f32) {
    advance_hazards(state, dt);
    match state.freeze_in {
        Some(ticks) if ticks > 1 => state.freeze_in = Some(ticks - 1),
        _ => {
            state.freeze_in = None;
            state.frozen = true;
            log::debug!("Level complete display finished, simulation frozen");
        }
    }
}

/// Count down a pending game over; true if it fired this tick
fn resolve_pending_game_over(state: &mut GameState) -> bool {
    let Some(ticks) = state.game_over_in else {
        return false;
    };
    if ticks > 1 {
        state.game_over_in = Some(ticks - 1);
        return false;
    }
    state.game_over_in = None;
    end_game(state, GameOverReason::LivesExhausted);
    true
}

fn update_player_velocity(state: &mut GameState, input: &TickInput) {
    // Knocked back: drift with the last velocity until the flash ends
    if state.player.hit {
        return;
    }

    let speed = state.config.steering_speed(state.boost.is_active());
    let vel = if state.autopilot.is_active() {
        autopilot::steer(state, speed * state.config.autopilot_speed_factor)
    } else {
        input.direction() * speed
    };
    state.player.steer(vel);
}

fn collect_orbs(state: &mut GameState) {
    let pos = state.player.pos;
    let radius = state.player.radius;

    for i in 0..state.orbs.len() {
        if state.is_over {
            break;
        }
        let orb = &mut state.orbs[i];
        if !orb.enabled || !circles_overlap(pos, radius, orb.pos, orb.radius) {
            continue;
        }
        orb.enabled = false;

        state.orbs_collected += 1;
        state.score += ORB_POINTS;
        let remaining = state.orbs_remaining();
        state.emit(GameEvent::ScoreChanged(state.score));
        state.emit(GameEvent::OrbCollected {
            index: i,
            remaining,
        });

        if state.autopilot.is_active() && state.pilot.target == Some(i) {
            autopilot::retarget(state);
        }
        if remaining == 0 {
            complete_level(state);
        }
    }
}

fn check_hazard_contacts(state: &mut GameState) {
    if state.is_over || state.player.invulnerable {
        return;
    }

    let player = &state.player;
    let contact = state
        .hazards
        .iter()
        .position(|h| circles_overlap(player.pos, player.radius, h.pos, h.radius));
    if let Some(index) = contact {
        hazard_hit(state, index);
    }
}

/// Apply a hazard collision. Returns false when the hit is ignored
/// (already flashing, immune, out of lives or the run is over).
pub fn hazard_hit(state: &mut GameState, index: usize) -> bool {
    let player = &state.player;
    if state.is_over || player.hit || player.invulnerable || state.lives == 0 {
        return false;
    }

    state.lives -= 1;
    let penalized = state.score.saturating_sub(HAZARD_PENALTY);
    let score_changed = penalized != state.score;
    state.score = penalized;
    state.player.start_hit();

    state.emit(GameEvent::HazardHit { index });
    state.emit(GameEvent::LivesChanged(state.lives));
    if score_changed {
        state.emit(GameEvent::ScoreChanged(state.score));
    }

    if state.lives == 0 {
        state.game_over_in = Some(ms_to_ticks(GAME_OVER_DELAY_MS));
        log::debug!("Out of lives, game over in {GAME_OVER_DELAY_MS}ms");
    }
    true
}

fn update_timers(state: &mut GameState) {
    let forced = state.autopilot.is_active();
    state.player.tick_hit_timers(forced);

    if state.boost.tick() == Some(ModifierTransition::Expired) {
        state.emit(GameEvent::BoostChanged(false));
    }
    if state.autopilot.tick() == Some(ModifierTransition::Expired) {
        autopilot::disengage(state);
    }
    refresh_overdrive(state);

    state.clock_ticks += 1;
    if state.clock_ticks >= GameState::ticks_per_second() {
        state.clock_ticks = 0;
        state.time_left = state.time_left.saturating_sub(1);
        state.emit(GameEvent::TimeChanged(state.time_left));
        if state.time_left == 0 {
            end_game(state, GameOverReason::TimeExpired);
        }
    }
}

/// Emit an overdrive change when boost+autopilot overlap starts or stops
pub(crate) fn refresh_overdrive(state: &mut GameState) {
    let now = state.boost.is_active() && state.autopilot.is_active();
    if now != state.overdrive {
        state.overdrive = now;
        state.emit(GameEvent::OverdriveChanged(now));
    }
}

/// Deactivate both modifiers without cooldown
pub(crate) fn stop_modifiers(state: &mut GameState) {
    if state.boost.is_active() {
        state.emit(GameEvent::BoostChanged(false));
    }
    state.boost.reset();

    let piloting = state.autopilot.is_active();
    state.autopilot.reset();
    if piloting {
        autopilot::disengage(state);
    }
    refresh_overdrive(state);
}

/// Every orb collected: award the time bonus and enter the display window
pub fn complete_level(state: &mut GameState) {
    if state.is_over {
        return;
    }
    state.is_over = true;
    state.phase = GamePhase::LevelComplete;
    state.freeze_in = Some(ms_to_ticks(LEVEL_COMPLETE_DISPLAY_MS));
    state.game_over_in = None;
    stop_modifiers(state);
    state.player.vel = Vec2::ZERO;

    let time_bonus = state.time_left * TIME_BONUS_PER_SECOND;
    if time_bonus > 0 {
        state.score += time_bonus;
        state.emit(GameEvent::ScoreChanged(state.score));
    }
    state.emit(GameEvent::LevelComplete { time_bonus });

    let summary = state.take_summary();
    log::info!(
        "Level complete: score {} in {}s (bonus {time_bonus})",
        summary.score,
        summary.elapsed_time
    );
    state.emit(GameEvent::Terminal(summary));
}

/// End the run in game over and freeze the simulation
pub fn end_game(state: &mut GameState, reason: GameOverReason) {
    if state.is_over {
        return;
    }
    state.is_over = true;
    state.phase = GamePhase::GameOver(reason);
    state.frozen = true;
    state.game_over_in = None;
    stop_modifiers(state);
    state.player.vel = Vec2::ZERO;
    if reason == GameOverReason::LivesExhausted {
        state.player.alive = false;
    }
    state.emit(GameEvent::GameOver { reason });

    let summary = state.take_summary();
    log::info!(
        "Game over ({reason:?}): score {} in {}s",
        summary.score,
        summary.elapsed_time
    );
    state.emit(GameEvent::Terminal(summary));
}
