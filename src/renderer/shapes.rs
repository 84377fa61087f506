//! Shape generation for 2D primitives
//!
//! Everything is emitted in world coordinates; the pipeline maps vertices
//! through the camera.

use glam::Vec2;
use std::f32::consts::{PI, TAU};

use super::camera::Camera;
use super::vertex::{Vertex, colors};
use crate::ms_to_ticks;
use crate::sim::{GameState, Hazard, Player};

const CIRCLE_SEGMENTS: u32 = 24;
const GRID_SPACING: f32 = 100.0;
const HAZARD_SPOKES: u32 = 6;
/// One half of a hit-flash blink
const BLINK_MS: u32 = 100;

fn with_alpha(mut color: [f32; 4], alpha: f32) -> [f32; 4] {
    color[3] *= alpha;
    color
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a ring (hollow circle)
pub fn ring(
    center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    color: [f32; 4],
    segments: u32,
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 6) as usize);
    let point = |r: f32, theta: f32| center + Vec2::from_angle(theta) * r;

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * TAU;
        let theta2 = ((i + 1) as f32 / segments as f32) * TAU;

        let inner1 = point(inner_radius, theta1);
        let outer1 = point(outer_radius, theta1);
        let inner2 = point(inner_radius, theta2);
        let outer2 = point(outer_radius, theta2);

        // Two triangles per segment
        vertices.push(Vertex::new(inner1.x, inner1.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(inner2.x, inner2.y, color));

        vertices.push(Vertex::new(inner2.x, inner2.y, color));
        vertices.push(Vertex::new(outer1.x, outer1.y, color));
        vertices.push(Vertex::new(outer2.x, outer2.y, color));
    }

    vertices
}

/// Thick line segment as a quad
pub fn segment(a: Vec2, b: Vec2, width: f32, color: [f32; 4]) -> Vec<Vertex> {
    let dir = (b - a).normalize_or_zero();
    let perp = dir.perp() * (width * 0.5);

    let (a1, a2, b1, b2) = (a + perp, a - perp, b + perp, b - perp);
    vec![
        Vertex::new(a1.x, a1.y, color),
        Vertex::new(a2.x, a2.y, color),
        Vertex::new(b1.x, b1.y, color),
        Vertex::new(b1.x, b1.y, color),
        Vertex::new(a2.x, a2.y, color),
        Vertex::new(b2.x, b2.y, color),
    ]
}

/// Spinning spiked hazard
pub fn hazard(h: &Hazard) -> Vec<Vertex> {
    let mut vertices = circle(h.pos, h.radius * 0.6, colors::HAZARD_CORE, CIRCLE_SEGMENTS);
    for i in 0..HAZARD_SPOKES {
        let theta = h.spin + i as f32 / HAZARD_SPOKES as f32 * TAU;
        let tip = h.pos + Vec2::from_angle(theta) * h.radius;
        vertices.extend(segment(h.pos, tip, h.radius * 0.3, colors::HAZARD));
    }
    vertices
}

/// Alpha for the hit flash: alternates every `BLINK_MS`
pub fn flash_alpha(player: &Player) -> f32 {
    if !player.hit {
        return 1.0;
    }
    let blink = ms_to_ticks(BLINK_MS).max(1);
    if (player.flash_ticks / blink) % 2 == 1 {
        0.3
    } else {
        1.0
    }
}

/// Robot body with an eye on the facing side.
///
/// With `reduced_motion` a hit dims the robot instead of blinking it.
pub fn player(p: &Player, shielded: bool, reduced_motion: bool) -> Vec<Vertex> {
    if !p.alive {
        return Vec::new();
    }
    let alpha = match (p.hit, reduced_motion) {
        (true, true) => 0.6,
        _ => flash_alpha(p),
    };
    let mut vertices = circle(p.pos, p.radius, with_alpha(colors::PLAYER, alpha), CIRCLE_SEGMENTS);

    let side = if p.facing_left { -1.0 } else { 1.0 };
    let eye = p.pos + Vec2::new(side * p.radius * 0.45, -p.radius * 0.25);
    vertices.extend(circle(
        eye,
        p.radius * 0.2,
        with_alpha(colors::PLAYER_EYE, alpha),
        12,
    ));

    if shielded {
        vertices.extend(ring(
            p.pos,
            p.radius * 1.2,
            p.radius * 1.4,
            colors::SHIELD,
            CIRCLE_SEGMENTS,
        ));
    }
    vertices
}

/// Background grid lines inside the camera view (gives a sense of scrolling)
fn grid(state: &GameState, camera: &Camera) -> Vec<Vertex> {
    let half = camera.view * 0.5;
    let min = (camera.center - half).max(Vec2::ZERO);
    let max = (camera.center + half).min(Vec2::new(state.world.width, state.world.height));
    let mut vertices = Vec::new();

    let mut x = (min.x / GRID_SPACING).ceil() * GRID_SPACING;
    while x <= max.x {
        vertices.extend(segment(Vec2::new(x, min.y), Vec2::new(x, max.y), 1.0, colors::GRID));
        x += GRID_SPACING;
    }
    let mut y = (min.y / GRID_SPACING).ceil() * GRID_SPACING;
    while y <= max.y {
        vertices.extend(segment(Vec2::new(min.x, y), Vec2::new(max.x, y), 1.0, colors::GRID));
        y += GRID_SPACING;
    }
    vertices
}

fn border(state: &GameState) -> Vec<Vertex> {
    let (w, h) = (state.world.width, state.world.height);
    let corners = [
        Vec2::ZERO,
        Vec2::new(w, 0.0),
        Vec2::new(w, h),
        Vec2::new(0.0, h),
    ];
    (0..4)
        .flat_map(|i| segment(corners[i], corners[(i + 1) % 4], 4.0, colors::WORLD_BORDER))
        .collect()
}

/// Build the full frame for the current state, culled to the camera
pub fn scene_vertices(state: &GameState, camera: &Camera, reduced_motion: bool) -> Vec<Vertex> {
    let mut vertices = grid(state, camera);
    vertices.extend(border(state));

    // Orbs pulse gently
    let pulse = if reduced_motion {
        1.0
    } else {
        1.0 + 0.15 * (state.anim_time * 4.0).sin()
    };
    for orb in state.orbs.iter().filter(|o| o.enabled) {
        if !camera.is_visible(orb.pos, orb.radius * 2.0) {
            continue;
        }
        vertices.extend(circle(orb.pos, orb.radius * 1.8 * pulse, colors::ORB_GLOW, 16));
        vertices.extend(circle(orb.pos, orb.radius, colors::ORB, 16));
    }

    for h in state.hazards.iter().filter(|h| camera.is_visible(h.pos, h.radius)) {
        vertices.extend(hazard(h));
    }

    let p = &state.player;
    if state.boost.is_active() && p.vel.length_squared() > 0.0 {
        let tail = p.pos - p.vel.normalize() * p.radius * 2.0;
        vertices.extend(segment(tail, p.pos, p.radius, colors::BOOST_TRAIL));
    }
    vertices.extend(player(p, state.autopilot.is_active(), reduced_motion));

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SpawnLayout, create_level};
    use crate::tuning::LevelConfig;

    #[test]
    fn test_primitive_vertex_counts() {
        assert_eq!(circle(Vec2::ZERO, 1.0, colors::ORB, 10).len(), 30);
        assert_eq!(ring(Vec2::ZERO, 1.0, 2.0, colors::ORB, 10).len(), 60);
        assert_eq!(segment(Vec2::ZERO, Vec2::X, 1.0, colors::ORB).len(), 6);
    }

    #[test]
    fn test_segment_width() {
        let quad = segment(Vec2::ZERO, Vec2::new(10.0, 0.0), 4.0, colors::GRID);
        let ys: Vec<f32> = quad.iter().map(|v| v.position[1]).collect();
        assert!(ys.iter().all(|y| (y.abs() - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_flash_blinks() {
        let mut p = Player::new(Vec2::ZERO, 20.0);
        assert_eq!(flash_alpha(&p), 1.0);

        p.start_hit();
        let blink = ms_to_ticks(BLINK_MS);
        let mut seen = Vec::new();
        while p.flash_ticks > 0 {
            seen.push(flash_alpha(&p));
            p.tick_hit_timers(false);
        }
        assert!(seen.contains(&0.3));
        assert!(seen.contains(&1.0));
        // Alpha only changes on blink boundaries
        assert_eq!(seen[1], seen[blink as usize - 1]);
    }

    #[test]
    fn test_reduced_motion_dims_instead_of_blinking() {
        let mut p = Player::new(Vec2::ZERO, 20.0);
        p.start_hit();
        let mut alphas = Vec::new();
        while p.flash_ticks > 0 {
            alphas.push(player(&p, false, true)[0].color[3]);
            p.tick_hit_timers(false);
        }
        assert!(alphas.iter().all(|&a| a == 0.6));
    }

    #[test]
    fn test_dead_player_not_drawn() {
        let mut p = Player::new(Vec2::ZERO, 20.0);
        p.alive = false;
        assert!(player(&p, true, false).is_empty());
    }

    #[test]
    fn test_scene_skips_collected_and_offscreen_orbs() {
        let layout = SpawnLayout::new(Vec2::new(400.0, 300.0))
            .with_orb(Vec2::new(450.0, 300.0))
            .with_orb(Vec2::new(1500.0, 1100.0));
        let level = crate::sim::Level::with_layout(LevelConfig::default(), 1, layout);
        let mut camera = Camera::default();
        camera.follow(level.state().player.pos, &level.state().world);

        let base = scene_vertices(level.state(), &camera, false).len();

        let mut state = level.state().clone();
        state.orbs[0].enabled = false;
        let fewer = scene_vertices(&state, &camera, false).len();
        // One visible orb: glow + body at 16 segments each
        assert_eq!(base - fewer, 2 * 16 * 3);

        // The far orb is culled either way
        state.orbs[1].enabled = false;
        assert_eq!(scene_vertices(&state, &camera, false).len(), fewer);
    }

    #[test]
    fn test_generated_level_renders() {
        let level = create_level(LevelConfig::default(), 7);
        let mut camera = Camera::default();
        camera.follow(level.state().player.pos, &level.state().world);
        let vertices = scene_vertices(level.state(), &camera, false);
        assert!(!vertices.is_empty());
        assert_eq!(vertices.len() % 3, 0);
    }
}
