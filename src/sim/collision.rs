//! Collision detection and response
//!
//! Everything in the world is a circle: orbs and hazards test overlap against
//! the player, and hazards reflect off the four edges of the world rectangle.

use glam::Vec2;

use super::state::World;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at collision (pointing back into the play area)
    pub normal: Vec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
        }
    }
}

/// Whether two circles overlap (touching counts)
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) <= reach * reach
}

/// Check a circle against the four world edges.
///
/// The normal combines every edge being crossed, so a corner hit reflects
/// both axes at once.
pub fn circle_bounds_collision(pos: Vec2, radius: f32, world: &World) -> CollisionResult {
    let mut normal = Vec2::ZERO;

    if pos.x - radius < 0.0 {
        normal.x = 1.0;
    } else if pos.x + radius > world.width {
        normal.x = -1.0;
    }
    if pos.y - radius < 0.0 {
        normal.y = 1.0;
    } else if pos.y + radius > world.height {
        normal.y = -1.0;
    }

    if normal == Vec2::ZERO {
        return CollisionResult::miss();
    }
    CollisionResult { hit: true, normal }
}

/// Reflect the velocity components that point out of the world (restitution 1).
///
/// Axis-aligned edges make this a per-axis sign flip; a component already
/// heading back inside is left alone so a clamped circle never re-bounces.
pub fn bounce_off_bounds(pos: &mut Vec2, vel: &mut Vec2, radius: f32, world: &World) -> bool {
    let result = circle_bounds_collision(*pos, radius, world);
    if !result.hit {
        return false;
    }

    if result.normal.x != 0.0 && vel.x * result.normal.x < 0.0 {
        vel.x = -vel.x;
    }
    if result.normal.y != 0.0 && vel.y * result.normal.y < 0.0 {
        vel.y = -vel.y;
    }
    *pos = world.clamp_circle(*pos, radius);
    true
}
