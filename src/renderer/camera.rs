//! Camera that follows the player across the world

use glam::Vec2;

use crate::sim::World;

/// World units visible at once
pub const VIEW_WIDTH: f32 = 800.0;
pub const VIEW_HEIGHT: f32 = 600.0;

/// Viewport into the world, centered on `center`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Vec2,
    pub view: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            view: Vec2::new(VIEW_WIDTH, VIEW_HEIGHT),
        }
    }
}

impl Camera {
    /// Center on `target` without showing anything past the world edges.
    ///
    /// An axis where the world is narrower than the view stays centered.
    pub fn follow(&mut self, target: Vec2, world: &World) {
        let half = self.view * 0.5;
        let size = Vec2::new(world.width, world.height);
        let axis = |t: f32, half: f32, size: f32| {
            if size <= half * 2.0 {
                size * 0.5
            } else {
                t.clamp(half, size - half)
            }
        };
        self.center = Vec2::new(axis(target.x, half.x, size.x), axis(target.y, half.y, size.y));
    }

    /// Whether a circle intersects the visible rect
    pub fn is_visible(&self, pos: Vec2, radius: f32) -> bool {
        let d = (pos - self.center).abs();
        let half = self.view * 0.5;
        d.x <= half.x + radius && d.y <= half.y + radius
    }

    /// Map a world position to normalized device coordinates.
    ///
    /// The view is letterboxed to keep its aspect on any canvas; world y grows
    /// downward, NDC y grows upward.
    pub fn to_ndc(&self, pos: Vec2, canvas: (u32, u32)) -> Vec2 {
        (pos - self.center) * self.ndc_scale(canvas)
    }

    /// Per-axis factor taking a world offset from `center` to NDC
    pub fn ndc_scale(&self, canvas: (u32, u32)) -> Vec2 {
        let (w, h) = (canvas.0.max(1) as f32, canvas.1.max(1) as f32);
        let pixels_per_unit = (w / self.view.x).min(h / self.view.y);
        Vec2::new(2.0 * pixels_per_unit / w, -2.0 * pixels_per_unit / h)
    }
}
