//! Collision detection and response helpers
//!
//! Shots are circles moving inside a box that is open at the bottom; only the
//! side walls reflect. Bubble contacts are handled by the grid.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at collision (pointing toward the circle center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check a circle against the left (`x = left`) and right (`x = right`) walls
pub fn side_wall_collision(pos: Vec2, radius: f32, left: f32, right: f32) -> CollisionResult {
    let left_pen = left + radius - pos.x;
    if left_pen > 0.0 {
        return CollisionResult {
            hit: true,
            normal: Vec2::X,
            penetration: left_pen,
        };
    }

    let right_pen = pos.x + radius - right;
    if right_pen > 0.0 {
        return CollisionResult {
            hit: true,
            normal: Vec2::NEG_X,
            penetration: right_pen,
        };
    }

    CollisionResult::miss()
}

/// Two circles touch or overlap
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_squared(b) <= reach * reach
}

/// Reflect velocity off a surface with given normal (lossless)
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
