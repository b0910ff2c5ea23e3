//! The shot bubble in flight
//!
//! A projectile only knows about the side walls. Landing is decided by the
//! tick loop, which asks the grid for contacts after every substep.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{reflect_velocity, side_wall_collision};
use super::grid::Bubble;
use crate::{aim_direction, clamp_aim};

/// Projectile lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileState {
    Flying,
    Landed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// What the projectile becomes once it lands
    pub bubble: Bubble,
    pub state: ProjectileState,
    /// Wall bounces so far
    pub bounces: u32,
}

impl Projectile {
    /// Fire from `origin` along `angle` (0 = up) at `speed`
    pub fn launch(origin: Vec2, angle: f32, speed: f32, radius: f32, bubble: Bubble) -> Self {
        Self {
            pos: origin,
            vel: aim_direction(clamp_aim(angle)) * speed,
            radius,
            bubble,
            state: ProjectileState::Flying,
            bounces: 0,
        }
    }

    #[inline]
    pub fn is_flying(&self) -> bool {
        self.state == ProjectileState::Flying
    }

    /// Substeps needed to move `dt` without skipping past a bubble
    pub fn substeps(&self, dt: f32) -> u32 {
        let travel = self.vel.length() * dt;
        let max_step = (self.radius * 0.5).max(1.0);
        ((travel / max_step).ceil() as u32).max(1)
    }

    /// Integrate one step, bouncing off the side walls.
    ///
    /// Returns true if a wall was hit this step.
    pub fn update(&mut self, dt: f32, left: f32, right: f32) -> bool {
        if !self.is_flying() {
            return false;
        }

        self.pos += self.vel * dt;

        let wall = side_wall_collision(self.pos, self.radius, left, right);
        if !wall.hit {
            return false;
        }

        // Mirror the overshoot back into the field
        self.pos += wall.normal * (2.0 * wall.penetration);
        if self.vel.dot(wall.normal) < 0.0 {
            self.vel = reflect_velocity(self.vel, wall.normal);
        }
        self.bounces += 1;
        true
    }

    pub fn land(&mut self) {
        self.state = ProjectileState::Landed;
        self.vel = Vec2::ZERO;
    }
}
