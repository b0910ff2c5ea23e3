//! Bubble Pop - A hex-grid bubble shooter engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, matching, power-ups, scoring, game flow)
//! - `settings`: Data-driven game balance and difficulty presets
//!
//! Rendering, audio and input devices live in the host; the engine exposes a
//! grid snapshot, an event queue and a small command surface.

pub mod runner;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use runner::{Runner, Snapshot};
pub use settings::{Difficulty, Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Vertical spacing factor between hex rows (sqrt(3) / 2)
    pub const HEX_ROW_SPACING: f32 = 0.866;

    /// Aim limits (radians from straight up)
    pub const MAX_AIM_ANGLE: f32 = 1.40; // ~80 degrees

    /// Smallest bubble cluster that pops
    pub const MIN_MATCH_SIZE: usize = 3;

    /// Number of distinct bubble colors in the palette
    pub const PALETTE_SIZE: usize = 6;
}

/// Unit direction for an aim angle (0 = straight up, positive = right).
///
/// Screen space: +x right, +y down.
#[inline]
pub fn aim_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), -angle.cos())
}

/// Clamp an aim angle to the playable cone
#[inline]
pub fn clamp_aim(angle: f32) -> f32 {
    if angle.is_nan() {
        return 0.0;
    }
    angle.clamp(-consts::MAX_AIM_ANGLE, consts::MAX_AIM_ANGLE)
}

/// Aim angle pointing from `from` toward `to`
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.x.atan2(-d.y)
}
