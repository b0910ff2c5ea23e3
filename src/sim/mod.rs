//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (row-major over the grid)
//! - No rendering or platform dependencies

pub mod collision;
pub mod grid;
pub mod matching;
pub mod powerup;
pub mod projectile;
pub mod scoring;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, reflect_velocity, side_wall_collision};
pub use grid::{
    Bubble, BubbleColor, Grid, GridError, GridPos, GridSnapshot, PlacedBubble, PowerUpKind,
};
pub use matching::{find_cluster, find_matches, find_orphans};
pub use projectile::{Projectile, ProjectileState};
pub use scoring::{ComboSystem, ComboUpdate, FeverSystem, combo_multiplier, fever_level};
pub use state::{
    CeilingState, GameEvent, GameOverReason, GamePhase, GameState, GameStats, Shooter,
};
pub use tick::{FireCommand, TickInput, auto_aim, resolve_landing, tick};
