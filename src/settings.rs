//! Game settings and balance tuning
//!
//! Loaded from JSON supplied by the host; every field has a default so partial
//! documents are accepted.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{HEX_ROW_SPACING, PALETTE_SIZE};

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Number of palette colors in play
    pub fn color_count(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Normal => 5,
            Difficulty::Hard => 6,
        }
    }

    /// Seconds between ceiling descents
    pub fn descent_period(&self) -> f32 {
        match self {
            Difficulty::Easy => 30.0,
            Difficulty::Normal => 20.0,
            Difficulty::Hard => 12.0,
        }
    }

    /// Chance that a loaded shot carries a power-up
    pub fn power_up_chance(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.15,
            Difficulty::Normal => 0.10,
            Difficulty::Hard => 0.06,
        }
    }
}

/// Game balance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Difficulty preset the tunables were derived from
    pub difficulty: Difficulty,

    // === Board ===
    /// Columns in a full row (short rows have one fewer)
    pub cols: usize,
    /// Row capacity of the grid
    pub rows: usize,
    /// Rows filled at session start
    pub initial_rows: usize,
    /// Rows filled after a perfect clear
    pub refill_rows: usize,
    /// A bubble at or below this row ends the game
    pub danger_row: usize,
    /// Cell diameter in pixels
    pub cell_size: f32,
    /// Y coordinate of the ceiling
    pub top_offset: f32,
    /// Palette colors in play (1..=6)
    pub color_count: usize,

    // === Shooter ===
    /// Projectile speed at full power (pixels/s)
    pub projectile_speed: f32,
    /// Lowest accepted shot power (fraction of full speed)
    pub min_power: f32,

    // === Timers (seconds) ===
    pub descent_period: f32,
    pub freeze_duration: f32,
    pub combo_window: f32,
    /// Time spent in Victory before the refilled board becomes playable
    pub victory_pause: f32,

    // === Power-ups ===
    pub power_up_chance: f32,
    /// Bomb blast radius in hex cells
    pub bomb_radius: u32,
    pub star_min: usize,
    pub star_max: usize,

    /// End the session on a perfect clear instead of refilling
    pub end_on_perfect_clear: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_preset(Difficulty::Normal)
    }
}

impl Settings {
    /// Create settings from a difficulty preset
    pub fn from_preset(preset: Difficulty) -> Self {
        Self {
            difficulty: preset,

            cols: 11,
            rows: 14,
            initial_rows: 6,
            refill_rows: 4,
            danger_row: 12,
            cell_size: 40.0,
            top_offset: 20.0,
            color_count: preset.color_count(),

            projectile_speed: 900.0,
            min_power: 0.35,

            descent_period: preset.descent_period(),
            freeze_duration: 10.0,
            combo_window: 3.0,
            victory_pause: 1.5,

            power_up_chance: preset.power_up_chance(),
            bomb_radius: 2,
            star_min: 3,
            star_max: 5,

            end_on_perfect_clear: false,
        }
    }

    /// Apply a difficulty preset (updates preset-dependent settings)
    pub fn apply_preset(&mut self, preset: Difficulty) {
        self.difficulty = preset;
        self.color_count = preset.color_count();
        self.descent_period = preset.descent_period();
        self.power_up_chance = preset.power_up_chance();
    }

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the simulation relies on
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::Invalid(msg));

        if self.cols < 3 {
            return invalid(format!("cols must be at least 3 (got {})", self.cols));
        }
        if self.danger_row >= self.rows {
            return invalid(format!(
                "danger_row {} must be below row capacity {}",
                self.danger_row, self.rows
            ));
        }
        if self.initial_rows > self.danger_row {
            return invalid(format!(
                "initial_rows {} reaches the danger row {}",
                self.initial_rows, self.danger_row
            ));
        }
        if self.refill_rows == 0 || self.refill_rows > self.initial_rows {
            return invalid(format!(
                "refill_rows must be in 1..={} (got {})",
                self.initial_rows, self.refill_rows
            ));
        }
        if self.color_count == 0 || self.color_count > PALETTE_SIZE {
            return invalid(format!(
                "color_count must be in 1..={PALETTE_SIZE} (got {})",
                self.color_count
            ));
        }
        if self.star_min > self.star_max {
            return invalid(format!(
                "star_min {} exceeds star_max {}",
                self.star_min, self.star_max
            ));
        }
        if !(0.0..=1.0).contains(&self.power_up_chance) {
            return invalid(format!(
                "power_up_chance must be in [0, 1] (got {})",
                self.power_up_chance
            ));
        }
        if !(self.min_power > 0.0 && self.min_power <= 1.0) {
            return invalid(format!("min_power must be in (0, 1] (got {})", self.min_power));
        }
        let positive = [
            ("cell_size", self.cell_size),
            ("projectile_speed", self.projectile_speed),
            ("descent_period", self.descent_period),
            ("combo_window", self.combo_window),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return invalid(format!("{name} must be positive (got {value})"));
            }
        }
        if self.freeze_duration < 0.0 || self.victory_pause < 0.0 || self.top_offset < 0.0 {
            return invalid("durations and offsets must not be negative".to_string());
        }
        Ok(())
    }

    /// Bubble radius in pixels
    #[inline]
    pub fn cell_radius(&self) -> f32 {
        self.cell_size / 2.0
    }

    /// Vertical distance between row centers
    #[inline]
    pub fn row_height(&self) -> f32 {
        self.cell_size * HEX_ROW_SPACING
    }

    /// Width of the play field (left wall at x = 0)
    #[inline]
    pub fn field_width(&self) -> f32 {
        self.cols as f32 * self.cell_size
    }

    /// Y coordinate of the danger line
    pub fn danger_y(&self) -> f32 {
        self.top_offset + self.danger_row as f32 * self.row_height()
    }

    /// Where shots are launched from (below the last grid row)
    pub fn shooter_origin(&self) -> Vec2 {
        let y = self.top_offset + (self.rows as f32 + 1.0) * self.row_height() + self.cell_radius();
        Vec2::new(self.field_width() / 2.0, y)
    }
}
