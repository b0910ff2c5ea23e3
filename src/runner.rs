//! Frame-driven session runner
//!
//! Hosts call `frame` with wall-clock deltas; the runner converts them into
//! fixed simulation ticks and batches one-shot commands so each is applied
//! exactly once.

use glam::Vec2;
use serde::Serialize;

use crate::Settings;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::sim::{
    Bubble, CeilingState, ComboUpdate, FireCommand, GameEvent, GamePhase, GameState, GameStats,
    Grid, GridError, GridPos, GridSnapshot, Shooter, TickInput, tick,
};

/// Field geometry in screen units
#[derive(Debug, Clone, Serialize)]
pub struct LayoutView {
    pub cell_size: f32,
    pub cell_radius: f32,
    pub row_height: f32,
    pub top_offset: f32,
    pub field_width: f32,
    pub danger_y: f32,
    pub shooter_x: f32,
    pub shooter_y: f32,
}

impl LayoutView {
    fn from_settings(settings: &Settings) -> Self {
        let shooter = settings.shooter_origin();
        Self {
            cell_size: settings.cell_size,
            cell_radius: settings.cell_radius(),
            row_height: settings.row_height(),
            top_offset: settings.top_offset,
            field_width: settings.field_width(),
            danger_y: settings.danger_y(),
            shooter_x: shooter.x,
            shooter_y: shooter.y,
        }
    }
}

/// An occupied cell with its screen center
#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub col: usize,
    pub row: usize,
    pub x: f32,
    pub y: f32,
    pub bubble: Bubble,
}

/// Projectile as seen by the renderer
#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub bubble: Bubble,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub layout: LayoutView,
    pub grid: GridSnapshot,
    /// Occupied cells, row-major
    pub bubbles: Vec<CellView>,
    pub projectile: Option<ProjectileView>,
    pub shooter: Shooter,
    pub combo: ComboUpdate,
    pub fever_level: u8,
    pub fever_multiplier: f32,
    pub ceiling: CeilingState,
    pub stats: GameStats,
}

/// Game instance holding state plus pending input
pub struct Runner {
    pub state: GameState,
    input: TickInput,
    accumulator: f32,
}

impl Runner {
    pub fn new(seed: u64, settings: Settings) -> Self {
        Self {
            state: GameState::with_settings(seed, settings),
            input: TickInput::default(),
            accumulator: 0.0,
        }
    }

    /// Replace the board with an authored layout and start a fresh session on it
    pub fn load_layout(&mut self, layout: &str) -> Result<(), GridError> {
        let grid = Grid::from_layout(&self.state.settings, layout)?;
        log::info!("Loaded layout with {} bubbles", grid.occupied_count());
        self.state = GameState::with_grid(self.state.seed, self.state.settings.clone(), grid);
        self.accumulator = 0.0;
        Ok(())
    }

    pub fn aim(&mut self, angle: f32) {
        self.input.aim = Some(angle);
    }

    pub fn fire(&mut self, angle: f32, power: f32) {
        self.input.fire = Some(FireCommand { angle, power });
    }

    pub fn swap(&mut self) {
        self.input.swap = true;
    }

    pub fn toggle_pause(&mut self) {
        self.input.pause = !self.input.pause;
    }

    /// Hard reset, optionally switching to a new seed
    pub fn restart(&mut self, seed: Option<u64>) {
        self.input.restart = true;
        self.input.restart_seed = seed;
    }

    pub fn set_idle_mode(&mut self, idle: bool) {
        self.input.idle_mode = idle;
    }

    /// Run simulation ticks for `dt` seconds of wall time
    pub fn frame(&mut self, dt: f32) -> u32 {
        let dt = if dt.is_finite() { dt.clamp(0.0, 0.1) } else { 0.0 };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.aim = None;
            self.input.fire = None;
            self.input.swap = false;
            self.input.pause = false;
            self.input.restart = false;
            self.input.restart_seed = None;
        }

        // Drop backlog we could not catch up on
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    /// Screen center of a cell, `None` outside the board
    pub fn screen_position(&self, col: usize, row: usize) -> Option<Vec2> {
        let grid = &self.state.grid;
        let pos = GridPos::new(col, row);
        grid.in_bounds(pos).then(|| grid.screen_position(pos))
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = &self.state;
        let grid = &state.grid;
        Snapshot {
            phase: state.phase,
            layout: LayoutView::from_settings(&state.settings),
            grid: state.grid_snapshot(),
            bubbles: grid
                .occupied()
                .map(|placed| {
                    let center = grid.screen_position(placed.pos);
                    CellView {
                        col: placed.pos.col,
                        row: placed.pos.row,
                        x: center.x,
                        y: center.y,
                        bubble: placed.bubble,
                    }
                })
                .collect(),
            projectile: state.projectile.as_ref().map(|p| ProjectileView {
                x: p.pos.x,
                y: p.pos.y,
                radius: p.radius,
                bubble: p.bubble,
            }),
            shooter: state.shooter.clone(),
            combo: state.combo.current(),
            fever_level: state.fever.level,
            fever_multiplier: state.fever.multiplier(),
            ceiling: state.ceiling.clone(),
            stats: state.current_stats(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }
}
