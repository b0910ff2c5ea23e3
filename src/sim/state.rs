//! Game state and core simulation types
//!
//! Everything the tick loop mutates lives in `GameState`. Hosts read it after
//! each tick and drain `events`.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::{Bubble, BubbleColor, Grid, GridSnapshot, PlacedBubble, PowerUpKind, random_bubble};
use super::projectile::Projectile;
use super::scoring::{ComboSystem, FeverSystem};
use crate::Settings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the player to start aiming
    Ready,
    /// Aim direction is being updated
    Aiming,
    /// A projectile is in flight
    Shooting,
    /// Landing is being resolved (transient within a tick)
    Resolving,
    /// Game is paused
    Paused,
    /// Board cleared; refilled board becomes playable after a short pause
    Victory,
    /// Run ended
    GameOver,
}

impl GamePhase {
    /// Phases in which session timers run
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            GamePhase::Ready | GamePhase::Aiming | GamePhase::Shooting | GamePhase::Resolving
        )
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// A bubble reached the danger line
    DangerLine,
    /// No empty cell left for a landing shot
    BoardFull,
}

/// Ceiling descent bookkeeping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CeilingState {
    /// Seconds accumulated toward the next descent
    pub descent_timer: f32,
    /// Seconds of freeze left; descent is suspended while positive
    pub freeze_timer: f32,
    /// Rows inserted at the top this session
    pub row_offset: u32,
}

impl CeilingState {
    /// Advance timers. Freeze time is consumed before descent time accrues.
    pub fn advance(&mut self, dt: f32, period: f32) {
        if self.freeze_timer > 0.0 {
            self.freeze_timer = (self.freeze_timer - dt).max(0.0);
        } else {
            self.descent_timer = (self.descent_timer + dt).min(period);
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_timer > 0.0
    }

    pub fn freeze(&mut self, duration: f32) {
        self.freeze_timer = self.freeze_timer.max(duration);
    }

    /// Consume a due descent. At most one row per call.
    pub fn take_descent(&mut self, period: f32) -> bool {
        if self.is_frozen() || self.descent_timer < period {
            return false;
        }
        self.descent_timer = 0.0;
        self.row_offset += 1;
        true
    }
}

/// Current and next shot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shooter {
    /// Aim angle in radians (0 = up, positive = right)
    pub angle: f32,
    pub current: Bubble,
    pub next: Bubble,
}

/// Session statistics reported with terminal events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: u64,
    pub shots_fired: u32,
    pub bubbles_popped: u32,
    pub matches: u32,
    pub orphans_dropped: u32,
    pub max_combo: u32,
    pub fever_level: u8,
    pub power_ups_triggered: u32,
    pub perfect_clears: u32,
    pub rows_descended: u32,
    /// Seconds of live play
    pub elapsed: f32,
}

/// Events for audio, effects and analytics. Drained by the host once per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    ShotFired { bubble: Bubble, angle: f32 },
    Landed { bubble: PlacedBubble },
    Match { bubbles: Vec<PlacedBubble> },
    Cascade { bubbles: Vec<PlacedBubble> },
    PowerUp { kind: PowerUpKind, removed: Vec<PlacedBubble> },
    ComboChange { count: u32, multiplier: f32 },
    FeverChange { level: u8, multiplier: f32 },
    CeilingDescended { row_offset: u32 },
    Score { points: u64, total: u64 },
    GameOver { reason: GameOverReason, stats: GameStats },
    Victory { stats: GameStats },
}

/// Complete game state (deterministic given seed and inputs)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: Settings,
    pub phase: GamePhase,
    /// Phase to return to when unpausing
    pub resume_phase: GamePhase,
    pub grid: Grid,
    pub shooter: Shooter,
    pub projectile: Option<Projectile>,
    pub combo: ComboSystem,
    pub fever: FeverSystem,
    pub ceiling: CeilingState,
    pub stats: GameStats,
    /// Seconds left in the Victory phase
    pub victory_timer: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Pending events, oldest first
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new game with default settings
    pub fn new(seed: u64) -> Self {
        Self::with_settings(seed, Settings::default())
    }

    /// Create a game with custom settings. Settings that fail validation are
    /// replaced by the defaults.
    pub fn with_settings(seed: u64, settings: Settings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("Invalid settings, using defaults: {e}");
                Settings::default()
            }
        };
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut grid = Grid::from_settings(&settings);
        let colors = BubbleColor::palette(settings.color_count);
        grid.fill_random(
            settings.initial_rows,
            colors,
            settings.power_up_chance * 0.5,
            &mut rng,
        );

        let current = random_bubble(colors, 0.0, &mut rng);
        let next = random_bubble(colors, settings.power_up_chance, &mut rng);

        log::info!(
            "New session: seed={}, difficulty={}, {} bubbles",
            seed,
            settings.difficulty.as_str(),
            grid.occupied_count()
        );

        Self {
            seed,
            rng,
            combo: ComboSystem::new(settings.combo_window),
            fever: FeverSystem::default(),
            ceiling: CeilingState::default(),
            phase: GamePhase::Ready,
            resume_phase: GamePhase::Ready,
            grid,
            shooter: Shooter {
                angle: 0.0,
                current,
                next,
            },
            projectile: None,
            stats: GameStats::default(),
            victory_timer: 0.0,
            time_ticks: 0,
            events: Vec::new(),
            settings,
        }
    }

    /// Start over from a prepared board (tests, authored levels)
    pub fn with_grid(seed: u64, settings: Settings, grid: Grid) -> Self {
        let mut state = Self::with_settings(seed, settings);
        state.grid = grid;
        state
    }

    /// Hard reset with the same seed and settings
    pub fn restart(&mut self) {
        self.restart_with_seed(self.seed);
    }

    pub fn restart_with_seed(&mut self, seed: u64) {
        log::info!("Restarting session with seed {seed}");
        *self = Self::with_settings(seed, self.settings.clone());
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn grid_snapshot(&self) -> GridSnapshot {
        self.grid.snapshot()
    }

    /// Colors the next shots are drawn from: what is left on the board, or
    /// the whole palette when it is empty
    pub fn shot_colors(&self) -> Vec<BubbleColor> {
        let present = self.grid.colors_present();
        if present.is_empty() {
            BubbleColor::palette(self.settings.color_count).to_vec()
        } else {
            present
        }
    }

    /// Move the next bubble into the chamber and roll a new next
    pub fn advance_shooter(&mut self) {
        let colors = self.shot_colors();
        let incoming = random_bubble(&colors, self.settings.power_up_chance, &mut self.rng);
        self.shooter.current = std::mem::replace(&mut self.shooter.next, incoming);
        // Colors may have been cleared from the board since the bubble was rolled
        if !colors.contains(&self.shooter.current.color) {
            self.shooter.current.color = colors[0];
        }
    }

    pub fn swap_shots(&mut self) {
        std::mem::swap(&mut self.shooter.current, &mut self.shooter.next);
    }

    /// Stats with the live multiplier state folded in
    pub fn current_stats(&self) -> GameStats {
        GameStats {
            fever_level: self.fever.level,
            ..self.stats.clone()
        }
    }
}
