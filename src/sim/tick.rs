//! Fixed timestep simulation tick
//!
//! Per tick: input -> projectile update -> collision -> match/cascade
//! resolution -> power-ups -> scoring -> terminal check -> ceiling descent.

use super::grid::{Bubble, BubbleColor, GridPos, PlacedBubble, PowerUpKind};
use super::matching::{find_matches, find_orphans};
use super::powerup;
use super::projectile::Projectile;
use super::scoring::{ORPHAN_BONUS, PERFECT_CLEAR_BONUS, pop_score};
use super::state::{GameEvent, GameOverReason, GamePhase, GameState};
use crate::{angle_between, clamp_aim};

/// A fire command from the input layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    /// Radians from straight up, positive to the right
    pub angle: f32,
    /// Fraction of full projectile speed
    pub power: f32,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Continuous aim update
    pub aim: Option<f32>,
    /// Fire the loaded bubble
    pub fire: Option<FireCommand>,
    /// Exchange current and next bubble
    pub swap: bool,
    /// Pause toggle
    pub pause: bool,
    /// Hard reset
    pub restart: bool,
    /// Seed for the restarted session; keeps the current seed when `None`
    pub restart_seed: Option<u64>,
    /// Idle/demo mode - AI aims and fires
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.restart {
        match input.restart_seed {
            Some(seed) => state.restart_with_seed(seed),
            None => state.restart(),
        }
        return;
    }

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Ready | GamePhase::Aiming | GamePhase::Shooting => {
                state.resume_phase = state.phase;
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = state.resume_phase,
            _ => {}
        }
    }

    // Don't tick if paused or game over; Victory runs its own countdown
    if !(state.phase.is_live() || state.phase == GamePhase::Victory) {
        return;
    }

    state.time_ticks += 1;

    if state.phase == GamePhase::Victory {
        if !state.settings.end_on_perfect_clear {
            state.victory_timer -= dt;
            if state.victory_timer <= 0.0 {
                state.victory_timer = 0.0;
                state.phase = GamePhase::Ready;
            }
        }
        return;
    }

    state.stats.elapsed += dt;

    if let Some(reset) = state.combo.update(dt) {
        state.push_event(GameEvent::ComboChange {
            count: reset.count,
            multiplier: reset.multiplier,
        });
    }
    state.ceiling.advance(dt, state.settings.descent_period);

    // Idle/demo mode - AI plays the game
    let mut input = input.clone();
    if input.idle_mode && matches!(state.phase, GamePhase::Ready | GamePhase::Aiming) {
        input.fire = Some(FireCommand {
            angle: auto_aim(state),
            power: 1.0,
        });
    }

    match state.phase {
        GamePhase::Ready | GamePhase::Aiming => {
            if let Some(angle) = input.aim {
                state.shooter.angle = clamp_aim(angle);
                state.phase = GamePhase::Aiming;
            }
            if input.swap {
                state.swap_shots();
            }
            if let Some(fire) = input.fire {
                fire_shot(state, fire);
            } else {
                idle_descent(state);
            }
        }
        GamePhase::Shooting => advance_projectile(state, dt),
        _ => {}
    }
}

/// Launch the loaded bubble
fn fire_shot(state: &mut GameState, fire: FireCommand) {
    let settings = &state.settings;
    let angle = clamp_aim(fire.angle);
    let power = if fire.power.is_nan() {
        1.0
    } else {
        fire.power.clamp(settings.min_power, 1.0)
    };
    let bubble = state.shooter.current;
    let projectile = Projectile::launch(
        settings.shooter_origin(),
        angle,
        settings.projectile_speed * power,
        settings.cell_radius(),
        bubble,
    );

    state.shooter.angle = angle;
    state.projectile = Some(projectile);
    state.advance_shooter();
    state.stats.shots_fired += 1;
    state.push_event(GameEvent::ShotFired { bubble, angle });
    state.phase = GamePhase::Shooting;
}

/// Move the projectile in substeps until it lands or the tick ends
fn advance_projectile(state: &mut GameState, dt: f32) {
    let Some(mut projectile) = state.projectile.take() else {
        log::warn!("Shooting without a projectile, returning to Ready");
        state.phase = GamePhase::Ready;
        return;
    };

    let steps = projectile.substeps(dt);
    let step_dt = dt / steps as f32;
    let right_wall = state.settings.field_width();

    for _ in 0..steps {
        projectile.update(step_dt, 0.0, right_wall);

        let Some(target) = landing_target(state, &projectile) else {
            continue;
        };

        projectile.land();
        state.phase = GamePhase::Resolving;
        match target {
            Some(pos) => resolve_landing(state, pos, projectile.bubble),
            None => game_over(state, GameOverReason::BoardFull),
        }
        return;
    }

    state.projectile = Some(projectile);
}

/// `None` while flying; `Some(None)` when it landed with nowhere to go
fn landing_target(state: &GameState, projectile: &Projectile) -> Option<Option<GridPos>> {
    let grid = &state.grid;
    let pos = projectile.pos;

    if let Some(hit) = grid.check_collision(pos, projectile.radius) {
        let snap = grid.find_snap_position(hit, pos).or_else(|| {
            log::warn!(
                "No free neighbor around ({}, {}), searching outward",
                hit.col,
                hit.row
            );
            grid.find_nearest_empty_position(pos)
        });
        return Some(snap);
    }

    if grid.is_at_ceiling(pos.y, projectile.radius) {
        return Some(grid.find_ceiling_snap(pos));
    }

    None
}

/// Place a landed bubble and resolve everything it sets off
pub fn resolve_landing(state: &mut GameState, target: GridPos, bubble: Bubble) {
    state.phase = GamePhase::Resolving;

    let Some(pos) = place_landed(state, target, bubble) else {
        game_over(state, GameOverReason::BoardFull);
        return;
    };
    state.push_event(GameEvent::Landed {
        bubble: PlacedBubble { pos, bubble },
    });

    let mut points = 0u64;
    let mut popped = 0usize;
    let mut triggers: Vec<(PowerUpKind, GridPos)> =
        bubble.power_up.map(|k| (k, pos)).into_iter().collect();

    // Same-color match
    let matched = find_matches(&state.grid, pos);
    if !matched.is_empty() {
        let cells: Vec<GridPos> = matched.iter().map(|b| b.pos).collect();
        let removed = state.grid.remove_all(&cells);
        triggers.extend(
            removed
                .iter()
                .filter(|b| b.pos != pos)
                .filter_map(|b| b.bubble.power_up.map(|k| (k, b.pos))),
        );

        let combo = state.combo.add_hit();
        state.stats.matches += 1;
        state.stats.max_combo = state.stats.max_combo.max(combo.count);
        state.push_event(GameEvent::ComboChange {
            count: combo.count,
            multiplier: combo.multiplier,
        });

        points += pop_score(removed.len(), combo.multiplier, state.fever.multiplier());
        popped += removed.len();
        state.push_event(GameEvent::Match { bubbles: removed });
    }

    // Power-ups: the landed bubble's own tag plus any tags that were matched
    for (kind, at) in triggers {
        let mut cells = powerup::apply(
            kind,
            &state.grid,
            at,
            &state.settings,
            &mut state.ceiling,
            &mut state.rng,
        );
        // The carrier is spent with its effect
        if state.grid.is_occupied(at) && !cells.contains(&at) {
            cells.push(at);
        }
        let removed = state.grid.remove_all(&cells);

        state.stats.power_ups_triggered += 1;
        points += pop_score(
            removed.len(),
            state.combo.multiplier(),
            state.fever.multiplier(),
        );
        popped += removed.len();
        state.push_event(GameEvent::PowerUp { kind, removed });
    }

    // Single cascade pass over everything the removals detached
    if popped > 0 {
        let orphans: Vec<GridPos> = find_orphans(&state.grid).iter().map(|b| b.pos).collect();
        let dropped = state.grid.remove_all(&orphans);
        if !dropped.is_empty() {
            points += ORPHAN_BONUS * dropped.len() as u64;
            popped += dropped.len();
            state.stats.orphans_dropped += dropped.len() as u32;
            state.push_event(GameEvent::Cascade { bubbles: dropped });
        }
    }

    if popped > 0 {
        state.stats.bubbles_popped += popped as u32;
        if let Some(level) = state.fever.add_pops(popped as u32) {
            log::info!("Fever level {level}");
            state.push_event(GameEvent::FeverChange {
                level,
                multiplier: state.fever.multiplier(),
            });
        }
    }
    add_score(state, points);

    log::debug!(
        "Shot resolved at ({}, {}): {} popped, {} points, {} left",
        pos.col,
        pos.row,
        popped,
        points,
        state.grid.occupied_count()
    );

    if state.grid.is_empty() {
        perfect_clear(state);
        return;
    }

    if state.ceiling.take_descent(state.settings.descent_period) {
        descend(state);
    }

    if crossed_danger_line(state) {
        game_over(state, GameOverReason::DangerLine);
        return;
    }

    state.phase = GamePhase::Ready;
}

/// Put the landed bubble on the board, escalating to the outward search if
/// the chosen cell is unusable
fn place_landed(state: &mut GameState, target: GridPos, bubble: Bubble) -> Option<GridPos> {
    let err = match state.grid.place(target, bubble) {
        Ok(()) => return Some(target),
        Err(err) => err,
    };
    log::warn!("Landing failed: {err}, searching outward");

    let near = state.grid.screen_position(target);
    let fallback = state.grid.find_nearest_empty_position(near)?;
    match state.grid.place(fallback, bubble) {
        Ok(()) => Some(fallback),
        Err(err) => {
            log::warn!("Fallback landing failed: {err}");
            None
        }
    }
}

/// Descent while the player is not shooting
fn idle_descent(state: &mut GameState) {
    if !state.ceiling.take_descent(state.settings.descent_period) {
        return;
    }
    descend(state);
    if crossed_danger_line(state) {
        game_over(state, GameOverReason::DangerLine);
    }
}

/// Insert a new row at the top of the board
fn descend(state: &mut GameState) {
    let colors = state.shot_colors();
    let row = state
        .grid
        .random_row(&colors, state.settings.power_up_chance * 0.5, &mut state.rng);
    let dropped = state.grid.insert_top_row(&row);
    if !dropped.is_empty() {
        log::warn!("Ceiling descent pushed {} bubbles off the board", dropped.len());
    }

    state.stats.rows_descended += 1;
    log::info!("Ceiling descended (offset {})", state.ceiling.row_offset);
    state.push_event(GameEvent::CeilingDescended {
        row_offset: state.ceiling.row_offset,
    });
}

fn crossed_danger_line(state: &GameState) -> bool {
    state
        .grid
        .lowest_occupied_row()
        .is_some_and(|row| row >= state.settings.danger_row)
}

fn add_score(state: &mut GameState, points: u64) {
    if points == 0 {
        return;
    }
    state.stats.score += points;
    state.push_event(GameEvent::Score {
        points,
        total: state.stats.score,
    });
}

/// Board cleared: award the bonus and refill with fewer rows
fn perfect_clear(state: &mut GameState) {
    state.stats.perfect_clears += 1;
    add_score(state, PERFECT_CLEAR_BONUS);
    log::info!(
        "Perfect clear #{} (score {})",
        state.stats.perfect_clears,
        state.stats.score
    );
    state.push_event(GameEvent::Victory {
        stats: state.current_stats(),
    });

    state.phase = GamePhase::Victory;
    state.projectile = None;
    if state.settings.end_on_perfect_clear {
        return;
    }

    let colors = BubbleColor::palette(state.settings.color_count);
    let chance = state.settings.power_up_chance * 0.5;
    state
        .grid
        .fill_random(state.settings.refill_rows, colors, chance, &mut state.rng);
    state.ceiling.descent_timer = 0.0;
    state.victory_timer = state.settings.victory_pause;
}

fn game_over(state: &mut GameState, reason: GameOverReason) {
    state.phase = GamePhase::GameOver;
    state.projectile = None;
    log::info!(
        "Game over ({:?}): score {}, {} shots",
        reason,
        state.stats.score,
        state.stats.shots_fired
    );
    state.push_event(GameEvent::GameOver {
        reason,
        stats: state.current_stats(),
    });
}

/// Demo aim: the lowest bubble matching the loaded color that has room next
/// to it, else the lowest bubble on the board
pub fn auto_aim(state: &GameState) -> f32 {
    let grid = &state.grid;
    let origin = state.settings.shooter_origin();
    let color = state.shooter.current.color;

    let open = |placed: &PlacedBubble| grid.neighbors(placed.pos).any(|n| grid.is_vacant(n));
    let lowest = |a: &PlacedBubble, b: &PlacedBubble| {
        a.pos.row.cmp(&b.pos.row).then_with(|| {
            let da = grid.screen_position(a.pos).distance_squared(origin);
            let db = grid.screen_position(b.pos).distance_squared(origin);
            db.total_cmp(&da)
        })
    };

    let target = grid
        .occupied()
        .filter(|b| b.bubble.color == color && open(b))
        .max_by(lowest)
        .or_else(|| grid.occupied().filter(open).max_by(lowest));

    match target {
        Some(placed) => clamp_aim(angle_between(origin, grid.screen_position(placed.pos))),
        None => 0.0,
    }
}
