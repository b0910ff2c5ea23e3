//! Browser bridge
//!
//! A single game instance lives in a thread-local. The JS host drives it with
//! `game_tick(dt)` once per animation frame, pushes commands as the player
//! acts, and pulls a JSON snapshot plus the drained event queue for drawing
//! and sound.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use crate::sim::PowerUpKind;
use crate::{Runner, Settings};

thread_local! {
    static GAME: RefCell<Option<Runner>> = const { RefCell::new(None) };
}

fn with_runner<R>(f: impl FnOnce(&mut Runner) -> R) -> Option<R> {
    GAME.with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Create the game. An empty or invalid settings string falls back to defaults.
#[wasm_bindgen]
pub fn game_init(seed: f64, settings_json: &str) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let settings = if settings_json.trim().is_empty() {
        Settings::default()
    } else {
        Settings::from_json(settings_json).unwrap_or_else(|e| {
            log::warn!("Invalid settings, using defaults: {e}");
            Settings::default()
        })
    };

    let seed = if seed.is_finite() && seed >= 0.0 {
        seed as u64
    } else {
        (js_sys::Math::random() * u32::MAX as f64) as u64
    };

    GAME.with(|cell| *cell.borrow_mut() = Some(Runner::new(seed, settings)));
    log::info!("Bubble Pop initialized with seed: {seed}");
}

/// Advance by `dt` seconds of wall time; returns simulation ticks run
#[wasm_bindgen]
pub fn game_tick(dt: f32) -> u32 {
    with_runner(|r| r.frame(dt)).unwrap_or(0)
}

#[wasm_bindgen]
pub fn game_aim(angle: f32) {
    with_runner(|r| r.aim(angle));
}

#[wasm_bindgen]
pub fn game_fire(angle: f32, power: f32) {
    with_runner(|r| r.fire(angle, power));
}

#[wasm_bindgen]
pub fn game_swap() {
    with_runner(|r| r.swap());
}

#[wasm_bindgen]
pub fn game_pause() {
    with_runner(|r| r.toggle_pause());
}

/// Hard reset. Pass a seed to start a different board, or nothing to replay.
#[wasm_bindgen]
pub fn game_restart(seed: Option<f64>) {
    let seed = seed.filter(|s| s.is_finite() && *s >= 0.0).map(|s| s as u64);
    with_runner(|r| r.restart(seed));
}

#[wasm_bindgen]
pub fn game_set_idle(idle: bool) {
    with_runner(|r| r.set_idle_mode(idle));
    log::info!("Idle mode: {idle}");
}

/// Load an authored board. Returns false if the layout does not parse.
#[wasm_bindgen]
pub fn game_load_layout(layout: &str) -> bool {
    with_runner(|r| match r.load_layout(layout) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Rejected layout: {e}");
            false
        }
    })
    .unwrap_or(false)
}

/// Debug hook: tag the loaded bubble with a power-up by name
#[wasm_bindgen]
pub fn game_give_power_up(kind: &str) -> bool {
    let Some(kind) = PowerUpKind::from_str(kind) else {
        log::warn!("Unknown power-up kind: {kind}");
        return false;
    };
    with_runner(|r| r.state.shooter.current.power_up = Some(kind)).is_some()
}

/// Screen center `[x, y]` of a cell; empty outside the board
#[wasm_bindgen]
pub fn game_screen_position(col: u32, row: u32) -> Vec<f32> {
    with_runner(|r| r.screen_position(col as usize, row as usize))
        .flatten()
        .map(|p| vec![p.x, p.y])
        .unwrap_or_default()
}

/// JSON snapshot of everything the renderer draws
#[wasm_bindgen]
pub fn game_snapshot() -> String {
    with_runner(|r| serde_json::to_string(&r.snapshot()))
        .and_then(|res| {
            res.map_err(|e| log::error!("Snapshot serialization failed: {e}"))
                .ok()
        })
        .unwrap_or_else(|| "null".to_string())
}

/// JSON array of events since the last call
#[wasm_bindgen]
pub fn game_drain_events() -> String {
    with_runner(|r| serde_json::to_string(&r.drain_events()))
        .and_then(|res| {
            res.map_err(|e| log::error!("Event serialization failed: {e}"))
                .ok()
        })
        .unwrap_or_else(|| "[]".to_string())
}
