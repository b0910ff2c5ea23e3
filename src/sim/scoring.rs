//! Score multipliers
//!
//! Two independent state machines feed the score:
//! - `ComboSystem`: short streak of consecutive matches, decays when idle
//! - `FeverSystem`: session-long tier driven by total bubbles popped

use serde::{Deserialize, Serialize};

/// Points per bubble popped by a match or power-up (before multipliers)
pub const POP_SCORE: u64 = 10;
/// Flat points per orphaned bubble
pub const ORPHAN_BONUS: u64 = 20;
/// Points for clearing the whole board
pub const PERFECT_CLEAR_BONUS: u64 = 1000;

/// Total pops needed to reach each fever level
pub const FEVER_THRESHOLDS: [u32; 6] = [0, 10, 25, 50, 100, 200];
/// Score multiplier for each fever level
pub const FEVER_MULTIPLIERS: [f32; 6] = [1.0, 1.25, 1.5, 2.0, 2.5, 3.0];
pub const MAX_FEVER_LEVEL: u8 = (FEVER_THRESHOLDS.len() - 1) as u8;

/// Combo multiplier for a streak length
pub fn combo_multiplier(count: u32) -> f32 {
    match count {
        0..=1 => 1.0,
        2..=3 => 1.5,
        4..=6 => 2.0,
        7..=10 => 3.0,
        _ => 5.0,
    }
}

/// Snapshot of the combo after a change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboUpdate {
    pub count: u32,
    pub multiplier: f32,
}

/// Streak counter reset by inactivity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboSystem {
    pub count: u32,
    /// Seconds left before the streak resets
    pub timer: f32,
    /// Length of the decay window
    pub window: f32,
}

impl ComboSystem {
    pub fn new(window: f32) -> Self {
        Self {
            count: 0,
            timer: 0.0,
            window,
        }
    }

    /// Register a pop event
    pub fn add_hit(&mut self) -> ComboUpdate {
        self.count += 1;
        self.timer = self.window;
        self.current()
    }

    /// Advance the decay timer. Returns the reset state when the streak expires.
    pub fn update(&mut self, dt: f32) -> Option<ComboUpdate> {
        if self.count == 0 {
            return None;
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        self.timer = 0.0;
        self.count = 0;
        Some(self.current())
    }

    pub fn multiplier(&self) -> f32 {
        combo_multiplier(self.count)
    }

    pub fn current(&self) -> ComboUpdate {
        ComboUpdate {
            count: self.count,
            multiplier: self.multiplier(),
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.timer = 0.0;
    }
}

/// Fever level for a cumulative pop count
pub fn fever_level(total_pops: u32) -> u8 {
    FEVER_THRESHOLDS
        .iter()
        .rposition(|&threshold| total_pops >= threshold)
        .unwrap_or(0) as u8
}

/// Session-cumulative multiplier tier. Never decreases until `reset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeverSystem {
    pub total_pops: u32,
    pub level: u8,
}

impl FeverSystem {
    /// Add popped bubbles. Returns the new level if it went up.
    pub fn add_pops(&mut self, pops: u32) -> Option<u8> {
        self.total_pops = self.total_pops.saturating_add(pops);
        let level = fever_level(self.total_pops);
        if level > self.level {
            self.level = level;
            Some(level)
        } else {
            None
        }
    }

    pub fn multiplier(&self) -> f32 {
        FEVER_MULTIPLIERS[self.level as usize]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Points for `pops` bubbles under the given multipliers
pub fn pop_score(pops: usize, combo: f32, fever: f32) -> u64 {
    (pops as f32 * POP_SCORE as f32 * combo * fever).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_combo_multiplier_breakpoints() {
        assert_eq!(combo_multiplier(0), 1.0);
        assert_eq!(combo_multiplier(1), 1.0);
        assert_eq!(combo_multiplier(2), 1.5);
        assert_eq!(combo_multiplier(3), 1.5);
        assert_eq!(combo_multiplier(4), 2.0);
        assert_eq!(combo_multiplier(6), 2.0);
        assert_eq!(combo_multiplier(7), 3.0);
        assert_eq!(combo_multiplier(10), 3.0);
        assert_eq!(combo_multiplier(11), 5.0);
    }

    #[test]
    fn test_combo_add_hit_resets_timer() {
        let mut combo = ComboSystem::new(3.0);
        let update = combo.add_hit();
        assert_eq!(update, ComboUpdate { count: 1, multiplier: 1.0 });

        assert_eq!(combo.update(2.0), None);
        let update = combo.add_hit();
        assert_eq!(update.count, 2);
        assert_eq!(update.multiplier, 1.5);
        assert_eq!(combo.timer, 3.0);
    }

    #[test]
    fn test_combo_expires() {
        let mut combo = ComboSystem::new(3.0);
        for _ in 0..5 {
            combo.add_hit();
        }
        assert_eq!(combo.update(2.9), None);
        let reset = combo.update(0.2).unwrap();
        assert_eq!(reset, ComboUpdate { count: 0, multiplier: 1.0 });
        // Idle combo stays quiet
        assert_eq!(combo.update(10.0), None);
    }

    #[test]
    fn test_fever_levels() {
        assert_eq!(fever_level(0), 0);
        assert_eq!(fever_level(9), 0);
        assert_eq!(fever_level(10), 1);
        assert_eq!(fever_level(199), 4);
        assert_eq!(fever_level(200), MAX_FEVER_LEVEL);
        assert_eq!(fever_level(u32::MAX), MAX_FEVER_LEVEL);
    }

    #[test]
    fn test_fever_reports_level_ups_only() {
        let mut fever = FeverSystem::default();
        assert_eq!(fever.add_pops(4), None);
        assert_eq!(fever.add_pops(6), Some(1));
        assert_eq!(fever.add_pops(3), None);
        assert_eq!(fever.add_pops(100), Some(4));
        assert_eq!(fever.multiplier(), 2.5);
        fever.reset();
        assert_eq!(fever.level, 0);
        assert_eq!(fever.total_pops, 0);
    }

    #[test]
    fn test_pop_score() {
        assert_eq!(pop_score(4, 1.0, 1.0), 40);
        assert_eq!(pop_score(3, 1.5, 1.25), 56);
    }

    proptest! {
        #[test]
        fn prop_fever_never_decreases(pops in proptest::collection::vec(0u32..40, 1..50)) {
            let mut fever = FeverSystem::default();
            let mut last = 0;
            for p in pops {
                fever.add_pops(p);
                prop_assert!(fever.level >= last);
                prop_assert_eq!(fever.level, fever_level(fever.total_pops));
                last = fever.level;
            }
        }
    }
}
