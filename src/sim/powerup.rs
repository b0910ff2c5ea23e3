//! Power-up effects
//!
//! Each effect reads the grid and returns the cells it wants removed. The
//! caller performs the removal and runs the orphan pass afterwards, the same
//! as for a regular match.

use rand::Rng;
use rand::seq::IndexedRandom;

use super::grid::{BubbleColor, Grid, GridPos, PowerUpKind};
use super::state::CeilingState;
use crate::Settings;

/// Cells removed by `kind` triggered at `impact`, sorted row-major.
///
/// Freeze removes nothing and suspends the ceiling instead.
pub fn apply<R: Rng + ?Sized>(
    kind: PowerUpKind,
    grid: &Grid,
    impact: GridPos,
    settings: &Settings,
    ceiling: &mut CeilingState,
    rng: &mut R,
) -> Vec<GridPos> {
    let mut removal = match kind {
        PowerUpKind::Bomb => bomb(grid, impact, settings.bomb_radius),
        PowerUpKind::Rainbow => rainbow(grid),
        PowerUpKind::Lightning => lightning(grid, impact.row),
        PowerUpKind::Freeze => {
            ceiling.freeze(settings.freeze_duration);
            Vec::new()
        }
        PowerUpKind::Star => star(grid, settings.star_min, settings.star_max, rng),
    };
    removal.sort_by_key(|pos| (pos.row, pos.col));
    log::debug!(
        "Power-up {} at ({}, {}) removes {} bubbles",
        kind.as_str(),
        impact.col,
        impact.row,
        removal.len()
    );
    removal
}

/// Occupied cells within `radius` hex steps of `center`
pub fn bomb(grid: &Grid, center: GridPos, radius: u32) -> Vec<GridPos> {
    grid.occupied()
        .map(|placed| placed.pos)
        .filter(|&pos| grid.hex_distance(center, pos) <= radius)
        .collect()
}

/// Most common color on the board; ties go to the earlier palette color
pub fn dominant_color(grid: &Grid) -> Option<BubbleColor> {
    let counts = grid.color_counts();
    BubbleColor::ALL
        .into_iter()
        .filter(|c| counts[c.index()] > 0)
        .max_by(|a, b| counts[a.index()].cmp(&counts[b.index()]).then(b.cmp(a)))
}

/// Every bubble of the dominant color
pub fn rainbow(grid: &Grid) -> Vec<GridPos> {
    let Some(color) = dominant_color(grid) else {
        return Vec::new();
    };
    grid.occupied()
        .filter(|placed| placed.bubble.color == color)
        .map(|placed| placed.pos)
        .collect()
}

/// Every bubble in `row`
pub fn lightning(grid: &Grid, row: usize) -> Vec<GridPos> {
    (0..grid.columns_for_row(row))
        .map(|col| GridPos::new(col, row))
        .filter(|&pos| grid.is_occupied(pos))
        .collect()
}

/// Between `min` and `max` random occupied cells, clamped to what exists
pub fn star<R: Rng + ?Sized>(grid: &Grid, min: usize, max: usize, rng: &mut R) -> Vec<GridPos> {
    let occupied: Vec<GridPos> = grid.occupied().map(|placed| placed.pos).collect();
    let wanted = rng.random_range(min..=max.max(min));
    occupied
        .choose_multiple(rng, wanted.min(occupied.len()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::Bubble;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn full_grid() -> Grid {
        let mut g = Grid::from_settings(&Settings::default());
        let positions: Vec<_> = g.positions().collect();
        for (i, pos) in positions.into_iter().enumerate() {
            let color = BubbleColor::ALL[i % 3];
            g.place(pos, Bubble::plain(color)).unwrap();
        }
        g
    }

    fn run(kind: PowerUpKind, grid: &Grid, impact: GridPos) -> (Vec<GridPos>, CeilingState) {
        let mut ceiling = CeilingState::default();
        let mut rng = Pcg32::seed_from_u64(11);
        let removed = apply(kind, grid, impact, &Settings::default(), &mut ceiling, &mut rng);
        (removed, ceiling)
    }

    #[test]
    fn test_bomb_radius_two() {
        let g = full_grid();
        let center = GridPos::new(5, 6);
        let (removed, _) = run(PowerUpKind::Bomb, &g, center);

        // 1 + 6 + 12 cells within two hex steps of an interior cell
        assert_eq!(removed.len(), 19);
        for pos in g.positions() {
            let within = g.hex_distance(center, pos) <= 2;
            assert_eq!(removed.contains(&pos), within, "{pos:?}");
        }
    }

    #[test]
    fn test_bomb_skips_empty_cells() {
        let g = Grid::from_layout(&Settings::default(), "R . G\n. B").unwrap();
        let (removed, _) = run(PowerUpKind::Bomb, &g, GridPos::new(0, 0));
        assert_eq!(removed, vec![GridPos::new(0, 0), GridPos::new(2, 0), GridPos::new(1, 1)]);
    }

    #[test]
    fn test_rainbow_takes_dominant_color() {
        let g = Grid::from_layout(&Settings::default(), "R G G B\nG R").unwrap();
        assert_eq!(dominant_color(&g), Some(BubbleColor::Green));
        let (removed, _) = run(PowerUpKind::Rainbow, &g, GridPos::new(0, 0));
        assert_eq!(
            removed,
            vec![GridPos::new(1, 0), GridPos::new(2, 0), GridPos::new(0, 1)]
        );
    }

    #[test]
    fn test_rainbow_tie_prefers_palette_order() {
        let g = Grid::from_layout(&Settings::default(), "B R").unwrap();
        assert_eq!(dominant_color(&g), Some(BubbleColor::Red));
    }

    #[test]
    fn test_rainbow_on_empty_grid_is_noop() {
        let g = Grid::from_settings(&Settings::default());
        let (removed, _) = run(PowerUpKind::Rainbow, &g, GridPos::new(0, 0));
        assert!(removed.is_empty());
    }

    #[test]
    fn test_lightning_clears_row() {
        let g = Grid::from_layout(&Settings::default(), "R G\nB . Y\nP").unwrap();
        let (removed, _) = run(PowerUpKind::Lightning, &g, GridPos::new(0, 1));
        assert_eq!(removed, vec![GridPos::new(0, 1), GridPos::new(2, 1)]);
    }

    #[test]
    fn test_freeze_sets_timer() {
        let g = full_grid();
        let (removed, ceiling) = run(PowerUpKind::Freeze, &g, GridPos::new(0, 0));
        assert!(removed.is_empty());
        assert_eq!(ceiling.freeze_timer, Settings::default().freeze_duration);
    }

    #[test]
    fn test_star_count_in_range() {
        let g = full_grid();
        let (removed, _) = run(PowerUpKind::Star, &g, GridPos::new(0, 0));
        assert!((3..=5).contains(&removed.len()));
        assert!(removed.iter().all(|&pos| g.is_occupied(pos)));
        let mut unique = removed.clone();
        unique.dedup();
        assert_eq!(unique.len(), removed.len());
    }

    #[test]
    fn test_star_clamps_to_available() {
        let g = Grid::from_layout(&Settings::default(), "R G").unwrap();
        let (removed, _) = run(PowerUpKind::Star, &g, GridPos::new(0, 0));
        assert_eq!(removed, vec![GridPos::new(0, 0), GridPos::new(1, 0)]);
    }

    #[test]
    fn test_star_is_seeded() {
        let g = full_grid();
        let (a, _) = run(PowerUpKind::Star, &g, GridPos::new(0, 0));
        let (b, _) = run(PowerUpKind::Star, &g, GridPos::new(0, 0));
        assert_eq!(a, b);
    }
}
