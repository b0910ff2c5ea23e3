//! Hex bubble grid
//!
//! The board is a flat arena of optional bubbles addressed by `(col, row)`.
//! Rows alternate between full rows (`cols` cells) and short rows (`cols - 1`
//! cells, shifted right by half a cell). Short rows keep their last arena slot
//! permanently empty so the stride is constant.
//!
//! Which rows are short is tracked by `parity`, flipped every time a row is
//! inserted at the top, so existing bubbles keep their shape when the whole
//! board shifts down.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collision::circles_overlap;
use crate::Settings;
use crate::consts::{HEX_ROW_SPACING, PALETTE_SIZE};

/// Bubble palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BubbleColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl BubbleColor {
    pub const ALL: [Self; PALETTE_SIZE] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    /// Position in the palette
    pub fn index(self) -> usize {
        self as usize
    }

    /// The first `count` palette colors (clamped to the palette size)
    pub fn palette(count: usize) -> &'static [Self] {
        &Self::ALL[..count.clamp(1, PALETTE_SIZE)]
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Orange => 'O',
            Self::Yellow => 'Y',
            Self::Green => 'G',
            Self::Blue => 'B',
            Self::Purple => 'P',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.as_char() == c)
    }
}

/// Special effect carried by a bubble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    Bomb,
    Rainbow,
    Lightning,
    Freeze,
    Star,
}

impl PowerUpKind {
    pub const ALL: [Self; 5] = [
        Self::Bomb,
        Self::Rainbow,
        Self::Lightning,
        Self::Freeze,
        Self::Star,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bomb => "bomb",
            Self::Rainbow => "rainbow",
            Self::Lightning => "lightning",
            Self::Freeze => "freeze",
            Self::Star => "star",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    /// Layout suffix character
    pub fn as_char(&self) -> char {
        match self {
            Self::Bomb => 'b',
            Self::Rainbow => 'r',
            Self::Lightning => 'l',
            Self::Freeze => 'f',
            Self::Star => 's',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_char() == c)
    }
}

/// Contents of an occupied cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub color: BubbleColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_up: Option<PowerUpKind>,
}

impl Bubble {
    pub fn plain(color: BubbleColor) -> Self {
        Self {
            color,
            power_up: None,
        }
    }

    pub fn with_power_up(color: BubbleColor, kind: PowerUpKind) -> Self {
        Self {
            color,
            power_up: Some(kind),
        }
    }
}

/// Grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub col: usize,
    pub row: usize,
}

impl GridPos {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// A bubble together with the cell it occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedBubble {
    pub pos: GridPos,
    pub bubble: Bubble,
}

/// Grid mutation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({col}, {row}) is outside the grid")]
    OutOfBounds { col: usize, row: usize },
    #[error("cell ({col}, {row}) is already occupied")]
    Occupied { col: usize, row: usize },
    #[error("invalid layout token {token:?} on line {line}")]
    InvalidLayout { line: usize, token: String },
}

/// Read-only view of the board for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSnapshot {
    /// Row-major cells; short rows have one fewer entry
    pub cells: Vec<Vec<Option<Bubble>>>,
    /// True when row 0 is a short row
    pub top_row_short: bool,
}

/// The bubble lattice
#[derive(Debug, Clone)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cell_size: f32,
    top_offset: f32,
    /// 1 when row 0 is a short row
    parity: usize,
    cells: Vec<Option<Bubble>>,
}

impl Grid {
    pub fn new(cols: usize, rows: usize, cell_size: f32, top_offset: f32) -> Self {
        Self {
            cols,
            rows,
            cell_size,
            top_offset,
            parity: 0,
            cells: vec![None; cols * rows],
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.cols,
            settings.rows,
            settings.cell_size,
            settings.top_offset,
        )
    }

    /// Build a grid from a text layout, one line per row starting at the top.
    ///
    /// Tokens are whitespace separated: `.` for an empty cell, a color letter
    /// (`R O Y G B P`) optionally followed by a power-up letter
    /// (`b`omb, `r`ainbow, `l`ightning, `f`reeze, `s`tar).
    pub fn from_layout(settings: &Settings, layout: &str) -> Result<Self, GridError> {
        let mut grid = Self::from_settings(settings);
        let lines = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        for (row, line) in lines.enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if row >= grid.rows || tokens.len() > grid.columns_for_row(row) {
                return Err(GridError::InvalidLayout {
                    line: row,
                    token: line.to_string(),
                });
            }
            for (col, token) in tokens.into_iter().enumerate() {
                if let Some(bubble) = parse_token(row, token)? {
                    grid.place(GridPos::new(col, row), bubble)?;
                }
            }
        }

        Ok(grid)
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell_radius(&self) -> f32 {
        self.cell_size / 2.0
    }

    #[inline]
    pub fn row_height(&self) -> f32 {
        self.cell_size * HEX_ROW_SPACING
    }

    /// Whether `row` is offset by half a cell (and one cell shorter)
    #[inline]
    pub fn is_short_row(&self, row: usize) -> bool {
        (row + self.parity) % 2 == 1
    }

    /// Number of cells in `row`
    #[inline]
    pub fn columns_for_row(&self, row: usize) -> usize {
        if self.is_short_row(row) {
            self.cols - 1
        } else {
            self.cols
        }
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.row < self.rows && pos.col < self.columns_for_row(pos.row)
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos).then(|| pos.row * self.cols + pos.col)
    }

    pub fn get(&self, pos: GridPos) -> Option<&Bubble> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.get(pos).is_some()
    }

    /// In bounds and free
    pub fn is_vacant(&self, pos: GridPos) -> bool {
        self.index(pos).is_some_and(|i| self.cells[i].is_none())
    }

    /// Put a bubble into an empty cell
    pub fn place(&mut self, pos: GridPos, bubble: Bubble) -> Result<(), GridError> {
        let i = self.index(pos).ok_or(GridError::OutOfBounds {
            col: pos.col,
            row: pos.row,
        })?;
        if self.cells[i].is_some() {
            return Err(GridError::Occupied {
                col: pos.col,
                row: pos.row,
            });
        }
        self.cells[i] = Some(bubble);
        Ok(())
    }

    /// Take the bubble out of a cell
    pub fn remove(&mut self, pos: GridPos) -> Option<Bubble> {
        let i = self.index(pos)?;
        self.cells[i].take()
    }

    /// Remove every listed cell that is still occupied
    pub fn remove_all(&mut self, positions: &[GridPos]) -> Vec<PlacedBubble> {
        positions
            .iter()
            .filter_map(|&pos| self.remove(pos).map(|bubble| PlacedBubble { pos, bubble }))
            .collect()
    }

    /// Empty the board and reset row parity
    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.parity = 0;
    }

    /// All addressable cells, row-major
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns_for_row(row)).map(move |col| GridPos::new(col, row))
        })
    }

    /// Occupied cells, row-major
    pub fn occupied(&self) -> impl Iterator<Item = PlacedBubble> + '_ {
        self.positions()
            .filter_map(|pos| self.get(pos).map(|&bubble| PlacedBubble { pos, bubble }))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.positions().all(|pos| self.is_occupied(pos))
    }

    /// Lowest (largest index) row holding a bubble
    pub fn lowest_occupied_row(&self) -> Option<usize> {
        (0..self.rows).rev().find(|&row| {
            (0..self.columns_for_row(row)).any(|col| self.is_occupied(GridPos::new(col, row)))
        })
    }

    /// Bubble count per palette color
    pub fn color_counts(&self) -> [usize; PALETTE_SIZE] {
        let mut counts = [0; PALETTE_SIZE];
        for bubble in self.cells.iter().flatten() {
            counts[bubble.color.index()] += 1;
        }
        counts
    }

    /// Colors with at least one bubble on the board, in palette order
    pub fn colors_present(&self) -> Vec<BubbleColor> {
        let counts = self.color_counts();
        BubbleColor::ALL
            .into_iter()
            .filter(|c| counts[c.index()] > 0)
            .collect()
    }

    /// In-bounds hex neighbors of `pos`
    pub fn neighbors(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        // Column deltas into the rows above and below
        let (lo, hi) = if self.is_short_row(pos.row) { (0, 1) } else { (-1, 0) };
        let deltas: [(isize, isize); 6] = [
            (-1, 0),
            (1, 0),
            (lo, -1),
            (hi, -1),
            (lo, 1),
            (hi, 1),
        ];
        deltas.into_iter().filter_map(move |(dc, dr)| {
            let col = pos.col.checked_add_signed(dc)?;
            let row = pos.row.checked_add_signed(dr)?;
            let n = GridPos::new(col, row);
            self.in_bounds(n).then_some(n)
        })
    }

    /// Number of steps between two cells on the hex lattice
    pub fn hex_distance(&self, a: GridPos, b: GridPos) -> u32 {
        let (aq, ar) = self.axial(a);
        let (bq, br) = self.axial(b);
        let dq = aq - bq;
        let dr = ar - br;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    /// Offset coordinates (short rows shoved right) to axial
    fn axial(&self, pos: GridPos) -> (i64, i64) {
        let r = (pos.row + self.parity) as i64;
        let q = pos.col as i64 - (r - (r & 1)) / 2;
        (q, r)
    }

    /// Center of a cell in screen space
    pub fn screen_position(&self, pos: GridPos) -> Vec2 {
        let radius = self.cell_radius();
        let shift = if self.is_short_row(pos.row) { radius } else { 0.0 };
        Vec2::new(
            pos.col as f32 * self.cell_size + radius + shift,
            self.top_offset + radius + pos.row as f32 * self.row_height(),
        )
    }

    /// Cell whose center is closest to `point`, clamped to the board
    pub fn nearest_cell(&self, point: Vec2) -> GridPos {
        let radius = self.cell_radius();
        let row_f = ((point.y - self.top_offset - radius) / self.row_height()).round();
        let row = (row_f.max(0.0) as usize).min(self.rows.saturating_sub(1));
        let shift = if self.is_short_row(row) { radius } else { 0.0 };
        let col_f = ((point.x - radius - shift) / self.cell_size).round();
        let col = (col_f.max(0.0) as usize).min(self.columns_for_row(row).saturating_sub(1));
        GridPos::new(col, row)
    }

    /// Occupied cell touched by a circle at `point`, nearest first
    pub fn check_collision(&self, point: Vec2, radius: f32) -> Option<GridPos> {
        self.occupied()
            .map(|placed| (placed.pos, self.screen_position(placed.pos)))
            .filter(|&(_, center)| circles_overlap(point, radius, center, self.cell_radius()))
            .min_by(|a, b| {
                a.1.distance_squared(point)
                    .total_cmp(&b.1.distance_squared(point))
            })
            .map(|(pos, _)| pos)
    }

    /// Empty neighbor of `hit` closest to the incoming bubble at `from`
    pub fn find_snap_position(&self, hit: GridPos, from: Vec2) -> Option<GridPos> {
        self.neighbors(hit)
            .filter(|&n| self.is_vacant(n))
            .min_by(|&a, &b| {
                let da = self.screen_position(a).distance_squared(from);
                let db = self.screen_position(b).distance_squared(from);
                da.total_cmp(&db)
            })
    }

    /// Fallback snap: search outward from `point` for an empty cell.
    ///
    /// Cells attached to the ceiling or to another bubble are preferred; any
    /// empty cell is accepted if none is attached. Returns `None` only when
    /// the grid has no empty cell at all.
    pub fn find_nearest_empty_position(&self, point: Vec2) -> Option<GridPos> {
        let center = self.nearest_cell(point);
        let max_ring = self.rows.max(self.cols);
        let attached = |pos: GridPos| {
            self.is_vacant(pos)
                && (pos.row == 0 || self.neighbors(pos).any(|n| self.is_occupied(n)))
        };

        for ring in 0..=max_ring {
            if !self.ring(center, ring).any(|pos| attached(pos)) {
                continue;
            }
            // Hex skew means the next ring can hold a closer cell
            return self
                .ring(center, ring)
                .chain(self.ring(center, ring + 1))
                .filter(|&pos| attached(pos))
                .min_by(|&a, &b| self.closer(a, b, point));
        }

        self.positions()
            .filter(|&pos| self.is_vacant(pos))
            .min_by(|&a, &b| self.closer(a, b, point))
    }

    /// Empty top-row cell nearest to `point`, for shots reaching the ceiling
    pub fn find_ceiling_snap(&self, point: Vec2) -> Option<GridPos> {
        (0..self.columns_for_row(0))
            .map(|col| GridPos::new(col, 0))
            .filter(|&pos| self.is_vacant(pos))
            .min_by(|&a, &b| self.closer(a, b, point))
            .or_else(|| self.find_nearest_empty_position(point))
    }

    /// Leading edge of a bubble at `y` has reached the ceiling
    #[inline]
    pub fn is_at_ceiling(&self, y: f32, radius: f32) -> bool {
        y - radius <= self.top_offset
    }

    /// Cells at Chebyshev distance `ring` (in offset space) around `center`
    fn ring(&self, center: GridPos, ring: usize) -> impl Iterator<Item = GridPos> + '_ {
        let r = ring as isize;
        (-r..=r).flat_map(move |dr| {
            (-r..=r).filter_map(move |dc| {
                if dr.abs() != r && dc.abs() != r {
                    return None;
                }
                let pos = GridPos::new(
                    center.col.checked_add_signed(dc)?,
                    center.row.checked_add_signed(dr)?,
                );
                self.in_bounds(pos).then_some(pos)
            })
        })
    }

    fn closer(&self, a: GridPos, b: GridPos, point: Vec2) -> std::cmp::Ordering {
        let da = self.screen_position(a).distance_squared(point);
        let db = self.screen_position(b).distance_squared(point);
        da.total_cmp(&db)
    }

    /// Shift the whole board down one row and fill the new top row.
    ///
    /// `bubbles` supplies the new row left to right (extra entries are
    /// ignored). Returns the bubbles pushed off the bottom row.
    pub fn insert_top_row(&mut self, bubbles: &[Bubble]) -> Vec<PlacedBubble> {
        let last = self.rows - 1;
        let dropped: Vec<PlacedBubble> = (0..self.columns_for_row(last))
            .filter_map(|col| {
                let pos = GridPos::new(col, last);
                self.get(pos).map(|&bubble| PlacedBubble { pos, bubble })
            })
            .collect();

        self.cells.rotate_right(self.cols);
        self.cells[..self.cols].fill(None);
        self.parity ^= 1;

        for (col, &bubble) in bubbles.iter().take(self.columns_for_row(0)).enumerate() {
            self.cells[col] = Some(bubble);
        }
        dropped
    }

    /// Clear the board and fill the top `row_count` rows with random bubbles
    pub fn fill_random<R: Rng + ?Sized>(
        &mut self,
        row_count: usize,
        colors: &[BubbleColor],
        power_up_chance: f32,
        rng: &mut R,
    ) {
        self.clear();
        for row in 0..row_count.min(self.rows) {
            for col in 0..self.columns_for_row(row) {
                let bubble = random_bubble(colors, power_up_chance, rng);
                self.cells[row * self.cols + col] = Some(bubble);
            }
        }
    }

    /// Generate a row of bubbles sized for a new top row
    pub fn random_row<R: Rng + ?Sized>(
        &self,
        colors: &[BubbleColor],
        power_up_chance: f32,
        rng: &mut R,
    ) -> Vec<Bubble> {
        (0..self.cols)
            .map(|_| random_bubble(colors, power_up_chance, rng))
            .collect()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        let cells = (0..self.rows)
            .map(|row| {
                (0..self.columns_for_row(row))
                    .map(|col| self.get(GridPos::new(col, row)).copied())
                    .collect()
            })
            .collect();
        GridSnapshot {
            cells,
            top_row_short: self.is_short_row(0),
        }
    }
}

/// Random bubble from `colors`, tagged with a power-up at `power_up_chance`
pub fn random_bubble<R: Rng + ?Sized>(
    colors: &[BubbleColor],
    power_up_chance: f32,
    rng: &mut R,
) -> Bubble {
    let color = colors.choose(rng).copied().unwrap_or(BubbleColor::Red);
    let power_up = (rng.random::<f32>() < power_up_chance)
        .then(|| PowerUpKind::ALL.choose(rng).copied())
        .flatten();
    Bubble { color, power_up }
}

fn parse_token(line: usize, token: &str) -> Result<Option<Bubble>, GridError> {
    if token == "." {
        return Ok(None);
    }
    let invalid = || GridError::InvalidLayout {
        line,
        token: token.to_string(),
    };

    let mut chars = token.chars();
    let color = chars.next().and_then(BubbleColor::from_char).ok_or_else(invalid)?;
    let power_up = match chars.next() {
        None => None,
        Some(c) => {
            let kind = PowerUpKind::from_char(c);
            if kind.is_none() {
                log::warn!("Unknown power-up tag {c:?} in layout token {token:?}, treating as plain");
            }
            kind
        }
    };
    if chars.next().is_some() {
        return Err(invalid());
    }
    Ok(Some(Bubble { color, power_up }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn grid(layout: &str) -> Grid {
        Grid::from_layout(&Settings::default(), layout).unwrap()
    }

    #[test]
    fn test_columns_alternate() {
        let g = Grid::from_settings(&Settings::default());
        assert_eq!(g.columns_for_row(0), 11);
        assert_eq!(g.columns_for_row(1), 10);
        assert_eq!(g.columns_for_row(2), 11);
    }

    #[test]
    fn test_screen_position_offsets_short_rows() {
        let g = Grid::from_settings(&Settings::default());
        let a = g.screen_position(GridPos::new(0, 0));
        let b = g.screen_position(GridPos::new(0, 1));
        assert_eq!(a, Vec2::new(20.0, 40.0));
        assert!((b.x - a.x - 20.0).abs() < 1e-4);
        assert!((b.y - a.y - 40.0 * HEX_ROW_SPACING).abs() < 1e-4);
    }

    #[test]
    fn test_neighbors_full_and_short_rows() {
        let g = Grid::from_settings(&Settings::default());
        let mut n: Vec<_> = g.neighbors(GridPos::new(3, 2)).collect();
        n.sort();
        let mut expected = vec![
            GridPos::new(2, 1),
            GridPos::new(3, 1),
            GridPos::new(2, 2),
            GridPos::new(4, 2),
            GridPos::new(2, 3),
            GridPos::new(3, 3),
        ];
        expected.sort();
        assert_eq!(n, expected);

        let mut n: Vec<_> = g.neighbors(GridPos::new(3, 1)).collect();
        n.sort();
        let mut expected = vec![
            GridPos::new(3, 0),
            GridPos::new(4, 0),
            GridPos::new(2, 1),
            GridPos::new(4, 1),
            GridPos::new(3, 2),
            GridPos::new(4, 2),
        ];
        expected.sort();
        assert_eq!(n, expected);

        // Corner cell has only in-bounds neighbors
        assert_eq!(g.neighbors(GridPos::new(0, 0)).count(), 2);
    }

    #[test]
    fn test_neighbors_are_one_step_and_touching() {
        let g = Grid::from_settings(&Settings::default());
        for pos in g.positions() {
            for n in g.neighbors(pos) {
                assert_eq!(g.hex_distance(pos, n), 1);
                let d = g.screen_position(pos).distance(g.screen_position(n));
                assert!(d < g.cell_size() * 1.01, "{pos:?} -> {n:?} at {d}");
            }
        }
    }

    #[test]
    fn test_place_and_remove() {
        let mut g = Grid::from_settings(&Settings::default());
        let pos = GridPos::new(2, 0);
        g.place(pos, Bubble::plain(BubbleColor::Blue)).unwrap();
        assert_eq!(
            g.place(pos, Bubble::plain(BubbleColor::Red)),
            Err(GridError::Occupied { col: 2, row: 0 })
        );
        assert_eq!(
            g.place(GridPos::new(10, 1), Bubble::plain(BubbleColor::Red)),
            Err(GridError::OutOfBounds { col: 10, row: 1 })
        );
        assert_eq!(g.remove(pos), Some(Bubble::plain(BubbleColor::Blue)));
        assert_eq!(g.remove(pos), None);
        assert!(g.is_empty());
    }

    #[test]
    fn test_layout_parsing() {
        let g = grid(
            "
            R Gb .
            Bx
            ",
        );
        assert_eq!(g.occupied_count(), 3);
        assert_eq!(
            g.get(GridPos::new(1, 0)),
            Some(&Bubble::with_power_up(BubbleColor::Green, PowerUpKind::Bomb))
        );
        // Unknown power-up tags degrade to plain bubbles
        assert_eq!(g.get(GridPos::new(0, 1)), Some(&Bubble::plain(BubbleColor::Blue)));

        let err = Grid::from_layout(&Settings::default(), "R Q").unwrap_err();
        assert!(matches!(err, GridError::InvalidLayout { line: 0, .. }));
    }

    #[test]
    fn test_check_collision_prefers_nearest() {
        let g = grid("R G");
        let a = g.screen_position(GridPos::new(0, 0));
        let b = g.screen_position(GridPos::new(1, 0));
        // Slightly right of the midpoint, within reach of both
        let probe = Vec2::new((a.x + b.x) / 2.0 + 2.0, a.y + 10.0);
        assert_eq!(g.check_collision(probe, 20.0), Some(GridPos::new(1, 0)));
        assert_eq!(g.check_collision(Vec2::new(300.0, 400.0), 20.0), None);
    }

    #[test]
    fn test_snap_picks_nearest_empty_neighbor() {
        let g = grid("R R R");
        let hit = GridPos::new(1, 0);
        let below_right = g.screen_position(GridPos::new(1, 1)) + Vec2::new(2.0, 5.0);
        assert_eq!(g.find_snap_position(hit, below_right), Some(GridPos::new(1, 1)));
        let below_left = g.screen_position(GridPos::new(0, 1)) + Vec2::new(-2.0, 5.0);
        assert_eq!(g.find_snap_position(hit, below_left), Some(GridPos::new(0, 1)));
    }

    #[test]
    fn test_snap_none_when_surrounded() {
        let g = grid(
            "
            R R R
            R R
            ",
        );
        assert_eq!(g.find_snap_position(GridPos::new(1, 0), Vec2::new(60.0, 80.0)), None);
    }

    #[test]
    fn test_nearest_empty_prefers_attached_cells() {
        let g = grid("R R R");
        let far = Vec2::new(400.0, 300.0);
        let pos = g.find_nearest_empty_position(far).unwrap();
        assert!(g.is_vacant(pos));
        assert!(pos.row == 0 || g.neighbors(pos).any(|n| g.is_occupied(n)));
    }

    #[test]
    fn test_nearest_empty_none_when_full() {
        let settings = Settings {
            cols: 3,
            rows: 2,
            danger_row: 1,
            initial_rows: 1,
            refill_rows: 1,
            ..Settings::default()
        };
        let g = Grid::from_layout(&settings, "R R R\nR R").unwrap();
        assert!(g.is_full());
        assert_eq!(g.find_nearest_empty_position(Vec2::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_ceiling_snap() {
        let g = grid("R . . G");
        assert!(g.is_at_ceiling(g.cell_radius() + 20.0, g.cell_radius()));
        assert!(!g.is_at_ceiling(200.0, g.cell_radius()));
        let above_col2 = g.screen_position(GridPos::new(2, 0));
        assert_eq!(g.find_ceiling_snap(above_col2), Some(GridPos::new(2, 0)));
    }

    #[test]
    fn test_insert_top_row_shifts_and_keeps_shape() {
        let mut g = grid(
            "
            R G
            B
            ",
        );
        let before_short: Vec<bool> = (0..g.rows()).map(|r| g.is_short_row(r)).collect();
        let row = vec![Bubble::plain(BubbleColor::Yellow); g.cols()];
        let dropped = g.insert_top_row(&row);
        assert!(dropped.is_empty());

        // Old rows moved down one and kept their shape
        for r in 0..g.rows() - 1 {
            assert_eq!(g.is_short_row(r + 1), before_short[r]);
        }
        assert_eq!(g.get(GridPos::new(0, 1)), Some(&Bubble::plain(BubbleColor::Red)));
        assert_eq!(g.get(GridPos::new(1, 1)), Some(&Bubble::plain(BubbleColor::Green)));
        assert_eq!(g.get(GridPos::new(0, 2)), Some(&Bubble::plain(BubbleColor::Blue)));
        // New top row is short now and filled
        assert!(g.is_short_row(0));
        assert_eq!(g.occupied_count(), 3 + g.columns_for_row(0));
    }

    #[test]
    fn test_fill_random_is_seeded() {
        let settings = Settings::default();
        let colors = BubbleColor::palette(settings.color_count);
        let mut a = Grid::from_settings(&settings);
        let mut b = Grid::from_settings(&settings);
        a.fill_random(6, colors, 0.1, &mut Pcg32::seed_from_u64(7));
        b.fill_random(6, colors, 0.1, &mut Pcg32::seed_from_u64(7));
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.lowest_occupied_row(), Some(5));
        assert!(a.colors_present().iter().all(|c| colors.contains(c)));
    }

    #[test]
    fn test_hex_distance() {
        let g = Grid::from_settings(&Settings::default());
        assert_eq!(g.hex_distance(GridPos::new(3, 2), GridPos::new(3, 2)), 0);
        assert_eq!(g.hex_distance(GridPos::new(3, 2), GridPos::new(5, 2)), 2);
        assert_eq!(g.hex_distance(GridPos::new(3, 2), GridPos::new(3, 4)), 2);
        assert_eq!(g.hex_distance(GridPos::new(3, 2), GridPos::new(2, 0)), 2);
    }

    proptest! {
        #[test]
        fn prop_columns_alternate(cols in 3usize..20, rows in 2usize..20, descents in 0usize..5) {
            let mut g = Grid::new(cols, rows, 40.0, 0.0);
            for _ in 0..descents {
                g.insert_top_row(&[]);
            }
            for row in 0..rows - 1 {
                let a = g.columns_for_row(row);
                let b = g.columns_for_row(row + 1);
                prop_assert!(a == cols || a == cols - 1);
                prop_assert_eq!(a + b, 2 * cols - 1);
            }
        }

        #[test]
        fn prop_snap_target_is_vacant(
            cells in proptest::collection::vec(proptest::option::of(0usize..6), 11 * 14),
            x in 0.0f32..440.0,
            y in 0.0f32..600.0,
        ) {
            let mut g = Grid::from_settings(&Settings::default());
            for (i, cell) in cells.into_iter().enumerate() {
                if let Some(c) = cell {
                    let pos = GridPos::new(i % 11, i / 11);
                    if g.in_bounds(pos) {
                        g.place(pos, Bubble::plain(BubbleColor::ALL[c])).unwrap();
                    }
                }
            }
            let point = Vec2::new(x, y);
            let target = g
                .check_collision(point, g.cell_radius())
                .and_then(|hit| g.find_snap_position(hit, point))
                .or_else(|| g.find_nearest_empty_position(point));
            match target {
                Some(pos) => prop_assert!(g.is_vacant(pos)),
                None => prop_assert!(g.is_full()),
            }
        }
    }
}
