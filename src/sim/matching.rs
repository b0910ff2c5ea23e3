//! Cluster and cascade detection
//!
//! Both passes are breadth-first searches over hex adjacency. They only read
//! the grid; callers decide what to remove.

use std::collections::VecDeque;

use super::grid::{Grid, GridPos, PlacedBubble};
use crate::consts::MIN_MATCH_SIZE;

/// Visited set addressed like the grid arena
struct Visited {
    cols: usize,
    seen: Vec<bool>,
}

impl Visited {
    fn new(grid: &Grid) -> Self {
        Self {
            cols: grid.cols(),
            seen: vec![false; grid.cols() * grid.rows()],
        }
    }

    /// Mark `pos`; returns false if it was already marked
    fn mark(&mut self, pos: GridPos) -> bool {
        let i = pos.row * self.cols + pos.col;
        !std::mem::replace(&mut self.seen[i], true)
    }

    fn contains(&self, pos: GridPos) -> bool {
        self.seen[pos.row * self.cols + pos.col]
    }
}

/// Every bubble connected to `seed` through same-colored neighbors, seed included.
///
/// Empty when `seed` holds no bubble.
pub fn find_cluster(grid: &Grid, seed: GridPos) -> Vec<PlacedBubble> {
    let Some(&start) = grid.get(seed) else {
        return Vec::new();
    };

    let mut visited = Visited::new(grid);
    let mut queue = VecDeque::from([seed]);
    let mut cluster = Vec::new();
    visited.mark(seed);

    while let Some(pos) = queue.pop_front() {
        let Some(&bubble) = grid.get(pos) else {
            continue;
        };
        cluster.push(PlacedBubble { pos, bubble });

        for n in grid.neighbors(pos) {
            let same_color = grid.get(n).is_some_and(|b| b.color == start.color);
            if same_color && visited.mark(n) {
                queue.push_back(n);
            }
        }
    }

    cluster
}

/// The same-color cluster at `seed` if it is large enough to pop, else empty
pub fn find_matches(grid: &Grid, seed: GridPos) -> Vec<PlacedBubble> {
    let cluster = find_cluster(grid, seed);
    if cluster.len() >= MIN_MATCH_SIZE {
        cluster
    } else {
        Vec::new()
    }
}

/// Bubbles with no path of occupied cells back to the top row.
///
/// Single pass: the result is everything currently detached, so removing it
/// cannot expose further orphans.
pub fn find_orphans(grid: &Grid) -> Vec<PlacedBubble> {
    let mut visited = Visited::new(grid);
    let mut queue: VecDeque<GridPos> = (0..grid.columns_for_row(0))
        .map(|col| GridPos::new(col, 0))
        .filter(|&pos| grid.is_occupied(pos))
        .collect();
    for &pos in &queue {
        visited.mark(pos);
    }

    while let Some(pos) = queue.pop_front() {
        for n in grid.neighbors(pos) {
            if grid.is_occupied(n) && visited.mark(n) {
                queue.push_back(n);
            }
        }
    }

    grid.occupied()
        .filter(|placed| !visited.contains(placed.pos))
        .collect()
}
