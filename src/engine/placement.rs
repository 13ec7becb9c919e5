//! # engine::placement
//!
//! Where to drop a new node so it doesn't land on top of an existing one.
//!
//! ```text
//!  cell = (node_width + padding) × (node_height + padding)
//!
//!   . . . . . . .      every existing node blocks its own cell
//!   . x x x . . .      plus the ring of 8 cells around it (x)
//!   . x N x . . .
//!   . x x x . . .      free desired cell  → desired point ± jitter
//!   . . . . . . .      blocked            → square spiral outward,
//!                                          right/down/left/up per layer
//! ```
//!
//! The scan is bounded by `max_search_radius` layers, so the worst case is
//! O(radius²) cell lookups.  When nothing is free inside that radius the node
//! goes to the first column past the rightmost node's ring.
//!
//! Cell indices are clamped to ±`CELL_LIMIT` so far-off coordinates from a
//! stored graph can't overflow the neighbour arithmetic.

use std::collections::HashSet;

use rand::Rng;

use crate::models::{Node, XY};

/// Bound on grid indices on either axis.
const CELL_LIMIT: f64 = 1.0e12;

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub node_width:        f64,
    pub node_height:       f64,
    pub padding:           f64,
    pub max_search_radius: i64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            node_width:        250.0,
            node_height:       150.0,
            padding:           20.0,
            max_search_radius: 20,
        }
    }
}

impl PlacementConfig {
    fn cell_width(&self) -> f64 {
        self.node_width + self.padding
    }

    fn cell_height(&self) -> f64 {
        self.node_height + self.padding
    }

    /// Grid cell containing `p`.  NaN maps to 0.
    pub fn cell_of(&self, p: XY) -> (i64, i64) {
        let index = |v: f64, size: f64| (v / size).floor().clamp(-CELL_LIMIT, CELL_LIMIT) as i64;
        (index(p.x, self.cell_width()), index(p.y, self.cell_height()))
    }

    fn anchor_of(&self, cell: (i64, i64)) -> XY {
        XY::new(
            cell.0 as f64 * self.cell_width() + self.padding / 2.0,
            cell.1 as f64 * self.cell_height() + self.padding / 2.0,
        )
    }

    /// Cells blocked by `nodes`: each node's cell plus its one-cell ring.
    pub fn occupied_cells(&self, nodes: &[Node]) -> HashSet<(i64, i64)> {
        let mut occupied = HashSet::with_capacity(nodes.len() * 9);
        for node in nodes {
            let (cx, cy) = self.cell_of(node.position);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    occupied.insert((cx + dx, cy + dy));
                }
            }
        }
        occupied
    }
}

// ─── Search ───────────────────────────────────────────────────────────────────

/// Free canvas position closest (in spiral order) to `desired`.
pub fn find_empty_position<R: Rng>(
    existing: &[Node],
    desired:  XY,
    config:   &PlacementConfig,
    rng:      &mut R,
) -> XY {
    let occupied = config.occupied_cells(existing);
    let origin = config.cell_of(desired);

    if !occupied.contains(&origin) {
        return jitter_within_cell(desired, origin, config, rng);
    }

    if let Some(cell) = spiral_search(origin, config.max_search_radius, &occupied) {
        return jitter_within_cell(config.anchor_of(cell), cell, config, rng);
    }

    // Nothing free in range: no ring reaches two columns past the rightmost node.
    let rightmost = existing
        .iter()
        .map(|n| config.cell_of(n.position).0)
        .max()
        .unwrap_or(origin.0);
    let cell = (rightmost + 2, origin.1);
    let anchor = XY::new(config.anchor_of(cell).x, desired.y);
    jitter_within_cell(anchor, cell, config, rng)
}

/// First free cell walking square rings around `origin`.
///
/// Each layer `r` is walked as: right edge top→bottom, bottom edge
/// right→left, left edge bottom→top, top edge left→right.
fn spiral_search(
    origin:     (i64, i64),
    max_radius: i64,
    occupied:   &HashSet<(i64, i64)>,
) -> Option<(i64, i64)> {
    let (cx, cy) = origin;
    for r in 1..=max_radius {
        let right  = (cy - r..=cy + r).map(|y| (cx + r, y));
        let bottom = (cx - r..cx + r).rev().map(|x| (x, cy + r));
        let left   = (cy - r..cy + r).rev().map(|y| (cx - r, y));
        let top    = (cx - r + 1..cx + r).map(|x| (x, cy - r));

        if let Some(cell) = right
            .chain(bottom)
            .chain(left)
            .chain(top)
            .find(|cell| !occupied.contains(cell))
        {
            return Some(cell);
        }
    }
    None
}

/// Offset `p` by up to ±padding/2 on each axis without leaving `cell`.
fn jitter_within_cell<R: Rng>(
    p:      XY,
    cell:   (i64, i64),
    config: &PlacementConfig,
    rng:    &mut R,
) -> XY {
    let half = config.padding / 2.0;
    let (jx, jy) = if half > 0.0 {
        (rng.gen_range(-half..=half), rng.gen_range(-half..=half))
    } else {
        (0.0, 0.0)
    };

    let min_x = cell.0 as f64 * config.cell_width();
    let min_y = cell.1 as f64 * config.cell_height();
    // Stay strictly inside the cell so `cell_of` maps back to it.
    let max_x = min_x + config.cell_width() - 1e-6;
    let max_y = min_y + config.cell_height() - 1e-6;

    XY::new((p.x + jx).clamp(min_x, max_x), (p.y + jy).clamp(min_y, max_y))
}
