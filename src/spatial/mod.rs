//! Spatial model - tile coordinates, dense grids, iteration order and union-find

mod disjoint_set;
mod grid;
mod order;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use disjoint_set::{DisjointSet, Increments, UNKNOWN_DISTANCE};
pub use grid::Grid;
pub use order::{Direction, IterationOrder};

/// Tile position on the map. Off-grid values are legal and are used for the
/// out-of-map boundary set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Manhattan distance between two positions
    pub fn distance(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<[i32; 2]> for Coord {
    fn from(value: [i32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Coord> for [i32; 2] {
    fn from(value: Coord) -> Self {
        [value.x, value.y]
    }
}

impl From<(i32, i32)> for Coord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Coordinate sets are the interchange format between stages. They are only
/// ever probed for membership; anything order-sensitive walks an
/// [`IterationOrder`] instead of iterating the set.
pub type CoordSet = HashSet<Coord>;

/// The ring of coordinates just outside a `width` x `height` map.
pub fn out_of_map_ring(width: i32, height: i32) -> CoordSet {
    let mut ring = CoordSet::new();
    for y in [-1, height] {
        for x in 0..width {
            ring.insert(Coord::new(x, y));
        }
    }
    for y in 0..height {
        for x in [-1, width] {
            ring.insert(Coord::new(x, y));
        }
    }
    ring
}
