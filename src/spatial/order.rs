use serde::{Deserialize, Serialize};

use super::Coord;
use crate::error::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Reflection across a vertical axis (east and west swap).
    pub fn mirror_x(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            other => other,
        }
    }

    /// Reflection across a horizontal axis (north and south swap).
    pub fn mirror_y(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            other => other,
        }
    }
}

/// Fixed iteration order for one match.
///
/// Established once from the two opening city tiles so that both players
/// walk the map (and try directions) in mirror-image order. Every stage
/// walks coordinates through [`IterationOrder::coords`] and neighbours
/// through [`IterationOrder::dirs`]; nothing order-sensitive iterates a hash
/// set directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOrder {
    width: i32,
    height: i32,
    xs: Vec<i32>,
    ys: Vec<i32>,
    x_mirrored: bool,
    y_mirrored: bool,
    dirs: [Direction; 4],
}

impl IterationOrder {
    pub fn ascending(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "map must be non-empty");
        Self {
            width,
            height,
            xs: (0..width).collect(),
            ys: (0..height).collect(),
            x_mirrored: false,
            y_mirrored: false,
            dirs: Direction::ALL,
        }
    }

    /// The player whose opening lies left of (above) the opponent's walks x
    /// (y) descending with east/west (north/south) swapped. Diagonal
    /// openings mirror both axes.
    pub fn from_openings(
        width: i32,
        height: i32,
        player: Coord,
        opponent: Coord,
    ) -> Result<Self, OrderError> {
        if player == opponent {
            return Err(OrderError::CoincidentOpenings {
                x: player.x,
                y: player.y,
            });
        }
        let mut order = Self::ascending(width, height);
        if player.x < opponent.x {
            order.xs.reverse();
            order.x_mirrored = true;
            order.dirs = order.dirs.map(Direction::mirror_x);
        }
        if player.y < opponent.y {
            order.ys.reverse();
            order.y_mirrored = true;
            order.dirs = order.dirs.map(Direction::mirror_y);
        }
        Ok(order)
    }

    /// Copy of this order with the directions rotated for `turn`.
    ///
    /// The direction list shifts left by one on every turn that is not a
    /// multiple of four, so the offset is the count of such turns so far.
    pub fn for_turn(&self, turn: u32) -> Self {
        let shifts = (turn - turn / 4) % 4;
        let mut order = self.clone();
        order.dirs.rotate_left(shifts as usize);
        order
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    pub fn is_x_mirrored(&self) -> bool {
        self.x_mirrored
    }

    pub fn is_y_mirrored(&self) -> bool {
        self.y_mirrored
    }

    pub fn dirs(&self) -> &[Direction; 4] {
        &self.dirs
    }

    /// Every map coordinate, rows outer and columns inner.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| Coord::new(x, y)))
    }

    /// In-map orthogonal neighbours in direction order.
    pub fn neighbours(&self, c: Coord) -> impl Iterator<Item = Coord> + '_ {
        self.dirs
            .iter()
            .map(move |dir| c.step(*dir))
            .filter(move |n| self.contains(*n))
    }

    /// Sort key that ascends along this order's walk.
    pub fn sort_key(&self, c: Coord) -> (i32, i32) {
        let sx = if self.x_mirrored { -1 } else { 1 };
        let sy = if self.y_mirrored { -1 } else { 1 };
        (c.x * sx, c.y * sy)
    }
}
