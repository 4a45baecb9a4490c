use std::ops::{Add, AddAssign, Index, IndexMut, Mul};

use super::{Coord, CoordSet};

/// Dense row-major `height` x `width` matrix addressed by [`Coord`].
///
/// Indexing with an off-grid coordinate panics; use [`Grid::get`] when the
/// coordinate may fall outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: i32, height: i32, fill: T) -> Self {
        assert!(width > 0 && height > 0, "grid must be non-empty");
        Self {
            width,
            height,
            cells: vec![fill; (width * height) as usize],
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    fn idx(&self, c: Coord) -> Option<usize> {
        if self.contains(c) {
            Some((c.y * self.width + c.x) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, c: Coord) -> Option<&T> {
        self.idx(c).map(|idx| &self.cells[idx])
    }

    pub fn get_mut(&mut self, c: Coord) -> Option<&mut T> {
        self.idx(c).map(move |idx| &mut self.cells[idx])
    }

    /// Row-major walk; only for order-insensitive reductions.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    pub fn zip_with<U, V>(&self, other: &Grid<U>, f: impl Fn(&T, &U) -> V) -> Grid<V> {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "grid dimensions differ"
        );
        Grid {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }
}

impl<T> Index<Coord> for Grid<T> {
    type Output = T;

    fn index(&self, c: Coord) -> &T {
        match self.idx(c) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "coordinate ({}, {}) outside {}x{} grid",
                c.x, c.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Coord> for Grid<T> {
    fn index_mut(&mut self, c: Coord) -> &mut T {
        match self.idx(c) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "coordinate ({}, {}) outside {}x{} grid",
                c.x, c.y, self.width, self.height
            ),
        }
    }
}

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONAL: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];
const ORTHOGONAL_TWO: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

impl<T> Grid<T>
where
    T: Copy + AddAssign,
{
    fn convolve_offsets<'a>(&self, offsets: impl Iterator<Item = &'a (i32, i32)> + Clone) -> Self {
        let mut out = self.cells.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                let here = (y * self.width + x) as usize;
                for &(dx, dy) in offsets.clone() {
                    let src = Coord::new(x + dx, y + dy);
                    if let Some(idx) = self.idx(src) {
                        out[here] += self.cells[idx];
                    }
                }
            }
        }
        Grid {
            width: self.width,
            height: self.height,
            cells: out,
        }
    }

    /// Sum of each cell and its orthogonal neighbours; edge cells simply miss
    /// the neighbours that fall off the map.
    pub fn convolve4(&self) -> Self {
        self.convolve_offsets(ORTHOGONAL.iter())
    }

    /// [`Grid::convolve4`] widened by the four diagonals and the four
    /// orthogonal cells at distance two.
    pub fn convolve12(&self) -> Self {
        self.convolve_offsets(
            ORTHOGONAL
                .iter()
                .chain(DIAGONAL.iter())
                .chain(ORTHOGONAL_TWO.iter()),
        )
    }
}

impl Grid<i32> {
    /// Element-wise product.
    pub fn masked(&self, mask: &Grid<i32>) -> Self {
        self.zip_with(mask, |a, b| a * b)
    }

    /// 1 where the cell is positive, 0 elsewhere.
    pub fn exists(&self) -> Self {
        self.map(|v| i32::from(*v > 0))
    }

    pub fn sum(&self) -> i64 {
        self.cells.iter().map(|v| i64::from(*v)).sum()
    }

    /// Positive cells collected by walking `coords` (callers pass an
    /// [`super::IterationOrder`] walk).
    pub fn positive_set(&self, coords: impl Iterator<Item = Coord>) -> CoordSet {
        coords.filter(|c| self[*c] > 0).collect()
    }
}

impl<T: Copy + Add<Output = T>> Add for &Grid<T> {
    type Output = Grid<T>;

    fn add(self, rhs: Self) -> Grid<T> {
        self.zip_with(rhs, |a, b| *a + *b)
    }
}

impl<T: Copy + Mul<Output = T>> Mul<T> for &Grid<T> {
    type Output = Grid<T>;

    fn mul(self, rhs: T) -> Grid<T> {
        self.map(|v| *v * rhs)
    }
}
