//! Weighted shortest paths with a per-turn cache keyed by source tile.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::config::EngineConfig;
use crate::features::GridFeatures;
use crate::spatial::{Coord, CoordSet, Grid, IterationOrder};

/// Cost reported for a tile the search never reached.
pub const UNREACHABLE: i32 = 1_000_000_007;

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cost: i32,
    tie: u64,
    cell: Coord,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        (self.cost, self.tie) == (other.cost, other.tie)
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so BinaryHeap pops the cheapest first
        (other.cost, other.tie).cmp(&(self.cost, self.tie))
    }
}

/// Lazily computed Dijkstra distance maps, one per source tile, valid for a
/// single turn.
#[derive(Debug, Clone)]
pub struct PathCache {
    order: IterationOrder,
    entry_cost: Grid<i32>,
    cache: HashMap<Coord, Grid<i32>>,
}

impl PathCache {
    /// Entering a tile costs one step, more if something is parked there,
    /// more still for an enemy city, and most for an own city that already
    /// holds fuel for the rest of the match.
    pub fn new(
        features: &GridFeatures,
        occupied: &CoordSet,
        order: &IterationOrder,
        config: &EngineConfig,
    ) -> Self {
        let costs = &config.paths;
        let mut entry_cost = Grid::new(order.width(), order.height(), costs.step);
        for c in order.coords() {
            if occupied.contains(&c) {
                entry_cost[c] = costs.occupied;
            }
            if features.is_opponent_city(c) {
                entry_cost[c] = costs.enemy_city;
            }
            if features.city_fuel_needed_for_game[c] < 0 {
                entry_cost[c] = costs.sealed_city;
            }
        }
        Self {
            order: order.clone(),
            entry_cost,
            cache: HashMap::new(),
        }
    }

    pub fn entry_cost(&self, c: Coord) -> i32 {
        self.entry_cost.get(c).copied().unwrap_or(UNREACHABLE)
    }

    /// Cost of the cheapest route from `source` to every tile. Computed on
    /// first request and reused for the rest of the turn.
    pub fn distances_from(&mut self, source: Coord) -> &Grid<i32> {
        if !self.cache.contains_key(&source) {
            let field = self.dijkstra(source);
            self.cache.insert(source, field);
        }
        &self.cache[&source]
    }

    fn dijkstra(&self, source: Coord) -> Grid<i32> {
        let mut best = Grid::new(self.order.width(), self.order.height(), UNREACHABLE);
        if !self.order.contains(source) {
            return best;
        }
        let mut done = Grid::new(self.order.width(), self.order.height(), false);
        let mut open = BinaryHeap::new();
        let mut tie = 0u64;
        best[source] = 0;
        open.push(OpenNode {
            cost: 0,
            tie,
            cell: source,
        });

        while let Some(node) = open.pop() {
            if done[node.cell] {
                continue;
            }
            done[node.cell] = true;
            for n in self.order.neighbours(node.cell) {
                if done[n] {
                    continue;
                }
                let cost = node.cost + self.entry_cost[n];
                if cost < best[n] {
                    best[n] = cost;
                    tie += 1;
                    open.push(OpenNode { cost, tie, cell: n });
                }
            }
        }
        best
    }

    /// Distance from `start` to `end`. The exact variant runs (or reuses) a
    /// search rooted at `end`; otherwise plain Manhattan distance.
    pub fn retrieve_distance(&mut self, start: Coord, end: Coord, exact: bool) -> i32 {
        if !exact {
            return start.distance(end);
        }
        self.distances_from(end)
            .get(start)
            .copied()
            .unwrap_or(UNREACHABLE)
    }

    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }
}
