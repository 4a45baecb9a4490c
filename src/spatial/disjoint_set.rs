use std::collections::HashMap;

use super::Coord;

/// Distance reported for a group that has no recorded distance yet.
pub const UNKNOWN_DISTANCE: i32 = 100;

/// Aggregate increments applied when a coordinate is first seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Increments {
    pub point: i32,
    pub tiles: i32,
    pub structures: i32,
}

#[derive(Debug, Clone)]
struct Node {
    coord: Coord,
    parent: usize,
    size: i32,
    point: i32,
    tiles: i32,
    structures: i32,
    dist_friendly: Option<i32>,
    dist_enemy: Option<i32>,
}

/// Union-find over grid coordinates with per-group aggregates.
///
/// Entries live in a vector in first-seen order, which is what makes group
/// listings deterministic. Aggregates are only meaningful on
/// representatives; `union` folds the absorbed representative's aggregates
/// into the surviving one before re-pointing it. No union by rank: the
/// second argument's group always hangs under the first's.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    width: i32,
    height: i32,
    index: HashMap<Coord, usize>,
    nodes: Vec<Node>,
    set_count: usize,
}

impl DisjointSet {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            index: HashMap::new(),
            nodes: Vec::new(),
            set_count: 0,
        }
    }

    fn check_bounds(&self, c: Coord) {
        assert!(
            c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height,
            "coordinate ({}, {}) outside {}x{} map",
            c.x,
            c.y,
            self.width,
            self.height
        );
    }

    fn slot(&mut self, c: Coord, seed: Increments) -> usize {
        self.check_bounds(c);
        if let Some(&slot) = self.index.get(&c) {
            return slot;
        }
        let slot = self.nodes.len();
        self.nodes.push(Node {
            coord: c,
            parent: slot,
            size: 1,
            point: seed.point,
            tiles: seed.tiles,
            structures: seed.structures,
            dist_friendly: None,
            dist_enemy: None,
        });
        self.index.insert(c, slot);
        self.set_count += 1;
        slot
    }

    fn root_slot(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.nodes[root].parent != root {
            root = self.nodes[root].parent;
        }
        let mut cursor = slot;
        while cursor != root {
            let next = self.nodes[cursor].parent;
            self.nodes[cursor].parent = root;
            cursor = next;
        }
        root
    }

    /// Representative of `c`, inserting it as a singleton if unseen.
    pub fn find(&mut self, c: Coord) -> Coord {
        self.find_seeded(c, Increments::default())
    }

    /// Like [`DisjointSet::find`]; `seed` only applies when `c` is new.
    pub fn find_seeded(&mut self, c: Coord, seed: Increments) -> Coord {
        let slot = self.slot(c, seed);
        let root = self.root_slot(slot);
        self.nodes[root].coord
    }

    pub fn union(&mut self, a: Coord, b: Coord) {
        let a = self.slot(a, Increments::default());
        let b = self.slot(b, Increments::default());
        let a = self.root_slot(a);
        let b = self.root_slot(b);
        if a == b {
            return;
        }
        let absorbed = self.nodes[b].clone();
        let keeper = &mut self.nodes[a];
        keeper.size += absorbed.size;
        keeper.point += absorbed.point;
        keeper.tiles += absorbed.tiles;
        keeper.structures += absorbed.structures;
        keeper.dist_friendly = min_known(keeper.dist_friendly, absorbed.dist_friendly);
        keeper.dist_enemy = min_known(keeper.dist_enemy, absorbed.dist_enemy);
        self.nodes[b].parent = a;
        self.set_count -= 1;
    }

    /// Points every entry straight at its representative.
    pub fn flatten(&mut self) {
        for slot in 0..self.nodes.len() {
            self.root_slot(slot);
        }
    }

    fn lookup(&self, c: Coord) -> Option<&Node> {
        let mut slot = *self.index.get(&c)?;
        while self.nodes[slot].parent != slot {
            slot = self.nodes[slot].parent;
        }
        Some(&self.nodes[slot])
    }

    /// Read-only representative. An unseen coordinate is its own
    /// representative.
    pub fn leader(&self, c: Coord) -> Coord {
        self.lookup(c).map(|node| node.coord).unwrap_or(c)
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.index.contains_key(&c)
    }

    pub fn size(&self, c: Coord) -> i32 {
        self.lookup(c).map(|node| node.size).unwrap_or(1)
    }

    pub fn point(&self, c: Coord) -> i32 {
        self.lookup(c).map(|node| node.point).unwrap_or(0)
    }

    pub fn tiles(&self, c: Coord) -> i32 {
        self.lookup(c).map(|node| node.tiles).unwrap_or(0)
    }

    pub fn structures(&self, c: Coord) -> i32 {
        self.lookup(c).map(|node| node.structures).unwrap_or(0)
    }

    pub fn dist_from_friendly(&self, c: Coord) -> i32 {
        self.lookup(c)
            .and_then(|node| node.dist_friendly)
            .unwrap_or(UNKNOWN_DISTANCE)
    }

    pub fn dist_from_enemy(&self, c: Coord) -> i32 {
        self.lookup(c)
            .and_then(|node| node.dist_enemy)
            .unwrap_or(UNKNOWN_DISTANCE)
    }

    /// Lowers the friendly distance of `c`'s group to `distance` if closer.
    pub fn record_friendly_distance(&mut self, c: Coord, distance: i32) {
        let slot = self.slot(c, Increments::default());
        let root = self.root_slot(slot);
        let node = &mut self.nodes[root];
        node.dist_friendly = min_known(node.dist_friendly, Some(distance));
    }

    pub fn record_enemy_distance(&mut self, c: Coord, distance: i32) {
        let slot = self.slot(c, Increments::default());
        let root = self.root_slot(slot);
        let node = &mut self.nodes[root];
        node.dist_enemy = min_known(node.dist_enemy, Some(distance));
    }

    pub fn set_count(&self) -> usize {
        self.set_count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All groups, leaders in the order their first member was seen and
    /// members in insertion order.
    pub fn groups(&self) -> Vec<(Coord, Vec<Coord>)> {
        let mut position: HashMap<Coord, usize> = HashMap::new();
        let mut groups: Vec<(Coord, Vec<Coord>)> = Vec::new();
        for node in &self.nodes {
            let leader = self.leader(node.coord);
            let at = *position.entry(leader).or_insert_with(|| {
                groups.push((leader, Vec::new()));
                groups.len() - 1
            });
            groups[at].1.push(node.coord);
        }
        groups
    }

    /// Groups with positive point value, most structure-adjacent first, then
    /// most tiles. Equal keys keep first-seen order.
    pub fn groups_by_priority(&self) -> Vec<Vec<Coord>> {
        let mut groups: Vec<(Coord, Vec<Coord>)> = self
            .groups()
            .into_iter()
            .filter(|(leader, _)| self.point(*leader) > 0)
            .collect();
        groups.sort_by_key(|(leader, _)| {
            std::cmp::Reverse((self.structures(*leader), self.tiles(*leader)))
        });
        groups.into_iter().map(|(_, members)| members).collect()
    }

    /// Number of groups worth more than a single wood tile.
    pub fn valuable_group_count(&self) -> usize {
        self.groups()
            .iter()
            .filter(|(leader, _)| self.point(*leader) > 1)
            .count()
    }
}

fn min_known(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wood() -> Increments {
        Increments {
            point: 1,
            tiles: 1,
            structures: 0,
        }
    }

    #[test]
    fn test_find_inserts_singleton() {
        let mut ds = DisjointSet::new(5, 5);
        let c = Coord::new(1, 2);
        assert_eq!(ds.find_seeded(c, wood()), c);
        assert_eq!(ds.set_count(), 1);
        assert_eq!(ds.point(c), 1);
        assert_eq!(ds.size(c), 1);
        // seeding again does not double count
        ds.find_seeded(c, wood());
        assert_eq!(ds.point(c), 1);
        assert_eq!(ds.set_count(), 1);
    }

    #[test]
    fn test_union_attaches_second_under_first() {
        let mut ds = DisjointSet::new(5, 5);
        let a = Coord::new(0, 0);
        let b = Coord::new(1, 0);
        ds.find_seeded(a, wood());
        ds.find_seeded(b, wood());
        ds.union(a, b);
        assert_eq!(ds.find(b), a);
        assert_eq!(ds.set_count(), 1);
        assert_eq!(ds.point(b), 2);
        assert_eq!(ds.tiles(a), 2);
        assert_eq!(ds.size(a), 2);
        ds.union(b, a);
        assert_eq!(ds.set_count(), 1);
        assert_eq!(ds.size(a), 2);
    }

    #[test]
    fn test_transitive_connectivity_and_sums() {
        let mut ds = DisjointSet::new(10, 10);
        let coal = Increments {
            point: 3,
            tiles: 1,
            structures: 0,
        };
        let city = Increments {
            point: 0,
            tiles: 0,
            structures: 1,
        };
        let cells: Vec<Coord> = (0..6).map(|x| Coord::new(x, 3)).collect();
        ds.find_seeded(cells[0], wood());
        ds.find_seeded(cells[1], coal);
        ds.find_seeded(cells[2], city);
        ds.find_seeded(cells[3], wood());
        ds.find_seeded(cells[4], coal);
        ds.find_seeded(cells[5], wood());

        ds.union(cells[0], cells[1]);
        ds.union(cells[2], cells[1]);
        ds.union(cells[4], cells[5]);

        assert_eq!(ds.leader(cells[0]), ds.leader(cells[2]));
        assert_ne!(ds.leader(cells[0]), ds.leader(cells[4]));
        assert_ne!(ds.leader(cells[3]), ds.leader(cells[4]));
        assert_eq!(ds.point(cells[2]), 1 + 3);
        assert_eq!(ds.structures(cells[0]), 1);
        assert_eq!(ds.tiles(cells[0]), 2);
        assert_eq!(ds.point(cells[5]), 4);
        assert_eq!(ds.set_count(), 3);

        ds.union(cells[3], cells[0]);
        ds.union(cells[5], cells[3]);
        let total: i32 = 1 + 3 + 1 + 3 + 1;
        assert_eq!(ds.point(cells[1]), total);
        assert_eq!(ds.size(cells[4]), 6);
        assert_eq!(ds.set_count(), 1);
    }

    #[test]
    fn test_compression_flattens_chain() {
        let mut ds = DisjointSet::new(8, 1);
        for x in (1..8).rev() {
            ds.union(Coord::new(x - 1, 0), Coord::new(x, 0));
        }
        ds.find(Coord::new(7, 0));
        for x in 0..8 {
            let slot = ds.index[&Coord::new(x, 0)];
            assert_eq!(ds.nodes[slot].parent, ds.index[&Coord::new(0, 0)]);
        }
    }

    #[test]
    fn test_distances_default_and_merge_by_min() {
        let mut ds = DisjointSet::new(5, 5);
        let a = Coord::new(0, 0);
        let b = Coord::new(4, 4);
        assert_eq!(ds.dist_from_friendly(a), UNKNOWN_DISTANCE);
        ds.record_friendly_distance(a, 7);
        ds.record_friendly_distance(a, 9);
        ds.record_friendly_distance(b, 3);
        ds.record_enemy_distance(b, 12);
        assert_eq!(ds.dist_from_friendly(a), 7);
        ds.union(a, b);
        assert_eq!(ds.dist_from_friendly(a), 3);
        assert_eq!(ds.dist_from_enemy(a), 12);
    }

    #[test]
    fn test_groups_by_priority_orders_and_filters() {
        let mut ds = DisjointSet::new(10, 10);
        let big = [Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0)];
        for c in big {
            ds.find_seeded(c, wood());
        }
        ds.union(big[0], big[1]);
        ds.union(big[0], big[2]);

        let small = Coord::new(5, 5);
        ds.find_seeded(small, wood());
        let city = Coord::new(5, 6);
        ds.find_seeded(
            city,
            Increments {
                point: 0,
                tiles: 0,
                structures: 1,
            },
        );
        ds.union(small, city);

        // a worthless group is dropped
        ds.find(Coord::new(9, 9));

        let groups = ds.groups_by_priority();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![small, city]);
        assert_eq!(groups[1], big.to_vec());
        // only the three-wood group is worth more than one point
        assert_eq!(ds.valuable_group_count(), 1);
    }

    #[test]
    fn test_unseen_lookups_are_neutral() {
        let ds = DisjointSet::new(3, 3);
        let c = Coord::new(2, 2);
        assert_eq!(ds.leader(c), c);
        assert_eq!(ds.point(c), 0);
        assert_eq!(ds.size(c), 1);
        assert!(!ds.contains(c));
    }

    #[test]
    #[should_panic]
    fn test_off_map_find_panics() {
        let mut ds = DisjointSet::new(3, 3);
        ds.find(Coord::new(-1, 0));
    }
}
