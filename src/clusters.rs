//! Resource clusters: collectable tiles merged into deposits with their
//! attached city tiles and a buildable shell around them.

use crate::config::EngineConfig;
use crate::distance::DistanceFields;
use crate::features::GridFeatures;
use crate::spatial::{Coord, CoordSet, DisjointSet, Increments, IterationOrder};
use crate::world::ResourceKind;

#[derive(Debug, Clone)]
pub struct ResourceClusters {
    groups: DisjointSet,
}

impl ResourceClusters {
    pub fn build(features: &GridFeatures, order: &IterationOrder, config: &EngineConfig) -> Self {
        let rules = &config.rules;
        let mut groups = DisjointSet::new(order.width(), order.height());
        let collectable = &features.collectable_projected_tiles;
        let is_collectable = |c: &Coord| collectable.contains(c);

        for c in order.coords() {
            if is_collectable(&c) {
                let kind = if features.wood_tiles.contains(&c) {
                    ResourceKind::Wood
                } else if features.coal_tiles.contains(&c) {
                    ResourceKind::Coal
                } else {
                    ResourceKind::Uranium
                };
                groups.find_seeded(
                    c,
                    Increments {
                        point: kind.rule(rules).cluster_points,
                        tiles: 1,
                        structures: 0,
                    },
                );
            }
            if features.is_player_city(c)
                && features.convolved_collectable_projected_tiles.contains(&c)
            {
                groups.find_seeded(
                    c,
                    Increments {
                        point: 0,
                        tiles: 0,
                        structures: 1,
                    },
                );
            }
        }

        // direct neighbours, plus own city tiles not yet attached to a deposit
        for c in order.coords().filter(is_collectable) {
            for n in order.neighbours(c) {
                if is_collectable(&n) {
                    groups.union(c, n);
                }
                if features.is_player_city(n) && groups.tiles(n) == 0 {
                    groups.union(c, n);
                }
            }
        }

        // anything two steps away
        let dirs = *order.dirs();
        for c in order.coords().filter(is_collectable) {
            for first in dirs {
                for second in dirs {
                    let n = c.step(first).step(second);
                    if order.contains(n) {
                        groups.union(c, n);
                    }
                }
            }
        }

        absorb_unclaimed(&mut groups, order, collectable, |n| features.is_player_city(n));
        absorb_unclaimed(&mut groups, order, collectable, |n| {
            !is_collectable(&n) && !features.is_player_city(n) && !features.is_opponent_city(n)
        });

        groups.flatten();
        Self { groups }
    }

    /// Records, per cluster, how close each side's assets come to the
    /// cluster's reachable tiles.
    pub fn record_proximity(
        &mut self,
        features: &GridFeatures,
        fields: &DistanceFields,
        order: &IterationOrder,
    ) {
        for c in order.coords() {
            if !features.convolved_collectable_tiles.contains(&c) {
                continue;
            }
            self.groups
                .record_friendly_distance(c, fields.from_player_assets[c]);
            self.groups
                .record_enemy_distance(c, fields.from_opponent_assets[c]);
        }
    }

    pub fn leader(&self, c: Coord) -> Coord {
        self.groups.leader(c)
    }

    pub fn same_cluster(&self, a: Coord, b: Coord) -> bool {
        self.groups.contains(a) && self.leader(a) == self.leader(b)
    }

    pub fn point(&self, c: Coord) -> i32 {
        self.groups.point(c)
    }

    pub fn tiles(&self, c: Coord) -> i32 {
        self.groups.tiles(c)
    }

    pub fn structures(&self, c: Coord) -> i32 {
        self.groups.structures(c)
    }

    pub fn size(&self, c: Coord) -> i32 {
        self.groups.size(c)
    }

    pub fn dist_from_player(&self, c: Coord) -> i32 {
        self.groups.dist_from_friendly(c)
    }

    pub fn dist_from_opponent(&self, c: Coord) -> i32 {
        self.groups.dist_from_enemy(c)
    }

    /// Clusters worth more than a single wood tile.
    pub fn valuable_count(&self) -> usize {
        self.groups.valuable_group_count()
    }

    /// Valued clusters, most city tiles first, then most resource tiles.
    pub fn by_priority(&self) -> Vec<Vec<Coord>> {
        self.groups.groups_by_priority()
    }

    pub fn disjoint_set(&self) -> &DisjointSet {
        &self.groups
    }
}

/// In priority order, each cluster takes the orthogonal neighbours of its
/// collectable tiles that `eligible` accepts and nobody has claimed yet.
fn absorb_unclaimed(
    groups: &mut DisjointSet,
    order: &IterationOrder,
    collectable: &CoordSet,
    eligible: impl Fn(Coord) -> bool,
) {
    for group in groups.groups_by_priority() {
        for c in group {
            if !collectable.contains(&c) {
                continue;
            }
            for n in order.neighbours(c) {
                if eligible(n) && groups.find(n) == n {
                    groups.union(c, n);
                }
            }
        }
    }
}
