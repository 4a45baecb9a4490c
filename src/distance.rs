//! Distance fields over the grid: multi-source BFS, floodfill regions and
//! median/mean centres.

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::features::GridFeatures;
use crate::policy::TurnPolicy;
use crate::spatial::{Coord, CoordSet, DisjointSet, Grid, IterationOrder};

/// Unweighted distance from the nearest tile of `sources`, never stepping
/// onto `blockers`. Cells the search cannot reach keep `unreached`.
pub fn bfs_distance(
    sources: &CoordSet,
    blockers: &CoordSet,
    order: &IterationOrder,
    unreached: i32,
) -> Grid<i32> {
    let mut field = Grid::new(order.width(), order.height(), unreached);
    let mut queue = VecDeque::new();
    for c in order.coords() {
        if sources.contains(&c) {
            field[c] = 0;
            queue.push_back(c);
        }
    }
    let mut seen: CoordSet = queue.iter().copied().collect();
    while let Some(c) = queue.pop_front() {
        let next = field[c] + 1;
        for n in order.neighbours(c) {
            if blockers.contains(&n) || !seen.insert(n) {
                continue;
            }
            field[n] = next;
            queue.push_back(n);
        }
    }
    field
}

/// The largest connected regions that avoid `blockers`, taken biggest first
/// until together they hold more than `coverage` of the unblocked tiles.
/// A map cut in two by a resource wall thus yields both halves.
pub fn floodfill(blockers: &CoordSet, order: &IterationOrder, coverage: f64) -> CoordSet {
    let mut regions = DisjointSet::new(order.width(), order.height());
    for c in order.coords() {
        if blockers.contains(&c) {
            continue;
        }
        regions.find(c);
        for n in order.neighbours(c) {
            if !blockers.contains(&n) {
                regions.union(c, n);
            }
        }
    }

    let free = regions.len();
    let threshold = coverage * free as f64;
    let mut groups: Vec<Vec<Coord>> = regions
        .groups()
        .into_iter()
        .map(|(_, members)| members)
        .collect();
    groups.sort_by_key(|members| std::cmp::Reverse(members.len()));

    let mut filled = CoordSet::new();
    for members in groups {
        filled.extend(members);
        if filled.len() as f64 > threshold {
            break;
        }
    }
    filled
}

fn median(mut values: Vec<i32>) -> f64 {
    values.sort_unstable();
    let mid = values.len() / 2;
    f64::from(values[mid] + values[values.len() - 1 - mid]) / 2.0
}

/// Manhattan distance from the per-axis median of `set`, with that centre
/// truncated to a tile. An empty set gives a zero field centred on the
/// origin.
pub fn median_field(set: &CoordSet, order: &IterationOrder) -> (Grid<f64>, Coord) {
    if set.is_empty() {
        return (Grid::new(order.width(), order.height(), 0.0), Coord::new(0, 0));
    }
    let mx = median(set.iter().map(|c| c.x).collect());
    let my = median(set.iter().map(|c| c.y).collect());
    (centre_field(mx, my, order), Coord::new(mx as i32, my as i32))
}

/// As [`median_field`], centred on the mean instead.
pub fn mean_field(set: &CoordSet, order: &IterationOrder) -> (Grid<f64>, Coord) {
    if set.is_empty() {
        return (Grid::new(order.width(), order.height(), 0.0), Coord::new(0, 0));
    }
    let n = set.len() as f64;
    let mx = set.iter().map(|c| f64::from(c.x)).sum::<f64>() / n;
    let my = set.iter().map(|c| f64::from(c.y)).sum::<f64>() / n;
    (centre_field(mx, my, order), Coord::new(mx as i32, my as i32))
}

fn centre_field(mx: f64, my: f64, order: &IterationOrder) -> Grid<f64> {
    let mut field = Grid::new(order.width(), order.height(), 0.0);
    for c in order.coords() {
        field[c] = (f64::from(c.x) - mx).abs() + (f64::from(c.y) - my).abs();
    }
    field
}

/// Orthogonal steps to the nearest map edge, per axis.
pub fn edge_distance(order: &IterationOrder) -> Grid<i32> {
    let (width, height) = (order.width(), order.height());
    let mut field = Grid::new(width, height, 0);
    for c in order.coords() {
        field[c] = c.y.min(height - 1 - c.y) + c.x.min(width - 1 - c.x);
    }
    field
}

#[derive(Debug, Clone)]
pub struct DistanceFields {
    pub from_edge: Grid<i32>,

    pub from_collectable: Grid<i32>,
    pub from_collectable_projected: Grid<i32>,
    pub from_player_assets: Grid<i32>,
    pub from_opponent_assets: Grid<i32>,
    pub from_player_units: Grid<i32>,
    pub from_opponent_units: Grid<i32>,
    pub from_player_city_tiles: Grid<i32>,
    pub from_opponent_city_tiles: Grid<i32>,
    pub from_buildable: Grid<i32>,
    pub from_empty: Grid<i32>,
    pub from_wood: Grid<i32>,
    pub from_preferred_buildable: Grid<i32>,
    pub from_probably_buildable: Grid<i32>,

    pub floodfill_by_player_city: CoordSet,
    pub floodfill_by_opponent_city: CoordSet,
    pub floodfill_by_either_city: CoordSet,
    pub floodfill_by_empty: CoordSet,
    pub from_floodfill_by_player_city: Grid<i32>,
    pub from_floodfill_by_opponent_city: Grid<i32>,
    pub from_floodfill_by_either_city: Grid<i32>,
    /// Early in the match this measures distance from buildable tiles.
    pub from_floodfill_by_empty: Grid<i32>,

    pub resource_mean: Coord,
    pub from_resource_mean: Grid<f64>,
    pub resource_median: Coord,
    pub from_resource_median: Grid<f64>,
    pub player_unit_median: Coord,
    pub from_player_unit_median: Grid<f64>,
    pub player_city_median: Coord,
    pub from_player_city_median: Grid<f64>,
    pub preferred_median: Coord,
    pub from_preferred_median: Grid<f64>,

    pub opponent_unit_adjacent: CoordSet,
    pub opponent_unit_adjacent_and_buildable: CoordSet,
    pub opponent_unit_adjacent_and_player_city: CoordSet,
}

impl DistanceFields {
    pub fn build(
        features: &GridFeatures,
        order: &IterationOrder,
        policy: &TurnPolicy,
        turn: u32,
        config: &EngineConfig,
    ) -> Self {
        let unreached = config.analysis.unreached_distance;
        let coverage = config.analysis.floodfill_coverage;
        let open = CoordSet::new();
        let bfs = |sources: &CoordSet| bfs_distance(sources, &open, order, unreached);
        let union = |a: &CoordSet, b: &CoordSet| -> CoordSet { a.union(b).copied().collect() };

        let f = features;
        let player_assets = union(&f.player_unit_set, &f.player_city_tile_set);
        let opponent_assets = union(&f.opponent_unit_set, &f.opponent_city_tile_set);
        let either_city = union(&f.player_city_tile_set, &f.opponent_city_tile_set);
        let mut structures_and_resources = either_city.clone();
        structures_and_resources.extend(&f.wood_tiles);
        structures_and_resources.extend(&f.coal_tiles);
        structures_and_resources.extend(&f.uranium_tiles);

        let floodfill_by_player_city = floodfill(&f.player_city_tile_set, order, coverage);
        let floodfill_by_opponent_city = floodfill(&f.opponent_city_tile_set, order, coverage);
        let floodfill_by_either_city = floodfill(&either_city, order, coverage);
        let floodfill_by_empty = floodfill(&structures_and_resources, order, coverage);

        let from_opponent_units = bfs(&f.opponent_unit_set);
        let from_floodfill_by_empty = if policy.early_floodfill(turn) {
            bfs(&f.buildable_tiles)
        } else {
            bfs(&floodfill_by_empty)
        };

        let (from_resource_mean, resource_mean) = mean_field(&f.collectable_tiles, order);
        let (from_resource_median, resource_median) = median_field(&f.collectable_tiles, order);
        let (from_player_unit_median, player_unit_median) =
            median_field(&f.player_unit_set, order);
        let (from_player_city_median, player_city_median) =
            median_field(&f.player_city_tile_set, order);
        let (from_preferred_median, preferred_median) =
            median_field(&f.preferred_buildable_tiles, order);

        let opponent_unit_adjacent: CoordSet = order
            .coords()
            .filter(|c| from_opponent_units[*c] == 1)
            .collect();
        let opponent_unit_adjacent_and_buildable = opponent_unit_adjacent
            .intersection(&f.buildable_tiles)
            .copied()
            .collect();
        let opponent_unit_adjacent_and_player_city = opponent_unit_adjacent
            .intersection(&f.player_city_tile_set)
            .copied()
            .collect();

        Self {
            from_edge: edge_distance(order),
            from_collectable: bfs(&f.collectable_tiles),
            from_collectable_projected: bfs(&f.collectable_projected_tiles),
            from_player_assets: bfs(&player_assets),
            from_opponent_assets: bfs(&opponent_assets),
            from_player_units: bfs(&f.player_unit_set),
            from_opponent_units,
            from_player_city_tiles: bfs(&f.player_city_tile_set),
            from_opponent_city_tiles: bfs(&f.opponent_city_tile_set),
            from_buildable: bfs(&f.buildable_tiles),
            from_empty: bfs(&f.empty_tiles),
            from_wood: bfs(&f.wood_tiles),
            from_preferred_buildable: bfs(&f.preferred_buildable_tiles),
            from_probably_buildable: bfs(&f.probably_buildable_tiles),
            from_floodfill_by_player_city: bfs(&floodfill_by_player_city),
            from_floodfill_by_opponent_city: bfs(&floodfill_by_opponent_city),
            from_floodfill_by_either_city: bfs(&floodfill_by_either_city),
            from_floodfill_by_empty,
            floodfill_by_player_city,
            floodfill_by_opponent_city,
            floodfill_by_either_city,
            floodfill_by_empty,
            resource_mean,
            from_resource_mean,
            resource_median,
            from_resource_median,
            player_unit_median,
            from_player_unit_median,
            player_city_median,
            from_player_city_median,
            preferred_median,
            from_preferred_median,
            opponent_unit_adjacent,
            opponent_unit_adjacent_and_buildable,
            opponent_unit_adjacent_and_player_city,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[(i32, i32)]) -> CoordSet {
        points.iter().map(|&p| Coord::from(p)).collect()
    }

    #[test]
    fn test_bfs_matches_manhattan_on_open_grid() {
        let order = IterationOrder::ascending(9, 7);
        let source = Coord::new(3, 2);
        let field = bfs_distance(&set(&[(3, 2)]), &CoordSet::new(), &order, 99);
        for c in order.coords() {
            assert_eq!(field[c], c.distance(source), "at {:?}", c);
        }
    }

    #[test]
    fn test_bfs_takes_nearest_source() {
        let order = IterationOrder::ascending(10, 1);
        let field = bfs_distance(&set(&[(0, 0), (9, 0)]), &CoordSet::new(), &order, 99);
        assert_eq!(field[Coord::new(4, 0)], 4);
        assert_eq!(field[Coord::new(5, 0)], 4);
    }

    #[test]
    fn test_bfs_unreached_keeps_sentinel() {
        let order = IterationOrder::ascending(5, 3);
        let wall = set(&[(2, 0), (2, 1), (2, 2)]);
        let field = bfs_distance(&set(&[(0, 1)]), &wall, &order, 99);
        assert_eq!(field[Coord::new(1, 1)], 1);
        assert_eq!(field[Coord::new(4, 1)], 99);
        assert_eq!(field[Coord::new(2, 1)], 99);

        let empty = bfs_distance(&CoordSet::new(), &CoordSet::new(), &order, 99);
        assert!(empty.values().all(|v| *v == 99));
    }

    #[test]
    fn test_floodfill_without_blockers_covers_map() {
        let order = IterationOrder::ascending(6, 4);
        let filled = floodfill(&CoordSet::new(), &order, 0.7);
        assert_eq!(filled.len(), 24);
    }

    #[test]
    fn test_floodfill_keeps_both_halves_of_split_map() {
        let order = IterationOrder::ascending(9, 4);
        let wall: CoordSet = (0..4).map(|y| Coord::new(4, y)).collect();
        let filled = floodfill(&wall, &order, 0.7);
        assert_eq!(filled.len(), 32);
        assert!(!filled.contains(&Coord::new(4, 0)));
    }

    #[test]
    fn test_floodfill_drops_small_pocket() {
        let order = IterationOrder::ascending(8, 8);
        // seal off the corner tile
        let blockers = set(&[(1, 0), (0, 1)]);
        let filled = floodfill(&blockers, &order, 0.7);
        assert_eq!(filled.len(), 61);
        assert!(!filled.contains(&Coord::new(0, 0)));
    }

    #[test]
    fn test_median_averages_middle_pair() {
        let order = IterationOrder::ascending(10, 10);
        let (field, centre) = median_field(&set(&[(1, 2), (4, 2), (6, 2), (9, 2)]), &order);
        assert_eq!(centre, Coord::new(5, 2));
        assert_eq!(field[Coord::new(5, 2)], 0.0);
        assert_eq!(field[Coord::new(5, 3)], 1.0);
    }

    #[test]
    fn test_median_resists_outlier_where_mean_does_not() {
        let order = IterationOrder::ascending(20, 1);
        let points = set(&[(1, 0), (2, 0), (19, 0)]);
        let (_, median) = median_field(&points, &order);
        let (_, mean) = mean_field(&points, &order);
        assert_eq!(median, Coord::new(2, 0));
        assert_eq!(mean, Coord::new(7, 0));
    }

    #[test]
    fn test_empty_centres_default_to_origin() {
        let order = IterationOrder::ascending(4, 4);
        let (field, centre) = mean_field(&CoordSet::new(), &order);
        assert_eq!(centre, Coord::new(0, 0));
        assert!(field.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_edge_distance() {
        let order = IterationOrder::ascending(5, 3);
        let field = edge_distance(&order);
        assert_eq!(field[Coord::new(0, 0)], 0);
        assert_eq!(field[Coord::new(2, 1)], 3);
        assert_eq!(field[Coord::new(4, 1)], 1);
    }
}
