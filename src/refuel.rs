//! Choosing which own city a unit should carry fuel to.

use crate::pathing::PathCache;
use crate::policy::DayCycle;
use crate::spatial::{Coord, IterationOrder};
use crate::world::{TurnState, Unit};

/// Fuel potential at which a unit is treated as carrying unlimited fuel.
const BOTTOMLESS_FUEL: i32 = 90 * 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RefuelQuery {
    /// Skip tiles the unit cannot reach within its travel range.
    pub require_reachable: bool,
    /// Skip cities whose coming night the unit's fuel cannot cover.
    pub require_night: bool,
    /// Rank cities that would go dark tonight ahead of the rest.
    pub prefer_night: bool,
    /// Only consider cities that would go dark tonight.
    pub enforce_night: bool,
    /// Extra turns of upkeep added to the night checks.
    pub enforce_night_margin: i32,
    pub minimum_size: usize,
    pub maximum_distance: i32,
    /// Measure with the weighted path cache instead of Manhattan distance.
    pub exact: bool,
    /// Also skip cities expected to go dark before the unit arrives.
    /// Off by default, matching the behaviour the planner was tuned with.
    pub guard_city_survival: bool,
}

impl Default for RefuelQuery {
    fn default() -> Self {
        Self {
            require_reachable: true,
            require_night: false,
            prefer_night: true,
            enforce_night: false,
            enforce_night_margin: 0,
            minimum_size: 0,
            maximum_distance: 100,
            exact: false,
            guard_city_survival: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefuelTarget {
    pub distance: i32,
    pub position: Coord,
}

fn bit_length(n: usize) -> i32 {
    (usize::BITS - n.leading_zeros()) as i32
}

/// Best own city tile for `unit` to deliver fuel to, among cities whose
/// reserve does not last the remaining nights. Bigger cities (by bit length
/// of their tile count) rank first, then those that would otherwise go dark
/// tonight, then the nearest tile. Equal ranks keep the first tile found
/// walking cities and their tiles in iteration order.
pub fn nearest_city_requiring_fuel(
    state: &TurnState,
    order: &IterationOrder,
    cycle: &DayCycle,
    paths: &mut PathCache,
    unit: &Unit,
    query: &RefuelQuery,
) -> Option<RefuelTarget> {
    let turn = state.turn;
    let nights_left = cycle.night_turns_left(turn) as i32;
    let fuel_potential = if unit.fuel_potential >= BOTTOMLESS_FUEL {
        i32::MAX
    } else {
        unit.fuel_potential
    };

    let mut cities: Vec<_> = state
        .player()
        .cities
        .values()
        .filter(|city| !city.tiles.is_empty())
        .map(|city| {
            let mut tiles = city.tiles.clone();
            tiles.sort_by_key(|t| order.sort_key(*t));
            (city, tiles)
        })
        .collect();
    cities.sort_by_key(|(_, tiles)| order.sort_key(tiles[0]));

    let mut best: Option<((i32, i32), Coord)> = None;
    for (city, tiles) in cities {
        if tiles.len() < query.minimum_size || city.night_fuel_duration >= nights_left {
            continue;
        }
        let margin = query.enforce_night_margin * city.light_upkeep;
        for tile in tiles {
            let distance = paths.retrieve_distance(unit.pos, tile, query.exact);
            let mut rank = -bit_length(city.tiles.len());

            if query.require_reachable {
                let survives_until = cycle.turns_to_night(turn) as i32
                    + (city.night_fuel_duration / 10) * 40
                    + city.night_fuel_duration;
                if query.guard_city_survival && distance * 2 >= survives_until {
                    continue;
                }
                if distance >= unit.travel_range {
                    continue;
                }
            }
            if query.require_night && fuel_potential < city.fuel_needed_for_night + margin {
                continue;
            }
            if distance > query.maximum_distance {
                continue;
            }
            if query.prefer_night && city.fuel_needed_for_night > 0 {
                rank -= 2;
            }
            if query.enforce_night && city.fuel_needed_for_night - margin < 0 {
                continue;
            }

            let key = (rank, distance);
            if best.map_or(true, |(current, _)| key < current) {
                best = Some((key, tile));
            }
        }
    }
    best.map(|((_, distance), position)| RefuelTarget { distance, position })
}
