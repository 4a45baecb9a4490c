//! Dense per-tile feature matrices and the coordinate sets derived from them

use crate::config::EngineConfig;
use crate::policy::ResearchLevel;
use crate::spatial::{out_of_map_ring, Coord, CoordSet, Grid, IterationOrder};
use crate::world::{ResourceKind, TurnState};

/// Matrices and sets rebuilt from scratch every turn.
#[derive(Debug, Clone)]
pub struct GridFeatures {
    pub research: ResearchLevel,
    pub projected_research: ResearchLevel,

    pub wood_amount: Grid<i32>,
    pub coal_amount: Grid<i32>,
    pub uranium_amount: Grid<i32>,
    pub all_resource_amount: Grid<i32>,

    pub player_city_tiles: Grid<i32>,
    pub opponent_city_tiles: Grid<i32>,
    pub player_units: Grid<i32>,
    pub opponent_units: Grid<i32>,

    /// No unit, no resource and no city tile.
    pub empty: Grid<i32>,
    /// No resource and no city tile; a unit may stand there.
    pub buildable: Grid<i32>,
    pub probably_buildable: Grid<i32>,
    pub preferred_buildable: Grid<i32>,
    pub road_level: Grid<f64>,

    pub wood_exists: Grid<i32>,
    pub coal_exists: Grid<i32>,
    pub uranium_exists: Grid<i32>,
    pub all_resource_exists: Grid<i32>,
    pub convolved_wood_exists: Grid<i32>,
    pub convolved_coal_exists: Grid<i32>,
    pub convolved_uranium_exists: Grid<i32>,

    pub collectable: Grid<i32>,
    pub collectable_projected: Grid<i32>,
    pub convolved_collectable: Grid<i32>,
    pub convolved_collectable_projected: Grid<i32>,

    /// Resource a worker could gather per turn when standing on the tile.
    pub resource_collection_rate: Grid<i32>,
    /// The same, converted to fuel.
    pub fuel_collection_rate: Grid<i32>,

    /// Positive on empty tiles beside the resource.
    pub wood_side: Grid<i32>,
    pub coal_side: Grid<i32>,
    pub uranium_side: Grid<i32>,

    pub convolved_opponent_assets: Grid<i32>,
    pub convolved_two_opponent_assets: Grid<i32>,

    /// Per own city tile, the owning city's outstanding fuel need.
    pub city_fuel_needed_for_game: Grid<i32>,
    pub city_fuel_needed_for_night: Grid<i32>,

    pub map_resource_count: i64,

    pub wood_tiles: CoordSet,
    pub coal_tiles: CoordSet,
    pub uranium_tiles: CoordSet,
    pub player_city_tile_set: CoordSet,
    pub opponent_city_tile_set: CoordSet,
    pub player_unit_set: CoordSet,
    pub opponent_unit_set: CoordSet,
    pub empty_tiles: CoordSet,
    pub buildable_tiles: CoordSet,
    pub probably_buildable_tiles: CoordSet,
    pub preferred_buildable_tiles: CoordSet,
    pub collectable_tiles: CoordSet,
    pub convolved_collectable_tiles: CoordSet,
    pub collectable_projected_tiles: CoordSet,
    pub convolved_collectable_projected_tiles: CoordSet,
    pub buildable_and_convolved_collectable: CoordSet,
    pub opponent_units_moveable: CoordSet,
    pub out_of_map: CoordSet,
    /// Tiles a path should treat as blocked, before sinking cities are added.
    pub occupied: CoordSet,
}

impl GridFeatures {
    pub fn build(state: &TurnState, order: &IterationOrder, config: &EngineConfig) -> Self {
        let rules = &config.rules;
        let (width, height) = (state.width(), state.height());
        let zeros = Grid::new(width, height, 0i32);

        let mut wood_amount = zeros.clone();
        let mut coal_amount = zeros.clone();
        let mut uranium_amount = zeros.clone();
        let mut player_city_tiles = zeros.clone();
        let mut opponent_city_tiles = zeros.clone();
        let mut player_units = zeros.clone();
        let mut opponent_units = zeros.clone();
        let mut no_structure = zeros.clone();
        let mut road_level = Grid::new(width, height, 0.0f64);

        let me = state.player().team;
        for c in order.coords() {
            let Some(cell) = state.cell(c) else { continue };
            road_level[c] = cell.road;
            match (cell.resource, &cell.citytile) {
                (Some(resource), _) if resource.amount > 0 => {
                    let target = match resource.kind {
                        ResourceKind::Wood => &mut wood_amount,
                        ResourceKind::Coal => &mut coal_amount,
                        ResourceKind::Uranium => &mut uranium_amount,
                    };
                    target[c] += resource.amount;
                }
                (_, Some(tile)) if tile.team == me => player_city_tiles[c] += 1,
                (_, Some(_)) => opponent_city_tiles[c] += 1,
                _ => no_structure[c] = 1,
            }
        }
        for unit in &state.player().units {
            player_units[unit.pos] += 1;
        }
        for unit in &state.opponent().units {
            opponent_units[unit.pos] += 1;
        }

        let all_resource_amount = &(&wood_amount + &coal_amount) + &uranium_amount;
        let any_unit = (&player_units + &opponent_units).exists();
        let buildable = no_structure;
        let empty = buildable.zip_with(&any_unit, |b, u| i32::from(*b > 0 && *u == 0));

        let wood_exists = wood_amount.exists();
        let coal_exists = coal_amount.exists();
        let uranium_exists = uranium_amount.exists();
        let all_resource_exists = all_resource_amount.exists();
        let convolved_wood_exists = wood_exists.convolve4();
        let convolved_coal_exists = coal_exists.convolve4();
        let convolved_uranium_exists = uranium_exists.convolve4();

        let research = ResearchLevel::new(state.player().research_points);
        let projected_research = research.projected(config.analysis.research_projection_margin);

        let mut collectable = zeros.clone();
        let mut collectable_projected = zeros.clone();
        let mut collection_weighted = zeros.clone();
        let mut fuel_weighted = zeros.clone();
        for (kind, exists, convolved) in [
            (ResourceKind::Wood, &wood_exists, &convolved_wood_exists),
            (ResourceKind::Coal, &coal_exists, &convolved_coal_exists),
            (ResourceKind::Uranium, &uranium_exists, &convolved_uranium_exists),
        ] {
            let rule = kind.rule(rules);
            if research.can_collect(kind, rules) {
                collectable = &collectable + exists;
                collection_weighted = &collection_weighted + &(convolved * rule.collection_rate);
                fuel_weighted =
                    &fuel_weighted + &(convolved * (rule.collection_rate * rule.fuel_rate));
            }
            if projected_research.can_collect(kind, rules) {
                collectable_projected = &collectable_projected + exists;
            }
        }
        let convolved_collectable = collectable.convolve4();
        let convolved_collectable_projected = collectable_projected.convolve4();
        let resource_collection_rate = collection_weighted.convolve4();
        let fuel_collection_rate = fuel_weighted.convolve4();

        let wood_side = convolved_wood_exists.masked(&empty);
        let coal_side = convolved_coal_exists.masked(&empty);
        let uranium_side = convolved_uranium_exists.masked(&empty);

        let opponent_assets = &opponent_units + &opponent_city_tiles;
        let convolved_opponent_assets = opponent_assets.convolve4();
        let convolved_two_opponent_assets = opponent_assets.convolve12();

        let mut city_fuel_needed_for_game = zeros.clone();
        let mut city_fuel_needed_for_night = zeros.clone();
        for city in state.player().cities.values() {
            for &tile in &city.tiles {
                city_fuel_needed_for_game[tile] = city.fuel_needed_for_game;
                city_fuel_needed_for_night[tile] = city.fuel_needed_for_night;
            }
        }

        let map_resource_count = all_resource_amount.sum();

        let set_of = |grid: &Grid<i32>| grid.positive_set(order.coords());
        let wood_tiles = set_of(&wood_exists);
        let coal_tiles = set_of(&coal_exists);
        let uranium_tiles = set_of(&uranium_exists);
        let player_city_tile_set = set_of(&player_city_tiles);
        let opponent_city_tile_set = set_of(&opponent_city_tiles);
        let player_unit_set = set_of(&player_units);
        let opponent_unit_set = set_of(&opponent_units);
        let empty_tiles = set_of(&empty);
        let buildable_tiles = set_of(&buildable);
        let collectable_tiles = set_of(&collectable);
        let convolved_collectable_tiles = set_of(&convolved_collectable);
        let collectable_projected_tiles = set_of(&collectable_projected);
        let convolved_collectable_projected_tiles = set_of(&convolved_collectable_projected);

        let mut probably_buildable = zeros.clone();
        let mut preferred_buildable = zeros;
        for c in order.coords() {
            if player_city_tiles[c] == 0 {
                continue;
            }
            let Some(city) = state.city_at(c) else { continue };
            let surplus = city.fuel_needed_for_night <= config.analysis.preferred_surplus_threshold;
            for n in order.neighbours(c) {
                if buildable[n] > 0 {
                    probably_buildable[n] = 1;
                    if surplus {
                        preferred_buildable[n] = 1;
                    }
                }
            }
        }
        let probably_buildable_tiles = set_of(&probably_buildable);
        let preferred_buildable_tiles = set_of(&preferred_buildable);

        let buildable_and_convolved_collectable: CoordSet = buildable_tiles
            .intersection(&convolved_collectable_tiles)
            .filter(|c| !opponent_unit_set.contains(c))
            .copied()
            .collect();

        let opponent_units_moveable: CoordSet = state
            .opponent()
            .units
            .iter()
            .filter(|unit| {
                let about_to_build = buildable_tiles.contains(&unit.pos)
                    && unit.cargo.total() == rules.worker_cargo_capacity;
                unit.can_act() && !about_to_build
            })
            .map(|unit| unit.pos)
            .collect();

        let out_of_map = out_of_map_ring(width, height);

        let mut occupied: CoordSet = player_unit_set
            .iter()
            .chain(&opponent_unit_set)
            .chain(&opponent_city_tile_set)
            .chain(&out_of_map)
            .filter(|c| !player_city_tile_set.contains(c) && !opponent_units_moveable.contains(c))
            .copied()
            .collect();
        for unit in &state.opponent().units {
            let idle = !convolved_collectable_tiles.contains(&unit.pos)
                && !opponent_city_tile_set.contains(&unit.pos);
            if unit.can_act() && idle {
                occupied.remove(&unit.pos);
            }
        }

        Self {
            research,
            projected_research,
            wood_amount,
            coal_amount,
            uranium_amount,
            all_resource_amount,
            player_city_tiles,
            opponent_city_tiles,
            player_units,
            opponent_units,
            empty,
            buildable,
            probably_buildable,
            preferred_buildable,
            road_level,
            wood_exists,
            coal_exists,
            uranium_exists,
            all_resource_exists,
            convolved_wood_exists,
            convolved_coal_exists,
            convolved_uranium_exists,
            collectable,
            collectable_projected,
            convolved_collectable,
            convolved_collectable_projected,
            resource_collection_rate,
            fuel_collection_rate,
            wood_side,
            coal_side,
            uranium_side,
            convolved_opponent_assets,
            convolved_two_opponent_assets,
            city_fuel_needed_for_game,
            city_fuel_needed_for_night,
            map_resource_count,
            wood_tiles,
            coal_tiles,
            uranium_tiles,
            player_city_tile_set,
            opponent_city_tile_set,
            player_unit_set,
            opponent_unit_set,
            empty_tiles,
            buildable_tiles,
            probably_buildable_tiles,
            preferred_buildable_tiles,
            collectable_tiles,
            convolved_collectable_tiles,
            collectable_projected_tiles,
            convolved_collectable_projected_tiles,
            buildable_and_convolved_collectable,
            opponent_units_moveable,
            out_of_map,
            occupied,
        }
    }

    pub fn is_player_city(&self, c: Coord) -> bool {
        self.player_city_tile_set.contains(&c)
    }

    pub fn is_opponent_city(&self, c: Coord) -> bool {
        self.opponent_city_tile_set.contains(&c)
    }

    /// Convolved existence of the resource type, which is what a worker
    /// standing on the tile can reach.
    pub fn convolved_exists(&self, kind: ResourceKind) -> &Grid<i32> {
        match kind {
            ResourceKind::Wood => &self.convolved_wood_exists,
            ResourceKind::Coal => &self.convolved_coal_exists,
            ResourceKind::Uranium => &self.convolved_uranium_exists,
        }
    }
}
