//! Advisory tile sets for the planner: cities that will go dark tonight and
//! places where building is currently a poor idea.

use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::distance::DistanceFields;
use crate::features::GridFeatures;
use crate::policy::TurnPolicy;
use crate::spatial::{CoordSet, IterationOrder};
use crate::world::{ResourceKind, TurnState};

#[derive(Debug, Clone, Default)]
pub struct Advisories {
    /// Ids of own cities that cannot pay tonight's upkeep.
    pub sinking_cities: Vec<String>,
    pub sinking_city_tiles: CoordSet,
    pub avoid_building_workers: CoordSet,
    pub avoid_building_citytiles: CoordSet,
}

impl Advisories {
    pub fn build(
        state: &TurnState,
        features: &GridFeatures,
        fields: &DistanceFields,
        order: &IterationOrder,
        policy: &TurnPolicy,
        config: &EngineConfig,
    ) -> Self {
        let mut advisories = Self::default();
        if !policy.cycle().is_day(state.turn) {
            advisories.find_sinking_cities(state, features, order);
        }
        if policy.worker_throttle(state.turn)
            && features
                .research
                .can_collect(ResourceKind::Uranium, &config.rules)
        {
            advisories.avoid_building_workers =
                worker_throttle_tiles(features, fields, order, config);
        }
        if policy.citytile_build_pause(state.turn) {
            advisories.avoid_building_citytiles = order
                .coords()
                .filter(|c| {
                    fields.from_player_city_tiles[*c] > 1
                        && features.fuel_collection_rate[*c] < config.rules.city_tile_upkeep
                })
                .collect();
        }
        advisories
    }

    /// A city sinks when its reserve, the best collection its helpers could
    /// manage on its tiles and everything those helpers carry still fall
    /// short of one turn of upkeep. Helpers are own units able to act on or
    /// beside the city.
    fn find_sinking_cities(
        &mut self,
        state: &TurnState,
        features: &GridFeatures,
        order: &IterationOrder,
    ) {
        let player = state.player();
        let mut cities: Vec<_> = player.cities.values().filter(|c| !c.tiles.is_empty()).collect();
        cities.sort_by_key(|city| {
            city.tiles
                .iter()
                .map(|t| order.sort_key(*t))
                .min()
                .unwrap_or((0, 0))
        });

        for city in cities {
            let mut rates = Vec::with_capacity(city.tiles.len());
            let mut helpers = BTreeSet::new();
            for &tile in &city.tiles {
                rates.push(features.fuel_collection_rate[tile]);
                for spot in std::iter::once(tile).chain(order.neighbours(tile)) {
                    for unit in player.units_at(spot).filter(|u| u.can_act()) {
                        helpers.insert(unit.id.as_str());
                    }
                }
            }
            rates.sort_unstable_by(|a, b| b.cmp(a));

            let collection: i32 = rates.iter().take(helpers.len()).sum();
            let injection: i32 = helpers
                .iter()
                .filter_map(|id| player.unit(id))
                .map(|unit| unit.fuel_potential)
                .sum();
            if city.fuel + collection + injection < city.light_upkeep {
                self.sinking_cities.push(city.id.clone());
                self.sinking_city_tiles.extend(city.tiles.iter().copied());
            }
        }
    }
}

/// Own city tiles where another worker would mostly crowd the ones already
/// nearby: no opponent close, own units close, and only thin or nearby wood.
fn worker_throttle_tiles(
    features: &GridFeatures,
    fields: &DistanceFields,
    order: &IterationOrder,
    config: &EngineConfig,
) -> CoordSet {
    let radius = config.analysis.worker_throttle_radius;
    let thin = config.analysis.thin_wood_threshold;
    let mut tiles = CoordSet::new();
    for c in order.coords() {
        if !features.is_player_city(c)
            || fields.from_opponent_assets[c] < radius
            || fields.from_player_units[c] >= radius
        {
            continue;
        }
        if fields.from_player_units[c] <= 1 && fields.from_wood[c] < radius {
            tiles.insert(c);
            continue;
        }
        let thin_wood_nearby = order.neighbours(c).any(|n| {
            let wood = features.wood_amount[n];
            wood > 0 && wood < thin
        });
        if thin_wood_nearby {
            tiles.insert(c);
        }
    }
    tiles
}
