use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info};

use crate::advisories::Advisories;
use crate::clusters::ResourceClusters;
use crate::config::EngineConfig;
use crate::distance::DistanceFields;
use crate::error::{EngineError, OrderError};
use crate::features::GridFeatures;
use crate::missions::{MissionStore, PruneReason, TargetIndex};
use crate::pathing::PathCache;
use crate::policy::{ResearchLevel, TurnPolicy};
use crate::refuel::{nearest_city_requiring_fuel, RefuelQuery, RefuelTarget};
use crate::spatial::{Coord, CoordSet, IterationOrder};
use crate::world::{Player, TurnState, Unit};

/// Match-scoped analysis engine. Holds the iteration order fixed at match
/// start and turns each [`TurnState`] into a [`TurnAnalysis`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    policy: TurnPolicy,
    order: IterationOrder,
}

impl Engine {
    pub fn new(config: EngineConfig, order: IterationOrder) -> Self {
        let policy = TurnPolicy::new(&config);
        Self {
            config,
            policy,
            order,
        }
    }

    /// Derives the iteration order from the opening city tile of each side.
    pub fn for_match(config: EngineConfig, state: &TurnState) -> Result<Self, EngineError> {
        let player = opening(state.player()).ok_or(OrderError::MissingOpening { side: "player" })?;
        let opponent =
            opening(state.opponent()).ok_or(OrderError::MissingOpening { side: "opponent" })?;
        let order = IterationOrder::from_openings(state.width(), state.height(), player, opponent)?;
        info!(
            width = state.width(),
            height = state.height(),
            x_mirrored = order.is_x_mirrored(),
            y_mirrored = order.is_y_mirrored(),
            "iteration order fixed"
        );
        Ok(Self::new(config, order))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    pub fn order(&self) -> &IterationOrder {
        &self.order
    }

    /// Runs the feature, cluster, distance and advisory stages for one turn.
    ///
    /// Panics if the map size differs from the one the engine was built for.
    pub fn analyze(&self, state: &TurnState) -> TurnAnalysis {
        assert!(
            state.width() == self.order.width() && state.height() == self.order.height(),
            "turn map is {}x{} but the match map is {}x{}",
            state.width(),
            state.height(),
            self.order.width(),
            self.order.height()
        );
        let config = &self.config;
        let turn = state.turn;
        let order = self.order.for_turn(turn);
        let mut reports = Vec::with_capacity(5);

        let features = timed(&mut reports, "features", || {
            GridFeatures::build(state, &order, config)
        });
        let mut clusters = timed(&mut reports, "clusters", || {
            ResourceClusters::build(&features, &order, config)
        });
        let fields = timed(&mut reports, "distances", || {
            DistanceFields::build(&features, &order, &self.policy, turn, config)
        });
        clusters.record_proximity(&features, &fields, &order);
        let advisories = timed(&mut reports, "advisories", || {
            Advisories::build(state, &features, &fields, &order, &self.policy, config)
        });

        let mut occupied = features.occupied.clone();
        occupied.extend(advisories.sinking_city_tiles.iter().copied());
        let paths = timed(&mut reports, "path_costs", || {
            PathCache::new(&features, &occupied, &order, config)
        });

        let total_ms: f64 = reports.iter().map(|r| r.duration_ms).sum();
        info!(
            turn,
            clusters = clusters.by_priority().len(),
            valuable = clusters.valuable_count(),
            sinking = advisories.sinking_cities.len(),
            total_ms,
            "turn analysed"
        );

        TurnAnalysis {
            turn,
            day: self.policy.cycle().is_day(turn),
            order,
            features,
            clusters,
            fields,
            advisories,
            occupied,
            paths,
            reports,
        }
    }

    /// Turn-boundary mission upkeep: research reset, pruning, delay decay,
    /// then the target index over what is left.
    pub fn refresh_missions(
        &self,
        analysis: &TurnAnalysis,
        missions: &mut MissionStore,
        state: &TurnState,
        ejected: &HashSet<String>,
    ) -> MissionRefresh {
        let research = ResearchLevel::new(state.player().research_points);
        let research_dropped =
            missions.observe_research(research, &analysis.features, &self.config.rules);
        let pruned = missions.prune(state, &analysis.features, ejected);
        missions.decay_delays(state, &self.policy);
        let stalled = missions
            .stalled()
            .into_iter()
            .map(|mission| mission.unit_id.clone())
            .collect();
        let index = TargetIndex::build(
            missions,
            state,
            &analysis.features,
            &analysis.clusters,
            &self.config,
        );
        debug!(
            turn = state.turn,
            remaining = missions.len(),
            pruned = pruned.len(),
            "missions refreshed"
        );
        MissionRefresh {
            research_dropped,
            pruned,
            stalled,
            index,
        }
    }
}

fn opening(player: &Player) -> Option<Coord> {
    player
        .cities
        .values()
        .find_map(|city| city.tiles.first().copied())
}

fn timed<T>(reports: &mut Vec<StageReport>, name: &'static str, stage: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = stage();
    let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
    debug!(stage = name, duration_ms, "stage finished");
    reports.push(StageReport { name, duration_ms });
    out
}

#[derive(Clone, Debug)]
pub struct StageReport {
    pub name: &'static str,
    pub duration_ms: f64,
}

/// Everything derived for one turn. Read-only apart from the lazily filled
/// path cache.
#[derive(Debug, Clone)]
pub struct TurnAnalysis {
    pub turn: u32,
    pub day: bool,
    /// The match order with this turn's direction rotation applied.
    pub order: IterationOrder,
    pub features: GridFeatures,
    pub clusters: ResourceClusters,
    pub fields: DistanceFields,
    pub advisories: Advisories,
    /// Tiles the path cache treats as blocked, sinking cities included.
    pub occupied: CoordSet,
    pub paths: PathCache,
    pub reports: Vec<StageReport>,
}

impl TurnAnalysis {
    pub fn total_ms(&self) -> f64 {
        self.reports.iter().map(|r| r.duration_ms).sum()
    }

    pub fn nearest_city_requiring_fuel(
        &mut self,
        state: &TurnState,
        policy: &TurnPolicy,
        unit: &Unit,
        query: &RefuelQuery,
    ) -> Option<RefuelTarget> {
        nearest_city_requiring_fuel(
            state,
            &self.order,
            policy.cycle(),
            &mut self.paths,
            unit,
            query,
        )
    }

    pub fn distance(&mut self, start: Coord, end: Coord, exact: bool) -> i32 {
        self.paths.retrieve_distance(start, end, exact)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissionRefresh {
    pub research_dropped: Vec<String>,
    pub pruned: Vec<(String, PruneReason)>,
    /// Units whose mission ran out of delay points.
    pub stalled: Vec<String>,
    pub index: TargetIndex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::{Mission, HOMING};
    use crate::world::{Cargo, City, ResourceKind, TurnStateBuilder, UnitKind};

    fn worker(id: &str, team: u8, x: i32, y: i32) -> Unit {
        Unit {
            id: id.to_string(),
            team,
            kind: UnitKind::Worker,
            pos: Coord::new(x, y),
            cooldown: 0.0,
            cargo: Cargo::default(),
            fuel_potential: 0,
            travel_range: 100,
        }
    }

    fn duel(turn: u32) -> TurnState {
        let mut builder = TurnStateBuilder::new(10, 10, 0).unwrap();
        builder
            .turn(turn)
            .resource(ResourceKind::Wood, Coord::new(2, 3), 300)
            .resource(ResourceKind::Wood, Coord::new(7, 6), 300)
            .city(City::new("c_1", 0, 0, 23))
            .city_tile(0, "c_1", Coord::new(2, 2), 0.0)
            .city(City::new("c_2", 1, 0, 23))
            .city_tile(1, "c_2", Coord::new(7, 7), 0.0)
            .unit(worker("u_1", 0, 3, 2))
            .unit(worker("u_2", 1, 6, 7));
        builder.build().unwrap()
    }

    #[test]
    fn test_for_match_mirrors_the_left_upper_player() {
        let engine = Engine::for_match(EngineConfig::default(), &duel(0)).unwrap();
        assert!(engine.order().is_x_mirrored());
        assert!(engine.order().is_y_mirrored());
    }

    #[test]
    fn test_for_match_requires_both_openings() {
        let mut builder = TurnStateBuilder::new(6, 6, 0).unwrap();
        builder
            .city(City::new("c_1", 0, 0, 23))
            .city_tile(0, "c_1", Coord::new(1, 1), 0.0);
        let state = builder.build().unwrap();
        let err = Engine::for_match(EngineConfig::default(), &state).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Order(OrderError::MissingOpening { side: "opponent" })
        ));
    }

    #[test]
    fn test_analyze_reports_every_stage() {
        let state = duel(5);
        let engine = Engine::for_match(EngineConfig::default(), &state).unwrap();
        let analysis = engine.analyze(&state);
        let names: Vec<_> = analysis.reports.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["features", "clusters", "distances", "advisories", "path_costs"]
        );
        assert!(analysis.day);
        assert_eq!(analysis.turn, 5);
        assert_eq!(analysis.order.dirs(), engine.order().for_turn(5).dirs());
        assert!(analysis.total_ms() >= 0.0);
        assert_eq!(analysis.fields.from_player_city_tiles[Coord::new(2, 3)], 1);
        assert_eq!(analysis.clusters.dist_from_player(Coord::new(2, 3)), 0);
    }

    #[test]
    #[should_panic]
    fn test_analyze_rejects_other_map_size() {
        let engine = Engine::new(EngineConfig::default(), IterationOrder::ascending(12, 12));
        engine.analyze(&duel(0));
    }

    #[test]
    fn test_sinking_city_blocks_paths_at_night() {
        let mut builder = TurnStateBuilder::new(10, 10, 0).unwrap();
        builder
            .turn(32)
            .city(City::new("c_1", 0, 0, 23))
            .city_tile(0, "c_1", Coord::new(2, 2), 0.0)
            .city(City::new("c_2", 1, 500, 23))
            .city_tile(1, "c_2", Coord::new(7, 7), 0.0);
        let state = builder.build().unwrap();
        let engine = Engine::for_match(EngineConfig::default(), &state).unwrap();
        let analysis = engine.analyze(&state);
        assert!(!analysis.day);
        assert_eq!(analysis.advisories.sinking_cities, vec!["c_1".to_string()]);
        assert!(analysis.occupied.contains(&Coord::new(2, 2)));
        assert!(!analysis.features.occupied.contains(&Coord::new(2, 2)));
        assert_eq!(analysis.paths.entry_cost(Coord::new(2, 2)), 10);
    }

    #[test]
    fn test_refresh_missions() {
        let state = duel(12);
        let engine = Engine::for_match(EngineConfig::default(), &state).unwrap();
        let mut missions = MissionStore::new();
        missions.add(Mission::new("u_1", Coord::new(2, 4), "", "", 99.0));
        missions.add(Mission::new("u_9", Coord::new(2, 4), "", "", 99.0));
        missions.add(Mission::new("u_1b", Coord::new(2, 2), "", HOMING, 99.0));
        let analysis = engine.analyze(&state);
        let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
        let pruned: Vec<_> = refresh.pruned.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(pruned, vec!["u_1b", "u_9"]);
        assert_eq!(missions.get("u_1").unwrap().delays, 197.0);
        assert!(refresh.stalled.is_empty());
        assert!(refresh.index.is_targeted(analysis.clusters.leader(Coord::new(2, 3))));
    }
}
