//! Unit missions carried across turns and the rules that retire them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clusters::ResourceClusters;
use crate::config::{EngineConfig, RulesConfig};
use crate::features::GridFeatures;
use crate::policy::{ResearchLevel, TurnPolicy};
use crate::spatial::{Coord, CoordSet};
use crate::world::TurnState;

/// Detail tag of a mission bringing fuel home to a city.
pub const HOMING: &str = "homing";
/// Detail tag of a mission handed to a unit on the turn it was built.
pub const BORN: &str = "born";

const CITY_FOUNDING_PREFIX: &str = "bcity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub unit_id: String,
    pub target: Coord,
    /// Intended action at the target; city founding actions start with `bcity`.
    #[serde(default)]
    pub action: String,
    /// Free-form tag that shields the mission from some pruning rules.
    #[serde(default)]
    pub details: String,
    pub delays: f64,
}

impl Mission {
    /// A mission starts with twice `delay_budget` delay points.
    pub fn new(
        unit_id: impl Into<String>,
        target: Coord,
        action: impl Into<String>,
        details: impl Into<String>,
        delay_budget: f64,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            target,
            action: action.into(),
            details: details.into(),
            delays: 2.0 * delay_budget,
        }
    }

    pub fn is_city_founding(&self) -> bool {
        self.action.starts_with(CITY_FOUNDING_PREFIX)
    }

    pub fn is_homing(&self) -> bool {
        self.details == HOMING
    }

    pub fn is_born(&self) -> bool {
        self.details == BORN
    }

    pub fn is_stalled(&self) -> bool {
        self.delays <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneReason {
    UnitGone,
    FoundingWithoutCargo,
    TargetTakenByOpponent,
    TargetAlreadyOwnCity,
    UnitInsideCity,
    TargetDepleted,
    HomeRefuelled,
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PruneReason::UnitGone => "unit no longer exists",
            PruneReason::FoundingWithoutCargo => "city founding without cargo",
            PruneReason::TargetTakenByOpponent => "opponent built on target",
            PruneReason::TargetAlreadyOwnCity => "target is already an own city",
            PruneReason::UnitInsideCity => "unit is inside an own city",
            PruneReason::TargetDepleted => "target no longer collectable",
            PruneReason::HomeRefuelled => "home city needs no more fuel",
        };
        f.write_str(text)
    }
}

/// One mission per unit, keyed by unit id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionStore {
    missions: BTreeMap<String, Mission>,
    /// Research points seen on the previous refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_research: Option<i32>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any mission the unit already had.
    pub fn add(&mut self, mission: Mission) {
        self.missions.insert(mission.unit_id.clone(), mission);
    }

    pub fn get(&self, unit_id: &str) -> Option<&Mission> {
        self.missions.get(unit_id)
    }

    pub fn get_mut(&mut self, unit_id: &str) -> Option<&mut Mission> {
        self.missions.get_mut(unit_id)
    }

    pub fn remove(&mut self, unit_id: &str) -> Option<Mission> {
        self.missions.remove(unit_id)
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.missions.contains_key(unit_id)
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values()
    }

    pub fn target_of(&self, unit_id: &str) -> Option<Coord> {
        self.get(unit_id).map(|mission| mission.target)
    }

    pub fn targets(&self) -> Vec<Coord> {
        self.iter().map(|mission| mission.target).collect()
    }

    pub fn targets_and_actions(&self) -> Vec<(Coord, &str)> {
        self.iter()
            .map(|mission| (mission.target, mission.action.as_str()))
            .collect()
    }

    /// Missions whose delay counter ran out. Only a signal for the planner.
    pub fn stalled(&self) -> Vec<&Mission> {
        self.iter().filter(|mission| mission.is_stalled()).collect()
    }

    /// Removes missions that no longer make sense this turn. Units listed in
    /// `ejected` were pushed into a city this turn and keep their mission.
    pub fn prune(
        &mut self,
        state: &TurnState,
        features: &GridFeatures,
        ejected: &HashSet<String>,
    ) -> Vec<(String, PruneReason)> {
        let mut pruned = Vec::new();
        let unit_ids: Vec<String> = self.missions.keys().cloned().collect();
        for unit_id in unit_ids {
            let Some(mission) = self.missions.get(&unit_id) else {
                continue;
            };
            let reason = prune_reason(mission, state, features, ejected);
            if let Some(reason) = reason {
                debug!(
                    unit = %unit_id,
                    x = mission.target.x,
                    y = mission.target.y,
                    %reason,
                    "dropping mission"
                );
                self.missions.remove(&unit_id);
                pruned.push((unit_id, reason));
            }
        }
        pruned
    }

    /// Charges the turn's delay to every unit that has not reached its
    /// target yet.
    pub fn decay_delays(&mut self, state: &TurnState, policy: &TurnPolicy) {
        let decay = policy.delay_decay(state.turn);
        for unit in &state.player().units {
            if let Some(mission) = self.missions.get_mut(&unit.id) {
                if mission.target != unit.pos {
                    mission.delays -= decay;
                }
            }
        }
    }

    /// Runs the research reset on the turn research unlocks coal or uranium.
    /// The first call only records the level.
    pub fn observe_research(
        &mut self,
        research: ResearchLevel,
        features: &GridFeatures,
        rules: &RulesConfig,
    ) -> Vec<String> {
        let Some(previous) = self.last_research.replace(research.points) else {
            return Vec::new();
        };
        if ResearchLevel::new(previous).frontier(rules) == research.frontier(rules) {
            return Vec::new();
        }
        self.drop_outdated_for_research(research, features, rules)
    }

    /// Drops missions aimed at tiles out of reach of the highest unlocked
    /// resource so they get re-planned.
    pub fn drop_outdated_for_research(
        &mut self,
        research: ResearchLevel,
        features: &GridFeatures,
        rules: &RulesConfig,
    ) -> Vec<String> {
        let Some(kind) = research.frontier(rules) else {
            return Vec::new();
        };
        let reach = features.convolved_exists(kind);
        let mut dropped = Vec::new();
        self.missions.retain(|unit_id, mission| {
            let keep = reach.get(mission.target).map_or(false, |v| *v > 0);
            if !keep {
                dropped.push(unit_id.clone());
            }
            keep
        });
        if !dropped.is_empty() {
            debug!(count = dropped.len(), ?kind, "dropped missions after research");
        }
        dropped
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json().context("Failed to encode missions")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write missions to {}", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read missions from {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

fn prune_reason(
    mission: &Mission,
    state: &TurnState,
    features: &GridFeatures,
    ejected: &HashSet<String>,
) -> Option<PruneReason> {
    let Some(unit) = state.player().unit(&mission.unit_id) else {
        return Some(PruneReason::UnitGone);
    };
    if mission.is_city_founding() && unit.cargo.is_empty() {
        return Some(PruneReason::FoundingWithoutCargo);
    }
    if features.is_opponent_city(mission.target) {
        return Some(PruneReason::TargetTakenByOpponent);
    }
    if features.is_player_city(mission.target) && !mission.is_homing() {
        return Some(PruneReason::TargetAlreadyOwnCity);
    }
    if features.is_player_city(unit.pos) && !mission.is_born() && !ejected.contains(&unit.id) {
        return Some(PruneReason::UnitInsideCity);
    }
    if !features
        .convolved_collectable_projected_tiles
        .contains(&mission.target)
        && mission.details.is_empty()
    {
        return Some(PruneReason::TargetDepleted);
    }
    if mission.is_homing() {
        let need = features
            .city_fuel_needed_for_game
            .get(mission.target)
            .copied()
            .unwrap_or(0);
        if need <= 0 {
            return Some(PruneReason::HomeRefuelled);
        }
    }
    None
}

/// What the current missions aim at, resolved against this turn's clusters.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    pub targeted_leaders: CoordSet,
    /// Targeted clusters that are worth anything.
    pub targeted_cluster_count: usize,
    /// Targets of missions whose unit is already close, minus own city tiles.
    pub targeted_tiles: CoordSet,
    /// Targets of city founding missions, minus own city tiles.
    pub founding_targets: CoordSet,
    pub leader_to_locating_units: BTreeMap<Coord, BTreeSet<String>>,
    pub leader_to_targeting_units: BTreeMap<Coord, BTreeSet<String>>,
}

impl TargetIndex {
    pub fn build(
        missions: &MissionStore,
        state: &TurnState,
        features: &GridFeatures,
        clusters: &ResourceClusters,
        config: &EngineConfig,
    ) -> Self {
        let radius = config.analysis.targeted_mission_radius;
        let own_city = |c: &Coord| features.is_player_city(*c);

        let targeted_leaders: CoordSet = missions
            .targets()
            .into_iter()
            .map(|target| clusters.leader(target))
            .collect();
        let targeted_cluster_count = targeted_leaders
            .iter()
            .filter(|leader| clusters.point(**leader) > 0)
            .count();

        let targeted_tiles = missions
            .iter()
            .filter(|mission| {
                state
                    .player()
                    .unit(&mission.unit_id)
                    .map_or(false, |unit| unit.pos.distance(mission.target) <= radius)
            })
            .map(|mission| mission.target)
            .filter(|c| !own_city(c))
            .collect();

        let founding_targets = missions
            .iter()
            .filter(|mission| mission.is_city_founding())
            .map(|mission| mission.target)
            .filter(|c| !own_city(c))
            .collect();

        let mut leader_to_locating_units: BTreeMap<Coord, BTreeSet<String>> = BTreeMap::new();
        for unit in &state.player().units {
            leader_to_locating_units
                .entry(clusters.leader(unit.pos))
                .or_default()
                .insert(unit.id.clone());
        }

        let mut leader_to_targeting_units: BTreeMap<Coord, BTreeSet<String>> = BTreeMap::new();
        for mission in missions.iter() {
            leader_to_targeting_units
                .entry(clusters.leader(mission.target))
                .or_default()
                .insert(mission.unit_id.clone());
        }

        Self {
            targeted_leaders,
            targeted_cluster_count,
            targeted_tiles,
            founding_targets,
            leader_to_locating_units,
            leader_to_targeting_units,
        }
    }

    pub fn is_targeted(&self, leader: Coord) -> bool {
        self.targeted_leaders.contains(&leader)
    }
}
