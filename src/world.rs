//! Turn snapshot consumed by the analysis pipeline

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{ResourceRule, RulesConfig};
use crate::error::StateError;
use crate::policy::DayCycle;
use crate::spatial::{Coord, Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Wood,
    Coal,
    Uranium,
}

impl ResourceKind {
    pub fn rule(self, rules: &RulesConfig) -> &ResourceRule {
        match self {
            ResourceKind::Wood => &rules.wood,
            ResourceKind::Coal => &rules.coal,
            ResourceKind::Uranium => &rules.uranium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTile {
    pub city_id: String,
    pub team: u8,
    pub pos: Coord,
    pub cooldown: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapCell {
    pub resource: Option<Resource>,
    pub citytile: Option<CityTile>,
    pub road: f64,
}

impl MapCell {
    pub fn has_resource(&self) -> bool {
        self.resource.map_or(false, |r| r.amount > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Worker,
    Cart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    #[serde(default)]
    pub wood: i32,
    #[serde(default)]
    pub coal: i32,
    #[serde(default)]
    pub uranium: i32,
}

impl Cargo {
    pub fn total(&self) -> i32 {
        self.wood + self.coal + self.uranium
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn fuel_value(&self, rules: &RulesConfig) -> i32 {
        self.wood * rules.wood.fuel_rate
            + self.coal * rules.coal.fuel_rate
            + self.uranium * rules.uranium.fuel_rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub team: u8,
    pub kind: UnitKind,
    pub pos: Coord,
    pub cooldown: f64,
    pub cargo: Cargo,
    /// Fuel the unit could deliver, as precomputed by the host.
    pub fuel_potential: i32,
    /// Tiles the unit can cover before running out of fuel.
    pub travel_range: i32,
}

impl Unit {
    pub fn can_act(&self) -> bool {
        self.cooldown < 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub team: u8,
    pub fuel: i32,
    pub light_upkeep: i32,
    pub tiles: Vec<Coord>,
    /// Fuel still missing to get through the coming night; negative is surplus.
    pub fuel_needed_for_night: i32,
    /// Fuel still missing to survive every remaining night of the match.
    pub fuel_needed_for_game: i32,
    /// Night turns the current reserve lasts.
    pub night_fuel_duration: i32,
}

impl City {
    pub fn new(id: impl Into<String>, team: u8, fuel: i32, light_upkeep: i32) -> Self {
        Self {
            id: id.into(),
            team,
            fuel,
            light_upkeep,
            tiles: Vec::new(),
            fuel_needed_for_night: 0,
            fuel_needed_for_game: 0,
            night_fuel_duration: 0,
        }
    }

    /// Fills in the fuel projections from the reserve and upkeep.
    pub fn project(&mut self, cycle: &DayCycle, turn: u32) {
        let nights_left = cycle.night_turns_left(turn) as i32;
        let coming_night = if cycle.is_day(turn) {
            (cycle.night_length() as i32).min(nights_left)
        } else {
            cycle.turns_to_dawn(turn) as i32
        };
        self.night_fuel_duration = if self.light_upkeep > 0 {
            self.fuel / self.light_upkeep
        } else {
            nights_left
        };
        self.fuel_needed_for_night = coming_night * self.light_upkeep - self.fuel;
        self.fuel_needed_for_game = nights_left * self.light_upkeep - self.fuel;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub team: u8,
    pub research_points: i32,
    pub units: Vec<Unit>,
    pub cities: BTreeMap<String, City>,
}

impl Player {
    fn new(team: u8) -> Self {
        Self {
            team,
            ..Self::default()
        }
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn units_at(&self, pos: Coord) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(move |unit| unit.pos == pos)
    }

    pub fn city(&self, id: &str) -> Option<&City> {
        self.cities.get(id)
    }

    pub fn city_tile_count(&self) -> usize {
        self.cities.values().map(|city| city.tiles.len()).sum()
    }
}

/// Everything the host knows about one turn, from the point of view of
/// `player_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnState {
    pub turn: u32,
    pub player_id: usize,
    cells: Grid<MapCell>,
    players: [Player; 2],
}

impl TurnState {
    pub fn width(&self) -> i32 {
        self.cells.width()
    }

    pub fn height(&self) -> i32 {
        self.cells.height()
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.cells.contains(c)
    }

    pub fn cell(&self, c: Coord) -> Option<&MapCell> {
        self.cells.get(c)
    }

    pub fn cells(&self) -> &Grid<MapCell> {
        &self.cells
    }

    pub fn player(&self) -> &Player {
        &self.players[self.player_id]
    }

    pub fn opponent(&self) -> &Player {
        &self.players[1 - self.player_id]
    }

    pub fn team(&self, team: u8) -> Option<&Player> {
        self.players.get(usize::from(team))
    }

    /// The city owning the city tile at `c`, whichever side it belongs to.
    pub fn city_at(&self, c: Coord) -> Option<&City> {
        let tile = self.cell(c)?.citytile.as_ref()?;
        self.team(tile.team)?.city(&tile.city_id)
    }
}

/// Assembles a [`TurnState`]. Entities that fall outside the map are dropped
/// with a warning; a bad team id is reported by [`TurnStateBuilder::build`].
#[derive(Debug, Clone)]
pub struct TurnStateBuilder {
    turn: u32,
    player_id: usize,
    cells: Grid<MapCell>,
    players: [Player; 2],
    error: Option<StateError>,
}

impl TurnStateBuilder {
    pub fn new(width: i32, height: i32, player_id: usize) -> Result<Self, StateError> {
        if width <= 0 || height <= 0 {
            return Err(StateError::InvalidDimensions { width, height });
        }
        if player_id > 1 {
            return Err(StateError::PlayerIdOutOfRange(player_id));
        }
        Ok(Self {
            turn: 0,
            player_id,
            cells: Grid::new(width, height, MapCell::default()),
            players: [Player::new(0), Player::new(1)],
            error: None,
        })
    }

    fn on_map(&self, what: &str, pos: Coord) -> bool {
        if self.cells.contains(pos) {
            return true;
        }
        warn!(what, x = pos.x, y = pos.y, "dropping entity placed off the map");
        false
    }

    fn player_mut(&mut self, team: u8) -> Option<&mut Player> {
        if usize::from(team) >= self.players.len() {
            self.error.get_or_insert(StateError::UnknownTeam(team));
            return None;
        }
        Some(&mut self.players[usize::from(team)])
    }

    pub fn turn(&mut self, turn: u32) -> &mut Self {
        self.turn = turn;
        self
    }

    pub fn research(&mut self, team: u8, points: i32) -> &mut Self {
        if let Some(player) = self.player_mut(team) {
            player.research_points = points;
        }
        self
    }

    /// Non-positive amounts leave the tile without a resource.
    pub fn resource(&mut self, kind: ResourceKind, pos: Coord, amount: i32) -> &mut Self {
        if amount <= 0 || !self.on_map("resource", pos) {
            return self;
        }
        self.cells[pos].resource = Some(Resource { kind, amount });
        self
    }

    pub fn road(&mut self, pos: Coord, level: f64) -> &mut Self {
        if self.on_map("road", pos) {
            self.cells[pos].road = level;
        }
        self
    }

    pub fn unit(&mut self, unit: Unit) -> &mut Self {
        if !self.on_map("unit", unit.pos) {
            return self;
        }
        if let Some(player) = self.player_mut(unit.team) {
            player.units.push(unit);
        }
        self
    }

    /// Registers a city; its tiles are added with [`TurnStateBuilder::city_tile`].
    pub fn city(&mut self, mut city: City) -> &mut Self {
        city.tiles.clear();
        let team = city.team;
        if let Some(player) = self.player_mut(team) {
            player.cities.insert(city.id.clone(), city);
        }
        self
    }

    pub fn city_tile(&mut self, team: u8, city_id: &str, pos: Coord, cooldown: f64) -> &mut Self {
        if !self.on_map("city tile", pos) {
            return self;
        }
        let Some(player) = self.player_mut(team) else {
            return self;
        };
        let Some(city) = player.cities.get_mut(city_id) else {
            warn!(city_id, team, "dropping city tile of an unregistered city");
            return self;
        };
        city.tiles.push(pos);
        self.cells[pos].citytile = Some(CityTile {
            city_id: city_id.to_string(),
            team,
            pos,
            cooldown,
        });
        self
    }

    pub fn build(&self) -> Result<TurnState, StateError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(TurnState {
            turn: self.turn,
            player_id: self.player_id,
            cells: self.cells.clone(),
            players: self.players.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_builder_places_entities() {
        let mut builder = TurnStateBuilder::new(6, 4, 1).unwrap();
        builder
            .turn(12)
            .research(1, 30)
            .resource(ResourceKind::Coal, Coord::new(2, 2), 300)
            .road(Coord::new(0, 0), 1.5)
            .unit(worker("u_1", 1, 3, 3))
            .city(City::new("c_1", 1, 120, 23))
            .city_tile(1, "c_1", Coord::new(4, 1), 0.0);
        let state = builder.build().unwrap();

        assert_eq!(state.turn, 12);
        assert_eq!(state.player().team, 1);
        assert_eq!(state.player().research_points, 30);
        assert!(state.cell(Coord::new(2, 2)).unwrap().has_resource());
        assert_eq!(state.cell(Coord::new(0, 0)).unwrap().road, 1.5);
        assert_eq!(state.player().unit("u_1").unwrap().pos, Coord::new(3, 3));
        assert_eq!(state.city_at(Coord::new(4, 1)).unwrap().id, "c_1");
        assert_eq!(state.player().city_tile_count(), 1);
        assert!(state.opponent().units.is_empty());
    }

    #[test]
    fn test_off_map_and_empty_entities_are_dropped() {
        let mut builder = TurnStateBuilder::new(3, 3, 0).unwrap();
        builder
            .resource(ResourceKind::Wood, Coord::new(5, 5), 100)
            .resource(ResourceKind::Wood, Coord::new(1, 1), 0)
            .unit(worker("u_9", 0, -1, 0));
        let state = builder.build().unwrap();
        assert!(state.player().units.is_empty());
        assert!(!state.cell(Coord::new(1, 1)).unwrap().has_resource());
    }

    #[test]
    fn test_unknown_team_is_reported() {
        let mut builder = TurnStateBuilder::new(3, 3, 0).unwrap();
        builder.research(4, 10);
        assert_eq!(builder.build().unwrap_err(), StateError::UnknownTeam(4));
    }

    #[test]
    fn test_bad_dimensions_rejected() {
        assert!(TurnStateBuilder::new(0, 5, 0).is_err());
        assert_eq!(
            TurnStateBuilder::new(5, 5, 2).unwrap_err(),
            StateError::PlayerIdOutOfRange(2)
        );
    }

    #[test]
    fn test_city_projection() {
        let cycle = DayCycle::from_rules(&RulesConfig::default());
        let mut city = City::new("c_1", 0, 100, 23);
        city.project(&cycle, 0);
        // 90 night turns remain at the start of the match
        assert_eq!(city.fuel_needed_for_game, 90 * 23 - 100);
        assert_eq!(city.fuel_needed_for_night, 10 * 23 - 100);
        assert_eq!(city.night_fuel_duration, 4);

        city.project(&cycle, 35);
        assert_eq!(city.fuel_needed_for_night, 5 * 23 - 100);
    }

    #[test]
    fn test_cargo_fuel_value() {
        let cargo = Cargo {
            wood: 10,
            coal: 2,
            uranium: 1,
        };
        assert_eq!(cargo.total(), 13);
        assert_eq!(cargo.fuel_value(&RulesConfig::default()), 10 + 10 + 20);
    }
}
