use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::config::RulesConfig;
use crate::error::StateError;
use crate::policy::DayCycle;
use crate::spatial::Coord;
use crate::world::{Cargo, City, ResourceKind, TurnState, TurnStateBuilder, Unit, UnitKind};

fn default_resource_amount() -> i32 {
    500
}

fn default_unit_kind() -> UnitKind {
    UnitKind::Worker
}

fn default_travel_range() -> i32 {
    100
}

/// A recorded or hand-written turn. The map is drawn as rows of characters,
/// top row first: `.` empty, `w` wood, `c` coal, `u` uranium.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnFixture {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub player_id: usize,
    /// Research points of team 0 and team 1.
    #[serde(default)]
    pub research: [i32; 2],
    pub map: Vec<String>,
    #[serde(default = "default_resource_amount")]
    pub resource_amount: i32,
    #[serde(default)]
    pub amounts: Vec<FixtureAmount>,
    #[serde(default)]
    pub cities: Vec<FixtureCity>,
    #[serde(default)]
    pub units: Vec<FixtureUnit>,
    #[serde(default)]
    pub roads: Vec<FixtureRoad>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAmount {
    pub pos: Coord,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureCity {
    pub id: String,
    pub team: u8,
    #[serde(default)]
    pub fuel: i32,
    pub tiles: Vec<Coord>,
    /// Defaults to the per-tile upkeep times the tile count.
    pub light_upkeep: Option<i32>,
    pub fuel_needed_for_night: Option<i32>,
    pub fuel_needed_for_game: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUnit {
    pub id: String,
    pub team: u8,
    #[serde(default = "default_unit_kind")]
    pub kind: UnitKind,
    pub pos: Coord,
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default)]
    pub cargo: Cargo,
    /// Defaults to the fuel value of the cargo.
    pub fuel_potential: Option<i32>,
    #[serde(default = "default_travel_range")]
    pub travel_range: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRoad {
    pub pos: Coord,
    pub level: f64,
}

impl TurnFixture {
    pub fn width(&self) -> i32 {
        self.map
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0) as i32
    }

    pub fn height(&self) -> i32 {
        self.map.len() as i32
    }

    /// Builds the turn snapshot, filling in what a host would precompute:
    /// city fuel projections and unit fuel potential.
    pub fn build_state(&self, rules: &RulesConfig) -> Result<TurnState, StateError> {
        let mut builder = TurnStateBuilder::new(self.width(), self.height(), self.player_id)?;
        builder
            .turn(self.turn)
            .research(0, self.research[0])
            .research(1, self.research[1]);

        for (y, row) in self.map.iter().enumerate() {
            for (x, symbol) in row.chars().enumerate() {
                let pos = Coord::new(x as i32, y as i32);
                let kind = match symbol {
                    'w' => ResourceKind::Wood,
                    'c' => ResourceKind::Coal,
                    'u' => ResourceKind::Uranium,
                    '.' => continue,
                    other => {
                        warn!(fixture = %self.name, x, y, symbol = %other, "unknown map symbol");
                        continue;
                    }
                };
                let amount = self
                    .amounts
                    .iter()
                    .find(|a| a.pos == pos)
                    .map_or(self.resource_amount, |a| a.amount);
                builder.resource(kind, pos, amount);
            }
        }
        for road in &self.roads {
            builder.road(road.pos, road.level);
        }

        let cycle = DayCycle::from_rules(rules);
        for spec in &self.cities {
            let upkeep = spec
                .light_upkeep
                .unwrap_or(rules.city_tile_upkeep * spec.tiles.len() as i32);
            let mut city = City::new(spec.id.clone(), spec.team, spec.fuel, upkeep);
            city.project(&cycle, self.turn);
            if let Some(need) = spec.fuel_needed_for_night {
                city.fuel_needed_for_night = need;
            }
            if let Some(need) = spec.fuel_needed_for_game {
                city.fuel_needed_for_game = need;
            }
            builder.city(city);
            for &tile in &spec.tiles {
                builder.city_tile(spec.team, &spec.id, tile, 0.0);
            }
        }

        for spec in &self.units {
            builder.unit(Unit {
                id: spec.id.clone(),
                team: spec.team,
                kind: spec.kind,
                pos: spec.pos,
                cooldown: spec.cooldown,
                cargo: spec.cargo,
                fuel_potential: spec
                    .fuel_potential
                    .unwrap_or_else(|| spec.cargo.fuel_value(rules)),
                travel_range: spec.travel_range,
            });
        }
        builder.build()
    }
}

pub struct FixtureLoader {
    base_dir: PathBuf,
}

impl FixtureLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<TurnFixture> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
        let fixture: TurnFixture = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(fixture)
    }

    /// Loads a fixture and builds its turn in one step.
    pub fn load_state(&self, file: impl AsRef<Path>, rules: &RulesConfig) -> Result<TurnState> {
        let file = file.as_ref();
        let fixture = self.load(file)?;
        fixture
            .build_state(rules)
            .with_context(|| format!("Fixture {} describes an invalid turn", file.display()))
    }
}
