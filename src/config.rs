//! Engine configuration: game rules, analysis thresholds, path penalties

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub paths: PathConfig,
    #[serde(default)]
    pub missions: MissionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Balance numbers for one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRule {
    /// Amount a worker gathers per turn from one adjacent tile.
    pub collection_rate: i32,
    /// Fuel produced per unit of the resource.
    pub fuel_rate: i32,
    /// Weight of one tile in a resource cluster's point value.
    pub cluster_points: i32,
    pub research_required: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_wood")]
    pub wood: ResourceRule,
    #[serde(default = "default_coal")]
    pub coal: ResourceRule,
    #[serde(default = "default_uranium")]
    pub uranium: ResourceRule,
    #[serde(default = "default_cargo_capacity")]
    pub worker_cargo_capacity: i32,
    #[serde(default = "default_light_upkeep")]
    pub city_tile_upkeep: i32,
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
    #[serde(default = "default_day_length")]
    pub day_length: u32,
    #[serde(default = "default_match_length")]
    pub match_length: u32,
}

fn default_wood() -> ResourceRule {
    ResourceRule {
        collection_rate: 20,
        fuel_rate: 1,
        cluster_points: 1,
        research_required: 0,
    }
}

fn default_coal() -> ResourceRule {
    ResourceRule {
        collection_rate: 5,
        fuel_rate: 5,
        cluster_points: 3,
        research_required: 50,
    }
}

fn default_uranium() -> ResourceRule {
    ResourceRule {
        collection_rate: 2,
        fuel_rate: 20,
        cluster_points: 5,
        research_required: 200,
    }
}

fn default_cargo_capacity() -> i32 {
    100
}

fn default_light_upkeep() -> i32 {
    23
}

fn default_cycle_length() -> u32 {
    40
}

fn default_day_length() -> u32 {
    30
}

fn default_match_length() -> u32 {
    360
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            wood: default_wood(),
            coal: default_coal(),
            uranium: default_uranium(),
            worker_cargo_capacity: default_cargo_capacity(),
            city_tile_upkeep: default_light_upkeep(),
            cycle_length: default_cycle_length(),
            day_length: default_day_length(),
            match_length: default_match_length(),
        }
    }
}

impl RulesConfig {
    pub fn night_length(&self) -> u32 {
        self.cycle_length - self.day_length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_unreached")]
    pub unreached_distance: i32,
    #[serde(default = "default_floodfill_coverage")]
    pub floodfill_coverage: f64,
    #[serde(default = "default_early_game_turns")]
    pub early_game_turns: u32,
    #[serde(default = "default_end_game_turn")]
    pub end_game_turn: u32,
    #[serde(default = "default_transition_window")]
    pub transition_window: u32,
    #[serde(default = "default_research_margin")]
    pub research_projection_margin: i32,
    #[serde(default = "default_surplus_threshold")]
    pub preferred_surplus_threshold: i32,
    #[serde(default = "default_throttle_radius")]
    pub worker_throttle_radius: i32,
    #[serde(default = "default_thin_wood")]
    pub thin_wood_threshold: i32,
    #[serde(default = "default_targeted_radius")]
    pub targeted_mission_radius: i32,
}

fn default_unreached() -> i32 {
    99
}

fn default_floodfill_coverage() -> f64 {
    0.7
}

fn default_early_game_turns() -> u32 {
    20
}

fn default_end_game_turn() -> u32 {
    350
}

fn default_transition_window() -> u32 {
    3
}

fn default_research_margin() -> i32 {
    10
}

fn default_surplus_threshold() -> i32 {
    -18
}

fn default_throttle_radius() -> i32 {
    3
}

fn default_thin_wood() -> i32 {
    500
}

fn default_targeted_radius() -> i32 {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            unreached_distance: default_unreached(),
            floodfill_coverage: default_floodfill_coverage(),
            early_game_turns: default_early_game_turns(),
            end_game_turn: default_end_game_turn(),
            transition_window: default_transition_window(),
            research_projection_margin: default_research_margin(),
            preferred_surplus_threshold: default_surplus_threshold(),
            worker_throttle_radius: default_throttle_radius(),
            thin_wood_threshold: default_thin_wood(),
            targeted_mission_radius: default_targeted_radius(),
        }
    }
}

/// Cost of entering a tile during weighted path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_step_cost")]
    pub step: i32,
    #[serde(default = "default_occupied_cost")]
    pub occupied: i32,
    #[serde(default = "default_enemy_city_cost")]
    pub enemy_city: i32,
    #[serde(default = "default_sealed_city_cost")]
    pub sealed_city: i32,
}

fn default_step_cost() -> i32 {
    1
}

fn default_occupied_cost() -> i32 {
    10
}

fn default_enemy_city_cost() -> i32 {
    50
}

fn default_sealed_city_cost() -> i32 {
    500
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            step: default_step_cost(),
            occupied: default_occupied_cost(),
            enemy_city: default_enemy_city_cost(),
            sealed_city: default_sealed_city_cost(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    /// A new mission starts with twice this many delay points.
    #[serde(default = "default_delay_budget")]
    pub default_delay_budget: f64,
}

fn default_delay_budget() -> f64 {
    99.0
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            default_delay_budget: default_delay_budget(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rules = &self.rules;
        if rules.cycle_length == 0 || rules.day_length > rules.cycle_length {
            return Err(ConfigError::Invalid(format!(
                "day length {} does not fit a {}-turn cycle",
                rules.day_length, rules.cycle_length
            )));
        }
        if rules.match_length == 0 {
            return Err(ConfigError::Invalid("match length must be positive".into()));
        }
        for (name, rule) in [
            ("wood", &rules.wood),
            ("coal", &rules.coal),
            ("uranium", &rules.uranium),
        ] {
            if rule.collection_rate < 0 || rule.fuel_rate < 0 || rule.research_required < 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} rates must not be negative"
                )));
            }
        }

        let coverage = self.analysis.floodfill_coverage;
        if !(coverage > 0.0 && coverage <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "floodfill coverage {coverage} must lie in (0, 1]"
            )));
        }
        if self.analysis.unreached_distance <= 0 {
            return Err(ConfigError::Invalid(
                "unreached distance must be positive".into(),
            ));
        }

        let paths = &self.paths;
        if paths.step <= 0 || paths.occupied <= 0 || paths.enemy_city <= 0 || paths.sealed_city <= 0
        {
            return Err(ConfigError::Invalid("path costs must be positive".into()));
        }

        if self.missions.default_delay_budget <= 0.0 {
            return Err(ConfigError::Invalid(
                "mission delay budget must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_game_rules() {
        let config = EngineConfig::default();
        assert_eq!(config.rules.wood.collection_rate, 20);
        assert_eq!(config.rules.uranium.fuel_rate, 20);
        assert_eq!(config.rules.coal.research_required, 50);
        assert_eq!(config.rules.night_length(), 10);
        assert_eq!(config.analysis.unreached_distance, 99);
        assert_eq!(config.paths.sealed_city, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "analysis:\n  floodfill_coverage: 0.5\npaths:\n  occupied: 12\n";
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.analysis.floodfill_coverage, 0.5);
        assert_eq!(config.analysis.early_game_turns, 20);
        assert_eq!(config.paths.occupied, 12);
        assert_eq!(config.paths.enemy_city, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let mut config = EngineConfig::default();
        config.missions.default_delay_budget = 40.0;
        let yaml = config.to_yaml_string().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(&path, yaml).unwrap();
        let loaded = EngineConfig::from_yaml_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_bad_coverage() {
        let err = EngineConfig::from_yaml_str("analysis:\n  floodfill_coverage: 1.5\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = EngineConfig::from_yaml_path("/nonexistent/engine.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/engine.yaml"));
    }
}
