use std::collections::HashSet;

use tempfile::tempdir;
use turnscope::{
    config::EngineConfig,
    missions::{PruneReason, HOMING},
    refuel::RefuelQuery,
    spatial::Coord,
    Engine, FixtureLoader, Mission, MissionStore, TurnFixture,
};

fn homing_fixture() -> TurnFixture {
    FixtureLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/homing_run.yaml")
        .unwrap()
}

fn opening_missions(budget: f64) -> MissionStore {
    let mut missions = MissionStore::new();
    missions.add(Mission::new("u_1", Coord::new(1, 1), "", HOMING, budget));
    missions.add(Mission::new("u_2", Coord::new(4, 5), "", "", budget));
    missions
}

#[test]
fn missions_survive_a_quiet_turn_and_decay() {
    let config = EngineConfig::default();
    let budget = config.missions.default_delay_budget;
    let state = homing_fixture().build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config, &state).unwrap();
    let analysis = engine.analyze(&state);

    let mut missions = opening_missions(budget);
    let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
    assert!(refresh.pruned.is_empty());
    assert!(refresh.research_dropped.is_empty());
    assert_eq!(missions.len(), 2);
    for unit_id in ["u_1", "u_2"] {
        assert_eq!(missions.get(unit_id).unwrap().delays, 2.0 * budget - 1.0);
    }
    assert!(refresh.index.founding_targets.is_empty());
    assert!(refresh.index.targeted_tiles.contains(&Coord::new(4, 5)));
    assert!(!refresh.index.targeted_tiles.contains(&Coord::new(1, 1)));
}

#[test]
fn missions_persist_and_retire_on_the_next_turn() {
    let config = EngineConfig::default();
    let budget = config.missions.default_delay_budget;
    let mut fixture = homing_fixture();
    let state = fixture.build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config.clone(), &state).unwrap();

    let mut missions = opening_missions(budget);
    let analysis = engine.analyze(&state);
    engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());

    let dir = tempdir().unwrap();
    let path = dir.path().join("missions.json");
    missions.save(&path).unwrap();

    // next turn: the home city is stocked for the match and u_2 is gone
    fixture.turn += 1;
    fixture.cities[0].fuel_needed_for_game = Some(0);
    fixture.units.retain(|unit| unit.id != "u_2");
    let state = fixture.build_state(&config.rules).unwrap();
    let analysis = engine.analyze(&state);

    let mut missions = MissionStore::load(&path).unwrap();
    let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
    assert_eq!(
        refresh.pruned,
        vec![
            ("u_1".to_string(), PruneReason::HomeRefuelled),
            ("u_2".to_string(), PruneReason::UnitGone),
        ]
    );
    assert!(missions.is_empty());
}

#[test]
fn homing_unit_finds_its_city() {
    let config = EngineConfig::default();
    let state = homing_fixture().build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config, &state).unwrap();
    let mut analysis = engine.analyze(&state);
    let unit = state.player().unit("u_1").unwrap().clone();

    let target = analysis
        .nearest_city_requiring_fuel(&state, engine.policy(), &unit, &RefuelQuery::default())
        .unwrap();
    assert_eq!(target.position, Coord::new(1, 1));
    assert_eq!(target.distance, 9);

    // a full load of wood does not cover the coming night
    let strict = RefuelQuery {
        require_night: true,
        ..RefuelQuery::default()
    };
    assert_eq!(
        analysis.nearest_city_requiring_fuel(&state, engine.policy(), &unit, &strict),
        None
    );
}

#[test]
fn research_unlock_resets_missions_on_the_crossing_turn() {
    let config = EngineConfig::default();
    let mut fixture = homing_fixture();
    fixture.research = [49, 0];
    let state = fixture.build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config.clone(), &state).unwrap();
    let mut missions = opening_missions(config.missions.default_delay_budget);

    let analysis = engine.analyze(&state);
    let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
    assert!(refresh.research_dropped.is_empty());
    assert_eq!(missions.len(), 2);

    fixture.turn += 1;
    fixture.research = [50, 0];
    let state = fixture.build_state(&config.rules).unwrap();
    let analysis = engine.analyze(&state);
    let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
    // no coal anywhere, so every mission is re-planned
    assert_eq!(refresh.research_dropped, vec!["u_1".to_string(), "u_2".to_string()]);
    assert!(missions.is_empty());
}

#[test]
fn steady_research_keeps_missions() {
    let config = EngineConfig::default();
    let budget = config.missions.default_delay_budget;
    let mut fixture = homing_fixture();
    fixture.research = [60, 0];
    let state = fixture.build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config.clone(), &state).unwrap();
    let mut missions = opening_missions(budget);

    let first_turn = fixture.turn;
    for turn in first_turn..first_turn + 4 {
        fixture.turn = turn;
        let state = fixture.build_state(&config.rules).unwrap();
        let analysis = engine.analyze(&state);
        let refresh = engine.refresh_missions(&analysis, &mut missions, &state, &HashSet::new());
        assert!(refresh.research_dropped.is_empty(), "turn {turn}");
        assert!(refresh.pruned.is_empty(), "turn {turn}");
        assert_eq!(missions.len(), 2);
    }
    assert!(missions.get("u_2").unwrap().delays < 2.0 * budget - 3.0);
}
