use turnscope::{
    config::EngineConfig, spatial::Coord, Engine, FixtureLoader, TurnAnalysis, TurnFixture,
};

const SIZE: i32 = 12;

fn mirror(c: Coord) -> Coord {
    Coord::new(SIZE - 1 - c.x, SIZE - 1 - c.y)
}

fn duel_fixture() -> TurnFixture {
    FixtureLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/mirror_duel.yaml")
        .unwrap()
}

fn analyse_as(player_id: usize, turn: u32) -> (Engine, TurnAnalysis) {
    let mut fixture = duel_fixture();
    fixture.player_id = player_id;
    fixture.turn = turn;
    let config = EngineConfig::default();
    let state = fixture.build_state(&config.rules).unwrap();
    let engine = Engine::for_match(config, &state).unwrap();
    let analysis = engine.analyze(&state);
    (engine, analysis)
}

#[test]
fn openings_pick_mirrored_orders() {
    let (near, _) = analyse_as(0, 0);
    let (far, _) = analyse_as(1, 0);
    assert!(near.order().is_x_mirrored() && near.order().is_y_mirrored());
    assert!(!far.order().is_x_mirrored() && !far.order().is_y_mirrored());

    let near_walk: Vec<_> = near.order().coords().collect();
    let far_walk: Vec<_> = far.order().coords().map(mirror).collect();
    assert_eq!(near_walk, far_walk);
}

#[test]
fn distance_fields_match_under_mirror() {
    for turn in [1, 2, 3, 4, 37] {
        let (_, near) = analyse_as(0, turn);
        let (_, far) = analyse_as(1, turn);
        for c in near.order.coords() {
            let m = mirror(c);
            let (a, b) = (&near.fields, &far.fields);
            assert_eq!(a.from_player_city_tiles[c], b.from_player_city_tiles[m]);
            assert_eq!(a.from_opponent_city_tiles[c], b.from_opponent_city_tiles[m]);
            assert_eq!(a.from_player_units[c], b.from_player_units[m]);
            assert_eq!(a.from_opponent_assets[c], b.from_opponent_assets[m]);
            assert_eq!(a.from_collectable[c], b.from_collectable[m]);
            assert_eq!(a.from_wood[c], b.from_wood[m]);
            assert_eq!(a.from_edge[c], b.from_edge[m]);
            assert_eq!(
                a.from_floodfill_by_either_city[c],
                b.from_floodfill_by_either_city[m]
            );
            assert_eq!(
                near.features.fuel_collection_rate[c],
                far.features.fuel_collection_rate[m]
            );
        }
    }
}

#[test]
fn clusters_match_under_mirror() {
    for turn in [1, 2, 6] {
        let (_, near) = analyse_as(0, turn);
        let (_, far) = analyse_as(1, turn);
        for c in near.order.coords() {
            let m = mirror(c);
            assert_eq!(near.clusters.point(c), far.clusters.point(m));
            assert_eq!(near.clusters.tiles(c), far.clusters.tiles(m));
            assert_eq!(mirror(near.clusters.leader(c)), far.clusters.leader(m));
            assert_eq!(
                near.clusters.dist_from_player(c),
                far.clusters.dist_from_player(m)
            );
        }
        let near_groups: Vec<Vec<Coord>> = near
            .clusters
            .by_priority()
            .into_iter()
            .map(|group| group.into_iter().map(mirror).collect())
            .collect();
        assert_eq!(near_groups, far.clusters.by_priority());
    }
}

#[test]
fn floodfill_regions_match_under_mirror() {
    let (_, near) = analyse_as(0, 5);
    let (_, far) = analyse_as(1, 5);
    let mirrored: std::collections::HashSet<Coord> = near
        .fields
        .floodfill_by_empty
        .iter()
        .copied()
        .map(mirror)
        .collect();
    assert_eq!(mirrored, far.fields.floodfill_by_empty);
}
