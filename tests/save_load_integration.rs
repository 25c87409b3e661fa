// Save slots and autosave against a real directory

use jurassic_valley::components::{AIComponent, AiState, HealthComponent, InventoryComponent};
use jurassic_valley::config::SimConfig;
use jurassic_valley::save::SaveSystem;
use jurassic_valley::systems::resource::ResourceNode;
use jurassic_valley::{
    Effects, EntityId, EntityKind, EntityTemplate, GameError, GameLoop, handle_error,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn new_game(seed: u64) -> GameLoop {
    GameLoop::with_seed(Arc::new(SimConfig::default()), Effects::silent(), seed).unwrap()
}

#[test]
fn slot_round_trip_restores_the_valley() {
    let dir = tempdir().unwrap();
    let saves = SaveSystem::new(dir.path(), 3).unwrap();

    let mut game = new_game(21);
    let hero = game
        .world
        .spawn_from_definition(EntityKind::Hero, &json!({ "x": 90.0 }))
        .unwrap();
    let enemy = game.world.spawn(&EntityTemplate::base(EntityKind::Enemy));
    let node = game
        .world
        .spawn_from_definition(EntityKind::Resource, &json!({ "resource": "stone" }))
        .unwrap();
    game.world.get_mut::<HealthComponent>(hero).unwrap().take_damage(25.0);
    game.world.get_mut::<InventoryComponent>(hero).unwrap().add("fern", 3);
    game.harvest(node, 20.0);
    game.mining.spawn_rock(2, -1, "gold_ore");
    game.mining.strike(2, -1);
    game.tick(16.0);
    assert_eq!(
        game.world.get::<AIComponent>(enemy).unwrap().state(),
        AiState::Chase
    );

    game.save_to_slot(&saves, 1).unwrap();
    assert!(saves.has_save(1));

    let mut loaded = new_game(0);
    loaded.load_from_slot(&saves, 1).unwrap();

    assert_eq!(loaded.seed(), 21);
    assert_eq!(loaded.frame_count(), 1);
    assert_eq!(loaded.world.entity_count(), 3);

    let hero = loaded.world.hero().unwrap();
    assert_eq!(loaded.world.get::<HealthComponent>(hero).unwrap().health(), 75.0);
    assert_eq!(loaded.world.get::<InventoryComponent>(hero).unwrap().count("fern"), 3);
    assert_eq!(loaded.world.position(hero).unwrap().x, 90.0);

    let enemy = loaded.world.find_by_id("enemy").unwrap();
    let brain = loaded.world.get::<AIComponent>(enemy).unwrap();
    assert_eq!(brain.state(), AiState::Chase);
    assert_eq!(brain.target, Some(EntityId::from(hero)));
    drop(brain);

    let node = loaded.world.find_by_id("resource").unwrap();
    let stone = (*loaded.world.world.get::<&ResourceNode>(node).unwrap()).clone();
    assert_eq!(stone.health, 30.0);

    assert_eq!(loaded.mining.get_rock(2, -1).unwrap().durability, 7);
}

#[test]
fn identical_seeds_roll_identical_drops_after_load() {
    let dir = tempdir().unwrap();
    let saves = SaveSystem::new(dir.path(), 1).unwrap();
    let mut original = new_game(77);
    for x in 0..8 {
        original.mining.spawn_rock(x, 0, "iron_ore");
    }
    original.save_to_slot(&saves, 0).unwrap();

    let mut restored = new_game(1);
    restored.load_from_slot(&saves, 0).unwrap();

    for x in 0..8 {
        assert_eq!(
            original.mine(x, 0, 10, None),
            restored.mine(x, 0, 10, None)
        );
    }
}

#[test]
fn slots_outside_the_range_are_rejected() {
    let dir = tempdir().unwrap();
    let saves = SaveSystem::new(dir.path(), 2).unwrap();
    let game = new_game(3);

    assert!(game.save_to_slot(&saves, 2).is_err());
    assert!(!saves.has_save(2));

    let mut game = game;
    let err = game.load_from_slot(&saves, 0).unwrap_err();
    assert!(matches!(err, GameError::SaveError(_)));
}

#[test]
fn truncated_slot_is_reported_as_corrupted_and_leaves_the_game_alone() {
    let dir = tempdir().unwrap();
    let saves = SaveSystem::new(dir.path(), 1).unwrap();
    let mut game = new_game(8);
    game.world.spawn(&EntityTemplate::base(EntityKind::Hero));
    game.save_to_slot(&saves, 0).unwrap();

    let path = saves.save_path(0).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

    let mut other = new_game(2);
    other.world.spawn(&EntityTemplate::base(EntityKind::Enemy));
    let err = other.load_from_slot(&saves, 0).unwrap_err();

    assert!(matches!(err, GameError::CorruptedSave));
    assert_eq!(handle_error(&err), "存档数据已损坏，无法加载");
    assert_eq!(other.seed(), 2);
    assert!(other.world.find_by_id("enemy").is_some());
    assert!(other.world.hero().is_none());
}

#[test]
fn listing_shows_every_written_slot() {
    let dir = tempdir().unwrap();
    let saves = SaveSystem::new(dir.path(), 3).unwrap();
    let game = new_game(5);

    game.save_to_slot(&saves, 0).unwrap();
    game.save_to_slot(&saves, 2).unwrap();

    let mut labels: Vec<String> = saves
        .list_saves()
        .unwrap()
        .into_iter()
        .map(|m| m.label)
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["slot 0", "slot 2"]);

    saves.delete_save(0).unwrap();
    assert_eq!(saves.list_saves().unwrap().len(), 1);
}

#[test]
fn autosave_fires_on_simulated_time() {
    let dir = tempdir().unwrap();
    let mut config = SimConfig::default();
    config.game_loop.save_dir = Some(dir.path().to_path_buf());
    config.game_loop.autosave_interval_secs = 1;

    let mut game = GameLoop::with_seed(Arc::new(config), Effects::silent(), 9).unwrap();
    game.world.spawn(&EntityTemplate::base(EntityKind::Hero));
    let saves = SaveSystem::new(dir.path(), 3).unwrap();

    for _ in 0..3 {
        game.tick(250.0);
    }
    assert!(!saves.has_save(0));

    game.tick(250.0);
    assert!(saves.has_save(0));
    assert!(game.autosave.as_ref().unwrap().last_save_time().is_some());

    let data = saves.load_game(0).unwrap();
    assert_eq!(data.metadata.label, "autosave");
    assert_eq!(data.metadata.frame_count, 4);
    assert_eq!(data.entities.len(), 1);
}
