use nonceling_core::config::AppConfig;
use nonceling_core::creature::Creature;
use nonceling_core::traits::TraitCatalog;
use nonceling_data::MutationCheckpoint;
use nonceling_io::{load_state, restore, restore_with, save_state, IoError};
use std::path::PathBuf;
use std::sync::Arc;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nonceling_io_{}_{}", std::process::id(), name))
}

#[test]
fn test_save_load_all_formats() {
    let mut creature = Creature::new(0x0BAD_F00D);
    creature.tick(0.1);
    creature.on_confirmations_updated(20_000);
    let state = creature.snapshot();

    for name in ["state.json", "state.json.gz", "state.rkyv"] {
        let path = temp_path(name);
        save_state(&state, &path).expect("save");
        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded, state, "round trip through {}", name);
        let _ = std::fs::remove_file(&path);
    }
}

#[test]
fn test_tampered_json_rejected() {
    let state = Creature::new(77).snapshot();
    let path = temp_path("tampered.json");
    save_state(&state, &path).expect("save");

    let text = std::fs::read_to_string(&path).expect("read");
    let tampered = text.replacen("\"seed\": 77", "\"seed\": 78", 1);
    assert_ne!(text, tampered);
    std::fs::write(&path, tampered).expect("write");

    let err = load_state(&path).expect_err("checksum should fail");
    assert!(matches!(err, IoError::Validation(_)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_restore_replays_mutations() {
    let mut creature = Creature::new(424_242);
    creature.on_confirmations_updated(100_000);
    let state = creature.snapshot();

    let restored = restore(&state).expect("restore");
    assert_eq!(restored.seed(), creature.seed());
    assert_eq!(restored.confirmations(), creature.confirmations());
    assert_eq!(restored.groups(), creature.groups());
    assert_eq!(restored.force_matrix(), creature.force_matrix());
    assert_eq!(restored.mutation_history(), creature.mutation_history());
    assert_eq!(restored.snapshot().applied_mutation_ids, state.applied_mutation_ids);
    assert_eq!(restored.steps(), 0);
}

#[test]
fn test_restore_replays_steps_after_mutations() {
    let mut creature = Creature::new(2468);
    creature.on_confirmations_updated(120_000);
    for _ in 0..90 {
        creature.step();
    }

    let restored = restore(&creature.snapshot()).expect("restore");
    assert_eq!(restored.steps(), 90);
    assert_eq!(restored.time(), creature.time());
    assert_eq!(restored.particles(), creature.particles());
    assert_eq!(restored.groups(), creature.groups());
    assert_eq!(restored.fields(), creature.fields());
}

#[test]
fn test_restore_replays_interleaved_schedule() {
    let mut creature = Creature::new(0x5EED_0001);
    for (steps, confirmations) in [(15, 10_000), (20, 50_000), (5, 250_000), (30, 1_000_000)] {
        for _ in 0..steps {
            creature.step();
        }
        creature.on_confirmations_updated(confirmations);
    }
    for _ in 0..12 {
        creature.step();
    }
    let state = creature.snapshot();

    let path = temp_path("interleaved.rkyv");
    save_state(&state, &path).expect("save");
    let restored = restore(&load_state(&path).expect("load")).expect("restore");
    assert_eq!(restored.steps(), 82);
    assert_eq!(restored.checkpoints(), creature.checkpoints());
    assert_eq!(restored.particles(), creature.particles());
    assert_eq!(restored.mutation_history(), creature.mutation_history());
    assert_eq!(restored.snapshot(), state);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_restore_rejects_injected_checkpoint() {
    let mut creature = Creature::new(31);
    creature.step();
    creature.on_confirmations_updated(400_000);
    let mut state = creature.snapshot();
    // Below the first milestone, so replaying it applies nothing
    state.checkpoints.insert(
        0,
        MutationCheckpoint {
            step: 0,
            confirmations: 1,
        },
    );

    let err = restore(&state).expect_err("checkpoint should disagree");
    assert!(matches!(err, IoError::Replay(_)));
}

#[test]
fn test_restore_rejects_foreign_mutation_ids() {
    let mut state = Creature::new(5).snapshot();
    state.confirmations = 0;
    state.applied_mutation_ids.push("00000005-evolution-0".to_string());

    let err = restore(&state).expect_err("replay should disagree");
    assert!(matches!(err, IoError::Replay(_)));
}

#[test]
fn test_restore_rejects_wrong_chain() {
    let mut state = Creature::new(6).snapshot();
    state.rehash_chain.push(0xFFFF_FFFF);

    let err = restore(&state).expect_err("chain should disagree");
    assert!(matches!(err, IoError::Replay(_)));
}

#[test]
fn test_restore_with_invalid_config_fails() {
    let state = Creature::new(8).snapshot();
    let mut config = AppConfig::default();
    config.physics.fixed_dt = 0.0;

    let err = restore_with(&state, config, Arc::new(TraitCatalog::default()))
        .expect_err("invalid config");
    assert!(matches!(err, IoError::Core(_)));
}
