//! Tests for state snapshots
//!
//! A snapshot captures the complete engine state mid-run; a restored
//! simulation must continue the exact trajectory of the original, and a
//! snapshot taken under one configuration must be rejected by another.

use ift_simulator_core_rs::orchestrator::{snapshot_from_json, snapshot_to_json};
use ift_simulator_core_rs::{
    compute_config_hash, Simulation, SimulationConfig, SimulationError,
};

fn short_config() -> SimulationConfig {
    SimulationConfig {
        duration_seconds: 100.0, // 1000 steps
        ..SimulationConfig::default()
    }
}

#[test]
fn test_config_hash_is_stable() {
    let config = short_config();
    let h1 = compute_config_hash(&config).unwrap();
    let h2 = compute_config_hash(&config).unwrap();
    assert_eq!(h1, h2);
    assert_eq!(h1.len(), 64); // SHA-256 hex
}

#[test]
fn test_config_hash_detects_changes() {
    let base = compute_config_hash(&short_config()).unwrap();
    let changed = compute_config_hash(&SimulationConfig {
        rng_seed: 54321,
        ..short_config()
    })
    .unwrap();
    assert_ne!(base, changed);
}

#[test]
fn test_snapshot_round_trips_through_json() {
    let mut sim = Simulation::new(short_config()).unwrap();
    sim.run().unwrap();

    let snapshot = sim.snapshot().unwrap();
    let json = snapshot_to_json(&snapshot).unwrap();
    let decoded = snapshot_from_json(&json).unwrap();

    assert_eq!(decoded.current_step, snapshot.current_step);
    assert_eq!(decoded.rng_state, snapshot.rng_state);
    assert_eq!(decoded.config_hash, snapshot.config_hash);
    assert_eq!(decoded.motors.len(), snapshot.motors.len());
}

#[test]
fn test_restore_continues_the_exact_trajectory() {
    let mut original = Simulation::new(short_config()).unwrap();
    original.run().unwrap();

    let json = snapshot_to_json(&original.snapshot().unwrap()).unwrap();
    let mut restored =
        Simulation::restore(short_config(), snapshot_from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.current_step(), original.current_step());
    assert_eq!(restored.rng_state(), original.rng_state());

    // Both continue for the same span; the trajectories must stay
    // bit-identical, traces and RNG alike.
    original.extend(500).unwrap();
    restored.extend(500).unwrap();

    assert_eq!(
        original.length_trace(0).unwrap(),
        restored.length_trace(0).unwrap()
    );
    assert_eq!(original.flux_trace(), restored.flux_trace());
    assert_eq!(original.rng_state(), restored.rng_state());
}

#[test]
fn test_restore_rejects_different_config() {
    let mut sim = Simulation::new(short_config()).unwrap();
    sim.run().unwrap();
    let snapshot = sim.snapshot().unwrap();

    let other = SimulationConfig {
        decay_rate: 0.02,
        ..short_config()
    };
    match Simulation::restore(other, snapshot) {
        Err(SimulationError::CheckpointMismatch { .. }) => {}
        other => panic!("expected CheckpointMismatch, got {:?}", other),
    }
}

#[test]
fn test_restore_rejects_tampered_population() {
    let mut sim = Simulation::new(short_config()).unwrap();
    sim.run().unwrap();
    let mut snapshot = sim.snapshot().unwrap();

    // Drop a motor: the population is conserved, so this cannot be a
    // snapshot of this configuration.
    snapshot.motors.pop();
    match Simulation::restore(short_config(), snapshot) {
        Err(SimulationError::StateValidationError(_)) => {}
        other => panic!("expected StateValidationError, got {:?}", other),
    }
}

#[test]
fn test_snapshot_of_unstarted_simulation() {
    let sim = Simulation::new(short_config()).unwrap();
    let snapshot = sim.snapshot().unwrap();
    assert_eq!(snapshot.current_step, 0);
    assert!(!snapshot.started);

    let mut restored = Simulation::restore(short_config(), snapshot).unwrap();
    restored.run().unwrap();

    let mut fresh = Simulation::new(short_config()).unwrap();
    fresh.run().unwrap();
    assert_eq!(
        restored.length_trace(0).unwrap(),
        fresh.length_trace(0).unwrap()
    );
}

#[test]
fn test_two_flagella_snapshot_includes_pool() {
    let mut sim = Simulation::new(SimulationConfig {
        duration_seconds: 50.0,
        ..SimulationConfig::two_flagella()
    })
    .unwrap();
    sim.run().unwrap();

    let snapshot = sim.snapshot().unwrap();
    let pool = snapshot.pool.as_ref().unwrap();
    assert!(pool.in_flight >= 0.0);
    assert_eq!(pool.tubulin, 30.0);

    let restored = Simulation::restore(
        SimulationConfig {
            duration_seconds: 50.0,
            ..SimulationConfig::two_flagella()
        },
        snapshot,
    )
    .unwrap();
    assert_eq!(
        restored.pool().unwrap().in_flight(),
        sim.pool().unwrap().in_flight()
    );
}
