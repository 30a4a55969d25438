//! Checkpoint - Save/Load Simulation State
//!
//! Enables serialization and deserialization of complete engine state for
//! pause/resume functionality.
//!
//! # Critical Invariants
//!
//! - **Determinism**: restoring a snapshot and extending reproduces the
//!   exact trajectory the original simulation would have produced, because
//!   the RNG state resumes the same stream.
//! - **Population conservation**: a snapshot carries exactly the configured
//!   motor population.
//! - **Config matching**: state can only be loaded with a matching config,
//!   enforced by a SHA-256 hash of the canonical config JSON.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::flagellum::Flagellum;
use crate::models::motor::{Motor, MotorState};
use crate::models::pool::TubulinPool;
use crate::models::trace::TraceRecorder;
use crate::orchestrator::engine::{Simulation, SimulationConfig, SimulationError};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete engine state snapshot
///
/// Captures everything needed to resume a simulation from an arbitrary
/// point: the resume step, RNG state, every flagellum, every motor
/// (including its position history), the pool, and the aggregate traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Resume point (index of the last executed step)
    pub current_step: usize,

    /// Whether the initial span had been executed
    pub started: bool,

    /// RNG state at snapshot time (CRITICAL for determinism)
    pub rng_state: u64,

    /// All flagellum states
    pub flagella: Vec<FlagellumSnapshot>,

    /// All motor states
    pub motors: Vec<MotorSnapshot>,

    /// Shared pool state (two-flagella variant)
    pub pool: Option<PoolSnapshot>,

    /// Aggregate per-step traces
    pub traces: TraceRecorder,

    /// Whether the scripted perturbation already fired
    pub hand_of_god_applied: bool,

    /// SHA-256 hash of the originating config (for validation)
    pub config_hash: String,
}

/// Flagellum state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagellumSnapshot {
    pub length: f64,
}

impl From<&Flagellum> for FlagellumSnapshot {
    fn from(flagellum: &Flagellum) -> Self {
        FlagellumSnapshot {
            length: flagellum.length(),
        }
    }
}

/// Motor state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorSnapshot {
    pub position: f64,
    pub state: MotorState,
    pub flagellum: usize,
    pub cargo: f64,
    pub has_built: bool,
    pub track: Vec<f64>,
}

impl From<&Motor> for MotorSnapshot {
    fn from(motor: &Motor) -> Self {
        MotorSnapshot {
            position: motor.position(),
            state: motor.state(),
            flagellum: motor.flagellum(),
            cargo: motor.cargo(),
            has_built: motor.has_built(),
            track: motor.track().to_vec(),
        }
    }
}

impl From<MotorSnapshot> for Motor {
    fn from(snapshot: MotorSnapshot) -> Self {
        Motor::from_snapshot(
            snapshot.position,
            snapshot.state,
            snapshot.flagellum,
            snapshot.cargo,
            snapshot.has_built,
            snapshot.track,
        )
    }
}

/// Shared pool snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub tubulin: f64,
    pub in_flight: f64,
    pub exhausted_claims: usize,
}

impl From<&TubulinPool> for PoolSnapshot {
    fn from(pool: &TubulinPool) -> Self {
        PoolSnapshot {
            tubulin: pool.tubulin(),
            in_flight: pool.in_flight(),
            exhausted_claims: pool.exhausted_claims(),
        }
    }
}

impl From<&PoolSnapshot> for TubulinPool {
    fn from(snapshot: &PoolSnapshot) -> Self {
        TubulinPool::from_snapshot(
            snapshot.tubulin,
            snapshot.in_flight,
            snapshot.exhausted_claims,
        )
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA-256 hash of a config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on serializer map ordering.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate snapshot integrity against its config
///
/// Checks critical invariants:
/// - Motor population conservation
/// - Flagellum count matching
/// - Per-motor flagellum indices in range
/// - Trace and track arrays all the same length
/// - Non-negative lengths and in-flight cargo
fn validate_snapshot(
    snapshot: &StateSnapshot,
    config: &SimulationConfig,
) -> Result<(), SimulationError> {
    if snapshot.motors.len() != config.num_motors {
        return Err(SimulationError::StateValidationError(format!(
            "Population not conserved: expected {} motors, got {}",
            config.num_motors,
            snapshot.motors.len()
        )));
    }

    if snapshot.flagella.len() != config.flagella.len() {
        return Err(SimulationError::StateValidationError(format!(
            "Flagellum count mismatch: expected {}, got {}",
            config.flagella.len(),
            snapshot.flagella.len()
        )));
    }

    for (i, f) in snapshot.flagella.iter().enumerate() {
        if !(f.length.is_finite() && f.length >= 0.0) {
            return Err(SimulationError::StateValidationError(format!(
                "Flagellum {} has invalid length {}",
                i, f.length
            )));
        }
    }

    let num_steps = snapshot.traces.num_steps();
    if snapshot.traces.num_flagella() != config.flagella.len() {
        return Err(SimulationError::StateValidationError(
            "Trace arrays do not match the flagellum count".to_string(),
        ));
    }
    for (i, m) in snapshot.motors.iter().enumerate() {
        if m.flagellum >= config.flagella.len() {
            return Err(SimulationError::StateValidationError(format!(
                "Motor {} references flagellum {} out of range",
                i, m.flagellum
            )));
        }
        if m.track.len() != num_steps {
            return Err(SimulationError::StateValidationError(format!(
                "Motor {} track length {} does not match trace length {}",
                i,
                m.track.len(),
                num_steps
            )));
        }
    }

    if snapshot.started && snapshot.current_step >= num_steps {
        return Err(SimulationError::StateValidationError(format!(
            "Resume point {} is beyond the recorded traces ({})",
            snapshot.current_step, num_steps
        )));
    }

    if let Some(pool) = &snapshot.pool {
        if pool.in_flight < 0.0 {
            return Err(SimulationError::StateValidationError(format!(
                "Pool in-flight cargo is negative: {}",
                pool.in_flight
            )));
        }
    }

    Ok(())
}

// ============================================================================
// Simulation Integration
// ============================================================================

impl Simulation {
    /// Capture the complete engine state
    pub fn snapshot(&self) -> Result<StateSnapshot, SimulationError> {
        Ok(StateSnapshot {
            current_step: self.current_step(),
            started: self.has_started(),
            rng_state: self.rng_state(),
            flagella: self.flagella_snapshots(),
            motors: self.motors().iter().map(MotorSnapshot::from).collect(),
            pool: self.pool().map(PoolSnapshot::from),
            traces: self.traces_clone(),
            hand_of_god_applied: self.hand_of_god_applied(),
            config_hash: compute_config_hash(self.config())?,
        })
    }

    /// Rebuild a simulation from a snapshot
    ///
    /// `config` must be the configuration the snapshot was taken under;
    /// a hash mismatch is rejected. Extending the restored simulation
    /// continues the exact trajectory of the original.
    pub fn restore(
        config: SimulationConfig,
        snapshot: StateSnapshot,
    ) -> Result<Self, SimulationError> {
        let expected = compute_config_hash(&config)?;
        if expected != snapshot.config_hash {
            return Err(SimulationError::CheckpointMismatch {
                expected,
                actual: snapshot.config_hash,
            });
        }
        validate_snapshot(&snapshot, &config)?;

        let mut sim = Simulation::new(config)?;
        sim.load_snapshot(snapshot);
        Ok(sim)
    }
}

/// Serialize a snapshot to JSON
pub fn snapshot_to_json(snapshot: &StateSnapshot) -> Result<String, SimulationError> {
    serde_json::to_string(snapshot)
        .map_err(|e| SimulationError::SerializationError(format!("Snapshot encode failed: {}", e)))
}

/// Deserialize a snapshot from JSON
pub fn snapshot_from_json(json: &str) -> Result<StateSnapshot, SimulationError> {
    serde_json::from_str(json)
        .map_err(|e| SimulationError::SerializationError(format!("Snapshot decode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::engine::SimulationConfig;

    #[test]
    fn test_config_hash_is_stable() {
        let config = SimulationConfig::default();
        let h1 = compute_config_hash(&config).unwrap();
        let h2 = compute_config_hash(&config).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_config_hash_detects_changes() {
        let base = SimulationConfig::default();
        let changed = SimulationConfig {
            rng_seed: 999,
            ..SimulationConfig::default()
        };
        assert_ne!(
            compute_config_hash(&base).unwrap(),
            compute_config_hash(&changed).unwrap()
        );
    }

    #[test]
    fn test_restore_rejects_wrong_config() {
        let config = SimulationConfig {
            duration_seconds: 10.0,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config).unwrap();
        let snapshot = sim.snapshot().unwrap();

        let other = SimulationConfig {
            duration_seconds: 10.0,
            rng_seed: 42,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::restore(other, snapshot),
            Err(SimulationError::CheckpointMismatch { .. })
        ));
    }

    #[test]
    fn test_restore_rejects_tampered_population() {
        let config = SimulationConfig {
            duration_seconds: 10.0,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config.clone()).unwrap();
        let mut snapshot = sim.snapshot().unwrap();
        snapshot.motors.pop();

        assert!(matches!(
            Simulation::restore(config, snapshot),
            Err(SimulationError::StateValidationError(_))
        ));
    }
}
