//! Simulation engine - main step loop
//!
//! Integrates decay, avalanche recruitment, motor updates, and trace
//! recording into one deterministic per-step loop.
//!
//! See `engine.rs` for the full implementation.

pub mod checkpoint;
pub mod engine;

// Re-export main types for convenience
pub use engine::{
    AvalancheConfig, FlagellumConfig, HandOfGodConfig, PoolConfig, Simulation, SimulationConfig,
    SimulationError, SteadyStateConfig,
};

// Re-export checkpoint types
pub use checkpoint::{
    compute_config_hash, snapshot_from_json, snapshot_to_json, FlagellumSnapshot, MotorSnapshot,
    PoolSnapshot, StateSnapshot,
};
