//! IFT Flagellar Length Simulator - Rust Engine
//!
//! Discrete-time stochastic simulation of flagellar length regulation by
//! intraflagellar transport (IFT): a fixed population of motor agents
//! shuttles building material from the flagellar base to the tip while the
//! flagellum continuously decays, producing an emergent steady-state
//! length. Supports a single flagellum with unlimited material and two
//! flagella competing for a shared, finite tubulin pool.
//!
//! # Architecture
//!
//! - **core**: Step clock and time/step conversions
//! - **models**: Domain types (Flagellum, Motor, TubulinPool, TraceRecorder)
//! - **recruitment**: Avalanche recruitment policy
//! - **steady_state**: Plateau detection on length traces
//! - **orchestrator**: Main step loop and checkpointing
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Flagellar length is never negative
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Motors are updated strictly sequentially within a step

// Module declarations
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod recruitment;
pub mod rng;
pub mod steady_state;

// Re-exports for convenience
pub use crate::core::time::StepClock;
pub use models::{
    flagellum::Flagellum,
    motor::{Motor, MotorState},
    pool::TubulinPool,
    trace::TraceRecorder,
};
pub use orchestrator::{
    compute_config_hash, AvalancheConfig, FlagellumConfig, FlagellumSnapshot, HandOfGodConfig,
    MotorSnapshot, PoolConfig, PoolSnapshot, Simulation, SimulationConfig, SimulationError,
    StateSnapshot, SteadyStateConfig,
};
pub use recruitment::AvalanchePolicy;
pub use rng::RngManager;
pub use steady_state::SteadyStateDetector;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn ift_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PySimulation>()?;
    Ok(())
}
