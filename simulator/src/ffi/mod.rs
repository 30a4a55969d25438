//! FFI layer exposing the engine to Python
//!
//! Plotting and notebook analysis live on the Python side; this layer only
//! hands over the trace arrays and the run/extend/cut operations.

pub mod simulation;
pub mod types;
