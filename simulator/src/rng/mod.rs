//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, deterministic random number generation.
//! CRITICAL: All randomness in the simulation MUST go through this module.
//! The motor diffusion walk and the avalanche release sizes both draw from
//! the single stream owned by the simulation, so a fixed seed reproduces a
//! run bit for bit.

mod xorshift;

pub use xorshift::RngManager;
