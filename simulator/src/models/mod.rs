//! Domain types for the simulation

pub mod flagellum;
pub mod motor;
pub mod pool;
pub mod trace;
