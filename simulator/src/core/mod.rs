//! Core time management for the simulation

pub mod time;
