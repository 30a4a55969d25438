//! Trace recording
//!
//! Per-step time series recorded by the engine and read by external
//! plotting/analysis collaborators. Arrays are pre-sized to the planned
//! run length and written by step index, so a resumed run lands its
//! entries exactly where an uninterrupted run would have.
//!
//! # The `n - 1` growth rule
//!
//! Extending a run by `n` steps grows every array by `n - 1` slots. This
//! matches the resume semantics of the engine: the resume point
//! (`current_step`) is the last executed index and is re-executed, so an
//! extension writes indices `current_step .. current_step + n`, of which
//! only `n - 1` are new.

use serde::{Deserialize, Serialize};

/// Growable per-step records of the simulation's aggregate observables
///
/// # Example
///
/// ```rust
/// use ift_simulator_core_rs::TraceRecorder;
///
/// let mut traces = TraceRecorder::new(1, 100);
/// traces.record_length(0, 0, 1.25);
/// traces.record_avalanche(0, 0, 12);
/// assert_eq!(traces.length_trace(0).len(), 100);
/// assert_eq!(traces.avalanche_trace(0)[0], 12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecorder {
    /// Length over time, one array per flagellum (microns)
    lengths: Vec<Vec<f64>>,

    /// Avalanche release size over time, one array per flagellum; exactly
    /// one entry per step, zeros included, never sparse
    avalanches: Vec<Vec<usize>>,

    /// Motors beginning active transport (position < 1 um) per step
    flux: Vec<usize>,

    /// Motors waiting at the base per step
    base_occupancy: Vec<usize>,
}

impl TraceRecorder {
    /// Pre-allocate traces for a planned run
    ///
    /// # Arguments
    /// * `num_flagella` - Number of per-flagellum arrays (1 or 2)
    /// * `num_steps` - Planned run length in steps
    pub fn new(num_flagella: usize, num_steps: usize) -> Self {
        Self {
            lengths: vec![vec![0.0; num_steps]; num_flagella],
            avalanches: vec![vec![0; num_steps]; num_flagella],
            flux: vec![0; num_steps],
            base_occupancy: vec![0; num_steps],
        }
    }

    /// Total recorded steps (current array length)
    pub fn num_steps(&self) -> usize {
        self.flux.len()
    }

    /// Number of flagella being traced
    pub fn num_flagella(&self) -> usize {
        self.lengths.len()
    }

    /// Grow every array for an extension of `additional_steps` steps
    ///
    /// Arrays grow by `additional_steps - 1` zero slots; prior values are
    /// preserved untouched.
    pub fn extend(&mut self, additional_steps: usize) {
        let extra = additional_steps.saturating_sub(1);
        for trace in &mut self.lengths {
            trace.extend(std::iter::repeat(0.0).take(extra));
        }
        for trace in &mut self.avalanches {
            trace.extend(std::iter::repeat(0).take(extra));
        }
        self.flux.extend(std::iter::repeat(0).take(extra));
        self.base_occupancy.extend(std::iter::repeat(0).take(extra));
    }

    /// Record a flagellum's length at a step
    pub fn record_length(&mut self, flagellum: usize, step: usize, length: f64) {
        self.lengths[flagellum][step] = length;
    }

    /// Record an avalanche release size (possibly zero) at a step
    pub fn record_avalanche(&mut self, flagellum: usize, step: usize, release: usize) {
        self.avalanches[flagellum][step] = release;
    }

    /// Record the transport flux at a step
    pub fn record_flux(&mut self, step: usize, count: usize) {
        self.flux[step] = count;
    }

    /// Record the base occupancy at a step
    pub fn record_base_occupancy(&mut self, step: usize, count: usize) {
        self.base_occupancy[step] = count;
    }

    /// Length over time for one flagellum
    pub fn length_trace(&self, flagellum: usize) -> &[f64] {
        &self.lengths[flagellum]
    }

    /// Avalanche release sizes over time for one flagellum
    pub fn avalanche_trace(&self, flagellum: usize) -> &[usize] {
        &self.avalanches[flagellum]
    }

    /// Motors beginning transport, per step
    pub fn flux_trace(&self) -> &[usize] {
        &self.flux
    }

    /// Motors at the base, per step
    pub fn base_occupancy_trace(&self) -> &[usize] {
        &self.base_occupancy
    }
}
