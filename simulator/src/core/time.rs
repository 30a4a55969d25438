//! Time management for the simulation
//!
//! The simulation operates in discrete steps of fixed physical duration.
//! Physical parameters (speeds, rates, fit windows) are specified in
//! seconds and converted to step counts exactly once, here.
//!
//! # Resume semantics
//!
//! `current_step` is the index of the step being (or last) executed, not
//! the length of the recorded traces. A resumed run re-enters the loop at
//! `current_step`, which keeps trace indices aligned with the `n - 1`
//! growth rule used by [`TraceRecorder::extend`](crate::models::trace::TraceRecorder::extend).

use serde::{Deserialize, Serialize};

/// Manages simulation time in discrete steps
///
/// # Example
/// ```
/// use ift_simulator_core_rs::StepClock;
///
/// let mut clock = StepClock::new(0.1); // 0.1 s per step
/// assert_eq!(clock.current_step(), 0);
/// assert_eq!(clock.steps_for_duration(3000.0), 30000);
///
/// clock.enter_step(5);
/// assert_eq!(clock.elapsed_seconds(), 0.5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepClock {
    /// Index of the step currently being executed
    current_step: usize,
    /// Physical duration of one step (seconds)
    step_seconds: f64,
}

impl StepClock {
    /// Create a new StepClock
    ///
    /// # Arguments
    /// * `step_seconds` - Physical duration of one simulation step
    ///
    /// # Panics
    /// Panics if `step_seconds` is not strictly positive. Engine
    /// construction validates the configuration before building a clock.
    pub fn new(step_seconds: f64) -> Self {
        assert!(step_seconds > 0.0, "step_seconds must be positive");
        Self {
            current_step: 0,
            step_seconds,
        }
    }

    /// Mark the given step as the one being executed
    pub fn enter_step(&mut self, step: usize) {
        self.current_step = step;
    }

    /// Index of the step currently being executed
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Physical duration of one step (seconds)
    pub fn step_seconds(&self) -> f64 {
        self.step_seconds
    }

    /// Physical time at the current step (seconds)
    pub fn elapsed_seconds(&self) -> f64 {
        self.current_step as f64 * self.step_seconds
    }

    /// Convert a physical duration to a step count (truncating)
    ///
    /// # Example
    /// ```
    /// use ift_simulator_core_rs::StepClock;
    ///
    /// let clock = StepClock::new(0.1);
    /// assert_eq!(clock.steps_for_duration(500.0), 5000);
    /// ```
    pub fn steps_for_duration(&self, seconds: f64) -> usize {
        (seconds / self.step_seconds) as usize
    }
}
