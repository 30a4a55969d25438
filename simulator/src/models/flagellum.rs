//! Flagellum - the length-regulated organelle
//!
//! A flagellum is a single scalar length plus the decay applied to it every
//! step. Growth is not part of the decay update: length increases only as a
//! side effect of a transporting motor depositing its cargo at the tip
//! (see [`Motor::transport`](crate::models::motor::Motor::transport)).
//!
//! # Critical Invariants
//!
//! 1. **Non-negative length**: decay snaps to exactly 0 rather than going
//!    below it; no partial-step decay is applied.
//! 2. **Single writer**: only the engine's sequential step loop mutates a
//!    flagellum, so within-step ordering of deposits is deterministic.

use serde::{Deserialize, Serialize};

/// One flagellum: current length and its per-step decay increment
///
/// # Example
///
/// ```rust
/// use ift_simulator_core_rs::Flagellum;
///
/// // decay rate 0.01 um/s at 0.1 s per step
/// let mut flagellum = Flagellum::new(5.0, 0.01 * 0.1);
/// flagellum.apply_decay();
/// assert!((flagellum.length() - 4.999).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flagellum {
    /// Current length (microns), never negative
    length: f64,

    /// Length removed per step (microns); decay rate pre-multiplied by the
    /// step duration, never re-scaled by callers
    decay_per_step: f64,
}

impl Flagellum {
    /// Create a flagellum with an initial length
    pub fn new(initial_length: f64, decay_per_step: f64) -> Self {
        Self {
            length: initial_length,
            decay_per_step,
        }
    }

    /// Current length (microns)
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Apply one step of decay
    ///
    /// If the remaining length is smaller than one decay increment the
    /// flagellum snaps to zero instead of going negative.
    pub fn apply_decay(&mut self) {
        if self.length >= self.decay_per_step {
            self.length -= self.decay_per_step;
        } else {
            self.length = 0.0;
        }
    }

    /// Deposit cargo at the tip, growing the flagellum
    pub fn deposit(&mut self, amount: f64) {
        self.length += amount;
    }

    /// Sever the flagellum: length forced to zero, simulation continues
    pub fn cut(&mut self) {
        self.length = 0.0;
    }

    /// Scale the length by a factor (the "Hand of God" perturbation)
    pub fn scale(&mut self, factor: f64) {
        self.length *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_subtracts_one_increment() {
        let mut flagellum = Flagellum::new(1.0, 0.001);
        flagellum.apply_decay();
        assert!((flagellum.length() - 0.999).abs() < 1e-12);
    }

    #[test]
    fn test_decay_snaps_to_zero() {
        let mut flagellum = Flagellum::new(0.0005, 0.001);
        flagellum.apply_decay();
        assert_eq!(flagellum.length(), 0.0);
    }

    #[test]
    fn test_decay_at_exact_increment_reaches_zero() {
        let mut flagellum = Flagellum::new(0.001, 0.001);
        flagellum.apply_decay();
        assert_eq!(flagellum.length(), 0.0);
    }

    #[test]
    fn test_cut_zeroes_length() {
        let mut flagellum = Flagellum::new(11.5, 0.001);
        flagellum.cut();
        assert_eq!(flagellum.length(), 0.0);
    }

    #[test]
    fn test_deposit_then_decay_order_independent_of_growth() {
        let mut flagellum = Flagellum::new(0.0, 0.001);
        flagellum.deposit(0.00125);
        flagellum.apply_decay();
        assert!((flagellum.length() - 0.00025).abs() < 1e-12);
    }
}
