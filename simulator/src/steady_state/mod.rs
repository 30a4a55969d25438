//! Steady-state detection
//!
//! A flagellum has plateaued when the trailing window of its length trace
//! fits a near-flat line. This is a heuristic plateau detector, not a
//! convergence proof; false positives near noisy local plateaus are
//! expected and accepted.

use serde::{Deserialize, Serialize};

/// Plateau detector over a trailing window of the length trace
///
/// # Example
///
/// ```rust
/// use ift_simulator_core_rs::SteadyStateDetector;
///
/// let detector = SteadyStateDetector::new(100, 5e-6);
/// let flat = vec![10.0; 200];
/// assert!(detector.is_steady(&flat));
///
/// let short = vec![10.0; 50];
/// assert!(!detector.is_steady(&short)); // shorter than the window
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteadyStateDetector {
    /// Number of trailing samples to fit
    fit_range: usize,

    /// Absolute slope below which the trace counts as flat
    eps: f64,
}

impl SteadyStateDetector {
    /// Create a detector
    ///
    /// # Arguments
    /// * `fit_range` - Trailing window, in steps (already converted from
    ///   physical time by the caller)
    /// * `eps` - Slope tolerance (microns per step)
    pub fn new(fit_range: usize, eps: f64) -> Self {
        Self { fit_range, eps }
    }

    /// Trailing window length in steps
    pub fn fit_range(&self) -> usize {
        self.fit_range
    }

    /// Whether the trace has plateaued
    ///
    /// Fits an ordinary least-squares line to the last `fit_range` samples
    /// (x = step index, y = length) and reports steady iff
    /// `|slope| < eps`. Traces shorter than the window are not steady.
    pub fn is_steady(&self, trace: &[f64]) -> bool {
        if trace.len() < self.fit_range || self.fit_range < 2 {
            return false;
        }
        let tail = &trace[trace.len() - self.fit_range..];
        ols_slope(tail).abs() < self.eps
    }
}

/// Ordinary least-squares slope of `y` against `x = 0..n`
fn ols_slope(y: &[f64]) -> f64 {
    let n = y.len() as f64;
    let sum_x = (n - 1.0) * n / 2.0;
    let sum_x2 = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = y.iter().enumerate().map(|(i, v)| i as f64 * v).sum();

    (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x)
}
