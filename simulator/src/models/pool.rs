//! Shared tubulin pool (two-flagella variant)
//!
//! Both flagella draw building material from one finite pool. A recruited
//! motor claims its cargo at injection time, so material committed to
//! motors still travelling counts against the pool (`in_flight`) even
//! though it has not been deposited yet.
//!
//! # Critical Invariants
//!
//! 1. `in_flight >= 0`: claims only add non-negative cargo and each claim
//!    is released exactly once on deposit.
//! 2. Claims within one step observe earlier claims from the same step:
//!    `claim` updates `in_flight` immediately, so the second avalanche of a
//!    step sees the pool already drawn down by the first.
//! 3. An exhausted pool yields zero cargo, never negative cargo; the
//!    occurrences are counted so exhaustion is observable.

use serde::{Deserialize, Serialize};

/// Finite material budget shared by both flagella
///
/// # Example
///
/// ```rust
/// use ift_simulator_core_rs::TubulinPool;
///
/// let mut pool = TubulinPool::new(30.0);
/// let cargo = pool.claim(0.000125, 4.0 + 6.0);
/// assert!((cargo - 0.000125 * 20.0).abs() < 1e-12);
/// assert_eq!(pool.in_flight(), cargo);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TubulinPool {
    /// Total material capacity (micron-equivalents)
    tubulin: f64,

    /// Cargo claimed by motors currently transporting, not yet deposited
    in_flight: f64,

    /// Number of claims made against an exhausted pool (served as zero)
    exhausted_claims: usize,
}

impl TubulinPool {
    /// Create a pool with the given total capacity
    pub fn new(tubulin: f64) -> Self {
        Self {
            tubulin,
            in_flight: 0.0,
            exhausted_claims: 0,
        }
    }

    /// Rebuild a pool from checkpointed state
    pub fn from_snapshot(tubulin: f64, in_flight: f64, exhausted_claims: usize) -> Self {
        Self {
            tubulin,
            in_flight,
            exhausted_claims,
        }
    }

    /// Total capacity
    pub fn tubulin(&self) -> f64 {
        self.tubulin
    }

    /// Cargo currently committed to travelling motors
    pub fn in_flight(&self) -> f64 {
        self.in_flight
    }

    /// How many claims were made while the pool was exhausted
    ///
    /// A non-zero count means the parameter set drove the free pool
    /// negative at some point; those claims were served as zero cargo.
    pub fn exhausted_claims(&self) -> usize {
        self.exhausted_claims
    }

    /// Material not yet built into a flagellum or claimed by a motor
    ///
    /// `total_length` is the summed length of all flagella. The result can
    /// be negative under pool exhaustion; `claim` clamps, this accessor
    /// does not.
    pub fn available(&self, total_length: f64) -> f64 {
        self.tubulin - total_length - self.in_flight
    }

    /// Claim cargo for one recruited motor
    ///
    /// Cargo is `k_tub` times the free pool, clamped at zero, and is added
    /// to `in_flight` immediately so later claims in the same step see the
    /// reduced pool.
    pub fn claim(&mut self, k_tub: f64, total_length: f64) -> f64 {
        let free = self.available(total_length);
        if free <= 0.0 {
            self.exhausted_claims += 1;
            return 0.0;
        }
        let cargo = k_tub * free;
        self.in_flight += cargo;
        cargo
    }

    /// Return a motor's cargo from in-flight accounting on deposit
    pub fn release_in_flight(&mut self, amount: f64) {
        self.in_flight -= amount;
        // Claims are released exactly once, so this only corrects float dust.
        if self.in_flight < 0.0 {
            self.in_flight = 0.0;
        }
    }
}
