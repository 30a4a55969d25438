//! Motor - the transport agent
//!
//! A motor cycles through three states:
//!
//! ```text
//! Base --(avalanche recruitment)--> Transporting
//! Transporting --(arrival at tip, cargo deposit)--> Diffusing
//! Diffusing --(random walk back to position <= 0)--> Base
//! ```
//!
//! The state is a single enum, so an inconsistent combination (a motor
//! both bound at the base and actively transporting, say) is not
//! representable.
//!
//! # Critical Invariants
//!
//! 1. **Bounded position**: `0 <= position <= flagellum.length()` after
//!    every update.
//! 2. **Once-per-episode deposit**: `has_built` guards the cargo deposit so
//!    a motor lingering at the tip never grows the flagellum twice for one
//!    recruitment.
//! 3. **Sequential updates**: motors are stepped in index order; a later
//!    motor's boundary checks observe length changes deposited by earlier
//!    motors in the same step. This ordering is part of the reproducible
//!    behavior, not an accident.

use serde::{Deserialize, Serialize};

use crate::models::flagellum::Flagellum;
use crate::models::pool::TubulinPool;
use crate::rng::RngManager;

/// Transport state of a motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorState {
    /// Waiting at the flagellar base, position pinned to 0
    Base,
    /// Active transport (IFT) from base to tip
    Transporting,
    /// Diffusive random walk back toward the base
    Diffusing,
}

/// One motor agent
///
/// Motors are created once at simulation start and never destroyed; the
/// population size is conserved for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motor {
    /// Position along the flagellum (microns)
    position: f64,

    /// Current transport state
    state: MotorState,

    /// Index of the owning flagellum, fixed at creation
    flagellum: usize,

    /// Length increment this motor deposits on arrival at the tip
    cargo: f64,

    /// Whether the cargo of the current recruitment episode was deposited
    has_built: bool,

    /// Position per step, for external plotting/analysis
    track: Vec<f64>,
}

impl Motor {
    /// Create a motor at the base of the given flagellum
    ///
    /// # Arguments
    /// * `flagellum` - Index of the owning flagellum
    /// * `num_steps` - Planned run length; sizes the position trace
    pub fn new(flagellum: usize, num_steps: usize) -> Self {
        Self {
            position: 0.0,
            state: MotorState::Base,
            flagellum,
            cargo: 0.0,
            has_built: false,
            track: vec![0.0; num_steps],
        }
    }

    /// Position along the flagellum (microns)
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current transport state
    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Index of the owning flagellum
    pub fn flagellum(&self) -> usize {
        self.flagellum
    }

    /// Cargo this motor carries (or last carried)
    pub fn cargo(&self) -> f64 {
        self.cargo
    }

    /// Whether the current recruitment episode's cargo was deposited
    pub fn has_built(&self) -> bool {
        self.has_built
    }

    /// Position history, one entry per simulated step
    pub fn track(&self) -> &[f64] {
        &self.track
    }

    /// Whether the motor is waiting at the base
    pub fn is_at_base(&self) -> bool {
        self.state == MotorState::Base
    }

    /// Promote a Base motor into active transport with the given cargo
    ///
    /// Only the avalanche policy calls this; the `has_built` latch resets
    /// so the new episode deposits exactly once.
    pub fn recruit(&mut self, cargo: f64) {
        debug_assert_eq!(self.state, MotorState::Base, "recruit requires a Base motor");
        self.state = MotorState::Transporting;
        self.cargo = cargo;
        self.has_built = false;
    }

    /// One step of active transport toward the tip
    ///
    /// On arrival (`position >= length`) the cargo is deposited, the pool's
    /// in-flight accounting is released, and the motor flips to Diffusing
    /// with its position at the just-grown tip.
    pub fn transport(
        &mut self,
        flagellum: &mut Flagellum,
        pool: Option<&mut TubulinPool>,
        step_distance: f64,
    ) {
        if self.position < flagellum.length() {
            self.position += step_distance;
        }

        if self.position >= flagellum.length() {
            if !self.has_built {
                flagellum.deposit(self.cargo);
                self.has_built = true;
                if let Some(pool) = pool {
                    pool.release_in_flight(self.cargo);
                }
            }
            self.state = MotorState::Diffusing;
            // Park at the tip, which the deposit may just have moved.
            self.position = flagellum.length();
        }
    }

    /// One step of the diffusive random walk
    ///
    /// A motor exactly at the tip can only step inward; elsewhere the walk
    /// is a symmetric ±`rms_displacement` step clamped to `[0, length]`.
    /// If the tip has decayed below the motor, the motor first snaps down
    /// to the new tip. Reaching the base (`position <= 0`) returns the
    /// motor to the Base state with its position pinned to 0.
    pub fn diffuse(&mut self, flagellum: &Flagellum, rms_displacement: f64, rng: &mut RngManager) {
        let length = flagellum.length();

        // Tip receded past this motor since its last update.
        if self.position > length {
            self.position = length;
        }

        if self.position == length {
            self.position -= rms_displacement;
        } else {
            if rng.coin_flip() {
                self.position -= rms_displacement;
            } else {
                self.position += rms_displacement;
            }

            if self.position < 0.0 {
                self.position = 0.0;
            } else if self.position > length {
                self.position = length;
            }
        }

        if self.position <= 0.0 {
            self.position = 0.0;
            self.state = MotorState::Base;
        }
    }

    /// Record the current position into the per-motor trace
    pub fn record(&mut self, step: usize) {
        self.track[step] = self.position;
    }

    /// Grow the position trace for a resumed run (`n - 1` rule)
    pub fn extend_track(&mut self, additional_steps: usize) {
        self.track
            .extend(std::iter::repeat(0.0).take(additional_steps.saturating_sub(1)));
    }

    /// Rebuild a motor from checkpointed state
    pub fn from_snapshot(
        position: f64,
        state: MotorState,
        flagellum: usize,
        cargo: f64,
        has_built: bool,
        track: Vec<f64>,
    ) -> Self {
        Self {
            position,
            state,
            flagellum,
            cargo,
            has_built,
            track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagellum(length: f64) -> Flagellum {
        Flagellum::new(length, 0.001)
    }

    #[test]
    fn test_new_motor_starts_at_base() {
        let motor = Motor::new(0, 100);
        assert_eq!(motor.state(), MotorState::Base);
        assert_eq!(motor.position(), 0.0);
        assert_eq!(motor.track().len(), 100);
    }

    #[test]
    fn test_transport_advances_by_step_distance() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.00125);
        let mut f = flagellum(10.0);

        motor.transport(&mut f, None, 0.2);
        assert!((motor.position() - 0.2).abs() < 1e-12);
        assert_eq!(motor.state(), MotorState::Transporting);
    }

    #[test]
    fn test_arrival_deposits_once_and_flips_to_diffusing() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.5);
        let mut f = flagellum(0.1);

        motor.transport(&mut f, None, 0.2);
        assert_eq!(motor.state(), MotorState::Diffusing);
        assert!((f.length() - 0.6).abs() < 1e-12);
        // Parked at the freshly grown tip.
        assert_eq!(motor.position(), f.length());
    }

    #[test]
    fn test_recruitment_on_zero_length_builds_immediately() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.00125);
        let mut f = flagellum(0.0);

        motor.transport(&mut f, None, 0.2);
        assert_eq!(motor.state(), MotorState::Diffusing);
        assert!((f.length() - 0.00125).abs() < 1e-12);
    }

    #[test]
    fn test_diffusing_motor_at_tip_steps_inward() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.0);
        let mut f = flagellum(5.0);
        // Walk the motor to the tip.
        for _ in 0..100 {
            if motor.state() == MotorState::Transporting {
                motor.transport(&mut f, None, 0.2);
            }
        }
        assert_eq!(motor.state(), MotorState::Diffusing);
        let mut rng = RngManager::new(1);
        let at_tip = motor.position();
        motor.diffuse(&f, 0.59, &mut rng);
        assert!(motor.position() < at_tip, "tip-bound walk must step inward");
    }

    #[test]
    fn test_diffusion_returns_to_base() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.0);
        let mut f = flagellum(0.5);
        motor.transport(&mut f, None, 0.2);
        motor.transport(&mut f, None, 0.2);
        motor.transport(&mut f, None, 0.2);
        assert_eq!(motor.state(), MotorState::Diffusing);

        let mut rng = RngManager::new(99);
        for _ in 0..10_000 {
            if motor.state() == MotorState::Base {
                break;
            }
            motor.diffuse(&f, 0.59, &mut rng);
            assert!(motor.position() >= 0.0);
            assert!(motor.position() <= f.length());
        }
        assert_eq!(motor.state(), MotorState::Base);
        assert_eq!(motor.position(), 0.0);
    }

    #[test]
    fn test_tip_recession_snaps_motor_down() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.0);
        let mut f = flagellum(2.0);
        for _ in 0..20 {
            if motor.state() == MotorState::Transporting {
                motor.transport(&mut f, None, 0.2);
            }
        }
        assert_eq!(motor.state(), MotorState::Diffusing);

        // Tip decays far below the motor.
        let shrunk = Flagellum::new(0.3, 0.001);
        let mut rng = RngManager::new(5);
        motor.diffuse(&shrunk, 0.05, &mut rng);
        assert!(motor.position() <= shrunk.length());
    }

    #[test]
    fn test_no_double_deposit_for_one_episode() {
        let mut motor = Motor::new(0, 10);
        motor.recruit(0.5);
        let mut f = flagellum(0.0);

        motor.transport(&mut f, None, 0.2);
        let after_first = f.length();
        // A second transport call in the same episode must not deposit again.
        motor.recruit_state_for_test();
        motor.transport(&mut f, None, 0.2);
        assert_eq!(f.length(), after_first);
    }

    impl Motor {
        /// Force the state back to Transporting without resetting the
        /// deposit latch, to exercise the once-per-episode guard.
        fn recruit_state_for_test(&mut self) {
            self.state = MotorState::Transporting;
        }
    }
}
