//! Simulation Engine
//!
//! Main step loop integrating all components:
//! - Flagellar decay (deterministic shrinkage)
//! - Avalanche recruitment (stochastic burst injection into transport)
//! - Motor updates (active transport and diffusion, sequential order)
//! - Trace recording (length, flux, base occupancy, avalanche sizes)
//!
//! # Architecture
//!
//! Each step `i`:
//!
//! ```text
//! 1. Hand-of-God perturbation (if scripted for this step)
//! 2. Decay every flagellum (clamped at zero)
//! 3. Avalanche recruitment, per flagellum
//! 4. Step every motor, in index order
//! 5. Record traces
//! ```
//!
//! Motors are updated strictly sequentially: a transporting motor's tip
//! deposit is visible to every later motor's boundary check within the
//! same step. This ordering is part of the reproducible behavior and must
//! not be parallelized away.
//!
//! # Determinism
//!
//! All randomness flows through one seeded xorshift64* stream.
//! Same seed + same config = bit-identical traces.
//!
//! # Example
//!
//! ```rust
//! use ift_simulator_core_rs::{Simulation, SimulationConfig};
//!
//! let mut config = SimulationConfig::default();
//! config.duration_seconds = 50.0; // keep the doctest fast
//! let mut sim = Simulation::new(config).unwrap();
//! sim.run().unwrap();
//!
//! let lengths = sim.length_trace(0).unwrap();
//! assert_eq!(lengths.len(), 500);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::StepClock;
use crate::models::flagellum::Flagellum;
use crate::models::motor::{Motor, MotorState};
use crate::models::pool::TubulinPool;
use crate::models::trace::TraceRecorder;
use crate::orchestrator::checkpoint::{FlagellumSnapshot, StateSnapshot};
use crate::recruitment::AvalanchePolicy;
use crate::rng::RngManager;
use crate::steady_state::SteadyStateDetector;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete simulation configuration
///
/// Physical quantities are in microns and seconds; the engine converts
/// them to per-step increments exactly once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated physical time (seconds)
    pub duration_seconds: f64,

    /// Physical duration of one step (seconds)
    pub step_seconds: f64,

    /// RNG seed for deterministic simulation
    pub rng_seed: u64,

    /// Motor population size (conserved for the whole run)
    pub num_motors: usize,

    /// Active transport (IFT) speed (microns/second)
    pub transport_speed: f64,

    /// Motor diffusion coefficient (square microns/second)
    pub diffusion_coefficient: f64,

    /// Flagellar decay rate (microns/second)
    pub decay_rate: f64,

    /// Length deposited per tip arrival (microns); in the shared-pool
    /// variant this is only the closed-form prediction's reference value,
    /// actual cargo is claimed from the pool at recruitment time
    pub build_size: f64,

    /// Avalanche recruitment parameters
    pub avalanche: AvalancheConfig,

    /// One or two flagella
    pub flagella: Vec<FlagellumConfig>,

    /// Shared tubulin pool; required iff two flagella are configured
    pub pool: Option<PoolConfig>,

    /// Optional scripted length perturbation
    pub hand_of_god: Option<HandOfGodConfig>,

    /// Steady-state detection and auto-extension parameters
    pub steady_state: SteadyStateConfig,

    /// How long to keep simulating after a `cut` (seconds)
    pub cut_extension_seconds: f64,
}

impl Default for SimulationConfig {
    /// Canonical single-flagellum model parameters
    fn default() -> Self {
        Self {
            duration_seconds: 3000.0,
            step_seconds: 0.1,
            rng_seed: 12345,
            num_motors: 200,
            transport_speed: 2.0,
            diffusion_coefficient: 1.75,
            decay_rate: 0.01,
            build_size: 0.00125,
            avalanche: AvalancheConfig::default(),
            flagella: vec![FlagellumConfig::default()],
            pool: None,
            hand_of_god: None,
            steady_state: SteadyStateConfig::default(),
            cut_extension_seconds: 2000.0,
        }
    }
}

impl SimulationConfig {
    /// Canonical two-flagella shared-pool parameters
    pub fn two_flagella() -> Self {
        Self {
            duration_seconds: 2000.0,
            num_motors: 400,
            build_size: 0.003,
            flagella: vec![FlagellumConfig::default(), FlagellumConfig::default()],
            pool: Some(PoolConfig::default()),
            ..Self::default()
        }
    }
}

/// Avalanche recruitment parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvalancheConfig {
    /// Whether recruitment runs at all (disabled = motors stay put)
    pub enabled: bool,

    /// Base occupancy that must be strictly exceeded to trigger a release
    pub threshold: usize,

    /// Weibull shape parameter for burst sizes
    pub shape: f64,

    /// Additive offset applied to the scaled draw
    pub offset: f64,
}

impl Default for AvalancheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 30,
            shape: 2.85,
            offset: 1.0,
        }
    }
}

/// Per-flagellum configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagellumConfig {
    /// Length at simulation start (microns)
    pub initial_length: f64,
}

/// Shared tubulin pool configuration (two-flagella variant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Total material capacity (micron-equivalents)
    pub tubulin: f64,

    /// Fraction of the free pool claimed per recruited motor
    pub k_tub: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tubulin: 30.0,
            k_tub: 0.000125,
        }
    }
}

/// Scripted, non-stochastic length perturbation ("Hand of God")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandOfGodConfig {
    /// Factor applied to every flagellum's length at the trigger step
    pub multiplier: f64,

    /// Physical trigger time; None means the midpoint of the initial run
    pub trigger_seconds: Option<f64>,
}

/// Steady-state detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteadyStateConfig {
    /// If true, `run` keeps extending until the detector reports steady
    pub auto_extend: bool,

    /// Trailing fit window (seconds)
    pub fit_range_seconds: f64,

    /// Slope tolerance (microns per step)
    pub eps: f64,

    /// Length of each extension (seconds)
    pub extension_seconds: f64,

    /// Hard cap on extensions; exceeding it is an error, not a hang
    pub max_extensions: usize,
}

impl Default for SteadyStateConfig {
    fn default() -> Self {
        Self {
            auto_extend: false,
            fit_range_seconds: 1000.0,
            eps: 5e-6,
            extension_seconds: 500.0,
            max_extensions: 200,
        }
    }
}

/// Simulation error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Configuration validation error
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Flagellum index out of range
    #[error("No flagellum with index {0}")]
    FlagellumNotFound(usize),

    /// The auto-extend loop hit its hard cap before plateauing
    #[error("Steady state not reached after {extensions} extensions")]
    SteadyStateNotReached { extensions: usize },

    /// Snapshot serialization/hashing failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Snapshot was produced under a different configuration
    #[error("Checkpoint config mismatch: expected {expected}, got {actual}")]
    CheckpointMismatch { expected: String, actual: String },

    /// Snapshot is internally inconsistent
    #[error("State validation error: {0}")]
    StateValidationError(String),
}

// ============================================================================
// Simulation
// ============================================================================

/// Resolved Hand-of-God schedule
#[derive(Debug, Clone)]
struct HandOfGod {
    multiplier: f64,
    trigger_step: usize,
    /// Latch: the perturbation fires exactly once even if the trigger step
    /// is re-executed by a resume
    applied: bool,
}

/// Main engine owning all simulation state and the step loop
///
/// The Simulation owns its motor collection, flagella, optional pool, RNG
/// and traces; nothing is process-global, and independent runs share no
/// state.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Original configuration (kept for prediction, checkpointing, resume)
    config: SimulationConfig,

    /// Step counter; `current_step` is the resume point
    clock: StepClock,

    /// Deterministic RNG, the engine's single randomness stream
    rng: RngManager,

    /// The flagella (1 or 2), indexed by motor ownership
    flagella: Vec<Flagellum>,

    /// Fixed motor population, stepped in index order
    motors: Vec<Motor>,

    /// Shared material pool (two-flagella variant only)
    pool: Option<TubulinPool>,

    /// Avalanche release sizing
    policy: AvalanchePolicy,

    /// Aggregate per-step records
    traces: TraceRecorder,

    /// Per-step transport distance (microns): `v * step_seconds`
    transport_step: f64,

    /// Per-step diffusion step (microns): `sqrt(2 D step_seconds)`
    rms_displacement: f64,

    /// Pool claim constant (0 when no pool)
    k_tub: f64,

    /// Steps in the initially configured span
    planned_steps: usize,

    /// Resolved scripted perturbation
    hand_of_god: Option<HandOfGod>,

    /// Whether the initial span has been executed
    started: bool,
}

impl Simulation {
    /// Create a new simulation from configuration
    ///
    /// Initializes flagella, the motor population (split evenly across
    /// flagella), the pool, and pre-sized traces. Fails fast on invalid
    /// configuration rather than producing silent nonsense traces.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ift_simulator_core_rs::{Simulation, SimulationConfig};
    ///
    /// let sim = Simulation::new(SimulationConfig::default()).unwrap();
    /// assert_eq!(sim.num_motors(), 200);
    /// assert_eq!(sim.num_flagella(), 1);
    /// ```
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let clock = StepClock::new(config.step_seconds);
        let planned_steps = clock.steps_for_duration(config.duration_seconds);
        if planned_steps == 0 {
            return Err(SimulationError::InvalidConfig(
                "duration shorter than one step".to_string(),
            ));
        }

        let decay_per_step = config.decay_rate * config.step_seconds;
        let flagella: Vec<Flagellum> = config
            .flagella
            .iter()
            .map(|fc| Flagellum::new(fc.initial_length, decay_per_step))
            .collect();

        // Motors split evenly: first half owns flagellum 0, second half
        // flagellum 1 (trivially all on 0 in the single-flagellum case).
        let num_flagella = flagella.len();
        let motors: Vec<Motor> = (0..config.num_motors)
            .map(|i| Motor::new(i * num_flagella / config.num_motors, planned_steps))
            .collect();

        let pool = config.pool.as_ref().map(|pc| TubulinPool::new(pc.tubulin));
        let k_tub = config.pool.as_ref().map(|pc| pc.k_tub).unwrap_or(0.0);

        let policy = AvalanchePolicy::new(
            config.avalanche.threshold,
            config.avalanche.shape,
            config.avalanche.offset,
        );

        let hand_of_god = config.hand_of_god.as_ref().map(|h| HandOfGod {
            multiplier: h.multiplier,
            trigger_step: h
                .trigger_seconds
                .map(|s| clock.steps_for_duration(s))
                .unwrap_or(planned_steps / 2),
            applied: false,
        });

        let traces = TraceRecorder::new(num_flagella, planned_steps);
        let rng = RngManager::new(config.rng_seed);
        let transport_step = config.step_seconds * config.transport_speed;
        let rms_displacement = (2.0 * config.diffusion_coefficient * config.step_seconds).sqrt();

        Ok(Self {
            config,
            clock,
            rng,
            flagella,
            motors,
            pool,
            policy,
            traces,
            transport_step,
            rms_displacement,
            k_tub,
            planned_steps,
            hand_of_god,
            started: false,
        })
    }

    /// Validate configuration
    fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
        fn positive(value: f64, name: &str) -> Result<(), SimulationError> {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
            Ok(())
        }

        positive(config.step_seconds, "step_seconds")?;
        positive(config.duration_seconds, "duration_seconds")?;
        positive(config.transport_speed, "transport_speed")?;
        positive(config.diffusion_coefficient, "diffusion_coefficient")?;
        positive(config.build_size, "build_size")?;
        positive(config.cut_extension_seconds, "cut_extension_seconds")?;

        if !(config.decay_rate.is_finite() && config.decay_rate >= 0.0) {
            return Err(SimulationError::InvalidConfig(
                "decay_rate must be non-negative".to_string(),
            ));
        }

        if config.num_motors == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_motors must be > 0".to_string(),
            ));
        }

        if config.avalanche.threshold >= config.num_motors {
            return Err(SimulationError::InvalidConfig(format!(
                "avalanche threshold {} must be below the motor population {}",
                config.avalanche.threshold, config.num_motors
            )));
        }
        positive(config.avalanche.shape, "avalanche.shape")?;
        if !(config.avalanche.offset.is_finite() && config.avalanche.offset >= 0.0) {
            return Err(SimulationError::InvalidConfig(
                "avalanche.offset must be non-negative".to_string(),
            ));
        }

        match config.flagella.len() {
            1 | 2 => {}
            n => {
                return Err(SimulationError::InvalidConfig(format!(
                    "flagella count must be 1 or 2, got {}",
                    n
                )))
            }
        }
        for (i, fc) in config.flagella.iter().enumerate() {
            if !(fc.initial_length.is_finite() && fc.initial_length >= 0.0) {
                return Err(SimulationError::InvalidConfig(format!(
                    "flagellum {} initial_length must be non-negative",
                    i
                )));
            }
        }

        // The shared pool and the two-flagella variant come together.
        match (&config.pool, config.flagella.len()) {
            (Some(pc), 2) => {
                positive(pc.tubulin, "pool.tubulin")?;
                positive(pc.k_tub, "pool.k_tub")?;
            }
            (None, 1) => {}
            (Some(_), _) => {
                return Err(SimulationError::InvalidConfig(
                    "a shared pool requires exactly two flagella".to_string(),
                ))
            }
            (None, _) => {
                return Err(SimulationError::InvalidConfig(
                    "two flagella require a shared pool".to_string(),
                ))
            }
        }

        if let Some(h) = &config.hand_of_god {
            if !(h.multiplier.is_finite() && h.multiplier >= 0.0) {
                return Err(SimulationError::InvalidConfig(
                    "hand_of_god.multiplier must be non-negative".to_string(),
                ));
            }
        }

        positive(config.steady_state.fit_range_seconds, "steady_state.fit_range_seconds")?;
        positive(config.steady_state.eps, "steady_state.eps")?;
        positive(config.steady_state.extension_seconds, "steady_state.extension_seconds")?;
        if config.steady_state.max_extensions == 0 {
            return Err(SimulationError::InvalidConfig(
                "steady_state.max_extensions must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Index of the last executed step (the resume point)
    pub fn current_step(&self) -> usize {
        self.clock.current_step()
    }

    /// Physical time at the current step (seconds)
    pub fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed_seconds()
    }

    /// Total recorded steps (grows with extensions)
    pub fn num_steps(&self) -> usize {
        self.traces.num_steps()
    }

    /// Number of flagella (1 or 2)
    pub fn num_flagella(&self) -> usize {
        self.flagella.len()
    }

    /// Motor population size
    pub fn num_motors(&self) -> usize {
        self.motors.len()
    }

    /// The motor population, in update order
    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    /// Current length of one flagellum (microns)
    pub fn flagellum_length(&self, flagellum: usize) -> Option<f64> {
        self.flagella.get(flagellum).map(|f| f.length())
    }

    /// The shared pool, when configured
    pub fn pool(&self) -> Option<&TubulinPool> {
        self.pool.as_ref()
    }

    /// Length over time for one flagellum
    pub fn length_trace(&self, flagellum: usize) -> Option<&[f64]> {
        (flagellum < self.traces.num_flagella()).then(|| self.traces.length_trace(flagellum))
    }

    /// Avalanche release size over time for one flagellum
    pub fn avalanche_trace(&self, flagellum: usize) -> Option<&[usize]> {
        (flagellum < self.traces.num_flagella()).then(|| self.traces.avalanche_trace(flagellum))
    }

    /// Motors beginning active transport, per step
    pub fn flux_trace(&self) -> &[usize] {
        self.traces.flux_trace()
    }

    /// Motors waiting at the base, per step
    pub fn base_occupancy_trace(&self) -> &[usize] {
        self.traces.base_occupancy_trace()
    }

    /// Position history of one motor
    pub fn motor_track(&self, motor: usize) -> Option<&[f64]> {
        self.motors.get(motor).map(|m| m.track())
    }

    /// Configuration this simulation was built from
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current RNG state (for checkpointing/replay)
    pub fn rng_state(&self) -> u64 {
        self.rng.get_state()
    }

    pub(crate) fn has_started(&self) -> bool {
        self.started
    }

    pub(crate) fn flagella_snapshots(&self) -> Vec<FlagellumSnapshot> {
        self.flagella.iter().map(FlagellumSnapshot::from).collect()
    }

    pub(crate) fn traces_clone(&self) -> TraceRecorder {
        self.traces.clone()
    }

    pub(crate) fn hand_of_god_applied(&self) -> bool {
        self.hand_of_god.as_ref().map(|h| h.applied).unwrap_or(false)
    }

    /// Overwrite engine state from a validated snapshot
    pub(crate) fn load_snapshot(&mut self, snapshot: StateSnapshot) {
        let decay_per_step = self.config.decay_rate * self.config.step_seconds;

        self.clock.enter_step(snapshot.current_step);
        self.started = snapshot.started;
        self.rng = RngManager::new(snapshot.rng_state);
        self.flagella = snapshot
            .flagella
            .iter()
            .map(|f| Flagellum::new(f.length, decay_per_step))
            .collect();
        self.motors = snapshot.motors.into_iter().map(Motor::from).collect();
        self.pool = snapshot.pool.as_ref().map(TubulinPool::from);
        self.traces = snapshot.traces;
        if let Some(hog) = &mut self.hand_of_god {
            hog.applied = snapshot.hand_of_god_applied;
        }
    }

    /// Closed-form steady-state length approximation (microns)
    ///
    /// Derived independently of the stochastic run, for empirical
    /// validation. The formula differs between the unlimited-material and
    /// shared-pool variants; parameter sets outside the model's regime can
    /// yield NaN or infinity.
    pub fn predicted_length(&self) -> f64 {
        let d = self.config.diffusion_coefficient;
        let v = self.config.transport_speed;
        let surplus = (self.config.num_motors - self.config.avalanche.threshold) as f64;
        let ratio = 2.0 * d * surplus * self.config.build_size / self.config.decay_rate;

        if self.pool.is_some() {
            ratio.sqrt()
        } else {
            -d / v + (-4.0 * d + (d / v).powi(2) + ratio).sqrt()
        }
    }

    // ========================================================================
    // Step Loop
    // ========================================================================

    /// Execute the initially configured span
    ///
    /// Runs steps `[0, planned)`. Calling `run` again after the span has
    /// executed is a no-op; a run never re-targets below `current_step`.
    /// With `steady_state.auto_extend` set, the run keeps extending until
    /// the detector reports a plateau (bounded by `max_extensions`).
    pub fn run(&mut self) -> Result<(), SimulationError> {
        if !self.started {
            self.started = true;
            self.run_span(0, self.planned_steps);
        }

        if self.config.steady_state.auto_extend {
            self.steady_state_loop()?;
        }
        Ok(())
    }

    /// Extend the run by `additional_steps` and resume
    ///
    /// Traces grow by `additional_steps - 1` slots (prior values
    /// preserved) and the loop resumes from `current_step`, which is
    /// re-executed; see [`TraceRecorder::extend`] for why the indices line
    /// up. An unstarted simulation runs its initial span first.
    pub fn extend(&mut self, additional_steps: usize) -> Result<(), SimulationError> {
        if !self.started {
            self.started = true;
            self.run_span(0, self.planned_steps);
        }
        if additional_steps == 0 {
            return Ok(());
        }

        self.traces.extend(additional_steps);
        for motor in &mut self.motors {
            motor.extend_track(additional_steps);
        }

        let start = self.clock.current_step();
        self.run_span(start, start + additional_steps);
        Ok(())
    }

    /// Sever a flagellum and keep simulating
    ///
    /// Forces the flagellum's length to zero, then continues for the
    /// configured `cut_extension_seconds` window. Models an experimental
    /// severing of the organelle. The other flagellum (if any) is
    /// untouched.
    pub fn cut(&mut self, flagellum: usize) -> Result<(), SimulationError> {
        self.flagella
            .get_mut(flagellum)
            .ok_or(SimulationError::FlagellumNotFound(flagellum))?
            .cut();

        let steps = self.clock.steps_for_duration(self.config.cut_extension_seconds);
        self.extend(steps)
    }

    /// Run, then extend until every flagellum's length trace plateaus
    ///
    /// Returns the number of extensions performed. Exceeding
    /// `steady_state.max_extensions` is an error rather than an unbounded
    /// loop.
    pub fn run_to_steady_state(&mut self) -> Result<usize, SimulationError> {
        if !self.started {
            self.started = true;
            self.run_span(0, self.planned_steps);
        }
        self.steady_state_loop()
    }

    /// Whether every flagellum's length trace currently fits a plateau
    pub fn is_steady(&self) -> bool {
        let detector = self.detector();
        (0..self.flagella.len())
            .all(|f| detector.is_steady(self.traces.length_trace(f)))
    }

    fn detector(&self) -> SteadyStateDetector {
        let fit_range = self
            .clock
            .steps_for_duration(self.config.steady_state.fit_range_seconds);
        SteadyStateDetector::new(fit_range, self.config.steady_state.eps)
    }

    fn steady_state_loop(&mut self) -> Result<usize, SimulationError> {
        let extension = self
            .clock
            .steps_for_duration(self.config.steady_state.extension_seconds);

        let mut extensions = 0;
        while !self.is_steady() {
            if extensions >= self.config.steady_state.max_extensions {
                return Err(SimulationError::SteadyStateNotReached { extensions });
            }
            self.extend(extension)?;
            extensions += 1;
        }
        Ok(extensions)
    }

    fn run_span(&mut self, start: usize, end: usize) {
        for step in start..end {
            self.execute_step(step);
        }
    }

    /// One simulation step
    fn execute_step(&mut self, step: usize) {
        self.clock.enter_step(step);

        // STEP 1: HAND OF GOD
        // Scripted, non-stochastic length perturbation; fires once.
        if let Some(hog) = &mut self.hand_of_god {
            if !hog.applied && step == hog.trigger_step {
                hog.applied = true;
                for flagellum in &mut self.flagella {
                    flagellum.scale(hog.multiplier);
                }
            }
        }

        // STEP 2: DECAY
        for flagellum in &mut self.flagella {
            flagellum.apply_decay();
        }

        // STEP 3: AVALANCHE RECRUITMENT
        // Writes one avalanche entry per flagellum per step, zeros included.
        if self.config.avalanche.enabled {
            self.run_recruitment(step);
        } else {
            for f in 0..self.flagella.len() {
                self.traces.record_avalanche(f, step, 0);
            }
        }

        // STEP 4: MOTOR UPDATES
        // Sequential, index order: later motors observe earlier motors'
        // deposits within this same step.
        let transport_step = self.transport_step;
        let rms_displacement = self.rms_displacement;
        {
            let Simulation {
                motors,
                flagella,
                pool,
                rng,
                ..
            } = self;

            for motor in motors.iter_mut() {
                let flagellum = &mut flagella[motor.flagellum()];
                match motor.state() {
                    MotorState::Base => {}
                    MotorState::Transporting => {
                        motor.transport(flagellum, pool.as_mut(), transport_step)
                    }
                    MotorState::Diffusing => motor.diffuse(flagellum, rms_displacement, rng),
                }
                motor.record(step);
            }
        }

        // STEP 5: RECORD TRACES
        for (f, flagellum) in self.flagella.iter().enumerate() {
            self.traces.record_length(f, step, flagellum.length());
        }
        let flux = self
            .motors
            .iter()
            .filter(|m| m.state() == MotorState::Transporting && m.position() < 1.0)
            .count();
        let base = self.motors.iter().filter(|m| m.is_at_base()).count();
        self.traces.record_flux(step, flux);
        self.traces.record_base_occupancy(step, base);
    }

    /// Avalanche recruitment for every flagellum, in index order
    ///
    /// Base motors are promoted in motor index order so runs are
    /// reproducible under a fixed seed. In the shared-pool variant each
    /// recruit claims its cargo at this moment; a claim immediately
    /// reduces the pool seen by every later claim in the same step,
    /// including the other flagellum's.
    fn run_recruitment(&mut self, step: usize) {
        let total_length: f64 = self.flagella.iter().map(|f| f.length()).sum();

        for f in 0..self.flagella.len() {
            let base_motors: Vec<usize> = self
                .motors
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_at_base() && m.flagellum() == f)
                .map(|(i, _)| i)
                .collect();

            let release = self.policy.release_count(base_motors.len(), &mut self.rng);
            for &idx in base_motors.iter().take(release) {
                let cargo = match self.pool.as_mut() {
                    Some(pool) => pool.claim(self.k_tub, total_length),
                    None => self.config.build_size,
                };
                self.motors[idx].recruit(cargo);
            }

            self.traces.record_avalanche(f, step, release);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> SimulationConfig {
        SimulationConfig {
            duration_seconds: 100.0,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(short_config()).unwrap();
        assert_eq!(sim.current_step(), 0);
        assert_eq!(sim.num_motors(), 200);
        assert_eq!(sim.num_flagella(), 1);
        assert_eq!(sim.num_steps(), 1000);
    }

    #[test]
    fn test_all_motors_start_at_base() {
        let sim = Simulation::new(short_config()).unwrap();
        assert!(sim.motors().iter().all(|m| m.is_at_base()));
    }

    #[test]
    fn test_two_flagella_motor_split() {
        let sim = Simulation::new(SimulationConfig {
            duration_seconds: 10.0,
            ..SimulationConfig::two_flagella()
        })
        .unwrap();
        let on_first = sim.motors().iter().filter(|m| m.flagellum() == 0).count();
        let on_second = sim.motors().iter().filter(|m| m.flagellum() == 1).count();
        assert_eq!(on_first, 200);
        assert_eq!(on_second, 200);
    }

    #[test]
    fn test_validate_zero_motors() {
        let config = SimulationConfig {
            num_motors: 0,
            ..short_config()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_threshold_exceeding_population() {
        let config = SimulationConfig {
            num_motors: 20,
            ..short_config()
        };
        // Default threshold 30 >= 20 motors.
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_validate_non_positive_step() {
        let config = SimulationConfig {
            step_seconds: 0.0,
            ..short_config()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_validate_pool_without_second_flagellum() {
        let config = SimulationConfig {
            pool: Some(PoolConfig::default()),
            ..short_config()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_validate_two_flagella_without_pool() {
        let config = SimulationConfig {
            flagella: vec![FlagellumConfig::default(), FlagellumConfig::default()],
            pool: None,
            ..short_config()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_validate_three_flagella_rejected() {
        let config = SimulationConfig {
            flagella: vec![FlagellumConfig::default(); 3],
            pool: Some(PoolConfig::default()),
            ..short_config()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_run_is_idempotent() {
        let mut sim = Simulation::new(short_config()).unwrap();
        sim.run().unwrap();
        let step = sim.current_step();
        let trace: Vec<f64> = sim.length_trace(0).unwrap().to_vec();
        sim.run().unwrap();
        assert_eq!(sim.current_step(), step);
        assert_eq!(sim.length_trace(0).unwrap(), &trace[..]);
    }

    #[test]
    fn test_run_leaves_resume_point_at_last_step() {
        let mut sim = Simulation::new(short_config()).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.current_step(), 999);
        assert_eq!(sim.num_steps(), 1000);
    }

    #[test]
    fn test_extend_grows_traces_by_n_minus_one() {
        let mut sim = Simulation::new(short_config()).unwrap();
        sim.run().unwrap();
        sim.extend(500).unwrap();
        assert_eq!(sim.num_steps(), 1499);
        assert_eq!(sim.current_step(), 1498);
        assert_eq!(sim.motor_track(0).unwrap().len(), 1499);
    }

    #[test]
    fn test_hand_of_god_fires_at_midpoint() {
        let mut config = short_config();
        config.flagella[0].initial_length = 10.0;
        config.avalanche.enabled = false;
        config.decay_rate = 0.0;
        config.hand_of_god = Some(HandOfGodConfig {
            multiplier: 2.0,
            trigger_seconds: None,
        });

        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();
        let trace = sim.length_trace(0).unwrap();
        assert_eq!(trace[499], 10.0);
        assert_eq!(trace[500], 20.0);
        assert_eq!(trace[999], 20.0);
    }

    #[test]
    fn test_cut_unknown_flagellum() {
        let mut sim = Simulation::new(short_config()).unwrap();
        sim.run().unwrap();
        assert_eq!(
            sim.cut(3),
            Err(SimulationError::FlagellumNotFound(3))
        );
    }

    #[test]
    fn test_predicted_length_single_flagellum_default() {
        let sim = Simulation::new(SimulationConfig::default()).unwrap();
        // -D/v + sqrt(-4D + (D/v)^2 + 2*D*(N-thresh)*build/decay)
        let expected = -1.75 / 2.0
            + (-4.0 * 1.75 + (1.75_f64 / 2.0).powi(2)
                + 2.0 * 1.75 * 170.0 * 0.00125 / 0.01)
                .sqrt();
        assert!((sim.predicted_length() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_avalanche_disabled_means_no_transport() {
        let mut config = short_config();
        config.avalanche.enabled = false;
        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();
        assert!(sim.motors().iter().all(|m| m.is_at_base()));
        assert!(sim.avalanche_trace(0).unwrap().iter().all(|&a| a == 0));
        assert!(sim.flux_trace().iter().all(|&f| f == 0));
    }
}
