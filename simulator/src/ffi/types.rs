//! Python dict → Rust config conversion
//!
//! All keys are optional; missing keys fall back to the canonical model
//! defaults. Validation proper happens in `Simulation::new`, not here.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::engine::{
    FlagellumConfig, HandOfGodConfig, PoolConfig, SimulationConfig,
};

fn get_opt<'py, T: FromPyObject<'py>>(
    dict: &Bound<'py, PyDict>,
    key: &str,
) -> PyResult<Option<T>> {
    match dict.get_item(key)? {
        Some(value) => Ok(Some(value.extract()?)),
        None => Ok(None),
    }
}

/// Parse a simulation configuration from a Python dict
///
/// Recognized keys mirror the `SimulationConfig` fields, with
/// `initial_lengths` (list of floats, one per flagellum) standing in for
/// the flagella list, and flat `tubulin`/`k_tub` keys standing in for the
/// pool. `hand_of_god` is a nested dict with `multiplier` and optional
/// `trigger_seconds`.
pub fn parse_simulation_config(dict: &Bound<'_, PyDict>) -> PyResult<SimulationConfig> {
    let mut config = SimulationConfig::default();

    if let Some(v) = get_opt(dict, "duration_seconds")? {
        config.duration_seconds = v;
    }
    if let Some(v) = get_opt(dict, "step_seconds")? {
        config.step_seconds = v;
    }
    if let Some(v) = get_opt(dict, "rng_seed")? {
        config.rng_seed = v;
    }
    if let Some(v) = get_opt(dict, "num_motors")? {
        config.num_motors = v;
    }
    if let Some(v) = get_opt(dict, "transport_speed")? {
        config.transport_speed = v;
    }
    if let Some(v) = get_opt(dict, "diffusion_coefficient")? {
        config.diffusion_coefficient = v;
    }
    if let Some(v) = get_opt(dict, "decay_rate")? {
        config.decay_rate = v;
    }
    if let Some(v) = get_opt(dict, "build_size")? {
        config.build_size = v;
    }
    if let Some(v) = get_opt(dict, "cut_extension_seconds")? {
        config.cut_extension_seconds = v;
    }

    if let Some(v) = get_opt::<bool>(dict, "avalanche_enabled")? {
        config.avalanche.enabled = v;
    }
    if let Some(v) = get_opt(dict, "threshold")? {
        config.avalanche.threshold = v;
    }
    if let Some(v) = get_opt(dict, "avalanche_shape")? {
        config.avalanche.shape = v;
    }
    if let Some(v) = get_opt(dict, "avalanche_offset")? {
        config.avalanche.offset = v;
    }

    if let Some(lengths) = get_opt::<Vec<f64>>(dict, "initial_lengths")? {
        config.flagella = lengths
            .into_iter()
            .map(|initial_length| FlagellumConfig { initial_length })
            .collect();
    }

    let tubulin: Option<f64> = get_opt(dict, "tubulin")?;
    let k_tub: Option<f64> = get_opt(dict, "k_tub")?;
    if tubulin.is_some() || k_tub.is_some() {
        let defaults = PoolConfig::default();
        config.pool = Some(PoolConfig {
            tubulin: tubulin.unwrap_or(defaults.tubulin),
            k_tub: k_tub.unwrap_or(defaults.k_tub),
        });
    }

    if let Some(hog) = dict.get_item("hand_of_god")? {
        let hog = hog.downcast::<PyDict>()?;
        config.hand_of_god = Some(HandOfGodConfig {
            multiplier: get_opt(hog, "multiplier")?.unwrap_or(1.0),
            trigger_seconds: get_opt(hog, "trigger_seconds")?,
        });
    }

    if let Some(v) = get_opt::<bool>(dict, "steady_state_auto_extend")? {
        config.steady_state.auto_extend = v;
    }
    if let Some(v) = get_opt(dict, "fit_range_seconds")? {
        config.steady_state.fit_range_seconds = v;
    }
    if let Some(v) = get_opt(dict, "steady_state_eps")? {
        config.steady_state.eps = v;
    }
    if let Some(v) = get_opt(dict, "extension_seconds")? {
        config.steady_state.extension_seconds = v;
    }
    if let Some(v) = get_opt(dict, "max_extensions")? {
        config.steady_state.max_extensions = v;
    }

    Ok(config)
}
