//! Python bindings for the simulation engine

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::engine::{Simulation, SimulationError};
use crate::orchestrator::{snapshot_from_json, snapshot_to_json};

use super::types::parse_simulation_config;

fn map_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidConfig(_) | SimulationError::FlagellumNotFound(_) => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Python wrapper around the Rust simulation engine
///
/// Construct with a config dict, then drive it with `run`, `extend`,
/// `cut`, or `run_to_steady_state`, and read traces back as lists.
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: Simulation,
}

#[pymethods]
impl PySimulation {
    /// Create a simulation from a configuration dict
    #[new]
    fn new(config: &Bound<'_, PyDict>) -> PyResult<Self> {
        let config = parse_simulation_config(config)?;
        let inner = Simulation::new(config).map_err(map_err)?;
        Ok(Self { inner })
    }

    /// Run the configured initial span (no-op once started)
    fn run(&mut self) -> PyResult<()> {
        self.inner.run().map_err(map_err)
    }

    /// Continue the simulation for additional recorded steps
    fn extend(&mut self, additional_steps: usize) -> PyResult<()> {
        self.inner.extend(additional_steps).map_err(map_err)
    }

    /// Sever the given flagellum and run the post-cut span
    fn cut(&mut self, flagellum: usize) -> PyResult<()> {
        self.inner.cut(flagellum).map_err(map_err)
    }

    /// Extend until the length trace plateaus; returns extensions used
    fn run_to_steady_state(&mut self) -> PyResult<usize> {
        self.inner.run_to_steady_state().map_err(map_err)
    }

    fn is_steady(&self) -> bool {
        self.inner.is_steady()
    }

    fn current_step(&self) -> usize {
        self.inner.current_step()
    }

    fn elapsed_seconds(&self) -> f64 {
        self.inner.elapsed_seconds()
    }

    fn num_steps(&self) -> usize {
        self.inner.num_steps()
    }

    fn num_flagella(&self) -> usize {
        self.inner.num_flagella()
    }

    fn num_motors(&self) -> usize {
        self.inner.num_motors()
    }

    fn flagellum_length(&self, flagellum: usize) -> PyResult<f64> {
        self.inner
            .flagellum_length(flagellum)
            .ok_or_else(|| PyValueError::new_err(format!("no flagellum {flagellum}")))
    }

    /// Closed-form steady-state length prediction for the current config
    fn predicted_length(&self) -> f64 {
        self.inner.predicted_length()
    }

    fn length_trace(&self, flagellum: usize) -> PyResult<Vec<f64>> {
        self.inner
            .length_trace(flagellum)
            .map(|t| t.to_vec())
            .ok_or_else(|| PyValueError::new_err(format!("no flagellum {flagellum}")))
    }

    fn avalanche_trace(&self, flagellum: usize) -> PyResult<Vec<usize>> {
        self.inner
            .avalanche_trace(flagellum)
            .map(|t| t.to_vec())
            .ok_or_else(|| PyValueError::new_err(format!("no flagellum {flagellum}")))
    }

    fn flux_trace(&self) -> Vec<usize> {
        self.inner.flux_trace().to_vec()
    }

    fn base_occupancy_trace(&self) -> Vec<usize> {
        self.inner.base_occupancy_trace().to_vec()
    }

    fn motor_track(&self, motor: usize) -> PyResult<Vec<f64>> {
        self.inner
            .motor_track(motor)
            .map(|t| t.to_vec())
            .ok_or_else(|| PyValueError::new_err(format!("no motor {motor}")))
    }

    /// Remaining free material in the shared pool, if one is configured
    fn pool_available(&self) -> Option<f64> {
        let total: f64 = (0..self.inner.num_flagella())
            .filter_map(|i| self.inner.flagellum_length(i))
            .sum();
        self.inner.pool().map(|p| p.available(total))
    }

    /// Serialize the full simulation state to a JSON string
    fn snapshot_json(&self) -> PyResult<String> {
        let snapshot = self.inner.snapshot().map_err(map_err)?;
        snapshot_to_json(&snapshot).map_err(map_err)
    }

    /// Restore a simulation from a config dict and a snapshot JSON string
    #[staticmethod]
    fn restore_json(config: &Bound<'_, PyDict>, json: &str) -> PyResult<Self> {
        let config = parse_simulation_config(config)?;
        let snapshot = snapshot_from_json(json).map_err(map_err)?;
        let inner = Simulation::restore(config, snapshot).map_err(map_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "Simulation(flagella={}, motors={}, step={}/{})",
            self.inner.num_flagella(),
            self.inner.num_motors(),
            self.inner.current_step(),
            self.inner.num_steps(),
        )
    }
}
