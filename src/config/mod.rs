//! Configuration management for DOCI 2-RDM calculations
//!
//! A YAML file names the Hamiltonian and tunes the solver; every solver field is
//! optional and filled by `with_defaults`. Command-line flags override the file.

mod args;

pub use args::Args;

use doci_sdp::potential_reduction::{
    DEFAULT_MAX_INNER_BREAKS, DEFAULT_MAX_INNER_ITERATIONS, DEFAULT_REDUCTION_FACTOR,
    DEFAULT_TARGET, DEFAULT_TOLERANCE,
};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub hamiltonian: HamiltonianConfig,
    #[serde(default)]
    pub solver: SolverParams,
    #[serde(default)]
    pub output: OutputParams,
}

/// Source of the integrals: an FCIDUMP file or the reduced BCS pairing model
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HamiltonianConfig {
    pub fcidump: Option<String>,
    pub pairing: Option<PairingParams>,
    /// Overrides NELEC of the FCIDUMP header
    pub electrons: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PairingParams {
    pub levels: Vec<f64>,
    pub coupling: f64,
    pub electrons: usize,
}

/// Potential-reduction parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SolverParams {
    pub target: Option<f64>,
    pub tolerance: Option<f64>,
    pub reduction_factor: Option<f64>,
    pub max_inner_iterations: Option<usize>,
    pub max_inner_breaks: Option<usize>,
    pub cg_tolerance: Option<f64>,
    pub max_cg_iterations: Option<usize>,
    pub hole_condition: Option<bool>,
    pub reference: Option<bool>,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            target: Some(DEFAULT_TARGET),
            tolerance: Some(DEFAULT_TOLERANCE),
            reduction_factor: Some(DEFAULT_REDUCTION_FACTOR),
            max_inner_iterations: Some(DEFAULT_MAX_INNER_ITERATIONS),
            max_inner_breaks: Some(DEFAULT_MAX_INNER_BREAKS),
            cg_tolerance: Some(1e-12),
            max_cg_iterations: Some(0),
            hole_condition: Some(true),
            reference: Some(false),
        }
    }
}

impl SolverParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.target = self.target.or(defaults.target);
        self.tolerance = self.tolerance.or(defaults.tolerance);
        self.reduction_factor = self.reduction_factor.or(defaults.reduction_factor);
        self.max_inner_iterations = self.max_inner_iterations.or(defaults.max_inner_iterations);
        self.max_inner_breaks = self.max_inner_breaks.or(defaults.max_inner_breaks);
        self.cg_tolerance = self.cg_tolerance.or(defaults.cg_tolerance);
        self.max_cg_iterations = self.max_cg_iterations.or(defaults.max_cg_iterations);
        self.hole_condition = self.hole_condition.or(defaults.hole_condition);
        self.reference = self.reference.or(defaults.reference);
        self
    }
}

/// Where results go besides the log
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OutputParams {
    pub rdm: Option<String>,
    pub progress: Option<String>,
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.solver = self.solver.with_defaults();
        self
    }

    pub fn is_reference_enabled(&self) -> bool {
        self.solver.reference.unwrap_or(false)
    }
}
