//! Potential-reduction interior-point solver for the DOCI 2-RDM.
//!
//! The outer loop drives the barrier weight `t` from 1 towards `target`, shrinking it
//! by `reduction_factor` after every outer iteration. For each `t` the inner loop runs
//! damped Newton iterations on the potential
//!
//! ```text
//! φ_t(Γ) = <H, Γ> - t sum_cones logdet(C(Γ))
//! ```
//!
//! until the squared step norm falls below the inner tolerance. Between outer
//! iterations the difference of consecutive converged iterates is used as a predictor
//! step, again with an exact line search.
//!
//! The solver can be driven in one go ([`Method::run`]) or step by step
//! ([`PotentialReduction::start`], [`PotentialReduction::outer_step`],
//! [`PotentialReduction::resume`]). It is `Clone`: a copy taken mid-run continues
//! independently of the original.

pub mod line_search;
pub mod newton;
#[cfg(test)]
mod tests;

pub use newton::{CgResult, CgSettings};

use crate::cancel::CancellationToken;
use crate::error::{Result, SolverError};
use crate::hamiltonian::IntegralSource;
use crate::io::{progress, rdm_file};
use crate::lineq::Lineq;
use crate::sup::{ConeKind, Sup};
use crate::tpm::Tpm;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_TARGET: f64 = 1e-12;
pub const DEFAULT_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_REDUCTION_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_INNER_ITERATIONS: usize = 10_000;
pub const DEFAULT_MAX_INNER_BREAKS: usize = 100;

/// Inner tolerance after each outer iteration is this multiple of `t`, floored at `target`.
const TOLERANCE_PER_BARRIER: f64 = 1e-5;

/// An optimiser that produces a 2-RDM and its energy for a fixed Hamiltonian.
///
/// Outer searches (orbital rotations and the like) only rely on this contract, so
/// different inner optimisers can be swapped.
pub trait Method {
    fn run(&mut self, cancel: &CancellationToken) -> Result<RunReport>;

    /// Electronic energy of the current 2-RDM, without the constant shift.
    fn energy(&self) -> f64;

    /// Electronic energy plus nuclear repulsion.
    fn full_energy(&self) -> f64;

    fn rdm(&self) -> &Tpm;

    fn lineq(&self) -> &Lineq;
}

/// Result of a complete (or cancelled) run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Total number of inner Newton iterations.
    pub iterations: usize,
    pub outer_iterations: usize,
    pub energy: f64,
    pub full_energy: f64,
    pub trace: f64,
    pub spin_squared: f64,
    pub elapsed: Duration,
    /// Outer iterations whose inner loop hit the iteration cap.
    pub inner_breaks: usize,
    pub cancelled: bool,
}

/// Summary of a single outer iteration.
#[derive(Clone, Debug)]
pub struct OuterStep {
    pub index: usize,
    /// Barrier weight used by the inner loop of this step.
    pub t: f64,
    /// Full energy after the predictor step.
    pub energy: f64,
    pub inner_iterations: usize,
    pub hit_cap: bool,
}

/// Bookkeeping of a run in progress.
#[derive(Clone, Copy, Debug)]
struct RunState {
    t: f64,
    outer: usize,
    total_inner: usize,
    breaks: usize,
    elapsed: Duration,
}

impl RunState {
    fn initial() -> Self {
        RunState {
            t: 1.0,
            outer: 0,
            total_inner: 0,
            breaks: 0,
            elapsed: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PotentialReduction {
    l: usize,
    n: usize,
    nuclear_repulsion: f64,
    norm_ham: f64,
    ham: Tpm,
    rdm: Tpm,
    previous_rdm: Tpm,
    lineq: Lineq,
    cones: Vec<ConeKind>,

    target: f64,
    /// Inner tolerance of the first outer iteration, restored by `start`.
    initial_tolerance: f64,
    /// Inner tolerance of the current outer iteration.
    tolerance: f64,
    reduction_factor: f64,
    max_inner_iterations: usize,
    max_inner_breaks: usize,
    cg: CgSettings,
    progress_file: Option<PathBuf>,

    state: Option<RunState>,
}

impl PotentialReduction {
    /// Builds the normalised reduced Hamiltonian and the constraints for `source`.
    pub fn new<S: IntegralSource + ?Sized>(source: &S) -> Result<Self> {
        let l = source.num_orbitals();
        let n = source.num_electrons();
        let lineq = Lineq::new(l, n)?;

        let mut ham = Tpm::new(l, n);
        ham.ham(source);
        let mut norm_ham = ham.dot(&ham).sqrt();
        if norm_ham > 0.0 {
            ham /= norm_ham;
        } else {
            warn!("Hamiltonian vanishes identically; leaving it unnormalised");
            norm_ham = 1.0;
        }

        let mut rdm = Tpm::new(l, n);
        lineq.feasible_init(&mut rdm);

        debug!("PotentialReduction L={} N={} |H|={:.10}", l, n, norm_ham);

        Ok(PotentialReduction {
            l,
            n,
            nuclear_repulsion: source.nuclear_repulsion(),
            norm_ham,
            ham,
            previous_rdm: rdm.clone(),
            rdm,
            lineq,
            cones: vec![ConeKind::Particle, ConeKind::Hole],
            target: DEFAULT_TARGET,
            initial_tolerance: DEFAULT_TOLERANCE,
            tolerance: DEFAULT_TOLERANCE,
            reduction_factor: DEFAULT_REDUCTION_FACTOR,
            max_inner_iterations: DEFAULT_MAX_INNER_ITERATIONS,
            max_inner_breaks: DEFAULT_MAX_INNER_BREAKS,
            cg: CgSettings::default(),
            progress_file: None,
            state: None,
        })
    }

    pub fn num_orbitals(&self) -> usize {
        self.l
    }

    pub fn num_electrons(&self) -> usize {
        self.n
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Inner tolerance of the current outer iteration.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn reduction_factor(&self) -> f64 {
        self.reduction_factor
    }

    pub fn nuclear_repulsion(&self) -> f64 {
        self.nuclear_repulsion
    }

    /// Norm of the reduced Hamiltonian before normalisation.
    pub fn norm_ham(&self) -> f64 {
        self.norm_ham
    }

    /// The unit-norm reduced Hamiltonian.
    pub fn ham(&self) -> &Tpm {
        &self.ham
    }

    pub fn cones(&self) -> &[ConeKind] {
        &self.cones
    }

    /// Current barrier weight, `None` before [`PotentialReduction::start`].
    pub fn barrier_weight(&self) -> Option<f64> {
        self.state.map(|state| state.t)
    }

    /// Inner iterations performed since the last start.
    pub fn total_iterations(&self) -> usize {
        self.state.map_or(0, |state| state.total_inner)
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Sets the inner tolerance for the current outer iteration and for every later
    /// [`PotentialReduction::start`].
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.initial_tolerance = tolerance;
        self.tolerance = tolerance;
    }

    pub fn set_reduction_factor(&mut self, reduction_factor: f64) {
        self.reduction_factor = reduction_factor;
    }

    pub fn set_max_inner_iterations(&mut self, max_inner_iterations: usize) {
        self.max_inner_iterations = max_inner_iterations;
    }

    pub fn set_max_inner_breaks(&mut self, max_inner_breaks: usize) {
        self.max_inner_breaks = max_inner_breaks;
    }

    pub fn set_cg_tolerance(&mut self, tolerance: f64) {
        self.cg.tolerance = tolerance;
    }

    pub fn set_max_cg_iterations(&mut self, max_iterations: usize) {
        self.cg.max_iterations = max_iterations;
    }

    /// File that receives one progress line per outer iteration; `None` disables it.
    pub fn set_progress_file(&mut self, path: Option<PathBuf>) {
        self.progress_file = path;
    }

    /// Enables or disables the two-hole condition `Q >= 0`.
    pub fn set_hole_condition(&mut self, enabled: bool) {
        self.cones = if enabled {
            vec![ConeKind::Particle, ConeKind::Hole]
        } else {
            vec![ConeKind::Particle]
        };
    }

    /// Replaces the current 2-RDM, e.g. with one read from disk.
    pub fn load_rdm(&mut self, rdm: Tpm) -> Result<()> {
        if rdm.num_orbitals() != self.l || rdm.num_electrons() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected_l: self.l,
                expected_n: self.n,
                found_l: rdm.num_orbitals(),
                found_n: rdm.num_electrons(),
            });
        }
        self.rdm = rdm;
        Ok(())
    }

    pub fn save_rdm(&self, path: impl AsRef<Path>) -> Result<()> {
        rdm_file::save_rdm(&self.rdm, path)
    }

    /// Checks the scalar controls, restores the inner tolerance and resets the
    /// iterate to the uniform ensemble.
    pub fn start(&mut self) -> Result<()> {
        self.tolerance = self.initial_tolerance;
        self.validate()?;

        self.lineq.feasible_init(&mut self.rdm);
        self.previous_rdm = self.rdm.clone();
        self.state = Some(RunState::initial());

        info!("===========================================");
        info!("   Potential reduction: L={}, N={}", self.l, self.n);
        info!("===========================================");
        info!("Target barrier weight: {:.2e}", self.target);
        info!("Inner tolerance: {:.2e}", self.tolerance);
        info!("Reduction factor: {}", self.reduction_factor);
        info!(
            "Cones: {}",
            self.cones
                .iter()
                .map(|kind| kind.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!(
            "Constraints: {} ({} independent)",
            self.lineq.num_constraints(),
            self.lineq.num_independent()
        );
        Ok(())
    }

    /// True once the barrier weight has reached the target.
    pub fn is_converged(&self) -> bool {
        self.state.is_some_and(|state| state.t <= self.target)
    }

    /// One outer iteration: inner Newton loop, barrier reduction and predictor step.
    ///
    /// Starts the run first if needed and checks the scalar controls on every call.
    /// Returns [`SolverError::NonConvergence`] once the inner loop has hit its cap more
    /// than `max_inner_breaks` times; the iterate is kept and stays usable.
    pub fn outer_step(&mut self) -> Result<OuterStep> {
        let mut state = self.run_state()?;
        self.validate()?;
        let began = Instant::now();
        let result = self.outer_iteration(&mut state);
        state.elapsed += began.elapsed();
        self.state = Some(state);

        let step = result?;
        debug!(
            "Outer {:>4}: t = {:.3e}, inner = {:>4}, E = {:.10}",
            step.index, step.t, step.inner_iterations, step.energy
        );

        if state.breaks > self.max_inner_breaks {
            return Err(SolverError::NonConvergence {
                breaks: state.breaks,
                limit: self.max_inner_breaks,
            });
        }
        Ok(step)
    }

    fn outer_iteration(&mut self, state: &mut RunState) -> Result<OuterStep> {
        let t = state.t;
        self.write_progress(state.outer, t)?;

        let mut inner = 0;
        let mut hit_cap = false;
        let mut convergence = f64::INFINITY;
        while convergence > self.tolerance {
            state.total_inner += 1;
            inner += 1;

            let (step, a) = self.newton_step(t)?;
            self.rdm.axpy(a, &step);
            convergence = a * a * step.dot(&step);

            if state.total_inner > self.max_inner_iterations {
                state.breaks += 1;
                hit_cap = true;
                warn!(
                    "Inner loop stopped at the iteration cap {} (t = {:.3e})",
                    self.max_inner_iterations, t
                );
                break;
            }
        }

        state.t *= self.reduction_factor;
        self.tolerance = (TOLERANCE_PER_BARRIER * state.t).max(self.target);

        let mut extrapolation = self.rdm.clone();
        extrapolation -= &self.previous_rdm;
        self.previous_rdm = self.rdm.clone();
        let a = line_search::line_search(
            state.t,
            &self.rdm,
            &self.cones,
            &self.ham,
            &extrapolation,
        )?;
        self.rdm.axpy(a, &extrapolation);

        state.outer += 1;
        Ok(OuterStep {
            index: state.outer - 1,
            t,
            energy: self.full_energy(),
            inner_iterations: inner,
            hit_cap,
        })
    }

    /// Continues the outer loop until `t <= target` or `cancel` fires.
    pub fn resume(&mut self, cancel: &CancellationToken) -> Result<RunReport> {
        self.run_state()?;
        self.validate()?;

        let mut cancelled = false;
        while !self.is_converged() {
            if cancel.is_cancelled() {
                warn!("Cancellation requested; stopping with the current iterate");
                cancelled = true;
                break;
            }
            self.outer_step()?;
        }

        let report = self.report(cancelled);
        self.write_summary(&report)?;

        info!("Energy: {:.10}", report.full_energy);
        info!("Trace: {:.10}", report.trace);
        info!("S^2: {:.10}", report.spin_squared);
        info!("Runtime: {:.3} s", report.elapsed.as_secs_f64());
        info!("Total nr of iterations = {}", report.iterations);
        Ok(report)
    }

    /// Statistics of the run so far.
    pub fn report(&self, cancelled: bool) -> RunReport {
        let state = self.state.unwrap_or_else(RunState::initial);
        RunReport {
            iterations: state.total_inner,
            outer_iterations: state.outer,
            energy: self.energy(),
            full_energy: self.full_energy(),
            trace: self.rdm.trace(),
            spin_squared: self.rdm.spin_squared(),
            elapsed: state.elapsed,
            inner_breaks: state.breaks,
            cancelled,
        }
    }

    fn run_state(&mut self) -> Result<RunState> {
        match self.state {
            Some(state) => Ok(state),
            None => {
                self.start()?;
                Ok(RunState::initial())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.target.is_nan() || self.target <= 0.0 {
            return Err(SolverError::Configuration(format!(
                "target must be positive, got {}",
                self.target
            )));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(SolverError::Configuration(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.target < 1.0 && !(self.reduction_factor > 0.0 && self.reduction_factor < 1.0) {
            return Err(SolverError::Configuration(format!(
                "reduction factor must lie in (0, 1), got {}",
                self.reduction_factor
            )));
        }
        Ok(())
    }

    /// Newton direction and damped step length at barrier weight `t`.
    fn newton_step(&self, t: f64) -> Result<(Tpm, f64)> {
        let mut inverse = Sup::from_primal(&self.rdm, &self.cones);
        inverse.invert()?;

        let gradient = newton::constrained_gradient(t, &inverse, &self.ham, &self.lineq);
        let (step, cg) = newton::solve(t, &inverse, &gradient, &self.lineq, &self.cg);
        debug!(
            "CG: {} iterations, converged = {}, relative residual {:.3e}",
            cg.iterations, cg.converged, cg.relative_residual
        );

        let a = line_search::line_search(t, &self.rdm, &self.cones, &self.ham, &step)?;
        Ok((step, a))
    }

    fn write_progress(&self, index: usize, t: f64) -> Result<()> {
        let Some(path) = &self.progress_file else {
            return Ok(());
        };
        let line = format!(
            "{}\t{:e}\t{:.10}\t{:.10}\t{:.10}\t{:.10}",
            index,
            t,
            self.rdm.pair_trace(),
            self.rdm.products_trace(),
            self.full_energy(),
            self.rdm.spin_squared()
        );
        progress::append_line(path, &line)
    }

    fn write_summary(&self, report: &RunReport) -> Result<()> {
        let Some(path) = &self.progress_file else {
            return Ok(());
        };
        let summary = format!(
            "\nEnergy: {:.10}\nTrace: {:.10}\nS^2: {:.10}\nRuntime: {:.6} s\n\ntotal nr of iterations = {}",
            report.full_energy,
            report.trace,
            report.spin_squared,
            report.elapsed.as_secs_f64(),
            report.iterations
        );
        progress::append_line(path, &summary)
    }
}

impl Method for PotentialReduction {
    /// Full run from the uniform ensemble.
    fn run(&mut self, cancel: &CancellationToken) -> Result<RunReport> {
        self.start()?;
        self.resume(cancel)
    }

    fn energy(&self) -> f64 {
        self.norm_ham * self.ham.dot(&self.rdm)
    }

    fn full_energy(&self) -> f64 {
        self.energy() + self.nuclear_repulsion
    }

    fn rdm(&self) -> &Tpm {
        &self.rdm
    }

    fn lineq(&self) -> &Lineq {
        &self.lineq
    }
}
