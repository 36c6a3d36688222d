//! Error types for the DOCI 2-RDM solver.
//!
//! Every fallible operation of the library returns [`SolverError`]. The variants
//! follow how a run can fail: the iterate leaving the interior of the cones
//! ([`SolverError::Domain`]), the inner Newton loop repeatedly hitting its cap
//! ([`SolverError::NonConvergence`]), inconsistent dimensions or settings
//! ([`SolverError::Configuration`], [`SolverError::DimensionMismatch`]) and
//! failures of the file formats ([`SolverError::Io`], [`SolverError::Format`]).
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug)]
pub enum SolverError {
    /// A cone block could not be factorised: the primal iterate is not interior.
    #[error("{cone} cone: {block} block is singular or not positive definite")]
    Domain {
        cone: &'static str,
        block: &'static str,
    },

    /// The inner Newton loop hit its iteration cap too many times.
    #[error("inner Newton loop hit the iteration cap {breaks} times (allowed {limit})")]
    NonConvergence { breaks: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A matrix with other `(L, N)` than the solver was offered.
    #[error("dimension mismatch: expected L={expected_l}, N={expected_n} but found L={found_l}, N={found_n}")]
    DimensionMismatch {
        expected_l: usize,
        expected_n: usize,
        found_l: usize,
        found_n: usize,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed file {path}: {message}")]
    Format { path: PathBuf, message: String },
}

impl SolverError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SolverError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SolverError::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for the error that signals the iterate left the feasible interior.
    pub fn is_domain(&self) -> bool {
        matches!(self, SolverError::Domain { .. })
    }
}
