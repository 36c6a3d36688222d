//! File formats and log output.
//!
//! - [`fcidump`]: plain-text FCIDUMP integrals,
//! - [`rdm_file`]: JSON container for a converged 2-RDM,
//! - [`progress`]: append-only progress sink of the solver,
//! - [`output`]: tracing subscriber writing to stdout or a log file.

pub mod fcidump;
pub mod output;
pub mod progress;
pub mod rdm_file;

pub use fcidump::read_fcidump;
pub use output::setup_output;
pub use rdm_file::{load_rdm, save_rdm};
