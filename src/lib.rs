//! Variational optimisation of the seniority-zero (DOCI) two-particle reduced density
//! matrix under the two-index N-representability conditions, solved with a
//! potential-reduction interior-point method.

pub mod cancel;
pub mod error;
pub mod exact;
pub mod hamiltonian;
pub mod io;
pub mod lineq;
pub mod potential_reduction;
pub mod sup;
pub mod tpm;

pub use cancel::CancellationToken;
pub use error::{Result, SolverError};
pub use hamiltonian::{IntegralSource, Integrals};
pub use lineq::Lineq;
pub use potential_reduction::{Method, OuterStep, PotentialReduction, RunReport};
pub use sup::{ConeKind, Sup};
pub use tpm::Tpm;
