//! Exact seniority-zero ground state by full diagonalisation.
//!
//! The DOCI space of `N/2` electron pairs in `L` orbitals is spanned by the
//! `C(L, N/2)` pair configurations. Its Hamiltonian matrix is
//!
//! - diagonal: `sum_{a in S} (2 T_aa + <aa|aa>) + sum_{a != b in S} (2 <ab|ab> - <ab|ba>)`,
//! - off-diagonal between configurations differing by moving one pair from `a` to `b`:
//!   `(<aa|bb> + <bb|aa>) / 2`.
//!
//! Only feasible for small systems; it serves as the reference the 2-RDM bound is
//! checked against.


use crate::error::{Result, SolverError};
use crate::hamiltonian::IntegralSource;
use crate::tpm::validate_dimensions;
use itertools::Itertools;
use nalgebra::{DMatrix, SymmetricEigen};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

/// Largest configuration space that is diagonalised densely.
pub const MAX_CONFIGURATIONS: usize = 5000;

/// Number of pair configurations `C(L, N/2)`.
pub fn num_configurations(l: usize, n: usize) -> usize {
    (0..n / 2).fold(1usize, |acc, i| acc.saturating_mul(l - i) / (i + 1))
}

/// Electronic DOCI ground-state energy, without the constant shift.
pub fn ground_state_energy<S: IntegralSource + Sync + ?Sized>(source: &S) -> Result<f64> {
    let l = source.num_orbitals();
    let n = source.num_electrons();
    validate_dimensions(l, n)?;

    let dim = num_configurations(l, n);
    if dim > MAX_CONFIGURATIONS {
        return Err(SolverError::Configuration(format!(
            "{} pair configurations exceed the exact-diagonalisation limit of {}",
            dim, MAX_CONFIGURATIONS
        )));
    }

    info!("===========================================");
    info!("      Exact DOCI reference");
    info!("===========================================");
    info!("Pair configurations: {}", dim);

    let configurations: Vec<Vec<usize>> = (0..l).combinations(n / 2).collect();

    let lookup: HashMap<&[usize], usize> = configurations
        .iter()
        .enumerate()
        .map(|(idx, config)| (config.as_slice(), idx))
        .collect();

    let rows: Vec<Vec<(usize, f64)>> = configurations
        .par_iter()
        .map(|config| row_elements(source, config, &lookup))
        .collect();

    let mut hamiltonian = DMatrix::zeros(dim, dim);
    for (i, row) in rows.into_iter().enumerate() {
        for (j, value) in row {
            hamiltonian[(i, j)] = value;
        }
    }

    let eigen = SymmetricEigen::new(hamiltonian);
    let energy = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    info!("Exact DOCI electronic energy: {:.10}", energy);
    Ok(energy)
}

fn row_elements<S: IntegralSource + ?Sized>(
    source: &S,
    config: &[usize],
    lookup: &HashMap<&[usize], usize>,
) -> Vec<(usize, f64)> {
    let l = source.num_orbitals();
    let mut elements = Vec::new();

    let mut diagonal = 0.0;
    for &a in config {
        diagonal += 2.0 * source.one_body(a, a) + source.two_body(a, a, a, a);
        for &b in config.iter().filter(|&&b| b != a) {
            diagonal += 2.0 * source.two_body(a, b, a, b) - source.two_body(a, b, b, a);
        }
    }
    if let Some(&i) = lookup.get(config) {
        elements.push((i, diagonal));
    }

    for &a in config {
        for b in (0..l).filter(|b| !config.contains(b)) {
            let mut moved: Vec<usize> =
                config.iter().map(|&c| if c == a { b } else { c }).collect();
            moved.sort_unstable();
            if let Some(&j) = lookup.get(moved.as_slice()) {
                let value = 0.5 * (source.two_body(a, a, b, b) + source.two_body(b, b, a, a));
                elements.push((j, value));
            }
        }
    }
    elements
}
