//! Reader for the FCIDUMP integral format.
//!
//! ```text
//!  &FCI NORB=4,NELEC=4,MS2=0,
//!   ORBSYM=1,1,1,1,
//!   ISYM=1,
//!  &END
//!   0.6744  1  1  1  1
//!  -1.2528  1  1  0  0
//!   0.7137  0  0  0  0
//! ```
//!
//! Every line after the namelist is `value i j k l` with 1-based orbital indices:
//! `(ij|kl)` in chemist notation when all four are set, `T(i, j)` when `k = l = 0`, the
//! core energy when all are zero. Lines with only `i` set (orbital energies) are skipped.
//! Two-body integrals are expanded over the eightfold permutational symmetry.

use crate::error::{Result, SolverError};
use crate::hamiltonian::Integrals;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn read_fcidump(path: impl AsRef<Path>) -> Result<Integrals> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| SolverError::io(path, e))?;
    let integrals =
        parse_fcidump(&content).map_err(|message| SolverError::format(path, message))?;
    info!("Read FCIDUMP integrals from {}", path.display());
    Ok(integrals)
}

/// Parses FCIDUMP text; errors are plain messages, attached to a path by the caller.
pub fn parse_fcidump(content: &str) -> std::result::Result<Integrals, String> {
    let mut lines = content.lines();
    let mut header = String::new();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("&END") || trimmed == "/" {
            break;
        }
        header.push_str(trimmed);
        header.push(',');
    }

    let norb = header_value(&header, "NORB").ok_or("missing NORB in header")?;
    let nelec = header_value(&header, "NELEC").ok_or("missing NELEC in header")?;
    let mut integrals = Integrals::new(norb, nelec, 0.0);

    for (number, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 5 {
            return Err(format!("integral line {}: expected 5 fields", number + 1));
        }
        let value = parse_real(fields[0])
            .ok_or_else(|| format!("integral line {}: bad value {}", number + 1, fields[0]))?;
        let mut idx = [0usize; 4];
        for (slot, field) in idx.iter_mut().zip(&fields[1..]) {
            *slot = field
                .parse()
                .map_err(|_| format!("integral line {}: bad index {}", number + 1, field))?;
            if *slot > norb {
                return Err(format!(
                    "integral line {}: index {} exceeds NORB={}",
                    number + 1,
                    slot,
                    norb
                ));
            }
        }

        match idx {
            [0, 0, 0, 0] => integrals.set_nuclear_repulsion(value),
            [i, j, 0, 0] if i > 0 && j > 0 => integrals.set_one_body(i - 1, j - 1, value),
            [_, 0, 0, 0] => {}
            [i, j, k, l] if i > 0 && j > 0 && k > 0 && l > 0 => {
                // (ij|kl) = <ik|jl>
                integrals.set_two_body_symmetric(i - 1, k - 1, j - 1, l - 1, value)
            }
            _ => {
                return Err(format!(
                    "integral line {}: unsupported index pattern {:?}",
                    number + 1,
                    idx
                ))
            }
        }
    }

    Ok(integrals)
}

/// Integer value of `key=` in the namelist header.
fn header_value(header: &str, key: &str) -> Option<usize> {
    let compact = header.split('=').map(str::trim).collect::<Vec<_>>().join("=");
    compact
        .split(',')
        .flat_map(|chunk| chunk.split_whitespace())
        .find_map(|token| {
            let (name, value) = token.split_once('=')?;
            if name.eq_ignore_ascii_case(key) {
                value.trim().parse().ok()
            } else {
                None
            }
        })
}

/// Accepts Fortran `D` exponents.
fn parse_real(field: &str) -> Option<f64> {
    field.replace(['D', 'd'], "E").parse().ok()
}
