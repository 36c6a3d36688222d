//! JSON persistence of a 2-RDM.
//!
//! ```json
//! { "L": 3, "N": 2, "pair": [[..], [..], [..]], "products": [..] }
//! ```
//!
//! `pair` holds the full `L x L` pair block row by row, `products` the `L(L-1)/2`
//! product entries in the order `(0,1), (0,2), .., (L-2,L-1)`.

use crate::error::{Result, SolverError};
use crate::tpm::Tpm;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdmFile {
    #[serde(rename = "L")]
    pub l: usize,
    #[serde(rename = "N")]
    pub n: usize,
    pub pair: Vec<Vec<f64>>,
    pub products: Vec<f64>,
}

impl RdmFile {
    pub fn from_tpm(rdm: &Tpm) -> Self {
        let l = rdm.num_orbitals();
        RdmFile {
            l,
            n: rdm.num_electrons(),
            pair: (0..l)
                .map(|a| (0..l).map(|b| rdm.pair()[(a, b)]).collect())
                .collect(),
            products: rdm.products().iter().copied().collect(),
        }
    }

    /// Checks the block shapes and builds the matrix; the message names the offending block.
    pub fn into_tpm(self) -> std::result::Result<Tpm, String> {
        let l = self.l;
        if self.pair.len() != l || self.pair.iter().any(|row| row.len() != l) {
            return Err(format!("pair block is not {} x {}", l, l));
        }
        let expected = l * l.saturating_sub(1) / 2;
        if self.products.len() != expected {
            return Err(format!(
                "product block has {} entries, expected {}",
                self.products.len(),
                expected
            ));
        }
        let pair = DMatrix::from_fn(l, l, |a, b| self.pair[a][b]);
        let products = DVector::from_vec(self.products);
        Ok(Tpm::from_blocks(l, self.n, pair, products))
    }
}

pub fn save_rdm(rdm: &Tpm, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SolverError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &RdmFile::from_tpm(rdm))
        .map_err(|e| SolverError::format(path, e.to_string()))?;
    writer.flush().map_err(|e| SolverError::io(path, e))?;
    info!("2-RDM written to {}", path.display());
    Ok(())
}

pub fn load_rdm(path: impl AsRef<Path>) -> Result<Tpm> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SolverError::io(path, e))?;
    let container: RdmFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| SolverError::format(path, e.to_string()))?;
    container
        .into_tpm()
        .map_err(|message| SolverError::format(path, message))
}
