//! Symmetric block storage shared by the two-particle matrix and the cone matrices.
//!
//! A [`BlockMatrix`] is an ordered list of [`Block`]s. Each block carries the
//! number of times it appears in the full spin-orbital matrix (its degeneracy),
//! which weights inner products and traces.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Smallest accepted Cholesky pivot (squared), relative to the largest diagonal entry.
const PIVOT_TOLERANCE: f64 = 1e-15;

/// Marker error: a block is singular or indefinite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotPositiveDefinite;

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Dense symmetric block.
    Dense {
        degeneracy: f64,
        values: DMatrix<f64>,
    },
    /// Block that is diagonal by symmetry; only the diagonal is stored.
    Diagonal {
        degeneracy: f64,
        values: DVector<f64>,
    },
}

impl Block {
    pub fn dense(dim: usize, degeneracy: f64) -> Self {
        Block::Dense {
            degeneracy,
            values: DMatrix::zeros(dim, dim),
        }
    }

    pub fn diagonal(dim: usize, degeneracy: f64) -> Self {
        Block::Diagonal {
            degeneracy,
            values: DVector::zeros(dim),
        }
    }

    pub fn degeneracy(&self) -> f64 {
        match self {
            Block::Dense { degeneracy, .. } | Block::Diagonal { degeneracy, .. } => *degeneracy,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Block::Dense { values, .. } => values.nrows(),
            Block::Diagonal { values, .. } => values.len(),
        }
    }

    pub fn zeros_like(&self) -> Self {
        match self {
            Block::Dense { degeneracy, values } => Block::dense(values.nrows(), *degeneracy),
            Block::Diagonal { degeneracy, values } => Block::diagonal(values.len(), *degeneracy),
        }
    }

    /// Degeneracy-weighted Frobenius inner product.
    pub fn dot(&self, other: &Block) -> f64 {
        match (self, other) {
            (Block::Dense { degeneracy, values }, Block::Dense { values: rhs, .. }) => {
                degeneracy * values.dot(rhs)
            }
            (Block::Diagonal { degeneracy, values }, Block::Diagonal { values: rhs, .. }) => {
                degeneracy * values.dot(rhs)
            }
            _ => panic!("inner product between blocks of different kind"),
        }
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &Block) {
        match (self, other) {
            (Block::Dense { values, .. }, Block::Dense { values: rhs, .. }) => {
                values.zip_apply(rhs, |a, b| *a += alpha * b)
            }
            (Block::Diagonal { values, .. }, Block::Diagonal { values: rhs, .. }) => {
                values.zip_apply(rhs, |a, b| *a += alpha * b)
            }
            _ => panic!("axpy between blocks of different kind"),
        }
    }

    pub fn scale(&mut self, alpha: f64) {
        match self {
            Block::Dense { values, .. } => *values *= alpha,
            Block::Diagonal { values, .. } => *values *= alpha,
        }
    }

    /// Degeneracy-weighted trace.
    pub fn trace(&self) -> f64 {
        match self {
            Block::Dense { degeneracy, values } => degeneracy * values.trace(),
            Block::Diagonal { degeneracy, values } => degeneracy * values.sum(),
        }
    }

    /// Inverts the block in place.
    ///
    /// Dense blocks go through a Cholesky factorisation, so anything that is not
    /// strictly positive definite is rejected instead of producing a huge inverse.
    pub fn invert(&mut self) -> Result<(), NotPositiveDefinite> {
        match self {
            Block::Dense { values, .. } => {
                let chol = checked_cholesky(values).ok_or(NotPositiveDefinite)?;
                *values = chol.inverse();
                symmetrize(values);
            }
            Block::Diagonal { values, .. } => {
                check_positive(values)?;
                values.apply(|v| *v = 1.0 / *v);
            }
        }
        Ok(())
    }

    /// `self * inner * self`, the block-wise kernel of the barrier Hessian.
    pub fn sandwich(&self, inner: &Block) -> Block {
        match (self, inner) {
            (Block::Dense { degeneracy, values }, Block::Dense { values: mid, .. }) => {
                let mut product = values * mid * values;
                symmetrize(&mut product);
                Block::Dense {
                    degeneracy: *degeneracy,
                    values: product,
                }
            }
            (Block::Diagonal { degeneracy, values }, Block::Diagonal { values: mid, .. }) => {
                Block::Diagonal {
                    degeneracy: *degeneracy,
                    values: values.component_mul(values).component_mul(mid),
                }
            }
            _ => panic!("sandwich between blocks of different kind"),
        }
    }

    /// Eigenvalues of `M^{-1/2} D M^{-1/2}` for `M = self` and `D = direction`.
    ///
    /// `det(M + a D) = det(M) * prod(1 + a * lambda)`, which is what the line search needs.
    pub fn whitened_spectrum(&self, direction: &Block) -> Result<DVector<f64>, NotPositiveDefinite> {
        match (self, direction) {
            (Block::Dense { values, .. }, Block::Dense { values: step, .. }) => {
                let chol = checked_cholesky(values).ok_or(NotPositiveDefinite)?;
                let l = chol.l();
                let half = l
                    .solve_lower_triangular(step)
                    .ok_or(NotPositiveDefinite)?;
                let mut whitened = l
                    .solve_lower_triangular(&half.transpose())
                    .ok_or(NotPositiveDefinite)?;
                symmetrize(&mut whitened);
                Ok(whitened.symmetric_eigenvalues())
            }
            (Block::Diagonal { values, .. }, Block::Diagonal { values: step, .. }) => {
                check_positive(values)?;
                Ok(step.component_div(values))
            }
            _ => panic!("spectrum between blocks of different kind"),
        }
    }
}

fn symmetrize(matrix: &mut DMatrix<f64>) {
    let transposed = matrix.transpose();
    *matrix += transposed;
    *matrix *= 0.5;
}

fn checked_cholesky(matrix: &DMatrix<f64>) -> Option<Cholesky<f64, Dyn>> {
    let scale = matrix.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let chol = Cholesky::new(matrix.clone())?;
    let floor = PIVOT_TOLERANCE * scale;
    let pivots_ok = chol.l_dirty().diagonal().iter().all(|&d| d * d > floor);
    pivots_ok.then_some(chol)
}

fn check_positive(values: &DVector<f64>) -> Result<(), NotPositiveDefinite> {
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let floor = PIVOT_TOLERANCE * scale;
    if values.iter().all(|&v| v > floor) {
        Ok(())
    } else {
        Err(NotPositiveDefinite)
    }
}

/// Ordered collection of blocks with element-wise arithmetic.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMatrix {
    blocks: Vec<Block>,
}

impl BlockMatrix {
    pub fn new(blocks: Vec<Block>) -> Self {
        BlockMatrix { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn zeros_like(&self) -> Self {
        BlockMatrix::new(self.blocks.iter().map(Block::zeros_like).collect())
    }

    pub fn dot(&self, other: &BlockMatrix) -> f64 {
        assert_eq!(self.blocks.len(), other.blocks.len(), "block layouts differ");
        self.blocks
            .iter()
            .zip(other.blocks.iter())
            .map(|(a, b)| a.dot(b))
            .sum()
    }

    pub fn axpy(&mut self, alpha: f64, other: &BlockMatrix) {
        assert_eq!(self.blocks.len(), other.blocks.len(), "block layouts differ");
        for (a, b) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            a.axpy(alpha, b);
        }
    }

    pub fn scale(&mut self, alpha: f64) {
        for block in &mut self.blocks {
            block.scale(alpha);
        }
    }

    pub fn trace(&self) -> f64 {
        self.blocks.iter().map(Block::trace).sum()
    }
}
