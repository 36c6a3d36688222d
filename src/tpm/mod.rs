//! Two-particle reduced density matrix of a seniority-zero (DOCI) wave function.
//!
//! For `L` spatial orbitals and `N` electrons the DOCI 2-RDM collapses to two blocks:
//!
//! - the **pair block** `Π` (dense `L x L`, degeneracy 1),
//!   `Π_ab = <a†_aα a†_aβ a_bβ a_bα>`; its diagonal is the orbital occupation,
//! - the **product block** `x` (diagonal, one entry per orbital pair `a < b`, degeneracy 4),
//!   `x_ab = <n_aσ n_bτ>`, identical for the four spin combinations.
//!
//! All inner products and traces are weighted by the degeneracies, so they equal the
//! corresponding quantities of the full spin-orbital matrix.

mod block;

pub use block::{Block, BlockMatrix, NotPositiveDefinite};

use crate::error::{Result, SolverError};
use crate::hamiltonian::IntegralSource;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

pub(crate) const PAIR: usize = 0;
pub(crate) const PRODUCTS: usize = 1;

/// Degeneracy of the product block in the spin-orbital matrix.
pub const PRODUCT_DEGENERACY: f64 = 4.0;

/// Checks that `(L, N)` describes a DOCI problem with a non-empty interior.
pub fn validate_dimensions(l: usize, n: usize) -> Result<()> {
    if n % 2 != 0 {
        return Err(SolverError::Configuration(format!(
            "DOCI needs an even number of electrons, got N={}",
            n
        )));
    }
    if n < 2 || n >= 2 * l {
        return Err(SolverError::Configuration(format!(
            "need 2 <= N < 2L, got L={} N={}",
            l, n
        )));
    }
    Ok(())
}

/// Index of the orbital pair `(a, b)`, `a != b`, in the product block.
pub fn pair_index(l: usize, a: usize, b: usize) -> usize {
    debug_assert!(a != b && a < l && b < l);
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    a * l - a * (a + 1) / 2 + (b - a - 1)
}

/// All orbital pairs `a < b` in product-block order.
pub fn orbital_pairs(l: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..l).flat_map(move |a| ((a + 1)..l).map(move |b| (a, b)))
}

/// The DOCI two-particle matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Tpm {
    l: usize,
    n: usize,
    blocks: BlockMatrix,
}

impl Tpm {
    /// Zero matrix for `L` orbitals and `N` electrons.
    pub fn new(l: usize, n: usize) -> Self {
        let blocks = BlockMatrix::new(vec![
            Block::dense(l, 1.0),
            Block::diagonal(l * l.saturating_sub(1) / 2, PRODUCT_DEGENERACY),
        ]);
        Tpm { l, n, blocks }
    }

    /// Builds a matrix from explicit block contents.
    ///
    /// Panics when the shapes do not fit `(l, n)`; use the file loader for untrusted input.
    pub fn from_blocks(l: usize, n: usize, pair: DMatrix<f64>, products: DVector<f64>) -> Self {
        assert_eq!(pair.shape(), (l, l), "pair block must be L x L");
        assert_eq!(products.len(), l * l.saturating_sub(1) / 2, "product block size");
        let mut tpm = Tpm::new(l, n);
        *tpm.pair_mut() = pair;
        *tpm.products_mut() = products;
        tpm
    }

    /// Number of spatial orbitals `L`.
    pub fn num_orbitals(&self) -> usize {
        self.l
    }

    /// Number of electrons `N`.
    pub fn num_electrons(&self) -> usize {
        self.n
    }

    pub fn blocks(&self) -> &BlockMatrix {
        &self.blocks
    }

    pub fn pair(&self) -> &DMatrix<f64> {
        match &self.blocks.blocks()[PAIR] {
            Block::Dense { values, .. } => values,
            Block::Diagonal { .. } => unreachable!("pair block is dense"),
        }
    }

    pub fn pair_mut(&mut self) -> &mut DMatrix<f64> {
        match &mut self.blocks.blocks_mut()[PAIR] {
            Block::Dense { values, .. } => values,
            Block::Diagonal { .. } => unreachable!("pair block is dense"),
        }
    }

    pub fn products(&self) -> &DVector<f64> {
        match &self.blocks.blocks()[PRODUCTS] {
            Block::Diagonal { values, .. } => values,
            Block::Dense { .. } => unreachable!("product block is diagonal"),
        }
    }

    pub fn products_mut(&mut self) -> &mut DVector<f64> {
        match &mut self.blocks.blocks_mut()[PRODUCTS] {
            Block::Diagonal { values, .. } => values,
            Block::Dense { .. } => unreachable!("product block is diagonal"),
        }
    }

    /// `x_ab` for `a != b`.
    pub fn product(&self, a: usize, b: usize) -> f64 {
        self.products()[pair_index(self.l, a, b)]
    }

    /// Degeneracy-weighted inner product.
    pub fn dot(&self, other: &Tpm) -> f64 {
        self.blocks.dot(&other.blocks)
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &Tpm) {
        self.blocks.axpy(alpha, &other.blocks);
    }

    pub fn scale(&mut self, alpha: f64) {
        self.blocks.scale(alpha);
    }

    /// Full weighted trace; `N(N-1)/2` for a normalised 2-RDM.
    pub fn trace(&self) -> f64 {
        self.blocks.trace()
    }

    /// Trace of the pair block alone.
    pub fn pair_trace(&self) -> f64 {
        self.blocks.blocks()[PAIR].trace()
    }

    /// Weighted trace of the product block alone.
    pub fn products_trace(&self) -> f64 {
        self.blocks.blocks()[PRODUCTS].trace()
    }

    /// Expectation value of the total spin `S²`.
    ///
    /// Uses the occupations obtained by contraction, `sum_a γ_a = Tr(Γ) / (N-1)`, against
    /// the on-site pair occupations `Π_aa`; the two coincide on the constraint manifold,
    /// where `S²` vanishes.
    pub fn spin_squared(&self) -> f64 {
        let contracted = self.trace() / (self.n as f64 - 1.0);
        1.5 * (contracted - self.pair().trace())
    }

    /// Spin-orbital occupations from contracting the 2-RDM.
    pub fn one_rdm(&self) -> DVector<f64> {
        let l = self.l;
        let scale = 1.0 / (self.n as f64 - 1.0);
        DVector::from_fn(l, |a, _| {
            let mut occupation = self.pair()[(a, a)];
            for b in (0..l).filter(|&b| b != a) {
                occupation += 2.0 * self.product(a, b);
            }
            occupation * scale
        })
    }

    /// Fills `self` with the reduced DOCI Hamiltonian of the given integrals.
    ///
    /// The one-body part is spread over both blocks through the contraction
    /// `γ_a = (Π_aa + 2 sum_b x_ab)/(N-1)`, so that `<H, Γ>` equals the electronic
    /// energy for every `Γ` on the constraint manifold. The result is not normalised.
    pub fn ham<S: IntegralSource + ?Sized>(&mut self, source: &S) {
        let l = self.l;
        let spread = 1.0 / (self.n as f64 - 1.0);

        let pair = DMatrix::from_fn(l, l, |a, b| {
            if a == b {
                2.0 * source.one_body(a, a) * spread + source.two_body(a, a, a, a)
            } else {
                0.5 * (source.two_body(a, a, b, b) + source.two_body(b, b, a, a))
            }
        });

        let products = DVector::from_iterator(
            l * l.saturating_sub(1) / 2,
            orbital_pairs(l).map(|(a, b)| {
                (source.one_body(a, a) + source.one_body(b, b)) * spread
                    + source.two_body(a, b, a, b)
                    - 0.5 * source.two_body(a, b, b, a)
            }),
        );

        *self.pair_mut() = pair;
        *self.products_mut() = products;
    }

    /// Largest absolute element-wise difference, used to compare iterates.
    pub fn max_abs_diff(&self, other: &Tpm) -> f64 {
        let pair = (self.pair() - other.pair()).amax();
        let products = (self.products() - other.products()).amax();
        pair.max(products)
    }
}

impl AddAssign<&Tpm> for Tpm {
    fn add_assign(&mut self, rhs: &Tpm) {
        self.axpy(1.0, rhs);
    }
}

impl SubAssign<&Tpm> for Tpm {
    fn sub_assign(&mut self, rhs: &Tpm) {
        self.axpy(-1.0, rhs);
    }
}

impl MulAssign<f64> for Tpm {
    fn mul_assign(&mut self, rhs: f64) {
        self.scale(rhs);
    }
}

impl DivAssign<f64> for Tpm {
    fn div_assign(&mut self, rhs: f64) {
        self.scale(1.0 / rhs);
    }
}

impl fmt::Display for Tpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "L={} N={}", self.l, self.n)?;
        writeln!(f, "pair block:")?;
        for a in 0..self.l {
            for b in a..self.l {
                writeln!(f, "{:>4} {:>4}  {:>18.12}", a, b, self.pair()[(a, b)])?;
            }
        }
        writeln!(f, "product block:")?;
        for (idx, (a, b)) in orbital_pairs(self.l).enumerate() {
            writeln!(f, "{:>4} {:>4}  {:>18.12}", a, b, self.products()[idx])?;
        }
        Ok(())
    }
}
