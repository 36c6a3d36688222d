//! Barrier supermatrix: the images of the primal 2-RDM in every N-representability cone.
//!
//! Two cones are available:
//!
//! - [`ConeKind::Particle`]: the 2-RDM itself must be positive semidefinite,
//! - [`ConeKind::Hole`]: the two-hole matrix
//!   `Q^Π = I - diag(Π) + offdiag(Π)`, `Q^x_ab = 1 - Π_aa - Π_bb + x_ab`
//!   must be positive semidefinite.
//!
//! A product block that the linear constraints pin to zero is left out of its cone.
//! [`Sup`] is rebuilt from the current iterate in every Newton iteration; its
//! inversion is the dominant cost and runs block-parallel.


use crate::error::{Result, SolverError};
use crate::lineq::{hole_products_pinned, products_pinned};
use crate::tpm::{orbital_pairs, Block, BlockMatrix, Tpm, PAIR, PRODUCTS, PRODUCT_DEGENERACY};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// The N-representability conditions imposed through the barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConeKind {
    /// `Γ >= 0`
    Particle,
    /// `Q(Γ) >= 0`
    Hole,
}

impl ConeKind {
    pub fn name(self) -> &'static str {
        match self {
            ConeKind::Particle => "particle",
            ConeKind::Hole => "hole",
        }
    }

    /// Whether the product block of this cone is free, i.e. not pinned by the constraints.
    pub fn products_active(self, l: usize, n: usize) -> bool {
        match self {
            ConeKind::Particle => !products_pinned(l, n),
            ConeKind::Hole => !hole_products_pinned(l, n),
        }
    }

    /// Linear part of the cone map.
    fn linear_image(self, tpm: &Tpm, with_products: bool) -> BlockMatrix {
        let l = tpm.num_orbitals();
        let pair = match self {
            ConeKind::Particle => tpm.pair().clone(),
            ConeKind::Hole => {
                let mut pair = tpm.pair().clone();
                for a in 0..l {
                    pair[(a, a)] = -pair[(a, a)];
                }
                pair
            }
        };

        let mut blocks = vec![Block::Dense {
            degeneracy: 1.0,
            values: pair,
        }];

        if with_products {
            let products = match self {
                ConeKind::Particle => tpm.products().clone(),
                ConeKind::Hole => DVector::from_iterator(
                    tpm.products().len(),
                    orbital_pairs(l).enumerate().map(|(idx, (a, b))| {
                        tpm.products()[idx] - tpm.pair()[(a, a)] - tpm.pair()[(b, b)]
                    }),
                ),
            };
            blocks.push(Block::Diagonal {
                degeneracy: PRODUCT_DEGENERACY,
                values: products,
            });
        }

        BlockMatrix::new(blocks)
    }

    /// Full affine cone map.
    fn image(self, tpm: &Tpm, with_products: bool) -> BlockMatrix {
        let mut blocks = self.linear_image(tpm, with_products);
        if self == ConeKind::Hole {
            for block in blocks.blocks_mut() {
                match block {
                    Block::Dense { values, .. } => {
                        for a in 0..values.nrows() {
                            values[(a, a)] += 1.0;
                        }
                    }
                    Block::Diagonal { values, .. } => values.add_scalar_mut(1.0),
                }
            }
        }
        blocks
    }

    /// Adjoint of [`ConeKind::linear_image`] with respect to the weighted inner product.
    fn adjoint(self, blocks: &BlockMatrix, l: usize, n: usize) -> Tpm {
        let mut out = Tpm::new(l, n);
        let cone_blocks = blocks.blocks();

        if let Block::Dense { values, .. } = &cone_blocks[PAIR] {
            *out.pair_mut() = values.clone();
        }
        if let Some(Block::Diagonal { values, .. }) = cone_blocks.get(PRODUCTS) {
            *out.products_mut() = values.clone();
        }

        if self == ConeKind::Hole {
            let products = cone_blocks.get(PRODUCTS).map(|_| out.products().clone());
            let pair = out.pair_mut();
            for a in 0..l {
                pair[(a, a)] = -pair[(a, a)];
            }
            if let Some(products) = products {
                for (idx, (a, b)) in orbital_pairs(l).enumerate() {
                    let weight = PRODUCT_DEGENERACY * products[idx];
                    pair[(a, a)] -= weight;
                    pair[(b, b)] -= weight;
                }
            }
        }
        out
    }
}

fn block_name(idx: usize) -> &'static str {
    if idx == PAIR {
        "pair"
    } else {
        "product"
    }
}

/// One cone of the supermatrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Cone {
    kind: ConeKind,
    blocks: BlockMatrix,
}

impl Cone {
    pub fn kind(&self) -> ConeKind {
        self.kind
    }

    pub fn blocks(&self) -> &BlockMatrix {
        &self.blocks
    }

    fn with_products(&self) -> bool {
        self.blocks.len() > PRODUCTS
    }
}

/// Block-diagonal collection of cone images of a primal [`Tpm`].
#[derive(Clone, Debug, PartialEq)]
pub struct Sup {
    l: usize,
    n: usize,
    cones: Vec<Cone>,
}

impl Sup {
    /// Zero supermatrix over the given cones.
    pub fn new(l: usize, n: usize, kinds: &[ConeKind]) -> Self {
        let cones = kinds
            .iter()
            .map(|&kind| {
                let mut blocks = vec![Block::dense(l, 1.0)];
                if kind.products_active(l, n) {
                    blocks.push(Block::diagonal(l * (l - 1) / 2, PRODUCT_DEGENERACY));
                }
                Cone {
                    kind,
                    blocks: BlockMatrix::new(blocks),
                }
            })
            .collect();
        Sup { l, n, cones }
    }

    /// Supermatrix filled from `primal`.
    pub fn from_primal(primal: &Tpm, kinds: &[ConeKind]) -> Self {
        let mut sup = Sup::new(primal.num_orbitals(), primal.num_electrons(), kinds);
        sup.fill(primal);
        sup
    }

    pub fn cones(&self) -> &[Cone] {
        &self.cones
    }

    /// Maps `primal` into every cone.
    pub fn fill(&mut self, primal: &Tpm) {
        for cone in &mut self.cones {
            let with_products = cone.with_products();
            cone.blocks = cone.kind.image(primal, with_products);
        }
    }

    /// Inverts every block in place, in parallel.
    ///
    /// Fails with [`SolverError::Domain`] when a block is singular or indefinite; the
    /// supermatrix is then partially inverted and must be discarded.
    pub fn invert(&mut self) -> Result<()> {
        self.cones.par_iter_mut().try_for_each(|cone| {
            let kind = cone.kind;
            cone.blocks
                .blocks_mut()
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(idx, block)| {
                    block.invert().map_err(|_| SolverError::Domain {
                        cone: kind.name(),
                        block: block_name(idx),
                    })
                })
        })
    }

    pub fn dot(&self, other: &Sup) -> f64 {
        self.cones
            .iter()
            .zip(other.cones.iter())
            .map(|(a, b)| a.blocks.dot(&b.blocks))
            .sum()
    }

    /// Largest absolute element-wise difference between two supermatrices.
    pub fn max_abs_diff(&self, other: &Sup) -> f64 {
        let mut diff = 0.0_f64;
        for (a, b) in self.cones.iter().zip(other.cones.iter()) {
            for (x, y) in a.blocks.blocks().iter().zip(b.blocks.blocks()) {
                let d = match (x, y) {
                    (Block::Dense { values: p, .. }, Block::Dense { values: q, .. }) => {
                        (p - q).amax()
                    }
                    (Block::Diagonal { values: p, .. }, Block::Diagonal { values: q, .. }) => {
                        (p - q).amax()
                    }
                    _ => f64::INFINITY,
                };
                diff = diff.max(d);
            }
        }
        diff
    }

    /// Gradient of `sum_cones logdet(C(Γ))`, i.e. `sum_cones C_lin†(C^{-1})`.
    ///
    /// Only meaningful after [`Sup::invert`].
    pub fn gradient_image(&self) -> Tpm {
        let mut out = Tpm::new(self.l, self.n);
        for cone in &self.cones {
            out += &cone.kind.adjoint(&cone.blocks, self.l, self.n);
        }
        out
    }

    /// Hessian of `-sum_cones logdet(C(Γ))` applied to `direction`:
    /// `sum_cones C_lin†(C^{-1} C_lin(Δ) C^{-1})`.
    ///
    /// Only meaningful after [`Sup::invert`].
    pub fn hessian_image(&self, direction: &Tpm) -> Tpm {
        let images: Vec<Tpm> = self
            .cones
            .par_iter()
            .map(|cone| {
                let mapped = cone.kind.linear_image(direction, cone.with_products());
                let sandwiched = BlockMatrix::new(
                    cone.blocks
                        .blocks()
                        .iter()
                        .zip(mapped.blocks())
                        .map(|(inverse, step)| inverse.sandwich(step))
                        .collect(),
                );
                cone.kind.adjoint(&sandwiched, self.l, self.n)
            })
            .collect();

        let mut out = Tpm::new(self.l, self.n);
        for image in &images {
            out += image;
        }
        out
    }

    /// Whitened eigenvalues of `direction` against every block, with the block degeneracy.
    ///
    /// Must be called on a filled, non-inverted supermatrix.
    pub fn spectra(&self, direction: &Tpm) -> Result<Vec<(f64, DVector<f64>)>> {
        let per_cone: Vec<Vec<(f64, DVector<f64>)>> = self
            .cones
            .par_iter()
            .map(|cone| {
                let mapped = cone.kind.linear_image(direction, cone.with_products());
                cone.blocks
                    .blocks()
                    .iter()
                    .zip(mapped.blocks())
                    .enumerate()
                    .map(|(idx, (block, step))| {
                        block
                            .whitened_spectrum(step)
                            .map(|spectrum| (block.degeneracy(), spectrum))
                            .map_err(|_| SolverError::Domain {
                                cone: cone.kind.name(),
                                block: block_name(idx),
                            })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(per_cone.into_iter().flatten().collect())
    }

    /// Dense copy of a cone block, for inspection.
    pub fn block_matrix(&self, cone: usize, block: usize) -> Option<DMatrix<f64>> {
        match self.cones.get(cone)?.blocks.blocks().get(block)? {
            Block::Dense { values, .. } => Some(values.clone()),
            Block::Diagonal { values, .. } => Some(DMatrix::from_diagonal(values)),
        }
    }
}
