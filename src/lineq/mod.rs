//! Linear equality constraints on the DOCI 2-RDM.
//!
//! The feasible affine subspace is cut out by
//!
//! - the trace `sum_a Π_aa = N/2`,
//! - the contraction to the diagonal 1-RDM, `2 sum_{b != a} x_ab = (N-2) Π_aa` for every `a`,
//! - for a single pair (`N = 2`) the vanishing product block `x_ab = 0`,
//! - for a single hole pair (`N = 2L - 2`) the vanishing two-hole products
//!   `x_ab - Π_aa - Π_bb = -1`.
//!
//! The last two families pin blocks that would otherwise sit on the boundary of the
//! particle or hole cone, which would leave the barrier without an interior.
//!
//! The constraint matrices are orthonormalised once, after which projecting onto
//! the tangent space is a sum of inner products.

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::tpm::{orbital_pairs, pair_index, validate_dimensions, Tpm, PRODUCT_DEGENERACY};
use tracing::debug;

/// Constraints whose residual norm after orthogonalisation falls below this
/// fraction of their original norm are linearly dependent and dropped.
const DEPENDENCY_TOLERANCE: f64 = 1e-10;

/// True when the product block is fixed to zero (one electron pair).
pub fn products_pinned(_l: usize, n: usize) -> bool {
    n == 2
}

/// True when the two-hole product block is fixed to zero (one hole pair).
pub fn hole_products_pinned(l: usize, n: usize) -> bool {
    n + 2 == 2 * l
}

/// Linear equality manager: `<E_i, Γ> = e_i` for every constraint `i`.
#[derive(Clone, Debug)]
pub struct Lineq {
    l: usize,
    n: usize,
    constraints: Vec<Tpm>,
    values: Vec<f64>,
    ortho: Vec<Tpm>,
    ortho_values: Vec<f64>,
}

impl Lineq {
    pub fn new(l: usize, n: usize) -> Result<Self> {
        validate_dimensions(l, n)?;

        let mut constraints = Vec::new();
        let mut values = Vec::new();

        let mut trace = Tpm::new(l, n);
        for a in 0..l {
            trace.pair_mut()[(a, a)] = 1.0;
        }
        constraints.push(trace);
        values.push(n as f64 / 2.0);

        // 4 * c = 2 gives the weight of x_ab in the contraction
        let contraction_weight = 2.0 / PRODUCT_DEGENERACY;
        for a in 0..l {
            let mut contraction = Tpm::new(l, n);
            contraction.pair_mut()[(a, a)] = -(n as f64 - 2.0);
            for b in (0..l).filter(|&b| b != a) {
                contraction.products_mut()[pair_index(l, a, b)] = contraction_weight;
            }
            constraints.push(contraction);
            values.push(0.0);
        }

        let unit_weight = 1.0 / PRODUCT_DEGENERACY;
        if products_pinned(l, n) {
            for (idx, _) in orbital_pairs(l).enumerate() {
                let mut pinned = Tpm::new(l, n);
                pinned.products_mut()[idx] = unit_weight;
                constraints.push(pinned);
                values.push(0.0);
            }
        }
        if hole_products_pinned(l, n) {
            for (idx, (a, b)) in orbital_pairs(l).enumerate() {
                let mut pinned = Tpm::new(l, n);
                pinned.products_mut()[idx] = unit_weight;
                pinned.pair_mut()[(a, a)] = -1.0;
                pinned.pair_mut()[(b, b)] = -1.0;
                constraints.push(pinned);
                values.push(-1.0);
            }
        }

        let (ortho, ortho_values) = orthonormalize(&constraints, &values);
        debug!(
            "Lineq L={} N={}: {} constraints, {} independent",
            l,
            n,
            constraints.len(),
            ortho.len()
        );

        Ok(Lineq {
            l,
            n,
            constraints,
            values,
            ortho,
            ortho_values,
        })
    }

    pub fn num_orbitals(&self) -> usize {
        self.l
    }

    pub fn num_electrons(&self) -> usize {
        self.n
    }

    /// Number of constraints as generated, including dependent ones.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of linearly independent constraints.
    pub fn num_independent(&self) -> usize {
        self.ortho.len()
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&Tpm, f64)> {
        self.constraints.iter().zip(self.values.iter().copied())
    }

    /// Orthonormal basis of the constraint span with the matching right-hand sides.
    pub fn orthonormal(&self) -> impl Iterator<Item = (&Tpm, f64)> {
        self.ortho.iter().zip(self.ortho_values.iter().copied())
    }

    /// Fills `target` with the uniform ensemble over all pair configurations.
    ///
    /// Every orbital carries `N/2L` pairs and every two orbitals are jointly occupied
    /// with probability `(N/2L)(N/2 - 1)/(L - 1)`. The point satisfies all constraints and
    /// lies strictly inside every cone block that is not pinned.
    pub fn feasible_init(&self, target: &mut Tpm) {
        let l = self.l as f64;
        let pairs = self.n as f64 / 2.0;
        let filling = pairs / l;
        let joint = filling * (pairs - 1.0) / (l - 1.0);

        *target = Tpm::new(self.l, self.n);
        for a in 0..self.l {
            target.pair_mut()[(a, a)] = filling;
        }
        target.products_mut().fill(joint);
    }

    /// Removes the components along the constraint normals, in place.
    pub fn project(&self, tpm: &mut Tpm) {
        for normal in &self.ortho {
            let overlap = normal.dot(tpm);
            tpm.axpy(-overlap, normal);
        }
    }

    /// Largest violation `|<E_i, Γ> - e_i|` over the constraints.
    pub fn violation(&self, tpm: &Tpm) -> f64 {
        self.constraints()
            .map(|(constraint, value)| (constraint.dot(tpm) - value).abs())
            .fold(0.0, f64::max)
    }
}

/// Modified Gram-Schmidt with one re-orthogonalisation pass.
fn orthonormalize(constraints: &[Tpm], values: &[f64]) -> (Vec<Tpm>, Vec<f64>) {
    let mut ortho: Vec<Tpm> = Vec::with_capacity(constraints.len());
    let mut ortho_values = Vec::with_capacity(constraints.len());

    for (constraint, &value) in constraints.iter().zip(values) {
        let original_norm = constraint.dot(constraint).sqrt();
        let mut vector = constraint.clone();
        let mut rhs = value;

        for _ in 0..2 {
            for (basis, &basis_value) in ortho.iter().zip(ortho_values.iter()) {
                let overlap = basis.dot(&vector);
                vector.axpy(-overlap, basis);
                rhs -= overlap * basis_value;
            }
        }

        let norm = vector.dot(&vector).sqrt();
        if norm <= DEPENDENCY_TOLERANCE * original_norm {
            continue;
        }
        vector /= norm;
        ortho.push(vector);
        ortho_values.push(rhs / norm);
    }

    (ortho, ortho_values)
}
