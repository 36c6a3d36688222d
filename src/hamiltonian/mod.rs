//! Integral sources for the reduced DOCI Hamiltonian.
//!
//! The solver only needs point access to the one-body integrals `T(p, q)` and
//! the physicist-notation two-body integrals `V(p, q, r, s) = <pq|rs>`, together
//! with `L`, `N` and a constant energy shift. [`IntegralSource`] is that seam;
//! [`Integrals`] is a dense in-memory implementation which can be filled from an
//! FCIDUMP file (see [`crate::io::read_fcidump`]) or from the reduced BCS pairing model.

#[cfg(test)]
mod tests;

use nalgebra::DMatrix;
use tracing::info;

/// Everything the solver consumes from an electronic Hamiltonian.
pub trait IntegralSource {
    /// Number of spatial orbitals `L`.
    fn num_orbitals(&self) -> usize;

    /// Number of electrons `N`.
    fn num_electrons(&self) -> usize;

    /// Constant energy shift (nuclear repulsion, frozen core).
    fn nuclear_repulsion(&self) -> f64;

    fn one_body(&self, p: usize, q: usize) -> f64;

    /// `<pq|rs>` in physicist notation.
    fn two_body(&self, p: usize, q: usize, r: usize, s: usize) -> f64;
}

/// Dense one- and two-body integrals.
#[derive(Clone, Debug, PartialEq)]
pub struct Integrals {
    l: usize,
    n: usize,
    nuclear_repulsion: f64,
    one_body: DMatrix<f64>,
    two_body: Vec<f64>,
}

impl Integrals {
    /// All-zero integrals for `L` orbitals and `N` electrons.
    pub fn new(l: usize, n: usize, nuclear_repulsion: f64) -> Self {
        Integrals {
            l,
            n,
            nuclear_repulsion,
            one_body: DMatrix::zeros(l, l),
            two_body: vec![0.0; l * l * l * l],
        }
    }

    /// Reduced BCS (Richardson) pairing Hamiltonian
    /// `H = sum_a ε_a (n_aα + n_aβ) - g sum_ab a†_aα a†_aβ a_bβ a_bα`.
    ///
    /// Only the pair-transfer elements `<aa|bb>` are set, so the integrals
    /// break the permutational symmetry of a Coulomb interaction.
    pub fn pairing(levels: &[f64], coupling: f64, electrons: usize) -> Self {
        let l = levels.len();
        let mut integrals = Integrals::new(l, electrons, 0.0);
        for (a, &eps) in levels.iter().enumerate() {
            integrals.set_one_body(a, a, eps);
        }
        for a in 0..l {
            for b in 0..l {
                integrals.set_two_body(a, a, b, b, -coupling);
            }
        }
        info!(
            "Built pairing Hamiltonian: L={}, N={}, g={:.6}",
            l, electrons, coupling
        );
        integrals
    }

    /// Sets `T(p, q)` and `T(q, p)`.
    pub fn set_one_body(&mut self, p: usize, q: usize, value: f64) {
        self.one_body[(p, q)] = value;
        self.one_body[(q, p)] = value;
    }

    /// Sets the single element `<pq|rs>`.
    pub fn set_two_body(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) {
        let idx = self.index(p, q, r, s);
        self.two_body[idx] = value;
    }

    /// Sets `<pq|rs>` and its seven partners under real-orbital permutational symmetry.
    pub fn set_two_body_symmetric(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) {
        for (i, j, k, m) in [
            (p, q, r, s),
            (q, p, s, r),
            (r, s, p, q),
            (s, r, q, p),
            (r, q, p, s),
            (p, s, r, q),
            (s, p, q, r),
            (q, r, s, p),
        ] {
            self.set_two_body(i, j, k, m, value);
        }
    }

    pub fn set_nuclear_repulsion(&mut self, value: f64) {
        self.nuclear_repulsion = value;
    }

    pub fn set_num_electrons(&mut self, n: usize) {
        self.n = n;
    }

    fn index(&self, p: usize, q: usize, r: usize, s: usize) -> usize {
        let l = self.l;
        ((p * l + q) * l + r) * l + s
    }
}

impl IntegralSource for Integrals {
    fn num_orbitals(&self) -> usize {
        self.l
    }

    fn num_electrons(&self) -> usize {
        self.n
    }

    fn nuclear_repulsion(&self) -> f64 {
        self.nuclear_repulsion
    }

    fn one_body(&self, p: usize, q: usize) -> f64 {
        self.one_body[(p, q)]
    }

    fn two_body(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        self.two_body[self.index(p, q, r, s)]
    }
}
