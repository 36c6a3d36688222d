//! Newton system of the barrier potential.
//!
//! For `φ_t(Γ) = <H, Γ> - t sum_cones logdet(C(Γ))` restricted to the constraint
//! manifold, the Newton step `Δ` solves
//!
//! ```text
//! Proj(sum_cones C_lin†(C^{-1} C_lin(Δ) C^{-1})) = r / t,
//! r = Proj(t sum_cones C_lin†(C^{-1}) - H)
//! ```
//!
//! The operator is never assembled. Conjugate gradients only need its action,
//! which costs two block products per cone.

use crate::lineq::Lineq;
use crate::sup::Sup;
use crate::tpm::Tpm;

/// Stopping rule of the conjugate-gradient solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgSettings {
    /// Relative tolerance on the squared residual norm, `|r|² <= tol |b|²`.
    pub tolerance: f64,
    /// Iteration cap; `0` means twice the number of free parameters.
    pub max_iterations: usize,
}

impl Default for CgSettings {
    fn default() -> Self {
        CgSettings {
            tolerance: 1e-12,
            max_iterations: 0,
        }
    }
}

/// Outcome of a conjugate-gradient solve.
#[derive(Clone, Debug)]
pub struct CgResult {
    pub converged: bool,
    pub iterations: usize,
    /// Final `|r|² / |b|²`.
    pub relative_residual: f64,
}

/// Negative projected gradient `r = Proj(t sum_cones C_lin†(C^{-1}) - H)`.
///
/// `inverse` must be the inverted supermatrix of the current iterate.
pub fn constrained_gradient(t: f64, inverse: &Sup, ham: &Tpm, lineq: &Lineq) -> Tpm {
    let mut gradient = inverse.gradient_image();
    gradient *= t;
    gradient -= ham;
    lineq.project(&mut gradient);
    gradient
}

/// Projected Hessian action `Proj(sum_cones C_lin†(C^{-1} C_lin(Δ) C^{-1}))`.
pub fn hessian(inverse: &Sup, direction: &Tpm, lineq: &Lineq) -> Tpm {
    let mut image = inverse.hessian_image(direction);
    lineq.project(&mut image);
    image
}

/// Solves the Newton system for the step, starting from zero.
///
/// The right-hand side, every residual and the returned step are projected onto the
/// tangent space of the constraints, so the step keeps the primal matrix feasible.
/// Rounding along a constraint normal has no curvature under the projected Hessian
/// and would otherwise be amplified into the step.
pub fn solve(
    t: f64,
    inverse: &Sup,
    gradient: &Tpm,
    lineq: &Lineq,
    settings: &CgSettings,
) -> (Tpm, CgResult) {
    let l = gradient.num_orbitals();
    let max_iterations = if settings.max_iterations == 0 {
        2 * l * l
    } else {
        settings.max_iterations
    };

    let mut rhs = gradient.clone();
    rhs /= t;
    lineq.project(&mut rhs);

    let mut step = Tpm::new(l, gradient.num_electrons());
    let b_norm_sq = rhs.dot(&rhs);
    if b_norm_sq == 0.0 {
        return (
            step,
            CgResult {
                converged: true,
                iterations: 0,
                relative_residual: 0.0,
            },
        );
    }

    let threshold = settings.tolerance * b_norm_sq;
    let mut residual = rhs;
    let mut r_norm_sq = b_norm_sq;
    let mut search = residual.clone();
    let mut iterations = 0;

    while r_norm_sq > threshold && iterations < max_iterations {
        iterations += 1;

        let image = hessian(inverse, &search, lineq);
        let curvature = search.dot(&image);
        if curvature <= 0.0 {
            break;
        }
        let alpha = r_norm_sq / curvature;

        step.axpy(alpha, &search);
        residual.axpy(-alpha, &image);
        lineq.project(&mut residual);

        let r_norm_sq_new = residual.dot(&residual);
        let beta = r_norm_sq_new / r_norm_sq;
        r_norm_sq = r_norm_sq_new;

        // p = r + beta * p
        search *= beta;
        search += &residual;
    }

    lineq.project(&mut step);
    (
        step,
        CgResult {
            converged: r_norm_sq <= threshold,
            iterations,
            relative_residual: r_norm_sq / b_norm_sq,
        },
    )
}
