//! Exact line search on the barrier potential along a feasible direction.
//!
//! Along `Γ + aΔ` every cone block factorises as `det(C + aD) = det(C) prod(1 + aλ)`
//! with the whitened eigenvalues `λ` of `D` against `C`, so the directional
//! derivative of the potential is the scalar function
//!
//! ```text
//! φ'(a) = <H, Δ> - t sum_blocks deg sum_i λ_i / (1 + aλ_i)
//! ```
//!
//! which increases monotonically on `[0, a_max)` and is bisected for its root.

use crate::error::Result;
use crate::sup::{ConeKind, Sup};
use crate::tpm::Tpm;
use nalgebra::DVector;

/// Relative width of the bracket at which bisection stops.
const BISECTION_TOLERANCE: f64 = 1e-10;
const MAX_BISECTIONS: usize = 200;
/// Longest step tried when no block bounds the direction.
const MAX_UNBOUNDED_STEP: f64 = 1e8;

/// Step length minimising the potential along `direction` from `primal`.
pub fn line_search(
    t: f64,
    primal: &Tpm,
    cones: &[ConeKind],
    ham: &Tpm,
    direction: &Tpm,
) -> Result<f64> {
    let sup = Sup::from_primal(primal, cones);
    let spectra = sup.spectra(direction)?;
    Ok(step_length(t, ham.dot(direction), &spectra))
}

/// Root of `φ'` given the slope `<H, Δ>` and the whitened spectra with their degeneracies.
///
/// Returns `0` for a direction that does not descend. The result always lies strictly
/// inside the cones.
pub fn step_length(t: f64, slope: f64, spectra: &[(f64, DVector<f64>)]) -> f64 {
    let derivative = |a: f64| -> f64 {
        let barrier: f64 = spectra
            .iter()
            .map(|(deg, lambda)| deg * lambda.iter().map(|l| l / (1.0 + a * l)).sum::<f64>())
            .sum();
        slope - t * barrier
    };

    if derivative(0.0) >= 0.0 {
        return 0.0;
    }

    let smallest = spectra
        .iter()
        .flat_map(|(_, lambda)| lambda.iter().copied())
        .fold(f64::INFINITY, f64::min);

    let mut lo = 0.0;
    let mut hi = if smallest < 0.0 {
        -1.0 / smallest
    } else {
        let mut trial = 1.0;
        while derivative(trial) < 0.0 {
            if trial >= MAX_UNBOUNDED_STEP {
                return trial;
            }
            lo = trial;
            trial *= 2.0;
        }
        trial
    };

    for _ in 0..MAX_BISECTIONS {
        if hi - lo <= BISECTION_TOLERANCE * hi {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if derivative(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}
