use color_eyre::eyre::Result;
use doci_sdp::exact::{ground_state_energy, num_configurations, MAX_CONFIGURATIONS};
use doci_sdp::{IntegralSource, Integrals, Method, PotentialReduction, RunReport};
use tracing::{info, warn};

pub fn report_summary(solver: &PotentialReduction, report: &RunReport) {
    info!("\nPotential reduction finished.");
    if report.cancelled {
        warn!("Run was cancelled before reaching the target barrier weight");
    }

    info!("  Outer iterations: {}", report.outer_iterations);
    info!("  Inner iterations: {}", report.iterations);
    if report.inner_breaks > 0 {
        warn!("  Inner loops stopped at the cap: {}", report.inner_breaks);
    }
    info!("  Runtime: {:.3} s", report.elapsed.as_secs_f64());

    info!("\nOrbital occupations:");
    for (a, occupation) in solver.rdm().one_rdm().iter().enumerate() {
        info!("  Orbital {:>3}: {:.8}", a + 1, occupation);
    }

    info!("\nElectronic energy: {:.10} au", report.energy);
    info!("DOCI 2-RDM Total Energy: {:.10} au", report.full_energy);
}

/// Compares the lower bound with exact diagonalisation when the space is small enough.
pub fn report_reference(integrals: &Integrals, bound: f64) -> Result<()> {
    let dim = num_configurations(integrals.num_orbitals(), integrals.num_electrons());
    if dim > MAX_CONFIGURATIONS {
        warn!(
            "Skipping exact reference: {} configurations exceed {}",
            dim, MAX_CONFIGURATIONS
        );
        return Ok(());
    }

    let exact = ground_state_energy(integrals)?;
    info!("\nExact DOCI electronic energy: {:.10} au", exact);
    info!("Lower-bound gap: {:.3e} au", exact - bound);
    Ok(())
}
