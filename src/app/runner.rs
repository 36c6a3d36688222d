use crate::config::{Args, Config};
use color_eyre::eyre::{eyre, Result, WrapErr};
use doci_sdp::io::read_fcidump;
use doci_sdp::potential_reduction::{
    DEFAULT_MAX_INNER_BREAKS, DEFAULT_MAX_INNER_ITERATIONS, DEFAULT_REDUCTION_FACTOR,
    DEFAULT_TARGET, DEFAULT_TOLERANCE,
};
use doci_sdp::{IntegralSource, Integrals, PotentialReduction};
use std::path::PathBuf;
use tracing::info;

/// Integrals named by the `hamiltonian` section; the FCIDUMP wins if both are given.
pub fn build_integrals(config: &Config) -> Result<Integrals> {
    let section = &config.hamiltonian;
    let mut integrals = if let Some(path) = &section.fcidump {
        info!("Reading integrals from FCIDUMP: {}", path);
        read_fcidump(path).wrap_err_with(|| format!("Unable to load FCIDUMP {}", path))?
    } else if let Some(pairing) = &section.pairing {
        info!(
            "Reduced BCS pairing model: {} levels, g = {}, N = {}",
            pairing.levels.len(),
            pairing.coupling,
            pairing.electrons
        );
        Integrals::pairing(&pairing.levels, pairing.coupling, pairing.electrons)
    } else {
        return Err(eyre!(
            "The hamiltonian section needs either an fcidump path or a pairing model"
        ));
    };

    if let Some(electrons) = section.electrons {
        info!("Overriding electron count with: {}", electrons);
        integrals.set_num_electrons(electrons);
    }

    info!(
        "L = {}, N = {}, E_nuc = {:.10}",
        integrals.num_orbitals(),
        integrals.num_electrons(),
        integrals.nuclear_repulsion()
    );
    Ok(integrals)
}

pub fn configure_solver(
    integrals: &Integrals,
    args: &Args,
    config: &Config,
) -> Result<PotentialReduction> {
    let mut solver = PotentialReduction::new(integrals)?;
    let params = &config.solver;

    solver.set_target(args.target.or(params.target).unwrap_or(DEFAULT_TARGET));
    solver.set_tolerance(args.tolerance.or(params.tolerance).unwrap_or(DEFAULT_TOLERANCE));
    solver.set_reduction_factor(
        args.reduction_factor
            .or(params.reduction_factor)
            .unwrap_or(DEFAULT_REDUCTION_FACTOR),
    );
    solver.set_max_inner_iterations(
        params
            .max_inner_iterations
            .unwrap_or(DEFAULT_MAX_INNER_ITERATIONS),
    );
    solver.set_max_inner_breaks(params.max_inner_breaks.unwrap_or(DEFAULT_MAX_INNER_BREAKS));
    if let Some(tolerance) = params.cg_tolerance {
        solver.set_cg_tolerance(tolerance);
    }
    if let Some(max_iterations) = params.max_cg_iterations {
        solver.set_max_cg_iterations(max_iterations);
    }

    let hole_condition = !args.no_hole_condition && params.hole_condition.unwrap_or(true);
    if !hole_condition {
        info!("Two-hole condition disabled");
    }
    solver.set_hole_condition(hole_condition);

    let progress = args
        .progress
        .as_ref()
        .or(config.output.progress.as_ref())
        .map(PathBuf::from);
    if let Some(path) = &progress {
        info!("Progress lines appended to: {}", path.display());
    }
    solver.set_progress_file(progress);

    Ok(solver)
}
