use super::{Method, PotentialReduction};
use crate::cancel::CancellationToken;
use crate::error::SolverError;
use crate::exact::ground_state_energy;
use crate::hamiltonian::{IntegralSource, Integrals};
use crate::tpm::Tpm;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;

/// Two orbitals, one pair, no pair transfer: `E = min(2 T_aa + U_a)`.
fn diagonal_model() -> Integrals {
    let mut integrals = Integrals::new(2, 2, 0.5);
    integrals.set_one_body(0, 0, -1.0);
    integrals.set_one_body(1, 1, -0.5);
    integrals.set_two_body(0, 0, 0, 0, 0.6);
    integrals.set_two_body(1, 1, 1, 1, 0.3);
    integrals
}

fn random_integrals(l: usize, n: usize, seed: u64) -> Integrals {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut integrals = Integrals::new(l, n, 0.0);
    for p in 0..l {
        integrals.set_one_body(p, p, -2.0 + 0.5 * p as f64);
        for q in (p + 1)..l {
            integrals.set_one_body(p, q, rng.gen_range(-0.1..0.1));
        }
    }
    for p in 0..l {
        for q in 0..l {
            for r in 0..l {
                for s in 0..l {
                    integrals.set_two_body_symmetric(p, q, r, s, rng.gen_range(0.0..0.3));
                }
            }
        }
    }
    integrals
}

fn solver_for(source: &Integrals, target: f64) -> PotentialReduction {
    let mut solver = PotentialReduction::new(source).unwrap();
    solver.set_target(target);
    solver
}

fn scratch_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("doci_sdp_{}_{}", std::process::id(), name))
}

#[test]
fn test_two_level_diagonal_hamiltonian() {
    let integrals = diagonal_model();
    let mut solver = solver_for(&integrals, 1e-10);

    let report = solver.run(&CancellationToken::new()).unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.outer_iterations, 34);
    assert!(report.iterations >= report.outer_iterations);
    assert!((report.energy - (-1.4)).abs() < 1e-6, "E = {}", report.energy);
    assert!((report.full_energy - report.energy - 0.5).abs() < 1e-12);
    assert!((report.trace - 1.0).abs() < 1e-8);
    assert!(report.spin_squared.abs() < 1e-8);

    let rdm = solver.rdm();
    assert!((rdm.pair()[(0, 0)] - 1.0).abs() < 1e-6);
    assert!(solver.lineq().violation(rdm) < 1e-8);
}

#[test]
fn test_one_pair_matches_exact_diagonalisation() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0], 0.4, 2);
    let exact = ground_state_energy(&integrals).unwrap();

    let mut solver = solver_for(&integrals, 1e-10);
    let report = solver.run(&CancellationToken::new()).unwrap();

    assert!(
        (report.energy - exact).abs() < 1e-6,
        "sdp {} exact {}",
        report.energy,
        exact
    );
}

#[test]
fn test_one_pair_without_hole_condition_is_still_exact() {
    let integrals = Integrals::pairing(&[0.0, 0.5, 1.5], 0.8, 2);
    let exact = ground_state_energy(&integrals).unwrap();

    let mut solver = solver_for(&integrals, 1e-10);
    solver.set_hole_condition(false);
    assert_eq!(solver.cones().len(), 1);
    let report = solver.run(&CancellationToken::new()).unwrap();

    assert!((report.energy - exact).abs() < 1e-6);
}

#[test]
fn test_two_pairs_give_a_lower_bound() {
    for integrals in [
        Integrals::pairing(&[0.0, 1.0, 2.0, 3.0], 0.5, 4),
        random_integrals(4, 4, 99),
    ] {
        let exact = ground_state_energy(&integrals).unwrap();
        let mut solver = solver_for(&integrals, 1e-9);
        let report = solver.run(&CancellationToken::new()).unwrap();

        assert!(
            report.energy <= exact + 1e-6,
            "sdp {} above exact {}",
            report.energy,
            exact
        );
        assert!(report.energy > exact - 1.0);
        assert!((report.trace - 6.0).abs() < 1e-8);
    }
}

#[test]
fn test_invalid_reduction_factor_is_rejected_before_iterating() {
    let integrals = diagonal_model();
    for factor in [1.5, 1.0, 0.0, -0.5] {
        let mut solver = solver_for(&integrals, 1e-6);
        solver.set_reduction_factor(factor);
        let before = solver.rdm().clone();

        let err = solver.run(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, SolverError::Configuration(_)), "{}", err);
        assert_eq!(solver.total_iterations(), 0);
        assert_eq!(solver.rdm(), &before);
    }

    let mut solver = solver_for(&integrals, -1.0);
    assert!(matches!(
        solver.run(&CancellationToken::new()),
        Err(SolverError::Configuration(_))
    ));
}

#[test]
fn test_target_above_one_returns_immediately() {
    let integrals = diagonal_model();
    let mut solver = solver_for(&integrals, 1.0);
    solver.set_reduction_factor(2.0);

    let report = solver.run(&CancellationToken::new()).unwrap();
    assert_eq!(report.iterations, 0);
    assert_eq!(report.outer_iterations, 0);
    // uniform ensemble: half a pair on each orbital
    assert!((report.energy - 0.5 * (-1.4 - 0.7)).abs() < 1e-12);
}

#[test]
fn test_clone_mid_run_continues_independently() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0, 3.0], 0.5, 4);
    let token = CancellationToken::new();

    let mut a = solver_for(&integrals, 1e-8);
    a.start().unwrap();
    for _ in 0..3 {
        a.outer_step().unwrap();
    }

    let mut b = a.clone();
    b.set_tolerance(1e-3);
    assert!(a.tolerance() < 1e-3);

    let report_b = b.resume(&token).unwrap();
    let report_a = a.resume(&token).unwrap();

    let mut c = solver_for(&integrals, 1e-8);
    c.start().unwrap();
    for _ in 0..3 {
        c.outer_step().unwrap();
    }
    let report_c = c.resume(&token).unwrap();

    assert_eq!(report_a.full_energy, report_c.full_energy);
    assert_eq!(report_a.iterations, report_c.iterations);
    assert_eq!(report_a.outer_iterations, report_c.outer_iterations);
    assert_eq!(a.rdm(), c.rdm());
    assert!((report_b.energy - report_a.energy).abs() < 1e-5);
}

#[test]
fn test_energy_approaches_the_optimum_from_above() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0, 3.0], 0.5, 4);
    let mut solver = solver_for(&integrals, 1e-9);
    solver.start().unwrap();

    let mut steps = Vec::new();
    while !solver.is_converged() {
        steps.push(solver.outer_step().unwrap());
    }
    let last = steps.last().unwrap().energy;
    assert!((last - solver.full_energy()).abs() < 1e-14);

    let tail: Vec<_> = steps.iter().filter(|step| step.t <= 1e-4).collect();
    assert!(tail.len() > 10);
    let first_gap = (tail[0].energy - last).abs();
    for step in &tail {
        assert!(step.energy >= last - 1e-6, "step {} below optimum", step.index);
        assert!((step.energy - last).abs() <= first_gap + 1e-7);
    }
    for (k, step) in steps.iter().enumerate() {
        assert_eq!(step.index, k);
    }
}

#[test]
fn test_cancellation_keeps_a_feasible_iterate() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0], 0.5, 2);

    let token = CancellationToken::new();
    token.cancel();
    let mut solver = solver_for(&integrals, 1e-8);
    let report = solver.run(&token).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.outer_iterations, 0);
    assert_eq!(report.iterations, 0);

    let mut solver = solver_for(&integrals, 1e-8);
    solver.start().unwrap();
    solver.outer_step().unwrap();
    solver.outer_step().unwrap();
    let report = solver.resume(&token).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.outer_iterations, 2);
    assert!(solver.lineq().violation(solver.rdm()) < 1e-8);
    assert_eq!(solver.barrier_weight(), Some(0.25));
}

#[test]
fn test_singular_iterate_is_a_domain_error() {
    let integrals = diagonal_model();
    let mut solver = solver_for(&integrals, 1e-8);
    solver.start().unwrap();

    let mut singular = Tpm::new(2, 2);
    singular.pair_mut().fill(0.5);
    solver.load_rdm(singular.clone()).unwrap();

    let err = solver.outer_step().unwrap_err();
    assert!(err.is_domain(), "{}", err);
    assert_eq!(solver.rdm(), &singular);
}

#[test]
fn test_load_rdm_checks_dimensions() {
    let integrals = diagonal_model();
    let mut solver = solver_for(&integrals, 1e-8);

    let err = solver.load_rdm(Tpm::new(3, 2)).unwrap_err();
    assert!(matches!(
        err,
        SolverError::DimensionMismatch {
            expected_l: 2,
            expected_n: 2,
            found_l: 3,
            found_n: 2
        }
    ));
}

#[test]
fn test_iteration_cap_escalates_to_non_convergence() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0], 0.5, 2);
    let mut solver = solver_for(&integrals, 1e-12);
    solver.set_max_inner_iterations(3);
    solver.set_max_inner_breaks(2);

    let err = solver.run(&CancellationToken::new()).unwrap_err();
    assert!(matches!(
        err,
        SolverError::NonConvergence {
            breaks: 3,
            limit: 2
        }
    ));
    assert!(solver.lineq().violation(solver.rdm()) < 1e-8);
}

#[test]
fn test_progress_file_gets_one_line_per_outer_iteration() {
    let integrals = diagonal_model();
    let path = scratch_file("solver_progress.txt");
    fs::remove_file(&path).ok();

    let mut solver = solver_for(&integrals, 1e-3);
    solver.set_progress_file(Some(path.clone()));
    let report = solver.run(&CancellationToken::new()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).ok();

    let progress: Vec<&str> = content
        .lines()
        .filter(|line| line.split('\t').count() == 6)
        .collect();
    assert_eq!(report.outer_iterations, 10);
    assert_eq!(progress.len(), 10);
    assert!(progress[0].starts_with("0\t1e0\t"));
    assert!(content.contains("Energy: "));
    assert!(content.contains(&format!("total nr of iterations = {}", report.iterations)));
}

#[test]
fn test_solver_behind_method_trait() {
    let integrals = Integrals::pairing(&[0.0, 1.0], 0.5, 2);
    let mut solver = solver_for(&integrals, 1e-10);
    let method: &mut dyn Method = &mut solver;

    let report = method.run(&CancellationToken::new()).unwrap();
    assert_eq!(report.energy, method.energy());
    assert_eq!(method.full_energy(), method.energy());
    assert_eq!(method.lineq().num_orbitals(), integrals.num_orbitals());

    let expected = 0.5 - (1.0_f64 + 0.25).sqrt();
    assert!((method.energy() - expected).abs() < 1e-6);
}

#[test]
fn test_every_outer_step_stays_on_the_constraint_manifold() {
    for integrals in [
        diagonal_model(),
        Integrals::pairing(&[0.0, 1.0, 2.0, 3.0], 0.5, 4),
    ] {
        let mut solver = solver_for(&integrals, 1e-10);
        solver.start().unwrap();
        let expected_trace = solver.rdm().trace();

        while !solver.is_converged() {
            let step = solver.outer_step().unwrap();
            let violation = solver.lineq().violation(solver.rdm());
            assert!(violation < 1e-8, "step {}: violation {}", step.index, violation);
            assert!((solver.rdm().trace() - expected_trace).abs() < 1e-8);
        }
    }
}

#[test]
fn test_reduction_factor_changed_mid_run_is_rejected() {
    let integrals = diagonal_model();
    let mut solver = solver_for(&integrals, 1e-8);
    solver.start().unwrap();
    solver.outer_step().unwrap();
    let iterations = solver.total_iterations();
    let rdm = solver.rdm().clone();

    solver.set_reduction_factor(1.0);
    let err = solver.resume(&CancellationToken::new()).unwrap_err();
    assert!(matches!(err, SolverError::Configuration(_)), "{}", err);
    assert!(matches!(
        solver.outer_step(),
        Err(SolverError::Configuration(_))
    ));
    assert_eq!(solver.total_iterations(), iterations);
    assert_eq!(solver.barrier_weight(), Some(0.5));
    assert_eq!(solver.rdm(), &rdm);

    solver.set_reduction_factor(0.5);
    let report = solver.resume(&CancellationToken::new()).unwrap();
    assert!((report.energy - (-1.4)).abs() < 1e-6);
}

#[test]
fn test_repeated_runs_are_reproducible() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0], 0.5, 2);
    let mut solver = solver_for(&integrals, 1e-8);
    solver.set_tolerance(1e-4);

    let first = solver.run(&CancellationToken::new()).unwrap();
    assert!(solver.tolerance() < 1e-4);

    solver.start().unwrap();
    assert_eq!(solver.tolerance(), 1e-4);
    let second = solver.resume(&CancellationToken::new()).unwrap();

    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.outer_iterations, second.outer_iterations);
    assert_eq!(first.full_energy, second.full_energy);
}
