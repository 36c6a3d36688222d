//! End-to-end runs on the example inputs
//!
//! These tests load the files under `example/`, run the potential reduction and
//! compare against exact diagonalisation of the DOCI space.

use doci_sdp::exact::ground_state_energy;
use doci_sdp::io::{load_rdm, read_fcidump};
use doci_sdp::{CancellationToken, IntegralSource, Integrals, Method, PotentialReduction};
use std::fs;
use std::path::PathBuf;

/// Helper function to get the path to example files
fn example_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("example")
        .join(filename)
}

fn pairing_from_yaml(filename: &str) -> Integrals {
    let content = fs::read_to_string(example_path(filename)).unwrap();
    let config: serde_yml::Value = serde_yml::from_str(&content).unwrap();
    let pairing = &config["hamiltonian"]["pairing"];

    let levels: Vec<f64> = pairing["levels"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|level| level.as_f64().unwrap())
        .collect();
    let coupling = pairing["coupling"].as_f64().unwrap();
    let electrons = pairing["electrons"].as_u64().unwrap() as usize;
    Integrals::pairing(&levels, coupling, electrons)
}

#[test]
fn test_h2_fcidump_single_pair_is_exact() {
    let integrals = read_fcidump(example_path("h2.fcidump")).unwrap();
    assert_eq!(integrals.num_orbitals(), 2);
    assert_eq!(integrals.num_electrons(), 2);

    let exact = ground_state_energy(&integrals).unwrap();
    let mut solver = PotentialReduction::new(&integrals).unwrap();
    solver.set_target(1e-10);
    let report = solver.run(&CancellationToken::new()).unwrap();

    assert!(
        (report.energy - exact).abs() < 1e-6,
        "sdp {} exact {}",
        report.energy,
        exact
    );
    // minimal-basis H2 near equilibrium
    assert!(report.full_energy > -1.2 && report.full_energy < -1.1);
}

#[test]
fn test_pairing_example_is_a_lower_bound() {
    let integrals = pairing_from_yaml("pairing.yaml");
    assert_eq!(integrals.num_orbitals(), 8);
    assert_eq!(integrals.num_electrons(), 8);

    let exact = ground_state_energy(&integrals).unwrap();
    let mut solver = PotentialReduction::new(&integrals).unwrap();
    solver.set_target(1e-8);
    let report = solver.run(&CancellationToken::new()).unwrap();

    assert!(!report.cancelled);
    assert!(report.energy <= exact + 1e-6, "sdp {} exact {}", report.energy, exact);
    assert!(report.energy > exact - 0.5);
    assert!((report.trace - 28.0).abs() < 1e-8);
    assert!(solver.lineq().violation(solver.rdm()) < 1e-8);

    let occupations = solver.rdm().one_rdm();
    // one spin channel holds N/2 electrons
    assert!((occupations.sum() - 4.0).abs() < 1e-8);
    assert!(occupations[0] > occupations[7]);
}

#[test]
fn test_optimal_rdm_survives_a_file_round_trip() {
    let integrals = pairing_from_yaml("pairing.yaml");
    let mut solver = PotentialReduction::new(&integrals).unwrap();
    solver.set_target(1e-4);
    solver.run(&CancellationToken::new()).unwrap();

    let path = std::env::temp_dir().join(format!("doci_sdp_{}_optimal.json", std::process::id()));
    solver.save_rdm(&path).unwrap();
    let loaded = load_rdm(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(loaded.num_orbitals(), 8);
    assert!(loaded.max_abs_diff(solver.rdm()) < 1e-12);

    let energy = solver.energy();
    let mut restarted = PotentialReduction::new(&integrals).unwrap();
    restarted.load_rdm(loaded).unwrap();
    assert!((restarted.energy() - energy).abs() < 1e-10);
}
