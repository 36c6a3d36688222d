use super::{hole_products_pinned, products_pinned, Lineq};
use crate::tpm::Tpm;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_tpm(l: usize, n: usize, rng: &mut StdRng) -> Tpm {
    let mut tpm = Tpm::new(l, n);
    for a in 0..l {
        for b in a..l {
            let value: f64 = rng.gen_range(-1.0..1.0);
            tpm.pair_mut()[(a, b)] = value;
            tpm.pair_mut()[(b, a)] = value;
        }
    }
    for x in tpm.products_mut().iter_mut() {
        *x = rng.gen_range(-1.0..1.0);
    }
    tpm
}

#[test]
fn test_feasible_init_trace_matches_pair_count() {
    for l in 2..7 {
        for n in (2..2 * l).step_by(2) {
            let lineq = Lineq::new(l, n).unwrap();
            let mut rdm = Tpm::new(l, n);
            lineq.feasible_init(&mut rdm);

            let expected = (n * (n - 1)) as f64 / 2.0;
            assert!(
                (rdm.trace() - expected).abs() < 1e-10,
                "L={} N={}: trace {} != {}",
                l,
                n,
                rdm.trace(),
                expected
            );
            assert!((rdm.pair_trace() - n as f64 / 2.0).abs() < 1e-12);
            assert!(lineq.violation(&rdm) < 1e-10, "L={} N={}", l, n);
            assert!(rdm.spin_squared().abs() < 1e-10);
        }
    }
}

#[test]
fn test_feasible_init_one_rdm_is_uniform() {
    let lineq = Lineq::new(6, 4).unwrap();
    let mut rdm = Tpm::new(6, 4);
    lineq.feasible_init(&mut rdm);

    let occupations = rdm.one_rdm();
    for &occ in occupations.iter() {
        assert!((occ - 4.0 / 12.0).abs() < 1e-12);
    }
}

#[test]
fn test_projection_lands_in_tangent_space() {
    let mut rng = StdRng::seed_from_u64(7);
    let lineq = Lineq::new(5, 4).unwrap();
    let mut x = random_tpm(5, 4, &mut rng);

    lineq.project(&mut x);
    for (constraint, _) in lineq.constraints() {
        assert!(constraint.dot(&x).abs() < 1e-10);
    }

    let before = x.clone();
    lineq.project(&mut x);
    assert!(x.max_abs_diff(&before) < 1e-12, "projection is idempotent");
}

#[test]
fn test_projection_keeps_feasibility() {
    let mut rng = StdRng::seed_from_u64(11);
    let lineq = Lineq::new(4, 4).unwrap();
    let mut rdm = Tpm::new(4, 4);
    lineq.feasible_init(&mut rdm);

    let mut step = random_tpm(4, 4, &mut rng);
    lineq.project(&mut step);
    rdm.axpy(0.01, &step);

    assert!(lineq.violation(&rdm) < 1e-10);
}

#[test]
fn test_orthonormal_basis() {
    let lineq = Lineq::new(4, 6).unwrap();
    let basis: Vec<&Tpm> = lineq.orthonormal().map(|(tpm, _)| tpm).collect();
    for (i, a) in basis.iter().enumerate() {
        for (j, b) in basis.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((a.dot(b) - expected).abs() < 1e-10);
        }
    }
}

#[test]
fn test_pinned_blocks_drop_dependent_constraints() {
    // one pair in three orbitals: trace plus the three pinned products
    assert!(products_pinned(3, 2));
    assert!(!hole_products_pinned(3, 2));
    let lineq = Lineq::new(3, 2).unwrap();
    assert_eq!(lineq.num_constraints(), 7);
    assert_eq!(lineq.num_independent(), 4);

    // generic case: trace and one contraction per orbital
    let lineq = Lineq::new(4, 4).unwrap();
    assert_eq!(lineq.num_constraints(), 5);
    assert_eq!(lineq.num_independent(), 5);

    // one hole pair
    assert!(hole_products_pinned(4, 6));
    let lineq = Lineq::new(4, 6).unwrap();
    assert_eq!(lineq.num_constraints(), 11);
}

#[test]
fn test_invalid_dimensions_are_rejected() {
    assert!(Lineq::new(3, 3).is_err());
    assert!(Lineq::new(2, 4).is_err());
    assert!(Lineq::new(4, 0).is_err());
}
