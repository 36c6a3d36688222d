use super::{IntegralSource, Integrals};

#[test]
fn test_symmetric_two_body_fills_all_partners() {
    let mut integrals = Integrals::new(4, 2, 0.0);
    integrals.set_two_body_symmetric(0, 1, 2, 3, 0.25);

    for (p, q, r, s) in [
        (0, 1, 2, 3),
        (1, 0, 3, 2),
        (2, 3, 0, 1),
        (3, 2, 1, 0),
        (2, 1, 0, 3),
        (0, 3, 2, 1),
        (3, 0, 1, 2),
        (1, 2, 3, 0),
    ] {
        assert_eq!(integrals.two_body(p, q, r, s), 0.25);
    }
    // (02|13) in chemist notation is a different integral
    assert_eq!(integrals.two_body(0, 2, 1, 3), 0.0);
}

#[test]
fn test_pairing_model_only_sets_pair_transfer() {
    let integrals = Integrals::pairing(&[0.0, 1.0, 2.0], 0.5, 2);

    assert_eq!(integrals.num_orbitals(), 3);
    assert_eq!(integrals.num_electrons(), 2);
    assert_eq!(integrals.nuclear_repulsion(), 0.0);
    assert_eq!(integrals.one_body(1, 1), 1.0);
    assert_eq!(integrals.one_body(0, 1), 0.0);
    assert_eq!(integrals.two_body(0, 0, 2, 2), -0.5);
    assert_eq!(integrals.two_body(1, 1, 1, 1), -0.5);
    // exchange-type partners stay zero
    assert_eq!(integrals.two_body(0, 2, 2, 0), 0.0);
    assert_eq!(integrals.two_body(0, 2, 0, 2), 0.0);
}

#[test]
fn test_one_body_is_symmetric() {
    let mut integrals = Integrals::new(3, 2, 1.5);
    integrals.set_one_body(0, 2, -0.3);
    assert_eq!(integrals.one_body(2, 0), -0.3);
    assert_eq!(integrals.nuclear_repulsion(), 1.5);
}
