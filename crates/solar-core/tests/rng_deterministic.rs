use rand::RngCore;
use solar_core::{RngHandle, Seed};

#[test]
fn seeded_handles_emit_identical_streams() {
    let mut rng_a = RngHandle::from_seed(Seed::new(42));
    let mut rng_b = RngHandle::from_seed(Seed::new(42));
    assert!(rng_a.is_seeded());

    let seq_a: Vec<u64> = (0..100).map(|_| rng_a.next_u64()).collect();
    let seq_b: Vec<u64> = (0..100).map(|_| rng_b.next_u64()).collect();

    assert_eq!(seq_a, seq_b);
}

#[test]
fn different_seeds_diverge() {
    let mut rng_a = RngHandle::from_seed(Seed::new(1));
    let mut rng_b = RngHandle::from_seed(Seed::new(2));
    let seq_a: Vec<u64> = (0..8).map(|_| rng_a.next_u64()).collect();
    let seq_b: Vec<u64> = (0..8).map(|_| rng_b.next_u64()).collect();
    assert_ne!(seq_a, seq_b);
}

#[test]
fn absent_seed_is_flagged_unseeded() {
    let rng = RngHandle::from_seed(Seed::none());
    assert!(!rng.is_seeded());
}
