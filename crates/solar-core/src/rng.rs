//! Seeded RNG wrapper used by every randomized dataset operation.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::dims::Seed;

/// Deterministic RNG handle exposed to sweep consumers.
///
/// A present seed always yields the same `StdRng` stream, which is what makes
/// splits and combo compositions reproducible bit-for-bit. An absent seed
/// means the caller opted out of reproducibility; the stream is then drawn
/// from OS entropy.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
    seeded: bool,
}

impl RngHandle {
    /// Creates a new RNG handle from a sweep seed.
    pub fn from_seed(seed: Seed) -> Self {
        match seed.value() {
            Some(raw) => Self {
                rng: StdRng::seed_from_u64(raw),
                seeded: true,
            },
            None => Self {
                rng: StdRng::from_entropy(),
                seeded: false,
            },
        }
    }

    /// Returns true when the stream is reproducible.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
