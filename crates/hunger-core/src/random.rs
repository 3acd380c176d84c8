//! Random sources for the starting page of a filter generation.

use rand::Rng;

use crate::traits::RandomSource;

/// Uniform start page drawn from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn start_page(&self, ceiling: u32) -> u32 {
        rand::thread_rng().gen_range(1..=ceiling.max(1))
    }
}

/// Always returns the same start page (clamped into `1..=ceiling`).
#[derive(Debug, Clone, Copy)]
pub struct FixedStartPage(pub u32);

impl RandomSource for FixedStartPage {
    fn start_page(&self, ceiling: u32) -> u32 {
        self.0.clamp(1, ceiling.max(1))
    }
}
