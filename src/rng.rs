//! Park-Miller linear congruential generator
//!
//! The fractal generator's determinism contract is defined in terms of this
//! exact recurrence (`seed' = 16807 * seed mod (2^31 - 1)`), so it is
//! implemented here rather than borrowed from the `rand` crate. Generators
//! that are allowed to be stochastic use `rand` instead.

const MULTIPLIER: u64 = 16807;
const MODULUS: u64 = 2_147_483_647; // 2^31 - 1

/// Minimal-standard Park-Miller PRNG
#[derive(Debug, Clone)]
pub struct ParkMiller {
    state: u32,
}

impl ParkMiller {
    /// Seed the generator. Zero (and multiples of the modulus) would make
    /// the recurrence degenerate, so they map to 1.
    pub fn new(seed: u32) -> Self {
        let seed = seed as u64 % MODULUS;
        Self {
            state: if seed == 0 { 1 } else { seed as u32 },
        }
    }

    /// Next raw value in [1, 2^31 - 2]
    pub fn next_u32(&mut self) -> u32 {
        self.state = ((self.state as u64 * MULTIPLIER) % MODULUS) as u32;
        self.state
    }

    /// Next value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u32() - 1) as f64 / (MODULUS - 1) as f64
    }

    /// Next value in [-1, 1)
    pub fn next_bipolar(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
