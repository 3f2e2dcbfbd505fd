//! Injectable randomness for anti-burn-in effects.
//!
//! Static dither patterns and icons drawn at exactly the same spot every cycle
//! leave ghosts on e-ink panels. The few places that deliberately vary their
//! output take a [`Jitter`] instead of reaching for an ambient RNG, so tests can
//! switch it off or seed it.

use rand_xoshiro::rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoroshiro128StarStar;

/// Source of small random offsets and coin flips.
#[derive(Clone, Debug)]
pub enum Jitter {
    /// Always zero / `false`: fully deterministic output.
    Off,
    Random(Xoroshiro128StarStar),
}

impl Jitter {
    /// Seed from OS entropy, falling back to the clock if entropy is unavailable.
    pub fn from_entropy() -> Self {
        let seed = getrandom::u64().unwrap_or_else(|err| {
            tracing::warn!(%err, "OS entropy unavailable, seeding jitter from clock");
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
        });
        Self::seeded(seed)
    }

    pub fn seeded(seed: u64) -> Self {
        Jitter::Random(Xoroshiro128StarStar::seed_from_u64(seed))
    }

    /// Uniform offset in `0..max` (always 0 when off or `max == 0`).
    pub fn offset(&mut self, max: u32) -> u32 {
        match self {
            Jitter::Off => 0,
            Jitter::Random(_) if max == 0 => 0,
            Jitter::Random(rng) => rng.next_u32() % max,
        }
    }

    pub fn coin(&mut self) -> bool {
        match self {
            Jitter::Off => false,
            Jitter::Random(rng) => rng.next_u32() & 1 == 1,
        }
    }
}
