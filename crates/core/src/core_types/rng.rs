//! Reproducible random stream for track simulation
//!
//! [`TrackRng`] wraps a counter-based ChaCha8 generator. Every deviate
//! consumes a fixed number of 64-bit draws (one for a uniform, two for a
//! normal), so the number of draws a track can use is bounded and substreams
//! can be placed without overlap by jumping the counter:
//!
//! ```text
//! offset(unit) = cumulative_tracks_before_unit × max_draws_per_track
//! ```
//!
//! Two streams with the same seed and offset produce bit-identical output
//! regardless of what other streams have done.

use rand::distr::Distribution;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;

/// Normal deviates drawn per AR(1) step: pressure rate, bearing, speed,
/// size rate and the landfall decay noise.
pub const NORMALS_PER_STEP: u64 = 5;

/// Draws reserved ahead of the steps of every block for initial-condition
/// sampling.
pub const INIT_DRAWS: u64 = 16;

/// Upper bound on draws consumed by one track of `max_steps` observations
#[must_use]
pub fn max_draws_per_track(max_steps: usize) -> u64 {
    2 * NORMALS_PER_STEP * (max_steps as u64 + 1) + INIT_DRAWS
}

/// Seedable random stream with explicit jump-ahead.
#[derive(Debug, Clone)]
pub struct TrackRng {
    seed: u64,
    rng: ChaCha8Rng,
}

impl TrackRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Fresh stream with the same seed, positioned `draws` from the start
    #[must_use]
    pub fn substream(&self, draws: u64) -> Self {
        let mut s = Self::new(self.seed);
        s.jump_ahead(draws);
        s
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewind to the start of the stream and skip `draws`
    pub fn reseed_at(&mut self, draws: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.jump_ahead(draws);
    }

    /// Advance the stream by `draws` 64-bit outputs without generating them
    pub fn jump_ahead(&mut self, draws: u64) {
        let pos = self.rng.get_word_pos();
        self.rng.set_word_pos(pos + 2 * u128::from(draws));
    }

    /// Number of 64-bit draws consumed since the start of the stream
    #[must_use]
    pub fn position(&self) -> u64 {
        (self.rng.get_word_pos() / 2) as u64
    }

    /// Uniform deviate on [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform deviate on [low, high)
    pub fn uniform_in(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform()
    }

    /// Standard normal deviate (Box-Muller, exactly two draws)
    pub fn normal(&mut self) -> f64 {
        // 1 - u lies in (0, 1] so the log is finite
        let u1 = 1.0 - self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Sample any `rand` distribution from this stream.
    ///
    /// Draw counts are not fixed for arbitrary distributions, so this is kept
    /// for streams that are never jumped (cyclone counts).
    pub fn sample<T, D: Distribution<T>>(&mut self, dist: &D) -> T {
        dist.sample(&mut self.rng)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}
