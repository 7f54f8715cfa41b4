//! Monte Carlo sampling kernel
//!
//! Draws uniform points in [-1, 1)² and counts those inside the unit
//! circle. The batch is split into chunks and sampled in parallel across
//! cores; each chunk seeds its own fast non-crypto RNG from entropy.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

/// Sample `num_points` points and return how many land inside the circle
pub fn count_points_in_circle(num_points: u64) -> u64 {
    if num_points == 0 {
        return 0;
    }

    // A handful of chunks per core keeps all cores busy without making
    // per-chunk RNG setup noticeable.
    let chunks = (num_cpus::get() as u64 * 4).clamp(1, num_points);
    let base = num_points / chunks;
    let remainder = num_points % chunks;

    (0..chunks)
        .into_par_iter()
        .map(|i| {
            let points = base + u64::from(i < remainder);
            sample_chunk(points)
        })
        .sum()
}

/// Sample one chunk with a freshly seeded RNG
fn sample_chunk(num_points: u64) -> u64 {
    let mut rng = Xoshiro256PlusPlus::from_entropy();
    let mut inside = 0u64;

    for _ in 0..num_points {
        let x = rng.gen::<f64>() * 2.0 - 1.0;
        let y = rng.gen::<f64>() * 2.0 - 1.0;
        if x * x + y * y <= 1.0 {
            inside += 1;
        }
    }

    inside
}
