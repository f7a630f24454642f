//! Injectable randomness so timing and event variety can be reproduced.

use parking_lot::Mutex;
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[min, max]`. Bounds may be given in either order.
    fn next_in(&self, min: u64, max: u64) -> u64;

    /// `true` with probability `p` (clamped to `[0, 1]`).
    fn chance(&self, p: f64) -> bool;
}

/// Fisher–Yates shuffle driven by a [`RandomSource`].
pub fn shuffle<T>(rng: &dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.next_in(0, i as u64) as usize;
        items.swap(i, j);
    }
}

fn ordered(min: u64, max: u64) -> (u64, u64) {
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

/// Per-thread OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_in(&self, min: u64, max: u64) -> u64 {
        let (lo, hi) = ordered(min, max);
        thread_rng().gen_range(lo..=hi)
    }

    fn chance(&self, p: f64) -> bool {
        thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Deterministic generator for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_in(&self, min: u64, max: u64) -> u64 {
        let (lo, hi) = ordered(min, max);
        self.rng.lock().gen_range(lo..=hi)
    }

    fn chance(&self, p: f64) -> bool {
        self.rng.lock().gen_bool(p.clamp(0.0, 1.0))
    }
}
