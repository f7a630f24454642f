//! Pauses between synthetic events

use std::sync::Arc;
use std::time::Duration;

use stealth::{Intensity, RandomSource, SynthesisTiming};

/// Draws step and micro pauses from [`SynthesisTiming`].
#[derive(Clone)]
pub struct Pacer {
    timing: SynthesisTiming,
    rng: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl Pacer {
    pub fn new(timing: SynthesisTiming, rng: Arc<dyn RandomSource>) -> Self {
        Self { timing, rng }
    }

    pub fn timing(&self) -> &SynthesisTiming {
        &self.timing
    }

    pub fn random(&self) -> &dyn RandomSource {
        self.rng.as_ref()
    }

    /// Pause between two sequence steps.
    pub fn step_ms(&self, intensity: Intensity) -> u64 {
        match intensity {
            Intensity::Plain => self.timing.plain_step_ms,
            Intensity::Enhanced | Intensity::MaximumVariance => self
                .rng
                .next_in(self.timing.enhanced_min_ms, self.timing.enhanced_max_ms),
        }
    }

    /// Short pause inside an event storm.
    pub fn micro_ms(&self) -> u64 {
        self.rng
            .next_in(self.timing.micro_min_ms, self.timing.micro_max_ms)
    }

    pub async fn step(&self, intensity: Intensity) {
        sleep_ms(self.step_ms(intensity)).await;
    }

    pub async fn micro(&self) {
        sleep_ms(self.micro_ms()).await;
    }
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth::SeededRandom;

    #[test]
    fn test_step_bands() {
        let pacer = Pacer::new(SynthesisTiming::default(), Arc::new(SeededRandom::new(3)));
        assert_eq!(pacer.step_ms(Intensity::Plain), 10);
        for _ in 0..50 {
            let enhanced = pacer.step_ms(Intensity::Enhanced);
            assert!((30..=150).contains(&enhanced));
            let micro = pacer.micro_ms();
            assert!((1..=25).contains(&micro));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_timing_never_sleeps() {
        let pacer = Pacer::new(SynthesisTiming::instant(), Arc::new(SeededRandom::new(3)));
        let started = tokio::time::Instant::now();
        pacer.step(Intensity::Enhanced).await;
        pacer.micro().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
