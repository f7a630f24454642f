//! Trigger pacing and interaction intensity.
//!
//! A field's trigger keyword decides two things: how long the orchestrator waits after the
//! field succeeds, and how elaborate the synthetic event sequence for it is. Delays are drawn
//! from fixed bands through an injectable [`RandomSource`] so runs can be replayed with a seed.

pub mod config;
pub mod random;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sheetform_core_types::Trigger;
use tracing::debug;

pub use config::{ConfigError, SynthesisTiming, TempoBundle, TimingConfig};
pub use random::{shuffle, RandomSource, SeededRandom, ThreadRandom};

/// Lower bound for every inter-field delay.
pub const MIN_DELAY_MS: u64 = 50;

/// How much event variety to produce for a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Plain,
    Enhanced,
    MaximumVariance,
}

/// Inclusive millisecond band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingBand {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl TimingBand {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self, rng: &dyn RandomSource) -> u64 {
        delay_in_band(self.min_ms, self.max_ms, rng)
    }

    pub fn contains(&self, ms: u64) -> bool {
        (self.min_ms..=self.max_ms).contains(&ms)
    }
}

pub const NINJA_BAND: TimingBand = TimingBand::new(800, 3500);
pub const FAST_BAND: TimingBand = TimingBand::new(100, 300);
pub const NORMAL_BAND: TimingBand = TimingBand::new(300, 800);
pub const SLOW_BAND: TimingBand = TimingBand::new(800, 1500);
pub const HUMAN_BAND: TimingBand = TimingBand::new(1000, 2000);
pub const STEALTH_BAND: TimingBand = TimingBand::new(1500, 3000);

/// Uniform draw from `[min, max]`.
pub fn delay_in_band(min: u64, max: u64, rng: &dyn RandomSource) -> u64 {
    rng.next_in(min, max)
}

/// Maps triggers to delays and intensities.
#[derive(Clone)]
pub struct TimingPolicy {
    config: TimingConfig,
    rng: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for TimingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

impl TimingPolicy {
    /// Seeded when `config.seed` is set, otherwise backed by the thread RNG.
    pub fn new(config: TimingConfig) -> Self {
        let rng: Arc<dyn RandomSource> = match config.seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        Self { config, rng }
    }

    pub fn with_random(config: TimingConfig, rng: Arc<dyn RandomSource>) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// The random source shared with event synthesis.
    pub fn random(&self) -> Arc<dyn RandomSource> {
        Arc::clone(&self.rng)
    }

    /// Band for keyword triggers; `None` for `DELAY:n`.
    pub fn band_for(trigger: &Trigger) -> Option<TimingBand> {
        match trigger {
            Trigger::Ninja => Some(NINJA_BAND),
            Trigger::Fast => Some(FAST_BAND),
            Trigger::Normal | Trigger::Skip => Some(NORMAL_BAND),
            Trigger::Slow => Some(SLOW_BAND),
            Trigger::Human => Some(HUMAN_BAND),
            Trigger::Stealth => Some(STEALTH_BAND),
            Trigger::Delay(_) => None,
        }
    }

    pub fn delay_for(&self, trigger: &Trigger) -> Duration {
        let ms = match (trigger, Self::band_for(trigger)) {
            (Trigger::Delay(requested), _) => self.explicit_delay(*requested),
            (_, Some(band)) => band.sample(self.rng.as_ref()),
            (_, None) => NORMAL_BAND.sample(self.rng.as_ref()),
        };
        let ms = ms.max(MIN_DELAY_MS);
        debug!(trigger = %trigger, delay_ms = ms, "inter-field delay");
        Duration::from_millis(ms)
    }

    fn explicit_delay(&self, requested: u64) -> u64 {
        let base = requested.max(MIN_DELAY_MS);
        if !self.config.delay_jitter {
            return base;
        }
        let spread = (base as f64 * self.config.jitter_ratio).round() as u64;
        self.rng
            .next_in(base.saturating_sub(spread), base.saturating_add(spread))
    }

    pub fn intensity_for(&self, trigger: &Trigger) -> Intensity {
        match trigger {
            Trigger::Ninja => Intensity::MaximumVariance,
            Trigger::Slow | Trigger::Human | Trigger::Stealth => Intensity::Enhanced,
            Trigger::Fast | Trigger::Normal | Trigger::Delay(_) | Trigger::Skip => {
                Intensity::Plain
            }
        }
    }
}
