//! Configuration for trigger pacing and event tempo.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize timing config: {0}")]
    Deserialize(String),
    #[error("invalid timing config: {0}")]
    Invalid(String),
}

/// Inter-field delay settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Apply jitter to explicit `DELAY:n` triggers.
    #[serde(default)]
    pub delay_jitter: bool,
    /// Relative jitter for `DELAY:n`, e.g. `0.3` for ±30 %.
    #[serde(default = "TimingConfig::default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Fixed seed for reproducible runs; a thread RNG is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TimingConfig {
    fn default_jitter_ratio() -> f64 {
        0.3
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::Invalid(format!(
                "jitter_ratio must be in [0, 1), got {}",
                self.jitter_ratio
            )));
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            delay_jitter: false,
            jitter_ratio: Self::default_jitter_ratio(),
            seed: None,
        }
    }
}

/// Pauses used between synthetic events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisTiming {
    /// Fixed pause between plain-tier steps.
    #[serde(default = "SynthesisTiming::default_plain_step_ms")]
    pub plain_step_ms: u64,
    #[serde(default = "SynthesisTiming::default_enhanced_min_ms")]
    pub enhanced_min_ms: u64,
    #[serde(default = "SynthesisTiming::default_enhanced_max_ms")]
    pub enhanced_max_ms: u64,
    #[serde(default = "SynthesisTiming::default_micro_min_ms")]
    pub micro_min_ms: u64,
    #[serde(default = "SynthesisTiming::default_micro_max_ms")]
    pub micro_max_ms: u64,
    /// Probability of a decoy pointer interaction in the maximum-variance tier.
    #[serde(default = "SynthesisTiming::default_decoy_probability")]
    pub decoy_probability: f64,
}

impl SynthesisTiming {
    fn default_plain_step_ms() -> u64 {
        10
    }

    fn default_enhanced_min_ms() -> u64 {
        30
    }

    fn default_enhanced_max_ms() -> u64 {
        150
    }

    fn default_micro_min_ms() -> u64 {
        1
    }

    fn default_micro_max_ms() -> u64 {
        25
    }

    fn default_decoy_probability() -> f64 {
        0.3
    }

    /// No pauses at all; useful for deterministic tests.
    pub fn instant() -> Self {
        Self {
            plain_step_ms: 0,
            enhanced_min_ms: 0,
            enhanced_max_ms: 0,
            micro_min_ms: 0,
            micro_max_ms: 0,
            decoy_probability: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enhanced_min_ms > self.enhanced_max_ms {
            return Err(ConfigError::Invalid(
                "enhanced_min_ms exceeds enhanced_max_ms".into(),
            ));
        }
        if self.micro_min_ms > self.micro_max_ms {
            return Err(ConfigError::Invalid(
                "micro_min_ms exceeds micro_max_ms".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.decoy_probability) {
            return Err(ConfigError::Invalid(
                "decoy_probability must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SynthesisTiming {
    fn default() -> Self {
        Self {
            plain_step_ms: Self::default_plain_step_ms(),
            enhanced_min_ms: Self::default_enhanced_min_ms(),
            enhanced_max_ms: Self::default_enhanced_max_ms(),
            micro_min_ms: Self::default_micro_min_ms(),
            micro_max_ms: Self::default_micro_max_ms(),
            decoy_probability: Self::default_decoy_probability(),
        }
    }
}

/// Standalone tempo file: `timing` and `synthesis` sections, JSON or YAML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TempoBundle {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub synthesis: SynthesisTiming,
}

pub fn load_bundle_from_reader<R: Read>(mut reader: R) -> Result<TempoBundle, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_bundle_str(&buf)
}

pub fn load_bundle_from_path(path: impl AsRef<Path>) -> Result<TempoBundle, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_bundle_from_reader(file)
}

pub fn parse_bundle_str(raw: &str) -> Result<TempoBundle, ConfigError> {
    let bundle: TempoBundle = match serde_json::from_str(raw) {
        Ok(bundle) => bundle,
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        })?,
    };
    bundle.timing.validate()?;
    bundle.synthesis.validate()?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_bundle_with_partial_sections() {
        let bundle = parse_bundle_str("timing:\n  delay_jitter: true\n  seed: 7\n").unwrap();
        assert!(bundle.timing.delay_jitter);
        assert_eq!(bundle.timing.seed, Some(7));
        assert_eq!(bundle.synthesis, SynthesisTiming::default());
    }

    #[test]
    fn json_bundle_is_accepted() {
        let bundle = parse_bundle_str(r#"{"synthesis":{"micro_max_ms":40}}"#).unwrap();
        assert_eq!(bundle.synthesis.micro_max_ms, 40);
        assert_eq!(bundle.synthesis.micro_min_ms, 1);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let err = parse_bundle_str("synthesis:\n  enhanced_min_ms: 200\n  enhanced_max_ms: 100\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
