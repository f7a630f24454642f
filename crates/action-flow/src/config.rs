//! Engine configuration
//!
//! Every field is defaulted, so an empty document is a valid configuration.

use action_locator::ResolverConfig;
use serde::{Deserialize, Serialize};
use stealth::{ConfigError, SynthesisTiming, TimingConfig};

/// Element preparation before an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareConfig {
    #[serde(default = "default_true")]
    pub scroll_into_view: bool,

    /// Pause after scrolling
    #[serde(default = "PrepareConfig::default_settle_ms")]
    pub settle_ms: u64,

    /// Drop an inline `display: none`
    #[serde(default = "default_true")]
    pub reveal_hidden: bool,

    /// Remove the `disabled` attribute
    #[serde(default = "default_true")]
    pub enable_disabled: bool,

    /// Set `tabindex=0` on elements that are not focusable
    #[serde(default = "default_true")]
    pub make_focusable: bool,
}

impl PrepareConfig {
    fn default_settle_ms() -> u64 {
        200
    }

    pub fn is_noop(&self) -> bool {
        !(self.scroll_into_view || self.reveal_hidden || self.enable_disabled || self.make_focusable)
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            scroll_into_view: true,
            settle_ms: Self::default_settle_ms(),
            reveal_hidden: true,
            enable_disabled: true,
            make_focusable: true,
        }
    }
}

/// Visual feedback on the element being filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time before the previous styles are restored
    #[serde(default = "HighlightConfig::default_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "HighlightConfig::default_border")]
    pub border: String,

    #[serde(default = "HighlightConfig::default_background")]
    pub background: String,
}

impl HighlightConfig {
    fn default_duration_ms() -> u64 {
        2000
    }

    fn default_border() -> String {
        "3px solid #4CAF50".to_string()
    }

    fn default_background() -> String {
        "rgba(76, 175, 80, 0.2)".to_string()
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: Self::default_duration_ms(),
            border: Self::default_border(),
            background: Self::default_background(),
        }
    }
}

/// Top-level configuration for one orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub synthesis: SynthesisTiming,

    #[serde(default)]
    pub prepare: PrepareConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,

    /// Report a toggle that did not take as `StateNotChanged` instead of a warning
    #[serde(default)]
    pub strict_toggle_verification: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_attempts must be at least 1".into(),
            ));
        }
        self.timing.validate()?;
        self.synthesis.validate()?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
