//! Core types for locator system

use dom_adapter::ElementHandle;
use serde::{Deserialize, Serialize};
use sheetform_core_types::LocatorKind;

/// Retry and search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Lookups per field before giving up
    #[serde(default = "ResolverConfig::default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts
    #[serde(default = "ResolverConfig::default_retry_pause_ms")]
    pub retry_pause_ms: u64,

    /// Also search same-origin frames (browser backend only)
    #[serde(default)]
    pub search_frames: bool,
}

impl ResolverConfig {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_retry_pause_ms() -> u64 {
        500
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            retry_pause_ms: Self::default_retry_pause_ms(),
            search_frames: false,
        }
    }
}

/// One step of the `auto` chain
///
/// Steps run in the order of [`AutoStep::chain`]; the first one that yields an element wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoStep {
    Id,
    Name,
    CssId,
    Class,
    PlaceholderExact,
    PlaceholderContains,
    ValueExact,
    TitleExact,
    Text,
    Label,
    ClassContains,
    IdContains,
    NameContains,
    RawCss,
}

impl AutoStep {
    /// Get step name as string
    pub fn name(&self) -> &'static str {
        match self {
            AutoStep::Id => "id",
            AutoStep::Name => "name",
            AutoStep::CssId => "css-id",
            AutoStep::Class => "class",
            AutoStep::PlaceholderExact => "placeholder",
            AutoStep::PlaceholderContains => "placeholder-contains",
            AutoStep::ValueExact => "value",
            AutoStep::TitleExact => "title",
            AutoStep::Text => "text",
            AutoStep::Label => "label",
            AutoStep::ClassContains => "class-contains",
            AutoStep::IdContains => "id-contains",
            AutoStep::NameContains => "name-contains",
            AutoStep::RawCss => "raw-css",
        }
    }

    /// All steps in evaluation order
    pub const fn chain() -> [AutoStep; 14] {
        [
            AutoStep::Id,
            AutoStep::Name,
            AutoStep::CssId,
            AutoStep::Class,
            AutoStep::PlaceholderExact,
            AutoStep::PlaceholderContains,
            AutoStep::ValueExact,
            AutoStep::TitleExact,
            AutoStep::Text,
            AutoStep::Label,
            AutoStep::ClassContains,
            AutoStep::IdContains,
            AutoStep::NameContains,
            AutoStep::RawCss,
        ]
    }
}

/// Strategy output: the element plus how it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub element: ElementHandle,
    /// `auto` step that matched; `None` for explicit kinds
    pub step: Option<AutoStep>,
}

impl Located {
    pub fn direct(element: ElementHandle) -> Self {
        Self {
            element,
            step: None,
        }
    }
}

/// Resolver result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub element: ElementHandle,
    pub kind: LocatorKind,
    pub step: Option<AutoStep>,
    /// 1-based attempt that succeeded
    pub attempt: u32,
}
