//! Field instruction rows and their eligibility rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keywords::{FieldAction, LocatorKind, Trigger};

/// One row of instruction, as produced by the data-source collaborator.
///
/// The wire names follow the spreadsheet export (`fieldName`, `locator`,
/// `locatorKind`, `value`, `trigger`); the older `selector`/`selectorType`
/// names are accepted as aliases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub field_name: String,
    #[serde(default, alias = "selector")]
    pub locator: String,
    #[serde(default, alias = "selectorType")]
    pub locator_kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// Why a field was excluded before resolution. Exclusions are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("skipped by trigger '{0}'")]
    SkippedByTrigger(String),
}

impl SkipReason {
    pub fn is_invalid(&self) -> bool {
        matches!(self, SkipReason::InvalidField(_))
    }
}

// Spreadsheet metadata that sometimes leaks into the locator column.
static METADATA_LOCATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\d+\.\d+\s*(KB|MB|GB)$",
        r"(?i)^My Drive$",
        r"(?i)^Folder$",
        r"(?i)^File$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

impl FieldDescriptor {
    pub fn new(
        field_name: impl Into<String>,
        locator: impl Into<String>,
        locator_kind: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            locator: locator.into(),
            locator_kind: locator_kind.into(),
            value: value.into(),
            trigger: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn kind(&self) -> LocatorKind {
        LocatorKind::parse(&self.locator_kind)
    }

    pub fn action(&self) -> FieldAction {
        FieldAction::parse(&self.value)
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::parse(self.trigger.as_deref())
    }

    /// Shape check followed by the skip-trigger rule.
    pub fn eligibility(&self) -> Result<(), SkipReason> {
        let locator = self.locator.trim();
        if locator.is_empty() {
            return Err(SkipReason::InvalidField("missing locator".into()));
        }
        if self.locator_kind.trim().is_empty() {
            return Err(SkipReason::InvalidField("missing locator kind".into()));
        }
        if METADATA_LOCATORS.iter().any(|re| re.is_match(locator)) {
            return Err(SkipReason::InvalidField(format!(
                "locator '{locator}' looks like spreadsheet metadata"
            )));
        }
        if self.trigger().is_skip() {
            return Err(SkipReason::SkippedByTrigger(
                self.trigger.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}
