//! Closed keyword vocabularies: locator kinds, action keywords and triggers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy selector for a locator string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    Id,
    Name,
    Class,
    Css,
    Text,
    Placeholder,
    Label,
    XPath,
    Auto,
}

impl LocatorKind {
    /// Parse a raw kind cell. Unknown kinds fall back to raw CSS.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "id" => LocatorKind::Id,
            "name" => LocatorKind::Name,
            "class" => LocatorKind::Class,
            "css" | "selector" => LocatorKind::Css,
            "text" => LocatorKind::Text,
            "placeholder" => LocatorKind::Placeholder,
            "label" => LocatorKind::Label,
            "xpath" => LocatorKind::XPath,
            "" | "auto" | "smart" => LocatorKind::Auto,
            other => {
                tracing::debug!(kind = other, "unknown locator kind, treating as css");
                LocatorKind::Css
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::Class => "class",
            LocatorKind::Css => "css",
            LocatorKind::Text => "text",
            LocatorKind::Placeholder => "placeholder",
            LocatorKind::Label => "label",
            LocatorKind::XPath => "xpath",
            LocatorKind::Auto => "auto",
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a resolved element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldAction {
    Click,
    Check,
    Uncheck,
    Clear,
    Focus,
    SetValue(String),
}

impl FieldAction {
    /// Reserved keywords are matched case-insensitively on the trimmed value;
    /// anything else is assigned verbatim.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CLICK" => FieldAction::Click,
            "CHECK" => FieldAction::Check,
            "UNCHECK" => FieldAction::Uncheck,
            "CLEAR" => FieldAction::Clear,
            "FOCUS" => FieldAction::Focus,
            _ => FieldAction::SetValue(value.to_string()),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            FieldAction::Click => "CLICK",
            FieldAction::Check => "CHECK",
            FieldAction::Uncheck => "UNCHECK",
            FieldAction::Clear => "CLEAR",
            FieldAction::Focus => "FOCUS",
            FieldAction::SetValue(_) => "VALUE",
        }
    }
}

/// Timing/behaviour keyword attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    Ninja,
    Fast,
    Normal,
    Slow,
    Human,
    Stealth,
    Delay(u64),
    Skip,
}

/// Delay used when a `DELAY:` suffix does not parse.
pub const DEFAULT_EXPLICIT_DELAY_MS: u64 = 500;

const SKIP_KEYWORDS: [&str; 5] = ["OFF", "SKIP", "DISABLED", "NO", "FALSE"];

impl Trigger {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Trigger::Normal;
        };
        let keyword = raw.trim().to_ascii_uppercase();
        if SKIP_KEYWORDS.contains(&keyword.as_str()) {
            return Trigger::Skip;
        }
        match keyword.as_str() {
            "" | "NORMAL" => Trigger::Normal,
            "NINJA" => Trigger::Ninja,
            "FAST" => Trigger::Fast,
            "SLOW" => Trigger::Slow,
            "HUMAN" => Trigger::Human,
            "STEALTH" => Trigger::Stealth,
            other => match other.strip_prefix("DELAY:") {
                Some(ms) => Trigger::Delay(
                    ms.trim()
                        .parse::<u64>()
                        .unwrap_or(DEFAULT_EXPLICIT_DELAY_MS),
                ),
                None => {
                    tracing::debug!(trigger = other, "unknown trigger, using NORMAL pacing");
                    Trigger::Normal
                }
            },
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Trigger::Skip)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Ninja => f.write_str("NINJA"),
            Trigger::Fast => f.write_str("FAST"),
            Trigger::Normal => f.write_str("NORMAL"),
            Trigger::Slow => f.write_str("SLOW"),
            Trigger::Human => f.write_str("HUMAN"),
            Trigger::Stealth => f.write_str("STEALTH"),
            Trigger::Delay(ms) => write!(f, "DELAY:{ms}"),
            Trigger::Skip => f.write_str("SKIP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_kind_aliases() {
        assert_eq!(LocatorKind::parse("ID"), LocatorKind::Id);
        assert_eq!(LocatorKind::parse(" selector "), LocatorKind::Css);
        assert_eq!(LocatorKind::parse("smart"), LocatorKind::Auto);
        assert_eq!(LocatorKind::parse("XPath"), LocatorKind::XPath);
        assert_eq!(LocatorKind::parse("data-testid"), LocatorKind::Css);
    }

    #[test]
    fn action_keywords_are_case_insensitive() {
        assert_eq!(FieldAction::parse(" check "), FieldAction::Check);
        assert_eq!(FieldAction::parse("Click"), FieldAction::Click);
        assert_eq!(
            FieldAction::parse("checked out"),
            FieldAction::SetValue("checked out".into())
        );
    }

    #[test]
    fn literal_values_keep_whitespace() {
        assert_eq!(
            FieldAction::parse("  padded  "),
            FieldAction::SetValue("  padded  ".into())
        );
    }

    #[test]
    fn trigger_parsing() {
        assert_eq!(Trigger::parse(None), Trigger::Normal);
        assert_eq!(Trigger::parse(Some("")), Trigger::Normal);
        assert_eq!(Trigger::parse(Some("ninja")), Trigger::Ninja);
        assert_eq!(Trigger::parse(Some("delay:1200")), Trigger::Delay(1200));
        assert_eq!(Trigger::parse(Some("DELAY:abc")), Trigger::Delay(500));
        assert_eq!(Trigger::parse(Some("whenever")), Trigger::Normal);
        for skip in ["off", "SKIP", "Disabled", "no", "false"] {
            assert!(Trigger::parse(Some(skip)).is_skip(), "{skip}");
        }
    }
}
