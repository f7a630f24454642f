use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DomError;

/// Opaque reference to an element owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Read-only snapshot of an element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    /// Lowercased `type` attribute for `<input>`; `None` elsewhere.
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub text_content: String,
    /// True when some child element carries non-whitespace text.
    pub has_text_children: bool,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
}

impl ElementInfo {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_checkable(&self) -> bool {
        self.tag == "input" && matches!(self.input_type.as_deref(), Some("checkbox" | "radio"))
    }

    /// Whether a dispatched `click` runs a default action: toggling, submitting,
    /// navigating, or forwarding the click to a labelled control.
    pub fn has_click_activation(&self) -> bool {
        match self.tag.as_str() {
            "input" => matches!(
                self.input_type.as_deref(),
                Some("checkbox" | "radio" | "submit" | "reset" | "image" | "button" | "file")
            ),
            "button" | "summary" | "label" => true,
            "a" | "area" => self.attribute("href").is_some(),
            _ => false,
        }
    }

    pub fn is_file_input(&self) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some("file")
    }

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea")
    }

    pub fn tab_index(&self) -> Option<i32> {
        self.attribute("tabindex")
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// `tabIndex` as a browser reports it: the attribute when present, otherwise 0 for
    /// natively focusable tags and -1 for everything else.
    pub fn effective_tab_index(&self) -> i32 {
        self.tab_index().unwrap_or_else(|| {
            let native = self.is_form_control()
                || self.tag == "button"
                || (self.tag == "a" && self.attribute("href").is_some());
            if native {
                0
            } else {
                -1
            }
        })
    }

    /// Value of `display` in the inline style attribute, if any.
    pub fn inline_display(&self) -> Option<String> {
        self.attribute("style").and_then(|style| {
            style.split(';').find_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                (prop.trim().eq_ignore_ascii_case("display"))
                    .then(|| value.trim().to_ascii_lowercase())
            })
        })
    }

    pub fn describe_short(&self) -> String {
        match (&self.id, self.attribute("name")) {
            (Some(id), _) => format!("<{} id={}>", self.tag, id),
            (None, Some(name)) => format!("<{} name={}>", self.tag, name),
            _ => format!("<{}>", self.tag),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PointerOver,
    PointerEnter,
    PointerDown,
    PointerUp,
    MouseOver,
    MouseEnter,
    MouseMove,
    MouseDown,
    MouseUp,
    Click,
    Focus,
    FocusIn,
    Blur,
    FocusOut,
    KeyDown,
    KeyPress,
    KeyUp,
    Input,
    Change,
    Paste,
}

impl EventKind {
    /// DOM event type name.
    pub fn dom_name(&self) -> &'static str {
        match self {
            EventKind::PointerOver => "pointerover",
            EventKind::PointerEnter => "pointerenter",
            EventKind::PointerDown => "pointerdown",
            EventKind::PointerUp => "pointerup",
            EventKind::MouseOver => "mouseover",
            EventKind::MouseEnter => "mouseenter",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseUp => "mouseup",
            EventKind::Click => "click",
            EventKind::Focus => "focus",
            EventKind::FocusIn => "focusin",
            EventKind::Blur => "blur",
            EventKind::FocusOut => "focusout",
            EventKind::KeyDown => "keydown",
            EventKind::KeyPress => "keypress",
            EventKind::KeyUp => "keyup",
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Paste => "paste",
        }
    }

    /// Constructor family used by browser backends.
    pub fn interface(&self) -> &'static str {
        match self {
            EventKind::PointerOver
            | EventKind::PointerEnter
            | EventKind::PointerDown
            | EventKind::PointerUp => "PointerEvent",
            EventKind::MouseOver
            | EventKind::MouseEnter
            | EventKind::MouseMove
            | EventKind::MouseDown
            | EventKind::MouseUp
            | EventKind::Click => "MouseEvent",
            EventKind::Focus | EventKind::FocusIn | EventKind::Blur | EventKind::FocusOut => {
                "FocusEvent"
            }
            EventKind::KeyDown | EventKind::KeyPress | EventKind::KeyUp => "KeyboardEvent",
            EventKind::Input => "InputEvent",
            EventKind::Change => "Event",
            EventKind::Paste => "ClipboardEvent",
        }
    }

    /// `focus`, `blur`, `mouseenter` and `pointerenter` do not bubble.
    pub fn bubbles(&self) -> bool {
        !matches!(
            self,
            EventKind::Focus | EventKind::Blur | EventKind::MouseEnter | EventKind::PointerEnter
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_name())
    }
}

/// A synthetic event to dispatch on an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyntheticEvent {
    pub kind: EventKind,
    /// `key` for keyboard events.
    pub key: Option<String>,
    /// `data` for input events.
    pub data: Option<String>,
    /// Client offset from the element's top-left corner, for pointer events.
    pub offset: Option<(f64, f64)>,
}

impl SyntheticEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            key: None,
            data: None,
            offset: None,
        }
    }

    pub fn key(kind: EventKind, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(kind)
        }
    }

    pub fn input_text(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::new(EventKind::Input)
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.offset = Some((x, y));
        self
    }
}

impl From<EventKind> for SyntheticEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

/// The only way the engine touches a page.
///
/// Query operations never mutate the page. Handles may go stale when the page changes
/// underneath; backends report that as [`DomError::StaleElement`].
#[async_trait]
pub trait DomPort: Send + Sync {
    async fn element_by_id(&self, id: &str) -> Result<Option<ElementHandle>, DomError>;

    async fn query_selector(&self, css: &str) -> Result<Option<ElementHandle>, DomError>;

    async fn query_selector_all(&self, css: &str) -> Result<Vec<ElementHandle>, DomError>;

    async fn query_selector_within(
        &self,
        root: ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, DomError>;

    /// First element node produced by the expression, in document order.
    async fn evaluate_xpath(&self, expression: &str) -> Result<Option<ElementHandle>, DomError>;

    async fn describe(&self, el: ElementHandle) -> Result<ElementInfo, DomError>;

    /// Every match of `css` with its snapshot, in document order.
    ///
    /// Remote backends override this to answer in one round trip.
    async fn describe_all(
        &self,
        css: &str,
    ) -> Result<Vec<(ElementHandle, ElementInfo)>, DomError> {
        let mut out = Vec::new();
        for el in self.query_selector_all(css).await? {
            out.push((el, self.describe(el).await?));
        }
        Ok(out)
    }

    async fn next_element_sibling(
        &self,
        el: ElementHandle,
    ) -> Result<Option<ElementHandle>, DomError>;

    async fn focus(&self, el: ElementHandle) -> Result<(), DomError>;

    async fn blur(&self, el: ElementHandle) -> Result<(), DomError>;

    async fn select_text(&self, el: ElementHandle) -> Result<(), DomError>;

    async fn set_value(&self, el: ElementHandle, value: &str) -> Result<(), DomError>;

    async fn dispatch(&self, el: ElementHandle, event: SyntheticEvent) -> Result<(), DomError>;

    async fn scroll_into_view(&self, el: ElementHandle) -> Result<(), DomError>;

    /// Sets one inline style property and returns its previous inline value (empty if unset).
    async fn set_style(
        &self,
        el: ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<String, DomError>;

    async fn remove_attribute(&self, el: ElementHandle, name: &str) -> Result<(), DomError>;

    async fn set_tab_index(&self, el: ElementHandle, index: i32) -> Result<(), DomError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_display_is_parsed_from_style() {
        let mut info = ElementInfo {
            tag: "div".into(),
            ..Default::default()
        };
        info.attributes
            .insert("style".into(), "color: red; DISPLAY : None ;".into());
        assert_eq!(info.inline_display().as_deref(), Some("none"));

        info.attributes.insert("style".into(), "color: red".into());
        assert_eq!(info.inline_display(), None);
    }

    #[test]
    fn checkable_and_file_inputs() {
        let info = ElementInfo {
            tag: "input".into(),
            input_type: Some("radio".into()),
            ..Default::default()
        };
        assert!(info.is_checkable());
        assert!(!info.is_file_input());
        assert_eq!(info.effective_tab_index(), 0);
    }

    #[test]
    fn click_activation() {
        let element = |tag: &str, input_type: Option<&str>, attrs: &[(&str, &str)]| ElementInfo {
            tag: tag.into(),
            input_type: input_type.map(String::from),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        assert!(element("input", Some("submit"), &[]).has_click_activation());
        assert!(element("input", Some("checkbox"), &[]).has_click_activation());
        assert!(element("button", None, &[]).has_click_activation());
        assert!(element("a", None, &[("href", "/next")]).has_click_activation());
        assert!(!element("a", None, &[]).has_click_activation());
        assert!(!element("input", Some("text"), &[]).has_click_activation());
        assert!(!element("textarea", None, &[]).has_click_activation());
        assert!(!element("select", None, &[]).has_click_activation());
    }

    #[test]
    fn plain_elements_are_not_focusable_by_default() {
        let mut info = ElementInfo {
            tag: "div".into(),
            ..Default::default()
        };
        assert_eq!(info.effective_tab_index(), -1);
        info.attributes.insert("tabindex".into(), "2".into());
        assert_eq!(info.effective_tab_index(), 2);
    }
}
