//! In-memory page built from an HTML snapshot.
//!
//! The snapshot is parsed with `scraper` and copied into an arena; from then on the
//! page behaves like a tiny DOM: values, checked state, inline styles and attributes can
//! change, focus moves, and every dispatched event is logged per element. A `Click` on a
//! checkbox or radio performs the default activation.
//!
//! Two hooks emulate page scripts for tests: a value interceptor rewrites assigned values,
//! and a frozen element ignores toggles.

mod document;
mod xpath;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::Selector;
use serde::Serialize;
use tracing::debug;

use crate::errors::DomError;
use crate::ports::{DomPort, ElementHandle, ElementInfo, EventKind, SyntheticEvent};

use document::{Document, NodeId};
use xpath::XPath;

type ValueInterceptor = Arc<dyn Fn(&str) -> String + Send + Sync>;

struct PageState {
    doc: Document,
    focused: Option<NodeId>,
    interceptors: HashMap<NodeId, ValueInterceptor>,
    frozen: HashSet<NodeId>,
}

/// Final state of one form control, as reported by [`MemoryPage::form_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlState {
    /// `id`, else `name`, else the tag.
    pub key: String,
    pub tag: String,
    pub input_type: Option<String>,
    pub value: String,
    pub checked: bool,
}

/// HTML snapshot page. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct MemoryPage {
    state: Arc<Mutex<PageState>>,
}

impl std::fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryPage")
            .field("nodes", &state.doc.len())
            .field("focused", &state.focused)
            .finish()
    }
}

fn to_handle(id: NodeId) -> ElementHandle {
    ElementHandle(id.0 as u64)
}

impl MemoryPage {
    pub fn from_html(html: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                doc: Document::parse(html),
                focused: None,
                interceptors: HashMap::new(),
                frozen: HashSet::new(),
            })),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomError> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::from_html(&html))
    }

    fn with_element<T>(
        &self,
        el: ElementHandle,
        f: impl FnOnce(&mut PageState, NodeId) -> T,
    ) -> Result<T, DomError> {
        let mut state = self.state.lock();
        let id = NodeId(el.0 as usize);
        if state.doc.element(id).is_none() {
            return Err(DomError::StaleElement(el.0));
        }
        Ok(f(&mut *state, id))
    }

    fn select_all(&self, css: &str, root: Option<NodeId>) -> Result<Vec<ElementHandle>, DomError> {
        let selector = Selector::parse(css)
            .map_err(|err| DomError::invalid_selector(css, err.to_string()))?;
        let mut state = self.state.lock();
        Ok(state
            .doc
            .select(&selector, root)
            .into_iter()
            .map(to_handle)
            .collect())
    }

    /// Synchronous lookup for tests and reporting. Invalid selectors yield `None`.
    pub fn find(&self, css: &str) -> Option<ElementHandle> {
        self.select_all(css, None).ok()?.into_iter().next()
    }

    /// Page script hook: every value assigned to `el` is passed through `f` first.
    pub fn intercept_value<F>(&self, el: ElementHandle, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.state
            .lock()
            .interceptors
            .insert(NodeId(el.0 as usize), Arc::new(f));
    }

    /// Page script hook: clicks on `el` no longer change its checked state.
    pub fn freeze_checked(&self, el: ElementHandle) {
        self.state.lock().frozen.insert(NodeId(el.0 as usize));
    }

    /// Events dispatched on `el`, oldest first.
    pub fn events(&self, el: ElementHandle) -> Vec<SyntheticEvent> {
        self.with_element(el, |state, id| {
            state
                .doc
                .element(id)
                .map(|data| data.events.clone())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    pub fn event_kinds(&self, el: ElementHandle) -> Vec<EventKind> {
        self.events(el).into_iter().map(|e| e.kind).collect()
    }

    pub fn clear_events(&self) {
        let mut state = self.state.lock();
        let ids: Vec<NodeId> = state.doc.elements().collect();
        for id in ids {
            if let Some(el) = state.doc.element_mut(id) {
                el.events.clear();
            }
        }
    }

    pub fn value(&self, el: ElementHandle) -> Option<String> {
        self.with_element(el, |state, id| {
            state.doc.element(id).map(|data| data.value.clone())
        })
        .ok()
        .flatten()
    }

    pub fn is_checked(&self, el: ElementHandle) -> bool {
        self.with_element(el, |state, id| {
            state.doc.element(id).map(|data| data.checked).unwrap_or(false)
        })
        .unwrap_or(false)
    }

    pub fn attribute(&self, el: ElementHandle, name: &str) -> Option<String> {
        self.with_element(el, |state, id| {
            state
                .doc
                .element(id)
                .and_then(|data| data.attr(name))
                .map(String::from)
        })
        .ok()
        .flatten()
    }

    pub fn style(&self, el: ElementHandle, property: &str) -> String {
        self.with_element(el, |state, id| {
            state
                .doc
                .element(id)
                .map(|data| data.style_property(property))
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    pub fn focused(&self) -> Option<ElementHandle> {
        self.state.lock().focused.map(to_handle)
    }

    /// Every input, select and textarea with its current state, in document order.
    pub fn form_state(&self) -> Vec<ControlState> {
        let state = self.state.lock();
        let doc = &state.doc;
        doc.elements()
            .filter_map(|id| {
                let el = doc.element(id)?;
                if !matches!(el.tag.as_str(), "input" | "select" | "textarea") {
                    return None;
                }
                let key = el
                    .attr("id")
                    .or_else(|| el.attr("name"))
                    .unwrap_or(el.tag.as_str())
                    .to_string();
                Some(ControlState {
                    key,
                    tag: el.tag.clone(),
                    input_type: el.input_type(),
                    value: el.value.clone(),
                    checked: el.checked,
                })
            })
            .collect()
    }
}

impl PageState {
    fn assign_value(&mut self, id: NodeId, value: &str) {
        let value = match self.interceptors.get(&id) {
            Some(intercept) => intercept(value),
            None => value.to_string(),
        };
        if self.doc.tag(id) == Some("select") {
            let options = self.doc.options_of(id);
            let chosen = options
                .iter()
                .copied()
                .find(|opt| self.doc.option_value(*opt) == value);
            for opt in &options {
                if let Some(el) = self.doc.element_mut(*opt) {
                    el.checked = Some(*opt) == chosen;
                }
            }
            let committed = if chosen.is_some() { value } else { String::new() };
            if let Some(el) = self.doc.element_mut(id) {
                el.value = committed;
            }
            return;
        }
        if let Some(el) = self.doc.element_mut(id) {
            el.value = value;
        }
    }

    fn activate(&mut self, id: NodeId) {
        if self.frozen.contains(&id) {
            debug!(node = id.0, "toggle suppressed by page");
            return;
        }
        let Some(el) = self.doc.element(id) else {
            return;
        };
        if el.attr("disabled").is_some() {
            return;
        }
        match el.input_type().as_deref() {
            Some("checkbox") => {
                if let Some(el) = self.doc.element_mut(id) {
                    el.checked = !el.checked;
                }
            }
            Some("radio") => {
                let name = el.attr("name").map(String::from);
                let form = self.doc.form_of(id);
                if let Some(name) = name {
                    let group: Vec<NodeId> = self
                        .doc
                        .elements()
                        .filter(|other| *other != id)
                        .filter(|other| {
                            self.doc.element(*other).map_or(false, |o| {
                                o.input_type().as_deref() == Some("radio")
                                    && o.attr("name") == Some(name.as_str())
                            }) && self.doc.form_of(*other) == form
                        })
                        .collect();
                    for other in group {
                        if let Some(o) = self.doc.element_mut(other) {
                            o.checked = false;
                        }
                    }
                }
                if let Some(el) = self.doc.element_mut(id) {
                    el.checked = true;
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl DomPort for MemoryPage {
    async fn element_by_id(&self, id: &str) -> Result<Option<ElementHandle>, DomError> {
        let state = self.state.lock();
        let doc = &state.doc;
        let found = doc
            .elements()
            .find(|n| doc.element(*n).and_then(|el| el.attr("id")) == Some(id))
            .map(to_handle);
        Ok(found)
    }

    async fn query_selector(&self, css: &str) -> Result<Option<ElementHandle>, DomError> {
        Ok(self.select_all(css, None)?.into_iter().next())
    }

    async fn query_selector_all(&self, css: &str) -> Result<Vec<ElementHandle>, DomError> {
        self.select_all(css, None)
    }

    async fn query_selector_within(
        &self,
        root: ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, DomError> {
        let root = self.with_element(root, |_, id| id)?;
        Ok(self.select_all(css, Some(root))?.into_iter().next())
    }

    async fn evaluate_xpath(&self, expression: &str) -> Result<Option<ElementHandle>, DomError> {
        let path = XPath::parse(expression)?;
        let state = self.state.lock();
        Ok(path.evaluate(&state.doc).into_iter().next().map(to_handle))
    }

    async fn describe(&self, el: ElementHandle) -> Result<ElementInfo, DomError> {
        self.with_element(el, |state, id| {
            let doc = &state.doc;
            let data = doc.element(id).cloned().unwrap_or_default();
            ElementInfo {
                input_type: data.input_type(),
                id: data.attr("id").map(String::from),
                attributes: data.attrs.iter().cloned().collect(),
                text_content: doc.text_content(id),
                has_text_children: doc.has_text_children(id),
                disabled: data.attr("disabled").is_some(),
                value: data.value,
                checked: data.checked,
                tag: data.tag,
            }
        })
    }

    async fn next_element_sibling(
        &self,
        el: ElementHandle,
    ) -> Result<Option<ElementHandle>, DomError> {
        self.with_element(el, |state, id| {
            state.doc.next_element_sibling(id).map(to_handle)
        })
    }

    async fn focus(&self, el: ElementHandle) -> Result<(), DomError> {
        self.with_element(el, |state, id| state.focused = Some(id))
    }

    async fn blur(&self, el: ElementHandle) -> Result<(), DomError> {
        self.with_element(el, |state, id| {
            if state.focused == Some(id) {
                state.focused = None;
            }
        })
    }

    async fn select_text(&self, el: ElementHandle) -> Result<(), DomError> {
        self.with_element(el, |_, _| ())
    }

    async fn set_value(&self, el: ElementHandle, value: &str) -> Result<(), DomError> {
        self.with_element(el, |state, id| state.assign_value(id, value))
    }

    async fn dispatch(&self, el: ElementHandle, event: SyntheticEvent) -> Result<(), DomError> {
        self.with_element(el, |state, id| {
            let kind = event.kind;
            if let Some(data) = state.doc.element_mut(id) {
                data.events.push(event);
            }
            if kind == EventKind::Click {
                state.activate(id);
            }
        })
    }

    async fn scroll_into_view(&self, el: ElementHandle) -> Result<(), DomError> {
        self.with_element(el, |_, _| ())
    }

    async fn set_style(
        &self,
        el: ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<String, DomError> {
        self.with_element(el, |state, id| state.doc.set_style(id, property, value))
    }

    async fn remove_attribute(&self, el: ElementHandle, name: &str) -> Result<(), DomError> {
        self.with_element(el, |state, id| {
            state.doc.remove_attribute(id, &name.to_ascii_lowercase())
        })
    }

    async fn set_tab_index(&self, el: ElementHandle, index: i32) -> Result<(), DomError> {
        self.with_element(el, |state, id| {
            state.doc.set_attribute(id, "tabindex", index.to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
      <form>
        <input id="c" type="checkbox">
        <input id="r1" type="radio" name="plan" checked>
        <input id="r2" type="radio" name="plan">
        <select id="s"><option value="a">A</option><option value="b">B</option></select>
      </form>
      <input id="r3" type="radio" name="plan" checked>
    </body></html>"#;

    #[tokio::test]
    async fn click_toggles_checkbox() {
        let page = MemoryPage::from_html(PAGE);
        let c = page.find("#c").unwrap();
        page.dispatch(c, EventKind::Click.into()).await.unwrap();
        assert!(page.is_checked(c));
        page.dispatch(c, EventKind::Click.into()).await.unwrap();
        assert!(!page.is_checked(c));
        assert_eq!(page.event_kinds(c), vec![EventKind::Click, EventKind::Click]);
    }

    #[tokio::test]
    async fn radio_group_is_scoped_to_form() {
        let page = MemoryPage::from_html(PAGE);
        let r1 = page.find("#r1").unwrap();
        let r2 = page.find("#r2").unwrap();
        let r3 = page.find("#r3").unwrap();
        page.dispatch(r2, EventKind::Click.into()).await.unwrap();
        assert!(page.is_checked(r2));
        assert!(!page.is_checked(r1));
        assert!(page.is_checked(r3));
    }

    #[tokio::test]
    async fn select_value_falls_back_to_empty() {
        let page = MemoryPage::from_html(PAGE);
        let s = page.find("#s").unwrap();
        assert_eq!(page.value(s).as_deref(), Some("a"));
        page.set_value(s, "b").await.unwrap();
        assert_eq!(page.value(s).as_deref(), Some("b"));
        page.set_value(s, "zzz").await.unwrap();
        assert_eq!(page.value(s).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn frozen_checkbox_ignores_clicks() {
        let page = MemoryPage::from_html(PAGE);
        let c = page.find("#c").unwrap();
        page.freeze_checked(c);
        page.dispatch(c, EventKind::Click.into()).await.unwrap();
        assert!(!page.is_checked(c));
    }

    #[tokio::test]
    async fn stale_handles_are_reported() {
        let page = MemoryPage::from_html(PAGE);
        let err = page.focus(ElementHandle(10_000)).await.unwrap_err();
        assert!(matches!(err, DomError::StaleElement(10_000)));
    }
}
