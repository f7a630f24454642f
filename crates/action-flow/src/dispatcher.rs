//! Action dispatch for resolved elements
//!
//! Maps a field's action keyword onto the synthesizer, after preparing the element so a
//! real browser would accept the interaction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use action_primitives::EventSynthesizer;
use dom_adapter::{DomError, DomPort, ElementHandle};
use parking_lot::Mutex;
use sheetform_core_types::{FieldAction, FieldDescriptor};
use stealth::Intensity;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, HighlightConfig, PrepareConfig};
use crate::errors::ActionError;

/// Styles an element had before its first outstanding highlight
struct Highlighted {
    border: String,
    background: String,
    pending_reverts: usize,
}

/// Performs one field's action on a resolved element
pub struct ActionDispatcher {
    dom: Arc<dyn DomPort>,
    synthesizer: Arc<dyn EventSynthesizer>,
    prepare: PrepareConfig,
    highlight: HighlightConfig,
    strict_toggle: bool,
    highlighted: Arc<Mutex<HashMap<ElementHandle, Highlighted>>>,
}

impl ActionDispatcher {
    pub fn new(dom: Arc<dyn DomPort>, synthesizer: Arc<dyn EventSynthesizer>) -> Self {
        Self::with_config(dom, synthesizer, &EngineConfig::default())
    }

    pub fn with_config(
        dom: Arc<dyn DomPort>,
        synthesizer: Arc<dyn EventSynthesizer>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            dom,
            synthesizer,
            prepare: config.prepare.clone(),
            highlight: config.highlight.clone(),
            strict_toggle: config.strict_toggle_verification,
            highlighted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Make the element reachable: scroll, settle, unhide, enable, make focusable
    pub async fn prepare(&self, el: ElementHandle) -> Result<(), ActionError> {
        if self.prepare.is_noop() {
            return Ok(());
        }
        let info = self.dom.describe(el).await?;

        if self.prepare.scroll_into_view {
            self.dom.scroll_into_view(el).await?;
            if self.prepare.settle_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.prepare.settle_ms)).await;
            }
        }

        if self.prepare.reveal_hidden && info.inline_display().as_deref() == Some("none") {
            debug!(element = %el, "revealing hidden element");
            self.dom.set_style(el, "display", "").await?;
        }

        if self.prepare.enable_disabled && info.disabled {
            warn!(element = %el, target = %info.describe_short(), "element is disabled, enabling");
            self.dom.remove_attribute(el, "disabled").await?;
        }

        if self.prepare.make_focusable && info.effective_tab_index() < 0 {
            self.dom.set_tab_index(el, 0).await?;
        }

        Ok(())
    }

    /// Outline the element and restore its previous styles later on a detached task.
    ///
    /// An element highlighted again before its revert fires keeps the styles captured the
    /// first time; only the last pending revert restores them. Failures are logged and
    /// never reach the caller.
    pub async fn highlight(&self, el: ElementHandle) {
        if !self.highlight.enabled {
            return;
        }

        let reserved = match self.highlighted.lock().get_mut(&el) {
            Some(entry) => {
                entry.pending_reverts += 1;
                true
            }
            None => false,
        };

        if reserved {
            if let Err(err) = self.apply_highlight(el).await {
                debug!(element = %el, error = %err, "highlight refresh skipped");
            }
        } else {
            let (border, background) = match self.apply_highlight(el).await {
                Ok(previous) => previous,
                Err(err) => {
                    debug!(element = %el, error = %err, "highlight skipped");
                    return;
                }
            };
            self.highlighted.lock().insert(
                el,
                Highlighted {
                    border,
                    background,
                    pending_reverts: 1,
                },
            );
        }

        let dom = Arc::clone(&self.dom);
        let highlighted = Arc::clone(&self.highlighted);
        let duration = Duration::from_millis(self.highlight.duration_ms);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let original = {
                let mut highlighted = highlighted.lock();
                match highlighted.get_mut(&el) {
                    Some(entry) if entry.pending_reverts > 1 => {
                        entry.pending_reverts -= 1;
                        None
                    }
                    _ => highlighted.remove(&el),
                }
            };
            let Some(original) = original else { return };
            let restored = async {
                dom.set_style(el, "border", &original.border).await?;
                dom.set_style(el, "background-color", &original.background)
                    .await
            };
            if let Err(err) = restored.await {
                debug!(element = %el, error = %err, "highlight revert failed");
            }
        });
    }

    /// Writes the highlight styles and returns the previous border and background
    async fn apply_highlight(&self, el: ElementHandle) -> Result<(String, String), DomError> {
        let border = self
            .dom
            .set_style(el, "border", &self.highlight.border)
            .await?;
        let background = match self
            .dom
            .set_style(el, "background-color", &self.highlight.background)
            .await
        {
            Ok(previous) => previous,
            Err(err) => {
                debug!(element = %el, error = %err, "highlight background skipped");
                String::new()
            }
        };
        Ok((border, background))
    }

    /// Run the field's action against `el`
    pub async fn perform(
        &self,
        el: ElementHandle,
        field: &FieldDescriptor,
        intensity: Intensity,
    ) -> Result<(), ActionError> {
        let action = field.action();
        debug!(element = %el, action = action.keyword(), ?intensity, "dispatching action");

        match action {
            FieldAction::Click => {
                self.synthesizer.click(el, intensity).await?;
            }
            FieldAction::Check => self.toggle(el, true, intensity).await?,
            FieldAction::Uncheck => self.toggle(el, false, intensity).await?,
            FieldAction::Clear => {
                self.synthesizer.clear(el, intensity).await?;
            }
            FieldAction::Focus => self.dom.focus(el).await?,
            FieldAction::SetValue(value) => {
                let info = self.dom.describe(el).await?;
                if info.is_file_input() {
                    return Err(ActionError::UnsupportedElementType(format!(
                        "cannot assign a value to file input {}",
                        info.describe_short()
                    )));
                }
                let report = self.synthesizer.apply_value(el, &value, intensity).await?;
                if !report.value_matches(&value) {
                    info!(
                        element = %el,
                        committed = report.committed.as_deref().unwrap_or_default(),
                        "page rewrote the assigned value"
                    );
                }
            }
        }
        Ok(())
    }

    /// Click only when the checked state differs, then verify it flipped
    async fn toggle(
        &self,
        el: ElementHandle,
        desired: bool,
        intensity: Intensity,
    ) -> Result<(), ActionError> {
        let action = if desired { "CHECK" } else { "UNCHECK" };
        let info = self.dom.describe(el).await?;
        if !info.is_checkable() {
            return Err(ActionError::UnsupportedAction {
                action,
                element: info.describe_short(),
            });
        }
        if info.checked == desired {
            debug!(element = %el, checked = desired, "already in requested state");
            return Ok(());
        }

        self.synthesizer.click(el, intensity).await?;

        let checked = self.dom.describe(el).await?.checked;
        if checked != desired {
            let message = format!(
                "{} still {} after click",
                info.describe_short(),
                if checked { "checked" } else { "unchecked" }
            );
            if self.strict_toggle {
                return Err(ActionError::StateNotChanged(message));
            }
            warn!(element = %el, action, "checkbox state did not change: {}", message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::ScriptedSynthesizer;
    use dom_adapter::{EventKind, MemoryPage};

    const PAGE: &str = r#"<html><body><form>
        <input id="name" value="Ada">
        <input id="terms" type="checkbox">
        <input id="news" type="checkbox" checked>
        <input id="cv" type="file">
        <div id="hidden" style="display: none; color: red" tabindex="-1">
            <input id="locked" disabled>
        </div>
    </form></body></html>"#;

    fn setup(config: &EngineConfig) -> (MemoryPage, ActionDispatcher) {
        let page = MemoryPage::from_html(PAGE);
        let dom: Arc<dyn DomPort> = Arc::new(page.clone());
        let synth = Arc::new(ScriptedSynthesizer::new(Arc::clone(&dom)));
        (page, ActionDispatcher::with_config(dom, synth, config))
    }

    fn field(locator: &str, value: &str) -> FieldDescriptor {
        FieldDescriptor::new(locator, locator, "id", value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_is_idempotent() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let news = page.find("#news").unwrap();

        dispatcher
            .perform(news, &field("news", "check"), Intensity::Plain)
            .await
            .unwrap();
        assert!(page.is_checked(news));
        assert!(page.event_kinds(news).is_empty());

        dispatcher
            .perform(news, &field("news", "UNCHECK"), Intensity::Plain)
            .await
            .unwrap();
        assert!(!page.is_checked(news));
        let clicks = page
            .event_kinds(news)
            .into_iter()
            .filter(|k| *k == EventKind::Click)
            .count();
        assert_eq!(clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_rejects_text_input() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let name = page.find("#name").unwrap();

        let err = dispatcher
            .perform(name, &field("name", "CHECK"), Intensity::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UnsupportedAction { action: "CHECK", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_input_rejected() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let cv = page.find("#cv").unwrap();

        let err = dispatcher
            .perform(cv, &field("cv", "/tmp/cv.pdf"), Intensity::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UnsupportedElementType(_)));
        assert!(page.event_kinds(cv).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_does_not_mutate() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let name = page.find("#name").unwrap();

        dispatcher
            .perform(name, &field("name", " focus "), Intensity::Plain)
            .await
            .unwrap();
        assert_eq!(page.value(name).as_deref(), Some("Ada"));
        assert_eq!(page.focused(), Some(name));
        assert!(page.event_kinds(name).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_toggle_warns_or_fails() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let terms = page.find("#terms").unwrap();
        page.freeze_checked(terms);
        dispatcher
            .perform(terms, &field("terms", "CHECK"), Intensity::Plain)
            .await
            .unwrap();
        assert!(!page.is_checked(terms));

        let strict = EngineConfig {
            strict_toggle_verification: true,
            ..EngineConfig::default()
        };
        let (page, dispatcher) = setup(&strict);
        let terms = page.find("#terms").unwrap();
        page.freeze_checked(terms);
        let err = dispatcher
            .perform(terms, &field("terms", "CHECK"), Intensity::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::StateNotChanged(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_unhides_enables_and_settles() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let hidden = page.find("#hidden").unwrap();
        let locked = page.find("#locked").unwrap();

        let started = tokio::time::Instant::now();
        dispatcher.prepare(hidden).await.unwrap();
        dispatcher.prepare(locked).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(page.style(hidden, "display"), "");
        assert_eq!(page.style(hidden, "color"), "red");
        assert_eq!(page.attribute(hidden, "tabindex").as_deref(), Some("0"));
        assert_eq!(page.attribute(locked, "disabled"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlight_reverts_after_duration() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let name = page.find("#name").unwrap();

        dispatcher.highlight(name).await;
        assert_eq!(page.style(name, "border"), "3px solid #4CAF50");
        assert_eq!(page.style(name, "background-color"), "rgba(76, 175, 80, 0.2)");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(page.style(name, "border"), "");
        assert_eq!(page.style(name, "background-color"), "");
        assert_eq!(page.attribute(name, "style"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_highlights_restore_original_styles() {
        let (page, dispatcher) = setup(&EngineConfig::default());
        let name = page.find("#name").unwrap();
        page.set_style(name, "border", "1px dashed blue").await.unwrap();

        dispatcher.highlight(name).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        dispatcher.highlight(name).await;

        // first revert is due, the second highlight is still showing
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(page.style(name, "border"), "3px solid #4CAF50");

        tokio::time::sleep(Duration::from_millis(30_000)).await;
        assert_eq!(page.style(name, "border"), "1px dashed blue");
        assert_eq!(page.style(name, "background-color"), "");
        assert_eq!(
            page.attribute(name, "style").as_deref(),
            Some("border: 1px dashed blue")
        );
    }
}
