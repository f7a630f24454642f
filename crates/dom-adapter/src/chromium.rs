//! Live browser backend over the DevTools protocol.
//!
//! Each operation is a small script evaluated in the page. Elements found by a query are
//! kept in a page-side registry (`window.__sheetform`) and referred to by number, so lookups
//! never write attributes into the DOM. With `search_frames` on, queries also walk
//! same-origin iframes.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::DomError;
use crate::ports::{DomPort, ElementHandle, ElementInfo, SyntheticEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromiumConfig {
    /// DevTools websocket URL, e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`.
    pub ws_url: String,
    #[serde(default)]
    pub search_frames: bool,
    #[serde(default = "default_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
}

fn default_eval_timeout_ms() -> u64 {
    10_000
}

impl ChromiumConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            search_frames: false,
            eval_timeout_ms: default_eval_timeout_ms(),
        }
    }
}

const PRELUDE: &str = r#"
const R = (window.__sheetform = window.__sheetform || { next: 1, els: new Map(), keys: new WeakMap() });
const reg = (el) => {
  if (!el) return null;
  let k = R.keys.get(el);
  if (k !== undefined && R.els.get(k) === el) return k;
  k = R.next++;
  R.els.set(k, el);
  R.keys.set(el, k);
  return k;
};
const get = (k) => {
  const el = R.els.get(k);
  if (!el || !el.isConnected) { R.els.delete(k); throw new Error('stale:' + k); }
  return el;
};
const info = (el) => {
  const attrs = {};
  for (const a of el.attributes) attrs[a.name] = a.value;
  const tag = el.tagName.toLowerCase();
  return {
    tag,
    input_type: tag === 'input' ? (el.type || 'text').toLowerCase() : null,
    id: el.id || null,
    attributes: attrs,
    text_content: el.textContent || '',
    has_text_children: Array.from(el.children).some((c) => (c.textContent || '').trim()),
    value: typeof el.value === 'string' ? el.value : '',
    checked: !!el.checked,
    disabled: !!el.disabled,
  };
};
const docs = () => {
  const out = [document];
  if (SEARCH_FRAMES) {
    for (const f of document.querySelectorAll('iframe, frame')) {
      try { if (f.contentDocument) out.push(f.contentDocument); } catch (e) {}
    }
  }
  return out;
};
"#;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: Value,
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    syntax: bool,
}

/// A page in a running Chromium, attached over CDP.
pub struct ChromiumPage {
    page: Page,
    config: ChromiumConfig,
    _browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
}

impl ChromiumPage {
    /// Attach to the browser at `config.ws_url` and use its first page.
    pub async fn connect(config: ChromiumConfig) -> Result<Self, DomError> {
        let (browser, mut handler) = Browser::connect(config.ws_url.clone())
            .await
            .map_err(|err| DomError::Transport(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!("browser handler error (ignoring): {}", err);
                }
            }
            debug!("browser handler task ended");
        });

        let existing = browser
            .pages()
            .await
            .map_err(|err| DomError::Transport(err.to_string()))?;
        let page = match existing.into_iter().next() {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|err| DomError::Transport(err.to_string()))?,
        };
        info!(ws_url = %config.ws_url, "attached to browser page");

        Ok(Self {
            page,
            config,
            _browser: Mutex::new(browser),
            handler_task,
        })
    }

    /// Fails with [`DomError::NotReady`] unless the document has finished parsing.
    pub async fn probe(&self) -> Result<(), DomError> {
        let state: String = self.run("return document.readyState;").await?;
        match state.as_str() {
            "interactive" | "complete" => Ok(()),
            other => Err(DomError::NotReady(format!("document.readyState is '{other}'"))),
        }
    }

    async fn run<T: DeserializeOwned>(&self, body: &str) -> Result<T, DomError> {
        let script = format!(
            "(() => {{ const SEARCH_FRAMES = {frames}; {PRELUDE}
              try {{ return {{ ok: (() => {{ {body} }})() ?? null }}; }}
              catch (e) {{ return {{ err: String((e && e.message) || e), syntax: !!(e && e.name === 'SyntaxError') }}; }}
            }})()",
            frames = self.config.search_frames,
        );
        let timeout = Duration::from_millis(self.config.eval_timeout_ms);
        let evaluated = tokio::time::timeout(timeout, self.page.evaluate(script))
            .await
            .map_err(|_| DomError::Transport("evaluation timed out".into()))?
            .map_err(|err| DomError::Transport(err.to_string()))?;
        let envelope: Envelope = evaluated
            .into_value()
            .map_err(|err| DomError::Script(format!("unexpected result shape: {err}")))?;

        if let Some(err) = envelope.err {
            if let Some(handle) = err.strip_prefix("stale:") {
                return Err(DomError::StaleElement(handle.parse().unwrap_or_default()));
            }
            if envelope.syntax {
                return Err(DomError::invalid_selector(body_excerpt(body), err));
            }
            return Err(DomError::Script(err));
        }
        serde_json::from_value(envelope.ok)
            .map_err(|err| DomError::Script(format!("unexpected result shape: {err}")))
    }

    async fn query(&self, lookup: &str) -> Result<Vec<ElementHandle>, DomError> {
        let ids: Vec<u64> = self
            .run(&format!(
                "const out = []; for (const d of docs()) {{ for (const el of {lookup}) out.push(reg(el)); }} return out;"
            ))
            .await?;
        Ok(ids.into_iter().map(ElementHandle).collect())
    }

    async fn on_element<T: DeserializeOwned>(
        &self,
        el: ElementHandle,
        body: &str,
    ) -> Result<T, DomError> {
        self.run(&format!("const el = get({}); {body}", el.0)).await
    }
}

fn js(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into())
}

fn body_excerpt(body: &str) -> String {
    body.chars().take(120).collect()
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl DomPort for ChromiumPage {
    async fn element_by_id(&self, id: &str) -> Result<Option<ElementHandle>, DomError> {
        let found = self
            .query(&format!("[d.getElementById({})].filter(Boolean)", js(id)))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn query_selector(&self, css: &str) -> Result<Option<ElementHandle>, DomError> {
        let found = self
            .query(&format!("[d.querySelector({})].filter(Boolean)", js(css)))
            .await
            .map_err(|err| selector_error(err, css))?;
        Ok(found.into_iter().next())
    }

    async fn query_selector_all(&self, css: &str) -> Result<Vec<ElementHandle>, DomError> {
        self.query(&format!("d.querySelectorAll({})", js(css)))
            .await
            .map_err(|err| selector_error(err, css))
    }

    async fn query_selector_within(
        &self,
        root: ElementHandle,
        css: &str,
    ) -> Result<Option<ElementHandle>, DomError> {
        self.on_element(root, &format!("return reg(el.querySelector({}));", js(css)))
            .await
            .map(|found: Option<u64>| found.map(ElementHandle))
            .map_err(|err| selector_error(err, css))
    }

    async fn evaluate_xpath(&self, expression: &str) -> Result<Option<ElementHandle>, DomError> {
        let body = format!(
            "for (const d of docs()) {{
               const r = d.evaluate({}, d, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
               for (let i = 0; i < r.snapshotLength; i++) {{
                 const n = r.snapshotItem(i);
                 if (n && n.nodeType === 1) return reg(n);
               }}
             }}
             return null;",
            js(expression)
        );
        self.run(&body)
            .await
            .map(|found: Option<u64>| found.map(ElementHandle))
            .map_err(|err| match err {
                DomError::InvalidSelector { reason, .. } => {
                    DomError::invalid_xpath(expression, reason)
                }
                other => other,
            })
    }

    async fn describe(&self, el: ElementHandle) -> Result<ElementInfo, DomError> {
        self.on_element(el, "return info(el);").await
    }

    async fn describe_all(
        &self,
        css: &str,
    ) -> Result<Vec<(ElementHandle, ElementInfo)>, DomError> {
        let found: Vec<(u64, ElementInfo)> = self
            .run(&format!(
                "const out = [];
                 for (const d of docs()) {{
                   for (const el of d.querySelectorAll({})) out.push([reg(el), info(el)]);
                 }}
                 return out;",
                js(css)
            ))
            .await
            .map_err(|err| selector_error(err, css))?;
        Ok(found
            .into_iter()
            .map(|(id, info)| (ElementHandle(id), info))
            .collect())
    }

    async fn next_element_sibling(
        &self,
        el: ElementHandle,
    ) -> Result<Option<ElementHandle>, DomError> {
        self.on_element(el, "return reg(el.nextElementSibling);")
            .await
            .map(|found: Option<u64>| found.map(ElementHandle))
    }

    async fn focus(&self, el: ElementHandle) -> Result<(), DomError> {
        self.on_element(el, "el.focus(); return null;").await
    }

    async fn blur(&self, el: ElementHandle) -> Result<(), DomError> {
        self.on_element(el, "el.blur(); return null;").await
    }

    async fn select_text(&self, el: ElementHandle) -> Result<(), DomError> {
        self.on_element(
            el,
            "if (typeof el.select === 'function') el.select(); return null;",
        )
        .await
    }

    async fn set_value(&self, el: ElementHandle, value: &str) -> Result<(), DomError> {
        // the prototype setter keeps framework-controlled inputs in sync
        self.on_element(
            el,
            &format!(
                "const v = {};
                 const proto = el instanceof HTMLSelectElement ? HTMLSelectElement.prototype
                   : el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
                   : HTMLInputElement.prototype;
                 const desc = Object.getOwnPropertyDescriptor(proto, 'value');
                 if (desc && desc.set) desc.set.call(el, v); else el.value = v;
                 return null;",
                js(value)
            ),
        )
        .await
    }

    async fn dispatch(&self, el: ElementHandle, event: SyntheticEvent) -> Result<(), DomError> {
        let described = json!({
            "type": event.kind.dom_name(),
            "iface": event.kind.interface(),
            "bubbles": event.kind.bubbles(),
            "key": event.key,
            "data": event.data,
            "offset": event.offset.map(|(x, y)| [x, y]),
        });
        self.on_element(
            el,
            &format!(
                "const ev = {described};
                 const rect = el.getBoundingClientRect();
                 const [dx, dy] = ev.offset || [rect.width / 2, rect.height / 2];
                 const init = {{
                   bubbles: ev.bubbles, cancelable: true, composed: true, view: window,
                   clientX: rect.left + dx, clientY: rect.top + dy,
                 }};
                 if (ev.key != null) init.key = ev.key;
                 if (ev.data != null) {{ init.data = ev.data; init.inputType = 'insertText'; }}
                 const Ctor = window[ev.iface] || Event;
                 let e;
                 try {{ e = new Ctor(ev.type, init); }} catch (_) {{ e = new Event(ev.type, init); }}
                 el.dispatchEvent(e);
                 return null;"
            ),
        )
        .await
    }

    async fn scroll_into_view(&self, el: ElementHandle) -> Result<(), DomError> {
        self.on_element(
            el,
            "el.scrollIntoView({ behavior: 'instant', block: 'center', inline: 'nearest' }); return null;",
        )
        .await
    }

    async fn set_style(
        &self,
        el: ElementHandle,
        property: &str,
        value: &str,
    ) -> Result<String, DomError> {
        self.on_element(
            el,
            &format!(
                "const p = {}; const prev = el.style.getPropertyValue(p);
                 if ({v}) el.style.setProperty(p, {v}); else el.style.removeProperty(p);
                 return prev;",
                js(property),
                v = js(value)
            ),
        )
        .await
    }

    async fn remove_attribute(&self, el: ElementHandle, name: &str) -> Result<(), DomError> {
        self.on_element(el, &format!("el.removeAttribute({}); return null;", js(name)))
            .await
    }

    async fn set_tab_index(&self, el: ElementHandle, index: i32) -> Result<(), DomError> {
        self.on_element(el, &format!("el.tabIndex = {index}; return null;"))
            .await
    }
}

fn selector_error(err: DomError, css: &str) -> DomError {
    match err {
        DomError::InvalidSelector { reason, .. } => DomError::invalid_selector(css, reason),
        other => other,
    }
}
