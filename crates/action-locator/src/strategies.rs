//! Element resolution strategies
//!
//! One async function per [`LocatorKind`]. Each performs a single lookup pass and returns
//! `Ok(None)` when nothing matched; retrying is the resolver's job. Lookups only query the
//! page and never mutate it.

use crate::types::{AutoStep, Located};
use dom_adapter::{DomError, DomPort, ElementHandle, ElementInfo};
use sheetform_core_types::LocatorKind;
use tracing::{debug, warn};

const INTERACTIVE: &str = r#"button, input[type="submit"], input[type="button"], a"#;
const FORM_CONTROLS: &str = "input, select, textarea";
// never carry visible text
const NON_VISUAL: [&str; 8] = [
    "html", "head", "title", "script", "style", "noscript", "template", "meta",
];

/// Escape `\` and `"` for use inside a double-quoted attribute selector
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Run the strategy for `kind`
///
/// Invalid selectors and XPath expressions count as no match; other page errors propagate.
pub async fn run_strategy(
    dom: &dyn DomPort,
    kind: LocatorKind,
    locator: &str,
) -> Result<Option<Located>, DomError> {
    let found = match kind {
        LocatorKind::Id => by_id(dom, locator).await,
        LocatorKind::Name => by_name(dom, locator).await,
        LocatorKind::Class => by_class(dom, locator).await,
        LocatorKind::Css => by_css(dom, locator).await,
        LocatorKind::Placeholder => by_placeholder(dom, locator).await,
        LocatorKind::Label => by_label(dom, locator).await,
        LocatorKind::Text => by_text(dom, locator).await,
        LocatorKind::XPath => by_xpath(dom, locator).await,
        LocatorKind::Auto => return by_auto(dom, locator).await,
    };
    match found {
        Ok(element) => Ok(element.map(Located::direct)),
        Err(err) if err.is_query_error() => {
            warn!(kind = %kind, locator, error = %err, "query rejected, treating as no match");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// `auto`: walk [`AutoStep::chain`] until a step yields an element
pub async fn by_auto(dom: &dyn DomPort, locator: &str) -> Result<Option<Located>, DomError> {
    for step in AutoStep::chain() {
        match auto_step(dom, step, locator).await {
            Ok(Some(element)) => {
                debug!(step = step.name(), locator, %element, "auto step matched");
                return Ok(Some(Located {
                    element,
                    step: Some(step),
                }));
            }
            Ok(None) => {}
            Err(err) if err.is_query_error() => {
                debug!(step = step.name(), locator, error = %err, "auto step skipped");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

async fn auto_step(
    dom: &dyn DomPort,
    step: AutoStep,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    let escaped = escape_attr(locator);
    match step {
        AutoStep::Id => dom.element_by_id(locator).await,
        AutoStep::Name => dom.query_selector(&format!(r#"[name="{escaped}"]"#)).await,
        AutoStep::CssId => dom.query_selector(&format!("#{locator}")).await,
        AutoStep::Class => dom.query_selector(&format!(".{locator}")).await,
        AutoStep::PlaceholderExact => {
            dom.query_selector(&format!(r#"[placeholder="{escaped}"]"#))
                .await
        }
        AutoStep::PlaceholderContains => {
            dom.query_selector(&format!(r#"[placeholder*="{escaped}"]"#))
                .await
        }
        AutoStep::ValueExact => dom.query_selector(&format!(r#"[value="{escaped}"]"#)).await,
        AutoStep::TitleExact => dom.query_selector(&format!(r#"[title="{escaped}"]"#)).await,
        AutoStep::Text => by_text(dom, locator).await,
        AutoStep::Label => by_label(dom, locator).await,
        AutoStep::ClassContains => dom.query_selector(&format!(r#"[class*="{escaped}"]"#)).await,
        AutoStep::IdContains => dom.query_selector(&format!(r#"[id*="{escaped}"]"#)).await,
        AutoStep::NameContains => dom.query_selector(&format!(r#"[name*="{escaped}"]"#)).await,
        AutoStep::RawCss => dom.query_selector(locator).await,
    }
}

/// `id`: exact id lookup, then `#id` as CSS
pub async fn by_id(dom: &dyn DomPort, locator: &str) -> Result<Option<ElementHandle>, DomError> {
    let id = locator.strip_prefix('#').unwrap_or(locator);
    if let Some(found) = dom.element_by_id(id).await? {
        return Ok(Some(found));
    }
    dom.query_selector(&format!("#{id}")).await
}

/// `name`: `[name="..."]`
pub async fn by_name(
    dom: &dyn DomPort,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    dom.query_selector(&format!(r#"[name="{}"]"#, escape_attr(locator)))
        .await
}

/// `class`: `.class`
pub async fn by_class(
    dom: &dyn DomPort,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    let class = locator.strip_prefix('.').unwrap_or(locator);
    dom.query_selector(&format!(".{class}")).await
}

/// `css`: the locator is the selector
pub async fn by_css(dom: &dyn DomPort, locator: &str) -> Result<Option<ElementHandle>, DomError> {
    dom.query_selector(locator).await
}

/// `placeholder`: exact match first, then substring
pub async fn by_placeholder(
    dom: &dyn DomPort,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    let escaped = escape_attr(locator);
    if let Some(found) = dom
        .query_selector(&format!(r#"[placeholder="{escaped}"]"#))
        .await?
    {
        return Ok(Some(found));
    }
    dom.query_selector(&format!(r#"[placeholder*="{escaped}"]"#))
        .await
}

/// `xpath`: first element of the evaluation
pub async fn by_xpath(
    dom: &dyn DomPort,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    dom.evaluate_xpath(locator).await
}

/// `label`: first `<label>` whose text contains the locator (case-insensitive)
///
/// For a matching label the target is, in order:
/// 1. the element named by its `for` attribute
/// 2. a nested input, select or textarea
/// 3. the next sibling, if it is an input, select or textarea
///
/// A label that yields none of these is passed over for the next one.
pub async fn by_label(
    dom: &dyn DomPort,
    locator: &str,
) -> Result<Option<ElementHandle>, DomError> {
    let needle = locator.to_lowercase();
    for (label, info) in dom.describe_all("label").await? {
        if !info.text_content.to_lowercase().contains(&needle) {
            continue;
        }
        if let Some(target_id) = info.attribute("for").filter(|id| !id.is_empty()) {
            if let Some(target) = dom.element_by_id(target_id).await? {
                debug!(locator, %target, "label matched via for attribute");
                return Ok(Some(target));
            }
        }
        if let Some(nested) = dom.query_selector_within(label, FORM_CONTROLS).await? {
            debug!(locator, %nested, "label matched nested control");
            return Ok(Some(nested));
        }
        if let Some(sibling) = dom.next_element_sibling(label).await? {
            let sibling_info = dom.describe(sibling).await?;
            if sibling_info.is_form_control() {
                debug!(locator, %sibling, "label matched sibling control");
                return Ok(Some(sibling));
            }
        }
    }
    Ok(None)
}

/// `text`: visible text match
///
/// Passes, first hit wins:
/// 1. exact trimmed text on buttons, submit/button inputs and links
/// 2. exact trimmed text on leaf elements (no child element carrying text)
/// 3. substring on the interactive elements
/// 4. substring on leaf elements
pub async fn by_text(dom: &dyn DomPort, locator: &str) -> Result<Option<ElementHandle>, DomError> {
    let wanted = locator.trim();
    if wanted.is_empty() {
        return Ok(None);
    }

    let interactive = dom.describe_all(INTERACTIVE).await?;
    if let Some(found) = first_text_match(&interactive, |text| text.trim() == wanted) {
        return Ok(Some(found));
    }

    let leaves: Vec<(ElementHandle, ElementInfo)> = dom
        .describe_all("*")
        .await?
        .into_iter()
        .filter(|(_, info)| !info.has_text_children && !NON_VISUAL.contains(&info.tag.as_str()))
        .collect();
    if let Some(found) = first_text_match(&leaves, |text| text.trim() == wanted) {
        return Ok(Some(found));
    }

    if let Some(found) = first_text_match(&interactive, |text| text.contains(wanted)) {
        return Ok(Some(found));
    }
    Ok(first_text_match(&leaves, |text| text.contains(wanted)))
}

/// Button-like inputs show their `value` rather than text content
fn visible_text(info: &ElementInfo) -> &str {
    if info.tag == "input" {
        info.attribute("value").unwrap_or_default()
    } else {
        &info.text_content
    }
}

fn first_text_match(
    elements: &[(ElementHandle, ElementInfo)],
    predicate: impl Fn(&str) -> bool,
) -> Option<ElementHandle> {
    elements
        .iter()
        .find(|(_, info)| predicate(visible_text(info)))
        .map(|(el, _)| *el)
}
