//! Arena copy of a parsed HTML document with mutable form state.
//!
//! CSS matching runs on the `scraper` tree the arena was copied from. Attribute writes
//! mark that tree stale; it is re-rendered from the arena before the next query.

use std::collections::HashMap;
use std::fmt::Write as _;

use ego_tree::NodeId as TreeId;
use scraper::{ElementRef, Html, Node as HtmlNode, Selector};
use tracing::debug;

use crate::ports::SyntheticEvent;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// contents are written back unescaped
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub value: String,
    pub checked: bool,
    pub events: Vec<SyntheticEvent>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    pub fn input_type(&self) -> Option<String> {
        (self.tag == "input").then(|| {
            self.attr("type")
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string())
        })
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Inline style declarations in source order.
    pub fn style(&self) -> Vec<(String, String)> {
        self.attr("style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| {
                        let (prop, value) = decl.split_once(':')?;
                        let prop = prop.trim().to_ascii_lowercase();
                        (!prop.is_empty()).then(|| (prop, value.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn style_property(&self, property: &str) -> String {
        self.style()
            .into_iter()
            .find(|(prop, _)| prop == property)
            .map(|(_, value)| value)
            .unwrap_or_default()
    }

    /// Writes one inline declaration; an empty value removes it. Returns the previous value.
    pub fn set_style_property(&mut self, property: &str, value: &str) -> String {
        let property = property.trim().to_ascii_lowercase();
        let mut decls = self.style();
        let previous = decls
            .iter()
            .find(|(prop, _)| *prop == property)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        decls.retain(|(prop, _)| *prop != property);
        if !value.is_empty() {
            decls.push((property, value.to_string()));
        }
        if decls.is_empty() {
            self.remove_attr("style");
        } else {
            let rendered = decls
                .iter()
                .map(|(prop, v)| format!("{prop}: {v}"))
                .collect::<Vec<_>>()
                .join("; ");
            self.set_attr("style", rendered);
        }
        previous
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Document {
    nodes: Vec<Node>,
    markup: Html,
    doctype: Option<String>,
    // arena element -> node of `markup`, and back
    to_tree: HashMap<NodeId, TreeId>,
    from_tree: HashMap<TreeId, NodeId>,
    markup_stale: bool,
}

impl Document {
    pub const ROOT: NodeId = NodeId(0);

    /// Parse `html` and copy it into the arena. Nodes are stored in document order.
    pub fn parse(html: &str) -> Self {
        let markup = Html::parse_document(html);
        let doctype = markup.tree.root().children().find_map(|child| {
            let doctype = child.value().as_doctype()?;
            Some(match (doctype.public_id(), doctype.system_id()) {
                ("", "") => format!("<!DOCTYPE {}>", doctype.name()),
                (public, system) => format!(
                    "<!DOCTYPE {} PUBLIC \"{}\" \"{}\">",
                    doctype.name(),
                    public,
                    system
                ),
            })
        });
        let mut doc = Document {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            markup,
            doctype,
            to_tree: HashMap::new(),
            from_tree: HashMap::new(),
            markup_stale: false,
        };
        copy_element(doc.markup.root_element(), Self::ROOT, &mut doc.nodes);
        doc.link_markup();
        doc.initialise_form_state();
        doc
    }

    fn initialise_form_state(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index);
            let Some(el) = self.element(id) else { continue };
            let (value, checked) = match el.tag.as_str() {
                "input" => (
                    el.attr("value").unwrap_or_default().to_string(),
                    el.attr("checked").is_some(),
                ),
                "textarea" => (self.text_content(id), false),
                "select" => (self.initial_select_value(id), false),
                "option" => (self.option_value(id), el.attr("selected").is_some()),
                _ => continue,
            };
            if let Some(el) = self.element_mut(id) {
                el.value = value;
                el.checked = checked;
            }
        }
    }

    fn initial_select_value(&self, select: NodeId) -> String {
        let options = self.options_of(select);
        options
            .iter()
            .find(|opt| {
                self.element(**opt)
                    .map(|el| el.attr("selected").is_some())
                    .unwrap_or(false)
            })
            .or_else(|| options.first())
            .map(|opt| self.option_value(*opt))
            .unwrap_or_default()
    }

    pub fn option_value(&self, option: NodeId) -> String {
        match self.element(option).and_then(|el| el.attr("value")) {
            Some(value) => value.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    pub fn options_of(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|id| self.tag(*id) == Some("option"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.nodes.get(id.0).map(|node| &node.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        self.element(parent).map(|_| parent)
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| self.element(*child).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Element descendants of `id` (excluding `id`) in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.node(id) {
            for child in &node.children {
                if self.element(*child).is_some() {
                    out.push(*child);
                    self.collect_descendants(*child, out);
                }
            }
        }
    }

    /// All element nodes in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.element(*id).is_some())
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Direct text node children.
    pub fn own_texts(&self, id: NodeId) -> Vec<&str> {
        self.node(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| match self.node(*child).map(|n| &n.kind) {
                        Some(NodeKind::Text(text)) => Some(text.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_text_children(&self, id: NodeId) -> bool {
        self.element_children(id)
            .into_iter()
            .any(|child| !self.text_content(child).trim().is_empty())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        let siblings = &self.node(parent)?.children;
        let position = siblings.iter().position(|s| *s == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|s| self.element(*s).is_some())
    }

    /// The `<form>` ancestor of `id`, if any.
    pub fn form_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent_element(id);
        while let Some(parent) = current {
            if self.tag(parent) == Some("form") {
                return Some(parent);
            }
            current = self.parent_element(parent);
        }
        None
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: String) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
            self.markup_stale = true;
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.remove_attr(name);
            self.markup_stale = true;
        }
    }

    /// See [`ElementData::set_style_property`].
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> String {
        let Some(el) = self.element_mut(id) else {
            return String::new();
        };
        let previous = el.set_style_property(property, value);
        self.markup_stale = true;
        previous
    }

    /// Elements matching `selector` in document order. With `scope`, only its descendants.
    pub fn select(&mut self, selector: &Selector, scope: Option<NodeId>) -> Vec<NodeId> {
        self.refresh_markup();
        let mut found: Vec<NodeId> = match scope {
            Some(scope) => {
                let Some(root) = self
                    .to_tree
                    .get(&scope)
                    .and_then(|tree_id| self.markup.tree.get(*tree_id))
                    .and_then(ElementRef::wrap)
                else {
                    return Vec::new();
                };
                root.select(selector)
                    .filter_map(|el| self.from_tree.get(&el.id()).copied())
                    .collect()
            }
            None => self
                .markup
                .select(selector)
                .filter_map(|el| self.from_tree.get(&el.id()).copied())
                .collect(),
        };
        // tree storage order is not always document order
        found.sort_unstable();
        found
    }

    fn refresh_markup(&mut self) {
        if !self.markup_stale {
            return;
        }
        let mut fresh = Html::parse_document(&self.render());
        fresh.quirks_mode = self.markup.quirks_mode;
        self.markup = fresh;
        self.link_markup();
        self.markup_stale = false;
    }

    /// Pair arena elements with `markup` elements; both are walked in document order.
    fn link_markup(&mut self) {
        let mut tree_order = Vec::new();
        element_order(self.markup.root_element(), &mut tree_order);
        let arena_order: Vec<NodeId> = self.elements().collect();
        if tree_order.len() != arena_order.len() {
            debug!(
                arena = arena_order.len(),
                markup = tree_order.len(),
                "re-parsed markup changed shape"
            );
        }
        self.to_tree.clear();
        self.from_tree.clear();
        for (node, tree_id) in arena_order.into_iter().zip(tree_order) {
            self.to_tree.insert(node, tree_id);
            self.from_tree.insert(tree_id, node);
        }
    }

    /// Serialise the arena back to HTML.
    pub fn render(&self) -> String {
        let mut out = self.doctype.clone().unwrap_or_default();
        self.render_node(Self::ROOT, false, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Document => {
                for child in &node.children {
                    self.render_node(*child, false, out);
                }
            }
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => escape_into(text, false, out),
            NodeKind::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                for (name, value) in &el.attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_TAGS.contains(&el.tag.as_str());
                for child in &node.children {
                    self.render_node(*child, raw, out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

fn copy_element(element: ElementRef<'_>, parent: NodeId, nodes: &mut Vec<Node>) {
    let data = ElementData {
        tag: element.value().name().to_ascii_lowercase(),
        attrs: element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect(),
        ..Default::default()
    };
    let id = push_node(nodes, parent, NodeKind::Element(data));
    for child in element.children() {
        match child.value() {
            HtmlNode::Text(text) => {
                push_node(nodes, id, NodeKind::Text(String::from(&**text)));
            }
            HtmlNode::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    copy_element(child_ref, id, nodes);
                }
            }
            _ => {}
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, parent: NodeId, kind: NodeKind) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(Node {
        parent: Some(parent),
        children: Vec::new(),
        kind,
    });
    nodes[parent.0].children.push(id);
    id
}

/// Element ids in the same pre-order walk as [`copy_element`].
fn element_order(element: ElementRef<'_>, out: &mut Vec<TreeId>) {
    out.push(element.id());
    for child in element.children().filter_map(ElementRef::wrap) {
        element_order(child, out);
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
