//! Location-path subset of XPath 1.0 for [`super::MemoryPage`].
//!
//! Steps are `/name`, `//name` or `*`; predicates may be a position (`[2]`), attribute
//! tests (`[@a]`, `[@a='v']`), text tests (`[text()='v']`, `[.='v']`), or the functions
//! `contains(...)` and `starts-with(...)` over `@a`, `text()` or `.`, joined with `and`.

use crate::errors::DomError;

use super::document::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XPath {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    descendant: bool,
    name: String,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    All(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attr(String),
    Text,
    StringValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Exists(Operand),
    Equals(Operand, String),
    Contains(Operand, String),
    StartsWith(Operand, String),
}

impl XPath {
    pub fn parse(expression: &str) -> Result<Self, DomError> {
        let fail = |reason: &str| DomError::invalid_xpath(expression, reason);
        let mut rest = expression.trim();
        if rest.is_empty() {
            return Err(fail("empty expression"));
        }
        let mut steps = Vec::new();
        let mut first = true;
        while !rest.is_empty() {
            let descendant = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                true
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                false
            } else if first {
                // relative paths are evaluated against the document
                true
            } else {
                return Err(fail("expected '/'"));
            };
            first = false;

            let name_len = rest
                .find(|c: char| c == '/' || c == '[')
                .unwrap_or(rest.len());
            let name = rest[..name_len].trim();
            rest = &rest[name_len..];
            if name.is_empty() {
                return Err(fail("missing node test"));
            }
            if name != "*" && !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
                return Err(fail("unsupported node test"));
            }

            let mut predicates = Vec::new();
            while let Some(r) = rest.strip_prefix('[') {
                let close = find_closing_bracket(r).ok_or_else(|| fail("unterminated predicate"))?;
                predicates.push(parse_predicate(&r[..close]).ok_or_else(|| fail("unsupported predicate"))?);
                rest = &r[close + 1..];
            }

            steps.push(Step {
                descendant,
                name: name.to_ascii_lowercase(),
                predicates,
            });
        }
        Ok(XPath { steps })
    }

    /// Matching elements in document order.
    pub fn evaluate(&self, doc: &Document) -> Vec<NodeId> {
        let mut context = vec![Document::ROOT];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in &context {
                let mut parents = vec![*node];
                if step.descendant {
                    parents.extend(doc.descendants(*node));
                }
                for parent in parents {
                    let mut candidates: Vec<NodeId> = doc
                        .element_children(parent)
                        .into_iter()
                        .filter(|child| {
                            step.name == "*" || doc.tag(*child) == Some(step.name.as_str())
                        })
                        .collect();
                    for predicate in &step.predicates {
                        candidates = match predicate {
                            Predicate::Position(n) => {
                                candidates.get(n - 1).copied().into_iter().collect()
                            }
                            Predicate::All(conditions) => candidates
                                .into_iter()
                                .filter(|c| conditions.iter().all(|cond| cond.test(doc, *c)))
                                .collect(),
                        };
                    }
                    next.extend(candidates);
                }
            }
            next.sort();
            next.dedup();
            context = next;
        }
        context
    }
}

fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(body: &str) -> Option<Predicate> {
    let body = body.trim();
    if let Ok(n) = body.parse::<usize>() {
        return (n >= 1).then_some(Predicate::Position(n));
    }
    let conditions = split_and(body)
        .into_iter()
        .map(parse_condition)
        .collect::<Option<Vec<_>>>()?;
    Some(Predicate::All(conditions))
}

fn split_and(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut skip_until = 0;
    for (i, c) in body.char_indices() {
        if i < skip_until {
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if body[i..].starts_with(" and ") => {
                parts.push(body[start..i].trim());
                start = i + " and ".len();
                skip_until = start;
            }
            None => {}
        }
    }
    parts.push(body[start..].trim());
    parts
}

fn parse_operand(raw: &str) -> Option<Operand> {
    let raw = raw.trim();
    match raw {
        "text()" => Some(Operand::Text),
        "." | "normalize-space()" | "normalize-space(.)" => Some(Operand::StringValue),
        _ => raw
            .strip_prefix('@')
            .filter(|name| !name.is_empty())
            .map(|name| Operand::Attr(name.to_ascii_lowercase())),
    }
}

fn parse_literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let quote = raw.chars().next()?;
    if (quote == '\'' || quote == '"') && raw.len() >= 2 && raw.ends_with(quote) {
        Some(raw[1..raw.len() - 1].to_string())
    } else {
        None
    }
}

fn function_args<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    raw.strip_prefix(prefix).and_then(|r| r.strip_suffix(')'))
}

fn parse_condition(raw: &str) -> Option<Condition> {
    let raw = raw.trim();
    if let Some(args) = function_args(raw, "contains(") {
        let (operand, literal) = args.split_once(',')?;
        return Some(Condition::Contains(
            parse_operand(operand)?,
            parse_literal(literal)?,
        ));
    }
    if let Some(args) = function_args(raw, "starts-with(") {
        let (operand, literal) = args.split_once(',')?;
        return Some(Condition::StartsWith(
            parse_operand(operand)?,
            parse_literal(literal)?,
        ));
    }
    if let Some((left, right)) = raw.split_once('=') {
        return Some(Condition::Equals(
            parse_operand(left)?,
            parse_literal(right)?,
        ));
    }
    parse_operand(raw).map(Condition::Exists)
}

impl Condition {
    fn test(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Condition::Exists(operand) => match operand {
                Operand::Attr(name) => doc
                    .element(node)
                    .and_then(|el| el.attr(name))
                    .is_some(),
                Operand::Text => !doc.own_texts(node).is_empty(),
                Operand::StringValue => true,
            },
            Condition::Equals(operand, expected) => {
                values(doc, node, operand).iter().any(|v| v == expected)
            }
            Condition::Contains(operand, expected) => values(doc, node, operand)
                .iter()
                .any(|v| v.contains(expected.as_str())),
            Condition::StartsWith(operand, expected) => values(doc, node, operand)
                .iter()
                .any(|v| v.starts_with(expected.as_str())),
        }
    }
}

fn values(doc: &Document, node: NodeId, operand: &Operand) -> Vec<String> {
    match operand {
        Operand::Attr(name) => doc
            .element(node)
            .and_then(|el| el.attr(name))
            .map(|v| vec![v.to_string()])
            .unwrap_or_default(),
        Operand::Text => doc
            .own_texts(node)
            .into_iter()
            .map(str::to_string)
            .collect(),
        Operand::StringValue => {
            let text = doc.text_content(node);
            vec![text.split_whitespace().collect::<Vec<_>>().join(" ")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><body>
        <ul id="list"><li id="l1">One</li><li id="l2">Two</li></ul>
        <ul id="other"><li id="l3">Three</li><li id="l4" class="x">Four items</li></ul>
        <form><input id="email" name="email" type="email"><button id="b">Send now</button></form>
    </body></html>"#;

    fn ids(expr: &str) -> Vec<String> {
        let doc = Document::parse(HTML);
        XPath::parse(expr)
            .unwrap()
            .evaluate(&doc)
            .into_iter()
            .filter_map(|n| doc.element(n).and_then(|el| el.attr("id")).map(String::from))
            .collect()
    }

    #[test]
    fn paths_and_positions() {
        assert_eq!(ids("//li[2]"), vec!["l2", "l4"]);
        assert_eq!(ids("/html/body/ul[2]/li[1]"), vec!["l3"]);
        assert_eq!(ids("//ul[@id='other']/*"), vec!["l3", "l4"]);
    }

    #[test]
    fn attribute_and_text_predicates() {
        assert_eq!(ids("//input[@name='email']"), vec!["email"]);
        assert_eq!(ids("//*[@class]"), vec!["l4"]);
        assert_eq!(ids("//li[text()='Two']"), vec!["l2"]);
        assert_eq!(ids("//li[contains(text(),'items')]"), vec!["l4"]);
        assert_eq!(ids("//button[contains(., 'Send')]"), vec!["b"]);
        assert_eq!(ids("//input[@type='email' and starts-with(@id,'em')]"), vec!["email"]);
    }

    #[test]
    fn invalid_expressions() {
        for bad in ["", "//li[", "//li[position()>1]", "//li/text()", "//li[0]"] {
            assert!(
                matches!(XPath::parse(bad), Err(DomError::InvalidXPath { .. })),
                "{bad}"
            );
        }
    }
}
