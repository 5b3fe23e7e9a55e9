//! XML matching backend.
//!
//! Only explicit rules are evaluated: the contract template documents the
//! payload and supplies expected values to `Equality` rules, it does not
//! produce implicit checks.

use super::{MatchContext, PreparedStrategy};
use crate::error::{MatchError, ModelError};
use crate::path::{Location, PathExpr, Segment, Step, Syntax};
use crate::rule::MatchingRule;
use crate::strategy::MatchingStrategy;
use crate::verdict::MatchVerdict;
use roxmltree::{Document, Node};
use serde_json::Value as JsonValue;
use tracing::{instrument, warn};

/// A node selected by an XML path.
#[derive(Debug, Clone)]
pub enum XmlHit<'a, 'input> {
    /// Element; its value is its descendant text
    Element(Node<'a, 'input>),
    /// Attribute of an element
    Attribute {
        /// Owning element
        element: Node<'a, 'input>,
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
    /// Direct text content of an element
    Text(Node<'a, 'input>),
}

impl XmlHit<'_, '_> {
    /// Concrete location of the hit.
    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::Element(node) => element_location(*node),
            Self::Attribute { element, name, .. } => {
                element_location(*element).join(Segment::Attribute(name.clone()))
            }
            Self::Text(node) => element_location(*node).join(Segment::Text),
        }
    }

    /// Extracted scalar.
    #[must_use]
    pub fn value(&self, trim: bool) -> String {
        let raw: String = match self {
            Self::Element(node) => node
                .descendants()
                .filter(Node::is_text)
                .filter_map(|n| n.text())
                .collect(),
            Self::Attribute { value, .. } => return value.clone(),
            Self::Text(node) => node
                .children()
                .filter(Node::is_text)
                .filter_map(|n| n.text())
                .collect(),
        };
        if trim { raw.trim().to_string() } else { raw }
    }
}

/// Every node of `doc` selected by an XML path.
#[must_use]
pub fn select<'a, 'input>(path: &PathExpr, doc: &'a Document<'input>) -> Vec<XmlHit<'a, 'input>> {
    let mut current = vec![doc.root()];
    for step in path.steps() {
        match step {
            Step::Child { name, position } => {
                current = current
                    .iter()
                    .flat_map(|node| child_elements(*node, name.as_deref(), *position))
                    .collect();
            }
            Step::Descendant(name) => {
                let mut next: Vec<Node<'a, 'input>> = Vec::new();
                for node in &current {
                    for found in node
                        .descendants()
                        .filter(|d| d != node && d.is_element() && d.tag_name().name() == name.as_str())
                    {
                        if !next.contains(&found) {
                            next.push(found);
                        }
                    }
                }
                current = next;
            }
            Step::Attribute(name) => {
                return current
                    .into_iter()
                    .filter_map(|element| {
                        element.attribute(name.as_str()).map(|value| XmlHit::Attribute {
                            element,
                            name: name.clone(),
                            value: value.to_string(),
                        })
                    })
                    .collect();
            }
            Step::Text => return current.into_iter().map(XmlHit::Text).collect(),
            Step::Index(_) => current.clear(),
        }
    }
    current.into_iter().map(XmlHit::Element).collect()
}

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: Option<&str>,
    position: Option<usize>,
) -> Vec<Node<'a, 'input>> {
    let matching: Vec<Node<'a, 'input>> = node
        .children()
        .filter(|c| c.is_element() && name.is_none_or(|name| c.tag_name().name() == name))
        .collect();
    match position {
        Some(index) => matching.get(index).copied().into_iter().collect(),
        None => matching,
    }
}

fn element_location(node: Node<'_, '_>) -> Location {
    let mut chain: Vec<Node<'_, '_>> = std::iter::successors(Some(node), Node::parent)
        .filter(Node::is_element)
        .collect();
    chain.reverse();
    chain.into_iter().fold(Location::root(Syntax::Xml), |location, element| {
        location.join(Segment::Element {
            name: element.tag_name().name().to_string(),
            position: sibling_position(element),
        })
    })
}

/// One-based position among same-named element siblings.
fn sibling_position(node: Node<'_, '_>) -> usize {
    let name = node.tag_name().name();
    node.parent().map_or(1, |parent| {
        parent
            .children()
            .filter(|s| s.is_element() && s.tag_name().name() == name)
            .take_while(|s| *s != node)
            .count()
            + 1
    })
}

/// Match an observed XML document against explicit rules.
///
/// Every node selected by a rule must satisfy it. A `Null` rule holds when
/// nothing is selected or the selected nodes are empty.
#[instrument(skip_all, fields(scope = %ctx.scope, rules = rules.len()))]
pub fn match_xml(
    observed: &str,
    template: Option<&str>,
    rules: &[MatchingRule],
    ctx: &MatchContext<'_>,
) -> MatchVerdict {
    let mut verdict = MatchVerdict::exact();
    let doc = match Document::parse(observed) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "Observed XML is malformed");
            ctx.record(&mut verdict, "/", MatchError::malformed(err.to_string()));
            return verdict;
        }
    };
    let template_doc = template.map(Document::parse);
    let trim = ctx.config.trim_xml_text;

    for rule in rules {
        let path = match PathExpr::parse_xml(&rule.path) {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %rule.path, error = %err, "Invalid rule path");
                ctx.record(&mut verdict, rule.path.clone(), err.into());
                continue;
            }
        };
        let prepared = match PreparedStrategy::new(&rule.strategy, ctx.config) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(path = %rule.path, error = %err, "Invalid rule strategy");
                ctx.record(&mut verdict, rule.path.clone(), err.into());
                continue;
            }
        };
        let is_null = rule.strategy == MatchingStrategy::Null;
        let hits = select(&path, &doc);
        if hits.is_empty() {
            if let Err(err) = prepared.check(None, None, &rule.path, ctx) {
                ctx.record(&mut verdict, rule.path.clone(), err);
            }
            continue;
        }
        for hit in hits {
            let location = hit.location();
            let location_text = location.to_string();
            let text = hit.value(trim);
            let observed_value = if is_null && text.is_empty() {
                None
            } else {
                Some(JsonValue::String(text))
            };
            let expected = if rule.strategy == MatchingStrategy::Equality {
                match template_value(template_doc.as_ref(), &path, &location, trim) {
                    Ok(expected) => expected,
                    Err(err) => {
                        ctx.record(&mut verdict, location_text, err.into());
                        continue;
                    }
                }
            } else {
                None
            };
            if let Err(err) =
                prepared.check(expected.as_ref(), observed_value.as_ref(), &location_text, ctx)
            {
                ctx.record(&mut verdict, location_text, err);
            }
        }
    }
    verdict
}

/// Template value at the same concrete location, if the template has one.
fn template_value(
    template: Option<&Result<Document<'_>, roxmltree::Error>>,
    path: &PathExpr,
    location: &Location,
    trim: bool,
) -> Result<Option<JsonValue>, ModelError> {
    match template {
        None => Ok(None),
        Some(Err(err)) => Err(ModelError::unresolvable(format!(
            "contract XML template is malformed: {err}"
        ))),
        Some(Ok(doc)) => Ok(select(path, doc)
            .into_iter()
            .find(|hit| hit.location() == *location)
            .map(|hit| JsonValue::String(hit.value(trim)))),
    }
}
