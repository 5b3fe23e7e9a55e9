//! Path expressions shared by the JSON and XML backends.
//!
//! A [`PathExpr`] is parsed once from a rule and walked by a backend, which
//! reports each selected node with its concrete [`Location`].

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Syntax family of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// `$.a[0]['b c']`
    Json,
    /// `/a/b[2]/@x`
    Xml,
}

/// One traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Named child, or any child when `name` is `None`. XML steps may carry
    /// a zero-based position among same-named siblings.
    Child {
        /// Key or element name
        name: Option<String>,
        /// Zero-based position
        position: Option<usize>,
    },
    /// Array element, or every element when `None`
    Index(Option<usize>),
    /// Named node at any depth below the current one
    Descendant(String),
    /// XML attribute
    Attribute(String),
    /// XML text content
    Text,
}

/// A parsed rule path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    syntax: Syntax,
    steps: Vec<Step>,
    source: String,
}

impl PathExpr {
    /// Parse a JSON path: `$`, `.k`, `['k']`, `[n]`, `[*]`, `.*`, `..k`.
    ///
    /// The leading `$` is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPath`] on malformed input.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_matcher::path::{PathExpr, Step};
    ///
    /// let path = PathExpr::parse_json("$.items[0]['first name']").unwrap();
    /// assert_eq!(path.steps().len(), 3);
    /// assert_eq!(path.steps()[1], Step::Index(Some(0)));
    /// ```
    pub fn parse_json(source: &str) -> Result<Self, ModelError> {
        let fail = |reason: &str| ModelError::invalid_path(source, reason);
        let rest = source.trim();
        let mut rest = rest.strip_prefix('$').unwrap_or(rest);
        let mut steps = Vec::new();
        let mut leading = true;
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("..") {
                let (name, tail) = if tail.starts_with('[') {
                    parse_quoted(tail).ok_or_else(|| fail("malformed descendant"))?
                } else {
                    split_name(tail)
                };
                if name.is_empty() || name == "*" {
                    return Err(fail("descendant needs a name"));
                }
                steps.push(Step::Descendant(name));
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('.') {
                let (name, tail) = split_name(tail);
                if name.is_empty() {
                    return Err(fail("empty key"));
                }
                steps.push(child_step(name));
                rest = tail;
            } else if rest.starts_with('[') {
                let (step, tail) = parse_bracket(rest).ok_or_else(|| fail("malformed bracket"))?;
                steps.push(step);
                rest = tail;
            } else if leading {
                let (name, tail) = split_name(rest);
                steps.push(child_step(name));
                rest = tail;
            } else {
                return Err(fail("expected '.' or '['"));
            }
            leading = false;
        }
        Ok(Self {
            syntax: Syntax::Json,
            steps,
            source: source.to_string(),
        })
    }

    /// Parse an XML path: `/a/b`, `*`, `//k`, `k[n]` (1-based), `@attr`,
    /// `text()`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPath`] on malformed input.
    pub fn parse_xml(source: &str) -> Result<Self, ModelError> {
        let fail = |reason: &str| ModelError::invalid_path(source, reason);
        let mut rest = source.trim();
        if !rest.starts_with('/') {
            return Err(fail("must start with '/'"));
        }
        let mut steps = Vec::new();
        while !rest.is_empty() {
            if matches!(steps.last(), Some(Step::Attribute(_) | Step::Text)) {
                return Err(fail("attribute and text() must be the last step"));
            }
            let descendant = rest.starts_with("//");
            rest = rest.trim_start_matches('/');
            let end = rest.find('/').unwrap_or(rest.len());
            let (token, tail) = rest.split_at(end);
            rest = tail;
            if token.is_empty() {
                return Err(fail("empty step"));
            }
            if descendant {
                if !is_xml_name(token) {
                    return Err(fail("descendant needs an element name"));
                }
                steps.push(Step::Descendant(token.to_string()));
                continue;
            }
            let step = if token == "text()" {
                Step::Text
            } else if let Some(attr) = token.strip_prefix('@') {
                if !is_xml_name(attr) {
                    return Err(fail("invalid attribute name"));
                }
                Step::Attribute(attr.to_string())
            } else {
                parse_element(token).ok_or_else(|| fail("invalid element step"))?
            };
            steps.push(step);
        }
        if steps.is_empty() {
            return Err(fail("no steps"));
        }
        Ok(Self {
            syntax: Syntax::Xml,
            steps,
            source: source.to_string(),
        })
    }

    /// Parse according to a syntax family.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPath`] on malformed input.
    pub fn parse(source: &str, syntax: Syntax) -> Result<Self, ModelError> {
        match syntax {
            Syntax::Json => Self::parse_json(source),
            Syntax::Xml => Self::parse_xml(source),
        }
    }

    /// Traversal steps.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Syntax family.
    #[must_use]
    pub const fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// The path as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether every step addresses at most one node.
    #[must_use]
    pub fn is_definite(&self) -> bool {
        self.steps.iter().all(|step| match step {
            Step::Child { name, .. } => name.is_some(),
            Step::Index(index) => index.is_some(),
            Step::Descendant(_) => false,
            Step::Attribute(_) | Step::Text => true,
        })
    }

    /// Bracketed rendering used by generated assertions: `['a'][0]['b']`.
    #[must_use]
    pub fn bracketed(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                Step::Child { name: Some(name), .. } => push_quoted(&mut out, name),
                Step::Child { name: None, .. } | Step::Index(None) => out.push_str("[*]"),
                Step::Index(Some(index)) => out.push_str(&format!("[{index}]")),
                Step::Descendant(name) => {
                    out.push_str("..");
                    push_quoted(&mut out, name);
                }
                Step::Attribute(name) => out.push_str(&format!("[@{name}]")),
                Step::Text => out.push_str("[text()]"),
            }
        }
        out
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn child_step(name: String) -> Step {
    if name == "*" {
        Step::Child {
            name: None,
            position: None,
        }
    } else {
        Step::Child {
            name: Some(name),
            position: None,
        }
    }
}

fn split_name(input: &str) -> (String, &str) {
    let end = input.find(['.', '[', ']']).unwrap_or(input.len());
    (input[..end].to_string(), &input[end..])
}

/// `['key']` or `["key"]`.
fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let inner = input.strip_prefix('[')?;
    let quote = inner.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &inner[1..];
    let close = body.find(quote)?;
    let tail = body[close + 1..].strip_prefix(']')?;
    Some((body[..close].to_string(), tail))
}

fn parse_bracket(input: &str) -> Option<(Step, &str)> {
    if let Some((name, tail)) = parse_quoted(input) {
        return Some((
            Step::Child {
                name: Some(name),
                position: None,
            },
            tail,
        ));
    }
    let inner = input.strip_prefix('[')?;
    let close = inner.find(']')?;
    let token = inner[..close].trim();
    let tail = &inner[close + 1..];
    if token == "*" {
        return Some((Step::Index(None), tail));
    }
    token.parse().ok().map(|index| (Step::Index(Some(index)), tail))
}

fn parse_element(token: &str) -> Option<Step> {
    let (name, position) = match token.find('[') {
        Some(open) => {
            let inner = token[open + 1..].strip_suffix(']')?;
            let position: usize = inner.trim().parse().ok()?;
            (&token[..open], Some(position.checked_sub(1)?))
        }
        None => (token, None),
    };
    if name == "*" {
        return Some(Step::Child {
            name: None,
            position,
        });
    }
    is_xml_name(name).then(|| Step::Child {
        name: Some(name.to_string()),
        position,
    })
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn push_quoted(out: &mut String, name: &str) {
    out.push_str("['");
    out.push_str(&name.replace('\'', "\\'"));
    out.push_str("']");
}

/// One segment of a concrete location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// JSON object key
    Key(String),
    /// JSON array index
    Index(usize),
    /// XML element with its one-based position among same-named siblings
    Element {
        /// Element name
        name: String,
        /// One-based position
        position: usize,
    },
    /// XML attribute
    Attribute(String),
    /// XML text content
    Text,
}

/// A concrete node address, rendered in the syntax of its backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    syntax: Syntax,
    segments: Vec<Segment>,
}

impl Location {
    /// The document root.
    #[must_use]
    pub const fn root(syntax: Syntax) -> Self {
        Self {
            syntax,
            segments: Vec::new(),
        }
    }

    /// This location extended by one segment.
    #[must_use]
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            syntax: self.syntax,
            segments,
        }
    }

    /// Segments from the root.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether `self` is `other` or one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.syntax == other.syntax && other.segments.starts_with(&self.segments)
    }

    /// Bracketed rendering used by generated assertions.
    #[must_use]
    pub fn bracketed(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => push_quoted(&mut out, key),
                Segment::Index(index) => out.push_str(&format!("[{index}]")),
                Segment::Element { name, .. } => push_quoted(&mut out, name),
                Segment::Attribute(name) => out.push_str(&format!("[@{name}]")),
                Segment::Text => out.push_str("[text()]"),
            }
        }
        out
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.syntax {
            Syntax::Json => {
                f.write_str("$")?;
                for segment in &self.segments {
                    match segment {
                        Segment::Key(key) if is_plain_key(key) => write!(f, ".{key}")?,
                        Segment::Key(key) => write!(f, "['{key}']")?,
                        Segment::Index(index) => write!(f, "[{index}]")?,
                        Segment::Element { name, .. } | Segment::Attribute(name) => {
                            write!(f, ".{name}")?;
                        }
                        Segment::Text => {}
                    }
                }
                Ok(())
            }
            Syntax::Xml => {
                if self.segments.is_empty() {
                    return f.write_str("/");
                }
                for segment in &self.segments {
                    match segment {
                        Segment::Element { name, position } if *position > 1 => {
                            write!(f, "/{name}[{position}]")?;
                        }
                        Segment::Element { name, .. } | Segment::Key(name) => {
                            write!(f, "/{name}")?;
                        }
                        Segment::Index(index) => write!(f, "[{}]", index + 1)?,
                        Segment::Attribute(name) => write!(f, "/@{name}")?,
                        Segment::Text => f.write_str("/text()")?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Step {
        Step::Child {
            name: Some(name.to_string()),
            position: None,
        }
    }

    #[test]
    fn test_parse_json_forms() {
        let path = PathExpr::parse_json("$.a['b c'][2][*].*..d").unwrap();
        assert_eq!(
            path.steps(),
            &[
                named("a"),
                named("b c"),
                Step::Index(Some(2)),
                Step::Index(None),
                Step::Child {
                    name: None,
                    position: None
                },
                Step::Descendant("d".to_string()),
            ]
        );
        assert!(!path.is_definite());
    }

    #[test]
    fn test_parse_json_without_root() {
        let path = PathExpr::parse_json("foo.bar").unwrap();
        assert_eq!(path.steps(), &[named("foo"), named("bar")]);
        assert!(PathExpr::parse_json("$").unwrap().steps().is_empty());
    }

    #[test]
    fn test_parse_json_errors() {
        for bad in ["$.", "$[", "$['a'", "$[x]", "$..", "$.a]"] {
            assert!(
                matches!(PathExpr::parse_json(bad), Err(ModelError::InvalidPath { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_parse_xml_forms() {
        let path = PathExpr::parse_xml("/test/*/complex[2]/text()").unwrap();
        assert_eq!(
            path.steps(),
            &[
                named("test"),
                Step::Child {
                    name: None,
                    position: None
                },
                Step::Child {
                    name: Some("complex".to_string()),
                    position: Some(1)
                },
                Step::Text,
            ]
        );
        let path = PathExpr::parse_xml("//duck/@type").unwrap();
        assert_eq!(
            path.steps(),
            &[
                Step::Descendant("duck".to_string()),
                Step::Attribute("type".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_xml_errors() {
        for bad in ["test/duck", "/", "/a/text()/b", "/a[0]", "/a/@", "/a//"] {
            assert!(PathExpr::parse_xml(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_bracketed() {
        let path = PathExpr::parse_json("$.foo3").unwrap();
        assert_eq!(path.bracketed(), "['foo3']");
        let path = PathExpr::parse_json("$.a[0].b").unwrap();
        assert_eq!(path.bracketed(), "['a'][0]['b']");
    }

    #[test]
    fn test_location_display() {
        let json = Location::root(Syntax::Json)
            .join(Segment::Key("a".to_string()))
            .join(Segment::Index(0))
            .join(Segment::Key("b c".to_string()));
        assert_eq!(json.to_string(), "$.a[0]['b c']");
        assert_eq!(json.bracketed(), "['a'][0]['b c']");

        let xml = Location::root(Syntax::Xml)
            .join(Segment::Element {
                name: "a".to_string(),
                position: 1,
            })
            .join(Segment::Element {
                name: "b".to_string(),
                position: 2,
            })
            .join(Segment::Attribute("x".to_string()));
        assert_eq!(xml.to_string(), "/a/b[2]/@x");
        assert_eq!(Location::root(Syntax::Xml).to_string(), "/");
    }

    #[test]
    fn test_location_prefix() {
        let parent = Location::root(Syntax::Json).join(Segment::Key("a".to_string()));
        let child = parent.join(Segment::Index(1));
        assert!(parent.is_prefix_of(&child));
        assert!(child.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
    }
}
