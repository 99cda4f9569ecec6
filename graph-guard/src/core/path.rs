//! Property paths that locate a violation inside an object graph.

use super::value::Value;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a [`PropertyPath`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "segment", content = "value", rename_all = "snake_case")]
pub enum PathSegment {
    /// A bean property, rendered `name`
    Property(String),
    /// A position in an indexable container, rendered `[2]`
    Index(usize),
    /// The value stored under a key, rendered `[key]`
    Key(Value),
    /// A key of a map itself, rendered `[key].<map key>`
    MapKey(Value),
    /// An element of a container without stable positions, rendered `[]`
    Element,
    /// The content of an optional-like wrapper; not rendered
    Unwrapped,
}

impl PathSegment {
    /// Returns true for segments that address a container element.
    pub fn is_container_element(&self) -> bool {
        !matches!(self, PathSegment::Property(_))
    }
}

/// Ordered list of segments from the validated root to a value.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{PathSegment, PropertyPath};
///
/// let path = PropertyPath::parse("orders[2].lines[sku].qty").unwrap();
/// assert_eq!(path.len(), 5);
/// assert_eq!(path.to_string(), "orders[2].lines[sku].qty");
///
/// let wrapped = PropertyPath::root()
///     .property("nickname")
///     .child(PathSegment::Unwrapped);
/// assert_eq!(wrapped.to_string(), "nickname");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// The empty path, addressing the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path extended by `segment`.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// Returns a new path extended by a property segment.
    pub fn property(&self, name: impl Into<String>) -> Self {
        self.child(PathSegment::Property(name.into()))
    }

    /// Returns the segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &PropertyPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a == b)
    }

    /// Returns the name of the last property segment, if any.
    pub fn leaf_property(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            PathSegment::Property(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Parses `a.b[2].c[key]` notation.
    ///
    /// Bracketed digits become [`PathSegment::Index`], empty brackets become
    /// [`PathSegment::Element`], anything else in brackets becomes a text
    /// [`PathSegment::Key`]. A `.<map key>` suffix turns the preceding key into
    /// a [`PathSegment::MapKey`].
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| GuardError::InvalidPropertyPath {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = input;
        let mut expect_property = true;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                if expect_property && !segments.is_empty() {
                    return Err(invalid("empty property name"));
                }
                let end = after.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let inner = &after[..end];
                let segment = if inner.is_empty() {
                    PathSegment::Element
                } else if let Ok(index) = inner.parse::<usize>() {
                    PathSegment::Index(index)
                } else {
                    PathSegment::Key(Value::Text(inner.to_string()))
                };
                segments.push(segment);
                rest = &after[end + 1..];
                expect_property = false;
                continue;
            }

            if let Some(after) = rest.strip_prefix('.') {
                if expect_property {
                    return Err(invalid("empty property name"));
                }
                rest = after;
                if let Some(after_marker) = rest.strip_prefix("<map key>") {
                    match segments.pop() {
                        Some(PathSegment::Key(key)) => segments.push(PathSegment::MapKey(key)),
                        _ => return Err(invalid("'<map key>' must follow a key")),
                    }
                    rest = after_marker;
                    continue;
                }
                expect_property = true;
                continue;
            }

            if !expect_property {
                return Err(invalid("expected '.' or '[' between segments"));
            }
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let name = &rest[..end];
            segments.push(PathSegment::Property(name.to_string()));
            rest = &rest[end..];
            expect_property = false;
        }

        if expect_property && !segments.is_empty() {
            return Err(invalid("path ends with '.'"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_any = false;
        for segment in &self.segments {
            match segment {
                PathSegment::Property(name) => {
                    if wrote_any {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
                PathSegment::MapKey(key) => write!(f, "[{key}].<map key>")?,
                PathSegment::Element => f.write_str("[]")?,
                PathSegment::Unwrapped => continue,
            }
            wrote_any = true;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for PropertyPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_segment_kinds() {
        let path: PropertyPath = vec![
            PathSegment::Property("a".into()),
            PathSegment::Index(0),
            PathSegment::Property("b".into()),
            PathSegment::Key(Value::from("k")),
            PathSegment::Property("c".into()),
            PathSegment::Element,
            PathSegment::Property("d".into()),
            PathSegment::MapKey(Value::Int(3)),
        ]
        .into_iter()
        .collect();

        assert_eq!(path.to_string(), "a[0].b[k].c[].d[3].<map key>");
    }

    #[test]
    fn test_unwrapped_is_not_rendered() {
        let path = PropertyPath::root()
            .property("valueWithNotNull")
            .child(PathSegment::Unwrapped);
        assert_eq!(path.to_string(), "valueWithNotNull");
        assert_eq!(path.len(), 2);

        let nested = path.property("name");
        assert_eq!(nested.to_string(), "valueWithNotNull.name");
    }

    #[test]
    fn test_parse() {
        let path = PropertyPath::parse("a.b[2].c[key].d[]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Property("a".into()),
                PathSegment::Property("b".into()),
                PathSegment::Index(2),
                PathSegment::Property("c".into()),
                PathSegment::Key(Value::from("key")),
                PathSegment::Property("d".into()),
                PathSegment::Element,
            ]
        );
        assert_eq!(path.leaf_property(), Some("d"));
    }

    #[test]
    fn test_parse_map_key() {
        let path = PropertyPath::parse("tags[x].<map key>").unwrap();
        assert_eq!(path.segments()[1], PathSegment::MapKey(Value::from("x")));
        assert_eq!(path.to_string(), "tags[x].<map key>");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["a.", ".a", "a..b", "a[1", "a[1]b", "a.<map key>"] {
            let err = PropertyPath::parse(bad).unwrap_err();
            assert!(
                matches!(err, GuardError::InvalidPropertyPath { .. }),
                "expected error for {bad}"
            );
        }
        assert!(PropertyPath::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_bracket_after_dot_rejected() {
        for bad in ["a.[0]", "a.b.[]", "a[1].[key]"] {
            let err = PropertyPath::parse(bad).unwrap_err();
            assert!(
                matches!(err, GuardError::InvalidPropertyPath { ref reason, .. } if reason == "empty property name"),
                "expected error for {bad}"
            );
        }
        // a leading index still addresses a container root
        assert_eq!(
            PropertyPath::parse("[0].a").unwrap().segments()[0],
            PathSegment::Index(0)
        );
    }

    #[test]
    fn test_prefix() {
        let a = PropertyPath::parse("a").unwrap();
        let ab = PropertyPath::parse("a.b").unwrap();
        assert!(a.is_prefix_of(&ab));
        assert!(ab.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
        assert!(PropertyPath::root().is_prefix_of(&a));
    }
}
