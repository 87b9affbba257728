//! Attribute paths for addressing within value trees
//!
//! Provides [`PathStep`] and [`AttributePath`] for hierarchical addressing of
//! nodes within typed values, and the [`StepError`] reported when a step
//! cannot be applied to a node.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::value::Value;

/// One addressing operation within a value tree
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// Object attribute or schema field, by name
    AttributeName(String),

    /// List element, by index
    ElementKeyInt(i64),

    /// Map element, by key
    ElementKeyString(String),

    /// Set element, by its full value
    ElementKeyValue(Value),
}

impl PathStep {
    /// Kind of this step
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            Self::AttributeName(_) => StepKind::AttributeName,
            Self::ElementKeyInt(_) => StepKind::ElementKeyInt,
            Self::ElementKeyString(_) => StepKind::ElementKeyString,
            Self::ElementKeyValue(_) => StepKind::ElementKeyValue,
        }
    }

    /// Attribute name, if this is a name step
    #[inline]
    #[must_use]
    pub fn as_attribute_name(&self) -> Option<&str> {
        match self {
            Self::AttributeName(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for PathStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeName(name) => write!(f, "{name}"),
            Self::ElementKeyInt(index) => write!(f, "[{index}]"),
            Self::ElementKeyString(key) => {
                f.write_str("[\"")?;
                for c in key.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"]")
            }
            Self::ElementKeyValue(value) => write!(f, "[Value({value})]"),
        }
    }
}

/// Discriminant of a [`PathStep`], used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// [`PathStep::AttributeName`]
    AttributeName,

    /// [`PathStep::ElementKeyInt`]
    ElementKeyInt,

    /// [`PathStep::ElementKeyString`]
    ElementKeyString,

    /// [`PathStep::ElementKeyValue`]
    ElementKeyValue,
}

impl Display for StepKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AttributeName => "an attribute name",
            Self::ElementKeyInt => "a list index",
            Self::ElementKeyString => "a map key",
            Self::ElementKeyValue => "a set element value",
        };
        f.write_str(text)
    }
}

/// Path within a value tree
///
/// An ordered sequence of [`PathStep`]s starting at the root of a schema
/// or value. The empty path addresses the root itself.
///
/// # Examples
/// - `name` → one attribute-name step
/// - `tags["env"].value` → name, map key, name
/// - `rule[0].port` → name, list index, name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributePath(Vec<PathStep>);

impl AttributePath {
    /// Create new path from steps
    #[inline]
    #[must_use]
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path consisting of a single attribute name
    #[inline]
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        Self(vec![PathStep::AttributeName(name.into())])
    }

    /// Get path steps
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Get number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, init)| Self(init.to_vec()))
    }

    /// Get last step (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// Append a step, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, step: PathStep) -> Self {
        let mut new = self.clone();
        new.0.push(step);
        new
    }

    /// Append an attribute name step
    #[inline]
    #[must_use]
    pub fn at_name(&self, name: impl Into<String>) -> Self {
        self.child(PathStep::AttributeName(name.into()))
    }

    /// Append a list index step
    #[inline]
    #[must_use]
    pub fn at_list_index(&self, index: i64) -> Self {
        self.child(PathStep::ElementKeyInt(index))
    }

    /// Append a map key step
    #[inline]
    #[must_use]
    pub fn at_map_key(&self, key: impl Into<String>) -> Self {
        self.child(PathStep::ElementKeyString(key.into()))
    }

    /// Append a set element step
    #[inline]
    #[must_use]
    pub fn at_set_value(&self, value: Value) -> Self {
        self.child(PathStep::ElementKeyValue(value))
    }

    /// Extend with the steps of another path
    #[inline]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is an ancestor of another (strict prefix)
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Get common prefix of two paths
    #[inline]
    #[must_use]
    pub fn common_prefix(&self, other: &Self) -> Self {
        let common: Vec<_> = self
            .0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.clone())
            .collect();
        Self(common)
    }

    /// Get relative path from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not a descendant of `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over steps from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PathStep> {
        self.0.iter()
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 && matches!(step, PathStep::AttributeName(_)) {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for AttributePath {
    type Err = PathError;

    /// Parses `name`, `.name`, `[index]` and `["key"]` steps.
    ///
    /// Set element steps have no textual form and must be built in code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse()
    }
}

impl From<Vec<PathStep>> for AttributePath {
    fn from(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }
}

impl<'a> IntoIterator for &'a AttributePath {
    type Item = &'a PathStep;
    type IntoIter = std::slice::Iter<'a, PathStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

struct Parser<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(input: &'s str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn parse(mut self) -> Result<AttributePath, PathError> {
        let mut steps = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '[' => {
                    self.bump();
                    steps.push(self.element_key()?);
                }
                '.' if !steps.is_empty() => {
                    self.bump();
                    steps.push(PathStep::AttributeName(self.name()?));
                }
                _ if steps.is_empty() => steps.push(PathStep::AttributeName(self.name()?)),
                other => {
                    return Err(PathError::UnexpectedCharacter {
                        position: self.pos,
                        found: other,
                    })
                }
            }
        }
        Ok(AttributePath(steps))
    }

    fn name(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' {
                break;
            }
            self.bump();
        }
        let name = &self.input[start..self.pos];
        if name.is_empty() {
            Err(PathError::EmptySegment)
        } else if name.contains(|c: char| !c.is_alphanumeric() && c != '_') {
            Err(PathError::InvalidSegment(name.to_string()))
        } else {
            Ok(name.to_string())
        }
    }

    fn element_key(&mut self) -> Result<PathStep, PathError> {
        if self.peek() == Some('"') {
            self.bump();
            let mut key = String::new();
            loop {
                match self.bump() {
                    Some('"') => break,
                    Some('\\') => match self.bump() {
                        Some(escaped) => key.push(escaped),
                        None => return Err(PathError::UnterminatedKey),
                    },
                    Some(c) => key.push(c),
                    None => return Err(PathError::UnterminatedKey),
                }
            }
            self.expect(']')?;
            return Ok(PathStep::ElementKeyString(key));
        }

        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ']' {
                break;
            }
            self.bump();
        }
        let raw = &self.input[start..self.pos];
        self.expect(']')?;
        raw.parse::<i64>()
            .map(PathStep::ElementKeyInt)
            .map_err(|_| PathError::InvalidIndex(raw.to_string()))
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(found) => Err(PathError::UnexpectedCharacter {
                position: self.pos - found.len_utf8(),
                found,
            }),
            None => Err(PathError::UnterminatedKey),
        }
    }
}

/// Errors related to attribute paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Bracketed key without closing quote or bracket
    #[error("unterminated element key")]
    UnterminatedKey,

    /// Bracketed index that is not an integer
    #[error("invalid list index: {0:?}")]
    InvalidIndex(String),

    /// Character that cannot start or continue a step
    #[error("unexpected character {found:?} at position {position}")]
    UnexpectedCharacter {
        /// Byte offset into the input
        position: usize,
        /// Offending character
        found: char,
    },

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant {
        /// Candidate descendant
        path: String,
        /// Expected ancestor
        ancestor: String,
    },
}

/// Failure to apply a single [`PathStep`] to a type, value or schema node
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    /// Step kind does not fit the node's collection kind
    #[error("cannot apply step {step} to {target}: expected {expected}")]
    UnexpectedStep {
        /// Step that was applied
        step: PathStep,
        /// Node the step was applied to
        target: String,
        /// Step kind the node accepts
        expected: StepKind,
    },

    /// Node has no children at all
    #[error("cannot apply step {step} to {target}: it has no nested elements")]
    NotComposite {
        /// Step that was applied
        step: PathStep,
        /// Node the step was applied to
        target: String,
    },

    /// Attribute name not present
    #[error("attribute {name:?} not found in {target}")]
    NoSuchAttribute {
        /// Requested attribute name
        name: String,
        /// Object that lacks it
        target: String,
    },

    /// Negative list index
    #[error("invalid list index {index}")]
    NegativeIndex {
        /// Requested index
        index: i64,
    },

    /// Element key not present in a concrete collection
    #[error("no element at step {step}")]
    ElementNotFound {
        /// Step naming the missing element
        step: PathStep,
    },

    /// Step applied to a null value
    #[error("cannot apply step {step} to a null value")]
    NullValue {
        /// Step that was applied
        step: PathStep,
    },

    /// Step applied to an unknown value
    #[error("cannot apply step {step} to an unknown value")]
    UnknownValue {
        /// Step that was applied
        step: PathStep,
    },
}

impl StepError {
    /// Whether the failure was caused by a null or unknown parent or an
    /// absent element, rather than by the shape of the tree
    #[inline]
    #[must_use]
    pub fn is_missing_value(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::NullValue { .. } | Self::UnknownValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributePath {
        AttributePath::from_name("tags")
            .at_map_key("env")
            .at_name("value")
    }

    #[test]
    fn path_root() {
        let path = AttributePath::root();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert!(path.parent().is_none());
    }

    #[test]
    fn path_builders_and_steps() {
        let path = sample();
        assert_eq!(path.len(), 3);
        assert_eq!(
            path.steps(),
            &[
                PathStep::AttributeName("tags".into()),
                PathStep::ElementKeyString("env".into()),
                PathStep::AttributeName("value".into()),
            ]
        );
    }

    #[test]
    fn path_parent_and_last() {
        let path = sample();
        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string(), r#"tags["env"]"#);
        assert_eq!(path.last(), Some(&PathStep::AttributeName("value".into())));
    }

    #[test]
    fn path_prefix_relations() {
        let full = sample();
        let tags = AttributePath::from_name("tags");
        assert!(tags.is_prefix_of(&full));
        assert!(tags.is_ancestor_of(&full));
        assert!(!full.is_ancestor_of(&full));
        assert!(full.is_prefix_of(&full));
        assert!(!full.is_prefix_of(&tags));
    }

    #[test]
    fn path_common_prefix_and_relative() {
        let a = AttributePath::from_name("rule").at_list_index(0).at_name("port");
        let b = AttributePath::from_name("rule").at_list_index(1).at_name("port");
        assert_eq!(a.common_prefix(&b), AttributePath::from_name("rule"));

        let rel = a.relative_to(&AttributePath::from_name("rule")).unwrap();
        assert_eq!(rel.to_string(), "[0].port");

        assert!(matches!(
            a.relative_to(&AttributePath::from_name("other")),
            Err(PathError::NotDescendant { .. })
        ));
    }

    #[test]
    fn path_display() {
        assert_eq!(sample().to_string(), r#"tags["env"].value"#);
        assert_eq!(
            AttributePath::from_name("rule").at_list_index(2).to_string(),
            "rule[2]"
        );
        assert_eq!(
            AttributePath::from_name("ids")
                .at_set_value(Value::string("a"))
                .to_string(),
            r#"ids[Value("a")]"#
        );
    }

    #[test]
    fn path_from_str_roundtrips_display() {
        let parsed: AttributePath = r#"tags["env"].value"#.parse().unwrap();
        assert_eq!(parsed, sample());

        let parsed: AttributePath = "rule[0].port".parse().unwrap();
        assert_eq!(parsed.to_string(), "rule[0].port");
    }

    #[test]
    fn path_from_str_escaped_key() {
        let parsed: AttributePath = r#"labels["a\"b"]"#.parse().unwrap();
        assert_eq!(
            parsed.last(),
            Some(&PathStep::ElementKeyString("a\"b".into()))
        );
    }

    #[test]
    fn control_characters_in_keys_roundtrip() {
        for key in ["a\nb", "tab\there", "\u{1b}[0m", "quote\"back\\slash", ""] {
            let path = AttributePath::from_name("env").at_map_key(key);
            let text = path.to_string();
            let parsed: AttributePath = text.parse().unwrap();
            assert_eq!(parsed, path, "{text}");
        }
        assert_eq!(
            AttributePath::from_name("env").at_map_key("a\nb").to_string(),
            "env[\"a\nb\"]"
        );
    }

    #[test]
    fn path_from_str_empty() {
        let path: AttributePath = "".parse().unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn path_from_str_errors() {
        assert!(matches!(
            "a..b".parse::<AttributePath>(),
            Err(PathError::EmptySegment)
        ));
        assert!(matches!(
            "a.b-c".parse::<AttributePath>(),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(
            "a[x]".parse::<AttributePath>(),
            Err(PathError::InvalidIndex(_))
        ));
        assert!(matches!(
            r#"a["x"#.parse::<AttributePath>(),
            Err(PathError::UnterminatedKey)
        ));
    }

    #[test]
    fn step_kind_display() {
        assert_eq!(StepKind::ElementKeyInt.to_string(), "a list index");
        assert_eq!(PathStep::ElementKeyInt(3).kind(), StepKind::ElementKeyInt);
    }

    #[test]
    fn missing_value_classification() {
        let step = PathStep::ElementKeyInt(0);
        assert!(StepError::NullValue { step: step.clone() }.is_missing_value());
        assert!(!StepError::NegativeIndex { index: -1 }.is_missing_value());
    }
}
