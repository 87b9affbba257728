//! Path expressions
//!
//! Provides [`PathExpression`], a pattern over [`AttributePath`]s that may
//! contain wildcards over list, set and map positions and `Parent` steps for
//! expressions written relative to some other path.

use std::fmt::{self, Display, Formatter};

use crate::path::{AttributePath, PathStep};
use crate::value::Value;

/// One step of a [`PathExpression`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionStep {
    /// Matches exactly this step
    Exact(PathStep),

    /// Any list index
    AnyElementKeyInt,

    /// Any map key
    AnyElementKeyString,

    /// Any set element
    AnyElementKeyValue,

    /// Any list index, map key or set element
    AnyElement,

    /// Step back to the parent of the preceding step
    Parent,
}

impl ExpressionStep {
    /// Check if this (resolved) step matches a concrete path step
    #[must_use]
    pub fn matches(&self, step: &PathStep) -> bool {
        match (self, step) {
            (Self::Exact(expected), actual) => expected == actual,
            (Self::AnyElementKeyInt, PathStep::ElementKeyInt(_))
            | (Self::AnyElementKeyString, PathStep::ElementKeyString(_))
            | (Self::AnyElementKeyValue, PathStep::ElementKeyValue(_))
            | (
                Self::AnyElement,
                PathStep::ElementKeyInt(_)
                | PathStep::ElementKeyString(_)
                | PathStep::ElementKeyValue(_),
            ) => true,
            _ => false,
        }
    }
}

impl Display for ExpressionStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(step) => write!(f, "{step}"),
            Self::AnyElementKeyInt => f.write_str("[*]"),
            Self::AnyElementKeyString => f.write_str("[\"*\"]"),
            Self::AnyElementKeyValue => f.write_str("[Value(*)]"),
            Self::AnyElement => f.write_str("[**]"),
            Self::Parent => f.write_str("<"),
        }
    }
}

/// Pattern over attribute paths
///
/// Root expressions are anchored at the schema root. Relative expressions
/// are anchored at a path supplied later through [`PathExpression::merge`],
/// typically the path of the attribute whose validator holds the expression.
///
/// # Examples
/// - `PathExpression::root().at_name("rules").at_any_list_index().at_name("port")`
/// - `PathExpression::relative().at_parent().at_name("password")`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathExpression {
    root: AttributePath,
    steps: Vec<ExpressionStep>,
    relative: bool,
}

impl PathExpression {
    /// Expression anchored at the root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Expression anchored at a path supplied by [`merge`](Self::merge)
    #[inline]
    #[must_use]
    pub fn relative() -> Self {
        Self {
            relative: true,
            ..Self::default()
        }
    }

    /// Expression that matches exactly one path
    #[inline]
    #[must_use]
    pub fn exact(path: &AttributePath) -> Self {
        Self {
            root: path.clone(),
            ..Self::default()
        }
    }

    /// Check if this expression still needs an anchor
    #[inline]
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Concrete path the steps start from
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> &AttributePath {
        &self.root
    }

    /// Steps after the anchor
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[ExpressionStep] {
        &self.steps
    }

    /// Append a step
    #[inline]
    #[must_use]
    pub fn step(mut self, step: ExpressionStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an exact attribute name
    #[inline]
    #[must_use]
    pub fn at_name(self, name: impl Into<String>) -> Self {
        self.step(ExpressionStep::Exact(PathStep::AttributeName(name.into())))
    }

    /// Append an exact list index
    #[inline]
    #[must_use]
    pub fn at_list_index(self, index: i64) -> Self {
        self.step(ExpressionStep::Exact(PathStep::ElementKeyInt(index)))
    }

    /// Append an exact map key
    #[inline]
    #[must_use]
    pub fn at_map_key(self, key: impl Into<String>) -> Self {
        self.step(ExpressionStep::Exact(PathStep::ElementKeyString(key.into())))
    }

    /// Append an exact set element
    #[inline]
    #[must_use]
    pub fn at_set_value(self, value: Value) -> Self {
        self.step(ExpressionStep::Exact(PathStep::ElementKeyValue(value)))
    }

    /// Append a wildcard over list indices
    #[inline]
    #[must_use]
    pub fn at_any_list_index(self) -> Self {
        self.step(ExpressionStep::AnyElementKeyInt)
    }

    /// Append a wildcard over map keys
    #[inline]
    #[must_use]
    pub fn at_any_map_key(self) -> Self {
        self.step(ExpressionStep::AnyElementKeyString)
    }

    /// Append a wildcard over set elements
    #[inline]
    #[must_use]
    pub fn at_any_set_value(self) -> Self {
        self.step(ExpressionStep::AnyElementKeyValue)
    }

    /// Append a wildcard over any collection element
    #[inline]
    #[must_use]
    pub fn at_any_element(self) -> Self {
        self.step(ExpressionStep::AnyElement)
    }

    /// Append a parent step
    #[inline]
    #[must_use]
    pub fn at_parent(self) -> Self {
        self.step(ExpressionStep::Parent)
    }

    /// Anchor a relative expression under `base`
    ///
    /// Root expressions are returned unchanged.
    #[must_use]
    pub fn merge(&self, base: &AttributePath) -> Self {
        if !self.relative {
            return self.clone();
        }
        Self {
            root: base.join(&self.root),
            steps: self.steps.clone(),
            relative: false,
        }
    }

    /// Collapse `Parent` steps
    ///
    /// A parent step removes the preceding step, or the last step of the
    /// anchor when no preceding step remains. Parents beyond the root are
    /// dropped.
    #[must_use]
    pub fn resolve(&self) -> Self {
        let mut root = self.root.steps().to_vec();
        let mut steps: Vec<ExpressionStep> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if *step == ExpressionStep::Parent {
                if steps.pop().is_none() {
                    root.pop();
                }
            } else {
                steps.push(step.clone());
            }
        }
        Self {
            root: AttributePath::new(root),
            steps,
            relative: self.relative,
        }
    }

    /// All steps of the resolved expression, anchor included
    fn resolved_steps(&self) -> Vec<ExpressionStep> {
        let resolved = self.resolve();
        resolved
            .root
            .steps()
            .iter()
            .cloned()
            .map(ExpressionStep::Exact)
            .chain(resolved.steps)
            .collect()
    }

    /// Check if `path` is matched exactly (same length, every step matching)
    #[must_use]
    pub fn matches(&self, path: &AttributePath) -> bool {
        let steps = self.resolved_steps();
        steps.len() == path.len() && prefix_matches(&steps, path)
    }

    /// Check if `path` is a strict prefix of some path this expression
    /// matches
    #[must_use]
    pub fn matches_parent(&self, path: &AttributePath) -> bool {
        let steps = self.resolved_steps();
        steps.len() > path.len() && prefix_matches(&steps, path)
    }
}

fn prefix_matches(steps: &[ExpressionStep], path: &AttributePath) -> bool {
    steps
        .iter()
        .zip(path.iter())
        .all(|(expected, actual)| expected.matches(actual))
}

impl Display for PathExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.relative {
            f.write_str("~")?;
        }
        write!(f, "{}", self.root)?;
        let mut first = self.root.is_empty();
        for step in &self.steps {
            if !first && matches!(step, ExpressionStep::Exact(PathStep::AttributeName(_))) {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<&AttributePath> for PathExpression {
    fn from(path: &AttributePath) -> Self {
        Self::exact(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> AttributePath {
        s.parse().unwrap()
    }

    #[test]
    fn exact_expression_matches_only_its_path() {
        let expr = PathExpression::exact(&path("a.b"));
        assert!(expr.matches(&path("a.b")));
        assert!(!expr.matches(&path("a")));
        assert!(!expr.matches(&path("a.b.c")));
    }

    #[test]
    fn wildcard_list_index() {
        let expr = PathExpression::root()
            .at_name("rules")
            .at_any_list_index()
            .at_name("port");
        assert!(expr.matches(&path("rules[0].port")));
        assert!(expr.matches(&path("rules[17].port")));
        assert!(!expr.matches(&path(r#"rules["x"].port"#)));
        assert!(!expr.matches(&path("rules[0].open")));
    }

    #[test]
    fn any_element_covers_all_collections() {
        let expr = PathExpression::root().at_name("c").at_any_element();
        assert!(expr.matches(&path("c[1]")));
        assert!(expr.matches(&path(r#"c["k"]"#)));
        assert!(expr.matches(&AttributePath::from_name("c").at_set_value(Value::bool(true))));
        assert!(!expr.matches(&path("c.d")));
    }

    #[test]
    fn matches_parent_for_strict_prefixes() {
        let expr = PathExpression::root()
            .at_name("rules")
            .at_any_list_index()
            .at_name("port");
        assert!(expr.matches_parent(&AttributePath::root()));
        assert!(expr.matches_parent(&path("rules")));
        assert!(expr.matches_parent(&path("rules[3]")));
        assert!(!expr.matches_parent(&path("rules[3].port")));
        assert!(!expr.matches_parent(&path("other")));
    }

    #[test]
    fn relative_merge_and_resolve() {
        let expr = PathExpression::relative().at_parent().at_name("password");
        let merged = expr.merge(&path("login.user"));
        assert!(!merged.is_relative());
        assert!(merged.matches(&path("login.password")));
        assert!(!merged.matches(&path("login.user.password")));
    }

    #[test]
    fn resolve_drops_parents_past_root() {
        let expr = PathExpression::root().at_parent().at_parent().at_name("x");
        assert!(expr.matches(&path("x")));
    }

    #[test]
    fn root_expression_ignores_merge() {
        let expr = PathExpression::root().at_name("x");
        assert_eq!(expr.merge(&path("a.b")), expr);
    }

    #[test]
    fn display() {
        let expr = PathExpression::root()
            .at_name("rules")
            .at_any_list_index()
            .at_name("port");
        assert_eq!(expr.to_string(), "rules[*].port");
        assert_eq!(
            PathExpression::relative().at_parent().at_name("x").to_string(),
            "~<.x"
        );
    }
}
