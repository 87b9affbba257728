//! Error types for schema construction and path resolution
//!
//! - [`SchemaError`]: malformed descriptors, reported once at build time
//! - [`ResolveError`]: a path that does not resolve against a schema

use schemata_value::{AttributePath, PathStep, StepError};

/// Malformed schema descriptor
///
/// Raised by the builders and by schema definition loading. Every variant
/// carries the path of the offending node (empty when the node was built
/// on its own, outside of any schema).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Neither or both of a value type and nested attributes
    #[error("attribute {path}: exactly one of a value type or nested attributes must be set")]
    TypeXorNested {
        /// Path of the offending node
        path: AttributePath,
    },

    /// `required` together with `optional`
    #[error("attribute {path}: required and optional are mutually exclusive")]
    RequiredAndOptional {
        /// Path of the offending node
        path: AttributePath,
    },

    /// None of `required`, `optional`, `computed`
    #[error("attribute {path}: one of required, optional or computed must be set")]
    MissingConstraint {
        /// Path of the offending node
        path: AttributePath,
    },

    /// Name used twice at one level (attribute/attribute, block/block or
    /// attribute/block)
    #[error("{name:?} is defined more than once under {path}")]
    DuplicateName {
        /// Path of the offending node
        path: AttributePath,
        /// Repeated name
        name: String,
    },

    /// Name that is not a lowercase identifier
    #[error("invalid name {name:?} under {path}: names must contain only lowercase alphanumeric characters or underscores")]
    InvalidName {
        /// Path of the offending node
        path: AttributePath,
        /// Rejected name
        name: String,
    },

    /// Block bounds with `min_items > max_items`
    #[error("block {path}: min_items ({min}) exceeds max_items ({max})")]
    InvalidItemBounds {
        /// Path of the offending node
        path: AttributePath,
        /// Declared minimum
        min: u64,
        /// Declared maximum
        max: u64,
    },

    /// Definition document could not be parsed
    #[error("invalid schema definition: {0}")]
    Definition(String),
}

impl SchemaError {
    /// Re-anchor the error under `parent`
    #[must_use]
    pub fn under(self, parent: &AttributePath) -> Self {
        match self {
            Self::TypeXorNested { path } => Self::TypeXorNested {
                path: parent.join(&path),
            },
            Self::RequiredAndOptional { path } => Self::RequiredAndOptional {
                path: parent.join(&path),
            },
            Self::MissingConstraint { path } => Self::MissingConstraint {
                path: parent.join(&path),
            },
            Self::DuplicateName { path, name } => Self::DuplicateName {
                path: parent.join(&path),
                name,
            },
            Self::InvalidName { path, name } => Self::InvalidName {
                path: parent.join(&path),
                name,
            },
            Self::InvalidItemBounds { path, min, max } => Self::InvalidItemBounds {
                path: parent.join(&path),
                min,
                max,
            },
            Self::Definition(reason) => Self::Definition(reason),
        }
    }
}

/// Path that does not resolve against a schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// A step could not be applied; resolution stopped there
    #[error(
        "cannot resolve {path}: {} step(s) remain unconsumed starting at {step}: {source}",
        .remaining.len()
    )]
    Step {
        /// Full path being resolved
        path: AttributePath,
        /// Steps applied successfully before the failure
        consumed: AttributePath,
        /// First step that failed
        step: PathStep,
        /// Unconsumed steps, the failing one included
        remaining: AttributePath,
        /// Underlying step failure
        source: StepError,
    },

    /// Path points inside a leaf attribute's value type
    #[error("path {path} leads inside an atomic attribute and has no attribute of its own")]
    PathInsideAtomicAttribute {
        /// Path of the offending node
        path: AttributePath,
    },

    /// Path points at a block, which is not an attribute
    #[error("path {path} leads to a block, not an attribute")]
    PathIsBlock {
        /// Path of the offending node
        path: AttributePath,
    },

    /// Path points at a node without a descriptor of its own (the schema
    /// root, one element of nested attributes or of a block)
    #[error("path {path} leads to a {node}, not an attribute")]
    PathIsNotAttribute {
        /// Path of the offending node
        path: AttributePath,
        /// Kind of node found instead
        node: &'static str,
    },

    /// Path does not point at a block
    #[error("path {path} does not lead to a block")]
    PathIsNotBlock {
        /// Path of the offending node
        path: AttributePath,
    },
}

impl ResolveError {
    /// Path that failed to resolve
    #[must_use]
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::Step { path, .. }
            | Self::PathInsideAtomicAttribute { path }
            | Self::PathIsBlock { path }
            | Self::PathIsNotAttribute { path, .. }
            | Self::PathIsNotBlock { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_prefixes_path() {
        let err = SchemaError::MissingConstraint {
            path: AttributePath::from_name("value"),
        }
        .under(&AttributePath::from_name("tags"));
        assert_eq!(err.to_string(), "attribute tags.value: one of required, optional or computed must be set");
    }

    #[test]
    fn step_error_counts_remaining_steps() {
        let path: AttributePath = "a.b.c".parse().unwrap();
        let err = ResolveError::Step {
            path: path.clone(),
            consumed: "a".parse().unwrap(),
            step: PathStep::AttributeName("b".into()),
            remaining: "b.c".parse().unwrap(),
            source: StepError::NoSuchAttribute {
                name: "b".into(),
                target: "object({})".into(),
            },
        };
        assert!(err.to_string().contains("2 step(s) remain unconsumed"));
        assert_eq!(err.path(), &path);
    }
}
