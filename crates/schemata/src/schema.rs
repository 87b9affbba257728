//! Resource schemas
//!
//! A [`Schema`] is the root of the descriptor tree: top-level attributes
//! and blocks, a version and documentation. Descriptors are owned by their
//! parent map, so the tree has no back-references and is immutable once
//! built.

use indexmap::IndexMap;
use schemata_value::{AttributePath, PathStep, StepError, Type};

use crate::attribute::{Attribute, IntoAttribute};
use crate::block::{Block, Blocks, IntoBlock};
use crate::error::SchemaError;
use crate::nested::Attributes;
use crate::resolve::{apply_member_step, member_object_type, SchemaNode};

/// Root schema descriptor
///
/// Equality compares shape only; see [`Attribute`].
///
/// # Example
///
/// ```rust
/// use schemata::{Attribute, NestingMode, Schema};
/// use schemata_value::Type;
///
/// let schema = Schema::builder()
///     .attribute("name", Attribute::builder().ty(Type::String).required().build()?)
///     .attribute(
///         "tags",
///         Attribute::builder()
///             .nested(
///                 NestingMode::Map,
///                 [("value", Attribute::builder().ty(Type::String).optional().build()?)],
///             )
///             .optional()
///             .build()?,
///     )
///     .build()?;
///
/// let path = r#"tags["env"].value"#.parse()?;
/// assert_eq!(schema.type_at_path(&path)?, Type::String);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    version: i64,
    attributes: Attributes,
    blocks: Blocks,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
}

impl Schema {
    /// Start building a schema
    #[inline]
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Schema version, bumped when stored state must be upgraded
    #[inline]
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Top-level attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Top-level blocks
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    /// Top-level attribute by name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Top-level block by name
    #[inline]
    #[must_use]
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    /// Plain-text description
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Markdown description
    #[inline]
    #[must_use]
    pub fn markdown_description(&self) -> Option<&str> {
        self.markdown_description.as_deref()
    }

    /// Deprecation message for the whole resource
    #[inline]
    #[must_use]
    pub fn deprecation_message(&self) -> Option<&str> {
        self.deprecation_message.as_deref()
    }

    /// Object type of a whole resource value
    #[must_use]
    pub fn ty(&self) -> Type {
        member_object_type(&self.attributes, &self.blocks)
    }

    /// Apply one step at the root
    ///
    /// The step must be a name; attributes are looked up before blocks.
    ///
    /// # Errors
    /// Returns error if the step is not a name or the name is unknown
    pub fn apply_path_step(&self, step: &PathStep) -> Result<SchemaNode<'_>, StepError> {
        apply_member_step(&self.attributes, &self.blocks, step)
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    version: i64,
    attributes: Members<Attribute>,
    blocks: Members<Block>,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
}

impl SchemaBuilder {
    /// Set version
    #[must_use]
    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Add a top-level attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, attribute: impl IntoAttribute) -> Self {
        self.attributes.push((name.into(), attribute.into_attribute()));
        self
    }

    /// Add a top-level block
    #[must_use]
    pub fn block(mut self, name: impl Into<String>, block: impl IntoBlock) -> Self {
        self.blocks.push((name.into(), block.into_block()));
        self
    }

    /// Set description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set markdown description
    #[must_use]
    pub fn markdown_description(mut self, description: impl Into<String>) -> Self {
        self.markdown_description = Some(description.into());
        self
    }

    /// Mark the resource deprecated
    #[must_use]
    pub fn deprecation_message(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = Some(message.into());
        self
    }

    /// Attribute added so far, for attaching behaviour
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .rev()
            .find(|(n, _)| n == name)
            .and_then(|(_, attribute)| attribute.as_mut().ok())
    }

    /// Block added so far, for attaching behaviour
    pub fn block_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks
            .iter_mut()
            .rev()
            .find(|(n, _)| n == name)
            .and_then(|(_, block)| block.as_mut().ok())
    }

    /// Build the schema
    ///
    /// # Errors
    /// Returns error if a top-level name is invalid, repeated or used by
    /// both an attribute and a block
    pub fn build(self) -> Result<Schema, SchemaError> {
        let root = AttributePath::root();
        let attributes = index_by_name(self.attributes, &root)?;
        let blocks = index_by_name(self.blocks, &root)?;
        check_disjoint(&attributes, &blocks, &root)?;

        tracing::debug!(
            version = self.version,
            attributes = attributes.len(),
            blocks = blocks.len(),
            "Schema built"
        );

        Ok(Schema {
            version: self.version,
            attributes,
            blocks,
            description: self.description,
            markdown_description: self.markdown_description,
            deprecation_message: self.deprecation_message,
        })
    }
}

/// Check a member name: non-empty lowercase alphanumerics or underscores
pub(crate) fn check_name(name: &str, path: &AttributePath) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            path: path.clone(),
            name: name.to_string(),
        })
    }
}

/// Members collected by a builder, each already built or failed
pub(crate) type Members<T> = Vec<(String, Result<T, SchemaError>)>;

/// Index named members, rejecting invalid and repeated names
///
/// A member that failed to build is reported under its own name.
pub(crate) fn index_by_name<T>(
    entries: Members<T>,
    path: &AttributePath,
) -> Result<IndexMap<String, T>, SchemaError> {
    let mut indexed = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        check_name(&name, path)?;
        let entry = entry.map_err(|e| e.under(&path.at_name(name.as_str())))?;
        if indexed.contains_key(&name) {
            return Err(SchemaError::DuplicateName {
                path: path.clone(),
                name,
            });
        }
        indexed.insert(name, entry);
    }
    Ok(indexed)
}

/// Attribute and block names must not overlap
pub(crate) fn check_disjoint(
    attributes: &Attributes,
    blocks: &Blocks,
    path: &AttributePath,
) -> Result<(), SchemaError> {
    match blocks.keys().find(|name| attributes.contains_key(*name)) {
        Some(name) => Err(SchemaError::DuplicateName {
            path: path.clone(),
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockNesting;

    fn name() -> Attribute {
        Attribute::builder()
            .ty(Type::String)
            .required()
            .build()
            .unwrap()
    }

    #[test]
    fn names_must_be_lowercase_identifiers() {
        for bad in ["", "Name", "with-dash", "spa ce"] {
            let err = Schema::builder().attribute(bad, name()).build().unwrap_err();
            assert!(matches!(err, SchemaError::InvalidName { .. }), "{bad:?}");
        }
        assert!(Schema::builder().attribute("name_2", name()).build().is_ok());
    }

    #[test]
    fn duplicate_attribute_rejected() {
        let err = Schema::builder()
            .attribute("name", name())
            .attribute("name", name())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateName {
                path: AttributePath::root(),
                name: "name".into()
            }
        );
    }

    #[test]
    fn attribute_block_overlap_rejected() {
        let err = Schema::builder()
            .attribute("rule", name())
            .block("rule", Block::builder(BlockNesting::List).build().unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { .. }));
    }

    #[test]
    fn root_type_covers_attributes_and_blocks() {
        let schema = Schema::builder()
            .attribute("name", name())
            .block(
                "rule",
                Block::builder(BlockNesting::List)
                    .attribute("port", name())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(
            schema.ty(),
            Type::object([
                ("name", Type::String),
                ("rule", Type::list(Type::object([("port", Type::String)]))),
            ])
        );
    }

    #[test]
    fn root_rejects_element_steps() {
        let schema = Schema::builder().attribute("name", name()).build().unwrap();
        let err = schema
            .apply_path_step(&PathStep::ElementKeyInt(0))
            .unwrap_err();
        assert!(matches!(err, StepError::UnexpectedStep { .. }));
        let err = schema
            .apply_path_step(&PathStep::AttributeName("missing".into()))
            .unwrap_err();
        assert!(matches!(err, StepError::NoSuchAttribute { .. }));
    }

    #[test]
    fn nested_builder_errors_carry_full_path() {
        use crate::nested::NestingMode;

        // A block member missing its constraint
        let err = Schema::builder()
            .block(
                "disk",
                Block::builder(BlockNesting::List).block(
                    "mount",
                    Block::builder(BlockNesting::Single)
                        .attribute("path", Attribute::builder().ty(Type::String)),
                ),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingConstraint {
                path: "disk.mount.path".parse().unwrap()
            }
        );

        // A repeated name inside a nested group
        let err = Schema::builder()
            .attribute(
                "env",
                Attribute::builder().optional().nested(
                    NestingMode::Map,
                    [("value", name()), ("value", name())],
                ),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateName {
                path: "env".parse().unwrap(),
                name: "value".into()
            }
        );

        // Bounds of a nested block
        let err = Schema::builder()
            .block(
                "rule",
                Block::builder(BlockNesting::List).min_items(3).max_items(1),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "block rule: min_items (3) exceeds max_items (1)");
    }

    #[test]
    fn failed_members_are_not_exposed_for_behaviour() {
        let mut builder = Schema::builder().attribute("bad", Attribute::builder());
        assert!(builder.attribute_mut("bad").is_none());
        assert!(builder.build().is_err());
    }

    #[test]
    fn builder_exposes_attributes_for_behaviour() {
        let mut builder = Schema::builder().attribute("name", name());
        assert!(builder.attribute_mut("name").is_some());
        assert!(builder.attribute_mut("other").is_none());
        assert!(builder.block_mut("name").is_none());
    }
}
