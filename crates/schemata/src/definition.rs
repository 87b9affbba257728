//! Schema definitions
//!
//! Serializable mirror of the descriptor tree, for schemas kept in JSON or
//! YAML files. Definitions convert through the regular builders, so a file
//! gets exactly the checks a hand-built schema gets. Behaviour (validators,
//! plan modifiers) has no file form; attach it through
//! [`SchemaBuilder::attribute_mut`] and [`SchemaBuilder::block_mut`] after
//! conversion.
//!
//! # Example
//!
//! ```rust
//! use schemata::{SchemaDefinition, RequiresReplace};
//!
//! let yaml = r#"
//! attributes:
//!   name:
//!     type: string
//!     required: true
//!   tags:
//!     optional: true
//!     nested:
//!       nesting: map
//!       attributes:
//!         value: { type: string, optional: true }
//! "#;
//!
//! let mut builder = SchemaDefinition::from_yaml(yaml)?.into_builder()?;
//! if let Some(name) = builder.attribute_mut("name") {
//!     name.add_plan_modifier(RequiresReplace);
//! }
//! let schema = builder.build()?;
//! assert_eq!(schema.attributes().len(), 2);
//! # Ok::<(), schemata::SchemaError>(())
//! ```

use indexmap::IndexMap;
use schemata_value::{AttributePath, Type};
use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeKind};
use crate::block::{Block, BlockNesting};
use crate::error::SchemaError;
use crate::nested::NestingMode;
use crate::schema::{Schema, SchemaBuilder};

/// File form of a [`Schema`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    /// Schema version
    #[serde(default)]
    pub version: i64,

    /// Plain-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Markdown description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_description: Option<String>,

    /// Deprecation message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    /// Top-level attributes
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttributeDefinition>,

    /// Top-level blocks
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub blocks: IndexMap<String, BlockDefinition>,
}

/// File form of an [`Attribute`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDefinition {
    /// Leaf value type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<Type>,

    /// Nested group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedDefinition>,

    /// Must be configured
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// May be configured
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    /// May be set by the provider
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,

    /// Hidden from output
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,

    /// Plain-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Markdown description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_description: Option<String>,

    /// Deprecation message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

/// File form of [`NestedAttributes`](crate::NestedAttributes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestedDefinition {
    /// Nesting mode
    pub nesting: NestingMode,

    /// Attributes of one element
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDefinition>,
}

/// File form of a [`Block`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDefinition {
    /// Nesting mode
    pub nesting: BlockNesting,

    /// Minimum element count
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_items: u64,

    /// Maximum element count, 0 for unbounded
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_items: u64,

    /// Plain-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Markdown description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_description: Option<String>,

    /// Deprecation message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    /// Attributes of one element
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttributeDefinition>,

    /// Blocks of one element
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub blocks: IndexMap<String, BlockDefinition>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl SchemaDefinition {
    /// Parse a JSON document
    ///
    /// # Errors
    /// Returns [`SchemaError::Definition`] if the document is malformed
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(|e| SchemaError::Definition(e.to_string()))
    }

    /// Parse a YAML document
    ///
    /// # Errors
    /// Returns [`SchemaError::Definition`] if the document is malformed
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        // Composite types are written as `{ list: number }`, not as YAML tags
        let deserializer = serde_yaml::Deserializer::from_str(yaml);
        serde_yaml::with::singleton_map_recursive::deserialize(deserializer)
            .map_err(|e| SchemaError::Definition(e.to_string()))
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns [`SchemaError::Definition`] if serialization fails
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Definition(e.to_string()))
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns [`SchemaError::Definition`] if serialization fails
    pub fn to_yaml(&self) -> Result<String, SchemaError> {
        let mut buffer = Vec::new();
        let mut serializer = serde_yaml::Serializer::new(&mut buffer);
        serde_yaml::with::singleton_map_recursive::serialize(self, &mut serializer)
            .map_err(|e| SchemaError::Definition(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| SchemaError::Definition(e.to_string()))
    }

    /// Convert into a builder, ready for behaviour to be attached
    ///
    /// # Errors
    /// Returns the first descriptor error, anchored at its full path
    pub fn into_builder(self) -> Result<SchemaBuilder, SchemaError> {
        let root = AttributePath::root();
        let mut builder = Schema::builder().version(self.version);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(description) = self.markdown_description {
            builder = builder.markdown_description(description);
        }
        if let Some(message) = self.deprecation_message {
            builder = builder.deprecation_message(message);
        }
        for (name, definition) in self.attributes {
            let attribute = definition.build(&root.at_name(name.as_str()))?;
            builder = builder.attribute(name, attribute);
        }
        for (name, definition) in self.blocks {
            let block = definition.build(&root.at_name(name.as_str()))?;
            builder = builder.block(name, block);
        }
        tracing::debug!(version = self.version, "Schema definition converted");
        Ok(builder)
    }

    /// Convert and build in one go
    ///
    /// # Errors
    /// Returns the first descriptor error
    pub fn build(self) -> Result<Schema, SchemaError> {
        self.into_builder()?.build()
    }
}

impl AttributeDefinition {
    /// Build the attribute found at `path`
    ///
    /// # Errors
    /// Returns the first descriptor error, anchored under `path`
    pub fn build(self, path: &AttributePath) -> Result<Attribute, SchemaError> {
        let mut builder = Attribute::builder();
        if let Some(ty) = self.ty {
            builder = builder.ty(ty);
        }
        if let Some(nested) = self.nested {
            let attributes = nested
                .attributes
                .into_iter()
                .map(|(name, definition)| {
                    let attribute = definition.build(&path.at_name(name.as_str()))?;
                    Ok((name, attribute))
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            builder = builder.nested(nested.nesting, attributes);
        }
        if self.required {
            builder = builder.required();
        }
        if self.optional {
            builder = builder.optional();
        }
        if self.computed {
            builder = builder.computed();
        }
        if self.sensitive {
            builder = builder.sensitive();
        }
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(description) = self.markdown_description {
            builder = builder.markdown_description(description);
        }
        if let Some(message) = self.deprecation_message {
            builder = builder.deprecation_message(message);
        }
        builder.build().map_err(|e| e.under(path))
    }
}

impl BlockDefinition {
    /// Build the block found at `path`
    ///
    /// # Errors
    /// Returns the first descriptor error, anchored under `path`
    pub fn build(self, path: &AttributePath) -> Result<Block, SchemaError> {
        let mut builder = Block::builder(self.nesting)
            .min_items(self.min_items)
            .max_items(self.max_items);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(description) = self.markdown_description {
            builder = builder.markdown_description(description);
        }
        if let Some(message) = self.deprecation_message {
            builder = builder.deprecation_message(message);
        }
        for (name, definition) in self.attributes {
            let attribute = definition.build(&path.at_name(name.as_str()))?;
            builder = builder.attribute(name, attribute);
        }
        for (name, definition) in self.blocks {
            let block = definition.build(&path.at_name(name.as_str()))?;
            builder = builder.block(name, block);
        }
        builder.build().map_err(|e| e.under(path))
    }
}

impl From<&Schema> for SchemaDefinition {
    fn from(schema: &Schema) -> Self {
        Self {
            version: schema.version(),
            description: schema.description().map(str::to_string),
            markdown_description: schema.markdown_description().map(str::to_string),
            deprecation_message: schema.deprecation_message().map(str::to_string),
            attributes: schema
                .attributes()
                .iter()
                .map(|(name, attribute)| (name.clone(), attribute.into()))
                .collect(),
            blocks: schema
                .blocks()
                .iter()
                .map(|(name, block)| (name.clone(), block.into()))
                .collect(),
        }
    }
}

impl From<&Attribute> for AttributeDefinition {
    fn from(attribute: &Attribute) -> Self {
        let (ty, nested) = match attribute.kind() {
            AttributeKind::Type(ty) => (Some(ty.clone()), None),
            AttributeKind::Nested(nested) => (
                None,
                Some(NestedDefinition {
                    nesting: nested.nesting(),
                    attributes: nested
                        .attributes()
                        .iter()
                        .map(|(name, attribute)| (name.clone(), attribute.into()))
                        .collect(),
                }),
            ),
        };
        Self {
            ty,
            nested,
            required: attribute.is_required(),
            optional: attribute.is_optional(),
            computed: attribute.is_computed(),
            sensitive: attribute.is_sensitive(),
            description: attribute.description().map(str::to_string),
            markdown_description: attribute.markdown_description().map(str::to_string),
            deprecation_message: attribute.deprecation_message().map(str::to_string),
        }
    }
}

impl From<&Block> for BlockDefinition {
    fn from(block: &Block) -> Self {
        Self {
            nesting: block.nesting(),
            min_items: block.min_items(),
            max_items: block.max_items(),
            description: block.description().map(str::to_string),
            markdown_description: block.markdown_description().map(str::to_string),
            deprecation_message: block.deprecation_message().map(str::to_string),
            attributes: block
                .attributes()
                .iter()
                .map(|(name, attribute)| (name.clone(), attribute.into()))
                .collect(),
            blocks: block
                .blocks()
                .iter()
                .map(|(name, block)| (name.clone(), block.into()))
                .collect(),
        }
    }
}
