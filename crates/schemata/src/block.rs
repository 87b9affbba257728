//! Structural blocks
//!
//! A [`Block`] is a schema field that groups attributes and further blocks,
//! collected as a list, a set or a single object. Unlike nested attributes,
//! blocks carry cardinality bounds and cannot be keyed by string.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use schemata_value::{AttributePath, PathStep, StepError, Type};

use crate::attribute::{Attribute, IntoAttribute};
use crate::error::SchemaError;
use crate::nested::{Attributes, NestingMode};
use crate::plan_modifier::BlockPlanModifier;
use crate::resolve::{apply_member_step, member_object_type, SchemaNode};
use crate::schema::{check_disjoint, index_by_name, Members};
use crate::validator::BlockValidator;

/// Blocks keyed by name, in declaration order
pub type Blocks = IndexMap<String, Block>;

/// How instances of a block are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockNesting {
    /// Ordered, addressed by index
    List,

    /// Unordered, addressed by element value
    Set,

    /// At most one object, addressed directly by name
    Single,
}

impl From<BlockNesting> for NestingMode {
    fn from(nesting: BlockNesting) -> Self {
        match nesting {
            BlockNesting::List => Self::List,
            BlockNesting::Set => Self::Set,
            BlockNesting::Single => Self::Single,
        }
    }
}

impl fmt::Display for BlockNesting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        NestingMode::from(*self).fmt(f)
    }
}

/// Structural block descriptor
#[derive(Clone)]
pub struct Block {
    nesting: BlockNesting,
    attributes: Attributes,
    blocks: Blocks,
    min_items: u64,
    max_items: u64,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
    validators: Vec<Arc<dyn BlockValidator>>,
    plan_modifiers: Vec<Arc<dyn BlockPlanModifier>>,
}

impl Block {
    /// Start building a block
    #[inline]
    #[must_use]
    pub fn builder(nesting: BlockNesting) -> BlockBuilder {
        BlockBuilder {
            nesting,
            attributes: Vec::new(),
            blocks: Vec::new(),
            min_items: 0,
            max_items: 0,
            description: None,
            markdown_description: None,
            deprecation_message: None,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
        }
    }

    /// Nesting mode
    #[inline]
    #[must_use]
    pub fn nesting(&self) -> BlockNesting {
        self.nesting
    }

    /// Attributes of one element
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Blocks of one element
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    /// Mutable access to one element's attribute
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    /// Mutable access to one element's block
    pub fn block_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.get_mut(name)
    }

    /// Minimum element count, 0 for none
    #[inline]
    #[must_use]
    pub fn min_items(&self) -> u64 {
        self.min_items
    }

    /// Maximum element count, 0 for unbounded
    #[inline]
    #[must_use]
    pub fn max_items(&self) -> u64 {
        self.max_items
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

    /// Deprecation message
    #[inline]
    #[must_use]
    pub fn deprecation_message(&self) -> Option<&str> {
        self.deprecation_message.as_deref()
    }

    /// Validators in declaration order
    #[inline]
    #[must_use]
    pub fn validators(&self) -> &[Arc<dyn BlockValidator>] {
        &self.validators
    }

    /// Plan modifiers in declaration order
    #[inline]
    #[must_use]
    pub fn plan_modifiers(&self) -> &[Arc<dyn BlockPlanModifier>] {
        &self.plan_modifiers
    }

    /// Append a validator
    pub fn add_validator(&mut self, validator: impl BlockValidator + 'static) {
        self.validators.push(Arc::new(validator));
    }

    /// Append a plan modifier
    pub fn add_plan_modifier(&mut self, modifier: impl BlockPlanModifier + 'static) {
        self.plan_modifiers.push(Arc::new(modifier));
    }

    /// Object type of one element: attributes and nested blocks together
    #[must_use]
    pub fn object_type(&self) -> Type {
        member_object_type(&self.attributes, &self.blocks)
    }

    /// Composite type: the element object wrapped per nesting mode
    #[must_use]
    pub fn ty(&self) -> Type {
        NestingMode::from(self.nesting).wrap(self.object_type())
    }

    /// Apply one step
    ///
    /// List and set blocks take an element step and yield the element;
    /// single blocks take a member name directly.
    ///
    /// # Errors
    /// Returns error if the step kind does not fit the nesting mode, the
    /// index is negative or the member name is unknown
    pub fn apply_path_step(&self, step: &PathStep) -> Result<SchemaNode<'_>, StepError> {
        match (self.nesting, step) {
            (BlockNesting::List, PathStep::ElementKeyInt(index)) if *index < 0 => {
                Err(StepError::NegativeIndex { index: *index })
            }
            (BlockNesting::List, PathStep::ElementKeyInt(_))
            | (BlockNesting::Set, PathStep::ElementKeyValue(_)) => {
                Ok(SchemaNode::BlockObject(self))
            }
            (BlockNesting::Single, PathStep::AttributeName(_)) => self.apply_member_step(step),
            _ => Err(StepError::UnexpectedStep {
                step: step.clone(),
                target: self.ty().to_string(),
                expected: NestingMode::from(self.nesting).step_kind(),
            }),
        }
    }

    /// Apply a member-name step to one element of this block
    pub(crate) fn apply_member_step(&self, step: &PathStep) -> Result<SchemaNode<'_>, StepError> {
        apply_member_step(&self.attributes, &self.blocks, step)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.nesting == other.nesting
            && self.attributes == other.attributes
            && self.blocks == other.blocks
            && self.min_items == other.min_items
            && self.max_items == other.max_items
            && self.description == other.description
            && self.markdown_description == other.markdown_description
            && self.deprecation_message == other.deprecation_message
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("nesting", &self.nesting)
            .field("attributes", &self.attributes)
            .field("blocks", &self.blocks)
            .field("min_items", &self.min_items)
            .field("max_items", &self.max_items)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .finish_non_exhaustive()
    }
}

/// Anything a parent builder accepts as a block
///
/// See [`IntoAttribute`]; the same holds for blocks and [`BlockBuilder`].
pub trait IntoBlock {
    /// Finish the block
    ///
    /// # Errors
    /// Returns the block's own descriptor error, anchored at its root
    fn into_block(self) -> Result<Block, SchemaError>;
}

impl IntoBlock for Block {
    fn into_block(self) -> Result<Block, SchemaError> {
        Ok(self)
    }
}

impl IntoBlock for BlockBuilder {
    fn into_block(self) -> Result<Block, SchemaError> {
        self.build()
    }
}

impl IntoBlock for Result<Block, SchemaError> {
    fn into_block(self) -> Result<Block, SchemaError> {
        self
    }
}

/// Builder for [`Block`]
pub struct BlockBuilder {
    nesting: BlockNesting,
    attributes: Members<Attribute>,
    blocks: Members<Block>,
    min_items: u64,
    max_items: u64,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
    validators: Vec<Arc<dyn BlockValidator>>,
    plan_modifiers: Vec<Arc<dyn BlockPlanModifier>>,
}

impl BlockBuilder {
    /// Add an attribute to each element
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, attribute: impl IntoAttribute) -> Self {
        self.attributes.push((name.into(), attribute.into_attribute()));
        self
    }

    /// Add a nested block to each element
    #[must_use]
    pub fn block(mut self, name: impl Into<String>, block: impl IntoBlock) -> Self {
        self.blocks.push((name.into(), block.into_block()));
        self
    }

    /// Set minimum element count
    #[must_use]
    pub fn min_items(mut self, min: u64) -> Self {
        self.min_items = min;
        self
    }

    /// Set maximum element count
    #[must_use]
    pub fn max_items(mut self, max: u64) -> Self {
        self.max_items = max;
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

    /// Mark deprecated
    #[must_use]
    pub fn deprecation_message(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = Some(message.into());
        self
    }

    /// Add a validator
    #[must_use]
    pub fn validator(mut self, validator: impl BlockValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Add a plan modifier
    #[must_use]
    pub fn plan_modifier(mut self, modifier: impl BlockPlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Build the block
    ///
    /// # Errors
    /// Returns error if a member name is invalid, repeated or used by both
    /// an attribute and a block, or `min_items` exceeds a non-zero
    /// `max_items`
    pub fn build(self) -> Result<Block, SchemaError> {
        let path = AttributePath::root();
        let attributes = index_by_name(self.attributes, &path)?;
        let blocks = index_by_name(self.blocks, &path)?;
        check_disjoint(&attributes, &blocks, &path)?;
        if self.max_items > 0 && self.min_items > self.max_items {
            return Err(SchemaError::InvalidItemBounds {
                path,
                min: self.min_items,
                max: self.max_items,
            });
        }

        Ok(Block {
            nesting: self.nesting,
            attributes,
            blocks,
            min_items: self.min_items,
            max_items: self.max_items,
            description: self.description,
            markdown_description: self.markdown_description,
            deprecation_message: self.deprecation_message,
            validators: self.validators,
            plan_modifiers: self.plan_modifiers,
        })
    }
}
