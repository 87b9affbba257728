//! Nested attribute groups
//!
//! An attribute may hold a group of further attributes instead of a plain
//! value type. The group is collected by one of four nesting modes, which
//! decide both the composite type and the step kind that addresses one
//! element of the group.

use std::fmt;

use indexmap::IndexMap;
use schemata_value::{PathStep, StepError, StepKind, Type};

use crate::attribute::Attribute;
use crate::resolve::SchemaNode;

/// Attributes keyed by name, in declaration order
pub type Attributes = IndexMap<String, Attribute>;

/// How instances of a nested attribute group are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    /// Ordered, addressed by index
    List,

    /// Unordered, addressed by element value
    Set,

    /// Keyed, addressed by string key
    Map,

    /// Exactly one object, addressed directly by attribute name
    Single,
}

impl NestingMode {
    /// Step kind that addresses the next level below a value of this mode
    #[inline]
    #[must_use]
    pub fn step_kind(self) -> StepKind {
        match self {
            Self::List => StepKind::ElementKeyInt,
            Self::Set => StepKind::ElementKeyValue,
            Self::Map => StepKind::ElementKeyString,
            Self::Single => StepKind::AttributeName,
        }
    }

    /// Wrap an object type per this mode
    #[must_use]
    pub fn wrap(self, object: Type) -> Type {
        match self {
            Self::List => Type::list(object),
            Self::Set => Type::set(object),
            Self::Map => Type::map(object),
            Self::Single => object,
        }
    }
}

impl fmt::Display for NestingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Single => "single",
        };
        f.write_str(name)
    }
}

/// Group of attributes nested under one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAttributes {
    nesting: NestingMode,
    attributes: Attributes,
}

impl NestedAttributes {
    pub(crate) fn new(nesting: NestingMode, attributes: Attributes) -> Self {
        Self {
            nesting,
            attributes,
        }
    }

    /// Nesting mode
    #[inline]
    #[must_use]
    pub fn nesting(&self) -> NestingMode {
        self.nesting
    }

    /// Attributes of one element
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable access to one element's attribute
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    /// Object type of one element
    #[must_use]
    pub fn object_type(&self) -> Type {
        object_type(&self.attributes)
    }

    /// Composite type: the element object wrapped per nesting mode
    #[must_use]
    pub fn ty(&self) -> Type {
        self.nesting.wrap(self.object_type())
    }

    /// Apply one step
    ///
    /// Element steps (index, key, set value) are accepted without consulting
    /// any value and yield the element object. `Single` takes an attribute
    /// name directly.
    ///
    /// # Errors
    /// Returns error if the step kind does not fit the nesting mode, the
    /// index is negative or the attribute name is unknown
    pub fn apply_path_step(&self, step: &PathStep) -> Result<SchemaNode<'_>, StepError> {
        match (self.nesting, step) {
            (NestingMode::List, PathStep::ElementKeyInt(index)) if *index < 0 => {
                Err(StepError::NegativeIndex { index: *index })
            }
            (NestingMode::List, PathStep::ElementKeyInt(_))
            | (NestingMode::Set, PathStep::ElementKeyValue(_))
            | (NestingMode::Map, PathStep::ElementKeyString(_)) => {
                Ok(SchemaNode::NestedObject(&self.attributes))
            }
            (NestingMode::Single, PathStep::AttributeName(_)) => {
                apply_attribute_name(&self.attributes, step)
            }
            _ => Err(StepError::UnexpectedStep {
                step: step.clone(),
                target: self.ty().to_string(),
                expected: self.nesting.step_kind(),
            }),
        }
    }
}

/// Object type over a group of attributes
pub(crate) fn object_type(attributes: &Attributes) -> Type {
    Type::object(
        attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute.effective_type())),
    )
}

/// Apply an attribute-name step to a group of attributes
pub(crate) fn apply_attribute_name<'a>(
    attributes: &'a Attributes,
    step: &PathStep,
) -> Result<SchemaNode<'a>, StepError> {
    let Some(name) = step.as_attribute_name() else {
        return Err(StepError::UnexpectedStep {
            step: step.clone(),
            target: object_type(attributes).to_string(),
            expected: StepKind::AttributeName,
        });
    };
    attributes
        .get(name)
        .map(SchemaNode::Attribute)
        .ok_or_else(|| StepError::NoSuchAttribute {
            name: name.to_string(),
            target: object_type(attributes).to_string(),
        })
}
