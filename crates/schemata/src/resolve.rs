//! Path resolution against a schema
//!
//! Resolution starts at the [`Schema`] and applies one step at a time,
//! carrying forward whatever node the previous step produced. Every node
//! kind answers the same step primitive; once a path descends into a leaf
//! attribute's value type, the remaining steps are answered by [`Type`]
//! alone.
//!
//! Three endpoints share the walk:
//! - [`Schema::type_at_path`]: the value type at any resolvable point
//! - [`Schema::attribute_at_path`]: the attribute descriptor at a point
//! - [`Schema::block_at_path`]: the block descriptor at a point

use schemata_value::{
    AttributePath, ExpressionStep, PathExpression, PathStep, StepError, StepKind, Type, Value,
};

use crate::attribute::Attribute;
use crate::block::{Block, Blocks};
use crate::error::ResolveError;
use crate::nested::{apply_attribute_name, object_type, Attributes, NestingMode};
use crate::schema::Schema;

/// Node reached while resolving a path
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    /// The schema root
    Schema(&'a Schema),

    /// An attribute descriptor
    Attribute(&'a Attribute),

    /// One element of a nested attribute group
    NestedObject(&'a Attributes),

    /// A block descriptor
    Block(&'a Block),

    /// One element of a block
    BlockObject(&'a Block),

    /// A bare type inside a leaf attribute's value
    Type(&'a Type),
}

impl<'a> SchemaNode<'a> {
    /// Value type at this node
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Schema(schema) => schema.ty(),
            Self::Attribute(attribute) => attribute.effective_type(),
            Self::NestedObject(attributes) => object_type(attributes),
            Self::Block(block) => block.ty(),
            Self::BlockObject(block) => block.object_type(),
            Self::Type(ty) => (*ty).clone(),
        }
    }

    /// Step kind this node accepts, `None` for primitive types
    #[must_use]
    pub fn step_kind(&self) -> Option<StepKind> {
        match self {
            Self::Schema(_) | Self::NestedObject(_) | Self::BlockObject(_) => {
                Some(StepKind::AttributeName)
            }
            Self::Attribute(attribute) => match attribute.nested() {
                Some(nested) => Some(nested.nesting().step_kind()),
                None => attribute.leaf_type().and_then(Type::child_step_kind),
            },
            Self::Block(block) => Some(NestingMode::from(block.nesting()).step_kind()),
            Self::Type(ty) => ty.child_step_kind(),
        }
    }

    /// Apply one step
    ///
    /// # Errors
    /// Returns error if the step does not apply at this node
    pub fn apply_path_step(&self, step: &PathStep) -> Result<SchemaNode<'a>, StepError> {
        match *self {
            Self::Schema(schema) => schema.apply_path_step(step),
            Self::Attribute(attribute) => attribute.apply_path_step(step),
            Self::NestedObject(attributes) => apply_attribute_name(attributes, step),
            Self::Block(block) => block.apply_path_step(step),
            Self::BlockObject(block) => block.apply_member_step(step),
            Self::Type(ty) => ty.apply_path_step(step).map(SchemaNode::Type),
        }
    }

    /// Short description used in errors
    fn describe(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema root",
            Self::Attribute(_) => "attribute",
            Self::NestedObject(_) => "nested attribute object",
            Self::Block(_) => "block",
            Self::BlockObject(_) => "block element",
            Self::Type(_) => "value type",
        }
    }
}

/// Object type over attributes and blocks
pub(crate) fn member_object_type(attributes: &Attributes, blocks: &Blocks) -> Type {
    Type::object(
        attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute.effective_type()))
            .chain(blocks.iter().map(|(name, block)| (name.as_str(), block.ty()))),
    )
}

/// Apply a name step over attributes, then blocks
pub(crate) fn apply_member_step<'a>(
    attributes: &'a Attributes,
    blocks: &'a Blocks,
    step: &PathStep,
) -> Result<SchemaNode<'a>, StepError> {
    let Some(name) = step.as_attribute_name() else {
        return Err(StepError::UnexpectedStep {
            step: step.clone(),
            target: member_object_type(attributes, blocks).to_string(),
            expected: StepKind::AttributeName,
        });
    };
    if let Some(attribute) = attributes.get(name) {
        return Ok(SchemaNode::Attribute(attribute));
    }
    if let Some(block) = blocks.get(name) {
        return Ok(SchemaNode::Block(block));
    }
    Err(StepError::NoSuchAttribute {
        name: name.to_string(),
        target: member_object_type(attributes, blocks).to_string(),
    })
}

impl Schema {
    /// Node at the end of a path
    ///
    /// # Errors
    /// Returns [`ResolveError::Step`] at the first step that does not apply
    pub fn node_at_path(&self, path: &AttributePath) -> Result<SchemaNode<'_>, ResolveError> {
        let mut node = SchemaNode::Schema(self);
        for (index, step) in path.iter().enumerate() {
            node = node.apply_path_step(step).map_err(|source| {
                tracing::trace!(%path, %step, error = %source, "Path resolution failed");
                ResolveError::Step {
                    path: path.clone(),
                    consumed: AttributePath::new(path.steps()[..index].to_vec()),
                    step: step.clone(),
                    remaining: AttributePath::new(path.steps()[index..].to_vec()),
                    source,
                }
            })?;
        }
        tracing::trace!(%path, node = node.describe(), "Path resolved");
        Ok(node)
    }

    /// Value type at a path
    ///
    /// The empty path yields the schema's own object type.
    ///
    /// # Errors
    /// Returns error if the path does not resolve
    pub fn type_at_path(&self, path: &AttributePath) -> Result<Type, ResolveError> {
        self.node_at_path(path).map(|node| node.ty())
    }

    /// Attribute descriptor at a path
    ///
    /// # Errors
    /// Returns error if the path does not resolve, or lands:
    /// - inside a leaf attribute's type ([`ResolveError::PathInsideAtomicAttribute`])
    /// - on a block ([`ResolveError::PathIsBlock`])
    /// - on the root or an element object ([`ResolveError::PathIsNotAttribute`])
    pub fn attribute_at_path(&self, path: &AttributePath) -> Result<&Attribute, ResolveError> {
        match self.node_at_path(path)? {
            SchemaNode::Attribute(attribute) => Ok(attribute),
            SchemaNode::Type(_) => Err(ResolveError::PathInsideAtomicAttribute { path: path.clone() }),
            SchemaNode::Block(_) => Err(ResolveError::PathIsBlock { path: path.clone() }),
            node @ (SchemaNode::Schema(_)
            | SchemaNode::NestedObject(_)
            | SchemaNode::BlockObject(_)) => Err(ResolveError::PathIsNotAttribute {
                path: path.clone(),
                node: node.describe(),
            }),
        }
    }

    /// Block descriptor at a path
    ///
    /// # Errors
    /// Returns error if the path does not resolve or does not land on a
    /// block
    pub fn block_at_path(&self, path: &AttributePath) -> Result<&Block, ResolveError> {
        match self.node_at_path(path)? {
            SchemaNode::Block(block) => Ok(block),
            _ => Err(ResolveError::PathIsNotBlock { path: path.clone() }),
        }
    }

    /// Value type at the end of a path expression
    ///
    /// Wildcards are resolved as a representative step of their kind;
    /// [`ExpressionStep::AnyElement`] takes whichever element kind the node
    /// accepts. Relative expressions are resolved from the root.
    ///
    /// # Errors
    /// Returns error if some step of the expression does not apply
    pub fn type_at_expression(&self, expression: &PathExpression) -> Result<Type, ResolveError> {
        let resolved = expression.merge(&AttributePath::root()).resolve();
        let mut path = AttributePath::root();
        let mut node = SchemaNode::Schema(self);
        for step in expression_steps(&resolved) {
            let concrete = match step {
                ExpressionStep::Exact(step) => step,
                wildcard => representative_step(&node, &wildcard),
            };
            path = path.child(concrete);
            node = self.node_at_path(&path)?;
        }
        Ok(node.ty())
    }
}

/// All steps of a resolved expression, anchor included
fn expression_steps(expression: &PathExpression) -> Vec<ExpressionStep> {
    let anchor = expression.anchor().steps().iter().cloned().map(ExpressionStep::Exact);
    anchor.chain(expression.steps().iter().cloned()).collect()
}

/// Concrete step standing in for a wildcard at `node`
fn representative_step(node: &SchemaNode<'_>, wildcard: &ExpressionStep) -> PathStep {
    let kind = match wildcard {
        ExpressionStep::AnyElementKeyInt => StepKind::ElementKeyInt,
        ExpressionStep::AnyElementKeyString => StepKind::ElementKeyString,
        ExpressionStep::AnyElementKeyValue => StepKind::ElementKeyValue,
        _ => node.step_kind().unwrap_or(StepKind::ElementKeyInt),
    };
    match kind {
        StepKind::ElementKeyString => PathStep::ElementKeyString(String::new()),
        StepKind::ElementKeyValue => {
            let element = node.ty().element_type().cloned().unwrap_or(Type::String);
            PathStep::ElementKeyValue(Value::null(element))
        }
        // An attribute-name wildcard cannot be expressed, so index steps are
        // used and rejected by name-addressed nodes
        StepKind::ElementKeyInt | StepKind::AttributeName => PathStep::ElementKeyInt(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockNesting;
    use pretty_assertions::assert_eq;

    fn leaf(ty: Type) -> Attribute {
        Attribute::builder().ty(ty).optional().build().unwrap()
    }

    fn schema() -> Schema {
        Schema::builder()
            .attribute("ports", leaf(Type::list(Type::Number)))
            .attribute(
                "tags",
                Attribute::builder()
                    .nested(NestingMode::Map, [("value", leaf(Type::String))])
                    .optional()
                    .build()
                    .unwrap(),
            )
            .block(
                "rule",
                Block::builder(BlockNesting::List)
                    .attribute("port", leaf(Type::Number))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn path(s: &str) -> AttributePath {
        s.parse().unwrap()
    }

    #[test]
    fn type_at_paths() {
        let schema = schema();
        assert_eq!(schema.type_at_path(&AttributePath::root()).unwrap(), schema.ty());
        assert_eq!(schema.type_at_path(&path("ports[3]")).unwrap(), Type::Number);
        assert_eq!(
            schema.type_at_path(&path(r#"tags["env"].value"#)).unwrap(),
            Type::String
        );
        assert_eq!(schema.type_at_path(&path("rule[0].port")).unwrap(), Type::Number);
        assert_eq!(
            schema.type_at_path(&path("rule[0]")).unwrap(),
            Type::object([("port", Type::Number)])
        );
    }

    #[test]
    fn step_error_reports_remaining() {
        let err = schema().type_at_path(&path("tags[0].value")).unwrap_err();
        let ResolveError::Step {
            consumed,
            remaining,
            source,
            ..
        } = err
        else {
            panic!("expected step error");
        };
        assert_eq!(consumed, path("tags"));
        assert_eq!(remaining.len(), 2);
        assert!(matches!(
            source,
            StepError::UnexpectedStep {
                expected: StepKind::ElementKeyString,
                ..
            }
        ));
    }

    #[test]
    fn attribute_at_path_boundaries() {
        let schema = schema();
        assert!(schema.attribute_at_path(&path(r#"tags["a"].value"#)).is_ok());
        assert!(matches!(
            schema.attribute_at_path(&path("ports[0]")),
            Err(ResolveError::PathInsideAtomicAttribute { .. })
        ));
        assert!(matches!(
            schema.attribute_at_path(&path("rule")),
            Err(ResolveError::PathIsBlock { .. })
        ));
        assert!(matches!(
            schema.attribute_at_path(&AttributePath::root()),
            Err(ResolveError::PathIsNotAttribute { node: "schema root", .. })
        ));
        assert!(matches!(
            schema.attribute_at_path(&path(r#"tags["a"]"#)),
            Err(ResolveError::PathIsNotAttribute { .. })
        ));
    }

    #[test]
    fn block_at_path() {
        let schema = schema();
        assert_eq!(
            schema.block_at_path(&path("rule")).unwrap().nesting(),
            BlockNesting::List
        );
        assert!(matches!(
            schema.block_at_path(&path("ports")),
            Err(ResolveError::PathIsNotBlock { .. })
        ));
    }

    #[test]
    fn expressions_resolve_with_wildcards() {
        let schema = schema();
        let expr = PathExpression::root().at_name("rule").at_any_list_index().at_name("port");
        assert_eq!(schema.type_at_expression(&expr).unwrap(), Type::Number);

        let expr = PathExpression::root().at_name("tags").at_any_element().at_name("value");
        assert_eq!(schema.type_at_expression(&expr).unwrap(), Type::String);

        let expr = PathExpression::root().at_name("tags").at_any_list_index();
        assert!(schema.type_at_expression(&expr).is_err());
    }
}
