//! Attribute descriptors
//!
//! An [`Attribute`] is a named schema field. It either holds a plain value
//! [`Type`] or a [`NestedAttributes`] group; the two are variants of
//! [`AttributeKind`], so an attribute can never have both or neither.

use std::fmt;
use std::sync::Arc;

use schemata_value::{PathStep, StepError, Type};

use crate::error::SchemaError;
use crate::nested::{NestedAttributes, NestingMode};
use crate::plan_modifier::AttributePlanModifier;
use crate::resolve::SchemaNode;
use crate::schema::{index_by_name, Members};
use crate::validator::AttributeValidator;

/// Value shape of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    /// Leaf attribute holding a value of this type
    Type(Type),

    /// Attribute holding a group of further attributes
    Nested(NestedAttributes),
}

/// Schema field descriptor
///
/// Equality compares shape only: kind, constraint flags, descriptions and
/// deprecation. Validators and plan modifiers are ignored.
#[derive(Clone)]
pub struct Attribute {
    kind: AttributeKind,
    required: bool,
    optional: bool,
    computed: bool,
    sensitive: bool,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
    validators: Vec<Arc<dyn AttributeValidator>>,
    plan_modifiers: Vec<Arc<dyn AttributePlanModifier>>,
}

impl Attribute {
    /// Start building an attribute
    #[inline]
    #[must_use]
    pub fn builder() -> AttributeBuilder {
        AttributeBuilder::default()
    }

    /// Value shape
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Leaf type, if this is a leaf attribute
    #[inline]
    #[must_use]
    pub fn leaf_type(&self) -> Option<&Type> {
        match &self.kind {
            AttributeKind::Type(ty) => Some(ty),
            AttributeKind::Nested(_) => None,
        }
    }

    /// Nested group, if this is a nested attribute
    #[inline]
    #[must_use]
    pub fn nested(&self) -> Option<&NestedAttributes> {
        match &self.kind {
            AttributeKind::Type(_) => None,
            AttributeKind::Nested(nested) => Some(nested),
        }
    }

    /// Mutable nested group, to attach behaviour to nested attributes
    pub fn nested_mut(&mut self) -> Option<&mut NestedAttributes> {
        match &mut self.kind {
            AttributeKind::Type(_) => None,
            AttributeKind::Nested(nested) => Some(nested),
        }
    }

    /// Type of the values this attribute holds
    ///
    /// The leaf type, or the composite type of the nested group.
    #[must_use]
    pub fn effective_type(&self) -> Type {
        match &self.kind {
            AttributeKind::Type(ty) => ty.clone(),
            AttributeKind::Nested(nested) => nested.ty(),
        }
    }

    /// Must be configured
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// May be configured
    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// May be set by the provider
    #[inline]
    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Hidden from user-facing output
    #[inline]
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
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

    /// Deprecation message; configuring a deprecated attribute warns
    #[inline]
    #[must_use]
    pub fn deprecation_message(&self) -> Option<&str> {
        self.deprecation_message.as_deref()
    }

    /// Validators in declaration order
    #[inline]
    #[must_use]
    pub fn validators(&self) -> &[Arc<dyn AttributeValidator>] {
        &self.validators
    }

    /// Plan modifiers in declaration order
    #[inline]
    #[must_use]
    pub fn plan_modifiers(&self) -> &[Arc<dyn AttributePlanModifier>] {
        &self.plan_modifiers
    }

    /// Append a validator
    pub fn add_validator(&mut self, validator: impl AttributeValidator + 'static) {
        self.validators.push(Arc::new(validator));
    }

    /// Append a plan modifier
    pub fn add_plan_modifier(&mut self, modifier: impl AttributePlanModifier + 'static) {
        self.plan_modifiers.push(Arc::new(modifier));
    }

    /// Apply one step
    ///
    /// Leaf attributes delegate to their type; nested attributes to their
    /// nesting mode.
    ///
    /// # Errors
    /// Returns error if the step does not apply
    pub fn apply_path_step(&self, step: &PathStep) -> Result<SchemaNode<'_>, StepError> {
        match &self.kind {
            AttributeKind::Type(ty) => ty.apply_path_step(step).map(SchemaNode::Type),
            AttributeKind::Nested(nested) => nested.apply_path_step(step),
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.required == other.required
            && self.optional == other.optional
            && self.computed == other.computed
            && self.sensitive == other.sensitive
            && self.description == other.description
            && self.markdown_description == other.markdown_description
            && self.deprecation_message == other.deprecation_message
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("deprecation_message", &self.deprecation_message)
            .field(
                "validators",
                &self
                    .validators
                    .iter()
                    .map(|v| v.description())
                    .collect::<Vec<_>>(),
            )
            .field(
                "plan_modifiers",
                &self
                    .plan_modifiers
                    .iter()
                    .map(|m| m.description())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Anything a parent builder accepts as an attribute
///
/// Handing the parent an unbuilt [`AttributeBuilder`] (or the result of
/// building one) lets it report the attribute's errors at the full path.
pub trait IntoAttribute {
    /// Finish the attribute
    ///
    /// # Errors
    /// Returns the attribute's own descriptor error, anchored at its root
    fn into_attribute(self) -> Result<Attribute, SchemaError>;
}

impl IntoAttribute for Attribute {
    fn into_attribute(self) -> Result<Attribute, SchemaError> {
        Ok(self)
    }
}

impl IntoAttribute for AttributeBuilder {
    fn into_attribute(self) -> Result<Attribute, SchemaError> {
        self.build()
    }
}

impl IntoAttribute for Result<Attribute, SchemaError> {
    fn into_attribute(self) -> Result<Attribute, SchemaError> {
        self
    }
}

/// Builder for [`Attribute`]
#[derive(Default)]
pub struct AttributeBuilder {
    ty: Option<Type>,
    nested: Option<(NestingMode, Members<Attribute>)>,
    required: bool,
    optional: bool,
    computed: bool,
    sensitive: bool,
    description: Option<String>,
    markdown_description: Option<String>,
    deprecation_message: Option<String>,
    validators: Vec<Arc<dyn AttributeValidator>>,
    plan_modifiers: Vec<Arc<dyn AttributePlanModifier>>,
}

impl AttributeBuilder {
    /// Leaf value type
    #[must_use]
    pub fn ty(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Nested group of attributes
    #[must_use]
    pub fn nested<K: Into<String>, A: IntoAttribute>(
        mut self,
        nesting: NestingMode,
        attributes: impl IntoIterator<Item = (K, A)>,
    ) -> Self {
        self.nested = Some((
            nesting,
            attributes
                .into_iter()
                .map(|(name, attribute)| (name.into(), attribute.into_attribute()))
                .collect(),
        ));
        self
    }

    /// Mark required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark computed
    #[must_use]
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark sensitive
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
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
    pub fn validator(mut self, validator: impl AttributeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Add a plan modifier
    #[must_use]
    pub fn plan_modifier(mut self, modifier: impl AttributePlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Build the attribute
    ///
    /// # Errors
    /// Returns error if:
    /// - both or neither of a type and a nested group are set
    /// - required and optional are both set
    /// - none of required, optional and computed is set
    /// - a nested attribute name is invalid or repeated
    pub fn build(self) -> Result<Attribute, SchemaError> {
        let path = schemata_value::AttributePath::root();
        let kind = match (self.ty, self.nested) {
            (Some(ty), None) => AttributeKind::Type(ty),
            (None, Some((nesting, attributes))) => AttributeKind::Nested(NestedAttributes::new(
                nesting,
                index_by_name(attributes, &path)?,
            )),
            _ => return Err(SchemaError::TypeXorNested { path }),
        };
        if self.required && self.optional {
            return Err(SchemaError::RequiredAndOptional { path });
        }
        if !(self.required || self.optional || self.computed) {
            return Err(SchemaError::MissingConstraint { path });
        }

        Ok(Attribute {
            kind,
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            description: self.description,
            markdown_description: self.markdown_description,
            deprecation_message: self.deprecation_message,
            validators: self.validators,
            plan_modifiers: self.plan_modifiers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::LengthBetween;

    fn leaf() -> Attribute {
        Attribute::builder()
            .ty(Type::String)
            .optional()
            .build()
            .unwrap()
    }

    #[test]
    fn type_xor_nested() {
        let neither = Attribute::builder().optional().build();
        assert!(matches!(neither, Err(SchemaError::TypeXorNested { .. })));

        let both = Attribute::builder()
            .ty(Type::String)
            .nested(NestingMode::Single, [("a", leaf())])
            .optional()
            .build();
        assert!(matches!(both, Err(SchemaError::TypeXorNested { .. })));
    }

    #[test]
    fn constraint_flags() {
        let both = Attribute::builder()
            .ty(Type::String)
            .required()
            .optional()
            .build();
        assert!(matches!(both, Err(SchemaError::RequiredAndOptional { .. })));

        let none = Attribute::builder().ty(Type::String).build();
        assert!(matches!(none, Err(SchemaError::MissingConstraint { .. })));

        let computed = Attribute::builder()
            .ty(Type::String)
            .optional()
            .computed()
            .build()
            .unwrap();
        assert!(computed.is_optional() && computed.is_computed());
    }

    #[test]
    fn nested_effective_type() {
        let tags = Attribute::builder()
            .nested(NestingMode::Map, [("value", leaf())])
            .optional()
            .build()
            .unwrap();
        assert_eq!(
            tags.effective_type(),
            Type::map(Type::object([("value", Type::String)]))
        );
        assert!(tags.leaf_type().is_none());
        assert_eq!(tags.nested().map(|n| n.attributes().len()), Some(1));
    }

    #[test]
    fn duplicate_nested_names_rejected() {
        let err = Attribute::builder()
            .nested(NestingMode::List, [("a", leaf()), ("a", leaf())])
            .optional()
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateName {
                path: schemata_value::AttributePath::root(),
                name: "a".into()
            }
        );
    }

    #[test]
    fn equality_ignores_behaviour() {
        let mut with_validator = leaf();
        with_validator.add_validator(LengthBetween::new(1, 5));
        assert_eq!(with_validator, leaf());
        assert_eq!(with_validator.validators().len(), 1);

        let described = Attribute::builder()
            .ty(Type::String)
            .optional()
            .description("x")
            .build()
            .unwrap();
        assert_ne!(described, leaf());
    }

    #[test]
    fn leaf_delegates_steps_to_type() {
        let ports = Attribute::builder()
            .ty(Type::list(Type::Number))
            .optional()
            .build()
            .unwrap();
        let node = ports.apply_path_step(&PathStep::ElementKeyInt(2)).unwrap();
        assert!(matches!(node, SchemaNode::Type(Type::Number)));
    }
}
