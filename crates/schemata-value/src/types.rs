//! Value types
//!
//! Provides [`Type`], the closed set of shapes a [`Value`](crate::Value) can take.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::path::{PathStep, StepError, StepKind};

/// Shape of a value
///
/// Primitive types carry no children. Collection types wrap a single element
/// type; objects carry one type per attribute name.
///
/// Serialized form, used by schema definition files:
/// - `"string"`, `"number"`, `"bool"`
/// - `{"list": "string"}`, `{"set": "number"}`, `{"map": "bool"}`
/// - `{"object": {"host": "string", "port": "number"}}`
///
/// YAML readers need the singleton-map form of enums for the composite
/// shapes; `serde_yaml`'s default is a `!list` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// UTF-8 string
    String,

    /// Arbitrary-precision number (as far as JSON allows)
    Number,

    /// Boolean
    Bool,

    /// Ordered sequence
    List(Box<Type>),

    /// Unordered collection without duplicates
    Set(Box<Type>),

    /// String-keyed collection
    Map(Box<Type>),

    /// Fixed set of named attributes
    Object(BTreeMap<String, Type>),
}

impl Type {
    /// `list(element)`
    #[inline]
    #[must_use]
    pub fn list(element: Type) -> Self {
        Self::List(Box::new(element))
    }

    /// `set(element)`
    #[inline]
    #[must_use]
    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    /// `map(element)`
    #[inline]
    #[must_use]
    pub fn map(element: Type) -> Self {
        Self::Map(Box::new(element))
    }

    /// `object({...})` from name/type pairs
    #[must_use]
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// Check if this is a primitive (childless) type
    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::String | Self::Number | Self::Bool)
    }

    /// Element type of a list, set or map
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Self::List(element) | Self::Set(element) | Self::Map(element) => Some(&**element),
            _ => None,
        }
    }

    /// Attribute types of an object
    #[inline]
    #[must_use]
    pub fn attribute_types(&self) -> Option<&BTreeMap<String, Type>> {
        match self {
            Self::Object(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Step kind that addresses children of this type
    #[inline]
    #[must_use]
    pub fn child_step_kind(&self) -> Option<StepKind> {
        match self {
            Self::List(_) => Some(StepKind::ElementKeyInt),
            Self::Set(_) => Some(StepKind::ElementKeyValue),
            Self::Map(_) => Some(StepKind::ElementKeyString),
            Self::Object(_) => Some(StepKind::AttributeName),
            _ => None,
        }
    }

    /// Type reached by applying one step
    ///
    /// Does not consult any concrete value: a list index or map key is
    /// accepted regardless of whether such an element exists.
    ///
    /// # Errors
    /// Returns error if the step kind does not fit this type, the attribute
    /// name is unknown, or the list index is negative
    pub fn apply_path_step(&self, step: &PathStep) -> Result<&Type, StepError> {
        match (self, step) {
            (Self::Object(attributes), PathStep::AttributeName(name)) => {
                attributes.get(name).ok_or_else(|| StepError::NoSuchAttribute {
                    name: name.clone(),
                    target: self.to_string(),
                })
            }
            (Self::List(_), PathStep::ElementKeyInt(index)) if *index < 0 => {
                Err(StepError::NegativeIndex { index: *index })
            }
            (Self::List(element), PathStep::ElementKeyInt(_))
            | (Self::Set(element), PathStep::ElementKeyValue(_))
            | (Self::Map(element), PathStep::ElementKeyString(_)) => Ok(&**element),
            _ => Err(self.step_mismatch(step)),
        }
    }

    pub(crate) fn step_mismatch(&self, step: &PathStep) -> StepError {
        match self.child_step_kind() {
            Some(expected) => StepError::UnexpectedStep {
                step: step.clone(),
                target: self.to_string(),
                expected,
            },
            None => StepError::NotComposite {
                step: step.clone(),
                target: self.to_string(),
            },
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::List(element) => write!(f, "list({element})"),
            Self::Set(element) => write!(f, "set({element})"),
            Self::Map(element) => write!(f, "map({element})"),
            Self::Object(attributes) => {
                f.write_str("object({")?;
                for (i, (name, ty)) in attributes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn server() -> Type {
        Type::object([("host", Type::String), ("port", Type::Number)])
    }

    #[test]
    fn display_nested() {
        assert_eq!(
            Type::list(server()).to_string(),
            "list(object({host: string, port: number}))"
        );
        assert_eq!(Type::map(Type::set(Type::Bool)).to_string(), "map(set(bool))");
    }

    #[test]
    fn object_step() {
        let ty = server();
        let step = PathStep::AttributeName("port".into());
        assert_eq!(ty.apply_path_step(&step).unwrap(), &Type::Number);

        let missing = PathStep::AttributeName("user".into());
        assert!(matches!(
            ty.apply_path_step(&missing),
            Err(StepError::NoSuchAttribute { .. })
        ));
    }

    #[test]
    fn collection_steps() {
        let list = Type::list(Type::String);
        assert_eq!(
            list.apply_path_step(&PathStep::ElementKeyInt(7)).unwrap(),
            &Type::String
        );
        assert!(matches!(
            list.apply_path_step(&PathStep::ElementKeyInt(-1)),
            Err(StepError::NegativeIndex { index: -1 })
        ));

        let set = Type::set(Type::String);
        let element = PathStep::ElementKeyValue(Value::string("x"));
        assert_eq!(set.apply_path_step(&element).unwrap(), &Type::String);

        let map = Type::map(Type::Number);
        let key = PathStep::ElementKeyString("anything".into());
        assert_eq!(map.apply_path_step(&key).unwrap(), &Type::Number);
    }

    #[test]
    fn mismatched_step_names_expected_kind() {
        let map = Type::map(Type::Number);
        let err = map.apply_path_step(&PathStep::ElementKeyInt(0)).unwrap_err();
        assert_eq!(
            err,
            StepError::UnexpectedStep {
                step: PathStep::ElementKeyInt(0),
                target: "map(number)".into(),
                expected: StepKind::ElementKeyString,
            }
        );
    }

    #[test]
    fn primitive_rejects_every_step() {
        let err = Type::String
            .apply_path_step(&PathStep::AttributeName("x".into()))
            .unwrap_err();
        assert!(matches!(err, StepError::NotComposite { .. }));
    }

    #[test]
    fn serde_forms() {
        let ty: Type = serde_json::from_str(r#"{"list": {"object": {"a": "string"}}}"#).unwrap();
        assert_eq!(ty, Type::list(Type::object([("a", Type::String)])));

        let json = serde_json::to_string(&Type::map(Type::Bool)).unwrap();
        assert_eq!(json, r#"{"map":"bool"}"#);
    }
}
