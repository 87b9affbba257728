//! Typed dynamic values
//!
//! Provides [`Value`], an immutable node of a typed value tree. Collection
//! payloads are persistent ([`im::Vector`], [`im::OrdMap`]), so clones are
//! cheap and [`Value::set_at_path`] only rebuilds the spine from the root to
//! the replaced node.

use std::fmt::{self, Display, Formatter};

use im::{OrdMap, Vector};
use serde_json::Number;

use crate::path::{AttributePath, PathStep, StepError};
use crate::types::Type;

/// Typed value node
///
/// Every value carries its [`Type`] and is either null, unknown (not yet
/// determined, e.g. computed during apply) or known.
///
/// # Invariants
/// - Known collection elements all have the declared element type
/// - Known objects hold exactly the attributes of their object type
/// - Fully-known set elements are pairwise distinct
#[derive(Debug, Clone)]
pub struct Value {
    ty: Type,
    state: State,
}

#[derive(Debug, Clone)]
enum State {
    Null,
    Unknown,
    Known(Data),
}

#[derive(Debug, Clone)]
enum Data {
    String(String),
    Number(Number),
    Bool(bool),
    List(Vector<Value>),
    Set(Vector<Value>),
    Map(OrdMap<String, Value>),
    Object(OrdMap<String, Value>),
}

impl Data {
    /// Empty payload used when a null or unknown parent is written through
    fn empty_for(ty: &Type) -> Option<Self> {
        match ty {
            Type::List(_) => Some(Self::List(Vector::new())),
            Type::Set(_) => Some(Self::Set(Vector::new())),
            Type::Map(_) => Some(Self::Map(OrdMap::new())),
            Type::Object(attributes) => Some(Self::Object(
                attributes
                    .iter()
                    .map(|(name, ty)| (name.clone(), Value::null(ty.clone())))
                    .collect(),
            )),
            Type::String | Type::Number | Type::Bool => None,
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => same_elements(a, b),
            (Self::Map(a), Self::Map(b)) | (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Order-independent, one-to-one comparison of set elements
fn same_elements(a: &Vector<Value>, b: &Vector<Value>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = b.iter().collect();
    a.iter().all(|x| match unmatched.iter().position(|y| *y == x) {
        Some(i) => {
            unmatched.swap_remove(i);
            true
        }
        None => false,
    })
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Unknown, Self::Unknown) => true,
            (Self::Known(a), Self::Known(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.state == other.state
    }
}

impl Value {
    fn known(ty: Type, data: Data) -> Self {
        Self {
            ty,
            state: State::Known(data),
        }
    }

    /// Known string
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::known(Type::String, Data::String(value.into()))
    }

    /// Known number
    #[inline]
    #[must_use]
    pub fn number(value: impl Into<Number>) -> Self {
        Self::known(Type::Number, Data::Number(value.into()))
    }

    /// Known number from a float; `None` for NaN and infinities
    #[inline]
    #[must_use]
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::number)
    }

    /// Known boolean
    #[inline]
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::known(Type::Bool, Data::Bool(value))
    }

    /// Null value of the given type
    #[inline]
    #[must_use]
    pub fn null(ty: Type) -> Self {
        Self {
            ty,
            state: State::Null,
        }
    }

    /// Unknown value of the given type
    #[inline]
    #[must_use]
    pub fn unknown(ty: Type) -> Self {
        Self {
            ty,
            state: State::Unknown,
        }
    }

    /// Known list
    ///
    /// # Errors
    /// Returns error if an element's type differs from `element_type`
    pub fn list(
        element_type: Type,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Self, ValueError> {
        let items = collect_elements(&element_type, items)?;
        Ok(Self::known(Type::list(element_type), Data::List(items)))
    }

    /// Known set
    ///
    /// # Errors
    /// Returns error if an element's type differs from `element_type`, or
    /// two fully-known elements are equal
    pub fn set(
        element_type: Type,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Self, ValueError> {
        let items = collect_elements(&element_type, items)?;
        for (i, item) in items.iter().enumerate() {
            if item.is_fully_known() && items.iter().skip(i + 1).any(|other| other == item) {
                return Err(ValueError::DuplicateSetElement(item.to_string()));
            }
        }
        Ok(Self::known(Type::set(element_type), Data::Set(items)))
    }

    /// Known map
    ///
    /// # Errors
    /// Returns error if an element's type differs from `element_type`
    pub fn map<K: Into<String>>(
        element_type: Type,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, ValueError> {
        let mut map = OrdMap::new();
        for (key, value) in entries {
            check_type(&element_type, &value)?;
            map.insert(key.into(), value);
        }
        Ok(Self::known(Type::map(element_type), Data::Map(map)))
    }

    /// Known object whose type is derived from its fields
    #[must_use]
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let attributes: OrdMap<String, Value> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        let ty = Type::Object(
            attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.ty.clone()))
                .collect(),
        );
        Self::known(ty, Data::Object(attributes))
    }

    /// Known object of a given object type
    ///
    /// Attributes absent from `fields` are null.
    ///
    /// # Errors
    /// Returns error if `ty` is not an object type, a field is not declared
    /// by it, or a field's type differs from the declared one
    pub fn object_of_type<K: Into<String>>(
        ty: &Type,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, ValueError> {
        let Some(types) = ty.attribute_types() else {
            return Err(ValueError::NotAnObjectType(ty.clone()));
        };
        let mut attributes: OrdMap<String, Value> = types
            .iter()
            .map(|(name, ty)| (name.clone(), Value::null(ty.clone())))
            .collect();
        for (name, value) in fields {
            let name = name.into();
            let Some(expected) = types.get(&name) else {
                return Err(ValueError::UnexpectedAttribute {
                    name,
                    ty: ty.clone(),
                });
            };
            check_type(expected, &value)?;
            attributes.insert(name, value);
        }
        Ok(Self::known(ty.clone(), Data::Object(attributes)))
    }

    /// Type of this value
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Check if null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.state, State::Null)
    }

    /// Check if unknown
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self.state, State::Unknown)
    }

    /// Check if known (possibly containing unknowns deeper down)
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self.state, State::Known(_))
    }

    /// Check that no unknown value occurs anywhere in this tree
    #[must_use]
    pub fn is_fully_known(&self) -> bool {
        match &self.state {
            State::Null => true,
            State::Unknown => false,
            State::Known(data) => match data {
                Data::List(items) | Data::Set(items) => items.iter().all(Value::is_fully_known),
                Data::Map(entries) | Data::Object(entries) => {
                    entries.values().all(Value::is_fully_known)
                }
                Data::String(_) | Data::Number(_) | Data::Bool(_) => true,
            },
        }
    }

    /// Known string payload
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.state {
            State::Known(Data::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Known number payload
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match &self.state {
            State::Known(Data::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// Known boolean payload
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &self.state {
            State::Known(Data::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Known list elements
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&Vector<Value>> {
        match &self.state {
            State::Known(Data::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Known set elements
    #[inline]
    #[must_use]
    pub fn as_set(&self) -> Option<&Vector<Value>> {
        match &self.state {
            State::Known(Data::Set(items)) => Some(items),
            _ => None,
        }
    }

    /// Known map entries
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&OrdMap<String, Value>> {
        match &self.state {
            State::Known(Data::Map(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Known object attributes
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&OrdMap<String, Value>> {
        match &self.state {
            State::Known(Data::Object(attributes)) => Some(attributes),
            _ => None,
        }
    }

    /// Number of elements of a known list, set or map
    #[inline]
    #[must_use]
    pub fn element_count(&self) -> Option<usize> {
        match &self.state {
            State::Known(Data::List(items) | Data::Set(items)) => Some(items.len()),
            State::Known(Data::Map(entries)) => Some(entries.len()),
            _ => None,
        }
    }

    /// Direct children of a known composite value, with the step reaching each
    #[must_use]
    pub fn children(&self) -> Vec<(PathStep, &Value)> {
        match &self.state {
            State::Known(Data::List(items)) => items
                .iter()
                .zip(0_i64..)
                .map(|(item, i)| (PathStep::ElementKeyInt(i), item))
                .collect(),
            State::Known(Data::Set(items)) => items
                .iter()
                .map(|item| (PathStep::ElementKeyValue(item.clone()), item))
                .collect(),
            State::Known(Data::Map(entries)) => entries
                .iter()
                .map(|(key, item)| (PathStep::ElementKeyString(key.clone()), item))
                .collect(),
            State::Known(Data::Object(attributes)) => attributes
                .iter()
                .map(|(name, item)| (PathStep::AttributeName(name.clone()), item))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Child reached by applying one step
    ///
    /// # Errors
    /// Returns error if the step does not fit this value's type, this value
    /// is null or unknown, or no element matches the step
    pub fn apply_path_step(&self, step: &PathStep) -> Result<&Value, StepError> {
        self.ty.apply_path_step(step)?;
        let data = match &self.state {
            State::Null => return Err(StepError::NullValue { step: step.clone() }),
            State::Unknown => return Err(StepError::UnknownValue { step: step.clone() }),
            State::Known(data) => data,
        };
        let found = match (data, step) {
            (Data::Object(attributes), PathStep::AttributeName(name)) => attributes.get(name),
            (Data::List(items), PathStep::ElementKeyInt(index)) => {
                usize::try_from(*index).ok().and_then(|i| items.get(i))
            }
            (Data::Set(items), PathStep::ElementKeyValue(needle)) => {
                items.iter().find(|item| *item == needle)
            }
            (Data::Map(entries), PathStep::ElementKeyString(key)) => entries.get(key),
            _ => return Err(self.ty.step_mismatch(step)),
        };
        found.ok_or_else(|| StepError::ElementNotFound { step: step.clone() })
    }

    /// Node at the end of a path
    ///
    /// # Errors
    /// Returns the first step failure along the path
    pub fn at_path(&self, path: &AttributePath) -> Result<&Value, StepError> {
        path.iter()
            .try_fold(self, |node, step| node.apply_path_step(step))
    }

    /// New tree with the node at `path` replaced by `new`
    ///
    /// Null or unknown parents are materialised (objects with all-null
    /// attributes, empty collections). A list index equal to the list length
    /// appends, an absent map key or set element is inserted. The original
    /// tree is left untouched.
    ///
    /// # Errors
    /// Returns error if the path does not fit the type, a list index is past
    /// the end, or `new` has a different type than the target node
    pub fn set_at_path(&self, path: &AttributePath, new: Value) -> Result<Value, SetError> {
        self.set_at_steps(path.steps(), new)
    }

    fn set_at_steps(&self, steps: &[PathStep], new: Value) -> Result<Value, SetError> {
        let Some((step, rest)) = steps.split_first() else {
            if new.ty != self.ty {
                return Err(SetError::TypeMismatch {
                    expected: self.ty.clone(),
                    found: new.ty,
                });
            }
            return Ok(new);
        };

        let child_type = self.ty.apply_path_step(step)?;
        let data = match &self.state {
            State::Known(data) => data.clone(),
            State::Null | State::Unknown => {
                Data::empty_for(&self.ty).ok_or_else(|| self.ty.step_mismatch(step))?
            }
        };

        let data = match (data, step) {
            (Data::Object(mut attributes), PathStep::AttributeName(name)) => {
                let current = attributes
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Value::null(child_type.clone()));
                attributes.insert(name.clone(), current.set_at_steps(rest, new)?);
                Data::Object(attributes)
            }
            (Data::List(mut items), PathStep::ElementKeyInt(index)) => {
                let len = items.len();
                match usize::try_from(*index) {
                    Ok(i) if i < len => {
                        let updated = items[i].set_at_steps(rest, new)?;
                        items.set(i, updated);
                    }
                    Ok(i) if i == len => {
                        let updated = Value::null(child_type.clone()).set_at_steps(rest, new)?;
                        items.push_back(updated);
                    }
                    _ => {
                        return Err(SetError::IndexOutOfRange { index: *index, len });
                    }
                }
                Data::List(items)
            }
            (Data::Map(mut entries), PathStep::ElementKeyString(key)) => {
                let current = entries
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Value::null(child_type.clone()));
                entries.insert(key.clone(), current.set_at_steps(rest, new)?);
                Data::Map(entries)
            }
            (Data::Set(mut items), PathStep::ElementKeyValue(element)) => {
                if element.ty != *child_type {
                    return Err(SetError::TypeMismatch {
                        expected: child_type.clone(),
                        found: element.ty.clone(),
                    });
                }
                let position = items.iter().position(|item| item == element);
                let current = position.map_or_else(|| element.clone(), |p| items[p].clone());
                let updated = current.set_at_steps(rest, new)?;
                if let Some(p) = position {
                    items.remove(p);
                }
                if !items.iter().any(|item| *item == updated) {
                    items.insert(position.unwrap_or(items.len()), updated);
                }
                Data::Set(items)
            }
            (_, step) => return Err(self.ty.step_mismatch(step).into()),
        };
        Ok(Self::known(self.ty.clone(), data))
    }

    /// Pre-order traversal of the tree
    ///
    /// `visit` receives each node with its path from this value and returns
    /// whether to descend into the node's children.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&AttributePath, &Value) -> bool,
    {
        self.walk_from(&AttributePath::root(), visit);
    }

    fn walk_from<F>(&self, path: &AttributePath, visit: &mut F)
    where
        F: FnMut(&AttributePath, &Value) -> bool,
    {
        if !visit(path, self) {
            return;
        }
        for (step, child) in self.children() {
            child.walk_from(&path.child(step), visit);
        }
    }
}

fn check_type(expected: &Type, value: &Value) -> Result<(), ValueError> {
    if value.ty == *expected {
        Ok(())
    } else {
        Err(ValueError::ElementType {
            expected: expected.clone(),
            found: value.ty.clone(),
        })
    }
}

fn collect_elements(
    element_type: &Type,
    items: impl IntoIterator<Item = Value>,
) -> Result<Vector<Value>, ValueError> {
    items
        .into_iter()
        .map(|item| check_type(element_type, &item).map(|()| item))
        .collect()
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let data = match &self.state {
            State::Null => return f.write_str("null"),
            State::Unknown => return f.write_str("<unknown>"),
            State::Known(data) => data,
        };
        match data {
            Data::String(s) => write!(f, "{s:?}"),
            Data::Number(n) => write!(f, "{n}"),
            Data::Bool(b) => write!(f, "{b}"),
            Data::List(items) | Data::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Data::Map(entries) | Data::Object(entries) => {
                f.write_str("{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Value construction and conversion errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Element or field of the wrong type
    #[error("expected value of type {expected}, found {found}")]
    ElementType {
        /// Declared element type
        expected: Type,
        /// Type of the offending value
        found: Type,
    },

    /// Two equal fully-known set elements
    #[error("duplicate set element {0}")]
    DuplicateSetElement(String),

    /// Object construction against a non-object type
    #[error("{0} is not an object type")]
    NotAnObjectType(Type),

    /// Field not declared by the object type
    #[error("unexpected attribute {name:?} for {ty}")]
    UnexpectedAttribute {
        /// Undeclared attribute name
        name: String,
        /// Object type being built
        ty: Type,
    },

    /// JSON shape does not fit the target type
    #[error("cannot convert JSON {found} into {expected}")]
    JsonMismatch {
        /// Target type
        expected: Type,
        /// JSON kind found instead
        found: &'static str,
    },

    /// Unknown values have no JSON or host representation
    #[error("unknown value cannot be converted")]
    UnknownValue,

    /// Host type (de)serialization failed
    #[error("conversion failed: {0}")]
    Conversion(String),
}

/// Errors from [`Value::set_at_path`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetError {
    /// Path does not fit the tree's type
    #[error(transparent)]
    Step(#[from] StepError),

    /// Replacement of the wrong type
    #[error("cannot set value of type {found} where {expected} is expected")]
    TypeMismatch {
        /// Expected type
        expected: Type,
        /// Actual type
        found: Type,
    },

    /// List index beyond the append position
    #[error("list index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// Current list length
        len: usize,
    },
}
