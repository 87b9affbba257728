//! Typed data views
//!
//! A [`Data`] pairs a [`Schema`] with one snapshot of a resource's value
//! tree. The role decides what the snapshot means and whether it may be
//! rewritten:
//!
//! - [`Config`]: what the user wrote, read-only, may contain unknowns
//! - [`Plan`]: the proposed new state, writable through copy-on-write
//! - [`State`]: the applied state, read-only and fully known
//!
//! Reads resolve the path against the schema first, so a typo in a path is
//! an error even when the snapshot has no data there.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use schemata_value::{AttributePath, PathExpression, PathStep, SetError, StepError, Type, Value, ValueError};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ResolveError;
use crate::schema::Schema;

/// Role of a data snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataRole {
    /// User configuration
    Config,

    /// Proposed new state
    Plan,

    /// Applied state
    State,
}

impl fmt::Display for DataRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Plan => "plan",
            Self::State => "state",
        };
        f.write_str(name)
    }
}

/// Errors from data views
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Path does not resolve against the schema
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Raw value's type differs from what the schema expects
    #[error("{role} value at {path} has type {found}, expected {expected}")]
    TypeMismatch {
        /// Role of the snapshot
        role: DataRole,
        /// Where the mismatch was found
        path: AttributePath,
        /// Expected type
        expected: Type,
        /// Actual type
        found: Type,
    },

    /// State snapshot holds unknowns
    #[error("state must be fully known")]
    UnknownInState,

    /// Null value read into a host type that cannot hold null
    #[error("no value present at {path}")]
    NullValue {
        /// Path of the offending node
        path: AttributePath,
    },

    /// Unknown value read into a host type
    #[error("value at {path} is not yet known")]
    UnknownValue {
        /// Path of the offending node
        path: AttributePath,
    },

    /// Host type does not fit the value
    #[error("cannot convert value at {path}: {source}")]
    Conversion {
        /// Path of the offending node
        path: AttributePath,
        /// Underlying conversion failure
        source: ValueError,
    },

    /// Snapshot rejected a write
    #[error("cannot set value at {path}: {source}")]
    Set {
        /// Path of the offending node
        path: AttributePath,
        /// Underlying write failure
        source: SetError,
    },

    /// Concrete snapshot does not fit the path
    #[error("cannot read value at {path}: {source}")]
    Step {
        /// Path of the offending node
        path: AttributePath,
        /// Underlying step failure
        source: StepError,
    },

    /// Write to a config or state snapshot
    #[error("{role} data is read-only")]
    ReadOnly {
        /// Role of the snapshot
        role: DataRole,
    },

    /// Path expression does not resolve against the schema
    #[error("path expression {expression} does not resolve: {source}")]
    InvalidExpression {
        /// Expression as written
        expression: String,
        /// Underlying resolution failure
        source: ResolveError,
    },
}

/// Schema-bound snapshot of a resource value
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    role: DataRole,
    schema: Arc<Schema>,
    raw: Value,
}

impl Data {
    /// Bind a raw value to a schema
    ///
    /// A null root stands for an absent resource and is accepted for every
    /// role.
    ///
    /// # Errors
    /// Returns error if the raw type differs from the schema type, or a
    /// state snapshot contains unknowns
    pub fn new(role: DataRole, schema: Arc<Schema>, raw: Value) -> Result<Self, DataError> {
        let expected = schema.ty();
        if *raw.ty() != expected {
            return Err(DataError::TypeMismatch {
                role,
                path: AttributePath::root(),
                expected,
                found: raw.ty().clone(),
            });
        }
        if role == DataRole::State && !raw.is_fully_known() {
            return Err(DataError::UnknownInState);
        }
        Ok(Self { role, schema, raw })
    }

    /// Snapshot of an absent resource
    #[must_use]
    pub fn null(role: DataRole, schema: Arc<Schema>) -> Self {
        let raw = Value::null(schema.ty());
        Self { role, schema, raw }
    }

    /// Role
    #[inline]
    #[must_use]
    pub fn role(&self) -> DataRole {
        self.role
    }

    /// Schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Whole raw value
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Raw value at a path
    ///
    /// Descending through a null parent or to a missing list index, map key
    /// or set element yields a null of the resolved type; descending through
    /// an unknown parent yields an unknown.
    ///
    /// # Errors
    /// Returns error if the path does not resolve against the schema
    pub fn get_value(&self, path: &AttributePath) -> Result<Value, DataError> {
        let ty = self.schema.type_at_path(path)?;
        let value = lookup(&self.raw, path.steps(), &ty).map_err(|source| DataError::Step {
            path: path.clone(),
            source,
        })?;
        tracing::trace!(role = %self.role, %path, value = %value, "Data read");
        Ok(value)
    }

    /// Host value at a path
    ///
    /// Null converts when `T` accepts a JSON null (e.g. `Option<_>`).
    ///
    /// # Errors
    /// Returns error if the path does not resolve, the value is null and `T`
    /// cannot hold null, the value is (partially) unknown, or `T` does not
    /// fit the value
    pub fn get<T: DeserializeOwned>(&self, path: &AttributePath) -> Result<T, DataError> {
        let value = self.get_value(path)?;
        if value.is_null() {
            return serde_json::from_value(serde_json::Value::Null)
                .map_err(|_| DataError::NullValue { path: path.clone() });
        }
        value.to_typed().map_err(|source| match source {
            ValueError::UnknownValue => DataError::UnknownValue { path: path.clone() },
            source => DataError::Conversion {
                path: path.clone(),
                source,
            },
        })
    }

    /// Whole snapshot as a host value
    ///
    /// # Errors
    /// See [`Data::get`]
    pub fn get_whole<T: DeserializeOwned>(&self) -> Result<T, DataError> {
        self.get(&AttributePath::root())
    }

    /// New snapshot with the node at `path` replaced
    ///
    /// # Errors
    /// Returns error if this is not a plan, the path does not resolve, or
    /// `value`'s type differs from the resolved type
    pub fn set_value(&self, path: &AttributePath, value: Value) -> Result<Self, DataError> {
        if self.role != DataRole::Plan {
            return Err(DataError::ReadOnly { role: self.role });
        }
        let expected = self.schema.type_at_path(path)?;
        if *value.ty() != expected {
            return Err(DataError::TypeMismatch {
                role: self.role,
                path: path.clone(),
                expected,
                found: value.ty().clone(),
            });
        }
        let raw = self
            .raw
            .set_at_path(path, value)
            .map_err(|source| DataError::Set {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(role = %self.role, %path, "Data written");
        Ok(Self {
            role: self.role,
            schema: Arc::clone(&self.schema),
            raw,
        })
    }

    /// New snapshot with a host value written at `path`
    ///
    /// # Errors
    /// As [`Data::set_value`], or if `value` does not fit the resolved type
    pub fn set_attribute<T: Serialize>(&self, path: &AttributePath, value: &T) -> Result<Self, DataError> {
        if self.role != DataRole::Plan {
            return Err(DataError::ReadOnly { role: self.role });
        }
        let ty = self.schema.type_at_path(path)?;
        let value = Value::from_typed(&ty, value).map_err(|source| DataError::Conversion {
            path: path.clone(),
            source,
        })?;
        self.set_value(path, value)
    }

    /// Concrete paths matched by an expression
    ///
    /// Relative expressions are anchored at the root. Where descent stops
    /// at a null or unknown node that the expression passes through, that
    /// node's path is reported as a match.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidExpression`] if the expression does not
    /// resolve against the schema
    pub fn path_matches(&self, expression: &PathExpression) -> Result<Vec<AttributePath>, DataError> {
        let expression = expression.merge(&AttributePath::root()).resolve();
        self.schema
            .type_at_expression(&expression)
            .map_err(|source| DataError::InvalidExpression {
                expression: expression.to_string(),
                source,
            })?;

        let mut matches = Vec::new();
        self.raw.walk(&mut |path, value| {
            if expression.matches(path) {
                matches.push(path.clone());
                return false;
            }
            if !expression.matches_parent(path) {
                return false;
            }
            if value.is_null() || value.is_unknown() {
                matches.push(path.clone());
                return false;
            }
            true
        });
        tracing::trace!(role = %self.role, %expression, matches = matches.len(), "Expression matched");
        Ok(matches)
    }
}

/// Follow `steps` through a concrete value, producing a value of type `ty`
///
/// Missing data along the way becomes null (or unknown below an unknown
/// node); shape mismatches are errors.
pub(crate) fn lookup(root: &Value, steps: &[PathStep], ty: &Type) -> Result<Value, StepError> {
    let mut current = root;
    for step in steps {
        if current.is_null() {
            return Ok(Value::null(ty.clone()));
        }
        if current.is_unknown() {
            return Ok(Value::unknown(ty.clone()));
        }
        match current.apply_path_step(step) {
            Ok(child) => current = child,
            Err(StepError::ElementNotFound { .. }) => return Ok(Value::null(ty.clone())),
            Err(err) => return Err(err),
        }
    }
    Ok(current.clone())
}

macro_rules! role_view {
    ($(#[$meta:meta])* $name:ident, $role:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(Data);

        impl $name {
            /// Bind a raw value to a schema
            ///
            /// # Errors
            /// See [`Data::new`]
            pub fn new(schema: Arc<Schema>, raw: Value) -> Result<Self, DataError> {
                Data::new($role, schema, raw).map(Self)
            }

            /// Snapshot of an absent resource
            #[must_use]
            pub fn null(schema: Arc<Schema>) -> Self {
                Self(Data::null($role, schema))
            }

            /// Build from a JSON document
            ///
            /// # Errors
            /// Returns error if the document does not fit the schema type
            pub fn from_json(schema: Arc<Schema>, json: serde_json::Value) -> Result<Self, DataError> {
                let raw = Value::from_json(&schema.ty(), json).map_err(|source| {
                    DataError::Conversion {
                        path: AttributePath::root(),
                        source,
                    }
                })?;
                Self::new(schema, raw)
            }

            /// Untyped view
            #[inline]
            #[must_use]
            pub fn into_data(self) -> Data {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Data;

            fn deref(&self) -> &Data {
                &self.0
            }
        }
    };
}

role_view!(
    /// User configuration, read-only
    Config,
    DataRole::Config
);

role_view!(
    /// Proposed new state
    Plan,
    DataRole::Plan
);

role_view!(
    /// Applied state, read-only and fully known
    State,
    DataRole::State
);

impl Plan {
    /// New plan with the node at `path` replaced
    ///
    /// # Errors
    /// See [`Data::set_value`]
    pub fn set_value(&self, path: &AttributePath, value: Value) -> Result<Self, DataError> {
        self.0.set_value(path, value).map(Self)
    }

    /// New plan with a host value written at `path`
    ///
    /// # Errors
    /// See [`Data::set_attribute`]
    pub fn set_attribute<T: Serialize>(&self, path: &AttributePath, value: &T) -> Result<Self, DataError> {
        self.0.set_attribute(path, value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::nested::NestingMode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .attribute("name", Attribute::builder().ty(Type::String).required().build().unwrap())
                .attribute(
                    "ids",
                    Attribute::builder().ty(Type::set(Type::String)).optional().build().unwrap(),
                )
                .attribute(
                    "ports",
                    Attribute::builder()
                        .nested(
                            NestingMode::List,
                            [("port", Attribute::builder().ty(Type::Number).required().build().unwrap())],
                        )
                        .optional()
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
    }

    fn path(s: &str) -> AttributePath {
        s.parse().unwrap()
    }

    #[test]
    fn construction_checks_type() {
        let err = Plan::new(schema(), Value::object([("name", Value::string("x"))])).unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
    }

    #[test]
    fn state_must_be_fully_known() {
        let raw = Value::from_json(&schema().ty(), json!({"name": "x"}))
            .unwrap()
            .set_at_path(&path("name"), Value::unknown(Type::String))
            .unwrap();
        assert_eq!(State::new(schema(), raw.clone()).unwrap_err(), DataError::UnknownInState);
        assert!(Plan::new(schema(), raw).is_ok());
    }

    #[test]
    fn missing_elements_read_as_null() {
        let plan = Plan::from_json(schema(), json!({"name": "x", "ids": ["a"], "ports": [{"port": 1}]})).unwrap();
        assert!(plan.get_value(&path("ports[5].port")).unwrap().is_null());
        let absent = AttributePath::from_name("ids").at_set_value(Value::string("zzz"));
        assert!(plan.get_value(&absent).unwrap().is_null());
        let present = AttributePath::from_name("ids").at_set_value(Value::string("a"));
        assert_eq!(plan.get::<String>(&present).unwrap(), "a");
    }

    #[test]
    fn null_and_unknown_reads() {
        let plan = Plan::from_json(schema(), json!({})).unwrap();
        assert_eq!(
            plan.get::<String>(&path("name")),
            Err(DataError::NullValue { path: path("name") })
        );
        assert_eq!(plan.get::<Option<String>>(&path("name")).unwrap(), None);

        let plan = plan.set_value(&path("ports"), Value::unknown(schema().type_at_path(&path("ports")).unwrap())).unwrap();
        let port = plan.get_value(&path("ports[0].port")).unwrap();
        assert!(port.is_unknown());
        assert_eq!(
            plan.get::<i64>(&path("ports[0].port")),
            Err(DataError::UnknownValue { path: path("ports[0].port") })
        );
    }

    #[test]
    fn unresolvable_path_is_error() {
        let plan = Plan::null(schema());
        assert!(matches!(plan.get_value(&path("nope")), Err(DataError::Resolve(_))));
    }

    #[test]
    fn writes_only_on_plans() {
        let config = Config::from_json(schema(), json!({"name": "x"})).unwrap();
        assert_eq!(
            config.set_value(&path("name"), Value::string("y")),
            Err(DataError::ReadOnly { role: DataRole::Config })
        );
        let state = State::from_json(schema(), json!({"name": "x"})).unwrap();
        assert_eq!(
            state.set_attribute(&path("name"), &"y"),
            Err(DataError::ReadOnly { role: DataRole::State })
        );
    }

    #[test]
    fn set_leaves_original_untouched() {
        let plan = Plan::from_json(schema(), json!({"name": "x"})).unwrap();
        let updated = plan.set_attribute(&path("ports[0].port"), &8080).unwrap();
        assert_eq!(updated.get::<u16>(&path("ports[0].port")).unwrap(), 8080);
        assert!(plan.get_value(&path("ports")).unwrap().is_null());

        let err = plan.set_value(&path("name"), Value::number(1)).unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
        assert_eq!(plan.get::<String>(&path("name")).unwrap(), "x");
    }

    #[test]
    fn path_matches_reports_null_parents() {
        let plan = Plan::from_json(schema(), json!({"name": "x"})).unwrap();
        let expr = PathExpression::root().at_name("ports").at_any_list_index().at_name("port");
        assert_eq!(plan.path_matches(&expr).unwrap(), vec![path("ports")]);
    }

    #[test]
    fn path_matches_invalid_expression() {
        let plan = Plan::null(schema());
        let expr = PathExpression::root().at_name("missing");
        assert!(matches!(plan.path_matches(&expr), Err(DataError::InvalidExpression { .. })));
    }
}
