//! JSON bridge
//!
//! Converts between [`Value`] trees and `serde_json` documents, and through
//! those to any serde-compatible host type.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

use crate::types::Type;
use crate::value::{Value, ValueError};

impl Value {
    /// Build a value of type `ty` from a JSON document
    ///
    /// JSON `null` becomes a null of the expected type at any depth. Object
    /// attributes missing from the document are null; attributes not declared
    /// by the type are rejected.
    ///
    /// # Errors
    /// Returns error if the document's shape does not fit `ty`
    pub fn from_json(ty: &Type, json: JsonValue) -> Result<Self, ValueError> {
        let mismatch = |json: &JsonValue| ValueError::JsonMismatch {
            expected: ty.clone(),
            found: json_kind(json),
        };

        match (ty, json) {
            (_, JsonValue::Null) => Ok(Self::null(ty.clone())),
            (Type::String, JsonValue::String(s)) => Ok(Self::string(s)),
            (Type::Number, JsonValue::Number(n)) => Ok(Self::number(n)),
            (Type::Bool, JsonValue::Bool(b)) => Ok(Self::bool(b)),
            (Type::List(element), JsonValue::Array(items)) => Self::list(
                (**element).clone(),
                items
                    .into_iter()
                    .map(|item| Self::from_json(element, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (Type::Set(element), JsonValue::Array(items)) => Self::set(
                (**element).clone(),
                items
                    .into_iter()
                    .map(|item| Self::from_json(element, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (Type::Map(element), JsonValue::Object(entries)) => Self::map(
                (**element).clone(),
                entries
                    .into_iter()
                    .map(|(key, item)| Ok((key, Self::from_json(element, item)?)))
                    .collect::<Result<Vec<_>, ValueError>>()?,
            ),
            (Type::Object(types), JsonValue::Object(mut fields)) => {
                if let Some(name) = fields.keys().find(|name| !types.contains_key(*name)) {
                    return Err(ValueError::UnexpectedAttribute {
                        name: name.clone(),
                        ty: ty.clone(),
                    });
                }
                let converted = types
                    .iter()
                    .map(|(name, attr_type)| {
                        let field = fields.remove(name).unwrap_or(JsonValue::Null);
                        Ok((name.clone(), Self::from_json(attr_type, field)?))
                    })
                    .collect::<Result<Vec<_>, ValueError>>()?;
                Self::object_of_type(ty, converted)
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Render this value as a JSON document
    ///
    /// Sets become arrays; maps and objects become JSON objects.
    ///
    /// # Errors
    /// Returns [`ValueError::UnknownValue`] if any node is unknown
    pub fn to_json(&self) -> Result<JsonValue, ValueError> {
        if self.is_null() {
            return Ok(JsonValue::Null);
        }
        if self.is_unknown() {
            return Err(ValueError::UnknownValue);
        }
        if let Some(s) = self.as_str() {
            return Ok(JsonValue::String(s.to_string()));
        }
        if let Some(n) = self.as_number() {
            return Ok(JsonValue::Number(n.clone()));
        }
        if let Some(b) = self.as_bool() {
            return Ok(JsonValue::Bool(b));
        }
        if let Some(items) = self.as_list().or_else(|| self.as_set()) {
            return items
                .iter()
                .map(Value::to_json)
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array);
        }
        let entries = self
            .as_map()
            .or_else(|| self.as_object())
            .ok_or(ValueError::UnknownValue)?;
        entries
            .iter()
            .map(|(key, item)| Ok((key.clone(), item.to_json()?)))
            .collect::<Result<serde_json::Map<_, _>, ValueError>>()
            .map(JsonValue::Object)
    }

    /// Convert to a host type
    ///
    /// # Errors
    /// Returns error if the value contains unknowns or doesn't match `T`
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        serde_json::from_value(self.to_json()?).map_err(|e| ValueError::Conversion(e.to_string()))
    }

    /// Create from a host value, checked against `ty`
    ///
    /// # Errors
    /// Returns error if serialization fails or the result doesn't fit `ty`
    pub fn from_typed<T: Serialize>(ty: &Type, value: &T) -> Result<Self, ValueError> {
        let json = serde_json::to_value(value).map_err(|e| ValueError::Conversion(e.to_string()))?;
        Self::from_json(ty, json)
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
