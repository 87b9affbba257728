//! Validators
//!
//! Validators attach to attributes and blocks and inspect configuration.
//! They report problems as diagnostics instead of failing, so one run of
//! [`validate_config`](crate::validate_config) surfaces every problem at
//! once.

use schemata_value::{AttributePath, PathExpression, Value};

use crate::data::Config;
use crate::diagnostics::Diagnostics;

/// Input handed to a validator
#[derive(Debug)]
pub struct ValidateRequest<'a> {
    /// Path of the node being validated
    pub path: AttributePath,

    /// Expression form of [`path`](Self::path), the anchor for relative
    /// expressions
    pub path_expression: PathExpression,

    /// The node's configured value
    pub config_value: Value,

    /// Whole resource configuration
    pub config: &'a Config,
}

/// Output collected from a validator
#[derive(Debug, Default)]
pub struct ValidateResponse {
    /// Findings
    pub diagnostics: Diagnostics,
}

/// Validates an attribute's configured value
pub trait AttributeValidator: Send + Sync {
    /// Human-readable description of what is checked
    fn description(&self) -> String;

    /// Check the value and report findings
    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse);
}

/// Validates a block's configured value
pub trait BlockValidator: Send + Sync {
    /// Human-readable description of what is checked
    fn description(&self) -> String;

    /// Check the value and report findings
    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse);
}

/// Paths matched by `expressions` relative to the request, other than the
/// request's own path
fn matched_paths(
    expressions: &[PathExpression],
    request: &ValidateRequest<'_>,
    response: &mut ValidateResponse,
) -> Vec<AttributePath> {
    let mut paths = Vec::new();
    for expression in expressions {
        let merged = expression.merge(&request.path);
        match request.config.path_matches(&merged) {
            Ok(matched) => paths.extend(matched.into_iter().filter(|p| *p != request.path)),
            Err(err) => response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Path Expression for Schema",
                format!("The validator for {} has an invalid path expression: {err}", request.path),
            ),
        }
    }
    paths
}

fn join_expressions(expressions: &[PathExpression]) -> String {
    expressions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rejects configuring the node together with any of the matched nodes
#[derive(Debug, Clone)]
pub struct ConflictsWith {
    expressions: Vec<PathExpression>,
}

impl ConflictsWith {
    /// Conflict with every node matched by `expressions`
    #[must_use]
    pub fn new(expressions: impl IntoIterator<Item = PathExpression>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
        }
    }

    fn check(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        if request.config_value.is_null() || request.config_value.is_unknown() {
            return;
        }
        for path in matched_paths(&self.expressions, request, response) {
            let Ok(other) = request.config.get_value(&path) else {
                continue;
            };
            if !other.is_null() && !other.is_unknown() {
                response.diagnostics.add_attribute_error(
                    &request.path,
                    "Invalid Attribute Combination",
                    format!("Attribute {path} cannot be specified when {} is specified", request.path),
                );
            }
        }
    }
}

impl AttributeValidator for ConflictsWith {
    fn description(&self) -> String {
        format!("Ensure that if an attribute is set, these are not set: [{}]", join_expressions(&self.expressions))
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

impl BlockValidator for ConflictsWith {
    fn description(&self) -> String {
        AttributeValidator::description(self)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

/// Requires the matched nodes whenever the node is configured
#[derive(Debug, Clone)]
pub struct AlsoRequires {
    expressions: Vec<PathExpression>,
}

impl AlsoRequires {
    /// Require every node matched by `expressions`
    #[must_use]
    pub fn new(expressions: impl IntoIterator<Item = PathExpression>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
        }
    }

    fn check(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        if request.config_value.is_null() {
            return;
        }
        for path in matched_paths(&self.expressions, request, response) {
            let Ok(other) = request.config.get_value(&path) else {
                continue;
            };
            if other.is_null() {
                response.diagnostics.add_attribute_error(
                    &request.path,
                    "Missing Attribute Configuration",
                    format!("Attribute {path} must be specified when {} is specified", request.path),
                );
            }
        }
    }
}

impl AttributeValidator for AlsoRequires {
    fn description(&self) -> String {
        format!("Ensure that if an attribute is set, also these are set: [{}]", join_expressions(&self.expressions))
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

impl BlockValidator for AlsoRequires {
    fn description(&self) -> String {
        AttributeValidator::description(self)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

/// Bounds the length of a string (in characters) or a collection (in
/// elements)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBetween {
    min: usize,
    max: usize,
}

impl LengthBetween {
    /// Inclusive bounds
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    fn length(value: &Value) -> Option<usize> {
        value
            .as_str()
            .map(|s| s.chars().count())
            .or_else(|| value.element_count())
    }

    fn check(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        let Some(length) = Self::length(&request.config_value) else {
            return;
        };
        if length < self.min || length > self.max {
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Value Length",
                format!(
                    "Attribute {} {}, got: {length}",
                    request.path,
                    AttributeValidator::description(self)
                ),
            );
        }
    }
}

impl AttributeValidator for LengthBetween {
    fn description(&self) -> String {
        format!("length must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

impl BlockValidator for LengthBetween {
    fn description(&self) -> String {
        AttributeValidator::description(self)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

/// Restricts a string to a fixed set of values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOf {
    values: Vec<String>,
    ignore_case: bool,
}

impl OneOf {
    /// Accept exactly these values
    #[must_use]
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            ignore_case: false,
        }
    }

    /// Compare without regard to ASCII case
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    fn accepts(&self, value: &str) -> bool {
        self.values.iter().any(|allowed| {
            if self.ignore_case {
                allowed.eq_ignore_ascii_case(value)
            } else {
                allowed == value
            }
        })
    }
}

impl AttributeValidator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {:?}", self.values)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        let Some(value) = request.config_value.as_str() else {
            return;
        };
        if !self.accepts(value) {
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Value Match",
                format!("Attribute {} {}, got: {value:?}", request.path, self.description()),
            );
        }
    }
}

/// Bounds a number, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberBetween {
    min: f64,
    max: f64,
}

impl NumberBetween {
    /// Inclusive bounds
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound only
    #[must_use]
    pub fn at_least(min: f64) -> Self {
        Self::new(min, f64::INFINITY)
    }

    /// Upper bound only
    #[must_use]
    pub fn at_most(max: f64) -> Self {
        Self::new(f64::NEG_INFINITY, max)
    }
}

impl AttributeValidator for NumberBetween {
    fn description(&self) -> String {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, false) => format!("value must be at least {}", self.min),
            (false, true) => format!("value must be at most {}", self.max),
            _ => format!("value must be between {} and {}", self.min, self.max),
        }
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        let Some(number) = request.config_value.as_number() else {
            return;
        };
        let Some(value) = number.as_f64() else {
            return;
        };
        if value < self.min || value > self.max {
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {number}", request.path, self.description()),
            );
        }
    }
}

/// Configured paths among the node and its matched paths, and whether
/// any of them is unknown
fn count_configured(
    expressions: &[PathExpression],
    request: &ValidateRequest<'_>,
    response: &mut ValidateResponse,
) -> (Vec<AttributePath>, bool) {
    let mut configured = Vec::new();
    let mut unknown = false;
    let mut note = |path: AttributePath, value: &Value| {
        if value.is_unknown() {
            unknown = true;
        } else if !value.is_null() {
            configured.push(path);
        }
    };
    note(request.path.clone(), &request.config_value);
    for path in matched_paths(expressions, request, response) {
        if let Ok(value) = request.config.get_value(&path) {
            note(path, &value);
        }
    }
    (configured, unknown)
}

fn with_self(expressions: &[PathExpression], request: &ValidateRequest<'_>) -> String {
    let mut names = vec![request.path.to_string()];
    names.extend(expressions.iter().map(|e| e.merge(&request.path).resolve().to_string()));
    names.join(", ")
}

/// Requires exactly one of the node and the matched nodes to be configured
#[derive(Debug, Clone)]
pub struct ExactlyOneOf {
    expressions: Vec<PathExpression>,
}

impl ExactlyOneOf {
    /// The node plus every node matched by `expressions`
    #[must_use]
    pub fn new(expressions: impl IntoIterator<Item = PathExpression>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
        }
    }

    fn check(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        let (configured, unknown) = count_configured(&self.expressions, request, response);
        if configured.len() > 1 {
            let found = configured
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Combination",
                format!(
                    "{} attributes specified when one (and only one) of [{}] is required: [{found}]",
                    configured.len(),
                    with_self(&self.expressions, request)
                ),
            );
        } else if configured.is_empty() && !unknown {
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Combination",
                format!(
                    "No attribute specified when one (and only one) of [{}] is required",
                    with_self(&self.expressions, request)
                ),
            );
        }
    }
}

impl AttributeValidator for ExactlyOneOf {
    fn description(&self) -> String {
        format!("Ensure that one and only one attribute from this collection is set: [{}]", join_expressions(&self.expressions))
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

impl BlockValidator for ExactlyOneOf {
    fn description(&self) -> String {
        AttributeValidator::description(self)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

/// Requires at least one of the node and the matched nodes to be configured
#[derive(Debug, Clone)]
pub struct AtLeastOneOf {
    expressions: Vec<PathExpression>,
}

impl AtLeastOneOf {
    /// The node plus every node matched by `expressions`
    #[must_use]
    pub fn new(expressions: impl IntoIterator<Item = PathExpression>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
        }
    }

    fn check(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        let (configured, unknown) = count_configured(&self.expressions, request, response);
        if configured.is_empty() && !unknown {
            response.diagnostics.add_attribute_error(
                &request.path,
                "Invalid Attribute Combination",
                format!(
                    "At least one attribute out of [{}] must be specified",
                    with_self(&self.expressions, request)
                ),
            );
        }
    }
}

impl AttributeValidator for AtLeastOneOf {
    fn description(&self) -> String {
        format!("Ensure that at least one attribute from this collection is set: [{}]", join_expressions(&self.expressions))
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}

impl BlockValidator for AtLeastOneOf {
    fn description(&self) -> String {
        AttributeValidator::description(self)
    }

    fn validate(&self, request: &ValidateRequest<'_>, response: &mut ValidateResponse) {
        self.check(request, response);
    }
}
