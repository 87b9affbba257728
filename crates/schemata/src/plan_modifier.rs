//! Plan modifiers
//!
//! Plan modifiers adjust the proposed new value of an attribute or block
//! before it is shown to the user, and flag changes that can only be applied
//! by replacing the resource.

use schemata_value::{AttributePath, PathExpression, Value};

use crate::data::{Config, Plan, State};
use crate::diagnostics::Diagnostics;

/// Input handed to a plan modifier
#[derive(Debug)]
pub struct ModifyPlanRequest<'a> {
    /// Path of the node being planned
    pub path: AttributePath,

    /// Expression form of [`path`](Self::path)
    pub path_expression: PathExpression,

    /// The node's configured value
    pub config_value: Value,

    /// The node's prior state value
    pub state_value: Value,

    /// The node's planned value, as left by earlier modifiers
    pub plan_value: Value,

    /// Whole resource configuration
    pub config: &'a Config,

    /// Whole prior state
    pub state: &'a State,

    /// Whole plan as proposed before modification
    pub plan: &'a Plan,
}

/// Output collected from a plan modifier
#[derive(Debug)]
pub struct ModifyPlanResponse {
    /// Planned value; starts as the request's value
    pub plan_value: Value,

    /// Whether the change forces replacement of the resource
    pub requires_replace: bool,

    /// Findings
    pub diagnostics: Diagnostics,
}

impl ModifyPlanResponse {
    /// Response that keeps `plan_value` unchanged
    #[must_use]
    pub fn new(plan_value: Value) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Adjusts an attribute's planned value
pub trait AttributePlanModifier: Send + Sync {
    /// Human-readable description of the modification
    fn description(&self) -> String;

    /// Inspect the request and update the response
    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse);
}

/// Adjusts a block's planned value
pub trait BlockPlanModifier: Send + Sync {
    /// Human-readable description of the modification
    fn description(&self) -> String;

    /// Inspect the request and update the response
    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse);
}

/// Forces replacement when an existing resource's value changes
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresReplace;

impl RequiresReplace {
    fn check(request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        // Creation and destruction replace nothing
        if request.state.raw().is_null() || request.plan.raw().is_null() {
            return;
        }
        if request.plan_value == request.state_value {
            return;
        }
        response.requires_replace = true;
    }
}

impl AttributePlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be destroyed and recreated.".to_string()
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        Self::check(request, response);
    }
}

impl BlockPlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this block changes, the resource will be destroyed and recreated.".to_string()
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        Self::check(request, response);
    }
}

/// Copies the prior state value into an unknown planned value
///
/// For computed values that do not change after creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    fn apply(request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        if request.state_value.is_null() || !request.plan_value.is_unknown() {
            return;
        }
        // An unknown configuration is resolved at apply time, not from state
        if request.config_value.is_unknown() {
            return;
        }
        response.plan_value = request.state_value.clone();
    }
}

impl AttributePlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        Self::apply(request, response);
    }
}

impl BlockPlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this block in state will not change.".to_string()
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        Self::apply(request, response);
    }
}

/// Plans a fixed value when the configuration leaves the node unset
///
/// Meant for optional, computed attributes; a value of the wrong type is
/// rejected by the plan driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    value: Value,
}

impl DefaultValue {
    /// Default to `value`
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    fn apply(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        // Nothing to plan when the resource is being destroyed
        if request.plan.raw().is_null() || !request.config_value.is_null() {
            return;
        }
        response.plan_value = self.value.clone();
    }
}

impl AttributePlanModifier for DefaultValue {
    fn description(&self) -> String {
        format!("value defaults to {}", self.value)
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        self.apply(request, response);
    }
}

impl BlockPlanModifier for DefaultValue {
    fn description(&self) -> String {
        AttributePlanModifier::description(self)
    }

    fn modify(&self, request: &ModifyPlanRequest<'_>, response: &mut ModifyPlanResponse) {
        self.apply(request, response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::attribute::Attribute;
    use crate::schema::Schema;
    use schemata_value::Type;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .attribute("id", Attribute::builder().ty(Type::String).computed().build().unwrap())
                .build()
                .unwrap(),
        )
    }

    fn run(
        modifier: &dyn AttributePlanModifier,
        config: &Config,
        state: &State,
        plan: &Plan,
    ) -> ModifyPlanResponse {
        let path = AttributePath::from_name("id");
        let request = ModifyPlanRequest {
            path_expression: PathExpression::exact(&path),
            config_value: config.get_value(&path).unwrap(),
            state_value: state.get_value(&path).unwrap(),
            plan_value: plan.get_value(&path).unwrap(),
            path,
            config,
            state,
            plan,
        };
        let mut response = ModifyPlanResponse::new(request.plan_value.clone());
        modifier.modify(&request, &mut response);
        response
    }

    fn unknown_plan() -> Plan {
        Plan::from_json(schema(), json!({}))
            .unwrap()
            .set_value(&AttributePath::from_name("id"), Value::unknown(Type::String))
            .unwrap()
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let config = Config::from_json(schema(), json!({})).unwrap();
        let state = State::from_json(schema(), json!({"id": "abc"})).unwrap();
        let response = run(&UseStateForUnknown, &config, &state, &unknown_plan());
        assert_eq!(response.plan_value, Value::string("abc"));
    }

    #[test]
    fn use_state_for_unknown_on_create() {
        let config = Config::from_json(schema(), json!({})).unwrap();
        let state = State::null(schema());
        let response = run(&UseStateForUnknown, &config, &state, &unknown_plan());
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn default_value_fills_unset_config() {
        let modifier = DefaultValue::new(Value::string("generated"));
        let state = State::null(schema());

        let unset = Config::from_json(schema(), json!({})).unwrap();
        let response = run(&modifier, &unset, &state, &unknown_plan());
        assert_eq!(response.plan_value, Value::string("generated"));

        let set = Config::from_json(schema(), json!({"id": "mine"})).unwrap();
        let plan = Plan::from_json(schema(), json!({"id": "mine"})).unwrap();
        let response = run(&modifier, &set, &state, &plan);
        assert_eq!(response.plan_value, Value::string("mine"));

        let destroy = Plan::null(schema());
        let response = run(&modifier, &unset, &state, &destroy);
        assert!(response.plan_value.is_null());
    }

    #[test]
    fn requires_replace_on_change_only() {
        let config = Config::from_json(schema(), json!({})).unwrap();
        let state = State::from_json(schema(), json!({"id": "abc"})).unwrap();

        let changed = Plan::from_json(schema(), json!({"id": "xyz"})).unwrap();
        assert!(run(&RequiresReplace, &config, &state, &changed).requires_replace);

        let same = Plan::from_json(schema(), json!({"id": "abc"})).unwrap();
        assert!(!run(&RequiresReplace, &config, &state, &same).requires_replace);

        let created = State::null(schema());
        assert!(!run(&RequiresReplace, &config, &created, &changed).requires_replace);
    }
}
