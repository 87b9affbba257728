//! Plan modification driver
//!
//! Runs every plan modifier of a schema against a proposed plan. The walk
//! follows the planned value: list elements by index, map elements by key,
//! set elements by value and single objects directly. Configuration and
//! prior state are looked up at the same positions.

use std::slice;
use std::sync::Arc;

use schemata_value::{AttributePath, PathExpression, PathStep, Type, Value};

use crate::attribute::Attribute;
use crate::block::{Block, Blocks};
use crate::data::{lookup, Config, Plan, State};
use crate::diagnostics::Diagnostics;
use crate::nested::Attributes;
use crate::plan_modifier::{ModifyPlanRequest, ModifyPlanResponse};

/// Result of [`modify_plan`]
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Modified plan
    pub plan: Plan,

    /// Paths whose change forces replacement of the resource
    pub requires_replace: Vec<AttributePath>,

    /// Findings from modifiers
    pub diagnostics: Diagnostics,
}

/// Run all plan modifiers over a proposed plan
///
/// A null plan (resource destruction) is returned untouched. The input plan
/// is never modified; the outcome holds a new snapshot that shares
/// unchanged subtrees with it.
#[must_use]
pub fn modify_plan(config: &Config, state: &State, plan: &Plan) -> PlanOutcome {
    let span = tracing::debug_span!("modify_plan");
    let _enter = span.enter();

    if plan.raw().is_null() {
        tracing::debug!("Plan destroys the resource, skipping modifiers");
        return PlanOutcome {
            plan: plan.clone(),
            requires_replace: Vec::new(),
            diagnostics: Diagnostics::new(),
        };
    }

    let mut planner = Planner {
        config,
        state,
        plan,
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    let schema = plan.schema();
    let root = Nodes {
        config: config.raw().clone(),
        state: state.raw().clone(),
        plan: plan.raw().clone(),
    };
    let raw = planner.object(schema.attributes(), schema.blocks(), &root, &AttributePath::root());

    let modified = match Plan::new(Arc::clone(schema), raw) {
        Ok(modified) => modified,
        Err(err) => {
            planner
                .diagnostics
                .add_error("Invalid Plan Modification", err.to_string());
            plan.clone()
        }
    };

    tracing::debug!(
        requires_replace = planner.requires_replace.len(),
        diagnostics = planner.diagnostics.len(),
        "Plan modified"
    );
    PlanOutcome {
        plan: modified,
        requires_replace: planner.requires_replace,
        diagnostics: planner.diagnostics,
    }
}

/// Config, state and plan values at one position
#[derive(Debug, Clone)]
struct Nodes {
    config: Value,
    state: Value,
    plan: Value,
}

impl Nodes {
    fn descend(&self, step: &PathStep, ty: &Type) -> Self {
        let at = |value: &Value| {
            lookup(value, slice::from_ref(step), ty).unwrap_or_else(|_| Value::null(ty.clone()))
        };
        Self {
            config: at(&self.config),
            state: at(&self.state),
            plan: at(&self.plan),
        }
    }
}

struct Planner<'a> {
    config: &'a Config,
    state: &'a State,
    plan: &'a Plan,
    requires_replace: Vec<AttributePath>,
    diagnostics: Diagnostics,
}

impl<'a> Planner<'a> {
    /// Plan each member of one object; returns the new object
    fn object(&mut self, attributes: &Attributes, blocks: &Blocks, nodes: &Nodes, path: &AttributePath) -> Value {
        let Some(fields) = nodes.plan.as_object() else {
            return nodes.plan.clone();
        };
        let mut fields = fields.clone();

        for (name, attribute) in attributes {
            let step = PathStep::AttributeName(name.clone());
            let child = nodes.descend(&step, &attribute.effective_type());
            let planned = self.attribute(attribute, child, &path.child(step));
            fields.insert(name.clone(), planned);
        }
        for (name, block) in blocks {
            let step = PathStep::AttributeName(name.clone());
            let child = nodes.descend(&step, &block.ty());
            let planned = self.block(block, child, &path.child(step));
            fields.insert(name.clone(), planned);
        }

        Value::object_of_type(nodes.plan.ty(), fields).unwrap_or_else(|err| {
            self.diagnostics
                .add_attribute_error(path, "Invalid Plan Modification", err.to_string());
            nodes.plan.clone()
        })
    }

    fn attribute(&mut self, attribute: &Attribute, nodes: Nodes, path: &AttributePath) -> Value {
        let mut planned = nodes.plan.clone();
        for modifier in attribute.plan_modifiers() {
            tracing::trace!(%path, modifier = %modifier.description(), "Running attribute plan modifier");
            let request = self.request(path, &nodes, planned.clone());
            let mut response = ModifyPlanResponse::new(planned.clone());
            modifier.modify(&request, &mut response);
            planned = self.absorb(path, planned, response);
        }

        match attribute.nested() {
            Some(nested) => {
                let nodes = Nodes { plan: planned, ..nodes };
                self.elements(nested.attributes(), &Blocks::new(), &nodes, path)
            }
            None => planned,
        }
    }

    fn block(&mut self, block: &Block, nodes: Nodes, path: &AttributePath) -> Value {
        let mut planned = nodes.plan.clone();
        for modifier in block.plan_modifiers() {
            tracing::trace!(%path, modifier = %modifier.description(), "Running block plan modifier");
            let request = self.request(path, &nodes, planned.clone());
            let mut response = ModifyPlanResponse::new(planned.clone());
            modifier.modify(&request, &mut response);
            planned = self.absorb(path, planned, response);
        }

        let nodes = Nodes { plan: planned, ..nodes };
        self.elements(block.attributes(), block.blocks(), &nodes, path)
    }

    /// Plan the element objects of a nested group or block
    fn elements(&mut self, attributes: &Attributes, blocks: &Blocks, nodes: &Nodes, path: &AttributePath) -> Value {
        if nodes.plan.as_object().is_some() {
            return self.object(attributes, blocks, nodes, path);
        }
        let Some(element_type) = nodes.plan.ty().element_type().cloned() else {
            return nodes.plan.clone();
        };
        let children = nodes.plan.children();
        if children.is_empty() {
            return nodes.plan.clone();
        }

        let mut planned = Vec::with_capacity(children.len());
        for (step, element) in children {
            let child = Nodes {
                plan: element.clone(),
                ..nodes.descend(&step, &element_type)
            };
            let value = self.object(attributes, blocks, &child, &path.child(step.clone()));
            planned.push((step, value));
        }

        let rebuilt = match nodes.plan.ty() {
            Type::List(_) => Value::list(element_type, planned.into_iter().map(|(_, value)| value)),
            Type::Set(_) => Value::set(element_type, planned.into_iter().map(|(_, value)| value)),
            Type::Map(_) => Value::map(
                element_type,
                planned.into_iter().filter_map(|(step, value)| match step {
                    PathStep::ElementKeyString(key) => Some((key, value)),
                    _ => None,
                }),
            ),
            _ => return nodes.plan.clone(),
        };
        rebuilt.unwrap_or_else(|err| {
            self.diagnostics
                .add_attribute_error(path, "Invalid Plan Modification", err.to_string());
            nodes.plan.clone()
        })
    }

    /// Fold a modifier's response into the planned value
    fn absorb(&mut self, path: &AttributePath, current: Value, response: ModifyPlanResponse) -> Value {
        self.diagnostics.extend(response.diagnostics);
        if response.requires_replace && !self.requires_replace.contains(path) {
            tracing::debug!(%path, "Change requires replacement");
            self.requires_replace.push(path.clone());
        }
        if response.plan_value.ty() != current.ty() {
            self.diagnostics.add_attribute_error(
                path,
                "Invalid Plan Modification",
                format!(
                    "Plan modifier returned a value of type {}, expected {}",
                    response.plan_value.ty(),
                    current.ty()
                ),
            );
            return current;
        }
        response.plan_value
    }

    fn request(&self, path: &AttributePath, nodes: &Nodes, plan_value: Value) -> ModifyPlanRequest<'a> {
        ModifyPlanRequest {
            path: path.clone(),
            path_expression: PathExpression::exact(path),
            config_value: nodes.config.clone(),
            state_value: nodes.state.clone(),
            plan_value,
            config: self.config,
            state: self.state,
            plan: self.plan,
        }
    }
}
