//! Configuration validation driver
//!
//! Walks the schema alongside a configuration snapshot and checks every
//! attribute and block, recursing into nested attribute groups and block
//! elements that are actually present in the configuration.

use schemata_value::{AttributePath, PathExpression, Value};

use crate::attribute::Attribute;
use crate::block::{Block, BlockNesting, Blocks};
use crate::data::Config;
use crate::diagnostics::Diagnostics;
use crate::nested::Attributes;
use crate::validator::{ValidateRequest, ValidateResponse};

/// Validate a configuration against its schema
///
/// Checks, for every node present in the configuration:
/// - required attributes are set
/// - computed-only attributes are not set
/// - attribute and block validators, in declaration order
/// - deprecated attributes and blocks warn when set
/// - block element counts respect `min_items` and `max_items`
///
/// An absent resource (null configuration) has nothing to validate.
#[must_use]
pub fn validate_config(config: &Config) -> Diagnostics {
    let span = tracing::debug_span!("validate_config");
    let _enter = span.enter();

    let mut validator = ConfigValidator {
        config,
        diagnostics: Diagnostics::new(),
    };
    if let Some(message) = config.schema().deprecation_message() {
        if !config.raw().is_null() {
            validator
                .diagnostics
                .add_warning("Resource Deprecated", message.to_string());
        }
    }
    let schema = config.schema();
    validator.object(
        schema.attributes(),
        schema.blocks(),
        config.raw(),
        &AttributePath::root(),
    );

    tracing::debug!(
        diagnostics = validator.diagnostics.len(),
        errors = validator.diagnostics.errors().count(),
        "Configuration validated"
    );
    validator.diagnostics
}

struct ConfigValidator<'a> {
    config: &'a Config,
    diagnostics: Diagnostics,
}

impl<'a> ConfigValidator<'a> {
    /// Members of one known object
    fn object(&mut self, attributes: &Attributes, blocks: &Blocks, object: &Value, path: &AttributePath) {
        let Some(fields) = object.as_object() else {
            return;
        };
        for (name, attribute) in attributes {
            if let Some(value) = fields.get(name) {
                self.attribute(attribute, value, &path.at_name(name.as_str()));
            }
        }
        for (name, block) in blocks {
            if let Some(value) = fields.get(name) {
                self.block(block, value, &path.at_name(name.as_str()));
            }
        }
    }

    fn attribute(&mut self, attribute: &Attribute, value: &Value, path: &AttributePath) {
        if attribute.is_required() && value.is_null() {
            self.diagnostics.add_attribute_error(
                path,
                "Missing Configuration for Required Attribute",
                format!("Must set a configuration value for the {path} attribute as the provider has marked it as required."),
            );
        }
        let computed_only = attribute.is_computed() && !attribute.is_optional() && !attribute.is_required();
        if computed_only && !value.is_null() {
            self.diagnostics.add_attribute_error(
                path,
                "Invalid Configuration for Read-Only Attribute",
                format!("Cannot set value for the {path} attribute as the provider has marked it as read-only."),
            );
        }
        if let Some(message) = attribute.deprecation_message() {
            if !value.is_null() {
                tracing::warn!(%path, "Deprecated attribute configured");
                self.diagnostics
                    .add_attribute_warning(path, "Attribute Deprecated", message.to_string());
            }
        }

        if !attribute.validators().is_empty() {
            let request = self.request(path, value);
            let mut response = ValidateResponse::default();
            for validator in attribute.validators() {
                tracing::trace!(%path, validator = %validator.description(), "Running attribute validator");
                validator.validate(&request, &mut response);
            }
            self.diagnostics.extend(response.diagnostics);
        }

        if let Some(nested) = attribute.nested() {
            self.elements(nested.attributes(), &Blocks::new(), value, path);
        }
    }

    fn block(&mut self, block: &Block, value: &Value, path: &AttributePath) {
        if let Some(message) = block.deprecation_message() {
            if !value.is_null() {
                tracing::warn!(%path, "Deprecated block configured");
                self.diagnostics
                    .add_attribute_warning(path, "Block Deprecated", message.to_string());
            }
        }
        self.item_bounds(block, value, path);

        if !block.validators().is_empty() {
            let request = self.request(path, value);
            let mut response = ValidateResponse::default();
            for validator in block.validators() {
                tracing::trace!(%path, validator = %validator.description(), "Running block validator");
                validator.validate(&request, &mut response);
            }
            self.diagnostics.extend(response.diagnostics);
        }

        self.elements(block.attributes(), block.blocks(), value, path);
    }

    fn item_bounds(&mut self, block: &Block, value: &Value, path: &AttributePath) {
        if value.is_unknown() {
            return;
        }
        let count = match block.nesting() {
            BlockNesting::Single => u64::from(!value.is_null()),
            BlockNesting::List | BlockNesting::Set => {
                value
                    .element_count()
                    .map_or(0, |n| u64::try_from(n).unwrap_or(u64::MAX))
            }
        };
        if block.min_items() > 0 && count < block.min_items() {
            self.diagnostics.add_attribute_error(
                path,
                "Missing Configuration for Required Block",
                format!("Block {path} must have a configuration value as the provider has marked it as required. At least {} element(s) expected, got {count}.", block.min_items()),
            );
        }
        if block.max_items() > 0 && count > block.max_items() {
            self.diagnostics.add_attribute_error(
                path,
                "Too Many Block Elements",
                format!("Block {path} allows at most {} element(s), got {count}.", block.max_items()),
            );
        }
    }

    /// Recurse into the element objects of a nested group or block
    fn elements(&mut self, attributes: &Attributes, blocks: &Blocks, value: &Value, path: &AttributePath) {
        if value.as_object().is_some() {
            self.object(attributes, blocks, value, path);
            return;
        }
        for (step, element) in value.children() {
            self.object(attributes, blocks, element, &path.child(step));
        }
    }

    fn request(&self, path: &AttributePath, value: &Value) -> ValidateRequest<'a> {
        ValidateRequest {
            path: path.clone(),
            path_expression: PathExpression::exact(path),
            config_value: value.clone(),
            config: self.config,
        }
    }
}
