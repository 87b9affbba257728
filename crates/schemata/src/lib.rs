//! Schemata
//!
//! Schema-driven attribute path resolution over nested configuration types.
//!
//! # Core Concepts
//!
//! - [`Schema`]: Root of a resource descriptor tree, versioned
//! - [`Attribute`]: Named leaf, either a plain [`Type`](schemata_value::Type)
//!   or a [`NestedAttributes`] group with a [`NestingMode`]
//! - [`Block`]: Repeatable or single group of attributes and sub-blocks
//! - [`SchemaNode`]: Any node of the descriptor tree, all answering one step
//!   primitive
//! - [`Config`] / [`Plan`] / [`State`]: Schema-bound value snapshots, read
//!   and written through attribute paths
//! - [`validate_config`] / [`modify_plan`]: Drivers running validators and
//!   plan modifiers over every node present in the data
//!
//! Resolving a path walks the descriptor tree one step at a time: object-like
//! nodes consume attribute names, list-like nodes consume integer indices,
//! map-like nodes consume string keys and set-like nodes consume values. A
//! step that does not fit the node fails with a message naming the path, the
//! remaining steps and the expected step kind.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use schemata::{Attribute, Config, NestingMode, Schema};
//! use schemata_value::{AttributePath, Type};
//!
//! let schema = Schema::builder()
//!     .attribute("name", Attribute::builder().ty(Type::String).optional().build()?)
//!     .attribute(
//!         "tags",
//!         Attribute::builder()
//!             .nested(
//!                 NestingMode::Map,
//!                 [("value", Attribute::builder().ty(Type::String).optional().build()?)],
//!             )
//!             .optional()
//!             .build()?,
//!     )
//!     .build()?;
//! let schema = Arc::new(schema);
//!
//! let path: AttributePath = r#"tags["env"].value"#.parse().unwrap();
//! assert_eq!(schema.type_at_path(&path).unwrap(), Type::String);
//!
//! let config = Config::from_json(
//!     Arc::clone(&schema),
//!     serde_json::json!({"tags": {"env": {"value": "prod"}}}),
//! )
//! .unwrap();
//! assert_eq!(config.get::<String>(&path).unwrap(), "prod");
//! # Ok::<(), schemata::SchemaError>(())
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Descriptor tree
mod attribute;
mod block;
mod nested;
mod resolve;
mod schema;

// Data and drivers
mod data;
mod diagnostics;
mod modify_plan;
mod plan_modifier;
mod validate;
mod validator;

// Tooling
mod definition;
mod diff;
mod error;

// Re-exports
pub use attribute::{Attribute, AttributeBuilder, AttributeKind, IntoAttribute};
pub use block::{Block, BlockBuilder, BlockNesting, Blocks, IntoBlock};
pub use data::{Config, Data, DataError, DataRole, Plan, State};
pub use definition::{AttributeDefinition, BlockDefinition, NestedDefinition, SchemaDefinition};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use diff::{diff, ChangeKind, SchemaChange};
pub use error::{ResolveError, SchemaError};
pub use modify_plan::{modify_plan, PlanOutcome};
pub use nested::{Attributes, NestedAttributes, NestingMode};
pub use plan_modifier::{
    AttributePlanModifier, BlockPlanModifier, DefaultValue, ModifyPlanRequest,
    ModifyPlanResponse, RequiresReplace, UseStateForUnknown,
};
pub use resolve::SchemaNode;
pub use schema::{Schema, SchemaBuilder};
pub use validate::validate_config;
pub use validator::{
    AlsoRequires, AtLeastOneOf, AttributeValidator, BlockValidator, ConflictsWith, ExactlyOneOf,
    LengthBetween, NumberBetween, OneOf, ValidateRequest, ValidateResponse,
};

/// Value layer
pub use schemata_value as value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
