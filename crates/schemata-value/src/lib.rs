//! Schemata Value Layer
//!
//! Typed dynamic value trees addressed by attribute paths.
//!
//! # Core Concepts
//!
//! - [`Type`]: Closed set of value shapes (primitives, list/set/map, object)
//! - [`Value`]: Immutable typed node, null, unknown or known
//! - [`PathStep`] / [`AttributePath`]: Hierarchical addressing within values
//! - [`PathExpression`]: Path patterns with wildcards and relative steps
//!
//! Every node answers the same step primitive: given one [`PathStep`], return
//! the child or a [`StepError`]. Types answer it without any concrete data;
//! values answer it against their payload.
//!
//! # Example
//!
//! ```rust
//! use schemata_value::{AttributePath, Type, Value};
//!
//! let tags = Value::map(Type::String, [("env", Value::string("prod"))]).unwrap();
//! let root = Value::object([("tags", tags)]);
//!
//! let path: AttributePath = r#"tags["env"]"#.parse().unwrap();
//! assert_eq!(root.at_path(&path).unwrap().as_str(), Some("prod"));
//!
//! // Copy-on-write update: the original tree is unchanged
//! let updated = root.set_at_path(&path, Value::string("dev")).unwrap();
//! assert_eq!(updated.at_path(&path).unwrap().as_str(), Some("dev"));
//! assert_eq!(root.at_path(&path).unwrap().as_str(), Some("prod"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
mod expression;
mod json;
mod path;
mod types;
mod value;

// Re-exports
pub use expression::{ExpressionStep, PathExpression};
pub use path::{AttributePath, PathError, PathStep, StepError, StepKind};
pub use types::Type;
pub use value::{SetError, Value, ValueError};

/// Persistent collections used in value payloads
pub use im;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn type_and_value_steps_agree() {
        let rules = Value::list(
            Type::object([("port", Type::Number)]),
            [Value::object([("port", Value::number(22))])],
        )
        .unwrap();
        let root = Value::object([("rules", rules)]);
        let path: AttributePath = "rules[0].port".parse().unwrap();

        let ty = path
            .iter()
            .try_fold(root.ty(), |ty, step| ty.apply_path_step(step))
            .unwrap();
        let value = root.at_path(&path).unwrap();
        assert_eq!(value.ty(), ty);
    }

    #[test]
    fn expression_over_walk() {
        let root = Value::object([(
            "ports",
            Value::list(
                Type::Number,
                [Value::number(1), Value::number(2), Value::number(3)],
            )
            .unwrap(),
        )]);
        let expr = PathExpression::root().at_name("ports").at_any_list_index();

        let mut matched = Vec::new();
        root.walk(&mut |path, _| {
            if expr.matches(path) {
                matched.push(path.clone());
                return false;
            }
            expr.matches_parent(path)
        });
        assert_eq!(matched.len(), 3);
    }
}
