//! Testing utilities for the schemata workspace
//!
//! Shared fixture schemas, snapshots and tracing setup.

#![allow(missing_docs)]

use std::sync::Arc;

use schemata::{
    Attribute, Block, BlockNesting, Config, ConflictsWith, LengthBetween, NestingMode, Plan,
    RequiresReplace, Schema, State, UseStateForUnknown,
};
use schemata_value::{AttributePath, PathExpression, Type};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn path(s: &str) -> AttributePath {
    s.parse().unwrap()
}

pub fn string_attribute() -> Attribute {
    Attribute::builder().ty(Type::String).optional().build().unwrap()
}

pub fn required(ty: Type) -> Attribute {
    Attribute::builder().ty(ty).required().build().unwrap()
}

pub fn optional(ty: Type) -> Attribute {
    Attribute::builder().ty(ty).optional().build().unwrap()
}

pub fn computed(ty: Type) -> Attribute {
    Attribute::builder()
        .ty(ty)
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
        .unwrap()
}

/// `tags` map of objects holding an optional `value`, plus an optional `name`
pub fn tags_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .attribute(
                "tags",
                Attribute::builder()
                    .nested(NestingMode::Map, [("value", string_attribute())])
                    .optional()
                    .build()
                    .unwrap(),
            )
            .attribute("name", string_attribute())
            .build()
            .unwrap(),
    )
}

/// Server resource touching every nesting mode
///
/// ```text
/// id        computed string
/// name      required string, 1..=32 chars, conflicts with `alias`
/// alias     optional string
/// zone      required string, replaces on change
/// ports     optional list(number)
/// labels    optional set(string)
/// env       map nested { value: string }
/// volumes   set nested { size: number, tier: string }
/// network   single nested { cidr: string, gateway: computed string }
/// disk      list block (max 4) { size, serial, nested mount single block { path } }
/// boot      single block { image }
/// ```
pub fn server_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .version(1)
            .attribute("id", computed(Type::String))
            .attribute(
                "name",
                Attribute::builder()
                    .ty(Type::String)
                    .required()
                    .validator(LengthBetween::new(1, 32))
                    .validator(ConflictsWith::new([PathExpression::root().at_name("alias")]))
                    .build()
                    .unwrap(),
            )
            .attribute("alias", string_attribute())
            .attribute(
                "zone",
                Attribute::builder()
                    .ty(Type::String)
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build()
                    .unwrap(),
            )
            .attribute("ports", optional(Type::list(Type::Number)))
            .attribute("labels", optional(Type::set(Type::String)))
            .attribute(
                "env",
                Attribute::builder()
                    .nested(NestingMode::Map, [("value", string_attribute())])
                    .optional()
                    .build()
                    .unwrap(),
            )
            .attribute(
                "volumes",
                Attribute::builder()
                    .nested(
                        NestingMode::Set,
                        [("size", required(Type::Number)), ("tier", string_attribute())],
                    )
                    .optional()
                    .build()
                    .unwrap(),
            )
            .attribute(
                "network",
                Attribute::builder()
                    .nested(
                        NestingMode::Single,
                        [("cidr", string_attribute()), ("gateway", computed(Type::String))],
                    )
                    .optional()
                    .build()
                    .unwrap(),
            )
            .block(
                "disk",
                Block::builder(BlockNesting::List)
                    .attribute("size", required(Type::Number))
                    .attribute("serial", computed(Type::String))
                    .block(
                        "mount",
                        Block::builder(BlockNesting::Single)
                            .attribute("path", string_attribute())
                            .build()
                            .unwrap(),
                    )
                    .max_items(4)
                    .build()
                    .unwrap(),
            )
            .block(
                "boot",
                Block::builder(BlockNesting::Single)
                    .attribute("image", string_attribute())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap(),
    )
}

pub fn config(schema: &Arc<Schema>, json: serde_json::Value) -> Config {
    Config::from_json(Arc::clone(schema), json).unwrap()
}

pub fn plan(schema: &Arc<Schema>, json: serde_json::Value) -> Plan {
    Plan::from_json(Arc::clone(schema), json).unwrap()
}

pub fn state(schema: &Arc<Schema>, json: serde_json::Value) -> State {
    State::from_json(Arc::clone(schema), json).unwrap()
}
