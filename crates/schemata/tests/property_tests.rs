use std::sync::Arc;

use proptest::prelude::*;
use schemata::{Attribute, LengthBetween, Plan, RequiresReplace, Schema};
use schemata_test_utils::{server_schema, string_attribute};
use schemata_value::{AttributePath, Type, Value};
use serde_json::json;

fn map_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z_][A-Za-z0-9_\\-\\.\\[\\]\" ]{0,12}",
        "(?s).{0,12}",
        "[\\x00-\\x1f\"\\\\]{1,6}",
    ]
}

/// Concrete paths over the server schema, with the type they resolve to
fn server_path() -> impl Strategy<Value = (AttributePath, Type)> {
    let root = AttributePath::root;
    prop_oneof![
        (0i64..1_000).prop_map(move |i| (
            root().at_name("ports").at_list_index(i),
            Type::Number
        )),
        map_key().prop_map(move |k| (
            root().at_name("env").at_map_key(k).at_name("value"),
            Type::String
        )),
        (0i64..1_000).prop_map(move |i| (
            root().at_name("disk").at_list_index(i).at_name("size"),
            Type::Number
        )),
        (0i64..1_000).prop_map(move |i| (
            root()
                .at_name("disk")
                .at_list_index(i)
                .at_name("mount")
                .at_name("path"),
            Type::String
        )),
        "[a-z]{1,8}".prop_map(move |s| (
            root().at_name("labels").at_set_value(Value::string(s)),
            Type::String
        )),
    ]
}

proptest! {
    #[test]
    fn generated_paths_resolve((p, expected) in server_path()) {
        let schema = server_schema();
        prop_assert_eq!(schema.type_at_path(&p).unwrap(), expected.clone());

        // Reading an empty resource yields a null of the same type
        let plan = Plan::null(Arc::clone(&schema));
        let value = plan.get_value(&p).unwrap();
        prop_assert!(value.is_null());
        prop_assert_eq!(value.ty(), &expected);
    }

    #[test]
    fn parsed_paths_match_built_paths((p, _) in server_path()) {
        // Set steps have no text form
        prop_assume!(!p.steps().iter().any(|s| matches!(s, schemata_value::PathStep::ElementKeyValue(_))));
        let reparsed: AttributePath = p.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, p);
    }

    #[test]
    fn written_values_read_back(
        key in map_key(),
        text in ".{0,24}",
        ports in proptest::collection::vec(0u32..65_536, 0..8),
    ) {
        let schema = server_schema();
        let plan = Plan::from_json(Arc::clone(&schema), json!({"name": "web", "zone": "a"})).unwrap();
        let value_path = AttributePath::from_name("env").at_map_key(key).at_name("value");
        let ports_path = AttributePath::from_name("ports");

        let updated = plan
            .set_attribute(&value_path, &text)
            .unwrap()
            .set_attribute(&ports_path, &ports)
            .unwrap();

        prop_assert_eq!(updated.get::<String>(&value_path).unwrap(), text);
        prop_assert_eq!(updated.get::<Vec<u32>>(&ports_path).unwrap(), ports);
        prop_assert!(plan.get_value(&value_path).unwrap().is_null());
        prop_assert_eq!(updated.get::<String>(&AttributePath::from_name("zone")).unwrap(), "a");
    }

    #[test]
    fn appended_elements_extend_lists(count in 1usize..6) {
        let schema = server_schema();
        let mut plan = Plan::from_json(Arc::clone(&schema), json!({"name": "web", "zone": "a"})).unwrap();
        for i in 0..count {
            let index = i64::try_from(i).unwrap();
            plan = plan
                .set_attribute(&AttributePath::from_name("disk").at_list_index(index).at_name("size"), &i)
                .unwrap();
        }
        let sizes: Vec<usize> = (0..count)
            .map(|i| {
                let index = i64::try_from(i).unwrap();
                plan.get::<usize>(&AttributePath::from_name("disk").at_list_index(index).at_name("size")).unwrap()
            })
            .collect();
        prop_assert_eq!(sizes, (0..count).collect::<Vec<_>>());
        prop_assert_eq!(plan.raw().at_path(&AttributePath::from_name("disk")).unwrap().element_count(), Some(count));
    }

    #[test]
    fn equality_ignores_behaviour(
        required in any::<bool>(),
        sensitive in any::<bool>(),
        min in 0usize..4,
    ) {
        let shape = |with_behaviour: bool| {
            let mut builder = Attribute::builder().ty(Type::String);
            builder = if required { builder.required() } else { builder.optional() };
            if sensitive {
                builder = builder.sensitive();
            }
            if with_behaviour {
                builder = builder
                    .validator(LengthBetween::new(min, min + 4))
                    .plan_modifier(RequiresReplace);
            }
            Schema::builder()
                .attribute("value", builder.build().unwrap())
                .attribute("other", string_attribute())
                .build()
                .unwrap()
        };
        prop_assert_eq!(shape(true), shape(false));
    }
}
