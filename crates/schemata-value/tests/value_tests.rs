use pretty_assertions::assert_eq;
use proptest::prelude::*;
use schemata_value::{AttributePath, PathExpression, PathStep, SetError, StepError, Type, Value};

fn name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}"
}

/// Any characters, control characters and quotes included
fn key() -> impl Strategy<Value = String> {
    "(?s).{0,10}"
}

/// Textual paths made of names, indices and string keys
fn path() -> impl Strategy<Value = AttributePath> {
    let step = prop_oneof![
        name().prop_map(PathStep::AttributeName),
        (0i64..10_000).prop_map(PathStep::ElementKeyInt),
        key().prop_map(PathStep::ElementKeyString),
    ];
    (name(), proptest::collection::vec(step, 0..6)).prop_map(|(first, rest)| {
        let mut steps = vec![PathStep::AttributeName(first)];
        steps.extend(rest);
        AttributePath::new(steps)
    })
}

fn inventory() -> Value {
    let hosts = Value::list(
        Type::object([("name", Type::String), ("port", Type::Number)]),
        [
            Value::object([("name", Value::string("a")), ("port", Value::number(22))]),
            Value::object([("name", Value::string("b")), ("port", Value::number(80))]),
        ],
    )
    .unwrap();
    let groups = Value::map(
        Type::set(Type::String),
        [
            ("web", Value::set(Type::String, [Value::string("a"), Value::string("b")]).unwrap()),
            ("db", Value::set(Type::String, [Value::string("b")]).unwrap()),
        ],
    )
    .unwrap();
    Value::object([("hosts", hosts), ("groups", groups)])
}

#[test]
fn type_and_value_steps_agree_everywhere() {
    let root = inventory();
    root.walk(&mut |path, value| {
        let ty = path
            .iter()
            .try_fold(root.ty(), |ty, step| ty.apply_path_step(step))
            .unwrap();
        assert_eq!(ty, value.ty(), "{path}");
        true
    });
}

#[test]
fn missing_and_mismatched_steps() {
    let root = inventory();
    let hosts = AttributePath::from_name("hosts");

    assert!(matches!(
        root.at_path(&hosts.at_list_index(5)),
        Err(StepError::ElementNotFound { .. })
    ));
    assert!(matches!(
        root.at_path(&hosts.at_map_key("x")),
        Err(StepError::UnexpectedStep { .. })
    ));
    assert!(matches!(
        root.at_path(&AttributePath::from_name("nope")),
        Err(StepError::NoSuchAttribute { .. })
    ));

    let web = AttributePath::from_name("groups").at_map_key("web");
    assert!(root.at_path(&web.at_set_value(Value::string("a"))).is_ok());
    assert!(matches!(
        root.at_path(&web.at_set_value(Value::string("z"))),
        Err(StepError::ElementNotFound { .. })
    ));
}

#[test]
fn updates_share_untouched_branches() {
    let root = inventory();
    let port = AttributePath::from_name("hosts").at_list_index(1).at_name("port");
    let updated = root.set_at_path(&port, Value::number(443)).unwrap();

    assert_eq!(updated.at_path(&port).unwrap(), &Value::number(443));
    assert_eq!(root.at_path(&port).unwrap(), &Value::number(80));
    assert_eq!(
        updated.at_path(&AttributePath::from_name("groups")).unwrap(),
        root.at_path(&AttributePath::from_name("groups")).unwrap()
    );

    assert!(matches!(
        root.set_at_path(&port, Value::string("443")),
        Err(SetError::TypeMismatch { .. })
    ));
}

#[test]
fn set_insertion_keeps_elements_unique() {
    let root = inventory();
    let db = AttributePath::from_name("groups").at_map_key("db");

    let added = root
        .set_at_path(&db.at_set_value(Value::string("c")), Value::string("c"))
        .unwrap();
    assert_eq!(added.at_path(&db).unwrap().element_count(), Some(2));

    let again = added
        .set_at_path(&db.at_set_value(Value::string("c")), Value::string("c"))
        .unwrap();
    assert_eq!(again.at_path(&db).unwrap().element_count(), Some(2));
}

#[test]
fn expressions_select_by_shape() {
    let root = inventory();
    let ports = PathExpression::root().at_name("hosts").at_any_list_index().at_name("port");
    let mut found = Vec::new();
    root.walk(&mut |path, _| {
        if ports.matches(path) {
            found.push(path.to_string());
            return false;
        }
        ports.matches_parent(path)
    });
    assert_eq!(found, vec!["hosts[0].port", "hosts[1].port"]);

    let siblings = PathExpression::relative().at_parent().at_name("name");
    let anchored = siblings.merge(&AttributePath::from_name("hosts").at_list_index(0).at_name("port"));
    assert!(anchored.resolve().matches(&"hosts[0].name".parse().unwrap()));
}

#[test]
fn json_round_trip_preserves_nulls() {
    let ty = Type::object([("name", Type::String), ("tags", Type::map(Type::String))]);
    let doc = serde_json::json!({"name": null, "tags": {"env": "prod"}});
    let value = Value::from_json(&ty, doc.clone()).unwrap();
    assert!(value.at_path(&AttributePath::from_name("name")).unwrap().is_null());
    assert_eq!(value.to_json().unwrap(), doc);
    assert!(Value::unknown(ty).to_json().is_err());
}

proptest! {
    #[test]
    fn display_and_parse_agree(p in path()) {
        let text = p.to_string();
        let parsed: AttributePath = text.parse().unwrap();
        prop_assert_eq!(parsed, p);
    }

    #[test]
    fn prefixes_and_relative_paths(p in path(), q in path()) {
        let joined = p.join(&q);
        prop_assert!(p.is_prefix_of(&joined));
        prop_assert_eq!(joined.relative_to(&p).unwrap(), q.clone());
        prop_assert_eq!(joined.len(), p.len() + q.len());
        prop_assert!(p.common_prefix(&joined) == p);
    }

    #[test]
    fn written_elements_read_back(index in 0usize..3, text in "[ -~]{0,16}") {
        let list = Value::list(Type::String, [Value::string("x"), Value::string("y")]).unwrap();
        let root = Value::object([("items", list)]);
        let at = AttributePath::from_name("items").at_list_index(i64::try_from(index).unwrap());

        let updated = root.set_at_path(&at, Value::string(text.clone())).unwrap();
        prop_assert_eq!(updated.at_path(&at).unwrap().as_str(), Some(text.as_str()));
        prop_assert_eq!(
            updated.at_path(&AttributePath::from_name("items")).unwrap().element_count(),
            Some(index.max(1) + 1)
        );
    }
}
