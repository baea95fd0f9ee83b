mod fixtures;

use std::collections::BTreeMap;

use chrono::DateTime;
use fixtures::{Role, Team, User};
use modelbind::TransportTime;
use modelbind::prelude::*;
use serde_json::json;

fn map(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn optional_field_tracks_nil_transitions() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder.set("email", "a@b.com", true).unwrap();
    binder.set("email", Value::Null, true).unwrap();
    binder.set("email", "a@b.com", true).unwrap();

    assert!(binder.changed("email"));
    assert_eq!(binder.old_value("email"), Value::Null);
    let change = binder.changes().get("email").unwrap();
    assert_eq!(change.new, Value::from("a@b.com"));
    assert_eq!(user.email.as_deref(), Some("a@b.com"));
}

#[test]
fn optional_nil_to_nil_is_not_a_change() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder.set("email", Value::Null, true).unwrap();
    assert!(!binder.changed("email"));
    assert!(!binder.dirty());
}

#[test]
fn numeric_string_parses_and_garbage_keeps_previous() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder.set("age", "abc", true).unwrap();
    assert_eq!(binder.get("age"), Value::BigInt(0));
    assert!(!binder.changed("age"));

    binder.set("age", "5", true).unwrap();
    assert_eq!(binder.get("age"), Value::BigInt(5));
    assert!(binder.changed("age"));

    binder.set("age", "abc", true).unwrap();
    assert_eq!(binder.get("age"), Value::BigInt(5));
    assert_eq!(user.age, 5);
}

#[test]
fn bind_json_converts_transport_shapes() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder
        .bind_json(
            &json!({
                "uid": "0x99",
                "name": "Ada",
                "age": 42.0,
                "score": 3,
                "active": "0",
                "external_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "created_at": "1700000000",
                "tags": ["a", "b"],
                "roles": [{"uid": "r1", "name": "admin"}],
                "unknown": 1
            }),
            true,
        )
        .unwrap();

    assert!(binder.changed("active"));
    assert!(!binder.changed("uid"));
    assert!(binder.is_new());

    assert_eq!(user.uid, "");
    assert_eq!(user.name, "Ada");
    assert_eq!(user.age, 42);
    assert!((user.score - 3.0).abs() < f64::EPSILON);
    assert!(!user.active);
    assert_eq!(
        user.external_id.to_string(),
        "67e55044-10b1-426f-9247-bb680e5fe0c8"
    );
    assert_eq!(
        user.created_at,
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    );
    assert_eq!(user.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        user.roles,
        vec![Role {
            uid: "r1".into(),
            name: "admin".into()
        }]
    );
}

#[test]
fn bind_json_rejects_non_objects() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    let err = binder.bind_json(&json!([1, 2]), true).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn sequences_render_into_text_fields() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder
        .bind(
            &map(&[(
                "name",
                Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")]),
            )]),
            true,
        )
        .unwrap();
    assert_eq!(user.name, "{a,b,c}");

    let mut other = User::default();
    let mut binder = Binder::new(&cx, &mut other);
    let nested = Value::from(json!({"k": 1}));
    binder.bind(&map(&[("name", nested)]), true).unwrap();
    assert_eq!(other.name, r#"{"k":1}"#);
}

#[test]
fn unmatched_shape_is_a_type_mismatch() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    let err = binder
        .set("active", Value::Array(Vec::new()), true)
        .unwrap_err();
    match err {
        Error::TypeMismatch { field, .. } => assert_eq!(field, "active"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!binder.dirty());
}

#[test]
fn hydration_assigns_identifier_without_tracking() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);
    assert!(binder.is_new());

    binder
        .bind(
            &map(&[("uid", Value::from("0x7")), ("name", Value::from("Grace"))]),
            false,
        )
        .unwrap();

    assert!(!binder.dirty());
    assert!(binder.is_new());
    assert_eq!(binder.identifier().as_deref(), Some("0x7"));
    assert_eq!(user.name, "Grace");

    let binder = Binder::new(&cx, &mut user);
    assert!(!binder.is_new());
}

#[test]
fn binder_init_hook_runs_only_for_new_records() {
    let cx = Cx::for_testing();

    let mut fresh = User::default();
    let binder = Binder::new(&cx, &mut fresh);
    assert!(!binder.dirty());
    assert!(fresh.active);

    let mut existing = User {
        uid: "0x3".into(),
        ..User::default()
    };
    let binder = Binder::new(&cx, &mut existing);
    assert!(!binder.is_new());
    assert!(!existing.active);
}

#[test]
fn reset_change_and_set_many() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder
        .set_many(
            [("name", Value::from("Ada")), ("age", Value::from(36_i64))],
            true,
        )
        .unwrap();
    assert!(binder.changed("name"));
    assert!(binder.changed("age"));
    assert_eq!(binder.changes().len(), 2);

    binder.reset_change("name");
    assert!(!binder.changed("name"));
    assert_eq!(binder.old_value("name"), Value::from(""));
    assert!(binder.dirty());
}

#[test]
fn reset_relations_clears_nested_fields() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder
        .bind_json(&json!({"roles": [{"uid": "r1"}, {"uid": "r2"}]}), true)
        .unwrap();
    assert!(binder.changed("roles"));

    binder.reset_relations().unwrap();
    assert!(!binder.changed("roles"));
    assert!(user.roles.is_empty());
    assert!(user.profile.is_none());
}

#[test]
fn boxed_elements_bind_from_keyed_maps() {
    let cx = Cx::for_testing();
    let mut team = Team::default();
    let mut binder = Binder::new(&cx, &mut team);

    binder
        .bind_json(
            &json!({"members": [{"uid": "r1", "name": "lead"}, {"name": "dev"}]}),
            true,
        )
        .unwrap();

    assert!(binder.changed("members"));
    assert_eq!(
        team.members,
        vec![
            Box::new(Role {
                uid: "r1".into(),
                name: "lead".into()
            }),
            Box::new(Role {
                uid: String::new(),
                name: "dev".into()
            }),
        ]
    );
}

#[test]
fn optional_list_relation_tracks_presence() {
    let cx = Cx::for_testing();
    let mut team = Team::default();
    let mut binder = Binder::new(&cx, &mut team);

    binder.set("owners", Value::Null, true).unwrap();
    assert!(!binder.changed("owners"));

    binder
        .bind_json(&json!({"owners": [{"uid": "o1", "name": "founder"}]}), true)
        .unwrap();
    assert!(binder.changed("owners"));
    assert_eq!(binder.old_value("owners"), Value::Null);

    binder.reset_change("owners");
    binder.set("owners", Value::Null, true).unwrap();
    assert!(binder.changed("owners"));
    assert!(team.owners.is_none());
}

#[test]
fn transport_time_binds_as_timestamp() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);
    let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    binder.set("created_at", TransportTime(ts), true).unwrap();
    assert!(binder.changed("created_at"));

    binder
        .bind(&map(&[("updated_at", Value::from(TransportTime(ts)))]), true)
        .unwrap();
    assert_eq!(user.created_at, ts);
    assert_eq!(user.updated_at, ts);
}

#[test]
fn wide_float_narrows_or_keeps_on_overflow() {
    let cx = Cx::for_testing();
    let mut team = Team::default();
    let mut binder = Binder::new(&cx, &mut team);

    binder.set("size", Value::Double(12.9), true).unwrap();
    assert_eq!(binder.get("size"), Value::Int(12));

    binder.reset_change("size");
    binder.set("size", Value::Double(3.0e10), true).unwrap();
    assert!(!binder.changed("size"));
    assert_eq!(team.size, 12);
}

#[test]
fn identifier_is_not_settable_by_name() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let mut binder = Binder::new(&cx, &mut user);

    binder
        .set_many([("uid", Value::from("0x5")), ("name", Value::from("Ada"))], true)
        .unwrap();

    assert!(!binder.changed("uid"));
    assert_eq!(binder.identifier(), None);
    assert!(binder.is_new());
    assert_eq!(user.name, "Ada");
}

#[test]
fn with_values_binds_after_init_hook() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let values = map(&[("name", Value::from("Ada")), ("active", Value::Bool(false))]);
    let binder = Binder::with_values(&cx, &mut user, &values).unwrap();

    assert!(binder.changed("name"));
    assert!(binder.changed("active"));
    assert_eq!(binder.old_value("active"), Value::Bool(true));
    assert!(!user.active);
}

#[test]
#[should_panic(expected = "unknown field User:nope")]
fn unknown_field_name_panics() {
    let cx = Cx::for_testing();
    let mut user = User::default();
    let binder = Binder::new(&cx, &mut user);
    let _ = binder.get("nope");
}
