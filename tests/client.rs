#[path = "common/support.rs"]
mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use prefsync::{
    Address, ClientConfig, ClientError, ErrorCode, KeyValueStore, Mutation, RemoteStoreClient,
    TransportError, TypeTag, Value,
};
use support::{EndpointHarness, NAMESPACE};

#[test]
fn committed_edits_are_visible_through_get_all() {
    let harness = EndpointHarness::new();
    let client = harness.client();

    let committed = client
        .edit()
        .put_string("s", "foo")
        .put_int("n", 42)
        .commit()
        .unwrap();
    assert!(committed);

    let all = client.get_all().unwrap();
    let expected: BTreeMap<String, Value> = [
        ("s".to_string(), Value::from("foo")),
        ("n".to_string(), Value::Int(42)),
    ]
    .into_iter()
    .collect();
    assert_eq!(all, expected);
    assert!(client.contains("s").unwrap());
    assert!(!client.contains("missing").unwrap());
}

#[test]
fn removal_applies_before_addition_of_same_key() {
    let harness = EndpointHarness::new();
    let client = harness.client();
    client.edit().put_string("s", "foo").commit().unwrap();

    client.edit().remove("s").put_int("s", 1).commit().unwrap();

    assert_eq!(client.get_int("s", 0).unwrap(), 1);
}

#[test]
fn clear_then_put_keeps_only_new_entries() {
    let harness = EndpointHarness::new();
    let client = harness.client();
    client
        .edit()
        .put_int("a", 1)
        .put_int("b", 2)
        .commit()
        .unwrap();

    client.edit().clear().put_boolean("c", true).commit().unwrap();

    let keys: Vec<String> = client.get_all().unwrap().into_keys().collect();
    assert_eq!(keys, vec!["c".to_string()]);
    assert!(client.get_boolean("c", false).unwrap());
}

#[test]
fn every_value_type_survives_the_round_trip() {
    let harness = EndpointHarness::new();
    let client = harness.client();
    client
        .edit()
        .put_string("name", "prefsync")
        .put_string_set("tags", ["a;b", "", "c\\d"])
        .put_int("int", -7)
        .put_long("long", i64::MAX)
        .put_float("float", 1.5)
        .put_boolean("flag", true)
        .commit()
        .unwrap();

    assert_eq!(client.get_string("name", "").unwrap(), "prefsync");
    let tags = client.get_string_set("tags", Default::default()).unwrap();
    assert_eq!(
        tags.into_iter().collect::<Vec<_>>(),
        vec!["".to_string(), "a;b".to_string(), "c\\d".to_string()]
    );
    assert_eq!(client.get_int("int", 0).unwrap(), -7);
    assert_eq!(client.get_long("long", 0).unwrap(), i64::MAX);
    assert_eq!(client.get_float("float", 0.0).unwrap(), 1.5);
    assert!(client.get_boolean("flag", false).unwrap());
}

#[test]
fn missing_keys_return_the_default() {
    let harness = EndpointHarness::new();
    let client = harness.strict_client();

    assert_eq!(client.get_string("absent", "fallback").unwrap(), "fallback");
    assert_eq!(client.get_int("absent", 9).unwrap(), 9);
}

#[test]
fn type_mismatch_is_raised_in_both_modes() {
    let harness = EndpointHarness::new();
    harness
        .store
        .commit(&[Mutation::put("k", Value::Int(5))])
        .unwrap();

    for client in [harness.client(), harness.strict_client()] {
        let err = client.get_string("k", "default").unwrap_err();
        assert!(
            matches!(
                err,
                ClientError::TypeMismatch {
                    expected: TypeTag::String,
                    found: TypeTag::Int,
                    ..
                }
            ),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn denied_key_aborts_the_whole_batch() {
    let harness = EndpointHarness::with_policy(|_ns: &str, key: &str, is_write: bool| {
        !(is_write && key == "secret")
    });
    let strict = harness.strict_client();

    let err = strict
        .edit()
        .put_string("a", "1")
        .put_string("secret", "2")
        .put_string("b", "3")
        .commit()
        .unwrap_err();
    match err {
        ClientError::RemoteAccess { source, .. } => {
            assert_eq!(source.code(), Some(ErrorCode::AccessDenied));
            assert!(source.is_security());
        }
        other => panic!("expected RemoteAccess, got {other}"),
    }
    assert!(harness.store.is_empty());

    let lenient = harness.client();
    let committed = lenient
        .edit()
        .put_string("a", "1")
        .put_string("secret", "2")
        .commit()
        .unwrap();
    assert!(!committed);
    assert!(lenient.get_all().unwrap().is_empty());
}

#[test]
fn disabled_endpoint_strict_raises_lenient_defaults() {
    let harness = EndpointHarness::new();
    harness.client().edit().put_string("s", "live").commit().unwrap();
    harness.transport.set_enabled(false);

    let strict = harness.strict_client();
    let err = strict.get_string("s", "default").unwrap_err();
    assert!(matches!(
        err,
        ClientError::RemoteAccess {
            source: TransportError::Disabled,
            ..
        }
    ));

    let lenient = harness.client();
    assert_eq!(lenient.get_string("s", "default").unwrap(), "default");
    assert!(lenient.get_all().unwrap().is_empty());
    assert!(!lenient.contains("s").unwrap());
    assert!(!lenient.edit().put_int("n", 1).commit().unwrap());

    harness.transport.set_enabled(true);
    assert_eq!(lenient.get_string("s", "default").unwrap(), "live");
    assert!(!lenient.contains("n").unwrap());
}

#[test]
fn rejected_store_commit_reports_not_committed() {
    let harness = EndpointHarness::new();
    harness.store.fail_commits(true);

    let lenient = harness.client();
    assert!(!lenient.edit().put_int("n", 1).commit().unwrap());

    let strict = harness.strict_client();
    let err = strict.edit().put_int("n", 1).commit().unwrap_err();
    match err {
        ClientError::RemoteAccess { source, .. } => {
            assert_eq!(source.code(), Some(ErrorCode::CommitRejected));
        }
        other => panic!("expected RemoteAccess, got {other}"),
    }
    assert!(harness.store.is_empty());
}

#[test]
fn invalid_keys_are_reported_in_lenient_mode() {
    let harness = EndpointHarness::new();
    let client = harness.client();

    assert!(matches!(
        client.get_string("", "x"),
        Err(ClientError::InvalidKey { .. })
    ));
    assert!(matches!(
        client.edit().put_int("a/b", 1).commit(),
        Err(ClientError::InvalidKey { .. })
    ));
    assert!(harness.store.is_empty());
}

#[test]
fn unknown_namespace_is_a_remote_failure() {
    let harness = EndpointHarness::new();
    let client = RemoteStoreClient::new(
        Arc::new(harness.transport.clone()),
        ClientConfig::new("other").strict(),
    )
    .unwrap();

    let err = client.get_int("n", 0).unwrap_err();
    match err {
        ClientError::RemoteAccess { namespace, source } => {
            assert_eq!(namespace, "other");
            assert_eq!(source.code(), Some(ErrorCode::UnknownNamespace));
        }
        other => panic!("expected RemoteAccess, got {other}"),
    }
}

#[test]
fn put_null_stages_a_removal() {
    let harness = EndpointHarness::new();
    let client = harness.client();
    client.edit().put_int("n", 3).commit().unwrap();

    client.edit().put("n", Value::Null).commit().unwrap();

    assert!(!client.contains("n").unwrap());
    let rows = harness
        .endpoint
        .read(
            &Address::namespace(NAMESPACE).unwrap(),
            Default::default(),
        )
        .unwrap();
    assert!(rows.is_empty());
}
