use serde_json::json;
use wardbus::{EventMeta, ListFilter, ProtectedRegistry};

#[test]
fn same_name_registrations_yield_distinct_keys_and_metadata() {
    let registry = ProtectedRegistry::new();
    let first = registry.register("payment.settled", EventMeta::new().with_group("payments"));
    let second = registry.register("payment.settled", EventMeta::new().with_group("refunds"));

    assert_ne!(first, second);
    assert_eq!(
        registry.meta(first).and_then(|m| m.group),
        Some("payments".to_string())
    );
    assert_eq!(
        registry.meta(second).and_then(|m| m.group),
        Some("refunds".to_string())
    );
}

#[test]
fn register_unregister_lifecycle() {
    let registry = ProtectedRegistry::new();
    let key = registry.register("session.start", EventMeta::new());

    assert!(registry.is_protected(key));
    assert!(registry.unregister(key));
    assert!(!registry.is_protected(key));

    // Idempotent: the key is gone, and so is its metadata.
    assert!(!registry.unregister(key));
    assert!(registry.meta(key).is_none());
    assert!(registry.record(key).is_none());
}

#[test]
fn extra_metadata_fields_are_preserved_verbatim() {
    let registry = ProtectedRegistry::new();
    let key = registry.register(
        "deploy.finished",
        EventMeta::new()
            .with_description("fires when a deploy lands")
            .with_extra("owner", json!("platform-team"))
            .with_extra("retries", json!(3)),
    );

    let meta = registry.meta(key).expect("registered");
    assert_eq!(meta.description.as_deref(), Some("fires when a deploy lands"));
    assert_eq!(meta.extra("owner"), Some(&json!("platform-team")));
    assert_eq!(meta.extra("retries"), Some(&json!(3)));
    assert_eq!(meta.extra("missing"), None);
}

#[test]
fn list_without_filter_returns_all_in_registration_order() {
    let registry = ProtectedRegistry::new();
    let a = registry.register("a", EventMeta::new());
    let b = registry.register("b", EventMeta::new());
    let c = registry.register("c", EventMeta::new());

    let keys: Vec<_> = registry.list(None).into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![a, b, c]);
}

#[test]
fn list_filters_by_exact_group_match() {
    let registry = ProtectedRegistry::new();
    let hit = registry.register("one", EventMeta::new().with_group("g1"));
    registry.register("two", EventMeta::new().with_group("g2"));
    // Exact match, not glob: "g1-extended" must not satisfy {group: "g1"}.
    registry.register("three", EventMeta::new().with_group("g1-extended"));
    registry.register("four", EventMeta::new());
    let also_hit = registry.register(
        "five",
        EventMeta::new().with_group("g1").with_namespace("ns-b"),
    );

    let records = registry.list(Some(&ListFilter::new().group("g1")));
    let keys: Vec<_> = records.into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![hit, also_hit]);
}

#[test]
fn list_with_both_filter_fields_requires_both_to_match() {
    let registry = ProtectedRegistry::new();
    registry.register("a", EventMeta::new().with_group("g1"));
    registry.register("b", EventMeta::new().with_namespace("ns"));
    let both = registry.register("c", EventMeta::new().with_group("g1").with_namespace("ns"));

    let filter = ListFilter::new().group("g1").namespace("ns");
    let records = registry.list(Some(&filter));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, both);
    assert_eq!(records[0].name, "c");
}

#[test]
fn unregistration_preserves_order_of_remaining_records() {
    let registry = ProtectedRegistry::new();
    let a = registry.register("a", EventMeta::new());
    let b = registry.register("b", EventMeta::new());
    let c = registry.register("c", EventMeta::new());
    let d = registry.register("d", EventMeta::new());

    assert!(registry.unregister(b));
    let keys: Vec<_> = registry.list(None).into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![a, c, d]);
    assert_eq!(registry.len(), 3);
}
