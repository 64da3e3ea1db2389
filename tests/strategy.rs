use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use wardbus::{
    default_channel, emit_group_with_strategy, emit_namespace_with_strategy, Channel,
    DispatchStrategy, EventMeta, HandlerError, Listener, ProtectedRegistry, SubscribeOptions,
};

fn fixture() -> (Arc<ProtectedRegistry>, Channel) {
    let registry = Arc::new(ProtectedRegistry::new());
    let channel = Channel::with_registry(Arc::clone(&registry));
    (registry, channel)
}

fn suffixer(tag: &'static str) -> Listener {
    Listener::new(move |args| {
        let seed = args.first().and_then(Value::as_str).unwrap_or("");
        json!(format!("{seed}{tag}"))
    })
}

#[tokio::test]
async fn waterfall_threads_each_stage_result_into_the_next() {
    let (registry, channel) = fixture();
    let first = registry.register("one", EventMeta::new().with_group("pipeline"));
    let second = registry.register("two", EventMeta::new().with_group("pipeline"));

    channel.on(first, suffixer("-one"), SubscribeOptions::default());
    channel.on(second, suffixer("-two"), SubscribeOptions::default());

    let results = emit_group_with_strategy(
        "pipeline",
        DispatchStrategy::Waterfall,
        &[json!("seed")],
        Some(&channel),
    )
    .await
    .expect("waterfall");

    assert_eq!(results, vec![json!("seed-one"), json!("seed-one-two")]);
}

#[tokio::test]
async fn waterfall_skips_listenerless_keys_and_ignores_extra_listeners() {
    let (registry, channel) = fixture();
    let silent = registry.register("silent", EventMeta::new().with_group("pipeline"));
    let staged = registry.register("staged", EventMeta::new().with_group("pipeline"));

    let extra_ran = Arc::new(AtomicBool::new(false));
    channel.on(staged, suffixer("-stage"), SubscribeOptions::default());
    {
        let extra_ran = Arc::clone(&extra_ran);
        channel.on(
            staged,
            Listener::new(move |_| {
                extra_ran.store(true, Ordering::SeqCst);
                json!("never-threaded")
            }),
            SubscribeOptions::default(),
        );
    }

    let results = emit_group_with_strategy(
        "pipeline",
        DispatchStrategy::Waterfall,
        &[json!("seed")],
        Some(&channel),
    )
    .await
    .expect("waterfall");

    // The listenerless key contributes nothing; only the first listener of
    // the staged key participates.
    assert!(channel.listeners(silent).is_empty());
    assert_eq!(results, vec![json!("seed-stage")]);
    assert!(!extra_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn parallel_results_follow_registration_order_not_completion_order() {
    let (registry, channel) = fixture();
    let slow = registry.register("slow", EventMeta::new().with_group("fanout"));
    let fast = registry.register("fast", EventMeta::new().with_group("fanout"));

    let completions = Arc::new(Mutex::new(Vec::new()));
    let timed = |tag: &'static str, delay: u64| {
        let completions = Arc::clone(&completions);
        Listener::from_async(move |_| {
            let completions = Arc::clone(&completions);
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                completions.lock().unwrap().push(tag);
                Ok(json!(tag))
            }
        })
    };
    channel.on(slow, timed("slow", 60), SubscribeOptions::default());
    channel.on(fast, timed("fast", 5), SubscribeOptions::default());

    let results = emit_group_with_strategy(
        "fanout",
        DispatchStrategy::Parallel,
        &[],
        Some(&channel),
    )
    .await
    .expect("parallel");

    // The fast handler settled first, yet match order wins in the output.
    assert_eq!(*completions.lock().unwrap(), vec!["fast", "slow"]);
    assert_eq!(results, vec![json!(["slow"]), json!(["fast"])]);
}

#[tokio::test]
async fn series_awaits_each_key_before_invoking_the_next() {
    let (registry, channel) = fixture();
    registry.register("one", EventMeta::new().with_group("chain"));
    registry.register("two", EventMeta::new().with_group("chain"));

    let log = Arc::new(Mutex::new(Vec::new()));
    let staged = |tag: &'static str, delay: u64| {
        let log = Arc::clone(&log);
        Listener::from_async(move |args: Vec<Value>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{tag}-start"));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().unwrap().push(format!("{tag}-end"));
                // Every key sees the original, unthreaded arguments.
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }
        })
    };

    let keys = registry.list(None);
    channel.on(keys[0].key, staged("one", 30), SubscribeOptions::default());
    channel.on(keys[1].key, staged("two", 1), SubscribeOptions::default());

    let results = emit_group_with_strategy(
        "chain",
        DispatchStrategy::Series,
        &[json!("original")],
        Some(&channel),
    )
    .await
    .expect("series");

    assert_eq!(
        *log.lock().unwrap(),
        vec!["one-start", "one-end", "two-start", "two-end"]
    );
    assert_eq!(results, vec![json!(["original"]), json!(["original"])]);
}

#[tokio::test]
async fn handler_failure_rejects_the_dispatch_call() {
    let (registry, channel) = fixture();
    let key = registry.register("broken", EventMeta::new().with_group("fanout"));
    channel.on(
        key,
        Listener::from_fn(|_| Err(HandlerError::msg("boom"))),
        SubscribeOptions::default(),
    );

    let err = emit_group_with_strategy(
        "fanout",
        DispatchStrategy::Parallel,
        &[],
        Some(&channel),
    )
    .await
    .unwrap_err();
    assert_eq!(err, HandlerError::msg("boom"));
}

#[tokio::test]
async fn namespace_dispatch_matches_namespace_tags() {
    let (registry, channel) = fixture();
    let key = registry.register("scoped", EventMeta::new().with_namespace("billing-eu"));
    channel.on(key, Listener::new(|_| json!("hit")), SubscribeOptions::default());

    let results = emit_namespace_with_strategy(
        "billing-*",
        DispatchStrategy::Series,
        &[],
        Some(&channel),
    )
    .await
    .expect("series");
    assert_eq!(results, vec![json!(["hit"])]);
}

#[tokio::test]
async fn dispatch_without_a_channel_uses_the_process_default() {
    // Group name is unique to this test: the process-wide registry is shared.
    let key = wardbus::register_protected_event(
        "default.fanout",
        EventMeta::new().with_group("strategy-default-fallback"),
    );
    default_channel().on(key, Listener::new(|_| json!("default")), SubscribeOptions::default());

    let results = emit_group_with_strategy(
        "strategy-default-fallback",
        DispatchStrategy::Parallel,
        &[],
        None,
    )
    .await
    .expect("default channel dispatch");
    assert_eq!(results, vec![json!(["default"])]);

    wardbus::unregister_protected_event(key);
}

#[tokio::test]
async fn empty_match_set_dispatch_resolves_to_an_empty_sequence() {
    let (_registry, channel) = fixture();
    for strategy in [
        DispatchStrategy::Parallel,
        DispatchStrategy::Waterfall,
        DispatchStrategy::Series,
    ] {
        let results = emit_group_with_strategy("no-match", strategy, &[json!(1)], Some(&channel))
            .await
            .expect("no-op");
        assert!(results.is_empty());
    }
}
