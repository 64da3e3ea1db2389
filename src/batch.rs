//! Group/namespace batch operations.
//!
//! Every operation here takes a glob pattern, matches it against the `group`
//! or `namespace` tag of each registry record (in registration order), and
//! applies a bulk action to the matched keys on one channel. An empty match
//! set is always a no-op, never an error; records carrying neither tag never
//! match anything.
//!
//! Subscription and removal forms take the channel explicitly, since multiple
//! channels may coexist. Emission forms take `Option<&Channel>` and fall back
//! to [`default_channel`] — the typed rendering of "operate on a default
//! channel when none is supplied".

use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;

use crate::channel::{default_channel, Channel};
use crate::emitter::{
    collect_results, HandlerError, HandlerOutcome, HandlerResult, Listener, ListenerId,
    SubscribeOptions,
};
use crate::key::EventKey;
use crate::pattern::Pattern;
use crate::registry::MetaField;

/// A handler shared across every key matched by a batch subscription.
///
/// Unlike a plain [`Listener`], it is invoked with the key that fired, so one
/// handler can serve a whole group.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wardbus::GroupHandler;
///
/// let handler = GroupHandler::new(|key, args| {
///     json!({ "key": key.to_string(), "args": args.len() })
/// });
/// ```
#[derive(Clone)]
pub struct GroupHandler(Arc<dyn Fn(EventKey, &[Value]) -> HandlerOutcome + Send + Sync>);

impl GroupHandler {
    /// Wrap an infallible synchronous handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(EventKey, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(move |key, args| {
            HandlerOutcome::Ready(Ok(f(key, args)))
        }))
    }

    /// Wrap a fallible synchronous handler.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(EventKey, &[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(move |key, args| HandlerOutcome::Ready(f(key, args))))
    }

    /// Wrap an async handler.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(EventKey, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self(Arc::new(move |key, args| {
            HandlerOutcome::Pending(Box::pin(f(key, args.to_vec())))
        }))
    }

    /// Invoke the handler for `key`.
    pub fn call(&self, key: EventKey, args: &[Value]) -> HandlerOutcome {
        (self.0)(key, args)
    }
}

impl fmt::Debug for GroupHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupHandler(..)")
    }
}

pub(crate) fn matched_keys(field: MetaField, pattern: &str, channel: &Channel) -> Vec<EventKey> {
    let pattern = Pattern::new(pattern);
    channel.registry().matching_keys(field, &pattern)
}

fn subscribe(
    field: MetaField,
    pattern: &str,
    handler: GroupHandler,
    channel: &Channel,
    priority: Option<i32>,
    once: bool,
) -> Vec<(EventKey, ListenerId)> {
    let keys = matched_keys(field, pattern, channel);
    tracing::debug!(pattern, matched = keys.len(), once, "batch subscribe");
    let options = priority.map(SubscribeOptions::priority).unwrap_or_default();
    keys.into_iter()
        .map(|key| {
            let handler = handler.clone();
            let listener = Listener::from_outcome(move |args| handler.call(key, args));
            let id = if once {
                channel.once(key, listener, options)
            } else {
                channel.on(key, listener, options)
            };
            (key, id)
        })
        .collect()
}

/// Attach `handler` to every registered key whose group matches `pattern`.
/// Returns the attachments made, in match order.
pub fn on_group(
    pattern: &str,
    handler: GroupHandler,
    channel: &Channel,
    priority: Option<i32>,
) -> Vec<(EventKey, ListenerId)> {
    subscribe(MetaField::Group, pattern, handler, channel, priority, false)
}

/// Attach `handler` to every registered key whose namespace matches
/// `pattern`.
pub fn on_namespace(
    pattern: &str,
    handler: GroupHandler,
    channel: &Channel,
    priority: Option<i32>,
) -> Vec<(EventKey, ListenerId)> {
    subscribe(
        MetaField::Namespace,
        pattern,
        handler,
        channel,
        priority,
        false,
    )
}

/// Single-fire variant of [`on_group`].
pub fn once_group(
    pattern: &str,
    handler: GroupHandler,
    channel: &Channel,
    priority: Option<i32>,
) -> Vec<(EventKey, ListenerId)> {
    subscribe(MetaField::Group, pattern, handler, channel, priority, true)
}

/// Single-fire variant of [`on_namespace`].
pub fn once_namespace(
    pattern: &str,
    handler: GroupHandler,
    channel: &Channel,
    priority: Option<i32>,
) -> Vec<(EventKey, ListenerId)> {
    subscribe(
        MetaField::Namespace,
        pattern,
        handler,
        channel,
        priority,
        true,
    )
}

fn remove_all(field: MetaField, pattern: &str, channel: &Channel) -> usize {
    let keys = matched_keys(field, pattern, channel);
    // Administrative override: native removal, protection not consulted.
    let cleared = keys
        .into_iter()
        .filter(|&key| channel.emitter().off(key, None))
        .count();
    tracing::debug!(pattern, cleared, "batch listener removal");
    cleared
}

/// Remove *all* listeners on every key whose group matches `pattern`, even
/// protected ones. Returns how many keys had listeners removed.
pub fn off_group(pattern: &str, channel: &Channel) -> usize {
    remove_all(MetaField::Group, pattern, channel)
}

/// Namespace variant of [`off_group`].
pub fn off_namespace(pattern: &str, channel: &Channel) -> usize {
    remove_all(MetaField::Namespace, pattern, channel)
}

fn remove_once(field: MetaField, pattern: &str, channel: &Channel) -> usize {
    let mut removed = 0;
    for key in matched_keys(field, pattern, channel) {
        let snapshot = channel.emitter().listeners(key);
        if snapshot.is_empty() {
            continue;
        }
        channel.emitter().remove_all_listeners(key);
        for entry in snapshot {
            if entry.once {
                removed += 1;
            } else {
                // Re-attach regular listeners in their original order and
                // priority; only single-fire listeners stay detached.
                channel
                    .emitter()
                    .on(key, entry.listener, SubscribeOptions::priority(entry.priority));
            }
        }
    }
    removed
}

/// Detach only the single-fire listeners on every key whose group matches
/// `pattern`; regular listeners remain attached and functional. Returns how
/// many listeners were detached.
pub fn off_once_group(pattern: &str, channel: &Channel) -> usize {
    remove_once(MetaField::Group, pattern, channel)
}

/// Namespace variant of [`off_once_group`].
pub fn off_once_namespace(pattern: &str, channel: &Channel) -> usize {
    remove_once(MetaField::Namespace, pattern, channel)
}

fn emit_fire_and_forget(field: MetaField, pattern: &str, args: &[Value], channel: Option<&Channel>) {
    let channel = channel.unwrap_or_else(|| default_channel());
    for key in matched_keys(field, pattern, channel) {
        for outcome in channel.emit(key, args) {
            if let HandlerOutcome::Pending(fut) = outcome {
                // Fire-and-forget discards results, but async handler side
                // effects must still run; detach onto the runtime when one is
                // available, otherwise the work is dropped unpolled.
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(fut);
                }
            }
        }
    }
}

/// Emit on every key whose group matches `pattern`. Results are discarded.
pub fn emit_group(pattern: &str, args: &[Value], channel: Option<&Channel>) {
    emit_fire_and_forget(MetaField::Group, pattern, args, channel);
}

/// Namespace variant of [`emit_group`].
pub fn emit_namespace(pattern: &str, args: &[Value], channel: Option<&Channel>) {
    emit_fire_and_forget(MetaField::Namespace, pattern, args, channel);
}

async fn emit_collect(
    field: MetaField,
    pattern: &str,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    let channel = channel.unwrap_or_else(|| default_channel());
    let keys = matched_keys(field, pattern, channel);
    // Initiate every emission before awaiting any result.
    let emissions: Vec<Vec<HandlerOutcome>> =
        keys.iter().map(|&key| channel.emit(key, args)).collect();
    let aggregates = try_join_all(emissions.into_iter().map(collect_results)).await?;
    Ok(aggregates.into_iter().map(Value::Array).collect())
}

/// Emit on every key whose group matches `pattern` and await every async
/// handler result. Returns one array of listener results per matched key, in
/// match order.
pub async fn emit_group_async(
    pattern: &str,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    emit_collect(MetaField::Group, pattern, args, channel).await
}

/// Namespace variant of [`emit_group_async`].
pub async fn emit_namespace_async(
    pattern: &str,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    emit_collect(MetaField::Namespace, pattern, args, channel).await
}
